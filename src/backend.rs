/*!
The `Backend` trait connects this library to the host that owns the window
and the GL context.

The host is responsible for creating the on-screen drawable and, on
platforms that render through an intermediate framebuffer, the framebuffer
and renderbuffer objects backing it. The backend reports those identifiers
and formats so that [`ViewSurfaceManager`](crate::manager::ViewSurfaceManager)
can wrap them without ever allocating or deleting them.
*/
use std::ops::Deref;
use std::os::raw::c_void;
use std::rc::Rc;

use crate::geometry::SurfaceSize;
use crate::gl::types::{GLenum, GLuint};

/// Trait for types that provide the GL context and the host's on-screen
/// surfaces.
pub trait Backend {
    /// Returns the address of an OpenGL function.
    ///
    /// Must be called in the same thread and after the backend has been made
    /// current with `make_current`.
    ///
    /// # Safety
    ///
    /// The context must be current on the calling thread.
    unsafe fn get_proc_address(&self, symbol: &str) -> *const c_void;

    /// Makes the GL context the current context in the current thread.
    ///
    /// # Safety
    ///
    /// The context must not be current on another thread.
    unsafe fn make_current(&self);

    /// Returns true if the GL context is the current one in the thread.
    fn is_current(&self) -> bool;

    /// Swaps buffers at the end of a frame.
    fn swap_buffers(&self);

    /// Returns the dimensions of the drawable, in pixels.
    fn frame_size(&self) -> SurfaceSize;

    /// Returns the id of the framebuffer the host presents from.
    ///
    /// Zero names the default framebuffer.
    fn view_framebuffer_id(&self) -> GLuint {
        0
    }

    /// Returns the id of the color renderbuffer bound into the view
    /// framebuffer, or zero if the host renders straight into the default
    /// framebuffer's back buffer.
    fn view_color_renderbuffer_id(&self) -> GLuint {
        0
    }

    /// Returns the id of the host's multisample framebuffer, if the host
    /// set one up. When present, scene content is rendered into it and
    /// resolved into the view framebuffer each frame.
    fn multisample_framebuffer_id(&self) -> Option<GLuint> {
        None
    }

    /// Returns the id of the color renderbuffer bound into the multisample
    /// framebuffer. Only meaningful when `multisample_framebuffer_id`
    /// returns a value.
    fn multisample_color_renderbuffer_id(&self) -> GLuint {
        0
    }

    /// Returns the pixel format of the host's color buffers.
    fn color_format(&self) -> GLenum;

    /// Returns the pixel format of the host's depth buffer, or `None` if
    /// the host created no depth buffer.
    fn depth_format(&self) -> Option<GLenum>;

    /// Returns the id of the host's depth renderbuffer, or zero if the
    /// depth buffer should be allocated here.
    fn depth_renderbuffer_id(&self) -> GLuint {
        0
    }

    /// Returns the number of samples per pixel of the host's color buffers.
    fn pixel_samples(&self) -> u32 {
        1
    }
}

impl<T: Backend + ?Sized> Backend for Rc<T> {
    unsafe fn get_proc_address(&self, symbol: &str) -> *const c_void {
        self.deref().get_proc_address(symbol)
    }

    unsafe fn make_current(&self) {
        self.deref().make_current();
    }

    fn is_current(&self) -> bool {
        self.deref().is_current()
    }

    fn swap_buffers(&self) {
        self.deref().swap_buffers();
    }

    fn frame_size(&self) -> SurfaceSize {
        self.deref().frame_size()
    }

    fn view_framebuffer_id(&self) -> GLuint {
        self.deref().view_framebuffer_id()
    }

    fn view_color_renderbuffer_id(&self) -> GLuint {
        self.deref().view_color_renderbuffer_id()
    }

    fn multisample_framebuffer_id(&self) -> Option<GLuint> {
        self.deref().multisample_framebuffer_id()
    }

    fn multisample_color_renderbuffer_id(&self) -> GLuint {
        self.deref().multisample_color_renderbuffer_id()
    }

    fn color_format(&self) -> GLenum {
        self.deref().color_format()
    }

    fn depth_format(&self) -> Option<GLenum> {
        self.deref().depth_format()
    }

    fn depth_renderbuffer_id(&self) -> GLuint {
        self.deref().depth_renderbuffer_id()
    }

    fn pixel_samples(&self) -> u32 {
        self.deref().pixel_samples()
    }
}
