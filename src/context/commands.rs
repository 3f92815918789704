/*!
The synchronous GL command boundary.

Every GPU command the surface machinery issues goes through the
[`GlCommands`] trait. The production implementation is
[`Context`](crate::context::Context), which forwards to the loaded GL
function pointers with redundant-state elision; tests substitute a
recording implementation so the surface graph can be exercised without a
live context.

All operations execute immediately on the calling thread and assume the
GL context is current there.
*/
use crate::framebuffer::AttachmentSlot;
use crate::geometry::{SurfaceSize, Viewport};
use crate::gl::types::{GLbitfield, GLenum, GLuint};
use crate::image_format::Rgba8;
use crate::texture::CubemapFace;

/// The set of GL commands required to manage render surfaces.
pub trait GlCommands {
    /// Generates a new renderbuffer object and returns its id.
    fn generate_renderbuffer(&self) -> GLuint;

    /// Deletes a renderbuffer object.
    fn delete_renderbuffer(&self, rb_id: GLuint);

    /// Binds a renderbuffer as the current renderbuffer.
    fn bind_renderbuffer(&self, rb_id: GLuint);

    /// Allocates (or reallocates) the pixel storage of a renderbuffer at
    /// the given size, format and sample count.
    fn allocate_renderbuffer_storage(&self, rb_id: GLuint, size: SurfaceSize,
                                     format: GLenum, samples: u32);

    /// Generates a new framebuffer object and returns its id.
    fn generate_framebuffer(&self) -> GLuint;

    /// Deletes a framebuffer object.
    fn delete_framebuffer(&self, fb_id: GLuint);

    /// Binds a framebuffer as the current draw and read target.
    fn bind_framebuffer(&self, fb_id: GLuint);

    /// Attaches a renderbuffer to one slot of a framebuffer. Attaching
    /// renderbuffer zero empties the slot.
    fn attach_renderbuffer(&self, rb_id: GLuint, fb_id: GLuint, slot: AttachmentSlot);

    /// Attaches a texture face mipmap to one slot of a framebuffer.
    /// Attaching texture zero empties the slot.
    fn attach_texture(&self, tex_id: GLuint, face: Option<CubemapFace>,
                      mipmap_level: u32, fb_id: GLuint, slot: AttachmentSlot);

    /// Returns the completeness status of a framebuffer.
    fn framebuffer_status(&self, fb_id: GLuint) -> GLenum;

    /// Enables or disables the scissor test.
    fn set_scissor_test(&self, enabled: bool);

    /// Sets the scissor clip rectangle.
    fn set_scissor(&self, clip: Viewport);

    /// Sets the color channel write mask.
    fn set_color_mask(&self, mask: [bool; 4]);

    /// Enables or disables depth writes.
    fn set_depth_mask(&self, enabled: bool);

    /// Sets the stencil write mask.
    fn set_stencil_mask(&self, mask: u32);

    /// Clears the buffers selected by `mask` on the currently bound
    /// framebuffer.
    fn clear_buffers(&self, mask: GLbitfield);

    /// Reads a rectangle of RGBA pixels from a framebuffer.
    fn read_pixels(&self, rect: Viewport, fb_id: GLuint) -> Vec<Rgba8>;

    /// Resolves the content of a multisample framebuffer into a
    /// single-sample framebuffer of the same size.
    fn resolve_multisample_framebuffer(&self, source_fb: GLuint, target_fb: GLuint,
                                       size: SurfaceSize);

    /// Hints that the content of the listed attachments of a framebuffer
    /// may be discarded.
    fn discard_attachments(&self, fb_id: GLuint, slots: &[AttachmentSlot]);

    /// Applies a debug label to a renderbuffer, where supported.
    fn set_renderbuffer_label(&self, rb_id: GLuint, label: &str);

    /// Applies a debug label to a framebuffer, where supported.
    fn set_framebuffer_label(&self, fb_id: GLuint, label: &str);
}
