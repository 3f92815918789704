/*!
The GL context and the production implementation of the command boundary.

A [`Context`] is built once from the host's [`Backend`], loads the GL
function pointers through it, and from then on issues every command with
redundant-state elision: the latest value of each piece of GL state is
cached in [`GlState`] and commands that would not change it are skipped.

The context assumes single-threaded use on the thread that owns the GL
context; it is `!Send` and `!Sync` by construction.
*/
use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, warn};
use smallvec::SmallVec;

use crate::backend::Backend;
use crate::framebuffer::AttachmentSlot;
use crate::geometry::{SurfaceSize, Viewport};
use crate::gl;
use crate::gl::types::{GLbitfield, GLenum, GLsizei, GLuint};
use crate::image_format::Rgba8;
use crate::texture::CubemapFace;

pub use self::commands::GlCommands;
pub use self::state::GlState;

mod commands;
mod state;

/// The GL context, wrapping the loaded function pointers and the cached
/// GL state.
pub struct Context {
    gl: gl::Gles2,
    state: RefCell<GlState>,
    backend: Box<dyn Backend>,
}

impl Context {
    /// Builds a context from a backend, loading the GL function pointers
    /// through it.
    pub fn new<B>(backend: B) -> Rc<Context>
        where B: Backend + 'static
    {
        unsafe { backend.make_current() };
        let gl = gl::Gles2::load_with(|symbol| unsafe { backend.get_proc_address(symbol) });

        Rc::new(Context {
            gl,
            state: RefCell::new(GlState::default()),
            backend: Box::new(backend),
        })
    }

    /// Returns the backend this context was built from.
    pub fn backend(&self) -> &dyn Backend {
        &*self.backend
    }

    /// Flushes pending commands and swaps the host's buffers.
    pub fn swap_buffers(&self) {
        self.ensure_current();
        unsafe { self.gl.Flush() };
        self.backend.swap_buffers();
    }

    fn ensure_current(&self) {
        if !self.backend.is_current() {
            unsafe { self.backend.make_current() };
        }
    }

    /// Binds `fb_id` to both the draw and read targets, skipping the call
    /// when already bound.
    fn raw_bind_framebuffer(&self, state: &mut GlState, fb_id: GLuint) {
        if state.draw_framebuffer != fb_id || state.read_framebuffer != fb_id {
            unsafe { self.gl.BindFramebuffer(gl::FRAMEBUFFER, fb_id) };
            state.draw_framebuffer = fb_id;
            state.read_framebuffer = fb_id;
        }
    }
}

impl GlCommands for Context {
    fn generate_renderbuffer(&self) -> GLuint {
        self.ensure_current();
        let mut state = self.state.borrow_mut();
        let mut id = 0;
        unsafe { self.gl.GenRenderbuffers(1, &mut id) };
        state.live_renderbuffers.insert(id);
        debug!("generated renderbuffer {}", id);
        id
    }

    fn delete_renderbuffer(&self, rb_id: GLuint) {
        self.ensure_current();
        let mut state = self.state.borrow_mut();
        if state.renderbuffer == rb_id {
            state.renderbuffer = 0;
        }
        state.live_renderbuffers.remove(&rb_id);
        unsafe { self.gl.DeleteRenderbuffers(1, [rb_id].as_ptr()) };
    }

    fn bind_renderbuffer(&self, rb_id: GLuint) {
        self.ensure_current();
        let mut state = self.state.borrow_mut();
        if state.renderbuffer != rb_id {
            unsafe { self.gl.BindRenderbuffer(gl::RENDERBUFFER, rb_id) };
            state.renderbuffer = rb_id;
        }
    }

    fn allocate_renderbuffer_storage(&self, rb_id: GLuint, size: SurfaceSize,
                                     format: GLenum, samples: u32) {
        self.bind_renderbuffer(rb_id);
        self.ensure_current();
        unsafe {
            if samples > 1 {
                if self.gl.RenderbufferStorageMultisample.is_loaded() {
                    self.gl.RenderbufferStorageMultisample(gl::RENDERBUFFER,
                                                           samples as GLsizei, format,
                                                           size.width as GLsizei,
                                                           size.height as GLsizei);
                } else {
                    self.gl.RenderbufferStorageMultisampleAPPLE(gl::RENDERBUFFER,
                                                                samples as GLsizei, format,
                                                                size.width as GLsizei,
                                                                size.height as GLsizei);
                }
            } else {
                self.gl.RenderbufferStorage(gl::RENDERBUFFER, format,
                                            size.width as GLsizei,
                                            size.height as GLsizei);
            }
        }
    }

    fn generate_framebuffer(&self) -> GLuint {
        self.ensure_current();
        let mut state = self.state.borrow_mut();
        let mut id = 0;
        unsafe { self.gl.GenFramebuffers(1, &mut id) };
        state.live_framebuffers.insert(id);
        debug!("generated framebuffer {}", id);
        id
    }

    fn delete_framebuffer(&self, fb_id: GLuint) {
        self.ensure_current();
        let mut state = self.state.borrow_mut();
        if state.draw_framebuffer == fb_id || state.read_framebuffer == fb_id {
            unsafe { self.gl.BindFramebuffer(gl::FRAMEBUFFER, 0) };
            state.draw_framebuffer = 0;
            state.read_framebuffer = 0;
        }
        state.live_framebuffers.remove(&fb_id);
        unsafe { self.gl.DeleteFramebuffers(1, [fb_id].as_ptr()) };
    }

    fn bind_framebuffer(&self, fb_id: GLuint) {
        self.ensure_current();
        let mut state = self.state.borrow_mut();
        self.raw_bind_framebuffer(&mut state, fb_id);
    }

    fn attach_renderbuffer(&self, rb_id: GLuint, fb_id: GLuint, slot: AttachmentSlot) {
        self.ensure_current();
        let mut state = self.state.borrow_mut();
        self.raw_bind_framebuffer(&mut state, fb_id);
        unsafe {
            self.gl.FramebufferRenderbuffer(gl::FRAMEBUFFER, slot.gl_enum(),
                                            gl::RENDERBUFFER, rb_id);
        }
    }

    fn attach_texture(&self, tex_id: GLuint, face: Option<CubemapFace>,
                      mipmap_level: u32, fb_id: GLuint, slot: AttachmentSlot) {
        self.ensure_current();
        let mut state = self.state.borrow_mut();
        self.raw_bind_framebuffer(&mut state, fb_id);
        let target = face.map_or(gl::TEXTURE_2D, CubemapFace::gl_enum);
        unsafe {
            self.gl.FramebufferTexture2D(gl::FRAMEBUFFER, slot.gl_enum(), target,
                                         tex_id, mipmap_level as i32);
        }
    }

    fn framebuffer_status(&self, fb_id: GLuint) -> GLenum {
        self.ensure_current();
        let mut state = self.state.borrow_mut();
        self.raw_bind_framebuffer(&mut state, fb_id);
        unsafe { self.gl.CheckFramebufferStatus(gl::FRAMEBUFFER) }
    }

    fn set_scissor_test(&self, enabled: bool) {
        self.ensure_current();
        let mut state = self.state.borrow_mut();
        if state.enabled_scissor_test != enabled {
            unsafe {
                if enabled {
                    self.gl.Enable(gl::SCISSOR_TEST);
                } else {
                    self.gl.Disable(gl::SCISSOR_TEST);
                }
            }
            state.enabled_scissor_test = enabled;
        }
    }

    fn set_scissor(&self, clip: Viewport) {
        self.ensure_current();
        let mut state = self.state.borrow_mut();
        if state.scissor != clip {
            unsafe {
                self.gl.Scissor(clip.x, clip.y,
                                clip.width as GLsizei, clip.height as GLsizei);
            }
            state.scissor = clip;
        }
    }

    fn set_color_mask(&self, mask: [bool; 4]) {
        self.ensure_current();
        let mut state = self.state.borrow_mut();
        if state.color_mask != mask {
            let to_gl = |flag| if flag { gl::TRUE } else { gl::FALSE };
            unsafe {
                self.gl.ColorMask(to_gl(mask[0]), to_gl(mask[1]),
                                  to_gl(mask[2]), to_gl(mask[3]));
            }
            state.color_mask = mask;
        }
    }

    fn set_depth_mask(&self, enabled: bool) {
        self.ensure_current();
        let mut state = self.state.borrow_mut();
        if state.depth_mask != enabled {
            unsafe { self.gl.DepthMask(if enabled { gl::TRUE } else { gl::FALSE }) };
            state.depth_mask = enabled;
        }
    }

    fn set_stencil_mask(&self, mask: u32) {
        self.ensure_current();
        let mut state = self.state.borrow_mut();
        if state.stencil_mask != mask {
            unsafe { self.gl.StencilMask(mask) };
            state.stencil_mask = mask;
        }
    }

    fn clear_buffers(&self, mask: GLbitfield) {
        self.ensure_current();
        unsafe { self.gl.Clear(mask) };
    }

    fn read_pixels(&self, rect: Viewport, fb_id: GLuint) -> Vec<Rgba8> {
        self.ensure_current();
        let mut state = self.state.borrow_mut();
        if state.read_framebuffer != fb_id {
            unsafe { self.gl.BindFramebuffer(gl::READ_FRAMEBUFFER, fb_id) };
            state.read_framebuffer = fb_id;
        }
        let mut pixels = vec![Rgba8::default(); rect.size().pixel_count()];
        unsafe {
            self.gl.ReadPixels(rect.x, rect.y,
                               rect.width as GLsizei, rect.height as GLsizei,
                               gl::RGBA, gl::UNSIGNED_BYTE,
                               pixels.as_mut_ptr().cast());
        }
        pixels
    }

    fn resolve_multisample_framebuffer(&self, source_fb: GLuint, target_fb: GLuint,
                                       size: SurfaceSize) {
        self.ensure_current();
        let mut state = self.state.borrow_mut();
        unsafe {
            if state.read_framebuffer != source_fb {
                self.gl.BindFramebuffer(gl::READ_FRAMEBUFFER, source_fb);
                state.read_framebuffer = source_fb;
            }
            if state.draw_framebuffer != target_fb {
                self.gl.BindFramebuffer(gl::DRAW_FRAMEBUFFER, target_fb);
                state.draw_framebuffer = target_fb;
            }
            if self.gl.BlitFramebuffer.is_loaded() {
                self.gl.BlitFramebuffer(0, 0, size.width as i32, size.height as i32,
                                        0, 0, size.width as i32, size.height as i32,
                                        gl::COLOR_BUFFER_BIT, gl::NEAREST);
            } else {
                self.gl.ResolveMultisampleFramebufferAPPLE();
            }
        }
    }

    fn discard_attachments(&self, fb_id: GLuint, slots: &[AttachmentSlot]) {
        if slots.is_empty() {
            return;
        }
        self.ensure_current();
        let mut state = self.state.borrow_mut();
        self.raw_bind_framebuffer(&mut state, fb_id);
        let attachments: SmallVec<[GLenum; 3]> =
            slots.iter().map(|slot| slot.gl_enum()).collect();
        unsafe {
            if self.gl.InvalidateFramebuffer.is_loaded() {
                self.gl.InvalidateFramebuffer(gl::FRAMEBUFFER,
                                              attachments.len() as GLsizei,
                                              attachments.as_ptr());
            } else {
                self.gl.DiscardFramebufferEXT(gl::FRAMEBUFFER,
                                              attachments.len() as GLsizei,
                                              attachments.as_ptr());
            }
        }
    }

    fn set_renderbuffer_label(&self, rb_id: GLuint, label: &str) {
        if !self.gl.ObjectLabelKHR.is_loaded() {
            return;
        }
        self.ensure_current();
        unsafe {
            self.gl.ObjectLabelKHR(gl::RENDERBUFFER, rb_id,
                                   label.len() as GLsizei,
                                   label.as_ptr().cast());
        }
    }

    fn set_framebuffer_label(&self, fb_id: GLuint, label: &str) {
        if !self.gl.ObjectLabelKHR.is_loaded() {
            return;
        }
        self.ensure_current();
        unsafe {
            self.gl.ObjectLabelKHR(gl::FRAMEBUFFER, fb_id,
                                   label.len() as GLsizei,
                                   label.as_ptr().cast());
        }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        let state = self.state.borrow();
        if !state.live_renderbuffers.is_empty() || !state.live_framebuffers.is_empty() {
            warn!("context dropped with {} renderbuffer(s) and {} framebuffer(s) still alive",
                  state.live_renderbuffers.len(), state.live_framebuffers.len());
        }
    }
}
