/*!
Test harness: a recording implementation of the GL command boundary, a
fake texture resource and a fake host backend.

Every GL command issued by the surface machinery is captured as a
[`GlCall`], so tests can assert both what was issued and in what order,
without a live GL context.
*/
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::os::raw::c_void;
use std::ptr;
use std::rc::Rc;

use glsurface::backend::Backend;
use glsurface::context::GlCommands;
use glsurface::framebuffer::AttachmentSlot;
use glsurface::geometry::{SurfaceSize, Viewport};
use glsurface::gl;
use glsurface::gl::types::{GLbitfield, GLenum, GLuint};
use glsurface::image_format::Rgba8;
use glsurface::texture::{CubemapFace, RenderTexture, SharedTexture, TextureWrap};
use glsurface::SurfaceError;

/// One recorded GL command.
#[derive(Clone, Debug, PartialEq)]
pub enum GlCall {
    GenerateRenderbuffer(GLuint),
    DeleteRenderbuffer(GLuint),
    BindRenderbuffer(GLuint),
    AllocateStorage {
        rb: GLuint,
        size: SurfaceSize,
        format: GLenum,
        samples: u32,
    },
    GenerateFramebuffer(GLuint),
    DeleteFramebuffer(GLuint),
    BindFramebuffer(GLuint),
    AttachRenderbuffer {
        rb: GLuint,
        fb: GLuint,
        slot: AttachmentSlot,
    },
    AttachTexture {
        tex: GLuint,
        face: Option<CubemapFace>,
        level: u32,
        fb: GLuint,
        slot: AttachmentSlot,
    },
    CheckStatus(GLuint),
    ScissorTest(bool),
    Scissor(Viewport),
    ColorMask([bool; 4]),
    DepthMask(bool),
    StencilMask(u32),
    Clear(GLbitfield),
    ReadPixels {
        rect: Viewport,
        fb: GLuint,
    },
    Resolve {
        source: GLuint,
        target: GLuint,
        size: SurfaceSize,
    },
    Discard {
        fb: GLuint,
        slots: Vec<AttachmentSlot>,
    },
    RenderbufferLabel {
        rb: GLuint,
        label: String,
    },
    FramebufferLabel {
        fb: GLuint,
        label: String,
    },
}

/// A `GlCommands` implementation that records every call.
pub struct RecordingGl {
    calls: RefCell<Vec<GlCall>>,
    next_id: Cell<GLuint>,
    /// The completeness status reported for every framebuffer.
    pub status: Cell<GLenum>,
}

impl RecordingGl {
    pub fn new() -> Rc<RecordingGl> {
        Rc::new(RecordingGl {
            calls: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            status: Cell::new(gl::FRAMEBUFFER_COMPLETE),
        })
    }

    fn record(&self, call: GlCall) {
        self.calls.borrow_mut().push(call);
    }

    fn next_id(&self) -> GLuint {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Returns a copy of every call recorded so far.
    pub fn calls(&self) -> Vec<GlCall> {
        self.calls.borrow().clone()
    }

    /// Returns the recorded calls and clears the record.
    pub fn take_calls(&self) -> Vec<GlCall> {
        self.calls.borrow_mut().drain(..).collect()
    }

    /// Index of the first recorded call matching `predicate`.
    pub fn position<F>(&self, predicate: F) -> Option<usize>
        where F: Fn(&GlCall) -> bool
    {
        self.calls.borrow().iter().position(predicate)
    }
}

impl GlCommands for RecordingGl {
    fn generate_renderbuffer(&self) -> GLuint {
        let id = self.next_id();
        self.record(GlCall::GenerateRenderbuffer(id));
        id
    }

    fn delete_renderbuffer(&self, rb_id: GLuint) {
        self.record(GlCall::DeleteRenderbuffer(rb_id));
    }

    fn bind_renderbuffer(&self, rb_id: GLuint) {
        self.record(GlCall::BindRenderbuffer(rb_id));
    }

    fn allocate_renderbuffer_storage(&self, rb_id: GLuint, size: SurfaceSize,
                                     format: GLenum, samples: u32) {
        self.record(GlCall::AllocateStorage { rb: rb_id, size, format, samples });
    }

    fn generate_framebuffer(&self) -> GLuint {
        let id = self.next_id();
        self.record(GlCall::GenerateFramebuffer(id));
        id
    }

    fn delete_framebuffer(&self, fb_id: GLuint) {
        self.record(GlCall::DeleteFramebuffer(fb_id));
    }

    fn bind_framebuffer(&self, fb_id: GLuint) {
        self.record(GlCall::BindFramebuffer(fb_id));
    }

    fn attach_renderbuffer(&self, rb_id: GLuint, fb_id: GLuint, slot: AttachmentSlot) {
        self.record(GlCall::AttachRenderbuffer { rb: rb_id, fb: fb_id, slot });
    }

    fn attach_texture(&self, tex_id: GLuint, face: Option<CubemapFace>,
                      mipmap_level: u32, fb_id: GLuint, slot: AttachmentSlot) {
        self.record(GlCall::AttachTexture {
            tex: tex_id,
            face,
            level: mipmap_level,
            fb: fb_id,
            slot,
        });
    }

    fn framebuffer_status(&self, fb_id: GLuint) -> GLenum {
        self.record(GlCall::CheckStatus(fb_id));
        self.status.get()
    }

    fn set_scissor_test(&self, enabled: bool) {
        self.record(GlCall::ScissorTest(enabled));
    }

    fn set_scissor(&self, clip: Viewport) {
        self.record(GlCall::Scissor(clip));
    }

    fn set_color_mask(&self, mask: [bool; 4]) {
        self.record(GlCall::ColorMask(mask));
    }

    fn set_depth_mask(&self, enabled: bool) {
        self.record(GlCall::DepthMask(enabled));
    }

    fn set_stencil_mask(&self, mask: u32) {
        self.record(GlCall::StencilMask(mask));
    }

    fn clear_buffers(&self, mask: GLbitfield) {
        self.record(GlCall::Clear(mask));
    }

    fn read_pixels(&self, rect: Viewport, fb_id: GLuint) -> Vec<Rgba8> {
        self.record(GlCall::ReadPixels { rect, fb: fb_id });
        vec![Rgba8::default(); rect.size().pixel_count()]
    }

    fn resolve_multisample_framebuffer(&self, source_fb: GLuint, target_fb: GLuint,
                                       size: SurfaceSize) {
        self.record(GlCall::Resolve { source: source_fb, target: target_fb, size });
    }

    fn discard_attachments(&self, fb_id: GLuint, slots: &[AttachmentSlot]) {
        self.record(GlCall::Discard { fb: fb_id, slots: slots.to_vec() });
    }

    fn set_renderbuffer_label(&self, rb_id: GLuint, label: &str) {
        self.record(GlCall::RenderbufferLabel { rb: rb_id, label: label.to_owned() });
    }

    fn set_framebuffer_label(&self, fb_id: GLuint, label: &str) {
        self.record(GlCall::FramebufferLabel { fb: fb_id, label: label.to_owned() });
    }
}

/// Builds a recorder plus the trait-object handle the surface types take.
pub fn recording_gl() -> (Rc<RecordingGl>, Rc<dyn GlCommands>) {
    let recorder = RecordingGl::new();
    let gl: Rc<dyn GlCommands> = recorder.clone();
    (recorder, gl)
}

/// A fake texture resource.
pub struct FakeTexture {
    pub id: GLuint,
    pub size: SurfaceSize,
    pub format: GLenum,
    pub is_cube: bool,
    pub horizontal_wrap: Option<TextureWrap>,
    pub vertical_wrap: Option<TextureWrap>,
    pub label: String,
    pub replaced: Vec<(Viewport, Option<CubemapFace>, usize)>,
}

impl FakeTexture {
    pub fn flat(id: GLuint) -> Rc<RefCell<FakeTexture>> {
        FakeTexture::build(id, false)
    }

    pub fn cube(id: GLuint) -> Rc<RefCell<FakeTexture>> {
        FakeTexture::build(id, true)
    }

    fn build(id: GLuint, is_cube: bool) -> Rc<RefCell<FakeTexture>> {
        Rc::new(RefCell::new(FakeTexture {
            id,
            size: SurfaceSize::ZERO,
            format: gl::RGBA8,
            is_cube,
            horizontal_wrap: None,
            vertical_wrap: None,
            label: String::new(),
            replaced: Vec::new(),
        }))
    }

    pub fn shared(this: &Rc<RefCell<FakeTexture>>) -> SharedTexture {
        this.clone()
    }
}

impl RenderTexture for FakeTexture {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.size = size;
    }

    fn pixel_format(&self) -> GLenum {
        self.format
    }

    fn texture_id(&self) -> GLuint {
        self.id
    }

    fn initial_attachment_face(&self) -> Option<CubemapFace> {
        if self.is_cube {
            Some(CubemapFace::PositiveX)
        } else {
            None
        }
    }

    fn set_horizontal_wrap(&mut self, wrap: TextureWrap) {
        self.horizontal_wrap = Some(wrap);
    }

    fn set_vertical_wrap(&mut self, wrap: TextureWrap) {
        self.vertical_wrap = Some(wrap);
    }

    fn replace_pixels(&mut self, rect: Viewport, face: Option<CubemapFace>,
                      pixels: &[Rgba8]) -> Result<(), SurfaceError> {
        self.replaced.push((rect, face, pixels.len()));
        Ok(())
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn set_label(&mut self, label: &str) {
        self.label = label.to_owned();
    }
}

/// A fake host backend describing an on-screen surface setup.
pub struct FakeBackend {
    pub size: SurfaceSize,
    pub color_format: GLenum,
    pub depth_format: Option<GLenum>,
    pub samples: u32,
    pub view_fb: GLuint,
    pub view_rb: GLuint,
    pub msaa_fb: Option<GLuint>,
    pub msaa_rb: GLuint,
}

impl FakeBackend {
    /// A plain single-sample host setup.
    pub fn single_sample(size: SurfaceSize) -> FakeBackend {
        FakeBackend {
            size,
            color_format: gl::RGBA8,
            depth_format: Some(gl::DEPTH24_STENCIL8),
            samples: 1,
            view_fb: 1,
            view_rb: 2,
            msaa_fb: None,
            msaa_rb: 0,
        }
    }

    /// A host setup rendering through a multisample framebuffer.
    pub fn multisampled(size: SurfaceSize, samples: u32) -> FakeBackend {
        FakeBackend {
            size,
            color_format: gl::RGBA8,
            depth_format: Some(gl::DEPTH24_STENCIL8),
            samples,
            view_fb: 1,
            view_rb: 2,
            msaa_fb: Some(3),
            msaa_rb: 4,
        }
    }
}

impl Backend for FakeBackend {
    unsafe fn get_proc_address(&self, _symbol: &str) -> *const c_void {
        ptr::null()
    }

    unsafe fn make_current(&self) {}

    fn is_current(&self) -> bool {
        true
    }

    fn swap_buffers(&self) {}

    fn frame_size(&self) -> SurfaceSize {
        self.size
    }

    fn view_framebuffer_id(&self) -> GLuint {
        self.view_fb
    }

    fn view_color_renderbuffer_id(&self) -> GLuint {
        self.view_rb
    }

    fn multisample_framebuffer_id(&self) -> Option<GLuint> {
        self.msaa_fb
    }

    fn multisample_color_renderbuffer_id(&self) -> GLuint {
        self.msaa_rb
    }

    fn color_format(&self) -> GLenum {
        self.color_format
    }

    fn depth_format(&self) -> Option<GLenum> {
        self.depth_format
    }

    fn pixel_samples(&self) -> u32 {
        self.samples
    }
}
