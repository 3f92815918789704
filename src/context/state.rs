use fnv::FnvHashSet;

use crate::geometry::Viewport;
use crate::gl::types::GLuint;

/// The cached GL state.
///
/// Latest values passed to the GL engine, consulted before every command so
/// redundant state changes are elided.
pub struct GlState {
    /// The latest framebuffer bound to `GL_DRAW_FRAMEBUFFER`.
    pub draw_framebuffer: GLuint,

    /// The latest framebuffer bound to `GL_READ_FRAMEBUFFER`.
    pub read_framebuffer: GLuint,

    /// The latest renderbuffer bound to `GL_RENDERBUFFER`.
    pub renderbuffer: GLuint,

    /// Whether `GL_SCISSOR_TEST` is enabled.
    pub enabled_scissor_test: bool,

    /// The latest rectangle passed to `glScissor`.
    pub scissor: Viewport,

    /// The latest values passed to `glColorMask`.
    pub color_mask: [bool; 4],

    /// The latest value passed to `glDepthMask`.
    pub depth_mask: bool,

    /// The latest value passed to `glStencilMask`.
    pub stencil_mask: u32,

    /// Renderbuffer ids generated here and not yet deleted.
    pub live_renderbuffers: FnvHashSet<GLuint>,

    /// Framebuffer ids generated here and not yet deleted.
    pub live_framebuffers: FnvHashSet<GLuint>,
}

impl Default for GlState {
    fn default() -> GlState {
        GlState {
            draw_framebuffer: 0,
            read_framebuffer: 0,
            renderbuffer: 0,
            enabled_scissor_test: false,
            scissor: Viewport::default(),
            color_mask: [true; 4],
            depth_mask: true,
            stencil_mask: !0,
            live_renderbuffers: FnvHashSet::default(),
            live_framebuffers: FnvHashSet::default(),
        }
    }
}
