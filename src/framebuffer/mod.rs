/*!
Framebuffers and the render-surface abstraction.

A [`Framebuffer`] aggregates up to three pixel stores (color, depth and
stencil) into one render target. Attachments are kept at the framebuffer's
size: resizing the framebuffer resizes and rebinds every attachment, and
installing an attachment aligns the two sizes (the framebuffer adopts the
attachment's size while it has none of its own).

Binding an attachment into the GL framebuffer object is deferred until the
framebuffer has a non-zero size, because a texture must already have its
final storage dimensions at the moment it is bound to a slot. Once a sized
framebuffer holds at least one attachment, every mutation re-checks GL
completeness; an incomplete framebuffer is a configuration error and fails
hard rather than rendering garbage.
*/
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::debug;

use crate::context::GlCommands;
use crate::geometry::{SurfacePoint, SurfaceSize, Viewport};
use crate::gl;
use crate::gl::types::{GLenum, GLuint};
use crate::image_format::{framebuffer_status_name, Rgba8};
use crate::texture::SharedTexture;
use crate::{GlObject, SurfaceError};

pub use self::attachment::{FramebufferAttachment, RenderSurfaceAttachment,
                           Renderbuffer, SharedAttachment, TextureAttachment};
pub use self::section::SurfaceSection;

mod attachment;
mod section;

/// One of the three attachment slots of a framebuffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AttachmentSlot {
    /// The color attachment slot.
    Color,
    /// The depth attachment slot.
    Depth,
    /// The stencil attachment slot.
    Stencil,
}

impl AttachmentSlot {
    /// Returns the GL attachment-point enum for this slot.
    pub fn gl_enum(self) -> GLenum {
        match self {
            AttachmentSlot::Color => gl::COLOR_ATTACHMENT0,
            AttachmentSlot::Depth => gl::DEPTH_ATTACHMENT,
            AttachmentSlot::Stencil => gl::STENCIL_ATTACHMENT,
        }
    }

    fn label_suffix(self) -> &'static str {
        match self {
            AttachmentSlot::Color => "color",
            AttachmentSlot::Depth => "depth",
            AttachmentSlot::Stencil => "stencil",
        }
    }
}

/// Derives a debug label for an attachment from the label of its
/// framebuffer. Returns an empty string when the framebuffer is unlabeled.
pub fn attachment_label(fb_label: &str, slot: AttachmentSlot) -> String {
    if fb_label.is_empty() {
        String::new()
    } else {
        format!("{}-{}", fb_label, slot.label_suffix())
    }
}

/// Trait for surfaces that can be rendered to.
///
/// Implemented by [`Framebuffer`] and [`SurfaceSection`]. All operations
/// issue GL commands immediately on the calling thread.
pub trait RenderSurface {
    /// Returns the size of this surface, in pixels.
    fn size(&self) -> SurfaceSize;

    /// Resizes this surface. A no-op when the size is unchanged.
    fn set_size(&mut self, size: SurfaceSize);

    /// Returns the rectangle this surface covers on its render target.
    fn viewport(&self) -> Viewport {
        Viewport::from_origin_and_size(SurfacePoint::ZERO, self.size())
    }

    /// Returns true if this surface is presented on screen.
    fn is_on_screen(&self) -> bool;

    /// Returns true if this surface covers its entire render target.
    fn is_full_coverage(&self) -> bool;

    /// Returns the color attachment, if any.
    fn color_attachment(&self) -> Option<SharedAttachment>;

    /// Returns the depth attachment, if any.
    fn depth_attachment(&self) -> Option<SharedAttachment>;

    /// Returns the stencil attachment, if any.
    fn stencil_attachment(&self) -> Option<SharedAttachment>;

    /// Clears the color content of this surface.
    fn clear_color_content(&self);

    /// Clears the depth content of this surface.
    fn clear_depth_content(&self);

    /// Clears the stencil content of this surface.
    fn clear_stencil_content(&self);

    /// Clears the color and depth content of this surface in one pass.
    fn clear_color_and_depth_content(&self);

    /// Reads a rectangle of color pixels from this surface.
    fn read_color_content(&self, rect: Viewport) -> Vec<Rgba8>;

    /// Replaces a rectangle of color pixels on this surface.
    fn replace_color_pixels(&self, rect: Viewport, pixels: &[Rgba8])
                            -> Result<(), SurfaceError>;

    /// Makes this surface the current GL render target. Does not clear or
    /// clip.
    fn activate(&self);
}

/// A surface shared between its creator and the registries that resize it.
pub type SharedSurface = Rc<RefCell<dyn RenderSurface>>;

fn same_attachment(a: &Option<SharedAttachment>, b: &Option<SharedAttachment>) -> bool {
    match (a, b) {
        // Compare data pointers only; vtable pointers of trait objects are
        // not unique per type.
        (Some(a), Some(b)) => Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>(),
        (None, None) => true,
        _ => false,
    }
}

/// A GL framebuffer object aggregating color, depth and stencil
/// attachments.
pub struct Framebuffer {
    gl: Rc<dyn GlCommands>,
    id: Cell<GLuint>,
    size: SurfaceSize,
    color: Option<SharedAttachment>,
    depth: Option<SharedAttachment>,
    stencil: Option<SharedAttachment>,
    is_managing_gl: bool,
    should_bind_gl_attachments: bool,
    is_on_screen: bool,
    label: String,
    gl_label_was_set: Cell<bool>,
}

impl Framebuffer {
    /// Builds a new, empty off-screen framebuffer.
    ///
    /// The GL object is generated lazily, on the first operation that needs
    /// its id.
    pub fn new(gl: &Rc<dyn GlCommands>) -> Framebuffer {
        Framebuffer {
            gl: gl.clone(),
            id: Cell::new(0),
            size: SurfaceSize::ZERO,
            color: None,
            depth: None,
            stencil: None,
            is_managing_gl: true,
            should_bind_gl_attachments: true,
            is_on_screen: false,
            label: String::new(),
            gl_label_was_set: Cell::new(false),
        }
    }

    /// Wraps a framebuffer created by the host. The id is never deleted
    /// here.
    pub fn from_existing(gl: &Rc<dyn GlCommands>, fb_id: GLuint) -> Framebuffer {
        let mut fb = Framebuffer::new(gl);
        fb.id.set(fb_id);
        fb.is_managing_gl = false;
        fb
    }

    /// Builds a framebuffer rendering into the given texture, with an
    /// optional depth attachment.
    pub fn with_color_texture(gl: &Rc<dyn GlCommands>, texture: SharedTexture,
                              depth: Option<SharedAttachment>) -> Framebuffer {
        let mut fb = Framebuffer::new(gl);
        let color = TextureAttachment::new(gl, texture);
        fb.set_color_attachment(Some(Rc::new(RefCell::new(color))));
        fb.set_depth_attachment(depth);
        fb
    }

    /// Returns the GL object id, generating the object on first use when
    /// self-managed.
    pub fn framebuffer_id(&self) -> GLuint {
        if self.is_managing_gl && self.id.get() == 0 {
            self.id.set(self.gl.generate_framebuffer());
        }
        self.id.get()
    }

    /// Returns true if the GL object lifetime is managed here.
    pub fn is_managing_gl(&self) -> bool {
        self.is_managing_gl
    }

    /// Returns whether attachments are bound to the GL framebuffer object
    /// when installed.
    pub fn should_bind_gl_attachments(&self) -> bool {
        self.should_bind_gl_attachments
    }

    /// Sets whether attachments are bound to the GL framebuffer object when
    /// installed. Turned off for host-created framebuffers whose
    /// attachments are already in place.
    pub fn set_should_bind_gl_attachments(&mut self, should_bind: bool) {
        self.should_bind_gl_attachments = should_bind;
    }

    /// Marks this framebuffer as the one presented on screen.
    pub fn set_is_on_screen(&mut self, is_on_screen: bool) {
        self.is_on_screen = is_on_screen;
    }

    /// Returns the debug label, or an empty string if none was set.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Sets the debug label, applies it to the GL object once it exists,
    /// and derives labels for any unlabeled attachments.
    pub fn set_label(&mut self, label: &str) {
        self.label = label.to_owned();
        if !self.label.is_empty() && self.id.get() != 0 {
            self.gl.set_framebuffer_label(self.id.get(), &self.label);
            self.gl_label_was_set.set(true);
        }

        for slot in [AttachmentSlot::Color, AttachmentSlot::Depth, AttachmentSlot::Stencil] {
            if let Some(attachment) = self.attachment_in(slot) {
                attachment.borrow_mut().derive_label_from_framebuffer(&self.label, slot);
            }
        }
    }

    fn attachment_in(&self, slot: AttachmentSlot) -> Option<SharedAttachment> {
        match slot {
            AttachmentSlot::Color => self.color.clone(),
            AttachmentSlot::Depth => self.depth.clone(),
            AttachmentSlot::Stencil => self.stencil.clone(),
        }
    }

    /// Installs the color attachment, replacing any previous one.
    pub fn set_color_attachment(&mut self, attachment: Option<SharedAttachment>) {
        if same_attachment(&self.color, &attachment) {
            return;
        }

        if let Some(old) = self.color.take() {
            self.unbind(&old, AttachmentSlot::Color);
        }

        self.color = attachment;
        if let Some(attachment) = self.color.clone() {
            self.align_size_of_attachment(&attachment);
            self.bind(&attachment, AttachmentSlot::Color);
        }

        self.validate();
    }

    /// Installs the depth attachment, replacing any previous one.
    ///
    /// When the new attachment's pixel format packs stencil bits, the same
    /// attachment is installed into the stencil slot as well.
    pub fn set_depth_attachment(&mut self, attachment: Option<SharedAttachment>) {
        if same_attachment(&self.depth, &attachment) {
            return;
        }

        if let Some(old) = self.depth.take() {
            self.unbind(&old, AttachmentSlot::Depth);
        }

        self.depth = attachment;
        if let Some(attachment) = self.depth.clone() {
            self.align_size_of_attachment(&attachment);
            self.bind(&attachment, AttachmentSlot::Depth);

            let format = attachment.borrow().pixel_format();
            if crate::image_format::depth_format_includes_stencil(format) {
                self.set_stencil_attachment(Some(attachment));
            }
        }

        self.validate();
    }

    /// Installs the stencil attachment, replacing any previous one.
    pub fn set_stencil_attachment(&mut self, attachment: Option<SharedAttachment>) {
        if same_attachment(&self.stencil, &attachment) {
            return;
        }

        if let Some(old) = self.stencil.take() {
            self.unbind(&old, AttachmentSlot::Stencil);
        }

        self.stencil = attachment;
        if let Some(attachment) = self.stencil.clone() {
            self.align_size_of_attachment(&attachment);
            self.bind(&attachment, AttachmentSlot::Stencil);
        }

        self.validate();
    }

    /// Aligns the size of an attachment with this framebuffer: while this
    /// framebuffer has no size it adopts the attachment's, otherwise the
    /// attachment is resized to match.
    fn align_size_of_attachment(&mut self, attachment: &SharedAttachment) {
        let my_size = self.size;
        let attachment_size = attachment.borrow().size();

        if my_size == attachment_size {
            return;
        }

        if my_size.is_zero() {
            self.set_size(attachment_size);
        } else {
            attachment.borrow_mut().set_size(my_size);
        }
    }

    /// Binds an attachment into a slot of the GL framebuffer object, when
    /// binding is enabled and this framebuffer has a size, and derives the
    /// attachment's debug label either way.
    fn bind(&self, attachment: &SharedAttachment, slot: AttachmentSlot) {
        if self.should_bind_gl_attachments && !self.size.is_zero() {
            attachment.borrow_mut().bind_to_framebuffer(self.framebuffer_id(), slot);
        }
        attachment.borrow_mut().derive_label_from_framebuffer(&self.label, slot);
    }

    fn unbind(&self, attachment: &SharedAttachment, slot: AttachmentSlot) {
        if self.should_bind_gl_attachments {
            attachment.borrow_mut().unbind_from_framebuffer(self.framebuffer_id(), slot);
        }
    }

    /// Checks GL completeness once this framebuffer is sized and holds at
    /// least one attachment. A no-op during incremental setup.
    ///
    /// # Panics
    ///
    /// Panics if the GL engine reports the framebuffer incomplete. An
    /// incomplete target is a configuration error; rendering into it would
    /// produce garbage, so no recovery is attempted.
    pub fn validate(&self) {
        if self.color.is_none() && self.depth.is_none() && self.stencil.is_none() {
            return;
        }
        if self.size.is_zero() {
            return;
        }

        let status = self.gl.framebuffer_status(self.framebuffer_id());
        if status != gl::FRAMEBUFFER_COMPLETE {
            panic!("framebuffer {} is incomplete: {}",
                   self.display_label(), framebuffer_status_name(status));
        }
        debug!("framebuffer {} validated at {}x{}",
               self.display_label(), self.size.width, self.size.height);

        self.check_gl_debug_label();
    }

    fn display_label(&self) -> &str {
        if self.label.is_empty() {
            "(unlabeled)"
        } else {
            self.label.as_str()
        }
    }

    /// Applies the debug label to the GL object, once it exists.
    fn check_gl_debug_label(&self) {
        if self.id.get() != 0 && !self.label.is_empty() && !self.gl_label_was_set.get() {
            self.gl.set_framebuffer_label(self.id.get(), &self.label);
            self.gl_label_was_set.set(true);
        }
    }
}

impl RenderSurface for Framebuffer {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn set_size(&mut self, size: SurfaceSize) {
        if size == self.size {
            return;
        }

        self.size = size;

        // Resize each attachment, then rebind it: a texture attachment must
        // have its final storage dimensions at the moment it is bound to a
        // slot, so resizing the texture object alone is not enough.
        for slot in [AttachmentSlot::Color, AttachmentSlot::Depth, AttachmentSlot::Stencil] {
            if let Some(attachment) = self.attachment_in(slot) {
                attachment.borrow_mut().set_size(size);
                self.bind(&attachment, slot);
            }
        }

        self.validate();
    }

    fn is_on_screen(&self) -> bool {
        self.is_on_screen
    }

    fn is_full_coverage(&self) -> bool {
        true
    }

    fn color_attachment(&self) -> Option<SharedAttachment> {
        self.color.clone()
    }

    fn depth_attachment(&self) -> Option<SharedAttachment> {
        self.depth.clone()
    }

    fn stencil_attachment(&self) -> Option<SharedAttachment> {
        self.stencil.clone()
    }

    fn clear_color_content(&self) {
        self.activate();
        self.gl.set_color_mask([true; 4]);
        self.gl.clear_buffers(gl::COLOR_BUFFER_BIT);
    }

    fn clear_depth_content(&self) {
        self.activate();
        self.gl.set_depth_mask(true);
        self.gl.clear_buffers(gl::DEPTH_BUFFER_BIT);
    }

    fn clear_stencil_content(&self) {
        self.activate();
        self.gl.set_stencil_mask(!0);
        self.gl.clear_buffers(gl::STENCIL_BUFFER_BIT);
    }

    fn clear_color_and_depth_content(&self) {
        self.activate();
        self.gl.set_depth_mask(true);
        self.gl.set_color_mask([true; 4]);
        self.gl.clear_buffers(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT);
    }

    fn read_color_content(&self, rect: Viewport) -> Vec<Rgba8> {
        self.gl.read_pixels(rect, self.framebuffer_id())
    }

    fn replace_color_pixels(&self, rect: Viewport, pixels: &[Rgba8])
                            -> Result<(), SurfaceError> {
        match self.color {
            Some(ref attachment) => attachment.borrow_mut().replace_pixels(rect, pixels),
            None => panic!("framebuffer {} has no color attachment to replace pixels in",
                           self.display_label()),
        }
    }

    fn activate(&self) {
        self.gl.bind_framebuffer(self.framebuffer_id());
    }
}

impl GlObject for Framebuffer {
    type Id = GLuint;

    fn get_id(&self) -> GLuint {
        self.framebuffer_id()
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        if self.is_managing_gl && self.id.get() != 0 {
            self.gl.delete_framebuffer(self.id.get());
        }
    }
}
