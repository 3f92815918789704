/*!
Pixel stores that can be bound into the slots of a framebuffer.

Two kinds exist: a [`Renderbuffer`] owns (or wraps) a GPU renderbuffer
object, while a [`TextureAttachment`] points at a face of a texture owned
by the resource layer. Both keep their size aligned with the framebuffer
they are attached to.
*/
use std::cell::Cell;
use std::rc::{Rc, Weak};

use log::trace;

use crate::context::GlCommands;
use crate::framebuffer::{attachment_label, AttachmentSlot};
use crate::geometry::{SurfaceSize, Viewport};
use crate::gl::types::{GLenum, GLuint};
use crate::image_format::Rgba8;
use crate::texture::{CubemapFace, RenderTexture, SharedTexture, TextureWrap};
use crate::{GlObject, SurfaceError};

/// Trait for pixel stores that can hold rendered content.
pub trait RenderSurfaceAttachment {
    /// Returns the size of this pixel store.
    fn size(&self) -> SurfaceSize;

    /// Resizes this pixel store. A no-op when the size is unchanged.
    fn set_size(&mut self, size: SurfaceSize);

    /// Returns the pixel format of this store.
    fn pixel_format(&self) -> GLenum;

    /// Returns the number of samples per pixel.
    fn pixel_samples(&self) -> u32 {
        1
    }

    /// Replaces a rectangle of pixels in this store.
    fn replace_pixels(&mut self, rect: Viewport, pixels: &[Rgba8])
                      -> Result<(), SurfaceError>;
}

/// Trait for pixel stores that can be bound into a framebuffer slot.
pub trait FramebufferAttachment: RenderSurfaceAttachment {
    /// Binds this store into `slot` of the framebuffer `fb_id`.
    fn bind_to_framebuffer(&mut self, fb_id: GLuint, slot: AttachmentSlot);

    /// Empties `slot` of the framebuffer `fb_id`.
    fn unbind_from_framebuffer(&mut self, fb_id: GLuint, slot: AttachmentSlot);

    /// Derives a debug label for this store from the label of the
    /// framebuffer it is attached to, if it has none of its own.
    fn derive_label_from_framebuffer(&mut self, fb_label: &str, slot: AttachmentSlot);
}

/// An attachment shared between a framebuffer and whoever created it. The
/// same handle may occupy both the depth and the stencil slot of one
/// framebuffer when its format packs both kinds of bits.
pub type SharedAttachment = Rc<std::cell::RefCell<dyn FramebufferAttachment>>;

/// A GPU renderbuffer: pixel storage optimized for rendering, which cannot
/// be sampled as a texture.
///
/// A renderbuffer either manages its own GL object (generated lazily on
/// first use, deleted on drop) or wraps an id supplied by the host, which
/// is never deleted here.
pub struct Renderbuffer {
    gl: Rc<dyn GlCommands>,
    id: Cell<GLuint>,
    size: SurfaceSize,
    format: GLenum,
    samples: u32,
    is_managing_gl: bool,
    label: String,
}

impl Renderbuffer {
    /// Builds a new single-sample renderbuffer of the given format.
    ///
    /// Storage is allocated once the renderbuffer receives a size.
    pub fn new(gl: &Rc<dyn GlCommands>, format: GLenum) -> Renderbuffer {
        Renderbuffer::with_pixel_samples(gl, format, 1)
    }

    /// Builds a new renderbuffer of the given format and sample count.
    pub fn with_pixel_samples(gl: &Rc<dyn GlCommands>, format: GLenum,
                              samples: u32) -> Renderbuffer {
        Renderbuffer {
            gl: gl.clone(),
            id: Cell::new(0),
            size: SurfaceSize::ZERO,
            format,
            samples,
            is_managing_gl: true,
            label: String::new(),
        }
    }

    /// Wraps a renderbuffer created by the host. The id is never deleted
    /// here, and its storage is assumed to be managed by the host as well.
    pub fn from_existing(gl: &Rc<dyn GlCommands>, format: GLenum, samples: u32,
                         rb_id: GLuint) -> Renderbuffer {
        Renderbuffer {
            gl: gl.clone(),
            id: Cell::new(rb_id),
            size: SurfaceSize::ZERO,
            format,
            samples,
            is_managing_gl: false,
            label: String::new(),
        }
    }

    /// Returns the GL object id, generating the object on first use when
    /// self-managed.
    pub fn renderbuffer_id(&self) -> GLuint {
        if self.is_managing_gl && self.id.get() == 0 {
            self.id.set(self.gl.generate_renderbuffer());
        }
        self.id.get()
    }

    /// Returns true if the GL object lifetime is managed here.
    pub fn is_managing_gl(&self) -> bool {
        self.is_managing_gl
    }

    /// Binds this renderbuffer as the current renderbuffer.
    pub fn bind(&self) {
        self.gl.bind_renderbuffer(self.renderbuffer_id());
    }

    /// Returns the debug label, or an empty string if none was set.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Sets the debug label. Applied to the GL object as well once it
    /// exists.
    pub fn set_label(&mut self, label: &str) {
        self.label = label.to_owned();
        if !self.label.is_empty() && self.id.get() != 0 {
            self.gl.set_renderbuffer_label(self.id.get(), &self.label);
        }
    }
}

impl RenderSurfaceAttachment for Renderbuffer {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn set_size(&mut self, size: SurfaceSize) {
        if size == self.size {
            return;
        }

        self.size = size;

        if self.is_managing_gl {
            trace!("allocating {}x{} renderbuffer storage for {}",
                   size.width, size.height,
                   if self.label.is_empty() { "renderbuffer" } else { self.label.as_str() });
            self.gl.allocate_renderbuffer_storage(self.renderbuffer_id(), size,
                                                  self.format, self.samples);
        }
    }

    fn pixel_format(&self) -> GLenum {
        self.format
    }

    fn pixel_samples(&self) -> u32 {
        self.samples
    }

    fn replace_pixels(&mut self, _rect: Viewport, _pixels: &[Rgba8])
                      -> Result<(), SurfaceError> {
        Err(SurfaceError::UnsupportedOperation {
            target: "renderbuffer",
            operation: "pixel replacement",
        })
    }
}

impl FramebufferAttachment for Renderbuffer {
    fn bind_to_framebuffer(&mut self, fb_id: GLuint, slot: AttachmentSlot) {
        self.gl.attach_renderbuffer(self.renderbuffer_id(), fb_id, slot);
    }

    fn unbind_from_framebuffer(&mut self, fb_id: GLuint, slot: AttachmentSlot) {
        self.gl.attach_renderbuffer(0, fb_id, slot);
    }

    fn derive_label_from_framebuffer(&mut self, fb_label: &str, slot: AttachmentSlot) {
        if self.label.is_empty() {
            let derived = attachment_label(fb_label, slot);
            if !derived.is_empty() {
                self.set_label(&derived);
            }
        }
    }
}

impl GlObject for Renderbuffer {
    type Id = GLuint;

    fn get_id(&self) -> GLuint {
        self.renderbuffer_id()
    }
}

impl Drop for Renderbuffer {
    fn drop(&mut self) {
        if self.is_managing_gl && self.id.get() != 0 {
            self.gl.delete_renderbuffer(self.id.get());
        }
    }
}

/// The texture reference held by a `TextureAttachment`.
///
/// When the attachment belongs to a surface that the texture itself owns
/// (a texture rendering its own content, as in environment capture), a
/// strong reference would keep the texture alive through its own render
/// surface. The weak variant breaks that cycle.
enum TextureRef {
    None,
    Strong(SharedTexture),
    Weak(Weak<std::cell::RefCell<dyn RenderTexture>>),
}

/// An attachment that renders into a face of a texture.
pub struct TextureAttachment {
    gl: Rc<dyn GlCommands>,
    texture: TextureRef,
    face: Option<CubemapFace>,
    mipmap_level: u32,
    uses_strong_reference: bool,
}

impl TextureAttachment {
    /// Builds an attachment on the given texture, starting on the face the
    /// texture reports as its initial attachment face.
    pub fn new(gl: &Rc<dyn GlCommands>, texture: SharedTexture) -> TextureAttachment {
        let face = texture.borrow().initial_attachment_face();
        TextureAttachment::with_face_and_mipmap(gl, texture, face, 0)
    }

    /// Builds an attachment on the given face of a texture.
    pub fn with_face(gl: &Rc<dyn GlCommands>, texture: SharedTexture,
                     face: Option<CubemapFace>) -> TextureAttachment {
        TextureAttachment::with_face_and_mipmap(gl, texture, face, 0)
    }

    /// Builds an attachment on the given face and mipmap level of a
    /// texture.
    pub fn with_face_and_mipmap(gl: &Rc<dyn GlCommands>, texture: SharedTexture,
                                face: Option<CubemapFace>, mipmap_level: u32)
                                -> TextureAttachment {
        let mut attachment = TextureAttachment {
            gl: gl.clone(),
            texture: TextureRef::None,
            face,
            mipmap_level,
            uses_strong_reference: true,
        };
        attachment.set_texture(Some(texture));
        attachment
    }

    /// Returns the attached texture, or `None` if a weakly held texture has
    /// been dropped.
    pub fn texture(&self) -> Option<SharedTexture> {
        match self.texture {
            TextureRef::None => None,
            TextureRef::Strong(ref texture) => Some(texture.clone()),
            TextureRef::Weak(ref texture) => texture.upgrade(),
        }
    }

    /// Returns the attached texture.
    ///
    /// # Panics
    ///
    /// Panics if there is no texture, or if a weakly held texture has been
    /// dropped while still attached.
    fn required_texture(&self) -> SharedTexture {
        match self.texture() {
            Some(texture) => texture,
            None => panic!("the texture backing this attachment is gone"),
        }
    }

    /// Installs a texture into this attachment.
    ///
    /// Render targets must not wrap, so the texture's wrapping functions
    /// are forced to clamp-to-edge on both axes before it is stored.
    pub fn set_texture(&mut self, texture: Option<SharedTexture>) {
        let current = self.texture();
        match (&current, &texture) {
            // Compare data pointers only; vtable pointers of trait objects
            // are not unique per type.
            (Some(old), Some(new))
                if Rc::as_ptr(old).cast::<()>() == Rc::as_ptr(new).cast::<()>() => return,
            (None, None) => return,
            _ => {},
        }

        if let Some(ref texture) = texture {
            let mut texture = texture.borrow_mut();
            texture.set_horizontal_wrap(TextureWrap::ClampToEdge);
            texture.set_vertical_wrap(TextureWrap::ClampToEdge);
        }

        self.store_texture(texture);
    }

    /// Returns whether this attachment keeps its texture alive.
    pub fn uses_strong_reference(&self) -> bool {
        self.uses_strong_reference
    }

    /// Switches between owning and merely observing the texture. The
    /// reference currently held is rewrapped accordingly.
    pub fn set_uses_strong_reference(&mut self, uses_strong_reference: bool) {
        if uses_strong_reference == self.uses_strong_reference {
            return;
        }
        let current = self.texture();
        self.uses_strong_reference = uses_strong_reference;
        self.store_texture(current);
    }

    fn store_texture(&mut self, texture: Option<SharedTexture>) {
        self.texture = match texture {
            None => TextureRef::None,
            Some(texture) if self.uses_strong_reference => TextureRef::Strong(texture),
            Some(texture) => TextureRef::Weak(Rc::downgrade(&texture)),
        };
    }

    /// Returns the texture face this attachment renders into.
    pub fn face(&self) -> Option<CubemapFace> {
        self.face
    }

    /// Sets the texture face this attachment renders into.
    pub fn set_face(&mut self, face: Option<CubemapFace>) {
        self.face = face;
    }

    /// Returns the mipmap level this attachment renders into.
    pub fn mipmap_level(&self) -> u32 {
        self.mipmap_level
    }

    /// Sets the mipmap level this attachment renders into.
    pub fn set_mipmap_level(&mut self, mipmap_level: u32) {
        self.mipmap_level = mipmap_level;
    }
}

impl RenderSurfaceAttachment for TextureAttachment {
    fn size(&self) -> SurfaceSize {
        self.required_texture().borrow().size()
    }

    fn set_size(&mut self, size: SurfaceSize) {
        self.required_texture().borrow_mut().resize(size);
    }

    fn pixel_format(&self) -> GLenum {
        self.required_texture().borrow().pixel_format()
    }

    fn replace_pixels(&mut self, rect: Viewport, pixels: &[Rgba8])
                      -> Result<(), SurfaceError> {
        self.required_texture().borrow_mut().replace_pixels(rect, self.face, pixels)
    }
}

impl FramebufferAttachment for TextureAttachment {
    fn bind_to_framebuffer(&mut self, fb_id: GLuint, slot: AttachmentSlot) {
        let texture_id = self.required_texture().borrow().texture_id();
        self.gl.attach_texture(texture_id, self.face, self.mipmap_level, fb_id, slot);
    }

    fn unbind_from_framebuffer(&mut self, fb_id: GLuint, slot: AttachmentSlot) {
        self.gl.attach_texture(0, self.face, self.mipmap_level, fb_id, slot);
    }

    fn derive_label_from_framebuffer(&mut self, fb_label: &str, slot: AttachmentSlot) {
        let texture = self.required_texture();
        let mut texture = texture.borrow_mut();
        if texture.label().is_empty() {
            let derived = attachment_label(fb_label, slot);
            if !derived.is_empty() {
                texture.set_label(&derived);
            }
        }
    }
}
