/*!
The texture collaborator interface.

Texture objects are created and owned by the host engine's resource layer;
this library only needs to resize them, attach their faces to framebuffers
and push pixels into them. The [`RenderTexture`] trait captures exactly
that surface.
*/
use std::cell::RefCell;
use std::rc::Rc;

use crate::geometry::{SurfaceSize, Viewport};
use crate::gl;
use crate::gl::types::{GLenum, GLuint};
use crate::image_format::Rgba8;
use crate::SurfaceError;

/// A texture that can serve as a framebuffer attachment, shared between the
/// resource layer and the surfaces that render into it.
pub type SharedTexture = Rc<RefCell<dyn RenderTexture>>;

/// A texture coordinate wrapping function.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextureWrap {
    /// Tile the texture.
    Repeat,
    /// Tile the texture, mirroring at every repetition.
    MirroredRepeat,
    /// Clamp coordinates to the edge texel.
    ClampToEdge,
}

impl TextureWrap {
    /// Returns the GL enum for this wrapping function.
    pub fn gl_enum(self) -> GLenum {
        match self {
            TextureWrap::Repeat => gl::REPEAT,
            TextureWrap::MirroredRepeat => gl::MIRRORED_REPEAT,
            TextureWrap::ClampToEdge => gl::CLAMP_TO_EDGE,
        }
    }
}

/// One face of a cube-map texture.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CubemapFace {
    /// The face looking along the positive X axis.
    PositiveX,
    /// The face looking along the negative X axis.
    NegativeX,
    /// The face looking along the positive Y axis.
    PositiveY,
    /// The face looking along the negative Y axis.
    NegativeY,
    /// The face looking along the positive Z axis.
    PositiveZ,
    /// The face looking along the negative Z axis.
    NegativeZ,
}

impl CubemapFace {
    /// All six faces, in attachment order.
    pub const ALL: [CubemapFace; 6] = [
        CubemapFace::PositiveX,
        CubemapFace::NegativeX,
        CubemapFace::PositiveY,
        CubemapFace::NegativeY,
        CubemapFace::PositiveZ,
        CubemapFace::NegativeZ,
    ];

    /// Returns the GL texture-target enum for this face.
    pub fn gl_enum(self) -> GLenum {
        match self {
            CubemapFace::PositiveX => gl::TEXTURE_CUBE_MAP_POSITIVE_X,
            CubemapFace::NegativeX => gl::TEXTURE_CUBE_MAP_NEGATIVE_X,
            CubemapFace::PositiveY => gl::TEXTURE_CUBE_MAP_POSITIVE_Y,
            CubemapFace::NegativeY => gl::TEXTURE_CUBE_MAP_NEGATIVE_Y,
            CubemapFace::PositiveZ => gl::TEXTURE_CUBE_MAP_POSITIVE_Z,
            CubemapFace::NegativeZ => gl::TEXTURE_CUBE_MAP_NEGATIVE_Z,
        }
    }
}

/// Trait for textures usable as render targets.
///
/// Implemented by the host engine's texture resources. All operations are
/// synchronous and must be called on the thread owning the GL context.
pub trait RenderTexture {
    /// Returns the size of the texture, in pixels.
    fn size(&self) -> SurfaceSize;

    /// Resizes the texture's pixel storage.
    fn resize(&mut self, size: SurfaceSize);

    /// Returns the pixel format of the texture.
    fn pixel_format(&self) -> GLenum;

    /// Returns the GL object id of the texture.
    fn texture_id(&self) -> GLuint;

    /// Returns the face a new attachment of this texture should start on:
    /// the first cube face for cube maps, `None` for flat textures.
    fn initial_attachment_face(&self) -> Option<CubemapFace> {
        None
    }

    /// Sets the wrapping function for horizontal texture coordinates.
    fn set_horizontal_wrap(&mut self, wrap: TextureWrap);

    /// Sets the wrapping function for vertical texture coordinates.
    fn set_vertical_wrap(&mut self, wrap: TextureWrap);

    /// Replaces a rectangle of pixels on the given face of the texture.
    fn replace_pixels(&mut self, rect: Viewport, face: Option<CubemapFace>,
                      pixels: &[Rgba8]) -> Result<(), SurfaceError>;

    /// Returns the debug label of the texture, or an empty string if it has
    /// none.
    fn label(&self) -> String;

    /// Sets the debug label of the texture.
    fn set_label(&mut self, label: &str);
}
