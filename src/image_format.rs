/*!
Helpers for reasoning about renderbuffer and texture pixel formats.

Formats are carried as raw `GLenum` values throughout the crate, the same
values the GL engine itself consumes. The functions here answer the few
questions the surface machinery needs: whether a depth format packs stencil
bits, what texel format and type match a renderbuffer format, and how to
name a completeness status in a diagnostic message.
*/
use crate::gl;
use crate::gl::types::GLenum;

/// A single RGBA pixel with 8 bits per component, in memory order.
///
/// This is the layout produced by `glReadPixels` with `GL_RGBA` /
/// `GL_UNSIGNED_BYTE` and accepted by the pixel-replacement operations.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Rgba8 {
    /// Red component.
    pub r: u8,
    /// Green component.
    pub g: u8,
    /// Blue component.
    pub b: u8,
    /// Alpha component.
    pub a: u8,
}

impl Rgba8 {
    /// Builds a pixel from its four components.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Rgba8 {
        Rgba8 { r, g, b, a }
    }
}

/// Returns true if `format` is a depth format that also packs stencil bits.
///
/// A framebuffer whose depth attachment uses such a format serves stencil
/// operations from the same pixel store, so the attachment is installed in
/// both the depth and the stencil slot.
pub fn depth_format_includes_stencil(format: GLenum) -> bool {
    matches!(format, gl::DEPTH_STENCIL | gl::DEPTH24_STENCIL8 | gl::DEPTH32F_STENCIL8)
}

/// Returns a depth format equivalent to `format` but without stencil bits.
///
/// Formats that carry no stencil bits are returned unchanged.
pub fn depth_format_without_stencil(format: GLenum) -> GLenum {
    if depth_format_includes_stencil(format) {
        gl::DEPTH_COMPONENT24
    } else {
        format
    }
}

/// Returns the texel format matching a renderbuffer color format.
pub fn texel_format_from_color_format(format: GLenum) -> GLenum {
    match format {
        gl::RGB565 | gl::RGB8 => gl::RGB,
        _ => gl::RGBA,
    }
}

/// Returns the texel type matching a renderbuffer color format.
pub fn texel_type_from_color_format(format: GLenum) -> GLenum {
    match format {
        gl::RGB565 => gl::UNSIGNED_SHORT_5_6_5,
        gl::RGBA4 => gl::UNSIGNED_SHORT_4_4_4_4,
        gl::RGB5_A1 => gl::UNSIGNED_SHORT_5_5_5_1,
        _ => gl::UNSIGNED_BYTE,
    }
}

/// Returns the texel format matching a renderbuffer depth format.
pub fn texel_format_from_depth_format(format: GLenum) -> GLenum {
    match format {
        gl::DEPTH_STENCIL | gl::DEPTH24_STENCIL8 | gl::DEPTH32F_STENCIL8 => gl::DEPTH_STENCIL,
        _ => gl::DEPTH_COMPONENT,
    }
}

/// Returns the texel type matching a renderbuffer depth format.
pub fn texel_type_from_depth_format(format: GLenum) -> GLenum {
    match format {
        gl::DEPTH_STENCIL | gl::DEPTH24_STENCIL8 => gl::UNSIGNED_INT_24_8,
        gl::DEPTH_COMPONENT24 => gl::UNSIGNED_INT,
        _ => gl::UNSIGNED_SHORT,
    }
}

/// Returns a human-readable name for a framebuffer completeness status.
pub fn framebuffer_status_name(status: GLenum) -> &'static str {
    match status {
        gl::FRAMEBUFFER_COMPLETE => "FRAMEBUFFER_COMPLETE",
        gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => "FRAMEBUFFER_INCOMPLETE_ATTACHMENT",
        gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => {
            "FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT"
        },
        gl::FRAMEBUFFER_INCOMPLETE_DIMENSIONS => "FRAMEBUFFER_INCOMPLETE_DIMENSIONS",
        gl::FRAMEBUFFER_INCOMPLETE_MULTISAMPLE => "FRAMEBUFFER_INCOMPLETE_MULTISAMPLE",
        gl::FRAMEBUFFER_UNSUPPORTED => "FRAMEBUFFER_UNSUPPORTED",
        _ => "unknown framebuffer status",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl;

    #[test]
    fn stencil_packing() {
        assert!(depth_format_includes_stencil(gl::DEPTH24_STENCIL8));
        assert!(depth_format_includes_stencil(gl::DEPTH32F_STENCIL8));
        assert!(!depth_format_includes_stencil(gl::DEPTH_COMPONENT16));
        assert!(!depth_format_includes_stencil(gl::DEPTH_COMPONENT24));
    }

    #[test]
    fn stripping_stencil_bits() {
        assert_eq!(depth_format_without_stencil(gl::DEPTH24_STENCIL8),
                   gl::DEPTH_COMPONENT24);
        assert_eq!(depth_format_without_stencil(gl::DEPTH_COMPONENT16),
                   gl::DEPTH_COMPONENT16);
    }

    #[test]
    fn texel_derivation() {
        assert_eq!(texel_format_from_color_format(gl::RGB565), gl::RGB);
        assert_eq!(texel_format_from_color_format(gl::RGBA8), gl::RGBA);
        assert_eq!(texel_type_from_color_format(gl::RGBA4),
                   gl::UNSIGNED_SHORT_4_4_4_4);
        assert_eq!(texel_format_from_depth_format(gl::DEPTH24_STENCIL8),
                   gl::DEPTH_STENCIL);
        assert_eq!(texel_type_from_depth_format(gl::DEPTH_COMPONENT24),
                   gl::UNSIGNED_INT);
        assert_eq!(texel_type_from_depth_format(gl::DEPTH_COMPONENT16),
                   gl::UNSIGNED_SHORT);
    }
}
