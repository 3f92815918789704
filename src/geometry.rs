/*!
Integer geometry used to describe surfaces: sizes, points and viewport
rectangles.

All values are in pixels. A viewport's origin is its lower-left corner, in
GL window coordinates.
*/

/// The size of a surface, in pixels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SurfaceSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl SurfaceSize {
    /// A size of zero width and zero height.
    pub const ZERO: SurfaceSize = SurfaceSize { width: 0, height: 0 };

    /// Builds a size from a width and a height.
    #[inline]
    pub const fn new(width: u32, height: u32) -> SurfaceSize {
        SurfaceSize { width, height }
    }

    /// Returns true if either dimension is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns this size with both dimensions multiplied by `factor`.
    #[inline]
    pub fn scaled_by(self, factor: u32) -> SurfaceSize {
        SurfaceSize::new(self.width * factor, self.height * factor)
    }

    /// Returns the number of pixels covered by this size.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// A position on a surface, in pixels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SurfacePoint {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl SurfacePoint {
    /// The origin point `(0, 0)`.
    pub const ZERO: SurfacePoint = SurfacePoint { x: 0, y: 0 };

    /// Builds a point from its coordinates.
    #[inline]
    pub const fn new(x: i32, y: i32) -> SurfacePoint {
        SurfacePoint { x, y }
    }

    /// Returns true if both coordinates are zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.x == 0 && self.y == 0
    }
}

/// A rectangle on a surface, used for viewports, scissor clips and pixel
/// transfers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
    /// Horizontal coordinate of the lower-left corner.
    pub x: i32,
    /// Vertical coordinate of the lower-left corner.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Viewport {
    /// Builds a viewport from an origin and a size.
    #[inline]
    pub fn from_origin_and_size(origin: SurfacePoint, size: SurfaceSize) -> Viewport {
        Viewport {
            x: origin.x,
            y: origin.y,
            width: size.width,
            height: size.height,
        }
    }

    /// Returns the origin of this viewport.
    #[inline]
    pub fn origin(&self) -> SurfacePoint {
        SurfacePoint::new(self.x, self.y)
    }

    /// Returns the size of this viewport.
    #[inline]
    pub fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.width, self.height)
    }

    /// Returns this viewport offset by the coordinates of `origin`.
    #[inline]
    pub fn translated_by(self, origin: SurfacePoint) -> Viewport {
        Viewport {
            x: self.x + origin.x,
            y: self.y + origin.y,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sizes() {
        assert!(SurfaceSize::ZERO.is_zero());
        assert!(SurfaceSize::new(0, 4).is_zero());
        assert!(SurfaceSize::new(4, 0).is_zero());
        assert!(!SurfaceSize::new(4, 4).is_zero());
    }

    #[test]
    fn viewport_translation() {
        let rect = Viewport { x: 2, y: 3, width: 10, height: 20 };
        let moved = rect.translated_by(SurfacePoint::new(5, -1));
        assert_eq!(moved, Viewport { x: 7, y: 2, width: 10, height: 20 });
    }

    #[test]
    fn viewport_round_trips_origin_and_size() {
        let vp = Viewport::from_origin_and_size(SurfacePoint::new(8, 9),
                                                SurfaceSize::new(64, 32));
        assert_eq!(vp.origin(), SurfacePoint::new(8, 9));
        assert_eq!(vp.size(), SurfaceSize::new(64, 32));
    }
}
