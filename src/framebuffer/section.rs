/*!
A rectangular section of another render surface.

A `SurfaceSection` shares the GPU storage of its base surface and restricts
rendering to a sub-rectangle of it through the GL scissor. When the section
happens to cover the whole base surface, clipping is skipped entirely.
*/
use std::rc::Rc;

use crate::context::GlCommands;
use crate::framebuffer::{RenderSurface, SharedAttachment, SharedSurface};
use crate::geometry::{SurfacePoint, SurfaceSize, Viewport};
use crate::image_format::Rgba8;
use crate::SurfaceError;

/// A section of a base surface, clipped through the GL scissor.
pub struct SurfaceSection {
    gl: Rc<dyn GlCommands>,
    base: SharedSurface,
    origin: SurfacePoint,
    size: SurfaceSize,
    covers_base: bool,
}

impl SurfaceSection {
    /// Builds a section covering the whole of `base`.
    pub fn new(gl: &Rc<dyn GlCommands>, base: SharedSurface) -> SurfaceSection {
        let size = base.borrow().size();
        let mut section = SurfaceSection {
            gl: gl.clone(),
            base,
            origin: SurfacePoint::ZERO,
            size,
            covers_base: false,
        };
        section.check_coverage();
        section
    }

    /// Returns the surface this section is a part of.
    pub fn base_surface(&self) -> &SharedSurface {
        &self.base
    }

    /// Returns the position of this section on its base surface.
    pub fn origin(&self) -> SurfacePoint {
        self.origin
    }

    /// Moves this section on its base surface.
    pub fn set_origin(&mut self, origin: SurfacePoint) {
        self.origin = origin;
        self.check_coverage();
    }

    /// Refreshes the cached full-coverage flag for this section alone.
    fn check_coverage(&mut self) {
        self.covers_base = self.origin.is_zero() && self.size == self.base.borrow().size();
    }

    /// Offsets a rectangle by the origin of this section.
    fn transform_rect(&self, rect: Viewport) -> Viewport {
        rect.translated_by(self.origin)
    }

    /// Starts clipping to this section's rectangle, unless the section
    /// covers its base surface entirely.
    fn open_scissors(&self) {
        let should_clip = !self.is_full_coverage();
        self.gl.set_scissor_test(should_clip);
        if should_clip {
            self.gl.set_scissor(self.viewport());
        }
    }

    /// Stops clipping.
    fn close_scissors(&self) {
        self.gl.set_scissor_test(false);
    }
}

impl RenderSurface for SurfaceSection {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn set_size(&mut self, size: SurfaceSize) {
        self.size = size;
        self.check_coverage();
    }

    fn viewport(&self) -> Viewport {
        Viewport::from_origin_and_size(self.origin, self.size)
    }

    fn is_on_screen(&self) -> bool {
        self.base.borrow().is_on_screen()
    }

    fn is_full_coverage(&self) -> bool {
        self.covers_base && self.base.borrow().is_full_coverage()
    }

    fn color_attachment(&self) -> Option<SharedAttachment> {
        self.base.borrow().color_attachment()
    }

    fn depth_attachment(&self) -> Option<SharedAttachment> {
        self.base.borrow().depth_attachment()
    }

    fn stencil_attachment(&self) -> Option<SharedAttachment> {
        self.base.borrow().stencil_attachment()
    }

    fn clear_color_content(&self) {
        self.open_scissors();
        self.base.borrow().clear_color_content();
        self.close_scissors();
    }

    fn clear_depth_content(&self) {
        self.open_scissors();
        self.base.borrow().clear_depth_content();
        self.close_scissors();
    }

    fn clear_stencil_content(&self) {
        self.open_scissors();
        self.base.borrow().clear_stencil_content();
        self.close_scissors();
    }

    fn clear_color_and_depth_content(&self) {
        self.open_scissors();
        self.base.borrow().clear_color_and_depth_content();
        self.close_scissors();
    }

    fn read_color_content(&self, rect: Viewport) -> Vec<Rgba8> {
        self.base.borrow().read_color_content(self.transform_rect(rect))
    }

    fn replace_color_pixels(&self, rect: Viewport, pixels: &[Rgba8])
                            -> Result<(), SurfaceError> {
        self.base.borrow().replace_color_pixels(self.transform_rect(rect), pixels)
    }

    /// Activates the base surface, then opens the scissor clip. The clip
    /// stays open for the draw calls that follow; it is closed by whichever
    /// section is activated next, or explicitly by the caller.
    fn activate(&self) {
        self.base.borrow().activate();
        self.open_scissors();
    }
}
