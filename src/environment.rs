/*!
Cube-map environment capture.

An [`EnvironmentMapTexture`] renders snapshots of the scene into the six
faces of a cube texture, for use in reflections and other environment
effects. Capturing all six faces every frame is rarely affordable, so the
work is amortized: a fractional faces-per-snapshot rate accumulates across
calls, and each call renders however many whole faces the accumulator has
earned. Over many calls the average rate converges on the configured value
even when it is fractional.

Faces are visited in the fixed order +X, −X, +Y, −Y, +Z, −Z, wrapping back
to +X, which matches the layout cube-map consumers expect.
*/
use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;

use crate::context::GlCommands;
use crate::framebuffer::{AttachmentSlot, Framebuffer, FramebufferAttachment,
                         RenderSurface, Renderbuffer, SharedAttachment,
                         TextureAttachment};
use crate::geometry::{SurfacePoint, SurfaceSize, Viewport};
use crate::gl::types::GLenum;
use crate::image_format::Rgba8;
use crate::texture::{CubemapFace, SharedTexture};

/// The camera used to render environment snapshots.
///
/// Implemented by the host engine's camera node.
pub trait EnvironmentCamera {
    /// Moves the camera to a location in the scene.
    fn set_location(&mut self, location: Vec3);

    /// Points the camera along a direction.
    fn set_forward_direction(&mut self, direction: Vec3);

    /// Orients the top of the camera towards a direction.
    fn set_reference_up_direction(&mut self, up: Vec3);

    /// Returns the distance to the near clipping plane.
    fn near_clipping_distance(&self) -> f32;

    /// Sets the distance to the near clipping plane.
    fn set_near_clipping_distance(&mut self, distance: f32);

    /// Returns the distance to the far clipping plane.
    fn far_clipping_distance(&self) -> f32;

    /// Sets the distance to the far clipping plane.
    fn set_far_clipping_distance(&mut self, distance: f32);
}

/// A camera shared between the scene and the capture machinery.
pub type SharedCamera = Rc<RefCell<dyn EnvironmentCamera>>;

/// The scene being captured.
///
/// Implemented by the host engine's scene object.
pub trait EnvironmentScene {
    /// Returns the camera the scene is currently viewed through, if any.
    fn active_camera(&self) -> Option<SharedCamera>;

    /// Returns the dedicated camera used for environment snapshots.
    fn environment_camera(&self) -> SharedCamera;

    /// Renders the scene's environment content into the given surface,
    /// through the environment camera.
    fn draw_scene_content_for_environment_map(&mut self, surface: &Framebuffer);
}

/// A cube texture that captures snapshots of the scene, one or more faces
/// at a time.
///
/// The capture framebuffer's color attachment refers back to this
/// texture's cube faces. The attachment holds the texture weakly: the
/// texture (via its owner) keeps the surface alive, not the other way
/// around.
pub struct EnvironmentMapTexture {
    texture: SharedTexture,
    render_surface: Framebuffer,
    color_attachment: Rc<RefCell<TextureAttachment>>,
    current_face: Option<CubemapFace>,
    face_count: f32,
    faces_per_snapshot: f32,
}

impl EnvironmentMapTexture {
    /// Builds a capture texture over the given cube texture, with a
    /// 16-bit depth renderbuffer.
    pub fn new(gl: &Rc<dyn GlCommands>, texture: SharedTexture,
               side_length: u32) -> EnvironmentMapTexture {
        EnvironmentMapTexture::with_depth_format(gl, texture, side_length,
                                                 crate::gl::DEPTH_COMPONENT16)
    }

    /// Builds a capture texture with a depth renderbuffer of the given
    /// format.
    pub fn with_depth_format(gl: &Rc<dyn GlCommands>, texture: SharedTexture,
                             side_length: u32, depth_format: GLenum)
                             -> EnvironmentMapTexture {
        let depth: SharedAttachment =
            Rc::new(RefCell::new(Renderbuffer::new(gl, depth_format)));
        EnvironmentMapTexture::with_depth_attachment(gl, texture, side_length, depth)
    }

    /// Builds a capture texture with the given depth attachment.
    pub fn with_depth_attachment(gl: &Rc<dyn GlCommands>, texture: SharedTexture,
                                 side_length: u32, depth: SharedAttachment)
                                 -> EnvironmentMapTexture {
        let mut render_surface = Framebuffer::new(gl);

        // The attachment must observe rather than own the texture, since
        // the texture transitively owns this surface.
        let mut color = TextureAttachment::new(gl, texture.clone());
        color.set_uses_strong_reference(false);
        let color = Rc::new(RefCell::new(color));
        let installed: SharedAttachment = color.clone();

        render_surface.set_color_attachment(Some(installed));
        render_surface.set_depth_attachment(Some(depth));
        render_surface.set_size(SurfaceSize::new(side_length, side_length));
        render_surface.validate();

        EnvironmentMapTexture {
            texture,
            render_surface,
            color_attachment: color,
            current_face: None,
            face_count: 0.0,
            faces_per_snapshot: 1.0,
        }
    }

    /// Returns the cube texture snapshots are captured into.
    pub fn texture(&self) -> &SharedTexture {
        &self.texture
    }

    /// Returns the surface snapshots are rendered through.
    pub fn render_surface(&self) -> &Framebuffer {
        &self.render_surface
    }

    /// Returns the face that was rendered most recently, or `None` before
    /// the first capture.
    pub fn current_face(&self) -> Option<CubemapFace> {
        self.current_face
    }

    /// Returns the number of faces rendered per snapshot call.
    pub fn faces_per_snapshot(&self) -> f32 {
        self.faces_per_snapshot
    }

    /// Sets the number of faces rendered per snapshot call, clamped to
    /// between zero and six. Fractional values spread single faces over
    /// several calls.
    pub fn set_faces_per_snapshot(&mut self, faces_per_snapshot: f32) {
        self.faces_per_snapshot = faces_per_snapshot.clamp(0.0, 6.0);
    }

    /// Labels the capture surface after this texture.
    pub fn set_label(&mut self, label: &str) {
        self.texture.borrow_mut().set_label(label);
        self.render_surface.set_label(&format!("{} surface", label));
    }

    /// Returns the number of whole faces to render on this snapshot.
    ///
    /// The fractional rate is added to a running count, the whole part is
    /// taken out and returned. What remains carries over, so the long-run
    /// average of the returned values converges on the configured rate.
    pub fn faces_to_generate(&mut self) -> u32 {
        self.face_count += self.faces_per_snapshot;
        let faces = self.face_count as u32;
        self.face_count -= faces as f32;
        faces
    }

    /// Advances to the next face in capture order, starting at +X both
    /// initially and after −Z.
    fn move_to_next_face(&mut self) {
        self.current_face = Some(match self.current_face {
            Some(CubemapFace::PositiveX) => CubemapFace::NegativeX,
            Some(CubemapFace::NegativeX) => CubemapFace::PositiveY,
            Some(CubemapFace::PositiveY) => CubemapFace::NegativeY,
            Some(CubemapFace::NegativeY) => CubemapFace::PositiveZ,
            Some(CubemapFace::PositiveZ) => CubemapFace::NegativeZ,
            Some(CubemapFace::NegativeZ) | None => CubemapFace::PositiveX,
        });
    }

    /// The direction to point the camera to render a face.
    fn camera_direction(face: CubemapFace) -> Vec3 {
        match face {
            CubemapFace::PositiveX => Vec3::X,
            CubemapFace::NegativeX => Vec3::NEG_X,
            CubemapFace::PositiveY => Vec3::Y,
            CubemapFace::NegativeY => Vec3::NEG_Y,
            CubemapFace::PositiveZ => Vec3::Z,
            CubemapFace::NegativeZ => Vec3::NEG_Z,
        }
    }

    /// The direction to orient the top of the camera to render a face.
    fn up_direction(face: CubemapFace) -> Vec3 {
        match face {
            CubemapFace::PositiveX => Vec3::NEG_Y,
            CubemapFace::NegativeX => Vec3::NEG_Y,
            CubemapFace::PositiveY => Vec3::Z,
            CubemapFace::NegativeY => Vec3::NEG_Z,
            CubemapFace::PositiveZ => Vec3::NEG_Y,
            CubemapFace::NegativeZ => Vec3::NEG_Y,
        }
    }

    /// Captures the scene as viewed from `location` into the faces whose
    /// turn has come up, if any.
    ///
    /// The near and far clipping distances are copied from the scene's
    /// active camera when one exists, so the captured content matches what
    /// the live view can see.
    pub fn generate_snapshot_of_scene(&mut self, scene: &mut dyn EnvironmentScene,
                                      location: Vec3) {
        let faces = self.faces_to_generate();
        if faces == 0 {
            return;
        }

        let camera = scene.environment_camera();
        camera.borrow_mut().set_location(location);

        if let Some(scene_camera) = scene.active_camera() {
            let (near, far) = {
                let scene_camera = scene_camera.borrow();
                (scene_camera.near_clipping_distance(),
                 scene_camera.far_clipping_distance())
            };
            let mut camera = camera.borrow_mut();
            camera.set_near_clipping_distance(near);
            camera.set_far_clipping_distance(far);
        }

        for _ in 0..faces {
            self.move_to_next_face();
            let face = self.current_face.unwrap_or(CubemapFace::PositiveX);

            // Bind the texture face to the capture framebuffer.
            {
                let mut attachment = self.color_attachment.borrow_mut();
                attachment.set_face(Some(face));
                attachment.bind_to_framebuffer(self.render_surface.framebuffer_id(),
                                               AttachmentSlot::Color);
            }

            // Point the camera towards the face.
            {
                let mut camera = camera.borrow_mut();
                camera.set_forward_direction(Self::camera_direction(face));
                camera.set_reference_up_direction(Self::up_direction(face));
            }

            scene.draw_scene_content_for_environment_map(&self.render_surface);
        }
    }

    /// Fills the current face with a solid color that identifies it.
    ///
    /// Useful while diagnosing which face is which: +X red, −X cyan,
    /// +Y green, −Y magenta, +Z blue, −Z yellow.
    pub fn paint_face(&mut self) {
        let face_size = self.render_surface.size();
        let canvas = vec![self.face_color(); face_size.pixel_count()];
        let rect = Viewport::from_origin_and_size(SurfacePoint::ZERO, face_size);
        self.render_surface.replace_color_pixels(rect, &canvas)
            .expect("texture-backed capture surface rejected pixel replacement");
    }

    fn face_color(&self) -> Rgba8 {
        match self.current_face {
            Some(CubemapFace::PositiveX) => Rgba8::new(255, 0, 0, 255),
            Some(CubemapFace::NegativeX) => Rgba8::new(0, 255, 255, 255),
            Some(CubemapFace::PositiveY) => Rgba8::new(0, 255, 0, 255),
            Some(CubemapFace::NegativeY) => Rgba8::new(255, 0, 255, 255),
            Some(CubemapFace::PositiveZ) => Rgba8::new(0, 0, 255, 255),
            Some(CubemapFace::NegativeZ) => Rgba8::new(255, 255, 0, 255),
            None => Rgba8::new(255, 255, 255, 255),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_orientations_follow_cube_map_convention() {
        use CubemapFace::*;
        let table = [
            (PositiveX, Vec3::X, Vec3::NEG_Y),
            (NegativeX, Vec3::NEG_X, Vec3::NEG_Y),
            (PositiveY, Vec3::Y, Vec3::Z),
            (NegativeY, Vec3::NEG_Y, Vec3::NEG_Z),
            (PositiveZ, Vec3::Z, Vec3::NEG_Y),
            (NegativeZ, Vec3::NEG_Z, Vec3::NEG_Y),
        ];
        for (face, forward, up) in table {
            assert_eq!(EnvironmentMapTexture::camera_direction(face), forward);
            assert_eq!(EnvironmentMapTexture::up_direction(face), up);
        }
    }
}
