/*!
Registries that keep groups of surfaces at a shared size.

A [`SurfaceManager`] holds non-owning references to surfaces and propagates
one size to all of them, so a window resize reaches every surface that must
track the window. The [`ViewSurfaceManager`] wraps the host's on-screen
surface pair and performs multisample resolution; it is built once during
renderer initialization and passed to whatever needs it. The
[`SceneDrawingSurfaceManager`] adds the scene's clipped view section and
its node-picking surface.
*/
use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::rc::{Rc, Weak};

use log::info;
use smallvec::SmallVec;

use crate::backend::Backend;
use crate::context::GlCommands;
use crate::framebuffer::{AttachmentSlot, Framebuffer, RenderSurface,
                         RenderSurfaceAttachment, Renderbuffer, SharedAttachment,
                         SharedSurface, SurfaceSection};
use crate::geometry::{SurfacePoint, SurfaceSize};
use crate::gl::types::GLenum;
use crate::image_format;

/// Identity comparison of shared surfaces. Compares the data pointers
/// only; vtable pointers of trait objects are not unique per type.
fn same_surface(a: &SharedSurface, b: &SharedSurface) -> bool {
    Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>()
}

/// A registry of surfaces resized together.
///
/// The registry holds weak references: surfaces stay owned by whoever
/// created them, and entries whose surface has been dropped are pruned as
/// they are encountered.
pub struct SurfaceManager {
    size: SurfaceSize,
    surfaces: Vec<Weak<RefCell<dyn RenderSurface>>>,
}

impl SurfaceManager {
    /// Builds an empty registry with no size.
    pub fn new() -> SurfaceManager {
        SurfaceManager {
            size: SurfaceSize::ZERO,
            surfaces: Vec::new(),
        }
    }

    /// Registers a surface. A surface already registered is ignored. The
    /// sizes of the registry and the surface are aligned: the registry
    /// adopts the surface's size while it has none of its own, otherwise
    /// the surface is resized to match.
    pub fn add_surface(&mut self, surface: &SharedSurface) {
        if self.contains(surface) {
            return;
        }

        self.surfaces.push(Rc::downgrade(surface));
        self.align_size_of_surface(surface);
    }

    /// Removes a surface from the registry.
    pub fn remove_surface(&mut self, surface: &SharedSurface) {
        self.surfaces.retain(|entry| {
            entry.upgrade().map_or(false, |live| !same_surface(&live, surface))
        });
    }

    fn contains(&self, surface: &SharedSurface) -> bool {
        self.surfaces.iter().any(|entry| {
            entry.upgrade().map_or(false, |live| same_surface(&live, surface))
        })
    }

    /// Returns the number of live surfaces in the registry.
    pub fn surface_count(&self) -> usize {
        self.surfaces.iter().filter(|entry| entry.upgrade().is_some()).count()
    }

    /// Returns the shared size of the registered surfaces.
    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    /// Resizes every registered surface. A surface already at the new size
    /// is a no-op inside its own `set_size`.
    pub fn set_size(&mut self, size: SurfaceSize) {
        if size == self.size {
            return;
        }

        self.size = size;

        self.surfaces.retain(|entry| entry.upgrade().is_some());
        for entry in &self.surfaces {
            if let Some(surface) = entry.upgrade() {
                surface.borrow_mut().set_size(size);
            }
        }
    }

    /// Aligns the size of a surface with this registry: while the registry
    /// has no size it adopts the surface's, otherwise the surface is
    /// resized to match.
    fn align_size_of_surface(&mut self, surface: &SharedSurface) {
        let my_size = self.size;
        let surface_size = surface.borrow().size();

        if my_size == surface_size {
            return;
        }

        if my_size.is_zero() {
            self.set_size(surface_size);
        } else {
            surface.borrow_mut().set_size(my_size);
        }
    }
}

impl Default for SurfaceManager {
    fn default() -> SurfaceManager {
        SurfaceManager::new()
    }
}

/// The manager of the host's on-screen surfaces.
///
/// Wraps the view framebuffer the host presents from and, when the host
/// set one up, the multisample framebuffer that scene content is actually
/// rendered into. Built once from the [`Backend`] during renderer
/// initialization; there is no hidden global instance.
pub struct ViewSurfaceManager {
    manager: SurfaceManager,
    gl: Rc<dyn GlCommands>,
    view_surface: Option<Rc<RefCell<Framebuffer>>>,
    multisample_surface: Option<Rc<RefCell<Framebuffer>>>,
    view_color_buffer: Option<Rc<RefCell<Renderbuffer>>>,
    multisample_color_buffer: Option<Rc<RefCell<Renderbuffer>>>,
}

impl ViewSurfaceManager {
    /// Builds the view surfaces from the identifiers and formats the host
    /// reports.
    pub fn from_backend(gl: &Rc<dyn GlCommands>, backend: &dyn Backend)
                        -> ViewSurfaceManager {
        let mut manager = ViewSurfaceManager {
            manager: SurfaceManager::new(),
            gl: gl.clone(),
            view_surface: None,
            multisample_surface: None,
            view_color_buffer: None,
            multisample_color_buffer: None,
        };
        manager.manager.set_size(backend.frame_size());

        let color_format = backend.color_format();
        let multisample_fb = backend.multisample_framebuffer_id();
        let is_multisampling = multisample_fb.is_some();

        let mut view_surface = Framebuffer::from_existing(gl, backend.view_framebuffer_id());
        view_surface.set_label("Display surface");
        view_surface.set_should_bind_gl_attachments(false);  // attachments are bound already
        view_surface.set_is_on_screen(!is_multisampling);
        let view_color = Rc::new(RefCell::new(Renderbuffer::from_existing(
            gl, color_format, 1, backend.view_color_renderbuffer_id())));
        let view_color_attachment: SharedAttachment = view_color.clone();
        view_surface.set_color_attachment(Some(view_color_attachment));
        manager.view_color_buffer = Some(view_color);
        manager.set_view_surface(Rc::new(RefCell::new(view_surface)));

        if let Some(multisample_fb) = multisample_fb {
            let mut multisample_surface = Framebuffer::from_existing(gl, multisample_fb);
            multisample_surface.set_label("Multisampling surface");
            multisample_surface.set_should_bind_gl_attachments(false);
            multisample_surface.set_is_on_screen(is_multisampling);
            let multisample_color = Rc::new(RefCell::new(Renderbuffer::from_existing(
                gl, color_format, backend.pixel_samples(),
                backend.multisample_color_renderbuffer_id())));
            let multisample_color_attachment: SharedAttachment = multisample_color.clone();
            multisample_surface.set_color_attachment(Some(multisample_color_attachment));
            manager.multisample_color_buffer = Some(multisample_color);
            manager.set_multisample_surface(Rc::new(RefCell::new(multisample_surface)));
        }

        if let Some(depth_format) = backend.depth_format() {
            let samples = manager.pixel_samples();
            let depth_buffer = if backend.depth_renderbuffer_id() != 0 {
                Renderbuffer::from_existing(gl, depth_format, samples,
                                            backend.depth_renderbuffer_id())
            } else {
                Renderbuffer::with_pixel_samples(gl, depth_format, samples)
            };
            let depth_attachment: SharedAttachment = Rc::new(RefCell::new(depth_buffer));
            manager.rendering_surface().borrow_mut()
                   .set_depth_attachment(Some(depth_attachment));
        }

        manager
    }

    /// Returns the framebuffer the host presents from.
    pub fn view_surface(&self) -> Option<Rc<RefCell<Framebuffer>>> {
        self.view_surface.clone()
    }

    fn set_view_surface(&mut self, surface: Rc<RefCell<Framebuffer>>) {
        if let Some(ref current) = self.view_surface {
            if Rc::ptr_eq(current, &surface) {
                return;
            }
            let registered: SharedSurface = current.clone();
            self.manager.remove_surface(&registered);
        }

        let registered: SharedSurface = surface.clone();
        self.view_surface = Some(surface);
        self.manager.add_surface(&registered);
    }

    /// Returns the host's multisample framebuffer, if one exists.
    pub fn multisample_surface(&self) -> Option<Rc<RefCell<Framebuffer>>> {
        self.multisample_surface.clone()
    }

    fn set_multisample_surface(&mut self, surface: Rc<RefCell<Framebuffer>>) {
        if let Some(ref current) = self.multisample_surface {
            if Rc::ptr_eq(current, &surface) {
                return;
            }
            let registered: SharedSurface = current.clone();
            self.manager.remove_surface(&registered);
        }

        let registered: SharedSurface = surface.clone();
        self.multisample_surface = Some(surface);
        self.manager.add_surface(&registered);
    }

    /// Returns the surface scene content is rendered into: the multisample
    /// surface when one exists, the view surface otherwise.
    pub fn rendering_surface(&self) -> Rc<RefCell<Framebuffer>> {
        self.multisample_surface.clone()
            .or_else(|| self.view_surface.clone())
            .expect("view surface manager holds no surfaces")
    }

    /// Returns the pixel format of the rendering surface's color buffer.
    pub fn color_format(&self) -> GLenum {
        let surface = self.rendering_surface();
        let attachment = surface.borrow().color_attachment()
            .expect("rendering surface has no color attachment");
        let format = attachment.borrow().pixel_format();
        format
    }

    /// Returns the pixel format of the rendering surface's depth buffer,
    /// if it has one.
    pub fn depth_format(&self) -> Option<GLenum> {
        let surface = self.rendering_surface();
        let attachment = surface.borrow().depth_attachment();
        attachment.map(|attachment| attachment.borrow().pixel_format())
    }

    /// Returns the pixel format of the rendering surface's stencil buffer,
    /// if it has one.
    pub fn stencil_format(&self) -> Option<GLenum> {
        let surface = self.rendering_surface();
        let attachment = surface.borrow().stencil_attachment();
        attachment.map(|attachment| attachment.borrow().pixel_format())
    }

    /// Returns the texel format matching the color buffer's pixel format.
    pub fn color_texel_format(&self) -> GLenum {
        image_format::texel_format_from_color_format(self.color_format())
    }

    /// Returns the texel type matching the color buffer's pixel format.
    pub fn color_texel_type(&self) -> GLenum {
        image_format::texel_type_from_color_format(self.color_format())
    }

    /// Returns the texel format matching the depth buffer's pixel format,
    /// if there is a depth buffer.
    pub fn depth_texel_format(&self) -> Option<GLenum> {
        self.depth_format().map(image_format::texel_format_from_depth_format)
    }

    /// Returns the texel type matching the depth buffer's pixel format, if
    /// there is a depth buffer.
    pub fn depth_texel_type(&self) -> Option<GLenum> {
        self.depth_format().map(image_format::texel_type_from_depth_format)
    }

    /// Returns the number of samples per pixel of the rendering surface.
    pub fn pixel_samples(&self) -> u32 {
        self.multisample_color_buffer.as_ref()
            .or(self.view_color_buffer.as_ref())
            .map_or(1, |buffer| buffer.borrow().pixel_samples())
    }

    /// Returns true if scene content is rendered through a multisample
    /// buffer.
    pub fn is_multisampling(&self) -> bool {
        self.pixel_samples() > 1
    }

    /// Returns the size of the backing store of the multisample buffers.
    ///
    /// The multipliers are the known hardware tile layouts for MSAA
    /// storage, not a general rule; unrecognized sample counts use the
    /// base size unchanged.
    pub fn multisampling_size(&self) -> SurfaceSize {
        let base = self.manager.size();
        match self.pixel_samples() {
            2 | 4 => base.scaled_by(2),
            6 | 8 | 9 => base.scaled_by(3),
            16 => base.scaled_by(4),
            _ => base,
        }
    }

    /// Resizes every managed surface, then leaves the rendering surface
    /// active for the host's own 2D drawing.
    pub fn set_size(&mut self, size: SurfaceSize) {
        if size == self.manager.size() {
            return;
        }

        self.manager.set_size(size);

        if self.is_multisampling() {
            let backing = self.multisampling_size();
            info!("view surface size set to {}x{}, multisampling from {}x{}",
                  size.width, size.height, backing.width, backing.height);
        } else {
            info!("view surface size set to {}x{} with no multisampling",
                  size.width, size.height);
        }

        self.rendering_surface().borrow().activate();
    }

    /// Resolves the multisample buffer into the view buffer, then discards
    /// the buffers whose content is no longer needed.
    ///
    /// The resolve must land before any discard: discarding first would
    /// throw the samples away.
    pub fn resolve_multisampling(&self) {
        if let (Some(multisample), Some(view)) =
            (&self.multisample_surface, &self.view_surface)
        {
            self.gl.resolve_multisample_framebuffer(multisample.borrow().framebuffer_id(),
                                                    view.borrow().framebuffer_id(),
                                                    self.manager.size());
        }

        // The multisample color buffer has been resolved, and the depth and
        // stencil buffers are not carried across frames.
        let rendering = self.rendering_surface();
        let rendering = rendering.borrow();
        let mut discards: SmallVec<[AttachmentSlot; 3]> = SmallVec::new();
        if self.multisample_surface.is_some() {
            discards.push(AttachmentSlot::Color);
        }
        if rendering.depth_attachment().is_some() {
            discards.push(AttachmentSlot::Depth);
        }
        if rendering.stencil_attachment().is_some() {
            discards.push(AttachmentSlot::Stencil);
        }
        self.gl.discard_attachments(rendering.framebuffer_id(), &discards);

        if let Some(ref color) = self.view_color_buffer {
            color.borrow().bind();
        }
    }
}

impl Deref for ViewSurfaceManager {
    type Target = SurfaceManager;

    fn deref(&self) -> &SurfaceManager {
        &self.manager
    }
}

impl DerefMut for ViewSurfaceManager {
    fn deref_mut(&mut self) -> &mut SurfaceManager {
        &mut self.manager
    }
}

/// The surfaces a scene draws through: a clipped section of the view's
/// rendering surface, and a surface for rendering node-picking content.
pub struct SceneDrawingSurfaceManager {
    manager: SurfaceManager,
    gl: Rc<dyn GlCommands>,
    view_surface: Option<Rc<RefCell<SurfaceSection>>>,
    picking_surface: Option<SharedSurface>,
}

impl SceneDrawingSurfaceManager {
    /// Builds an empty manager; the surfaces are created on first use.
    pub fn new(gl: &Rc<dyn GlCommands>) -> SceneDrawingSurfaceManager {
        SceneDrawingSurfaceManager {
            manager: SurfaceManager::new(),
            gl: gl.clone(),
            view_surface: None,
            picking_surface: None,
        }
    }

    /// Returns the section of the view's rendering surface the scene draws
    /// into, creating it on first use.
    pub fn view_surface(&mut self, view_surfaces: &ViewSurfaceManager)
                        -> Rc<RefCell<SurfaceSection>> {
        if let Some(ref section) = self.view_surface {
            return section.clone();
        }

        let base: SharedSurface = view_surfaces.rendering_surface();
        let section = Rc::new(RefCell::new(SurfaceSection::new(&self.gl, base)));
        self.set_view_surface(section.clone());
        section
    }

    /// Installs the scene's view section, replacing any previous one in
    /// the registry.
    pub fn set_view_surface(&mut self, section: Rc<RefCell<SurfaceSection>>) {
        if let Some(ref current) = self.view_surface {
            if Rc::ptr_eq(current, &section) {
                return;
            }
            let registered: SharedSurface = current.clone();
            self.manager.remove_surface(&registered);
        }

        let registered: SharedSurface = section.clone();
        self.view_surface = Some(section);
        self.manager.add_surface(&registered);
    }

    /// Moves the scene's view section on its base surface.
    pub fn set_view_surface_origin(&mut self, origin: SurfacePoint,
                                   view_surfaces: &ViewSurfaceManager) {
        self.view_surface(view_surfaces).borrow_mut().set_origin(origin);
    }

    /// Returns the surface node-picking content is rendered into, creating
    /// it on first use.
    ///
    /// The picking surface matches the view's color format. Stencilling is
    /// not used for picking, so a packed depth-stencil view format is
    /// replaced by its depth-only equivalent, without multisampling.
    pub fn picking_surface(&mut self, view_surfaces: &ViewSurfaceManager)
                           -> SharedSurface {
        if let Some(ref surface) = self.picking_surface {
            return surface.clone();
        }

        let color_format = view_surfaces.color_format();

        let mut surface = Framebuffer::new(&self.gl);
        surface.set_label("Picking surface");

        let color: SharedAttachment =
            Rc::new(RefCell::new(Renderbuffer::new(&self.gl, color_format)));
        surface.set_color_attachment(Some(color));

        if let Some(view_depth_format) = view_surfaces.depth_format() {
            let depth_format = image_format::depth_format_without_stencil(view_depth_format);
            let depth: SharedAttachment =
                Rc::new(RefCell::new(Renderbuffer::new(&self.gl, depth_format)));
            surface.set_depth_attachment(Some(depth));
        }

        info!("created picking surface with color format {:#x}", color_format);

        let surface: SharedSurface = Rc::new(RefCell::new(surface));
        self.set_picking_surface(surface.clone());
        surface
    }

    /// Installs the picking surface, replacing any previous one in the
    /// registry.
    pub fn set_picking_surface(&mut self, surface: SharedSurface) {
        if let Some(ref current) = self.picking_surface {
            if same_surface(current, &surface) {
                return;
            }
            let registered = current.clone();
            self.manager.remove_surface(&registered);
        }

        self.picking_surface = Some(surface.clone());
        self.manager.add_surface(&surface);
    }
}

impl Deref for SceneDrawingSurfaceManager {
    type Target = SurfaceManager;

    fn deref(&self) -> &SurfaceManager {
        &self.manager
    }
}

impl DerefMut for SceneDrawingSurfaceManager {
    fn deref_mut(&mut self) -> &mut SurfaceManager {
        &mut self.manager
    }
}
