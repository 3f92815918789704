mod support;

use std::cell::RefCell;
use std::rc::Rc;

use glsurface::context::GlCommands;
use glsurface::framebuffer::{AttachmentSlot, Framebuffer, RenderSurface, Renderbuffer,
                             SharedSurface, SurfaceSection};
use glsurface::geometry::{SurfacePoint, SurfaceSize, Viewport};
use glsurface::gl::{DEPTH24_STENCIL8, DEPTH_COMPONENT24, DEPTH_STENCIL, RGBA,
                    RGBA8, UNSIGNED_BYTE, UNSIGNED_INT_24_8};
use glsurface::manager::{SceneDrawingSurfaceManager, SurfaceManager, ViewSurfaceManager};

use support::{FakeBackend, GlCall};

fn base_surface(gl: &Rc<dyn GlCommands>, width: u32, height: u32)
                -> (Rc<RefCell<Framebuffer>>, SharedSurface) {
    let mut fb = Framebuffer::new(gl);
    let color = Rc::new(RefCell::new(Renderbuffer::new(gl, RGBA8)));
    {
        use glsurface::framebuffer::RenderSurfaceAttachment;
        color.borrow_mut().set_size(SurfaceSize::new(width, height));
    }
    fb.set_color_attachment(Some(color));
    let fb = Rc::new(RefCell::new(fb));
    let shared: SharedSurface = fb.clone();
    (fb, shared)
}

#[test]
fn section_coverage_tracks_origin_and_size() {
    let (_recorder, gl) = support::recording_gl();
    let (_fb, base) = base_surface(&gl, 100, 100);

    let mut section = SurfaceSection::new(&gl, base);
    assert!(section.is_full_coverage());

    section.set_origin(SurfacePoint::new(10, 10));
    assert!(!section.is_full_coverage());

    section.set_origin(SurfacePoint::ZERO);
    assert!(section.is_full_coverage());

    section.set_size(SurfaceSize::new(50, 50));
    assert!(!section.is_full_coverage());
}

#[test]
fn nested_sections_need_full_coverage_all_the_way_down() {
    let (_recorder, gl) = support::recording_gl();
    let (_fb, base) = base_surface(&gl, 100, 100);

    let inner = Rc::new(RefCell::new(SurfaceSection::new(&gl, base)));
    let inner_shared: SharedSurface = inner.clone();
    let outer = SurfaceSection::new(&gl, inner_shared);
    assert!(outer.is_full_coverage());

    inner.borrow_mut().set_origin(SurfacePoint::new(5, 0));
    assert!(!outer.is_full_coverage());
}

#[test]
fn partial_sections_clear_inside_a_scissor_clip() {
    let (recorder, gl) = support::recording_gl();
    let (_fb, base) = base_surface(&gl, 100, 100);

    let mut section = SurfaceSection::new(&gl, base);
    section.set_origin(SurfacePoint::new(10, 20));
    section.set_size(SurfaceSize::new(30, 40));
    recorder.take_calls();

    section.clear_color_content();

    let open = recorder.position(|call| matches!(call, GlCall::ScissorTest(true)));
    let clip = recorder.position(|call| matches!(call, GlCall::Scissor(_)));
    let clear = recorder.position(|call| matches!(call, GlCall::Clear(_)));
    assert!(open.is_some() && clip.is_some() && clear.is_some());
    assert!(open < clip && clip < clear);

    let calls = recorder.calls();
    assert!(calls.contains(&GlCall::Scissor(Viewport {
        x: 10,
        y: 20,
        width: 30,
        height: 40,
    })));
    assert_eq!(calls.last(), Some(&GlCall::ScissorTest(false)));
}

#[test]
fn full_coverage_sections_skip_the_scissor_clip() {
    let (recorder, gl) = support::recording_gl();
    let (_fb, base) = base_surface(&gl, 100, 100);

    let section = SurfaceSection::new(&gl, base);
    recorder.take_calls();

    section.clear_color_content();

    assert!(recorder.position(|call| matches!(call, GlCall::Scissor(_))).is_none());
    assert!(recorder.position(|call| matches!(call, GlCall::Clear(_))).is_some());
}

#[test]
fn section_reads_are_translated_by_the_origin() {
    let (recorder, gl) = support::recording_gl();
    let (_fb, base) = base_surface(&gl, 100, 100);

    let mut section = SurfaceSection::new(&gl, base);
    section.set_origin(SurfacePoint::new(10, 20));
    recorder.take_calls();

    let rect = Viewport::from_origin_and_size(SurfacePoint::ZERO, SurfaceSize::new(5, 5));
    let pixels = section.read_color_content(rect);
    assert_eq!(pixels.len(), 25);

    assert!(recorder.position(|call| matches!(call,
        GlCall::ReadPixels { rect: Viewport { x: 10, y: 20, width: 5, height: 5 }, .. }
    )).is_some());
}

#[test]
fn activating_a_section_leaves_the_scissors_open() {
    let (recorder, gl) = support::recording_gl();
    let (_fb, base) = base_surface(&gl, 100, 100);

    let mut section = SurfaceSection::new(&gl, base);
    section.set_origin(SurfacePoint::new(10, 0));
    recorder.take_calls();

    section.activate();

    let calls = recorder.calls();
    assert!(matches!(calls.first(), Some(GlCall::BindFramebuffer(_))));
    assert!(matches!(calls.last(), Some(GlCall::Scissor(_))));
}

#[test]
fn registry_ignores_duplicates_and_aligns_sizes() {
    let (_recorder, gl) = support::recording_gl();
    let (_fb, surface) = base_surface(&gl, 100, 100);

    let mut manager = SurfaceManager::new();
    manager.add_surface(&surface);
    manager.add_surface(&surface);

    assert_eq!(manager.surface_count(), 1);
    assert_eq!(manager.size(), SurfaceSize::new(100, 100));
}

#[test]
fn sized_registry_resizes_incoming_surfaces() {
    let (_recorder, gl) = support::recording_gl();
    let (_first_fb, first) = base_surface(&gl, 100, 100);
    let (_second_fb, second) = base_surface(&gl, 30, 30);

    let mut manager = SurfaceManager::new();
    manager.add_surface(&first);
    manager.add_surface(&second);

    assert_eq!(second.borrow().size(), SurfaceSize::new(100, 100));
}

#[test]
fn resizing_the_registry_reaches_every_surface() {
    let (_recorder, gl) = support::recording_gl();
    let (_first_fb, first) = base_surface(&gl, 100, 100);
    let (_second_fb, second) = base_surface(&gl, 100, 100);

    let mut manager = SurfaceManager::new();
    manager.add_surface(&first);
    manager.add_surface(&second);

    manager.set_size(SurfaceSize::new(40, 60));

    assert_eq!(first.borrow().size(), SurfaceSize::new(40, 60));
    assert_eq!(second.borrow().size(), SurfaceSize::new(40, 60));
}

#[test]
fn removed_and_dropped_surfaces_stop_being_resized() {
    let (_recorder, gl) = support::recording_gl();
    let (_first_fb, first) = base_surface(&gl, 100, 100);
    let (second_fb, second) = base_surface(&gl, 100, 100);

    let mut manager = SurfaceManager::new();
    manager.add_surface(&first);
    manager.add_surface(&second);

    manager.remove_surface(&first);
    manager.set_size(SurfaceSize::new(10, 10));
    assert_eq!(first.borrow().size(), SurfaceSize::new(100, 100));

    drop(second);
    drop(second_fb);
    manager.set_size(SurfaceSize::new(20, 20));
    assert_eq!(manager.surface_count(), 0);
}

#[test]
fn view_surfaces_from_a_single_sample_host() {
    let (_recorder, gl) = support::recording_gl();
    let backend = FakeBackend::single_sample(SurfaceSize::new(100, 100));
    let manager = ViewSurfaceManager::from_backend(&gl, &backend);

    assert!(manager.view_surface().is_some());
    assert!(manager.multisample_surface().is_none());
    assert!(!manager.is_multisampling());
    assert_eq!(manager.pixel_samples(), 1);
    assert_eq!(manager.size(), SurfaceSize::new(100, 100));

    assert_eq!(manager.color_format(), RGBA8);
    assert_eq!(manager.depth_format(), Some(DEPTH24_STENCIL8));
    assert_eq!(manager.stencil_format(), Some(DEPTH24_STENCIL8));
    assert_eq!(manager.color_texel_format(), RGBA);
    assert_eq!(manager.color_texel_type(), UNSIGNED_BYTE);
    assert_eq!(manager.depth_texel_format(), Some(DEPTH_STENCIL));
    assert_eq!(manager.depth_texel_type(), Some(UNSIGNED_INT_24_8));
}

#[test]
fn scene_content_renders_into_the_multisample_surface() {
    let (_recorder, gl) = support::recording_gl();
    let backend = FakeBackend::multisampled(SurfaceSize::new(100, 100), 4);
    let manager = ViewSurfaceManager::from_backend(&gl, &backend);

    assert!(manager.is_multisampling());
    assert_eq!(manager.pixel_samples(), 4);
    let rendering = manager.rendering_surface();
    assert_eq!(rendering.borrow().framebuffer_id(), backend.msaa_fb.unwrap());
}

#[test]
fn multisampling_backing_sizes_follow_the_hardware_table() {
    let (_recorder, gl) = support::recording_gl();
    let base = SurfaceSize::new(100, 100);

    let cases = [(1, 100), (2, 200), (4, 200), (6, 300), (8, 300), (9, 300),
                 (16, 400), (3, 100)];
    for (samples, expected) in cases {
        let backend = if samples > 1 {
            FakeBackend::multisampled(base, samples)
        } else {
            FakeBackend::single_sample(base)
        };
        let manager = ViewSurfaceManager::from_backend(&gl, &backend);
        assert_eq!(manager.multisampling_size(),
                   SurfaceSize::new(expected, expected),
                   "sample count {}", samples);
    }
}

#[test]
fn resolve_lands_before_any_discard() {
    let (recorder, gl) = support::recording_gl();
    let backend = FakeBackend::multisampled(SurfaceSize::new(100, 100), 4);
    let manager = ViewSurfaceManager::from_backend(&gl, &backend);
    recorder.take_calls();

    manager.resolve_multisampling();

    let resolve = recorder.position(|call| matches!(call, GlCall::Resolve { .. }));
    let discard = recorder.position(|call| matches!(call, GlCall::Discard { .. }));
    assert!(resolve.is_some() && discard.is_some());
    assert!(resolve < discard);

    let calls = recorder.calls();
    assert!(calls.contains(&GlCall::Resolve {
        source: backend.msaa_fb.unwrap(),
        target: backend.view_fb,
        size: SurfaceSize::new(100, 100),
    }));
    assert!(calls.contains(&GlCall::Discard {
        fb: backend.msaa_fb.unwrap(),
        slots: vec![AttachmentSlot::Color, AttachmentSlot::Depth, AttachmentSlot::Stencil],
    }));
    assert_eq!(calls.last(), Some(&GlCall::BindRenderbuffer(backend.view_rb)));
}

#[test]
fn without_multisampling_only_transients_are_discarded() {
    let (recorder, gl) = support::recording_gl();
    let backend = FakeBackend::single_sample(SurfaceSize::new(100, 100));
    let manager = ViewSurfaceManager::from_backend(&gl, &backend);
    recorder.take_calls();

    manager.resolve_multisampling();

    assert!(recorder.position(|call| matches!(call, GlCall::Resolve { .. })).is_none());
    let calls = recorder.calls();
    assert!(calls.contains(&GlCall::Discard {
        fb: backend.view_fb,
        slots: vec![AttachmentSlot::Depth, AttachmentSlot::Stencil],
    }));
    assert_eq!(calls.last(), Some(&GlCall::BindRenderbuffer(backend.view_rb)));
}

#[test]
fn resizing_the_view_reactivates_the_rendering_surface() {
    let (recorder, gl) = support::recording_gl();
    let backend = FakeBackend::single_sample(SurfaceSize::new(100, 100));
    let mut manager = ViewSurfaceManager::from_backend(&gl, &backend);
    recorder.take_calls();

    manager.set_size(SurfaceSize::new(150, 150));

    assert_eq!(manager.size(), SurfaceSize::new(150, 150));
    assert_eq!(recorder.calls().last(),
               Some(&GlCall::BindFramebuffer(backend.view_fb)));
}

#[test]
fn scene_view_section_wraps_the_rendering_surface() {
    let (_recorder, gl) = support::recording_gl();
    let backend = FakeBackend::single_sample(SurfaceSize::new(100, 100));
    let view_surfaces = ViewSurfaceManager::from_backend(&gl, &backend);

    let mut scene_surfaces = SceneDrawingSurfaceManager::new(&gl);
    let section = scene_surfaces.view_surface(&view_surfaces);

    assert_eq!(scene_surfaces.size(), SurfaceSize::new(100, 100));
    assert!(section.borrow().is_full_coverage());
    assert_eq!(scene_surfaces.surface_count(), 1);

    scene_surfaces.set_view_surface_origin(SurfacePoint::new(10, 10), &view_surfaces);
    assert!(!section.borrow().is_full_coverage());
}

#[test]
fn picking_surface_matches_the_view_formats_without_stencil() {
    let (recorder, gl) = support::recording_gl();
    let backend = FakeBackend::single_sample(SurfaceSize::new(100, 100));
    let view_surfaces = ViewSurfaceManager::from_backend(&gl, &backend);

    let mut scene_surfaces = SceneDrawingSurfaceManager::new(&gl);
    scene_surfaces.view_surface(&view_surfaces);
    recorder.take_calls();

    let picking = scene_surfaces.picking_surface(&view_surfaces);

    // Color matches the view; depth drops the view format's stencil bits.
    assert!(recorder.position(|call| matches!(call,
        GlCall::AllocateStorage { format: RGBA8,
                                  size: SurfaceSize { width: 100, height: 100 }, .. }
    )).is_some());
    assert!(recorder.position(|call| matches!(call,
        GlCall::AllocateStorage { format: DEPTH_COMPONENT24, .. }
    )).is_some());

    assert!(picking.borrow().stencil_attachment().is_none());
    assert_eq!(scene_surfaces.surface_count(), 2);

    let again = scene_surfaces.picking_surface(&view_surfaces);
    assert!(Rc::as_ptr(&picking).cast::<()>() == Rc::as_ptr(&again).cast::<()>());
}
