/*!
Safe management of OpenGL render surfaces.

This library manages the GPU-side render targets of a scene renderer. It
covers the pixel stores that can be attached to a framebuffer (renderbuffers
and texture faces), the framebuffers that aggregate them, rectangular
sections of a surface that clip through the GL scissor, registries that keep
groups of surfaces at a shared size, the on-screen view surface pair with
multisample resolution, and cube-map environment capture that is amortized
over multiple frames.

# Initialization

A host window library provides an implementation of [`backend::Backend`],
which exposes the GL function loader together with the identifiers and
formats of the surfaces the host has already created on screen. From it a
[`context::Context`] is built, and from that the view surfaces:

```no_run
# let host: std::rc::Rc<dyn glsurface::backend::Backend> = unsafe { std::mem::zeroed() };
use std::rc::Rc;
use glsurface::context::{Context, GlCommands};
use glsurface::manager::ViewSurfaceManager;

let context = Context::new(host.clone());
let gl: Rc<dyn GlCommands> = context.clone();
let view_surfaces = ViewSurfaceManager::from_backend(&gl, &*host);
```

The `ViewSurfaceManager` is created once during renderer initialization and
passed to whatever code needs the on-screen surface; there is no hidden
global.

# Off-screen surfaces

Off-screen targets are plain [`Framebuffer`]s. Attachments are shared
through `Rc<RefCell<_>>` handles, so a combined depth-stencil renderbuffer
can legally occupy both the depth and the stencil slot of the same
framebuffer:

```no_run
# use std::rc::Rc;
# use std::cell::RefCell;
# let gl: Rc<dyn glsurface::context::GlCommands> = unsafe { std::mem::zeroed() };
use glsurface::{gl, Framebuffer, RenderSurface, Renderbuffer, SharedAttachment};
use glsurface::geometry::SurfaceSize;

let mut surface = Framebuffer::new(&gl);
let color: SharedAttachment =
    Rc::new(RefCell::new(Renderbuffer::new(&gl, gl::RGBA8)));
let depth: SharedAttachment =
    Rc::new(RefCell::new(Renderbuffer::new(&gl, gl::DEPTH24_STENCIL8)));
surface.set_color_attachment(Some(color));
surface.set_depth_attachment(Some(depth));   // also fills the stencil slot
surface.set_size(SurfaceSize::new(256, 256));
```

Every GPU command goes through the [`context::GlCommands`] boundary, so the
whole surface graph can be exercised against a recording implementation
without a live GL context.
*/
#![warn(missing_docs)]

use std::error::Error;
use std::fmt;

pub mod backend;
pub mod context;
pub mod environment;
pub mod framebuffer;
pub mod geometry;
pub mod image_format;
pub mod manager;
pub mod texture;

pub use crate::framebuffer::{AttachmentSlot, Framebuffer, FramebufferAttachment,
                             RenderSurface, RenderSurfaceAttachment, Renderbuffer,
                             SharedAttachment, SharedSurface, SurfaceSection,
                             TextureAttachment};
pub use crate::image_format::Rgba8;

/// Raw OpenGL ES bindings, generated at build time.
#[allow(missing_docs)]
#[allow(non_upper_case_globals, non_snake_case, non_camel_case_types)]
#[allow(clippy::all)]
pub mod gl {
    include!(concat!(env!("OUT_DIR"), "/gl_bindings.rs"));
}

/// Trait for objects that are backed by an OpenGL object.
pub trait GlObject {
    /// The type of identifier for this object.
    type Id;

    /// Returns the id of the object.
    fn get_id(&self) -> Self::Id;
}

/// Error that can happen while operating on a render surface.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SurfaceError {
    /// The requested operation is not supported by this kind of pixel store.
    ///
    /// For example, replacing pixel content on a renderbuffer attachment.
    /// Renderbuffers are write-only from the CPU's point of view, so callers
    /// must route pixel replacement through a texture-backed target instead.
    UnsupportedOperation {
        /// The kind of object the operation was attempted on.
        target: &'static str,
        /// The operation that was attempted.
        operation: &'static str,
    },
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SurfaceError::UnsupportedOperation { target, operation } => {
                write!(fmt, "{} does not support {}", target, operation)
            },
        }
    }
}

impl Error for SurfaceError {}
