//! # Raytracer
//!
//! Real-time compute-shader ray tracer on wgpu.
//!
//! A fixed scene of spheres (and optional triangles) is uploaded once into
//! storage buffers at fixed binding slots. Every frame a compute kernel traces
//! the scene into an rgba32float render target, progressively averaging
//! samples while the camera holds still; a display pass then tone maps that
//! target onto the viewport.
//!
//! ## Modules
//!
//! - [`util`] - Error type
//! - [`scene`] - Scene store (struct-of-arrays primitive data)
//! - [`camera`] - Yaw/pitch camera
//! - [`gpu`] - Binding slots, storage buffers, uniform blocks, shaders
//! - [`render`] - Frame orchestrator, compositor, wgpu backend
//! - `viewer` - eframe application (feature `viewer`)
//!
//! ## Example
//!
//! ```ignore
//! use raytracer::render::{Orchestrator, Session, GpuRenderer};
//!
//! let mut backend = GpuRenderer::new(&device, &queue, format, 1920, 1080);
//! let mut orch = Orchestrator::new();
//! orch.start(&raytracer::scene::init_scene(), &mut backend)?;
//! let mut session = Session::default();
//! orch.run_frame(&mut session, &mut backend, &mut rng, now)?;
//! ```

pub mod util;
pub mod scene;
pub mod camera;
pub mod gpu;
pub mod render;

// Interactive window (optional, enabled with "viewer" feature)
#[cfg(feature = "viewer")]
pub mod viewer;

pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::camera::Camera;
    pub use crate::render::{FrameBackend, Manager, Orchestrator, Session};
    pub use crate::scene::{init_scene, MaterialKind, SceneBuffers};
    pub use crate::util::{Error, Result};
}
