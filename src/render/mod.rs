//! Frame orchestration and the wgpu frame backend.
//!
//! ```text
//! tick_timer -> frame uniforms -> dispatch -> barrier -> compositor -> finish
//! ```

pub mod backend;
pub mod compositor;
pub mod compute;
pub mod dispatch;
pub mod manager;
pub mod orchestrator;
pub mod renderer;
pub mod session;

pub use backend::{FrameBackend, PendingWrite, Readable};
pub use compositor::{Compositor, TONE_MAPPING_MODES};
pub use dispatch::DispatchGrid;
pub use manager::Manager;
pub use orchestrator::{FramePhase, FrameStats, Orchestrator, OrchestratorState};
pub use renderer::GpuRenderer;
pub use session::Session;
