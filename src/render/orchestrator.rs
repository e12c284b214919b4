//! Per-frame protocol: tick, uniforms, dispatch, barrier, composite, finish.

use rand::RngCore;

use super::backend::{FrameBackend, PendingWrite};
use super::compositor::Compositor;
use super::dispatch::DispatchGrid;
use super::manager::Manager;
use super::session::Session;
use crate::camera::Camera;
use crate::gpu::slots::{validate_texture_bindings, TARGET_BINDINGS};
use crate::gpu::uniforms::UniformBlock;
use crate::scene::SceneBuffers;
use crate::util::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Initializing,
    Running,
    Terminating,
}

impl OrchestratorState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::Running => "Running",
            Self::Terminating => "Terminating",
        }
    }
}

/// Last completed step of the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    Ticked,
    UniformsPushed,
    Dispatched,
    BarrierIssued,
    Composited,
    Finished,
}

/// What one frame did, for the status bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    pub seed: u32,
    pub grid: DispatchGrid,
    /// Samples per pixel in the render target after this frame.
    pub accumulated_frames: u32,
    pub delta_time: f64,
}

pub struct Orchestrator {
    state: OrchestratorState,
    phase: FramePhase,
    frame_uniforms: UniformBlock,
    compositor: Compositor,
    n_spheres: u32,
    n_triangles: u32,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            state: OrchestratorState::Initializing,
            phase: FramePhase::Idle,
            frame_uniforms: UniformBlock::compute(),
            compositor: Compositor::new(),
            n_spheres: 0,
            n_triangles: 0,
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    fn expect_state(&self, expected: OrchestratorState) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidState {
                expected: expected.name(),
                found: self.state.name(),
            });
        }
        Ok(())
    }

    /// Upload the scene into its slots and enter the running state.
    pub fn start<B: FrameBackend + ?Sized>(&mut self, scene: &SceneBuffers, backend: &mut B) -> Result<()> {
        let _span = tracing::info_span!("orchestrator_start").entered();
        self.expect_state(OrchestratorState::Initializing)?;
        validate_texture_bindings(&TARGET_BINDINGS)?;

        for (buffer, bytes) in scene.storage_payloads() {
            backend.set_storage_buffer(buffer.slot(), bytes)?;
        }
        self.n_spheres = scene.sphere_count();
        self.n_triangles = scene.triangle_count();

        self.state = OrchestratorState::Running;
        log::info!(
            "scene uploaded: {} spheres, {} triangles",
            self.n_spheres,
            self.n_triangles
        );
        Ok(())
    }

    /// Run one frame. Input has already been applied to `session`.
    pub fn run_frame<B, R>(&mut self, session: &mut Session, backend: &mut B, rng: &mut R, now: f64) -> Result<FrameStats>
    where
        B: FrameBackend + ?Sized,
        R: RngCore + ?Sized,
    {
        let _span = tracing::info_span!("run_frame").entered();
        self.expect_state(OrchestratorState::Running)?;
        self.phase = FramePhase::Idle;
        let Session { manager, camera } = session;

        manager.tick_timer(now);
        manager.sanitize();
        self.phase = FramePhase::Ticked;

        let seed = rng.next_u32();
        self.push_frame_uniforms(manager, camera, seed)?;
        if self.frame_uniforms.is_dirty() {
            backend.set_uniforms(&self.frame_uniforms)?;
            self.frame_uniforms.mark_clean();
        }
        self.phase = FramePhase::UniformsPushed;

        let pending = self.dispatch(manager, backend)?;
        let grid = pending.grid();

        let readable = pending.barrier(backend)?;
        self.phase = FramePhase::BarrierIssued;

        self.compositor.compose(manager, backend, readable)?;
        self.phase = FramePhase::Composited;

        backend.finish_frame()?;
        self.phase = FramePhase::Finished;

        manager.advance_accumulation();
        Ok(FrameStats {
            frame: manager.frame_count,
            seed,
            grid,
            accumulated_frames: manager.accumulated_frames,
            delta_time: manager.delta_time,
        })
    }

    fn dispatch<B: FrameBackend + ?Sized>(&mut self, manager: &Manager, backend: &mut B) -> Result<PendingWrite> {
        let grid = DispatchGrid::for_resolution(manager.width, manager.height);
        backend.dispatch_compute(grid)?;
        self.phase = FramePhase::Dispatched;
        Ok(PendingWrite::new(grid))
    }

    fn push_frame_uniforms(&mut self, manager: &Manager, camera: &Camera, seed: u32) -> Result<()> {
        let u = &mut self.frame_uniforms;
        u.set_float("time", manager.current_time as f32)?;
        u.set_mat4("view", &camera.view_matrix())?;
        u.set_bool("orthographic", camera.is_orthographic())?;
        u.set_bool("incremental", manager.incremental_rendering)?;
        u.set_uint("seed", seed)?;
        u.set_vec3("lookfrom", camera.position())?;
        u.set_vec3("lookat", camera.target())?;
        u.set_float("vfov", camera.zoom())?;
        u.set_float("yaw", camera.yaw())?;
        u.set_float("pitch", camera.pitch())?;
        u.set_vec3("ambient_light", manager.ambient_color())?;
        u.set_int("n_samples", manager.n_samples)?;
        u.set_int("n_bounces", manager.n_bounces)?;
        u.set_uint("accumulated_frames", manager.accumulated_frames)?;
        u.set_uint("n_spheres", self.n_spheres)?;
        u.set_uint("n_triangles", self.n_triangles)?;
        Ok(())
    }

    /// Leave the frame loop and release the camera. The manager is handed
    /// back so its settings can be persisted.
    pub fn shutdown(&mut self, session: Session) -> Manager {
        let Session { manager, camera } = session;
        drop(camera);
        self.state = OrchestratorState::Terminating;
        self.phase = FramePhase::Idle;
        log::info!("shutdown after {} frames", manager.frame_count);
        manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_before_start_is_rejected() {
        struct Nop;
        impl FrameBackend for Nop {
            fn set_storage_buffer(&mut self, _: u32, _: &[u8]) -> Result<()> { Ok(()) }
            fn set_uniforms(&mut self, _: &UniformBlock) -> Result<()> { Ok(()) }
            fn dispatch_compute(&mut self, _: DispatchGrid) -> Result<()> { Ok(()) }
            fn memory_barrier(&mut self) -> Result<()> { Ok(()) }
            fn draw_display(&mut self, _: &UniformBlock) -> Result<()> { Ok(()) }
            fn finish_frame(&mut self) -> Result<()> { Ok(()) }
        }

        let mut orch = Orchestrator::new();
        let mut session = Session::default();
        let mut rng = rand::rngs::mock::StepRng::new(1, 1);
        let err = orch.run_frame(&mut session, &mut Nop, &mut rng, 0.0).unwrap_err();
        assert!(matches!(err, Error::InvalidState { expected: "Running", found: "Initializing" }));

        orch.start(&crate::scene::init_scene(), &mut Nop).unwrap();
        assert!(orch.start(&crate::scene::init_scene(), &mut Nop).is_err());
        let stats = orch.run_frame(&mut session, &mut Nop, &mut rng, 0.1).unwrap();
        assert_eq!(stats.seed, 1);
        assert_eq!(orch.phase(), FramePhase::Finished);

        let manager = orch.shutdown(session);
        assert_eq!(manager.frame_count, 1);
        assert_eq!(orch.state(), OrchestratorState::Terminating);
    }
}
