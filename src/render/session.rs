//! Owned per-run context handed to every frame step.

use glam::Vec3;

use super::manager::Manager;
use crate::camera::Camera;

/// Startup pose: origin, level, facing -Z.
pub const START_POSITION: Vec3 = Vec3::ZERO;
pub const START_YAW: f32 = 270.0;
pub const START_PITCH: f32 = 0.0;
pub const START_FOV: f32 = 45.0;

#[derive(Debug, Clone)]
pub struct Session {
    pub manager: Manager,
    pub camera: Camera,
}

impl Session {
    pub fn new(manager: Manager) -> Self {
        let mut camera = Camera::new();
        camera.place(START_POSITION, START_YAW, START_PITCH, START_FOV);
        Self { manager, camera }
    }

    /// Put the camera back at the startup pose and restart accumulation.
    pub fn reset_camera(&mut self) {
        let ortho = self.camera.is_orthographic();
        self.camera = Camera::new();
        self.camera.set_orthographic(ortho);
        self.camera.place(START_POSITION, START_YAW, START_PITCH, START_FOV);
        self.manager.reset_accumulation();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Manager::default())
    }
}
