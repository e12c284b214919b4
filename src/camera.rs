//! First-person yaw/pitch camera.
//!
//! Angles are in degrees. `front`, `right`, `up`, `target` and the view matrix
//! are derived state: [`Camera::update_target`] recomputes the basis from the
//! angles, [`Camera::update_position_matrix`] rebuilds the view from the basis.
//! Setters that touch position or angles directly leave the camera stale until
//! both steps have run again.

use glam::{Mat4, Vec3};

pub const PITCH_LIMIT: f32 = 89.0;
pub const MIN_FOV: f32 = 1.0;
pub const MAX_FOV: f32 = 120.0;

#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    target: Vec3,
    front: Vec3,
    right: Vec3,
    up: Vec3,
    world_up: Vec3,
    pitch: f32,
    yaw: f32,
    /// Vertical field of view in degrees.
    zoom: f32,
    orthographic: bool,
    view: Mat4,
    stale: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    /// Camera at the origin looking down -Z with a 45 degree FOV.
    pub fn new() -> Self {
        let mut cam = Self {
            position: Vec3::ZERO,
            target: Vec3::ZERO,
            front: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
            world_up: Vec3::Y,
            pitch: 0.0,
            yaw: -90.0,
            zoom: 45.0,
            orthographic: false,
            view: Mat4::IDENTITY,
            stale: true,
        };
        cam.refresh();
        cam
    }

    /// Apply angle deltas and recompute the look direction and target.
    pub fn update_target(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw += delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);

        let (sy, cy) = self.yaw.to_radians().sin_cos();
        let (sp, cp) = self.pitch.to_radians().sin_cos();
        self.front = Vec3::new(cy * cp, sp, sy * cp).normalize();
        self.target = self.position + self.front;
    }

    /// Rebuild the right/up basis and the right-handed view matrix.
    pub fn update_position_matrix(&mut self) {
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
        self.view = Mat4::look_at_rh(self.position, self.target, self.world_up);
        self.stale = false;
    }

    fn refresh(&mut self) {
        self.update_target(0.0, 0.0);
        self.update_position_matrix();
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.stale = true;
    }

    /// Absolute angles in degrees; pitch is clamped on the next update.
    pub fn set_orientation(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw;
        self.pitch = pitch;
        self.stale = true;
    }

    /// Set FOV in degrees, clamped to [`MIN_FOV`, `MAX_FOV`].
    pub fn set_zoom(&mut self, fov: f32) {
        self.zoom = fov.clamp(MIN_FOV, MAX_FOV);
    }

    /// Place and aim the camera in one step.
    pub fn place(&mut self, position: Vec3, yaw: f32, pitch: f32, fov: f32) {
        self.set_position(position);
        self.set_orientation(yaw, pitch);
        self.set_zoom(fov);
        self.refresh();
    }

    /// Move in camera space: x along right, y along world up, z along front.
    pub fn translate(&mut self, local: Vec3, speed: f32, dt: f32) {
        if local == Vec3::ZERO {
            return;
        }
        let step = speed * dt.max(0.0);
        self.position += (self.right * local.x + self.world_up * local.y + self.front * local.z) * step;
        self.refresh();
    }

    /// Mouse-look; positive `dy` looks up.
    pub fn rotate(&mut self, dx: f32, dy: f32, sensitivity: f32) {
        self.update_target(dx * sensitivity, dy * sensitivity);
        self.update_position_matrix();
    }

    /// Narrow (positive) or widen (negative) the FOV.
    pub fn zoom_by(&mut self, delta: f32) {
        self.set_zoom(self.zoom - delta);
        self.refresh();
    }

    pub fn toggle_projection(&mut self) {
        self.orthographic = !self.orthographic;
        self.refresh();
    }

    pub fn view_matrix(&self) -> Mat4 {
        debug_assert!(!self.stale, "camera view read before update_position_matrix");
        self.view
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn is_orthographic(&self) -> bool {
        self.orthographic
    }

    pub fn set_orthographic(&mut self, ortho: bool) {
        self.orthographic = ortho;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_new_looks_down_negative_z() {
        let cam = Camera::new();
        assert!(approx(cam.front(), Vec3::NEG_Z));
        assert!(approx(cam.target(), Vec3::NEG_Z));
        assert!(approx(cam.right(), Vec3::X));
        assert!(approx(cam.up(), Vec3::Y));
        assert_eq!(cam.zoom(), 45.0);
        assert!(!cam.is_stale());
    }

    #[test]
    fn test_zero_delta_is_idempotent() {
        let mut cam = Camera::new();
        cam.place(Vec3::new(1.0, 2.0, 3.0), 30.0, 10.0, 45.0);
        let (target, view) = (cam.target(), cam.view_matrix());
        cam.update_target(0.0, 0.0);
        cam.update_position_matrix();
        assert!(approx(cam.target(), target));
        assert!(cam.view_matrix().abs_diff_eq(view, 1e-6));
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut cam = Camera::new();
        cam.update_target(0.0, 200.0);
        assert_eq!(cam.pitch(), PITCH_LIMIT);
        cam.update_target(0.0, -500.0);
        assert_eq!(cam.pitch(), -PITCH_LIMIT);
    }

    #[test]
    fn test_setters_mark_stale() {
        let mut cam = Camera::new();
        cam.set_position(Vec3::ONE);
        assert!(cam.is_stale());
        cam.update_target(0.0, 0.0);
        cam.update_position_matrix();
        assert!(!cam.is_stale());
        assert!(approx(cam.target(), Vec3::new(1.0, 1.0, 0.0)));
    }

    #[test]
    fn test_translate_forward() {
        let mut cam = Camera::new();
        cam.translate(Vec3::Z, 2.0, 0.5);
        assert!(approx(cam.position(), Vec3::new(0.0, 0.0, -1.0)));
        cam.translate(Vec3::X, 1.0, 1.0);
        assert!(approx(cam.position(), Vec3::new(1.0, 0.0, -1.0)));
    }

    #[test]
    fn test_zoom_limits() {
        let mut cam = Camera::new();
        cam.zoom_by(100.0);
        assert_eq!(cam.zoom(), MIN_FOV);
        cam.zoom_by(-500.0);
        assert_eq!(cam.zoom(), MAX_FOV);
    }

    #[test]
    fn test_toggle_projection() {
        let mut cam = Camera::new();
        cam.toggle_projection();
        assert!(cam.is_orthographic());
        cam.toggle_projection();
        assert!(!cam.is_orthographic());
    }
}
