//! Per-session render and timing state.

use glam::Vec3;

/// Display name of each tone-mapping operator, indexed by mode.
pub const TONE_MAPPING_MODES: [&str; 8] = [
    "None",
    "Reinhard",
    "Reinhard (extended)",
    "ACES (Narkowicz)",
    "Uncharted 2",
    "Lottes",
    "Uchimura",
    "Unreal",
];

pub const MAX_SAMPLES: i32 = 64;
pub const MAX_BOUNCES: i32 = 32;

#[derive(Debug, Clone)]
pub struct Manager {
    /// Seconds since start, monotonic.
    pub current_time: f64,
    pub last_frame_time: f64,
    pub current_frame_time: f64,
    pub delta_time: f64,
    pub frame_count: u64,

    pub incremental_rendering: bool,
    pub ambient_light: bool,
    pub tone_mapping_mode: i32,
    pub n_samples: i32,
    pub n_bounces: i32,
    pub exposure: f32,

    /// Frames blended into the render target since the last reset.
    pub accumulated_frames: u32,

    pub width: u32,
    pub height: u32,
}

impl Default for Manager {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            last_frame_time: 0.0,
            current_frame_time: 0.0,
            delta_time: 0.0,
            frame_count: 0,
            incremental_rendering: true,
            ambient_light: true,
            tone_mapping_mode: 6,
            n_samples: 10,
            n_bounces: 5,
            exposure: 0.75,
            accumulated_frames: 0,
            width: 1920,
            height: 1080,
        }
    }
}

impl Manager {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, ..Default::default() }
    }

    /// Advance the frame clock to `now` (seconds).
    ///
    /// A sample earlier than the previous one is clamped, so time never runs
    /// backwards and `delta_time` is never negative.
    pub fn tick_timer(&mut self, now: f64) {
        let now = if now.is_finite() { now.max(self.current_frame_time) } else { self.current_frame_time };
        self.last_frame_time = self.current_frame_time;
        self.current_frame_time = now;
        self.current_time = now;
        self.delta_time = (self.current_frame_time - self.last_frame_time).max(0.0);
        self.frame_count += 1;
    }

    /// Restart progressive accumulation on the next frame.
    pub fn reset_accumulation(&mut self) {
        if self.accumulated_frames != 0 {
            log::debug!("accumulation reset after {} frames", self.accumulated_frames);
        }
        self.accumulated_frames = 0;
    }

    /// Count one dispatched frame toward the running average.
    pub fn advance_accumulation(&mut self) {
        if self.incremental_rendering {
            self.accumulated_frames = self.accumulated_frames.saturating_add(1);
        } else {
            self.accumulated_frames = 0;
        }
    }

    /// Sky term: exactly white when ambient light is on, exactly black otherwise.
    pub fn ambient_color(&self) -> Vec3 {
        if self.ambient_light { Vec3::ONE } else { Vec3::ZERO }
    }

    pub fn tone_mapping_name(&self) -> &'static str {
        usize::try_from(self.tone_mapping_mode)
            .ok()
            .and_then(|i| TONE_MAPPING_MODES.get(i))
            .copied()
            .unwrap_or("Unknown")
    }

    /// Clamp render parameters to the ranges the shaders accept.
    pub fn sanitize(&mut self) {
        self.tone_mapping_mode = self.tone_mapping_mode.clamp(0, TONE_MAPPING_MODES.len() as i32 - 1);
        self.n_samples = self.n_samples.clamp(1, MAX_SAMPLES);
        self.n_bounces = self.n_bounces.clamp(1, MAX_BOUNCES);
        if !self.exposure.is_finite() || self.exposure < 0.0 {
            self.exposure = 0.75;
        }
    }

    /// Frames per second from the last tick.
    pub fn fps(&self) -> f64 {
        if self.delta_time > 0.0 { 1.0 / self.delta_time } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let m = Manager::default();
        assert!(m.incremental_rendering);
        assert!(m.ambient_light);
        assert_eq!(m.tone_mapping_mode, 6);
        assert_eq!(m.tone_mapping_name(), "Uchimura");
        assert_eq!(m.n_samples, 10);
        assert_eq!(m.n_bounces, 5);
        assert_eq!(m.exposure, 0.75);
        assert_eq!(m.frame_count, 0);
    }

    #[test]
    fn test_tick_never_goes_backward() {
        let mut m = Manager::default();
        for now in [0.5, 1.0, 0.25, f64::NAN, 2.0, 2.0] {
            let before = m.frame_count;
            m.tick_timer(now);
            assert!(m.delta_time >= 0.0);
            assert_eq!(m.frame_count, before + 1);
        }
        assert_eq!(m.current_time, 2.0);
        assert_eq!(m.delta_time, 0.0);
    }

    #[test]
    fn test_tick_delta() {
        let mut m = Manager::default();
        m.tick_timer(1.0);
        m.tick_timer(1.25);
        assert_eq!(m.delta_time, 0.25);
        assert_eq!(m.last_frame_time, 1.0);
        assert_eq!(m.fps(), 4.0);
    }

    #[test]
    fn test_ambient_color() {
        let mut m = Manager::default();
        assert_eq!(m.ambient_color(), Vec3::new(1.0, 1.0, 1.0));
        m.ambient_light = false;
        assert_eq!(m.ambient_color(), Vec3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_accumulation() {
        let mut m = Manager::default();
        m.advance_accumulation();
        m.advance_accumulation();
        assert_eq!(m.accumulated_frames, 2);
        m.reset_accumulation();
        assert_eq!(m.accumulated_frames, 0);
        m.incremental_rendering = false;
        m.advance_accumulation();
        assert_eq!(m.accumulated_frames, 0);
    }

    #[test]
    fn test_sanitize() {
        let mut m = Manager { tone_mapping_mode: 12, n_samples: 0, n_bounces: 1000, exposure: -1.0, ..Default::default() };
        m.sanitize();
        assert_eq!(m.tone_mapping_mode, 7);
        assert_eq!(m.n_samples, 1);
        assert_eq!(m.n_bounces, MAX_BOUNCES);
        assert_eq!(m.exposure, 0.75);
    }
}
