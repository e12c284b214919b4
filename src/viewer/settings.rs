//! Persistent application settings

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::render::manager::{MAX_BOUNCES, MAX_SAMPLES, TONE_MAPPING_MODES};
use crate::render::Manager;

/// Application settings that persist between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Window
    pub window_width: f32,
    pub window_height: f32,
    pub window_x: Option<f32>,
    pub window_y: Option<f32>,

    // Render target resolution (independent of the viewport size)
    pub render_width: u32,
    pub render_height: u32,

    // Rendering
    pub tone_mapping_mode: i32,
    pub exposure: f32,
    pub n_samples: i32,
    pub n_bounces: i32,
    pub incremental_rendering: bool,
    pub ambient_light: bool,
    pub rng_seed: u64,

    // Input
    pub camera_speed: f32,
    pub mouse_sensitivity: f32,

    // UI layout
    pub side_panel_width: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_width: 1280.0,
            window_height: 720.0,
            window_x: None,
            window_y: None,
            render_width: 1920,
            render_height: 1080,
            tone_mapping_mode: 6,
            exposure: 0.75,
            n_samples: 10,
            n_bounces: 5,
            incremental_rendering: true,
            ambient_light: true,
            rng_seed: 0,
            camera_speed: 2.5,
            mouse_sensitivity: 0.1,
            side_panel_width: 220.0,
        }
    }
}

/// Largest accepted render target edge.
pub const MAX_RENDER_EDGE: u32 = 8192;

impl Settings {
    /// Get settings file path
    fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("gpu-raytracer");
            std::fs::create_dir_all(&p).ok();
            p.push("settings.json");
            p
        })
    }

    /// Load settings from the config directory
    pub fn load() -> Self {
        Self::path().map(|p| Self::load_from(&p)).unwrap_or_default()
    }

    /// Load settings from a specific file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        let mut settings: Self = std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        settings.validate();
        settings
    }

    /// Save settings to the config directory
    pub fn save(&self) {
        if let Some(path) = Self::path() {
            self.save_to(&path);
        }
    }

    pub fn save_to(&self, path: &Path) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    log::warn!("could not save settings to {}: {}", path.display(), e);
                }
            }
            Err(e) => log::warn!("could not serialize settings: {}", e),
        }
    }

    /// Clamp every value into the range the renderer accepts.
    pub fn validate(&mut self) {
        let defaults = Self::default();
        self.render_width = self.render_width.clamp(1, MAX_RENDER_EDGE);
        self.render_height = self.render_height.clamp(1, MAX_RENDER_EDGE);
        self.tone_mapping_mode = self.tone_mapping_mode.clamp(0, TONE_MAPPING_MODES.len() as i32 - 1);
        self.n_samples = self.n_samples.clamp(1, MAX_SAMPLES);
        self.n_bounces = self.n_bounces.clamp(1, MAX_BOUNCES);
        if !self.exposure.is_finite() || self.exposure < 0.0 {
            self.exposure = defaults.exposure;
        }
        if !self.camera_speed.is_finite() || self.camera_speed <= 0.0 {
            self.camera_speed = defaults.camera_speed;
        }
        if !self.mouse_sensitivity.is_finite() || self.mouse_sensitivity <= 0.0 {
            self.mouse_sensitivity = defaults.mouse_sensitivity;
        }
        if !(self.window_width >= 320.0 && self.window_height >= 240.0) {
            self.window_width = defaults.window_width;
            self.window_height = defaults.window_height;
        }
    }

    /// Render state seeded from these settings.
    pub fn to_manager(&self) -> Manager {
        Manager {
            tone_mapping_mode: self.tone_mapping_mode,
            exposure: self.exposure,
            n_samples: self.n_samples,
            n_bounces: self.n_bounces,
            incremental_rendering: self.incremental_rendering,
            ambient_light: self.ambient_light,
            ..Manager::new(self.render_width, self.render_height)
        }
    }

    /// Copy back whatever the GUI changed during the session.
    pub fn update_from(&mut self, manager: &Manager) {
        self.tone_mapping_mode = manager.tone_mapping_mode;
        self.exposure = manager.exposure;
        self.n_samples = manager.n_samples;
        self.n_bounces = manager.n_bounces;
        self.incremental_rendering = manager.incremental_rendering;
        self.ambient_light = manager.ambient_light;
        self.render_width = manager.width;
        self.render_height = manager.height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_manager() {
        let m = Settings::default().to_manager();
        let d = Manager::default();
        assert_eq!(m.tone_mapping_mode, d.tone_mapping_mode);
        assert_eq!(m.n_samples, d.n_samples);
        assert_eq!(m.n_bounces, d.n_bounces);
        assert_eq!(m.exposure, d.exposure);
        assert_eq!((m.width, m.height), (1920, 1080));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load_from(&dir.path().join("nope.json"));
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn test_partial_file_and_clamping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "n_samples": 0, "tone_mapping_mode": 42, "exposure": -3.0, "render_width": 0 }"#).unwrap();
        let s = Settings::load_from(&path);
        assert_eq!(s.n_samples, 1);
        assert_eq!(s.tone_mapping_mode, 7);
        assert_eq!(s.exposure, 0.75);
        assert_eq!(s.render_width, 1);
        assert_eq!(s.n_bounces, 5);
    }

    #[test]
    fn test_sampling_limits_match_render_limits() {
        let mut s = Settings { n_samples: 1000, n_bounces: 1000, ..Settings::default() };
        s.validate();
        assert_eq!((s.n_samples, s.n_bounces), (MAX_SAMPLES, MAX_BOUNCES));

        let mut m = s.to_manager();
        m.sanitize();
        assert_eq!((m.n_samples, m.n_bounces), (MAX_SAMPLES, MAX_BOUNCES));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut s = Settings::default();
        s.rng_seed = 1234;
        s.ambient_light = false;
        s.save_to(&path);
        assert_eq!(Settings::load_from(&path), s);
    }

    #[test]
    fn test_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }
}
