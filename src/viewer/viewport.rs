//! Ray traced viewport widget for egui

use std::time::Instant;

use egui::{Response, Sense, Ui, Vec2};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::render::{FrameStats, GpuRenderer, Orchestrator, Session};
use crate::scene::SceneBuffers;
use crate::util::{Error, Result};

/// Degrees of FOV per scroll point.
const SCROLL_ZOOM: f32 = 0.05;

/// Camera input gathered for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraInput {
    /// Pointer drag in points; +y is downward.
    pub drag: Vec2,
    pub scroll: f32,
    /// Camera-space movement: x right, y up, z forward.
    pub movement: Vec3,
    pub toggle_projection: bool,
    pub reset_accumulation: bool,
}

impl CameraInput {
    pub fn gather(ui: &Ui, response: &Response) -> Self {
        let mut input = Self::default();
        if response.dragged_by(egui::PointerButton::Primary) {
            input.drag = response.drag_delta();
        }
        if response.hovered() {
            input.scroll = ui.input(|i| i.raw_scroll_delta.y);
        }
        if ui.ctx().wants_keyboard_input() {
            return input;
        }
        ui.input(|i| {
            if !i.modifiers.command {
                let axis = |pos: egui::Key, neg: egui::Key| {
                    (i.key_down(pos) as i32 - i.key_down(neg) as i32) as f32
                };
                input.movement = Vec3::new(
                    axis(egui::Key::D, egui::Key::A),
                    axis(egui::Key::E, egui::Key::Q),
                    axis(egui::Key::W, egui::Key::S),
                );
            }
            input.toggle_projection = i.key_pressed(egui::Key::P);
            input.reset_accumulation = i.key_pressed(egui::Key::R);
        });
        input
    }

    /// Apply to the session. Any camera change restarts accumulation;
    /// returns true if something changed.
    pub fn apply(&self, session: &mut Session, speed: f32, sensitivity: f32, dt: f32) -> bool {
        let camera = &mut session.camera;
        let mut changed = false;

        if self.drag != Vec2::ZERO {
            camera.rotate(self.drag.x, -self.drag.y, sensitivity);
            changed = true;
        }
        if self.scroll != 0.0 {
            camera.zoom_by(self.scroll * SCROLL_ZOOM);
            changed = true;
        }
        if self.movement != Vec3::ZERO {
            camera.translate(self.movement, speed, dt);
            changed = true;
        }
        if self.toggle_projection {
            camera.toggle_projection();
            changed = true;
        }

        changed |= self.reset_accumulation;
        if changed {
            session.manager.reset_accumulation();
        }
        changed
    }
}

/// Viewport state: GPU renderer, frame orchestration and the egui texture
pub struct Viewport {
    pub renderer: Option<GpuRenderer>,
    orchestrator: Orchestrator,
    rng: StdRng,
    clock: Instant,
    texture_id: Option<egui::TextureId>,
    pub last_stats: Option<FrameStats>,
}

impl Viewport {
    pub fn new(seed: u64) -> Self {
        Self {
            renderer: None,
            orchestrator: Orchestrator::new(),
            rng: StdRng::seed_from_u64(seed),
            clock: Instant::now(),
            texture_id: None,
            last_stats: None,
        }
    }

    /// Create the GPU renderer and upload the scene (call once when the wgpu
    /// context is available)
    pub fn init_renderer(
        &mut self,
        render_state: Option<&egui_wgpu::RenderState>,
        scene: &SceneBuffers,
        session: &Session,
    ) -> Result<()> {
        let render_state = render_state.ok_or(Error::NoRenderState)?;
        let mut renderer = GpuRenderer::new(
            &render_state.device,
            &render_state.queue,
            // the display shader applies gamma itself
            render_state.target_format.remove_srgb_suffix(),
            session.manager.width,
            session.manager.height,
        );
        self.orchestrator.start(scene, &mut renderer)?;
        self.renderer = Some(renderer);
        Ok(())
    }

    /// Show viewport, apply camera input and trace one frame
    pub fn show(
        &mut self,
        ui: &mut Ui,
        render_state: Option<&egui_wgpu::RenderState>,
        session: &mut Session,
        speed: f32,
        sensitivity: f32,
    ) -> Result<Response> {
        let _span = tracing::info_span!("viewport_show").entered();
        let available = ui.available_size();
        let size = Vec2::new(available.x.max(64.0), available.y.max(64.0));
        let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());

        let input = CameraInput::gather(ui, &response);
        // previous tick's delta; the manager clock is the only frame timer
        let dt = session.manager.delta_time as f32;
        input.apply(session, speed, sensitivity, dt);

        let (Some(render_state), Some(renderer)) = (render_state, &mut self.renderer) else {
            ui.painter().rect_filled(rect, 0.0, egui::Color32::from_rgb(30, 30, 35));
            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "Initializing...",
                egui::FontId::default(),
                egui::Color32::GRAY,
            );
            return Ok(response);
        };

        let manager = &mut session.manager;
        if renderer.resize_targets(manager.width, manager.height) {
            manager.reset_accumulation();
        }

        let ppp = ui.ctx().pixels_per_point();
        let (width, height) = ((size.x * ppp) as u32, (size.y * ppp) as u32);
        if renderer.ensure_output(width, height) {
            if let Some(view) = renderer.output_view() {
                let tex_id = render_state.renderer.write().register_native_texture(
                    &render_state.device,
                    view,
                    wgpu::FilterMode::Linear,
                );
                if let Some(old_id) = self.texture_id.replace(tex_id) {
                    render_state.renderer.write().free_texture(&old_id);
                }
            }
        }

        let now = self.clock.elapsed().as_secs_f64();
        let stats = self.orchestrator.run_frame(session, renderer, &mut self.rng, now)?;
        self.last_stats = Some(stats);

        if let Some(tex_id) = self.texture_id {
            ui.painter().image(
                tex_id,
                rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }

        Ok(response)
    }

    /// Release the camera and return the final session state.
    pub fn shutdown(&mut self, session: Session) -> crate::render::Manager {
        self.orchestrator.shutdown(session)
    }
}
