//! Main application state and UI

use egui::{RichText, TopBottomPanel, CentralPanel, SidePanel};

use crate::render::manager::{MAX_BOUNCES, MAX_SAMPLES};
use crate::render::{Session, TONE_MAPPING_MODES};
use crate::scene::{init_scene, SceneBuffers};

use super::settings::{Settings, MAX_RENDER_EDGE};
use super::viewport::Viewport;

const BUILD_DATE: &str = env!("RAYTRACER_BUILD_DATE");
const BUILD_TIME: &str = env!("RAYTRACER_BUILD_TIME");

/// Format FPS for display (hide decimals for whole numbers)
fn format_fps(fps: f64) -> String {
    if (fps - fps.round()).abs() < 0.001 {
        format!("{:.0}", fps)
    } else {
        format!("{:.1}", fps)
    }
}

/// Common render resolutions offered in the side panel
const RESOLUTION_PRESETS: [(u32, u32); 4] = [(1280, 720), (1600, 900), (1920, 1080), (2560, 1440)];

pub struct ViewerApp {
    viewport: Viewport,
    settings: Settings,
    scene: SceneBuffers,
    session: Option<Session>,
    status_message: String,
    show_about: bool,
    _trace_guard: Option<tracing_chrome::FlushGuard>,
}

impl ViewerApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        settings: Settings,
        trace_guard: Option<tracing_chrome::FlushGuard>,
    ) -> Self {
        let session = Session::new(settings.to_manager());
        Self {
            viewport: Viewport::new(settings.rng_seed),
            scene: init_scene(),
            session: Some(session),
            settings,
            status_message: "Ready".into(),
            show_about: false,
            _trace_guard: trace_guard,
        }
    }

    fn menu_bar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        egui::MenuBar::new().ui(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Save Settings").clicked() {
                    self.sync_settings();
                    self.settings.save();
                    self.status_message = "Settings saved".into();
                    ui.close();
                }
                ui.separator();
                if ui.button("Exit").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });

            ui.menu_button("View", |ui| {
                if let Some(session) = &mut self.session {
                    if ui.button("Reset Camera").clicked() {
                        session.reset_camera();
                        self.status_message = "Camera reset".into();
                        ui.close();
                    }
                    let label = if session.camera.is_orthographic() { "Perspective" } else { "Orthographic" };
                    if ui.button(label).clicked() {
                        session.camera.toggle_projection();
                        session.manager.reset_accumulation();
                        ui.close();
                    }
                }
            });

            ui.menu_button("Help", |ui| {
                if ui.button("About").clicked() {
                    self.show_about = true;
                    ui.close();
                }
            });
        });
    }

    fn about_window(&mut self, ctx: &egui::Context) {
        egui::Window::new("About")
            .open(&mut self.show_about)
            .resizable(false)
            .collapsible(false)
            .show(ctx, |ui| {
                ui.label(RichText::new("GPU Ray Tracer").strong());
                ui.label(format!("Version {}", env!("CARGO_PKG_VERSION")));
                ui.label(format!("Built {} {}", BUILD_DATE, BUILD_TIME));
            });
    }

    fn side_panel(&mut self, ui: &mut egui::Ui) {
        let Some(session) = &mut self.session else {
            return;
        };
        let manager = &mut session.manager;
        let mut changed = false;

        ui.heading("Render");
        ui.separator();

        ui.label(RichText::new("Tone Mapping").strong());
        let mut mode = manager.tone_mapping_mode.clamp(0, TONE_MAPPING_MODES.len() as i32 - 1) as usize;
        egui::ComboBox::from_id_salt("tone_mapping")
            .selected_text(manager.tone_mapping_name())
            .show_ui(ui, |ui| {
                for (i, name) in TONE_MAPPING_MODES.iter().enumerate() {
                    ui.selectable_value(&mut mode, i, *name);
                }
            });
        manager.tone_mapping_mode = mode as i32;
        ui.horizontal(|ui| {
            ui.label("Exposure:");
            ui.add(egui::Slider::new(&mut manager.exposure, 0.0..=4.0).step_by(0.05));
        });

        ui.separator();
        ui.label(RichText::new("Sampling").strong());
        ui.horizontal(|ui| {
            ui.label("Samples:");
            changed |= ui.add(egui::Slider::new(&mut manager.n_samples, 1..=MAX_SAMPLES)).changed();
        });
        ui.horizontal(|ui| {
            ui.label("Bounces:");
            changed |= ui.add(egui::Slider::new(&mut manager.n_bounces, 1..=MAX_BOUNCES)).changed();
        });
        changed |= ui.checkbox(&mut manager.incremental_rendering, "Incremental rendering").changed();
        changed |= ui.checkbox(&mut manager.ambient_light, "Ambient light").changed();
        if ui.button("Reset accumulation").clicked() {
            changed = true;
        }

        ui.separator();
        ui.label(RichText::new("Resolution").strong());
        egui::ComboBox::from_id_salt("resolution")
            .selected_text(format!("{} x {}", manager.width, manager.height))
            .show_ui(ui, |ui| {
                for (w, h) in RESOLUTION_PRESETS {
                    let selected = (manager.width, manager.height) == (w, h);
                    if ui.selectable_label(selected, format!("{} x {}", w, h)).clicked() && !selected {
                        manager.width = w.min(MAX_RENDER_EDGE);
                        manager.height = h.min(MAX_RENDER_EDGE);
                        changed = true;
                    }
                }
            });
        if manager.width % 32 != 0 || manager.height % 32 != 0 {
            ui.label(RichText::new("Not a multiple of 32: edge tiles are skipped").small().weak());
        }

        ui.separator();
        ui.label(RichText::new("Camera").strong());
        let cam = &session.camera;
        let pos = cam.position();
        ui.label(format!("Position: ({:.2}, {:.2}, {:.2})", pos.x, pos.y, pos.z));
        ui.label(format!("Yaw {:.1}  Pitch {:.1}  FOV {:.1}", cam.yaw(), cam.pitch(), cam.zoom()));
        ui.label(if cam.is_orthographic() { "Orthographic" } else { "Perspective" });
        ui.horizontal(|ui| {
            ui.label("Speed:");
            ui.add(egui::DragValue::new(&mut self.settings.camera_speed).speed(0.1).range(0.1..=50.0));
        });
        ui.horizontal(|ui| {
            ui.label("Sensitivity:");
            ui.add(egui::DragValue::new(&mut self.settings.mouse_sensitivity).speed(0.01).range(0.01..=2.0));
        });

        ui.separator();
        ui.label(RichText::new("Controls").strong());
        ui.label("LMB drag: look\nWASD / QE: move\nScroll: zoom\nP: projection\nR: restart accumulation\nEsc: quit");

        if changed {
            session.manager.reset_accumulation();
        }
    }

    fn status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(&self.status_message);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if let (Some(stats), Some(session)) = (&self.viewport.last_stats, &self.session) {
                    ui.label(format!("FPS: {}", format_fps(session.manager.fps())));
                    ui.separator();
                    ui.label(format!("Samples: {}", stats.accumulated_frames));
                    ui.separator();
                    ui.label(format!("Frame: {}", stats.frame));
                }
            });
        });
    }

    /// Copy the live render state into the persisted settings
    fn sync_settings(&mut self) {
        if let Some(session) = &self.session {
            self.settings.update_from(&session.manager);
        }
    }
}

impl eframe::App for ViewerApp {
    fn on_exit(&mut self) {
        if let Some(session) = self.session.take() {
            let manager = self.viewport.shutdown(session);
            self.settings.update_from(&manager);
        }
        self.settings.save();
    }

    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        let _span = tracing::info_span!("viewer_update").entered();

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        // Initialize renderer once; without it there is nothing to show
        if self.viewport.renderer.is_none() {
            if let Some(session) = &self.session {
                if let Err(e) = self.viewport.init_renderer(frame.wgpu_render_state(), &self.scene, session) {
                    log::error!("renderer init failed: {}", e);
                    eprintln!("[Error] {}", e);
                    std::process::exit(1);
                }
                self.status_message = "Viewport ready".into();
                // Ensure settings file exists
                self.settings.save();
            }
        }

        TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            self.menu_bar(ctx, ui);
        });

        TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            self.status_bar(ui);
        });

        let response = SidePanel::right("side_panel")
            .default_width(self.settings.side_panel_width)
            .min_width(150.0)
            .max_width(400.0)
            .resizable(true)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.side_panel(ui));
            });
        self.settings.side_panel_width = response.response.rect.width();

        self.about_window(ctx);

        CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let Some(session) = &mut self.session else {
                    return;
                };
                let render_state = frame.wgpu_render_state();
                let (speed, sensitivity) = (self.settings.camera_speed, self.settings.mouse_sensitivity);
                if let Err(e) = self.viewport.show(ui, render_state, session, speed, sensitivity) {
                    log::error!("frame failed: {}", e);
                    self.status_message = format!("Frame error: {}", e);
                }
            });

        ctx.input(|i| {
            if let Some(rect) = i.viewport().inner_rect {
                self.settings.window_width = rect.width();
                self.settings.window_height = rect.height();
            }
            if let Some(pos) = i.viewport().outer_rect {
                self.settings.window_x = Some(pos.min.x);
                self.settings.window_y = Some(pos.min.y);
            }
        });

        // progressive rendering needs a continuous frame loop
        ctx.request_repaint();
    }
}
