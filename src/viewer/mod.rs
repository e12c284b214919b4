//! Interactive viewer window

mod app;
mod settings;
mod viewport;

pub use settings::Settings;
pub use viewport::CameraInput;

use anyhow::Result;
use tracing_subscriber::prelude::*;

/// Command-line overrides applied on top of the saved settings
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub resolution: Option<(u32, u32)>,
    pub seed: Option<u64>,
    pub reset_settings: bool,
}

/// Run the viewer
pub fn run(options: Options) -> Result<()> {
    env_logger::init();

    let trace_guard = init_tracing();

    // Friendly panic handler for GPU errors
    std::panic::set_hook(Box::new(|info| {
        let msg = info.payload()
            .downcast_ref::<String>()
            .map(|s| s.as_str())
            .or_else(|| info.payload().downcast_ref::<&str>().copied())
            .unwrap_or("Unknown error");

        if msg.contains("wgpu") || msg.contains("Buffer") || msg.contains("shader") || msg.contains("Storage") {
            eprintln!("\n[GPU Error] {}", msg);
            eprintln!("\nThe adapter may lack read-write rgba32float storage textures or 1024-invocation workgroups.");
        } else {
            eprintln!("\n[Error] {}", msg);
            if let Some(loc) = info.location() {
                eprintln!("  at {}:{}:{}", loc.file(), loc.line(), loc.column());
            }
        }
    }));

    let mut settings = if options.reset_settings {
        log::info!("settings reset to defaults");
        Settings::default()
    } else {
        Settings::load()
    };
    if let Some((w, h)) = options.resolution {
        settings.render_width = w;
        settings.render_height = h;
    }
    if let Some(seed) = options.seed {
        settings.rng_seed = seed;
    }
    settings.validate();
    log::info!(
        "render target {}x{}, seed {}",
        settings.render_width,
        settings.render_height,
        settings.rng_seed
    );

    let native_options = eframe::NativeOptions {
        viewport: {
            let mut vp = egui::ViewportBuilder::default()
                .with_inner_size([settings.window_width, settings.window_height])
                .with_title("GPU Ray Tracer");
            if let (Some(x), Some(y)) = (settings.window_x, settings.window_y) {
                vp = vp.with_position([x, y]);
            }
            vp
        },
        renderer: eframe::Renderer::Wgpu,
        wgpu_options: egui_wgpu::WgpuConfiguration {
            wgpu_setup: egui_wgpu::WgpuSetup::CreateNew(egui_wgpu::WgpuSetupCreateNew {
                device_descriptor: std::sync::Arc::new(|_adapter| {
                    wgpu::DeviceDescriptor {
                        label: Some("raytracer device"),
                        // read_write access to rgba32float storage textures
                        required_features: wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES,
                        required_limits: wgpu::Limits {
                            // 32x32 tiles
                            max_compute_invocations_per_workgroup: 1024,
                            // eleven scene slots
                            max_storage_buffers_per_shader_stage: 16,
                            ..wgpu::Limits::default()
                        },
                        ..Default::default()
                    }
                }),
                ..Default::default()
            }),
            ..Default::default()
        },
        ..Default::default()
    };

    eframe::run_native(
        "GPU Ray Tracer",
        native_options,
        Box::new(move |cc| Ok(Box::new(app::ViewerApp::new(cc, settings, trace_guard)))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run: {}", e))
}

fn init_tracing() -> Option<tracing_chrome::FlushGuard> {
    if std::env::var("RAYTRACER_TRACE").ok().as_deref() != Some("1") {
        return None;
    }

    let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
        .file("trace.json")
        .build();

    let subscriber = tracing_subscriber::registry().with(chrome_layer);
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return None;
    }

    Some(guard)
}
