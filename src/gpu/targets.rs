//! Off-screen render and debug targets written by the compute stage.

/// Format of both targets (read-write storage, sampled by the display pass).
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

pub struct RenderTargets {
    #[allow(dead_code)]
    render: wgpu::Texture,
    render_view: wgpu::TextureView,
    #[allow(dead_code)]
    debug: wgpu::Texture,
    debug_view: wgpu::TextureView,
    width: u32,
    height: u32,
    /// Bumped on every recreation; bind groups key off it.
    generation: u64,
}

fn create_target(device: &wgpu::Device, label: &str, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let tex = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = tex.create_view(&wgpu::TextureViewDescriptor::default());
    (tex, view)
}

impl RenderTargets {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let (render, render_view) = create_target(device, "render_target", width, height);
        let (debug, debug_view) = create_target(device, "debug_target", width, height);
        Self {
            render,
            render_view,
            debug,
            debug_view,
            width,
            height,
            generation: 0,
        }
    }

    /// Recreate both targets at a new size. Returns true if anything changed.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> bool {
        let (width, height) = (width.max(1), height.max(1));
        if self.width == width && self.height == height {
            return false;
        }
        let generation = self.generation + 1;
        *self = Self::new(device, width, height);
        self.generation = generation;
        log::info!("render targets resized to {}x{}", width, height);
        true
    }

    pub fn render_view(&self) -> &wgpu::TextureView {
        &self.render_view
    }

    pub fn debug_view(&self) -> &wgpu::TextureView {
        &self.debug_view
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
