//! wgpu implementation of [`FrameBackend`].
//!
//! The barrier is a submission boundary: the compute encoder is submitted in
//! [`FrameBackend::memory_barrier`] before the display encoder is recorded, so
//! wgpu orders the storage writes before the sampled reads.

use super::backend::FrameBackend;
use super::compositor::{DisplayPass, DEPTH_FORMAT};
use super::compute::ComputeStage;
use super::dispatch::DispatchGrid;
use crate::gpu::storage::StorageBinder;
use crate::gpu::targets::RenderTargets;
use crate::gpu::uniforms::{UniformBlock, COMPUTE_UNIFORMS, DISPLAY_UNIFORMS};
use crate::util::{Error, Result};

/// Viewport texture the display pass draws into (shown by the GUI).
struct OutputTarget {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    #[allow(dead_code)]
    depth: wgpu::Texture,
    depth_view: wgpu::TextureView,
    size: (u32, u32),
}

pub struct GpuRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    output_format: wgpu::TextureFormat,
    binder: StorageBinder,
    compute: ComputeStage,
    display: DisplayPass,
    targets: RenderTargets,
    output: Option<OutputTarget>,
    compute_encoder: Option<wgpu::CommandEncoder>,
    display_encoder: Option<wgpu::CommandEncoder>,
    write_pending: bool,
}

impl GpuRenderer {
    /// `output_format` is the format of the texture handed to the GUI.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, output_format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let _span = tracing::info_span!("gpu_renderer_new").entered();
        let compute = ComputeStage::new(device);
        let display = DisplayPass::new(device, output_format);
        let targets = RenderTargets::new(device, width, height);
        log::info!("gpu renderer ready: {}x{} render targets, output {:?}", width, height, output_format);
        Self {
            device: device.clone(),
            queue: queue.clone(),
            output_format,
            binder: StorageBinder::new(),
            compute,
            display,
            targets,
            output: None,
            compute_encoder: None,
            display_encoder: None,
            write_pending: false,
        }
    }

    /// Match the render targets to the render resolution.
    pub fn resize_targets(&mut self, width: u32, height: u32) -> bool {
        self.targets.resize(&self.device, width, height)
    }

    /// Make sure the output texture has the given size. Returns true when it
    /// was (re)created and the caller has to register the new view.
    pub fn ensure_output(&mut self, width: u32, height: u32) -> bool {
        let size = (width.max(1), height.max(1));
        if matches!(&self.output, Some(o) if o.size == size) {
            return false;
        }

        let extent = wgpu::Extent3d { width: size.0, height: size.1, depth_or_array_layers: 1 };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("viewport_output"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.output_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let depth = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("viewport_depth"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());
        self.output = Some(OutputTarget { texture, view, depth, depth_view, size });
        true
    }

    pub fn output_view(&self) -> Option<&wgpu::TextureView> {
        self.output.as_ref().map(|o| &o.view)
    }
}

impl FrameBackend for GpuRenderer {
    fn set_storage_buffer(&mut self, slot: u32, bytes: &[u8]) -> Result<()> {
        self.binder.set(&self.device, &self.queue, slot, bytes)
    }

    fn set_uniforms(&mut self, block: &UniformBlock) -> Result<()> {
        if std::ptr::eq(block.layout(), &COMPUTE_UNIFORMS) {
            self.compute.write_uniforms(&self.queue, block);
        } else if std::ptr::eq(block.layout(), &DISPLAY_UNIFORMS) {
            self.display.write_params(&self.queue, block);
        } else {
            return Err(Error::other(format!("no uniform buffer for {} program", block.program())));
        }
        Ok(())
    }

    fn dispatch_compute(&mut self, grid: DispatchGrid) -> Result<()> {
        let _span = tracing::info_span!("dispatch_compute").entered();
        self.compute.prepare(&self.device, &self.binder, &self.targets)?;

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("trace_encoder"),
        });
        self.compute.encode(&mut encoder, grid);
        log::trace!("trace dispatch {}x{}x{} ({} invocations)", grid.x, grid.y, grid.z, grid.invocations());
        self.compute_encoder = Some(encoder);
        self.write_pending = true;
        Ok(())
    }

    fn memory_barrier(&mut self) -> Result<()> {
        if let Some(encoder) = self.compute_encoder.take() {
            self.queue.submit(std::iter::once(encoder.finish()));
        }
        self.write_pending = false;
        Ok(())
    }

    fn draw_display(&mut self, params: &UniformBlock) -> Result<()> {
        let _span = tracing::info_span!("draw_display").entered();
        if self.write_pending {
            return Err(Error::ReadBeforeBarrier);
        }
        self.set_uniforms(params)?;
        self.display.prepare(&self.device, self.targets.render_view(), self.targets.generation());

        let Some(output) = &self.output else {
            // no viewport yet; nothing to draw into
            return Ok(());
        };
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("display_encoder"),
        });
        self.display.encode(&mut encoder, &output.view, &output.depth_view);
        self.display_encoder = Some(encoder);
        Ok(())
    }

    fn finish_frame(&mut self) -> Result<()> {
        let pending = self.compute_encoder.take().into_iter().chain(self.display_encoder.take());
        self.queue.submit(pending.map(|e| e.finish()));
        self.write_pending = false;
        Ok(())
    }
}
