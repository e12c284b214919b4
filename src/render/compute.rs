//! Compute stage: the ray tracing kernel and its bind groups.
//!
//! Group 0 carries the two image units and every storage slot; its layout is
//! built from the slot table. Group 1 carries the frame uniforms.

use super::dispatch::DispatchGrid;
use crate::gpu::shaders::compute_shader_source;
use crate::gpu::slots::{COMPUTE_SLOT_GROUP, COMPUTE_UNIFORM_GROUP, STORAGE_SLOTS, TARGET_BINDINGS};
use crate::gpu::storage::StorageBinder;
use crate::gpu::targets::{RenderTargets, TARGET_FORMAT};
use crate::gpu::uniforms::{UniformBlock, COMPUTE_UNIFORMS};
use crate::util::Result;

/// Layout entries for group 0, derived from the binding tables.
pub fn slot_layout_entries() -> Vec<wgpu::BindGroupLayoutEntry> {
    let images = TARGET_BINDINGS.iter().map(|t| wgpu::BindGroupLayoutEntry {
        binding: t.image_unit,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::ReadWrite,
            format: TARGET_FORMAT,
            view_dimension: wgpu::TextureViewDimension::D2,
        },
        count: None,
    });
    let storage = STORAGE_SLOTS.iter().map(|e| wgpu::BindGroupLayoutEntry {
        binding: e.slot,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    });
    images.chain(storage).collect()
}

pub struct ComputeStage {
    pipeline: wgpu::ComputePipeline,
    slot_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    /// Bind group plus the (binder, targets) generations it was built from.
    slot_bind_group: Option<(wgpu::BindGroup, (u64, u64))>,
}

impl ComputeStage {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("trace_shader"),
            source: wgpu::ShaderSource::Wgsl(compute_shader_source().into()),
        });

        let slot_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("trace_slots_bgl"),
            entries: &slot_layout_entries(),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("trace_uniforms_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(COMPUTE_UNIFORMS.size),
                },
                count: None,
            }],
        });

        // indices here are COMPUTE_SLOT_GROUP and COMPUTE_UNIFORM_GROUP
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("trace_pipeline_layout"),
            bind_group_layouts: &[&slot_layout, &uniform_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("trace_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame_uniforms"),
            size: COMPUTE_UNIFORMS.size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("trace_uniforms_bg"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Self {
            pipeline,
            slot_layout,
            uniform_buffer,
            uniform_bind_group,
            slot_bind_group: None,
        }
    }

    pub fn write_uniforms(&self, queue: &wgpu::Queue, block: &UniformBlock) {
        queue.write_buffer(&self.uniform_buffer, 0, block.bytes());
    }

    /// Rebuild group 0 if a slot buffer or a target was recreated.
    pub fn prepare(&mut self, device: &wgpu::Device, binder: &StorageBinder, targets: &RenderTargets) -> Result<()> {
        let key = (binder.generation(), targets.generation());
        if matches!(&self.slot_bind_group, Some((_, k)) if *k == key) {
            return Ok(());
        }

        let mut entries = binder.bind_group_entries()?;
        let [render, debug] = TARGET_BINDINGS;
        entries.push(wgpu::BindGroupEntry {
            binding: render.image_unit,
            resource: wgpu::BindingResource::TextureView(targets.render_view()),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: debug.image_unit,
            resource: wgpu::BindingResource::TextureView(targets.debug_view()),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("trace_slots_bg"),
            layout: &self.slot_layout,
            entries: &entries,
        });
        log::debug!("trace bind group rebuilt (slots gen {}, targets gen {})", key.0, key.1);
        self.slot_bind_group = Some((bind_group, key));
        Ok(())
    }

    /// Record the dispatch. Does nothing until [`Self::prepare`] succeeded.
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, grid: DispatchGrid) {
        let Some((slots_bg, _)) = &self.slot_bind_group else {
            return;
        };
        if grid.is_empty() {
            return;
        }

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("trace_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(COMPUTE_SLOT_GROUP, slots_bg, &[]);
        pass.set_bind_group(COMPUTE_UNIFORM_GROUP, &self.uniform_bind_group, &[]);
        pass.dispatch_workgroups(grid.x, grid.y, grid.z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_covers_targets_and_slots() {
        let entries = slot_layout_entries();
        assert_eq!(entries.len(), TARGET_BINDINGS.len() + STORAGE_SLOTS.len());
        let bindings: Vec<u32> = entries.iter().map(|e| e.binding).collect();
        assert_eq!(bindings, vec![0, 1, 10, 11, 12, 13, 14, 15, 20, 21, 22, 23, 24]);
    }
}
