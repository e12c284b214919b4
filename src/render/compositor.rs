//! Display compositor: tone maps the render target onto the viewport texture.
//!
//! [`Compositor`] is the host half (parameters, ordering); [`DisplayPass`]
//! owns the wgpu pipeline and the static screen quad.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::backend::{FrameBackend, Readable};
use super::manager::Manager;
use crate::gpu::shaders::display_shader_source;
use crate::gpu::slots::RENDER_TARGET;
use crate::gpu::uniforms::{UniformBlock, DISPLAY_UNIFORMS};
use crate::util::Result;

pub use super::manager::TONE_MAPPING_MODES;

/// Depth format of the display target.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Host side of the display stage.
pub struct Compositor {
    params: UniformBlock,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compositor {
    pub fn new() -> Self {
        Self { params: UniformBlock::display() }
    }

    /// Push display parameters and draw. Only callable once the render target
    /// is readable.
    pub fn compose<B: FrameBackend + ?Sized>(&mut self, manager: &Manager, backend: &mut B, _ready: Readable) -> Result<()> {
        let _span = tracing::info_span!("compose").entered();
        self.params.set_int("tone_mapping_mode", manager.tone_mapping_mode)?;
        self.params.set_float("exposure", manager.exposure)?;
        backend.draw_display(&self.params)
    }

}

/// Interleaved quad vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

/// Full-screen triangle strip, counter-clockwise, uv origin top-left.
pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { position: [-1.0, -1.0], uv: [0.0, 1.0] },
    QuadVertex { position: [1.0, -1.0], uv: [1.0, 1.0] },
    QuadVertex { position: [-1.0, 1.0], uv: [0.0, 0.0] },
    QuadVertex { position: [1.0, 1.0], uv: [1.0, 0.0] },
];

const QUAD_ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

/// GPU side of the display stage.
pub struct DisplayPass {
    pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    texture_bind_group: Option<(wgpu::BindGroup, u64)>,
    params_buffer: wgpu::Buffer,
    params_bind_group: wgpu::BindGroup,
    quad: wgpu::Buffer,
}

impl DisplayPass {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("display_shader"),
            source: wgpu::ShaderSource::Wgsl(display_shader_source().into()),
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("display_texture_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: RENDER_TARGET.texture_unit,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    // rgba32float is not filterable without an optional feature
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                },
                count: None,
            }],
        });

        let params_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("display_params_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(DISPLAY_UNIFORMS.size),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("display_pipeline_layout"),
            bind_group_layouts: &[&texture_layout, &params_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("display_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &QUAD_ATTRIBUTES,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("display_params"),
            size: DISPLAY_UNIFORMS.size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("display_sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let params_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("display_params_bg"),
            layout: &params_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("display_quad"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self {
            pipeline,
            texture_layout,
            texture_bind_group: None,
            params_buffer,
            params_bind_group,
            quad,
        }
    }

    pub fn write_params(&self, queue: &wgpu::Queue, params: &UniformBlock) {
        queue.write_buffer(&self.params_buffer, 0, params.bytes());
    }

    /// Rebind the render target when it was recreated.
    pub fn prepare(&mut self, device: &wgpu::Device, render_view: &wgpu::TextureView, generation: u64) {
        if matches!(&self.texture_bind_group, Some((_, g)) if *g == generation) {
            return;
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("display_texture_bg"),
            layout: &self.texture_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: RENDER_TARGET.texture_unit,
                resource: wgpu::BindingResource::TextureView(render_view),
            }],
        });
        self.texture_bind_group = Some((bind_group, generation));
    }

    /// Clear color and depth, then draw the quad.
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, color: &wgpu::TextureView, depth: &wgpu::TextureView) {
        let Some((texture_bg, _)) = &self.texture_bind_group else {
            return;
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("display_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, texture_bg, &[]);
        pass.set_bind_group(1, &self.params_bind_group, &[]);
        pass.set_vertex_buffer(0, self.quad.slice(..));
        pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_is_counter_clockwise() {
        // strip triangles: (0,1,2) and (2,1,3) after the odd-winding swap
        for [a, b, c] in [[0, 1, 2], [2, 1, 3]] {
            let p = |i: usize| QUAD_VERTICES[i].position;
            let (pa, pb, pc) = (p(a), p(b), p(c));
            let cross = (pb[0] - pa[0]) * (pc[1] - pa[1]) - (pb[1] - pa[1]) * (pc[0] - pa[0]);
            assert!(cross > 0.0);
        }
    }

    #[test]
    fn test_quad_layout() {
        assert_eq!(std::mem::size_of::<QuadVertex>(), 16);
        assert_eq!(QUAD_VERTICES[2].uv, [0.0, 0.0]);
    }

    #[test]
    fn test_tone_mapping_names() {
        assert_eq!(TONE_MAPPING_MODES.len(), 8);
        assert_eq!(TONE_MAPPING_MODES[0], "None");
        assert_eq!(TONE_MAPPING_MODES[7], "Unreal");
    }
}
