//! Batched solid-color 2D mesh renderer.
//!
//! Draws a list of `scene::DrawItem2D` in one indexed draw call:
//! - each item's mesh is transformed to window pixels on the CPU (`item.transform`),
//! - its fill color is baked into the vertices,
//! - items are appended in `z` order, so painter's order needs no depth buffer.
//!
//! The only uniform is the pixel -> clip projection (Y down), rebuilt per frame from
//! the surface size.

use std::{borrow::Cow, mem};

use lyon::math::point;

use crate::render::gpu::Gpu;
use crate::scene::DrawItem2D;

fn round_up_to(v: u64, align: u64) -> u64 {
    debug_assert!(align.is_power_of_two());
    (v + (align - 1)) & !(align - 1)
}

/// GPU vertex: window-pixel position + straight-alpha color.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex2D {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex2D {
    pub const ATTRS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4];

    #[inline]
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex2D>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Column-major `mat4x4<f32>` for WGSL.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    clip_from_px: [[f32; 4]; 4],
}

/// Projection from window pixels (origin top-left, Y down) to clip space.
#[inline]
pub fn clip_from_px(width: f32, height: f32) -> glam::Mat4 {
    glam::Mat4::orthographic_rh(0.0, width.max(1.0), height.max(1.0), 0.0, -1.0, 1.0)
}

/// CPU-side batch for one frame.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Batch {
    pub vertices: Vec<Vertex2D>,
    pub indices: Vec<u32>,
}

impl Batch {
    /// Flatten `items` (sorted by `z`, stable) into one vertex/index list.
    pub fn build(items: &[DrawItem2D]) -> Self {
        let mut order: Vec<&DrawItem2D> = items.iter().filter(|i| !i.mesh.is_empty()).collect();
        order.sort_by_key(|i| i.z);

        let mut batch = Batch::default();
        for item in order {
            let base = batch.vertices.len() as u32;
            let color = item.fill.to_array();
            batch.vertices.extend(item.mesh.positions.iter().map(|&[x, y]| {
                let p = item.transform.transform_point(point(x, y));
                Vertex2D {
                    position: [p.x, p.y],
                    color,
                }
            }));
            batch
                .indices
                .extend(item.mesh.indices.iter().map(|&i| base + i));
        }
        batch
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Solid-color mesh renderer with growable vertex/index buffers.
pub struct MeshRenderer {
    pipeline: wgpu::RenderPipeline,

    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,

    vertex_buffer: wgpu::Buffer,
    vertex_capacity_bytes: u64,

    index_buffer: wgpu::Buffer,
    index_capacity_bytes: u64,
}

impl MeshRenderer {
    /// Create the pipeline targeting `gpu.surface_format.add_srgb_suffix()`.
    pub fn new(gpu: &Gpu) -> anyhow::Result<Self> {
        let shader = gpu
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("MeshRenderer Solid Shader"),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!(
                    "shaders/solid_mesh.wgsl"
                ))),
            });

        let uniform_bind_group_layout =
            gpu.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("MeshRenderer Uniform BGL"),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: wgpu::BufferSize::new(
                                mem::size_of::<Uniforms>() as u64
                            ),
                        },
                        count: None,
                    }],
                });

        let uniform_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("MeshRenderer Uniform Buffer"),
            size: mem::size_of::<Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("MeshRenderer Uniform BG"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = gpu
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("MeshRenderer Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                immediate_size: 0,
            });

        let pipeline = gpu
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("MeshRenderer Solid Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex2D::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: gpu.surface_format.add_srgb_suffix(),
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        let initial = 4096u64;
        let vertex_buffer = Self::create_buffer(
            gpu,
            "MeshRenderer Vertex Buffer",
            initial,
            wgpu::BufferUsages::VERTEX,
        );
        let index_buffer = Self::create_buffer(
            gpu,
            "MeshRenderer Index Buffer",
            initial,
            wgpu::BufferUsages::INDEX,
        );

        Ok(Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            vertex_buffer,
            vertex_capacity_bytes: initial,
            index_buffer,
            index_capacity_bytes: initial,
        })
    }

    fn create_buffer(
        gpu: &Gpu,
        label: &str,
        size: u64,
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Grow the vertex/index buffers to hold at least `vb_bytes` / `ib_bytes`.
    fn ensure_capacity(&mut self, gpu: &Gpu, vb_bytes: u64, ib_bytes: u64) {
        if vb_bytes > self.vertex_capacity_bytes {
            let new_size = vb_bytes.next_power_of_two();
            self.vertex_buffer = Self::create_buffer(
                gpu,
                "MeshRenderer Vertex Buffer (resized)",
                new_size,
                wgpu::BufferUsages::VERTEX,
            );
            self.vertex_capacity_bytes = new_size;
        }

        if ib_bytes > self.index_capacity_bytes {
            let new_size = ib_bytes.next_power_of_two();
            self.index_buffer = Self::create_buffer(
                gpu,
                "MeshRenderer Index Buffer (resized)",
                new_size,
                wgpu::BufferUsages::INDEX,
            );
            self.index_capacity_bytes = new_size;
        }
    }

    /// Upload `items` and record one draw into `pass`.
    ///
    /// The caller creates the pass and clears the target.
    pub fn draw_items(
        &mut self,
        gpu: &Gpu,
        pass: &mut wgpu::RenderPass<'_>,
        items: &[DrawItem2D],
    ) -> anyhow::Result<()> {
        let batch = Batch::build(items);
        if batch.is_empty() {
            return Ok(());
        }

        let uniforms = Uniforms {
            clip_from_px: clip_from_px(gpu.config.width as f32, gpu.config.height as f32)
                .to_cols_array_2d(),
        };
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        // `Queue::write_buffer` sizes must respect COPY_BUFFER_ALIGNMENT. Vertex data is
        // always a multiple of 4 bytes; u32 indices too.
        let vb_bytes = (batch.vertices.len() * mem::size_of::<Vertex2D>()) as u64;
        let ib_bytes = (batch.indices.len() * mem::size_of::<u32>()) as u64;
        let align = wgpu::COPY_BUFFER_ALIGNMENT;
        self.ensure_capacity(gpu, round_up_to(vb_bytes, align), round_up_to(ib_bytes, align));

        gpu.queue
            .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&batch.vertices));
        gpu.queue
            .write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&batch.indices));

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..vb_bytes));
        pass.set_index_buffer(self.index_buffer.slice(..ib_bytes), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..batch.indices.len() as u32, 0, 0..1);

        Ok(())
    }
}
