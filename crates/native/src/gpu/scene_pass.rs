//! Mesh upload and the scene draw pipelines shared by capture and overlay passes.

use fnv::FnvHashMap;
use wgpu::util::DeviceExt;

use gargantua_core::backend::{CameraMatrices, DrawItem, DrawUniforms, MeshId};
use gargantua_core::error::ResourceError;
use gargantua_core::mesh::{MeshData, Topology, Vertex};

use super::arena::UniformArena;
use super::helpers::{self, DEPTH_FORMAT, HDR_FORMAT};

pub struct GpuMesh {
    vertices: wgpu::Buffer,
    indices: Option<wgpu::Buffer>,
    count: u32,
}

#[derive(Default)]
pub struct GpuMeshes {
    next_id: u64,
    live: FnvHashMap<MeshId, GpuMesh>,
}

impl GpuMeshes {
    pub fn create(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        mesh: &MeshData,
    ) -> Result<MeshId, ResourceError> {
        if mesh.vertices.is_empty() {
            return Err(ResourceError::ZeroSized(label.to_string()));
        }
        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let (indices, count) = if mesh.indices.is_empty() {
            (None, mesh.vertices.len() as u32)
        } else {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label}_indices")),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            (Some(buffer), mesh.indices.len() as u32)
        };
        self.next_id += 1;
        let id = MeshId(self.next_id);
        self.live.insert(
            id,
            GpuMesh {
                vertices,
                indices,
                count,
            },
        );
        Ok(id)
    }

    pub fn release(&mut self, id: MeshId) {
        match self.live.remove(&id) {
            Some(mesh) => {
                mesh.vertices.destroy();
                if let Some(indices) = mesh.indices {
                    indices.destroy();
                }
            }
            None => log::warn!("[gpu] release of unknown mesh {}", id.0),
        }
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }
}

pub struct ScenePipelines {
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    opaque: wgpu::RenderPipeline,
    occluder: wgpu::RenderPipeline,
    additive: wgpu::RenderPipeline,
    points: wgpu::RenderPipeline,
}

impl ScenePipelines {
    pub fn new(device: &wgpu::Device, shader: &wgpu::ShaderModule, arena: &UniformArena) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene_bgl"),
            entries: &[helpers::dynamic_uniform_entry::<DrawUniforms>(
                0,
                wgpu::ShaderStages::VERTEX_FRAGMENT,
            )],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pl"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let bind_group = create_bind_group(device, &layout, arena);

        let make = |label: &str,
                    topology: wgpu::PrimitiveTopology,
                    blend: Option<wgpu::BlendState>,
                    write_mask: wgpu::ColorWrites,
                    depth_write: bool| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &[wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x3,
                            offset: 0,
                            shader_location: 0,
                        }],
                    }],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: depth_write,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: HDR_FORMAT,
                        blend,
                        write_mask,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                cache: None,
                multiview: None,
            })
        };

        let opaque = make(
            "scene_opaque",
            wgpu::PrimitiveTopology::TriangleList,
            Some(wgpu::BlendState::REPLACE),
            wgpu::ColorWrites::ALL,
            true,
        );
        let occluder = make(
            "scene_occluder",
            wgpu::PrimitiveTopology::TriangleList,
            None,
            wgpu::ColorWrites::empty(),
            true,
        );
        let additive = make(
            "scene_additive",
            wgpu::PrimitiveTopology::TriangleList,
            Some(helpers::ADDITIVE),
            wgpu::ColorWrites::ALL,
            false,
        );
        let points = make(
            "scene_points",
            wgpu::PrimitiveTopology::PointList,
            Some(helpers::ADDITIVE),
            wgpu::ColorWrites::ALL,
            false,
        );

        Self {
            layout,
            bind_group,
            opaque,
            occluder,
            additive,
            points,
        }
    }

    /// Rebuild the bind group after the arena buffer was reallocated.
    pub fn rebind(&mut self, device: &wgpu::Device, arena: &UniformArena) {
        self.bind_group = create_bind_group(device, &self.layout, arena);
    }

    /// Record `draws` into an open pass. Draw order is preserved.
    pub fn draw(
        &self,
        rpass: &mut wgpu::RenderPass<'_>,
        meshes: &GpuMeshes,
        arena: &mut UniformArena,
        camera: &CameraMatrices,
        draws: &[DrawItem],
        detailed: bool,
    ) -> Result<(), String> {
        for item in draws {
            let mesh = meshes
                .live
                .get(&item.mesh)
                .ok_or_else(|| format!("unknown mesh {}", item.mesh.0))?;
            let offset = arena
                .push(&DrawUniforms::new(camera, item, detailed))
                .ok_or("uniform arena exhausted")?;
            let pipeline = match (item.topology, item.material.is_opaque()) {
                (Topology::Points, _) => &self.points,
                (Topology::Triangles, true) if !item.material.writes_color() => &self.occluder,
                (Topology::Triangles, true) => &self.opaque,
                (Topology::Triangles, false) => &self.additive,
            };
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &self.bind_group, &[offset]);
            rpass.set_vertex_buffer(0, mesh.vertices.slice(..));
            match &mesh.indices {
                Some(indices) => {
                    rpass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                    rpass.draw_indexed(0..mesh.count, 0, 0..1);
                }
                None => rpass.draw(0..mesh.count, 0..1),
            }
        }
        Ok(())
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    arena: &UniformArena,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("scene_bg"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: helpers::arena_binding::<DrawUniforms>(arena.buffer()),
        }],
    })
}
