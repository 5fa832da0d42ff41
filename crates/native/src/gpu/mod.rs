//! wgpu implementation of [`RenderBackend`].

mod arena;
mod helpers;
mod lens_pass;
mod post;
mod scene_pass;
mod targets;

use std::sync::Arc;

use anyhow::Context;
use winit::window::Window;

use gargantua_core::backend::{
    MeshId, MipTarget, PassInvocation, PassOp, RenderBackend, ResolvedOutput,
};
use gargantua_core::bloom::{BloomStage, PostUniforms};
use gargantua_core::error::{FrameError, ResourceError};
use gargantua_core::graph::PassId;
use gargantua_core::lensing::LensUniforms;
use gargantua_core::mesh::MeshData;
use gargantua_core::targets::{TargetDesc, TargetId, Viewport};

use arena::UniformArena;
use lens_pass::LensPipelines;
use post::PostResources;
use scene_pass::{GpuMeshes, ScenePipelines};
use targets::GpuTargets;

pub static SCENE_WGSL: &str = include_str!("../../shaders/scene.wgsl");
pub static LENS_WGSL: &str = include_str!("../../shaders/lens.wgsl");
pub static POST_WGSL: &str = include_str!("../../shaders/post.wgsl");

struct FrameInFlight {
    surface: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    meshes: GpuMeshes,
    targets: GpuTargets,
    arena: UniformArena,
    scene: ScenePipelines,
    lens: LensPipelines,
    post: PostResources,
    frame: Option<FrameInFlight>,
}

impl WgpuBackend {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let viewport = Viewport::new(size.width, size.height);
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("No GPU adapter"))?;
        log::info!("[gpu] adapter {:?}", adapter.get_info().name);
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    label: Some("gargantua"),
                },
                None,
            )
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("surface reports no formats")?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: viewport.width,
            height: viewport.height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            desired_maximum_frame_latency: 2,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let module = |label: &str, source: &'static str| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        };
        let scene_shader = module("scene", SCENE_WGSL);
        let lens_shader = module("lens", LENS_WGSL);
        let post_shader = module("post", POST_WGSL);

        let arena = UniformArena::new(&device);
        let scene = ScenePipelines::new(&device, &scene_shader, &arena);
        let lens = LensPipelines::new(&device, &queue, &lens_shader);
        let post = PostResources::new(&device, &post_shader, format);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            meshes: GpuMeshes::default(),
            targets: GpuTargets::default(),
            arena,
            scene,
            lens,
            post,
            frame: None,
        })
    }

    /// Reapply the current surface configuration after the surface was lost.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    pub fn live_meshes(&self) -> usize {
        self.meshes.len()
    }

    fn record(&mut self, pass: &PassInvocation<'_>) -> Result<(), String> {
        let Self {
            device,
            meshes,
            targets,
            arena,
            scene,
            lens,
            post,
            frame,
            ..
        } = self;
        let frame = frame.as_mut().ok_or("no frame in flight")?;

        match pass.op {
            PassOp::Capture { draws, clear } => {
                let target = match pass.output {
                    ResolvedOutput::Target(id) => {
                        targets.get(id).ok_or(format!("unknown target {}", id.0))?
                    }
                    ResolvedOutput::Surface => return Err("captures cannot target the surface".into()),
                };
                let depth = target.depth.as_ref().ok_or("capture target has no depth")?;
                let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some(&target.desc.label),
                    color_attachments: &[Some(helpers::color_attachment(
                        &target.view,
                        wgpu::LoadOp::Clear(to_color(clear)),
                    ))],
                    depth_stencil_attachment: Some(depth_attachment(&depth.1)),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                scene.draw(&mut rpass, meshes, arena, pass.camera, draws, pass.detailed)
            }
            PassOp::Lens { uniforms, overlay } => {
                let target = match pass.output {
                    ResolvedOutput::Target(id) => {
                        targets.get(id).ok_or(format!("unknown target {}", id.0))?
                    }
                    ResolvedOutput::Surface => return Err("lensing writes an offscreen target".into()),
                };
                let input = |name: &str| {
                    pass.inputs
                        .iter()
                        .find(|(b, _)| b.name == name)
                        .and_then(|(_, id)| targets.get(*id))
                        .map(|t| &t.view)
                };
                let stars = input("t_stars").ok_or("t_stars is not bound")?;
                let scene_view = input("t_scene");
                if !overlay.is_empty() && target.depth.is_none() {
                    return Err("overlay draws need a depth attachment".into());
                }

                let offset = arena
                    .push::<LensUniforms>(&uniforms)
                    .ok_or("uniform arena exhausted")?;
                let bind_group = lens.bind(device, arena, stars, scene_view);
                let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("lens"),
                    color_attachments: &[Some(helpers::color_attachment(
                        &target.view,
                        wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    ))],
                    depth_stencil_attachment: target.depth.as_ref().map(|d| depth_attachment(&d.1)),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                rpass.set_pipeline(lens.pipeline(target.depth.is_some()));
                rpass.set_bind_group(0, &bind_group, &[offset]);
                rpass.draw(0..3, 0..1);
                scene.draw(&mut rpass, meshes, arena, pass.camera, overlay, pass.detailed)
            }
            PassOp::Bloom { stage, mips, time } => {
                let output = match pass.output {
                    ResolvedOutput::Surface => &frame.view,
                    ResolvedOutput::Target(_) => return Err("bloom presents to the surface".into()),
                };
                let (_, source_id) = pass.inputs.first().ok_or("bloom has no input")?;
                let source = targets
                    .get(*source_id)
                    .ok_or(format!("unknown target {}", source_id.0))?;
                let chain = mip_chain(targets, stage, mips, time)?;
                post.run(
                    device,
                    &mut frame.encoder,
                    arena,
                    (
                        &source.view,
                        stage.uniforms(0, (source.desc.width, source.desc.height), time),
                    ),
                    &chain,
                    output,
                )
            }
        }
    }
}

fn mip_chain<'t>(
    targets: &'t GpuTargets,
    stage: &BloomStage,
    mips: &[MipTarget],
    time: f32,
) -> Result<Vec<(&'t wgpu::TextureView, PostUniforms)>, String> {
    mips.iter()
        .enumerate()
        .map(|(level, m)| {
            let target = targets
                .get(m.id)
                .ok_or(format!("unknown bloom mip {}", m.id.0))?;
            Ok((&target.view, stage.uniforms(level, (m.width, m.height), time)))
        })
        .collect()
}

fn to_color(c: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: c[0] as f64,
        g: c[1] as f64,
        b: c[2] as f64,
        a: c[3] as f64,
    }
}

fn depth_attachment(view: &wgpu::TextureView) -> wgpu::RenderPassDepthStencilAttachment<'_> {
    wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(1.0),
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    }
}

fn pass_failed(pass: PassId, reason: String) -> FrameError {
    FrameError::PassFailed { pass, reason }
}

impl RenderBackend for WgpuBackend {
    fn create_target(&mut self, desc: &TargetDesc) -> Result<TargetId, ResourceError> {
        let id = self.targets.create(&self.device, desc)?;
        log::debug!(
            "[targets] {} {}x{} -> {}",
            desc.label,
            desc.width,
            desc.height,
            id.0
        );
        Ok(id)
    }

    fn release_target(&mut self, id: TargetId) {
        self.targets.release(id);
    }

    fn create_mesh(&mut self, label: &str, mesh: &MeshData) -> Result<MeshId, ResourceError> {
        self.meshes.create(&self.device, label, mesh)
    }

    fn release_mesh(&mut self, id: MeshId) {
        self.meshes.release(id);
    }

    fn resize_surface(&mut self, viewport: Viewport) {
        self.config.width = viewport.width;
        self.config.height = viewport.height;
        self.surface.configure(&self.device, &self.config);
    }

    fn begin_frame(&mut self) -> Result<(), FrameError> {
        if self.frame.take().is_some() {
            log::warn!("[frame] dropping a frame that was never submitted");
        }
        let surface = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Timeout) => return Err(FrameError::SurfaceTimeout),
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(FrameError::OutOfMemory),
            Err(e) => {
                log::debug!("[frame] surface unavailable: {}", e);
                return Err(FrameError::SurfaceLost);
            }
        };
        let view = surface
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        if self.arena.reset(&self.device) {
            self.scene.rebind(&self.device, &self.arena);
        }
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame"),
            });
        self.frame = Some(FrameInFlight {
            surface,
            view,
            encoder,
        });
        Ok(())
    }

    fn run_pass(&mut self, pass: &PassInvocation<'_>) -> Result<(), FrameError> {
        self.record(pass).map_err(|reason| pass_failed(pass.id, reason))
    }

    fn end_frame(&mut self) -> Result<(), FrameError> {
        let Some(frame) = self.frame.take() else {
            log::warn!("[frame] end_frame without a frame in flight");
            return Ok(());
        };
        self.arena.flush(&self.queue);
        self.queue.submit(Some(frame.encoder.finish()));
        frame.surface.present();
        Ok(())
    }
}

