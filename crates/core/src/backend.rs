//! The seam between the orchestrator and a concrete GPU API.
//!
//! The orchestrator decides *what* runs and in which order; a backend only
//! allocates handles and records the pass it is handed. The native front-end
//! implements this over wgpu, [`crate::headless::HeadlessBackend`] implements
//! it without a device.

use glam::{Mat4, Vec3};

use crate::bloom::BloomStage;
use crate::error::{FrameError, ResourceError};
use crate::graph::{PassId, TextureBinding};
use crate::lensing::LensUniforms;
use crate::mesh::{MeshData, Topology};
use crate::scene::{Material, ShaderParams};
use crate::targets::{TargetDesc, TargetId, Viewport};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u64);

/// One mesh draw inside a scene pass.
#[derive(Clone, Copy, Debug)]
pub struct DrawItem {
    pub mesh: MeshId,
    pub topology: Topology,
    pub material: Material,
    pub model: Mat4,
    pub params: ShaderParams,
}

#[derive(Clone, Copy, Debug)]
pub struct CameraMatrices {
    pub view_proj: Mat4,
    pub eye: Vec3,
}

/// Per-draw uniform block. Layout matches `DrawUniforms` in `scene.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    /// age, intensity, spin, pulse
    pub params: [f32; 4],
    /// material id, detailed shading flag, unused, unused
    pub material: [f32; 4],
}

impl DrawUniforms {
    pub fn new(camera: &CameraMatrices, item: &DrawItem, detailed: bool) -> Self {
        let p = item.params;
        Self {
            view_proj: camera.view_proj.to_cols_array_2d(),
            model: item.model.to_cols_array_2d(),
            params: [p.age, p.intensity, p.spin, p.pulse],
            material: [
                item.material.shader_id() as f32,
                if detailed { 1.0 } else { 0.0 },
                0.0,
                0.0,
            ],
        }
    }
}

/// A bloom mip handed to the backend, largest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MipTarget {
    pub id: TargetId,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolvedOutput {
    Target(TargetId),
    Surface,
}

pub enum PassOp<'a> {
    /// Clear the output and draw a sub-scene into it.
    Capture {
        draws: &'a [DrawItem],
        clear: [f32; 4],
    },
    /// Full-screen lensing over the bound captures, then draw `overlay` on top.
    Lens {
        uniforms: LensUniforms,
        overlay: &'a [DrawItem],
    },
    /// Threshold, mip blur and recombine the single input onto the output.
    Bloom {
        stage: &'a BloomStage,
        mips: &'a [MipTarget],
        time: f32,
    },
}

impl PassOp<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            PassOp::Capture { .. } => "capture",
            PassOp::Lens { .. } => "lens",
            PassOp::Bloom { .. } => "bloom",
        }
    }
}

/// Everything a backend needs to record one pass. Parameters are passed in,
/// never read from shared mutable state.
pub struct PassInvocation<'a> {
    pub id: PassId,
    pub inputs: &'a [(TextureBinding, TargetId)],
    pub output: ResolvedOutput,
    pub camera: &'a CameraMatrices,
    pub detailed: bool,
    pub op: PassOp<'a>,
}

pub trait RenderBackend {
    fn create_target(&mut self, desc: &TargetDesc) -> Result<TargetId, ResourceError>;
    fn release_target(&mut self, id: TargetId);

    fn create_mesh(&mut self, label: &str, mesh: &MeshData) -> Result<MeshId, ResourceError>;
    fn release_mesh(&mut self, id: MeshId);

    /// Reconfigure the presentation surface.
    fn resize_surface(&mut self, viewport: Viewport);

    fn begin_frame(&mut self) -> Result<(), FrameError>;
    fn run_pass(&mut self, pass: &PassInvocation<'_>) -> Result<(), FrameError>;
    /// Submit recorded work and present.
    fn end_frame(&mut self) -> Result<(), FrameError>;
}
