//! Device-less backend. Hands out ids, tracks what is live and records every
//! pass it is asked to run, so orchestration can be tested and smoke-run
//! without a GPU.

use fnv::FnvHashMap;

use crate::backend::{MeshId, PassInvocation, PassOp, RenderBackend, ResolvedOutput};
use crate::error::{FrameError, ResourceError};
use crate::graph::PassId;
use crate::mesh::MeshData;
use crate::profile::BloomSettings;
use crate::scene::Material;
use crate::targets::{TargetDesc, TargetId, Viewport};

/// What the backend saw for one executed pass.
#[derive(Clone, Debug, PartialEq)]
pub struct PassRecord {
    /// Global, strictly increasing across frames.
    pub sequence: u64,
    pub frame: u64,
    pub pass: PassId,
    pub op: &'static str,
    pub inputs: Vec<(&'static str, TargetId)>,
    pub output: ResolvedOutput,
    pub materials: Vec<Material>,
    pub lens_strength: Option<f32>,
    pub bloom: Option<BloomSettings>,
    pub mip_count: usize,
}

pub struct HeadlessBackend {
    next_id: u64,
    targets: FnvHashMap<TargetId, TargetDesc>,
    meshes: FnvHashMap<MeshId, usize>,
    target_allocations: usize,
    mesh_allocations: usize,
    surface: Viewport,
    frame: u64,
    sequence: u64,
    in_frame: bool,
    frames_presented: u64,
    log: Vec<PassRecord>,
    log_limit: Option<usize>,
    max_target_dim: Option<u32>,
    failing_pass: Option<PassId>,
    begin_failure: Option<FrameError>,
}

impl HeadlessBackend {
    pub fn new(surface: Viewport) -> Self {
        Self {
            next_id: 1,
            targets: FnvHashMap::default(),
            meshes: FnvHashMap::default(),
            target_allocations: 0,
            mesh_allocations: 0,
            surface,
            frame: 0,
            sequence: 0,
            in_frame: false,
            frames_presented: 0,
            log: Vec::new(),
            log_limit: None,
            max_target_dim: None,
            failing_pass: None,
            begin_failure: None,
        }
    }

    /// Keep only the newest `limit` pass records. Unbounded by default.
    pub fn with_pass_log_limit(mut self, limit: usize) -> Self {
        self.log_limit = Some(limit);
        self.trim_log();
        self
    }

    /// Reject targets with either edge above `limit`.
    pub fn set_max_target_dim(&mut self, limit: Option<u32>) {
        self.max_target_dim = limit;
    }

    /// Make every run of `pass` fail until cleared.
    pub fn fail_pass(&mut self, pass: Option<PassId>) {
        self.failing_pass = pass;
    }

    /// Fail the next `begin_frame` with `err`.
    pub fn fail_next_frame(&mut self, err: FrameError) {
        self.begin_failure = Some(err);
    }

    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    pub fn live_meshes(&self) -> usize {
        self.meshes.len()
    }

    pub fn target(&self, id: TargetId) -> Option<&TargetDesc> {
        self.targets.get(&id)
    }

    pub fn live_target_descs(&self) -> impl Iterator<Item = &TargetDesc> {
        self.targets.values()
    }

    pub fn target_labeled(&self, label: &str) -> Option<&TargetDesc> {
        self.targets.values().find(|d| d.label == label)
    }

    /// Vertex count of a live mesh.
    pub fn mesh_vertices(&self, id: MeshId) -> Option<usize> {
        self.meshes.get(&id).copied()
    }

    /// Total successful target creations since construction.
    pub fn target_allocations(&self) -> usize {
        self.target_allocations
    }

    pub fn mesh_allocations(&self) -> usize {
        self.mesh_allocations
    }

    pub fn surface(&self) -> Viewport {
        self.surface
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn passes(&self) -> &[PassRecord] {
        &self.log
    }

    pub fn passes_in_frame(&self, frame: u64) -> impl Iterator<Item = &PassRecord> {
        self.log.iter().filter(move |r| r.frame == frame)
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    fn trim_log(&mut self) {
        if let Some(limit) = self.log_limit {
            let excess = self.log.len().saturating_sub(limit);
            if excess > 0 {
                self.log.drain(..excess);
            }
        }
    }

    fn next_handle(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn check_live(&self, id: TargetId) -> Result<(), FrameError> {
        if self.targets.contains_key(&id) {
            Ok(())
        } else {
            Err(FrameError::UnknownHandle(id.0))
        }
    }
}

impl RenderBackend for HeadlessBackend {
    fn create_target(&mut self, desc: &TargetDesc) -> Result<TargetId, ResourceError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(ResourceError::ZeroSized(desc.label.clone()));
        }
        if let Some(limit) = self.max_target_dim {
            if desc.width > limit || desc.height > limit {
                return Err(ResourceError::TooLarge {
                    label: desc.label.clone(),
                    width: desc.width,
                    height: desc.height,
                    limit,
                });
            }
        }
        let id = TargetId(self.next_handle());
        self.targets.insert(id, desc.clone());
        self.target_allocations += 1;
        Ok(id)
    }

    fn release_target(&mut self, id: TargetId) {
        if self.targets.remove(&id).is_none() {
            log::warn!("[headless] release of unknown target {}", id.0);
        }
    }

    fn create_mesh(&mut self, label: &str, mesh: &MeshData) -> Result<MeshId, ResourceError> {
        if mesh.vertices.is_empty() {
            return Err(ResourceError::ZeroSized(label.to_string()));
        }
        let id = MeshId(self.next_handle());
        self.meshes.insert(id, mesh.vertices.len());
        self.mesh_allocations += 1;
        Ok(id)
    }

    fn release_mesh(&mut self, id: MeshId) {
        if self.meshes.remove(&id).is_none() {
            log::warn!("[headless] release of unknown mesh {}", id.0);
        }
    }

    fn resize_surface(&mut self, viewport: Viewport) {
        self.surface = viewport;
    }

    fn begin_frame(&mut self) -> Result<(), FrameError> {
        if let Some(err) = self.begin_failure.take() {
            return Err(err);
        }
        self.in_frame = true;
        Ok(())
    }

    fn run_pass(&mut self, pass: &PassInvocation<'_>) -> Result<(), FrameError> {
        if !self.in_frame {
            return Err(FrameError::PassFailed {
                pass: pass.id,
                reason: "no frame in progress".into(),
            });
        }
        if self.failing_pass == Some(pass.id) {
            return Err(FrameError::PassFailed {
                pass: pass.id,
                reason: "injected failure".into(),
            });
        }
        for (_, id) in pass.inputs {
            self.check_live(*id)?;
        }
        if let ResolvedOutput::Target(id) = pass.output {
            self.check_live(id)?;
        }

        let mut record = PassRecord {
            sequence: self.sequence,
            frame: self.frame,
            pass: pass.id,
            op: pass.op.name(),
            inputs: pass.inputs.iter().map(|(b, id)| (b.name, *id)).collect(),
            output: pass.output,
            materials: Vec::new(),
            lens_strength: None,
            bloom: None,
            mip_count: 0,
        };
        match &pass.op {
            PassOp::Capture { draws, .. } => {
                record.materials = draws.iter().map(|d| d.material).collect();
            }
            PassOp::Lens { uniforms, overlay } => {
                record.lens_strength = Some(uniforms.strength);
                record.materials = overlay.iter().map(|d| d.material).collect();
            }
            PassOp::Bloom { stage, mips, .. } => {
                for mip in mips.iter() {
                    self.check_live(mip.id)?;
                }
                record.bloom = Some(stage.settings());
                record.mip_count = mips.len();
            }
        }
        self.sequence += 1;
        self.log.push(record);
        self.trim_log();
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), FrameError> {
        if self.in_frame {
            self.in_frame = false;
            self.frames_presented += 1;
        }
        self.frame += 1;
        Ok(())
    }
}
