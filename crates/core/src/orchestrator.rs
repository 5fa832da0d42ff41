//! Frame orchestration: owns the targets, the pass graph, the scene and the
//! active profile, and runs one frame at a time against a [`RenderBackend`].
//!
//! Mode changes and resizes take `&mut self` and therefore can never
//! interleave with a frame in flight.

use fnv::FnvHashMap;
use smallvec::SmallVec;

use crate::backend::{
    CameraMatrices, DrawItem, MipTarget, PassInvocation, PassOp, RenderBackend, ResolvedOutput,
};
use crate::bloom::BloomStage;
use crate::camera::CameraRig;
use crate::controls::UiControls;
use crate::error::{ConfigError, FrameError};
use crate::gesture::GestureSmoother;
use crate::graph::{OutputBinding, PassGraph, PassId, PassNode, TextureBinding};
use crate::lensing::{HorizonPolicy, LensUniforms};
use crate::profile::{ModeProfile, ProfileSet};
use crate::scene::{SceneGraph, SubScene};
use crate::targets::{TargetId, TargetPool, TargetSize, TargetSlot, Viewport};

const STARS_CLEAR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
const FOREGROUND_CLEAR: [f32; 4] = [0.0, 0.0, 0.0, 0.0];

/// Per-frame inputs from the host loop.
pub struct FrameInput<'a> {
    /// Seconds since the previous frame.
    pub dt: f32,
    pub gesture: &'a mut GestureSmoother,
    pub controls: &'a UiControls,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SkipReason {
    /// The pass's output target is vacant.
    OutputMissing(TargetSlot),
    /// An input target is vacant or was not written this frame.
    InputUnavailable(TargetSlot),
    /// The backend rejected the pass.
    Failed(FrameError),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub executed: Vec<PassId>,
    pub skipped: Vec<(PassId, SkipReason)>,
    /// A bloom pass reached the surface.
    pub presented: bool,
}

/// Tracks which slots were written during the current frame and which pass
/// currently holds the write target.
#[derive(Debug, Default)]
pub struct FrameLedger {
    next_sequence: u64,
    written: FnvHashMap<TargetSlot, u64>,
    active: Option<(PassId, OutputBinding)>,
}

impl FrameLedger {
    pub fn begin_frame(&mut self) {
        self.written.clear();
        self.active = None;
    }

    pub fn open(&mut self, pass: PassId, output: OutputBinding) {
        self.active = Some((pass, output));
    }

    /// Sequence number of this frame's write to `slot`.
    pub fn check_read(&self, pass: PassId, slot: TargetSlot) -> Result<u64, FrameError> {
        self.written
            .get(&slot)
            .copied()
            .ok_or(FrameError::ReadBeforeWrite { pass, slot })
    }

    /// Close the active pass. The active target is cleared whether or not the pass succeeded.
    pub fn close(&mut self, succeeded: bool) {
        if let Some((_, OutputBinding::Target(slot))) = self.active.take() {
            if succeeded {
                self.written.insert(slot, self.next_sequence);
            }
        }
        self.next_sequence += 1;
    }

    pub fn active(&self) -> Option<(PassId, OutputBinding)> {
        self.active
    }

    pub fn written(&self, slot: TargetSlot) -> Option<u64> {
        self.written.get(&slot).copied()
    }
}

pub struct Orchestrator<B: RenderBackend> {
    backend: B,
    profiles: ProfileSet,
    mode: String,
    profile: ModeProfile,
    viewport: Viewport,
    policy: HorizonPolicy,
    pool: TargetPool,
    graph: PassGraph,
    bloom: BloomStage,
    scene: SceneGraph,
    rig: CameraRig,
    ledger: FrameLedger,
    time: f32,
    frame: u64,
}

impl<B: RenderBackend> Orchestrator<B> {
    pub fn new(
        mut backend: B,
        profiles: ProfileSet,
        mode: &str,
        viewport: Viewport,
        policy: HorizonPolicy,
    ) -> Result<Self, ConfigError> {
        let profile = profiles.get(mode)?.clone();
        let graph = PassGraph::for_profile(&profile)?;
        backend.resize_surface(viewport);
        let scene = SceneGraph::build(&mut backend, &profile);
        let mut rig = CameraRig::new(1.0);
        rig.set_aspect(viewport.width, viewport.height);

        let mut orchestrator = Self {
            backend,
            profiles,
            mode: mode.to_string(),
            bloom: BloomStage::new(profile.bloom),
            profile,
            viewport,
            policy,
            pool: TargetPool::new(),
            graph,
            scene,
            rig,
            ledger: FrameLedger::default(),
            time: 0.0,
            frame: 0,
        };
        orchestrator.allocate_targets();
        log::info!(
            "[mode] started in {:?} at {}x{} (horizon {:?})",
            orchestrator.mode,
            viewport.width,
            viewport.height,
            policy
        );
        Ok(orchestrator)
    }

    /// Switch to the profile named `name`. Re-applying the active mode is a no-op
    /// for resources.
    pub fn apply_mode(&mut self, name: &str) -> Result<(), ConfigError> {
        let profile = self.profiles.get(name)?.clone();
        let graph = PassGraph::for_profile(&profile)?;

        self.bloom.set_params(profile.bloom);
        self.scene.apply_profile(&mut self.backend, &profile);
        self.profile = profile;
        self.mode = name.to_string();
        self.graph = graph;
        self.allocate_targets();
        log::info!(
            "[mode] {} active: {} stars, {} disk segments, capture {}px, {} passes",
            self.mode,
            self.profile.star_count,
            self.profile.disk_segments,
            self.profile.capture_resolution,
            self.graph.passes().len()
        );
        Ok(())
    }

    /// Cycle to the next mode in the profile table and return its name.
    pub fn toggle_mode(&mut self) -> Result<String, ConfigError> {
        let next = self
            .profiles
            .next_after(&self.mode)
            .map(str::to_string)
            .ok_or_else(|| ConfigError::UnknownMode(self.mode.clone()))?;
        self.apply_mode(&next)?;
        Ok(next)
    }

    /// Reallocate window-sized targets. Profile-scoped resources are untouched.
    pub fn resize(&mut self, width: u32, height: u32) {
        let viewport = Viewport::new(width, height);
        if viewport == self.viewport {
            return;
        }
        self.viewport = viewport;
        self.backend.resize_surface(viewport);
        self.pool.resize_window_targets(&mut self.backend, viewport);
        self.rig.set_aspect(viewport.width, viewport.height);
        log::debug!("[resize] {}x{}", viewport.width, viewport.height);
    }

    pub fn set_horizon_policy(&mut self, policy: HorizonPolicy) {
        if policy != self.policy {
            log::info!("[lens] horizon policy {:?}", policy);
        }
        self.policy = policy;
    }

    pub fn orbit(&mut self, d_yaw: f32, d_pitch: f32) {
        self.rig.orbit(d_yaw, d_pitch);
    }

    /// Run one frame: smoothing, scene update, every pass in graph order, present.
    pub fn render_frame(&mut self, input: FrameInput<'_>) -> Result<FrameReport, FrameError> {
        input.gesture.update();
        let dt = if input.dt.is_finite() { input.dt.max(0.0) } else { 0.0 };
        self.time += dt;
        self.scene
            .update(dt, &input.gesture.smoothed(), input.controls);
        self.bloom
            .set_params(input.controls.bloom.unwrap_or(self.profile.bloom));
        let camera = self.rig.update(self.time, self.profile.camera_auto_speed);
        let camera = CameraMatrices {
            view_proj: camera.view_projection(),
            eye: camera.eye,
        };

        let background = self.scene.draw_list(SubScene::Background, self.policy);
        let foreground = self.scene.draw_list(SubScene::Foreground, self.policy);
        let aspect = self.viewport.width as f32 / self.viewport.height as f32;
        let overlay: &[DrawItem] = if self.profile.dual_capture {
            &[]
        } else {
            &foreground
        };
        let lens = LensUniforms::for_profile(&self.profile, self.time, aspect).sanitized();
        let mips: SmallVec<[MipTarget; 6]> = self
            .bloom
            .mip_slots()
            .filter_map(|(slot, _)| self.pool.get(slot))
            .map(|t| MipTarget {
                id: t.id,
                width: t.desc.width,
                height: t.desc.height,
            })
            .collect();

        self.backend.begin_frame()?;
        self.ledger.begin_frame();
        let mut report = FrameReport {
            frame: self.frame,
            ..FrameReport::default()
        };

        for node in self.graph.passes() {
            let output = match node.output {
                OutputBinding::Target(slot) => match self.pool.id(slot) {
                    Some(id) => ResolvedOutput::Target(id),
                    None => {
                        report.skipped.push((node.id, SkipReason::OutputMissing(slot)));
                        continue;
                    }
                },
                OutputBinding::Surface => ResolvedOutput::Surface,
            };
            let inputs = match self.resolve_inputs(node) {
                Ok(inputs) => inputs,
                Err(slot) => {
                    report.skipped.push((node.id, SkipReason::InputUnavailable(slot)));
                    continue;
                }
            };
            let op = match node.id {
                PassId::StarCapture => PassOp::Capture {
                    draws: &background,
                    clear: STARS_CLEAR,
                },
                PassId::ForegroundCapture => PassOp::Capture {
                    draws: &foreground,
                    clear: FOREGROUND_CLEAR,
                },
                PassId::Lensing => PassOp::Lens {
                    uniforms: lens,
                    overlay,
                },
                PassId::Bloom => {
                    if mips.len() != self.bloom.levels() {
                        let missing = self
                            .bloom
                            .mip_slots()
                            .map(|(slot, _)| slot)
                            .find(|slot| self.pool.id(*slot).is_none())
                            .unwrap_or(TargetSlot::BloomMip(0));
                        report.skipped.push((node.id, SkipReason::OutputMissing(missing)));
                        continue;
                    }
                    PassOp::Bloom {
                        stage: &self.bloom,
                        mips: &mips,
                        time: self.time,
                    }
                }
            };
            let invocation = PassInvocation {
                id: node.id,
                inputs: &inputs,
                output,
                camera: &camera,
                detailed: self.profile.detailed_shading,
                op,
            };

            self.ledger.open(node.id, node.output);
            let result = self.backend.run_pass(&invocation);
            self.ledger.close(result.is_ok());
            match result {
                Ok(()) => report.executed.push(node.id),
                Err(e) => {
                    log::warn!("[frame] {:?} failed: {}", node.id, e);
                    report.skipped.push((node.id, SkipReason::Failed(e)));
                }
            }
        }

        self.backend.end_frame()?;
        report.presented = report.executed.contains(&PassId::Bloom);
        self.frame += 1;
        Ok(report)
    }

    /// Release every mesh and target. The orchestrator must not render afterwards.
    pub fn teardown(&mut self) {
        self.scene.release_all(&mut self.backend);
        self.pool.release_all(&mut self.backend);
        log::info!("[mode] torn down after {} frames", self.frame);
    }

    fn resolve_inputs(
        &self,
        node: &PassNode,
    ) -> Result<SmallVec<[(TextureBinding, TargetId); 2]>, TargetSlot> {
        node.inputs
            .iter()
            .map(|b| {
                let id = self.pool.id(b.slot).ok_or(b.slot)?;
                self.ledger
                    .check_read(node.id, b.slot)
                    .map_err(|_| b.slot)?;
                Ok((*b, id))
            })
            .collect()
    }

    /// Bring the pool in line with the current profile and graph.
    fn allocate_targets(&mut self) {
        let mut wanted: SmallVec<[(TargetSlot, TargetSize, bool); 8]> = SmallVec::new();
        let dual = self.profile.dual_capture;
        wanted.push((
            TargetSlot::Stars,
            TargetSize::Fixed(self.profile.capture_resolution),
            true,
        ));
        if self.graph.contains(PassId::ForegroundCapture) {
            wanted.push((TargetSlot::Foreground, TargetSize::Window { divisor: 1 }, true));
        }
        // single capture draws the foreground straight into the composite
        wanted.push((TargetSlot::Composite, TargetSize::Window { divisor: 1 }, !dual));
        wanted.extend(self.bloom.mip_slots().map(|(slot, size)| (slot, size, false)));

        self.pool
            .retain(&mut self.backend, |slot| wanted.iter().any(|(s, _, _)| *s == slot));
        for (slot, size, depth) in wanted {
            self.pool
                .ensure(&mut self.backend, slot, size, self.viewport, depth);
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    pub fn profile(&self) -> &ModeProfile {
        &self.profile
    }

    pub fn profiles(&self) -> &ProfileSet {
        &self.profiles
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn horizon_policy(&self) -> HorizonPolicy {
        self.policy
    }

    pub fn targets(&self) -> &TargetPool {
        &self.pool
    }

    pub fn graph(&self) -> &PassGraph {
        &self.graph
    }

    pub fn bloom(&self) -> &BloomStage {
        &self.bloom
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    pub fn ledger(&self) -> &FrameLedger {
        &self.ledger
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn frame_index(&self) -> u64 {
        self.frame
    }
}
