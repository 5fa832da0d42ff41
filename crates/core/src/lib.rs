pub mod backend;
pub mod bloom;
pub mod camera;
pub mod clock;
pub mod constants;
pub mod controls;
pub mod error;
pub mod gesture;
pub mod graph;
pub mod headless;
pub mod lensing;
pub mod mesh;
pub mod orchestrator;
pub mod profile;
pub mod scene;
pub mod targets;

pub use backend::{DrawItem, MeshId, PassInvocation, PassOp, RenderBackend, ResolvedOutput};
pub use bloom::BloomStage;
pub use clock::FrameClock;
pub use controls::{BloomParam, UiControls};
pub use error::{ConfigError, FrameError, GraphError, ResourceError};
pub use gesture::{GestureInbox, GestureSample, GestureSignal, GestureSmoother};
pub use graph::{PassGraph, PassId};
pub use headless::HeadlessBackend;
pub use lensing::{HorizonPolicy, LensUniforms};
pub use orchestrator::{FrameInput, FrameReport, Orchestrator, SkipReason};
pub use profile::{BloomSettings, LensModel, ModeProfile, ProfileSet};
pub use scene::{EntityKind, Material, SceneGraph, ShaderParams, SubScene};
pub use targets::{TargetId, TargetSlot, Viewport};
