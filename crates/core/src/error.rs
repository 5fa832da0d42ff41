use thiserror::Error;

use crate::graph::PassId;
use crate::targets::TargetSlot;

/// GPU resource allocation failures reported by a backend.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResourceError {
    #[error("target {label} of {width}x{height} exceeds the device limit of {limit}")]
    TooLarge {
        label: String,
        width: u32,
        height: u32,
        limit: u32,
    },
    #[error("zero-sized resource {0}")]
    ZeroSized(String),
    #[error("out of device memory while allocating {0}")]
    OutOfMemory(String),
}

/// Pass graph validation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("{slot:?} is written by both {first:?} and {second:?}")]
    MultipleWriters {
        slot: TargetSlot,
        first: PassId,
        second: PassId,
    },
    #[error("{pass:?} reads {slot:?} but no pass writes it")]
    UnboundInput { pass: PassId, slot: TargetSlot },
    #[error("pass graph contains a cycle through {0:?}")]
    Cycle(PassId),
    #[error("pass graph has no pass presenting to the surface")]
    NoPresenter,
}

/// Failures raised while recording or submitting a frame.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    #[error("surface lost or outdated")]
    SurfaceLost,
    #[error("surface acquisition timed out")]
    SurfaceTimeout,
    #[error("device out of memory")]
    OutOfMemory,
    #[error("{pass:?} failed: {reason}")]
    PassFailed { pass: PassId, reason: String },
    #[error("{pass:?} read {slot:?} before it was written this frame")]
    ReadBeforeWrite { pass: PassId, slot: TargetSlot },
    #[error("unknown resource handle {0}")]
    UnknownHandle(u64),
}

/// Profile table and configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown mode {0:?}")]
    UnknownMode(String),
    #[error("profile {name:?} is invalid: {reason}")]
    InvalidProfile { name: String, reason: String },
    #[error("profile produced an invalid pass graph: {0}")]
    Graph(#[from] GraphError),
    #[error("failed to parse profile overrides: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
