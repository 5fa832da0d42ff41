//! Gesture input: a last-value-wins inbox written by the input producer and
//! an exponential smoother read once per rendered frame.
//!
//! The producer (pointer handler, hand tracker, ...) runs on its own timeline
//! and only ever calls [`GestureInbox::publish`]. The frame loop owns a
//! [`GestureSmoother`] and calls [`GestureSmoother::update`] exactly once per
//! frame. Smoothing is a two-stage decay while the hand is lost: the raw
//! target relaxes toward rest, and the smoothed value follows the raw target.

use std::sync::{Arc, Mutex, TryLockError};

use crate::constants::*;

/// Instantaneous control values in their bounded ranges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureSignal {
    pub scale: f32,
    pub rot_x: f32,
    pub rot_y: f32,
    pub pulse: f32,
}

impl GestureSignal {
    /// Idle pose: unit scale, no tilt, no pulse.
    pub const REST: GestureSignal = GestureSignal {
        scale: 1.0,
        rot_x: 0.0,
        rot_y: 0.0,
        pulse: 0.0,
    };

    pub fn new(scale: f32, rot_x: f32, rot_y: f32, pulse: f32) -> Self {
        Self {
            scale,
            rot_x,
            rot_y,
            pulse,
        }
    }

    /// Clamp every field into its declared range. Non-finite fields fall back to rest.
    pub fn clamped(self) -> Self {
        let finite_or = |v: f32, rest: f32| if v.is_finite() { v } else { rest };
        Self {
            scale: finite_or(self.scale, Self::REST.scale)
                .clamp(GESTURE_SCALE_MIN, GESTURE_SCALE_MAX),
            rot_x: finite_or(self.rot_x, 0.0).clamp(-GESTURE_ROT_LIMIT, GESTURE_ROT_LIMIT),
            rot_y: finite_or(self.rot_y, 0.0).clamp(-GESTURE_ROT_LIMIT, GESTURE_ROT_LIMIT),
            pulse: finite_or(self.pulse, 0.0).clamp(0.0, GESTURE_PULSE_MAX),
        }
    }

    fn relax_toward_rest(&mut self) {
        self.scale += (Self::REST.scale - self.scale) * RELAX_RATE_SCALE;
        self.rot_x *= RELAX_FACTOR_ROTATION;
        self.rot_y *= RELAX_FACTOR_ROTATION;
        self.pulse *= RELAX_FACTOR_PULSE;
    }

    fn follow(&mut self, target: &GestureSignal) {
        self.scale += (target.scale - self.scale) * SMOOTH_RATE_SCALE;
        self.rot_x += (target.rot_x - self.rot_x) * SMOOTH_RATE_ROTATION;
        self.rot_y += (target.rot_y - self.rot_y) * SMOOTH_RATE_ROTATION;
        self.pulse += (target.pulse - self.pulse) * SMOOTH_RATE_PULSE;
    }
}

impl Default for GestureSignal {
    fn default() -> Self {
        Self::REST
    }
}

/// One report from the input producer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureSample {
    Detected(GestureSignal),
    /// The producer ran but saw no hand / pointer.
    Lost,
}

#[derive(Default)]
struct Slot {
    latest: Option<GestureSample>,
    sequence: u64,
}

enum Poll {
    Fresh(u64, GestureSample),
    Unchanged,
}

/// Shared last-value-wins slot between the input producer and the frame loop.
///
/// Newer samples overwrite older ones; nothing is queued.
#[derive(Clone, Default)]
pub struct GestureInbox {
    slot: Arc<Mutex<Slot>>,
}

impl GestureInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Producer side. Never fails; a poisoned slot is recovered.
    pub fn publish(&self, sample: GestureSample) {
        let mut slot = self.slot.lock().unwrap_or_else(|p| p.into_inner());
        slot.latest = Some(sample);
        slot.sequence = slot.sequence.wrapping_add(1);
    }

    /// Consumer side. Does not block: a slot held by the producer reads as unchanged.
    fn poll(&self, seen: u64) -> Poll {
        let slot = match self.slot.try_lock() {
            Ok(s) => s,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => return Poll::Unchanged,
        };
        match slot.latest {
            Some(sample) if slot.sequence != seen => Poll::Fresh(slot.sequence, sample),
            _ => Poll::Unchanged,
        }
    }
}

/// Per-frame smoother over the inbox.
pub struct GestureSmoother {
    inbox: Option<GestureInbox>,
    raw: GestureSignal,
    smoothed: GestureSignal,
    seen: u64,
    lost: bool,
    frames_since_sample: u32,
}

impl GestureSmoother {
    pub fn new(inbox: GestureInbox) -> Self {
        Self {
            inbox: Some(inbox),
            ..Self::idle()
        }
    }

    /// Smoother for a missing input source: values stay at rest forever.
    pub fn idle() -> Self {
        Self {
            inbox: None,
            raw: GestureSignal::REST,
            smoothed: GestureSignal::REST,
            seen: 0,
            lost: false,
            frames_since_sample: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.inbox.is_none()
    }

    /// Advance one frame tick.
    pub fn update(&mut self) {
        let Some(inbox) = &self.inbox else {
            return;
        };
        match inbox.poll(self.seen) {
            Poll::Fresh(sequence, sample) => {
                self.seen = sequence;
                self.frames_since_sample = 0;
                match sample {
                    GestureSample::Detected(signal) => {
                        self.raw = signal.clamped();
                        self.lost = false;
                    }
                    GestureSample::Lost => self.lost = true,
                }
            }
            Poll::Unchanged => {
                self.frames_since_sample = self.frames_since_sample.saturating_add(1);
            }
        }
        if self.lost || self.frames_since_sample >= GESTURE_STALE_FRAMES {
            self.raw.relax_toward_rest();
        }
        self.smoothed.follow(&self.raw);
        self.smoothed = self.smoothed.clamped();
    }

    pub fn smoothed(&self) -> GestureSignal {
        self.smoothed
    }

    /// Current raw target after relaxation.
    pub fn raw(&self) -> GestureSignal {
        self.raw
    }
}

impl Default for GestureSmoother {
    fn default() -> Self {
        Self::idle()
    }
}
