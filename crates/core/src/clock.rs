use instant::Instant;

use crate::constants::MAX_FRAME_DT;

/// Wall-clock frame timer. `tick` returns the clipped delta since the last tick.
pub struct FrameClock {
    start: Instant,
    last: Instant,
    elapsed: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            elapsed: 0.0,
        }
    }

    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32().min(MAX_FRAME_DT);
        self.last = now;
        self.elapsed += dt;
        dt
    }

    /// Sum of clipped deltas; pauses do not jump the animation.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Unclipped wall time since construction.
    pub fn wall_time(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
