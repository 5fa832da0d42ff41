// Pointer stand-in for the hand tracker: turns mouse state into gesture samples.
// Dragging with the primary button tilts the black hole and the wheel scales
// it. Holding the secondary button charges a pulse. Leaving the window reads
// as "no hand detected".

use gargantua_core::{GestureSample, GestureSignal};

pub const DRAG_RADIANS_PER_PX: f32 = 0.005;
pub const WHEEL_SCALE_STEP: f32 = 0.1;
pub const HELD_PULSE: f32 = 2.0;

#[derive(Debug, Clone)]
pub struct PointerGesture {
    pose: GestureSignal,
    dragging: bool,
    charging: bool,
    last_cursor: Option<(f64, f64)>,
    inside: bool,
}

impl Default for PointerGesture {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerGesture {
    pub fn new() -> Self {
        Self {
            pose: GestureSignal::REST,
            dragging: false,
            charging: false,
            last_cursor: None,
            inside: false,
        }
    }

    pub fn cursor_moved(&mut self, x: f64, y: f64) -> GestureSample {
        self.inside = true;
        if let (true, Some((lx, ly))) = (self.dragging, self.last_cursor) {
            self.pose.rot_y += (x - lx) as f32 * DRAG_RADIANS_PER_PX;
            self.pose.rot_x += (y - ly) as f32 * DRAG_RADIANS_PER_PX;
            // keep the stored pose inside the bounds so reversing a drag responds at once
            self.pose = self.pose.clamped();
        }
        self.last_cursor = Some((x, y));
        self.current()
    }

    pub fn set_dragging(&mut self, pressed: bool) -> GestureSample {
        self.dragging = pressed;
        self.current()
    }

    pub fn set_charging(&mut self, pressed: bool) -> GestureSample {
        self.charging = pressed;
        self.current()
    }

    /// `lines` is positive when scrolling away from the user.
    pub fn wheel(&mut self, lines: f32) -> GestureSample {
        if lines.is_finite() {
            self.pose.scale += lines * WHEEL_SCALE_STEP;
            self.pose = self.pose.clamped();
        }
        self.current()
    }

    pub fn cursor_left(&mut self) -> GestureSample {
        self.inside = false;
        self.dragging = false;
        self.charging = false;
        self.last_cursor = None;
        GestureSample::Lost
    }

    /// What the tracker sees right now.
    pub fn current(&self) -> GestureSample {
        if !self.inside {
            return GestureSample::Lost;
        }
        let pulse = if self.charging { HELD_PULSE } else { 0.0 };
        GestureSample::Detected(
            GestureSignal::new(self.pose.scale, self.pose.rot_x, self.pose.rot_y, pulse).clamped(),
        )
    }
}
