use crate::constants::{DEFAULT_DISK_INTENSITY, DEFAULT_DISK_SPIN};
use crate::profile::BloomSettings;

/// One field of the bloom triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BloomParam {
    Strength,
    Radius,
    Threshold,
}

/// Externally owned numeric controls, read once per frame and never written back.
#[derive(Clone, Debug, PartialEq)]
pub struct UiControls {
    /// Disk rotation rate in radians per second.
    pub disk_spin: f32,
    pub disk_intensity: f32,
    /// User override of the active profile's bloom triple.
    pub bloom: Option<BloomSettings>,
}

impl Default for UiControls {
    fn default() -> Self {
        Self {
            disk_spin: DEFAULT_DISK_SPIN,
            disk_intensity: DEFAULT_DISK_INTENSITY,
            bloom: None,
        }
    }
}

impl UiControls {
    pub fn nudge_spin(&mut self, delta: f32) {
        self.disk_spin = (self.disk_spin + delta).clamp(-4.0, 4.0);
    }

    pub fn nudge_intensity(&mut self, delta: f32) {
        self.disk_intensity = (self.disk_intensity + delta).clamp(0.0, 4.0);
    }

    /// Adjust one bloom field, starting from `base` when no override exists yet.
    pub fn nudge_bloom(
        &mut self,
        base: BloomSettings,
        param: BloomParam,
        delta: f32,
    ) -> BloomSettings {
        let mut b = self.bloom.unwrap_or(base);
        match param {
            BloomParam::Strength => b.strength = (b.strength + delta).clamp(0.0, 5.0),
            BloomParam::Radius => b.radius = (b.radius + delta).clamp(0.0, 1.0),
            BloomParam::Threshold => b.threshold = (b.threshold + delta).clamp(0.0, 1.0),
        }
        self.bloom = Some(b);
        b
    }
}
