//! Bloom stage parameters.
//!
//! The stage owns no GPU state beyond its mip targets (which live in the
//! target pool); strength, radius and threshold are plain values rewritten
//! into the uniform block every frame, so changing them never reallocates.

use crate::constants::BLOOM_MIP_LEVELS;
use crate::profile::BloomSettings;
use crate::targets::{TargetSize, TargetSlot};

/// Uniform block shared by the bloom passes. Layout matches `PostUniforms` in `post.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PostUniforms {
    pub texel: [f32; 2],
    pub time: f32,
    pub strength: f32,
    pub radius: f32,
    pub threshold: f32,
    /// Weight applied when a mip is added back onto the next larger one.
    pub level_weight: f32,
    pub _pad: f32,
}

#[derive(Clone, Debug)]
pub struct BloomStage {
    settings: BloomSettings,
    levels: usize,
}

impl BloomStage {
    pub fn new(settings: BloomSettings) -> Self {
        Self {
            settings: sanitize(settings),
            levels: BLOOM_MIP_LEVELS,
        }
    }

    pub fn settings(&self) -> BloomSettings {
        self.settings
    }

    /// Mutate in place; takes effect on the next frame.
    pub fn set_params(&mut self, settings: BloomSettings) {
        self.settings = sanitize(settings);
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Mip slots with their window-relative sizes, largest first.
    pub fn mip_slots(&self) -> impl Iterator<Item = (TargetSlot, TargetSize)> {
        (0..self.levels).map(|n| {
            (
                TargetSlot::BloomMip(n as u8),
                TargetSize::Window {
                    divisor: 1 << (n + 1),
                },
            )
        })
    }

    /// Contribution of mip `level` during upsampling. `radius` moves weight
    /// from the sharp upper mips toward the wide lower ones.
    pub fn level_weight(&self, level: usize) -> f32 {
        let n = self.levels.max(1) as f32;
        let factor = 1.0 - level as f32 / n;
        let mirrored = 1.2 - factor;
        factor + (mirrored - factor) * self.settings.radius.clamp(0.0, 1.0)
    }

    pub fn uniforms(&self, level: usize, size: (u32, u32), time: f32) -> PostUniforms {
        PostUniforms {
            texel: [1.0 / size.0.max(1) as f32, 1.0 / size.1.max(1) as f32],
            time,
            strength: self.settings.strength,
            radius: self.settings.radius,
            threshold: self.settings.threshold,
            level_weight: self.level_weight(level),
            _pad: 0.0,
        }
    }
}

fn sanitize(s: BloomSettings) -> BloomSettings {
    let finite_or = |v: f32, d: f32| if v.is_finite() { v } else { d };
    let d = BloomSettings::default();
    BloomSettings {
        strength: finite_or(s.strength, d.strength).max(0.0),
        radius: finite_or(s.radius, d.radius).clamp(0.0, 1.0),
        threshold: finite_or(s.threshold, d.threshold).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mips_halve_from_half_resolution() {
        let stage = BloomStage::new(BloomSettings::default());
        let divisors: Vec<u32> = stage
            .mip_slots()
            .map(|(_, size)| match size {
                TargetSize::Window { divisor } => divisor,
                TargetSize::Fixed(_) => 0,
            })
            .collect();
        assert_eq!(divisors, vec![2, 4, 8, 16]);
    }

    #[test]
    fn set_params_sanitizes() {
        let mut stage = BloomStage::new(BloomSettings::default());
        stage.set_params(BloomSettings {
            strength: f32::NAN,
            radius: 3.0,
            threshold: -1.0,
        });
        let s = stage.settings();
        assert_eq!(s.strength, BloomSettings::default().strength);
        assert_eq!(s.radius, 1.0);
        assert_eq!(s.threshold, 0.0);
    }

    #[test]
    fn radius_shifts_weight_to_wide_mips() {
        let mut stage = BloomStage::new(BloomSettings {
            radius: 0.0,
            ..BloomSettings::default()
        });
        assert!(stage.level_weight(0) > stage.level_weight(3));
        stage.set_params(BloomSettings {
            radius: 1.0,
            ..BloomSettings::default()
        });
        assert!(stage.level_weight(0) < stage.level_weight(3));
    }
}
