//! Screen-space gravitational lensing field.
//!
//! The GPU compositor (`lens.wgsl` in the native front-end) evaluates the same
//! functions per pixel; the CPU versions here drive the uniform layout and the
//! boundedness tests.

use glam::Vec2;

use crate::constants::*;
use crate::profile::{LensModel, ModeProfile};

/// Which capture the event horizon is drawn into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum HorizonPolicy {
    /// Horizon is part of the background capture and bends with the stars.
    Lensed,
    /// Horizon is drawn with the foreground and keeps crisp edges.
    #[default]
    Exempt,
}

impl HorizonPolicy {
    pub fn toggled(self) -> Self {
        match self {
            HorizonPolicy::Lensed => HorizonPolicy::Exempt,
            HorizonPolicy::Exempt => HorizonPolicy::Lensed,
        }
    }
}

/// Uniform block of the lensing pass. Layout matches `LensUniforms` in `lens.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LensUniforms {
    pub time: f32,
    pub strength: f32,
    pub falloff: f32,
    pub epsilon: f32,
    pub shell_inner: f32,
    pub shell_outer: f32,
    pub bend_limit: f32,
    pub swirl: f32,
    pub mix_inner: f32,
    pub mix_outer: f32,
    /// 1.0 when a foreground capture is bound.
    pub dual: f32,
    /// 1.0 selects the detailed shader variant.
    pub detailed: f32,
    /// Viewport width over height. The field is evaluated in height units so
    /// the shell stays circular.
    pub aspect: f32,
    /// Relative swirl wobble, driven by `time`.
    pub shimmer: f32,
    pub _pad: [f32; 2],
}

impl LensUniforms {
    pub fn for_profile(profile: &ModeProfile, time: f32, aspect: f32) -> Self {
        Self {
            time,
            strength: profile.lens_strength,
            falloff: LENS_FALLOFF,
            epsilon: LENS_EPSILON,
            shell_inner: LENS_SHELL_INNER,
            shell_outer: LENS_SHELL_OUTER,
            bend_limit: LENS_BEND_LIMIT,
            swirl: match profile.lens_model {
                LensModel::Radial => 0.0,
                LensModel::Swirl => LENS_SWIRL,
            },
            mix_inner: LENS_MIX_INNER,
            mix_outer: LENS_MIX_OUTER,
            dual: if profile.dual_capture { 1.0 } else { 0.0 },
            detailed: if profile.detailed_shading { 1.0 } else { 0.0 },
            aspect,
            shimmer: if profile.detailed_shading { LENS_SHIMMER } else { 0.0 },
            _pad: [0.0; 2],
        }
    }

    /// Replace non-finite or out-of-domain fields so no NaN reaches the shader.
    pub fn sanitized(mut self) -> Self {
        fn fix(v: &mut f32, fallback: f32) {
            if !v.is_finite() {
                *v = fallback;
            }
        }
        fix(&mut self.time, 0.0);
        fix(&mut self.strength, 0.0);
        fix(&mut self.falloff, LENS_FALLOFF);
        fix(&mut self.epsilon, LENS_EPSILON);
        fix(&mut self.shell_inner, LENS_SHELL_INNER);
        fix(&mut self.shell_outer, LENS_SHELL_OUTER);
        fix(&mut self.bend_limit, LENS_BEND_LIMIT);
        fix(&mut self.swirl, 0.0);
        fix(&mut self.mix_inner, LENS_MIX_INNER);
        fix(&mut self.mix_outer, LENS_MIX_OUTER);
        fix(&mut self.aspect, 1.0);
        fix(&mut self.shimmer, 0.0);
        self.strength = self.strength.max(0.0);
        self.epsilon = self.epsilon.max(1e-4);
        self.bend_limit = self.bend_limit.clamp(0.0, 1.0);
        if self.shell_outer <= self.shell_inner {
            self.shell_outer = self.shell_inner + 1e-3;
        }
        if self.mix_outer <= self.mix_inner {
            self.mix_outer = self.mix_inner + 1e-3;
        }
        self.aspect = self.aspect.max(1e-3);
        self.shimmer = self.shimmer.clamp(0.0, 1.0);
        self
    }
}

fn smoothstep(e0: f32, e1: f32, x: f32) -> f32 {
    let t = ((x - e0) / (e1 - e0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Bend magnitude at radius `r`, in `[0, bend_limit]`.
///
/// Decreasing in `r`, bounded at `r = 0` by the epsilon floor, zero outside the shell.
pub fn bend(r: f32, u: &LensUniforms) -> f32 {
    let r = if r.is_finite() { r.max(0.0) } else { f32::MAX };
    let gate = 1.0 - smoothstep(u.shell_inner, u.shell_outer, r);
    let raw = u.strength * u.falloff / (r * r + u.epsilon.max(1e-4)) * gate;
    if raw.is_finite() {
        raw.clamp(0.0, u.bend_limit)
    } else {
        0.0
    }
}

/// Rotation applied at bend `b`. Oscillates around `swirl * b` with the shimmer.
pub fn swirl_angle(b: f32, u: &LensUniforms) -> f32 {
    u.swirl * b * (1.0 + u.shimmer * (u.time * LENS_SHIMMER_RATE).sin())
}

/// Centred coordinate of `uv` in height units.
pub fn centred(uv: Vec2, u: &LensUniforms) -> Vec2 {
    let c = uv - Vec2::splat(0.5);
    Vec2::new(c.x * u.aspect, c.y)
}

/// Warp a centred coordinate (see [`centred`]).
pub fn warp(c: Vec2, u: &LensUniforms) -> Vec2 {
    let b = bend(c.length(), u);
    let pulled = c * (1.0 - b);
    if u.swirl == 0.0 {
        return pulled;
    }
    Vec2::from_angle(swirl_angle(b, u)).rotate(pulled)
}

/// Source coordinate in `[0, 1]` for output coordinate `uv` (clamp-to-edge).
pub fn sample_coordinate(uv: Vec2, u: &LensUniforms) -> Vec2 {
    let w = warp(centred(uv, u), u);
    (Vec2::new(w.x / u.aspect, w.y) + Vec2::splat(0.5)).clamp(Vec2::ZERO, Vec2::ONE)
}

/// Weight of the lensed background at radius `r` (height units). The compositor adds it
/// under the foreground capture as `fg + bg * (1 - fg.a) * m`.
pub fn background_mix(r: f32, u: &LensUniforms) -> f32 {
    if u.dual < 0.5 {
        return 1.0;
    }
    smoothstep(u.mix_inner, u.mix_outer, r)
}
