//! Quality profiles ("modes") and the name → profile table.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Bloom strength / radius / threshold triple.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct BloomSettings {
    pub strength: f32,
    pub radius: f32,
    pub threshold: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            strength: 1.2,
            radius: 0.4,
            threshold: 0.2,
        }
    }
}

/// How the lensing compositor perturbs the background.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LensModel {
    /// Pure radial pull toward the centre.
    Radial,
    /// Radial pull plus an angular twist proportional to the bend.
    Swirl,
}

/// Immutable bundle of quality/resolution parameters selected as a unit.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModeProfile {
    #[serde(skip)]
    pub name: String,
    pub star_count: u32,
    pub disk_segments: u32,
    /// Square edge of the starfield capture target.
    pub capture_resolution: u32,
    pub bloom: BloomSettings,
    pub jets_enabled: bool,
    pub fog_enabled: bool,
    pub camera_auto_speed: f32,
    pub lens_strength: f32,
    pub lens_model: LensModel,
    /// Capture the foreground into its own target and blend it in the compositor.
    pub dual_capture: bool,
    /// Select the detailed shader variants for the disk and the compositor.
    pub detailed_shading: bool,
}

impl ModeProfile {
    /// Reduced-fidelity profile.
    pub fn mobile() -> Self {
        Self {
            name: "mobile".into(),
            star_count: 2500,
            disk_segments: 64,
            capture_resolution: 512,
            bloom: BloomSettings {
                strength: 1.1,
                radius: 0.35,
                threshold: 0.25,
            },
            jets_enabled: false,
            fog_enabled: false,
            camera_auto_speed: 0.5,
            lens_strength: 0.8,
            lens_model: LensModel::Radial,
            dual_capture: false,
            detailed_shading: false,
        }
    }

    /// Full-fidelity profile.
    pub fn max() -> Self {
        Self {
            name: "max".into(),
            star_count: 12000,
            disk_segments: 256,
            capture_resolution: 2048,
            bloom: BloomSettings {
                strength: 1.6,
                radius: 0.6,
                threshold: 0.1,
            },
            jets_enabled: true,
            fog_enabled: true,
            camera_auto_speed: 1.0,
            lens_strength: 1.2,
            lens_model: LensModel::Swirl,
            dual_capture: true,
            detailed_shading: true,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidProfile {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.disk_segments < 3 {
            return Err(invalid("disk_segments must be at least 3"));
        }
        if self.capture_resolution == 0 {
            return Err(invalid("capture_resolution must be non-zero"));
        }
        let b = &self.bloom;
        if !(b.strength.is_finite() && b.radius.is_finite() && b.threshold.is_finite()) {
            return Err(invalid("bloom parameters must be finite"));
        }
        if !self.lens_strength.is_finite() || !self.camera_auto_speed.is_finite() {
            return Err(invalid("lens_strength and camera_auto_speed must be finite"));
        }
        Ok(())
    }
}

/// Bloom fields of a [`ProfilePatch`]. Absent fields keep their current value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BloomPatch {
    pub strength: Option<f32>,
    pub radius: Option<f32>,
    pub threshold: Option<f32>,
}

/// One entry of a JSON override file. Every field is optional when the mode
/// already exists; a new mode must name them all.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfilePatch {
    pub star_count: Option<u32>,
    pub disk_segments: Option<u32>,
    pub capture_resolution: Option<u32>,
    pub bloom: Option<BloomPatch>,
    pub jets_enabled: Option<bool>,
    pub fog_enabled: Option<bool>,
    pub camera_auto_speed: Option<f32>,
    pub lens_strength: Option<f32>,
    pub lens_model: Option<LensModel>,
    pub dual_capture: Option<bool>,
    pub detailed_shading: Option<bool>,
}

impl ProfilePatch {
    pub fn apply(&self, p: &mut ModeProfile) {
        fn set<T: Copy>(field: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *field = v;
            }
        }
        set(&mut p.star_count, self.star_count);
        set(&mut p.disk_segments, self.disk_segments);
        set(&mut p.capture_resolution, self.capture_resolution);
        if let Some(b) = self.bloom {
            set(&mut p.bloom.strength, b.strength);
            set(&mut p.bloom.radius, b.radius);
            set(&mut p.bloom.threshold, b.threshold);
        }
        set(&mut p.jets_enabled, self.jets_enabled);
        set(&mut p.fog_enabled, self.fog_enabled);
        set(&mut p.camera_auto_speed, self.camera_auto_speed);
        set(&mut p.lens_strength, self.lens_strength);
        set(&mut p.lens_model, self.lens_model);
        set(&mut p.dual_capture, self.dual_capture);
        set(&mut p.detailed_shading, self.detailed_shading);
    }

    fn missing(&self) -> Vec<&'static str> {
        let bloom = self.bloom.unwrap_or_default();
        [
            ("star_count", self.star_count.is_none()),
            ("disk_segments", self.disk_segments.is_none()),
            ("capture_resolution", self.capture_resolution.is_none()),
            ("bloom.strength", bloom.strength.is_none()),
            ("bloom.radius", bloom.radius.is_none()),
            ("bloom.threshold", bloom.threshold.is_none()),
            ("jets_enabled", self.jets_enabled.is_none()),
            ("fog_enabled", self.fog_enabled.is_none()),
            ("camera_auto_speed", self.camera_auto_speed.is_none()),
            ("lens_strength", self.lens_strength.is_none()),
            ("lens_model", self.lens_model.is_none()),
            ("dual_capture", self.dual_capture.is_none()),
            ("detailed_shading", self.detailed_shading.is_none()),
        ]
        .into_iter()
        .filter_map(|(field, absent)| absent.then_some(field))
        .collect()
    }

    /// A complete profile for a mode that has no base to patch.
    fn into_profile(self, name: &str) -> Result<ModeProfile, ConfigError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(ConfigError::InvalidProfile {
                name: name.to_string(),
                reason: format!("new mode is missing {}", missing.join(", ")),
            });
        }
        let mut profile = ModeProfile {
            name: name.to_string(),
            ..ModeProfile::mobile()
        };
        self.apply(&mut profile);
        Ok(profile)
    }
}

/// Mapping from mode name to profile.
#[derive(Clone, Debug)]
pub struct ProfileSet {
    profiles: BTreeMap<String, ModeProfile>,
}

impl ProfileSet {
    pub const REDUCED: &'static str = "mobile";
    pub const FULL: &'static str = "max";

    pub fn builtin() -> Self {
        let mut profiles = BTreeMap::new();
        for p in [ModeProfile::mobile(), ModeProfile::max()] {
            profiles.insert(p.name.clone(), p);
        }
        Self { profiles }
    }

    pub fn empty() -> Self {
        Self {
            profiles: BTreeMap::new(),
        }
    }

    /// Insert or replace a profile; its name becomes the key.
    pub fn insert(&mut self, profile: ModeProfile) -> Result<(), ConfigError> {
        profile.validate()?;
        self.profiles.insert(profile.name.clone(), profile);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&ModeProfile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownMode(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Name following `current` in sorted order, wrapping around.
    pub fn next_after(&self, current: &str) -> Option<&str> {
        let mut names = self.names().peekable();
        let first = *names.peek()?;
        let mut iter = self.names().skip_while(|n| *n != current);
        iter.next();
        Some(iter.next().unwrap_or(first))
    }

    /// Parse a JSON object of `{ "<mode>": { ...profile fields... } }`.
    ///
    /// Fields patch the existing profile of the same name; unknown names add
    /// new modes. Nothing is applied unless every entry is valid.
    pub fn merge_json(&mut self, json: &str) -> Result<(), ConfigError> {
        let parsed: BTreeMap<String, ProfilePatch> = serde_json::from_str(json)?;
        let mut staged = self.profiles.clone();
        for (name, patch) in parsed {
            let profile = match staged.get(&name) {
                Some(base) => {
                    let mut p = base.clone();
                    patch.apply(&mut p);
                    p
                }
                None => patch.into_profile(&name)?,
            };
            profile.validate()?;
            staged.insert(name, profile);
        }
        self.profiles = staged;
        Ok(())
    }

    pub fn load_overrides(&mut self, path: &Path) -> Result<(), ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.merge_json(&text)?;
        log::info!("[config] loaded profile overrides from {}", path.display());
        Ok(())
    }
}

impl Default for ProfileSet {
    fn default() -> Self {
        Self::builtin()
    }
}
