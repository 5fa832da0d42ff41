use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use gargantua_core::{ConfigError, HorizonPolicy, ProfileSet};

#[derive(Parser, Debug)]
#[command(
    name = "gargantua",
    version,
    about = "Stylised black hole renderer with screen-space lensing"
)]
pub struct Cli {
    /// Quality mode to start in (`mobile`, `max`, or a mode from --profiles).
    #[arg(long, value_name = "MODE", default_value = ProfileSet::FULL)]
    pub mode: String,

    /// JSON file of profile overrides, keyed by mode name.
    #[arg(long, value_name = "PATH")]
    pub profiles: Option<PathBuf>,

    /// Whether the event horizon bends with the background or stays crisp.
    #[arg(long, value_enum, default_value_t = HorizonArg::Exempt)]
    pub horizon: HorizonArg,

    /// Initial window width in physical pixels.
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Initial window height in physical pixels.
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Run without a window against the recording backend, then exit.
    #[arg(long)]
    pub headless: bool,

    /// Frames to render in headless mode.
    #[arg(long, value_name = "N", default_value_t = 600)]
    pub frames: u64,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum HorizonArg {
    Lensed,
    Exempt,
}

impl From<HorizonArg> for HorizonPolicy {
    fn from(arg: HorizonArg) -> Self {
        match arg {
            HorizonArg::Lensed => HorizonPolicy::Lensed,
            HorizonArg::Exempt => HorizonPolicy::Exempt,
        }
    }
}

impl Cli {
    /// Built-in profiles with any `--profiles` overrides merged in.
    pub fn load_profiles(&self) -> Result<ProfileSet, ConfigError> {
        let mut profiles = ProfileSet::builtin();
        if let Some(path) = &self.profiles {
            profiles.load_overrides(path)?;
        }
        profiles.get(&self.mode)?;
        Ok(profiles)
    }
}
