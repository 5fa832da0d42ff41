mod app;
mod cli;
mod gpu;
mod input;
mod keys;
mod smoke;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = cli::Cli::parse();
    let profiles = cli.load_profiles()?;
    log::info!(
        "[config] modes: {}",
        profiles.names().collect::<Vec<_>>().join(", ")
    );
    if cli.headless {
        smoke::run(&cli, profiles)
    } else {
        app::run(&cli, profiles)
    }
}
