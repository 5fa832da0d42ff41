//! Window-less run against the recording backend: exercises mode toggles,
//! a resize and gesture input from a producer thread, then checks for leaks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use gargantua_core::{
    FrameInput, GestureInbox, GestureSample, GestureSignal, GestureSmoother, HeadlessBackend,
    Orchestrator, ProfileSet, UiControls, Viewport,
};

use crate::cli::Cli;

const FRAME_DT: f32 = 1.0 / 60.0;
const TOGGLE_EVERY: u64 = 240;
// about the last second of passes
const PASS_LOG_LIMIT: usize = 256;

pub fn run(cli: &Cli, profiles: ProfileSet) -> anyhow::Result<()> {
    let viewport = Viewport::new(cli.width, cli.height);
    let mut orch = Orchestrator::new(
        HeadlessBackend::new(viewport).with_pass_log_limit(PASS_LOG_LIMIT),
        profiles,
        &cli.mode,
        viewport,
        cli.horizon.into(),
    )?;

    let inbox = GestureInbox::new();
    let mut gesture = GestureSmoother::new(inbox.clone());
    let stop = Arc::new(AtomicBool::new(false));
    let producer = {
        let stop = Arc::clone(&stop);
        thread::Builder::new()
            .name("gesture-producer".into())
            .spawn(move || {
                let mut t = 0.0f32;
                while !stop.load(Ordering::Relaxed) {
                    // a hand that wanders in and out of view
                    let sample = if (t * 0.4).sin() > -0.7 {
                        GestureSample::Detected(GestureSignal::new(
                            1.5 + (t * 0.7).sin(),
                            (t * 0.5).sin(),
                            (t * 0.3).cos(),
                            ((t * 2.0).sin() * 1.5).max(0.0),
                        ))
                    } else {
                        GestureSample::Lost
                    };
                    inbox.publish(sample);
                    t += 0.016;
                    thread::sleep(Duration::from_millis(16));
                }
            })
            .context("spawning gesture producer")?
    };

    let controls = UiControls::default();
    let (mut executed, mut skipped) = (0usize, 0usize);
    for i in 0..cli.frames {
        if i > 0 && i % TOGGLE_EVERY == 0 {
            orch.toggle_mode()?;
        }
        if i == cli.frames / 2 {
            orch.resize((cli.width / 2).max(1), (cli.height / 2).max(1));
        }
        let report = orch.render_frame(FrameInput {
            dt: FRAME_DT,
            gesture: &mut gesture,
            controls: &controls,
        })?;
        executed += report.executed.len();
        skipped += report.skipped.len();
    }

    stop.store(true, Ordering::Relaxed);
    producer
        .join()
        .map_err(|_| anyhow::anyhow!("gesture producer panicked"))?;

    let presented = orch.backend().frames_presented();
    orch.teardown();
    let (targets, meshes) = (orch.backend().live_targets(), orch.backend().live_meshes());
    log::info!(
        "[headless] {} frames presented in mode {}; {} passes run, {} skipped; live targets {}, meshes {}",
        presented,
        orch.mode(),
        executed,
        skipped,
        targets,
        meshes
    );
    if targets != 0 || meshes != 0 {
        anyhow::bail!("{targets} targets and {meshes} meshes outlived teardown");
    }
    Ok(())
}
