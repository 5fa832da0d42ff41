// Tests for per-frame pass execution against the headless backend.

use gargantua_core::backend::ResolvedOutput;
use gargantua_core::constants::PULSE_INTENSITY_GAIN;
use gargantua_core::error::FrameError;
use gargantua_core::gesture::{GestureInbox, GestureSample, GestureSignal, GestureSmoother};
use gargantua_core::graph::PassId;
use gargantua_core::headless::HeadlessBackend;
use gargantua_core::lensing::HorizonPolicy;
use gargantua_core::orchestrator::{FrameInput, FrameReport, Orchestrator, SkipReason};
use gargantua_core::profile::{BloomSettings, ProfileSet};
use gargantua_core::scene::{EntityKind, Material};
use gargantua_core::targets::{TargetSlot, Viewport};
use gargantua_core::{BloomParam, UiControls};

fn orchestrator(mode: &str, policy: HorizonPolicy) -> Orchestrator<HeadlessBackend> {
    let viewport = Viewport::new(640, 480);
    Orchestrator::new(
        HeadlessBackend::new(viewport),
        ProfileSet::builtin(),
        mode,
        viewport,
        policy,
    )
    .unwrap()
}

fn step(
    o: &mut Orchestrator<HeadlessBackend>,
    gesture: &mut GestureSmoother,
    controls: &UiControls,
    dt: f32,
) -> Result<FrameReport, FrameError> {
    o.render_frame(FrameInput {
        dt,
        gesture,
        controls,
    })
}

fn idle_frame(o: &mut Orchestrator<HeadlessBackend>) -> FrameReport {
    step(o, &mut GestureSmoother::idle(), &UiControls::default(), 1.0 / 60.0).unwrap()
}

#[test]
fn reduced_frame_runs_capture_lens_bloom() {
    let mut o = orchestrator(ProfileSet::REDUCED, HorizonPolicy::Exempt);
    let report = idle_frame(&mut o);
    assert_eq!(
        report.executed,
        vec![PassId::StarCapture, PassId::Lensing, PassId::Bloom]
    );
    assert!(report.skipped.is_empty());
    assert!(report.presented);
    assert_eq!(o.backend().frames_presented(), 1);
}

#[test]
fn full_frame_adds_foreground_capture_before_lensing() {
    let mut o = orchestrator(ProfileSet::FULL, HorizonPolicy::Exempt);
    let report = idle_frame(&mut o);
    assert_eq!(
        report.executed,
        vec![
            PassId::StarCapture,
            PassId::ForegroundCapture,
            PassId::Lensing,
            PassId::Bloom
        ]
    );
    let lens = o
        .backend()
        .passes()
        .iter()
        .find(|r| r.pass == PassId::Lensing)
        .unwrap();
    let names: Vec<_> = lens.inputs.iter().map(|(n, _)| *n).collect();
    assert_eq!(names, vec!["t_stars", "t_scene"]);
}

#[test]
fn every_read_follows_a_write_in_the_same_frame() {
    for mode in [ProfileSet::REDUCED, ProfileSet::FULL] {
        let mut o = orchestrator(mode, HorizonPolicy::Lensed);
        for i in 0..6 {
            idle_frame(&mut o);
            if i == 2 {
                o.toggle_mode().unwrap();
            }
            if i == 4 {
                o.resize(800, 600);
            }
        }
        let log = o.backend().passes();
        assert!(!log.is_empty());
        for w in log.windows(2) {
            assert!(w[0].sequence < w[1].sequence);
        }
        for record in log {
            for (name, id) in &record.inputs {
                let writer = log.iter().find(|w| {
                    w.frame == record.frame
                        && w.sequence < record.sequence
                        && w.output == ResolvedOutput::Target(*id)
                });
                assert!(
                    writer.is_some(),
                    "{:?} read {} in frame {} before any write",
                    record.pass,
                    name,
                    record.frame
                );
            }
        }
    }
}

#[test]
fn lens_pass_reads_the_live_star_target() {
    let mut o = orchestrator(ProfileSet::REDUCED, HorizonPolicy::Exempt);
    idle_frame(&mut o);
    let stars = o.targets().id(TargetSlot::Stars).unwrap();
    let lens = o
        .backend()
        .passes()
        .iter()
        .find(|r| r.pass == PassId::Lensing)
        .unwrap();
    assert_eq!(lens.inputs, vec![("t_stars", stars)]);
    assert_eq!(lens.lens_strength, Some(o.profile().lens_strength));
    assert_eq!(
        lens.output,
        ResolvedOutput::Target(o.targets().id(TargetSlot::Composite).unwrap())
    );
}

#[test]
fn failed_capture_skips_dependents_and_clears_the_active_target() {
    let mut o = orchestrator(ProfileSet::REDUCED, HorizonPolicy::Exempt);
    o.backend_mut().fail_pass(Some(PassId::StarCapture));
    let report = idle_frame(&mut o);

    assert!(report.executed.is_empty());
    assert!(!report.presented);
    assert!(matches!(
        report.skipped[0],
        (PassId::StarCapture, SkipReason::Failed(FrameError::PassFailed { .. }))
    ));
    assert_eq!(
        report.skipped[1],
        (PassId::Lensing, SkipReason::InputUnavailable(TargetSlot::Stars))
    );
    assert_eq!(
        report.skipped[2],
        (PassId::Bloom, SkipReason::InputUnavailable(TargetSlot::Composite))
    );
    assert_eq!(o.ledger().active(), None);
    assert_eq!(o.ledger().written(TargetSlot::Stars), None);

    o.backend_mut().fail_pass(None);
    let report = idle_frame(&mut o);
    assert_eq!(report.executed.len(), 3);
    assert!(o.ledger().written(TargetSlot::Stars).is_some());
}

#[test]
fn vacant_targets_skip_only_dependent_passes() {
    let viewport = Viewport::new(640, 480);
    let mut backend = HeadlessBackend::new(viewport);
    backend.set_max_target_dim(Some(0));
    let mut o = Orchestrator::new(
        backend,
        ProfileSet::builtin(),
        ProfileSet::REDUCED,
        viewport,
        HorizonPolicy::Exempt,
    )
    .unwrap();
    assert!(o.targets().is_empty());

    let report = idle_frame(&mut o);
    assert!(report.executed.is_empty());
    assert_eq!(
        report.skipped,
        vec![
            (PassId::StarCapture, SkipReason::OutputMissing(TargetSlot::Stars)),
            (PassId::Lensing, SkipReason::OutputMissing(TargetSlot::Composite)),
            (PassId::Bloom, SkipReason::InputUnavailable(TargetSlot::Composite)),
        ]
    );
}

#[test]
fn surface_failure_is_returned_and_the_next_frame_recovers() {
    let mut o = orchestrator(ProfileSet::REDUCED, HorizonPolicy::Exempt);
    o.backend_mut().fail_next_frame(FrameError::SurfaceLost);
    let err = step(
        &mut o,
        &mut GestureSmoother::idle(),
        &UiControls::default(),
        0.016,
    )
    .unwrap_err();
    assert_eq!(err, FrameError::SurfaceLost);
    assert_eq!(o.frame_index(), 0);

    let report = idle_frame(&mut o);
    assert_eq!(report.frame, 0);
    assert!(report.presented);
}

#[test]
fn bloom_override_takes_effect_without_reallocation() {
    let mut o = orchestrator(ProfileSet::FULL, HorizonPolicy::Exempt);
    idle_frame(&mut o);
    let allocations = o.backend().target_allocations();
    let mip = o.targets().id(TargetSlot::BloomMip(0));

    let controls = UiControls {
        bloom: Some(BloomSettings {
            strength: 2.0,
            radius: 0.1,
            threshold: 0.5,
        }),
        ..UiControls::default()
    };
    step(&mut o, &mut GestureSmoother::idle(), &controls, 0.016).unwrap();

    let last = o.backend().passes().last().unwrap();
    assert_eq!(last.pass, PassId::Bloom);
    assert_eq!(last.bloom.map(|b| b.strength), Some(2.0));
    assert_eq!(last.mip_count, 4);
    assert_eq!(o.backend().target_allocations(), allocations);
    assert_eq!(o.targets().id(TargetSlot::BloomMip(0)), mip);

    // clearing the override falls back to the profile
    idle_frame(&mut o);
    assert_eq!(o.bloom().settings(), o.profile().bloom);
}

#[test]
fn exempt_horizon_is_drawn_with_the_foreground() {
    let mut o = orchestrator(ProfileSet::REDUCED, HorizonPolicy::Exempt);
    idle_frame(&mut o);
    let log = o.backend().passes();
    let stars = log.iter().find(|r| r.pass == PassId::StarCapture).unwrap();
    let lens = log.iter().find(|r| r.pass == PassId::Lensing).unwrap();
    assert_eq!(stars.materials, vec![Material::Stars]);
    assert_eq!(lens.materials.first(), Some(&Material::Horizon));
    assert!(lens.materials.contains(&Material::Disk));
    assert!(lens.materials.contains(&Material::PhotonRing));
}

#[test]
fn lensed_horizon_moves_into_the_background_capture() {
    let mut o = orchestrator(ProfileSet::FULL, HorizonPolicy::Exempt);
    o.set_horizon_policy(HorizonPolicy::Lensed);
    idle_frame(&mut o);
    let log = o.backend().passes();
    let stars = log.iter().find(|r| r.pass == PassId::StarCapture).unwrap();
    let fg = log
        .iter()
        .find(|r| r.pass == PassId::ForegroundCapture)
        .unwrap();
    let lens = log.iter().find(|r| r.pass == PassId::Lensing).unwrap();
    assert!(stars.materials.contains(&Material::Horizon));
    assert!(stars.materials.contains(&Material::Stars));
    assert!(!fg.materials.contains(&Material::Horizon));
    assert_eq!(fg.materials.first(), Some(&Material::Occluder));
    assert!(fg.materials.contains(&Material::Jet));
    assert!(lens.materials.is_empty());
}

#[test]
fn horizon_depth_precedes_the_disk_under_every_policy() {
    for mode in [ProfileSet::REDUCED, ProfileSet::FULL] {
        for policy in [HorizonPolicy::Exempt, HorizonPolicy::Lensed] {
            let mut o = orchestrator(mode, policy);
            idle_frame(&mut o);
            let disk_pass = o
                .backend()
                .passes()
                .iter()
                .find(|r| r.materials.contains(&Material::Disk))
                .unwrap();
            let disk = disk_pass
                .materials
                .iter()
                .position(|m| *m == Material::Disk)
                .unwrap();
            let horizon = disk_pass
                .materials
                .iter()
                .position(|m| matches!(m, Material::Horizon | Material::Occluder));
            assert!(
                matches!(horizon, Some(h) if h < disk),
                "{mode}/{policy:?}: {:?}",
                disk_pass.materials
            );
        }
    }
}

#[test]
fn lensed_horizon_occludes_the_single_capture_overlay() {
    let mut o = orchestrator(ProfileSet::REDUCED, HorizonPolicy::Lensed);
    idle_frame(&mut o);
    let log = o.backend().passes();
    let stars = log.iter().find(|r| r.pass == PassId::StarCapture).unwrap();
    let lens = log.iter().find(|r| r.pass == PassId::Lensing).unwrap();
    assert!(stars.materials.contains(&Material::Horizon));
    assert_eq!(lens.materials.first(), Some(&Material::Occluder));
    assert!(!Material::Occluder.writes_color());
    assert!(Material::Occluder.is_opaque());
}

#[test]
fn disk_spins_at_the_control_rate() {
    let mut o = orchestrator(ProfileSet::REDUCED, HorizonPolicy::Exempt);
    let controls = UiControls {
        disk_spin: 1.0,
        ..UiControls::default()
    };
    let mut gesture = GestureSmoother::idle();
    for _ in 0..10 {
        step(&mut o, &mut gesture, &controls, 0.1).unwrap();
    }
    let disk = o.scene().entity(EntityKind::Disk).unwrap();
    assert!((disk.transform.rotation.z - 1.0).abs() < 1e-4);
    assert_eq!(disk.params.spin, 1.0);
}

#[test]
fn ages_are_monotonic_and_new_entities_inherit_them() {
    let mut o = orchestrator(ProfileSet::REDUCED, HorizonPolicy::Exempt);
    let mut gesture = GestureSmoother::idle();
    let controls = UiControls::default();
    let mut last = 0.0;
    for _ in 0..10 {
        step(&mut o, &mut gesture, &controls, 0.1).unwrap();
        let age = o.scene().entity(EntityKind::Disk).unwrap().params.age;
        assert!(age > last);
        last = age;
    }
    // negative and non-finite deltas never run the clock backwards
    step(&mut o, &mut gesture, &controls, -1.0).unwrap();
    step(&mut o, &mut gesture, &controls, f32::NAN).unwrap();
    assert_eq!(o.scene().entity(EntityKind::Disk).unwrap().params.age, last);

    o.apply_mode(ProfileSet::FULL).unwrap();
    let jet = o.scene().entity(EntityKind::JetNorth).unwrap();
    assert!((jet.params.age - o.scene().age()).abs() < 1e-6);
    assert!((o.scene().age() - 1.0).abs() < 1e-4);
    // the regenerated disk keeps its clock
    let disk = o.scene().entity(EntityKind::Disk).unwrap();
    assert_eq!(disk.params.age, last);
}

#[test]
fn idle_gesture_leaves_the_root_at_rest() {
    let mut o = orchestrator(ProfileSet::REDUCED, HorizonPolicy::Exempt);
    for _ in 0..120 {
        idle_frame(&mut o);
    }
    let root = o.scene().root();
    assert_eq!(root.scale, glam::Vec3::ONE);
    assert_eq!(root.rotation, glam::Vec3::ZERO);
}

#[test]
fn gesture_drives_root_and_disk_intensity() {
    let mut o = orchestrator(ProfileSet::REDUCED, HorizonPolicy::Exempt);
    let inbox = GestureInbox::new();
    let mut gesture = GestureSmoother::new(inbox.clone());
    let controls = UiControls::default();
    for _ in 0..300 {
        inbox.publish(GestureSample::Detected(GestureSignal::new(2.0, 0.5, -0.5, 3.0)));
        step(&mut o, &mut gesture, &controls, 1.0 / 60.0).unwrap();
    }
    let root = o.scene().root();
    assert!((root.scale.x - 2.0).abs() < 1e-3);
    assert!((root.rotation.x - 0.5).abs() < 1e-3);
    assert!((root.rotation.y + 0.5).abs() < 1e-3);

    let disk = o.scene().entity(EntityKind::Disk).unwrap();
    let expected = controls.disk_intensity + 3.0 * PULSE_INTENSITY_GAIN;
    assert!((disk.params.intensity - expected).abs() < 1e-3);
    assert!((disk.params.pulse - 3.0).abs() < 1e-3);
}

#[test]
fn teardown_releases_every_handle() {
    for mode in [ProfileSet::REDUCED, ProfileSet::FULL] {
        let mut o = orchestrator(mode, HorizonPolicy::Exempt);
        for _ in 0..5 {
            idle_frame(&mut o);
        }
        o.toggle_mode().unwrap();
        idle_frame(&mut o);
        o.teardown();
        assert_eq!(o.backend().live_targets(), 0);
        assert_eq!(o.backend().live_meshes(), 0);
        assert!(o.targets().is_empty());
        assert_eq!(o.scene().entity_count(), 0);
    }
}

#[test]
fn capped_pass_log_keeps_the_newest_records() {
    let viewport = Viewport::new(640, 480);
    let mut o = Orchestrator::new(
        HeadlessBackend::new(viewport).with_pass_log_limit(5),
        ProfileSet::builtin(),
        ProfileSet::REDUCED,
        viewport,
        HorizonPolicy::Exempt,
    )
    .unwrap();
    for _ in 0..10 {
        idle_frame(&mut o);
    }
    let log = o.backend().passes();
    assert_eq!(log.len(), 5);
    // three passes per reduced frame, thirty in total
    assert_eq!(log.last().unwrap().sequence, 29);
    assert_eq!(log.first().unwrap().sequence, 25);
    assert!(log.windows(2).all(|w| w[0].sequence < w[1].sequence));
    assert_eq!(o.backend().passes_in_frame(9).count(), 3);
    assert_eq!(o.backend().frames_presented(), 10);
}

#[test]
fn bloom_radius_and_threshold_nudges_reach_the_bloom_pass() {
    let mut o = orchestrator(ProfileSet::REDUCED, HorizonPolicy::Exempt);
    let base = o.profile().bloom;
    let mut controls = UiControls::default();
    controls.nudge_bloom(base, BloomParam::Radius, 0.05);
    let b = controls.nudge_bloom(base, BloomParam::Threshold, -10.0);
    assert!((b.radius - (base.radius + 0.05)).abs() < 1e-6);
    assert_eq!(b.threshold, 0.0);
    assert_eq!(b.strength, base.strength);

    step(&mut o, &mut GestureSmoother::idle(), &controls, 0.016).unwrap();
    let last = o.backend().passes().last().unwrap();
    assert_eq!(last.pass, PassId::Bloom);
    assert_eq!(last.bloom, Some(b));

    let b = controls.nudge_bloom(base, BloomParam::Radius, 10.0);
    assert_eq!(b.radius, 1.0);
}
