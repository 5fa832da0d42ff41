// Tests for mode switching, resizing and the profile table.

use gargantua_core::error::ConfigError;
use gargantua_core::gesture::GestureSmoother;
use gargantua_core::headless::HeadlessBackend;
use gargantua_core::lensing::HorizonPolicy;
use gargantua_core::orchestrator::{FrameInput, Orchestrator};
use gargantua_core::profile::{BloomSettings, ModeProfile, ProfileSet};
use gargantua_core::scene::EntityKind;
use gargantua_core::targets::{TargetSlot, Viewport};
use gargantua_core::UiControls;

const W: u32 = 1280;
const H: u32 = 720;

fn orchestrator_with(profiles: ProfileSet, mode: &str) -> Orchestrator<HeadlessBackend> {
    let viewport = Viewport::new(W, H);
    Orchestrator::new(
        HeadlessBackend::new(viewport),
        profiles,
        mode,
        viewport,
        HorizonPolicy::Exempt,
    )
    .unwrap()
}

fn orchestrator(mode: &str) -> Orchestrator<HeadlessBackend> {
    orchestrator_with(ProfileSet::builtin(), mode)
}

fn size_of(o: &Orchestrator<HeadlessBackend>, slot: TargetSlot) -> Option<(u32, u32)> {
    o.targets()
        .get(slot)
        .map(|t| (t.desc.width, t.desc.height))
}

fn disk_segments(o: &Orchestrator<HeadlessBackend>) -> Option<u32> {
    o.scene()
        .entity(EntityKind::Disk)
        .and_then(|e| e.geometry.angular_segments())
}

fn frame(o: &mut Orchestrator<HeadlessBackend>) {
    let mut gesture = GestureSmoother::idle();
    let controls = UiControls::default();
    o.render_frame(FrameInput {
        dt: 1.0 / 60.0,
        gesture: &mut gesture,
        controls: &controls,
    })
    .unwrap();
}

#[test]
fn reduced_mode_allocates_single_capture_targets() {
    let o = orchestrator(ProfileSet::REDUCED);
    assert_eq!(size_of(&o, TargetSlot::Stars), Some((512, 512)));
    assert_eq!(size_of(&o, TargetSlot::Composite), Some((W, H)));
    assert_eq!(size_of(&o, TargetSlot::Foreground), None);
    assert_eq!(size_of(&o, TargetSlot::BloomMip(0)), Some((W / 2, H / 2)));
    assert_eq!(size_of(&o, TargetSlot::BloomMip(3)), Some((W / 16, H / 16)));
    assert_eq!(o.backend().live_targets(), o.targets().len());
    assert!(o.scene().entity(EntityKind::JetNorth).is_none());
    assert!(o.scene().entity(EntityKind::Halo).is_none());
}

#[test]
fn full_mode_adds_foreground_capture_and_jets() {
    let o = orchestrator(ProfileSet::FULL);
    assert_eq!(size_of(&o, TargetSlot::Stars), Some((2048, 2048)));
    assert_eq!(size_of(&o, TargetSlot::Foreground), Some((W, H)));
    assert!(o.scene().entity(EntityKind::JetNorth).is_some());
    assert!(o.scene().entity(EntityKind::JetSouth).is_some());
    assert!(o.scene().entity(EntityKind::Halo).is_some());
    assert_eq!(disk_segments(&o), Some(256));
}

#[test]
fn reduced_full_reduced_restores_reduced_state() {
    let mut o = orchestrator(ProfileSet::REDUCED);
    let bloom = o.bloom().settings();
    let segments = disk_segments(&o);
    let stars = size_of(&o, TargetSlot::Stars);
    let targets = o.backend().live_targets();
    let meshes = o.backend().live_meshes();

    o.apply_mode(ProfileSet::FULL).unwrap();
    assert_ne!(o.bloom().settings(), bloom);
    o.apply_mode(ProfileSet::REDUCED).unwrap();

    assert_eq!(o.bloom().settings(), bloom);
    assert_eq!(disk_segments(&o), segments);
    assert_eq!(size_of(&o, TargetSlot::Stars), stars);
    assert_eq!(size_of(&o, TargetSlot::Foreground), None);
    assert_eq!(o.backend().live_targets(), targets);
    assert_eq!(o.backend().live_meshes(), meshes);
}

#[test]
fn reapplying_the_active_mode_allocates_nothing() {
    let mut o = orchestrator(ProfileSet::FULL);
    let targets = o.backend().target_allocations();
    let meshes = o.backend().mesh_allocations();
    o.apply_mode(ProfileSet::FULL).unwrap();
    o.apply_mode(ProfileSet::FULL).unwrap();
    assert_eq!(o.backend().target_allocations(), targets);
    assert_eq!(o.backend().mesh_allocations(), meshes);
}

#[test]
fn repeated_toggles_do_not_leak() {
    let mut o = orchestrator(ProfileSet::REDUCED);
    let reduced = (o.backend().live_targets(), o.backend().live_meshes());
    o.apply_mode(ProfileSet::FULL).unwrap();
    let full = (o.backend().live_targets(), o.backend().live_meshes());
    for _ in 0..50 {
        o.toggle_mode().unwrap();
        frame(&mut o);
    }
    // an even number of toggles lands back on full
    assert_eq!(o.mode(), ProfileSet::FULL);
    assert_eq!((o.backend().live_targets(), o.backend().live_meshes()), full);
    o.apply_mode(ProfileSet::REDUCED).unwrap();
    assert_eq!((o.backend().live_targets(), o.backend().live_meshes()), reduced);
}

#[test]
fn custom_profile_sets_bloom_and_disk_tessellation() {
    let mut profiles = ProfileSet::builtin();
    profiles
        .insert(ModeProfile {
            name: "custom".into(),
            disk_segments: 64,
            bloom: BloomSettings {
                strength: 1.5,
                ..ModeProfile::max().bloom
            },
            ..ModeProfile::max()
        })
        .unwrap();
    let mut o = orchestrator_with(profiles, ProfileSet::FULL);

    o.apply_mode("custom").unwrap();

    assert_eq!(o.bloom().settings().strength, 1.5);
    assert_eq!(disk_segments(&o), Some(64));
    let mesh = o
        .scene()
        .entity(EntityKind::Disk)
        .and_then(|e| e.mesh)
        .unwrap();
    assert_eq!(o.backend().mesh_vertices(mesh), Some(2 * 65));

    frame(&mut o);
    let bloom = o
        .backend()
        .passes()
        .iter()
        .rev()
        .find_map(|r| r.bloom)
        .unwrap();
    assert_eq!(bloom.strength, 1.5);
}

#[test]
fn disk_regeneration_releases_the_old_mesh() {
    let mut o = orchestrator(ProfileSet::REDUCED);
    let old = o.scene().entity(EntityKind::Disk).and_then(|e| e.mesh).unwrap();
    o.apply_mode(ProfileSet::FULL).unwrap();
    let new = o.scene().entity(EntityKind::Disk).and_then(|e| e.mesh).unwrap();
    assert_ne!(old, new);
    assert_eq!(o.backend().mesh_vertices(old), None);
    assert_eq!(o.backend().mesh_vertices(new), Some(2 * 257));
}

#[test]
fn unknown_mode_is_rejected_without_side_effects() {
    let mut o = orchestrator(ProfileSet::REDUCED);
    let allocations = o.backend().target_allocations();
    let err = o.apply_mode("ultra").unwrap_err();
    assert!(matches!(err, ConfigError::UnknownMode(ref m) if m == "ultra"));
    assert_eq!(o.mode(), ProfileSet::REDUCED);
    assert_eq!(o.backend().target_allocations(), allocations);
}

#[test]
fn resize_round_trip_restores_exact_sizes() {
    let mut o = orchestrator(ProfileSet::FULL);
    o.resize(1920, 1080);
    assert_eq!(size_of(&o, TargetSlot::Composite), Some((1920, 1080)));
    assert_eq!(size_of(&o, TargetSlot::Foreground), Some((1920, 1080)));
    assert_eq!(o.backend().surface(), Viewport::new(1920, 1080));

    o.resize(W, H);
    assert_eq!(size_of(&o, TargetSlot::Composite), Some((W, H)));
    assert_eq!(size_of(&o, TargetSlot::Foreground), Some((W, H)));
    assert_eq!(size_of(&o, TargetSlot::BloomMip(0)), Some((W / 2, H / 2)));
    assert_eq!(o.backend().live_targets(), o.targets().len());
    assert!(o
        .backend()
        .live_target_descs()
        .all(|d| d.width != 1920 && d.width != 960 && d.height != 1080));
}

#[test]
fn resize_leaves_profile_scope_alone() {
    let mut o = orchestrator(ProfileSet::REDUCED);
    let stars = o.targets().id(TargetSlot::Stars);
    let meshes = o.backend().mesh_allocations();
    let segments = disk_segments(&o);

    o.resize(800, 600);
    o.resize(2560, 1440);

    assert_eq!(o.targets().id(TargetSlot::Stars), stars);
    assert_eq!(size_of(&o, TargetSlot::Stars), Some((512, 512)));
    assert_eq!(o.backend().mesh_allocations(), meshes);
    assert_eq!(disk_segments(&o), segments);
}

#[test]
fn resize_to_the_same_size_is_a_no_op() {
    let mut o = orchestrator(ProfileSet::REDUCED);
    let allocations = o.backend().target_allocations();
    o.resize(W, H);
    assert_eq!(o.backend().target_allocations(), allocations);
}

#[test]
fn zero_sized_resize_is_clamped() {
    let mut o = orchestrator(ProfileSet::REDUCED);
    o.resize(0, 0);
    assert_eq!(o.viewport(), Viewport::new(1, 1));
    assert_eq!(size_of(&o, TargetSlot::Composite), Some((1, 1)));
    assert_eq!(size_of(&o, TargetSlot::BloomMip(3)), Some((1, 1)));
    frame(&mut o);
}

#[test]
fn oversized_capture_falls_back_to_previous_resolution() {
    let mut o = orchestrator(ProfileSet::REDUCED);
    o.backend_mut().set_max_target_dim(Some(1500));
    o.apply_mode(ProfileSet::FULL).unwrap();
    assert_eq!(size_of(&o, TargetSlot::Stars), Some((512, 512)));
    assert_eq!(o.backend().live_targets(), o.targets().len());
    frame(&mut o);
}

#[test]
fn oversized_capture_without_history_falls_back_to_minimum() {
    let viewport = Viewport::new(W, H);
    let mut backend = HeadlessBackend::new(viewport);
    backend.set_max_target_dim(Some(1500));
    let o = Orchestrator::new(
        backend,
        ProfileSet::builtin(),
        ProfileSet::FULL,
        viewport,
        HorizonPolicy::Exempt,
    )
    .unwrap();
    assert_eq!(size_of(&o, TargetSlot::Stars), Some((64, 64)));
}

#[test]
fn oversized_window_keeps_previous_targets() {
    let mut o = orchestrator(ProfileSet::REDUCED);
    o.backend_mut().set_max_target_dim(Some(1500));
    o.resize(4000, 3000);
    assert_eq!(size_of(&o, TargetSlot::Composite), Some((W, H)));
    assert_eq!(size_of(&o, TargetSlot::BloomMip(0)), Some((W / 2, H / 2)));
    assert_eq!(size_of(&o, TargetSlot::BloomMip(1)), Some((1000, 750)));
    assert_eq!(o.backend().live_targets(), o.targets().len());
}

#[test]
fn oversized_window_below_previous_size_drops_to_minimum() {
    let mut o = orchestrator(ProfileSet::REDUCED);
    o.backend_mut().set_max_target_dim(Some(1000));
    o.resize(4000, 3000);
    assert_eq!(size_of(&o, TargetSlot::Composite), Some((64, 64)));
    assert_eq!(size_of(&o, TargetSlot::BloomMip(0)), Some((W / 2, H / 2)));
    assert_eq!(size_of(&o, TargetSlot::BloomMip(1)), Some((1000, 750)));
    frame(&mut o);
}

#[test]
fn json_overrides_add_and_replace_modes() {
    let mut profiles = ProfileSet::builtin();
    profiles
        .merge_json(
            r#"{
                "cinema": {
                    "star_count": 4000,
                    "disk_segments": 128,
                    "capture_resolution": 1024,
                    "bloom": { "strength": 1.5, "radius": 0.5, "threshold": 0.2 },
                    "jets_enabled": true,
                    "fog_enabled": true,
                    "camera_auto_speed": 0.8,
                    "lens_strength": 1.0,
                    "lens_model": "swirl",
                    "dual_capture": true,
                    "detailed_shading": true
                }
            }"#,
        )
        .unwrap();
    assert_eq!(
        profiles.names().collect::<Vec<_>>(),
        vec!["cinema", "max", "mobile"]
    );
    assert_eq!(profiles.next_after("mobile"), Some("cinema"));
    assert_eq!(profiles.get("cinema").unwrap().name, "cinema");

    let mut o = orchestrator_with(profiles, ProfileSet::REDUCED);
    assert_eq!(o.toggle_mode().unwrap(), "cinema");
    assert_eq!(disk_segments(&o), Some(128));
    assert_eq!(size_of(&o, TargetSlot::Stars), Some((1024, 1024)));
}

#[test]
fn invalid_overrides_are_rejected() {
    let mut profiles = ProfileSet::builtin();
    let unknown_field = r#"{ "mobile": { "stars": 10 } }"#;
    assert!(matches!(
        profiles.merge_json(unknown_field),
        Err(ConfigError::Parse(_))
    ));

    let mut bad = ModeProfile::mobile();
    bad.disk_segments = 2;
    assert!(matches!(
        profiles.insert(bad),
        Err(ConfigError::InvalidProfile { .. })
    ));
    assert_eq!(profiles.get("mobile").unwrap().disk_segments, 64);
}

#[test]
fn partial_overrides_patch_the_existing_mode() {
    let mut profiles = ProfileSet::builtin();
    profiles
        .merge_json(r#"{ "mobile": { "star_count": 100, "bloom": { "strength": 2.0 } } }"#)
        .unwrap();
    let mobile = profiles.get("mobile").unwrap();
    assert_eq!(mobile.star_count, 100);
    assert_eq!(mobile.bloom.strength, 2.0);
    let builtin = ModeProfile::mobile();
    assert_eq!(mobile.bloom.radius, builtin.bloom.radius);
    assert_eq!(mobile.disk_segments, builtin.disk_segments);
    assert_eq!(mobile.name, "mobile");
}

#[test]
fn a_bad_entry_leaves_every_mode_untouched() {
    let mut profiles = ProfileSet::builtin();
    // "max" sorts before "mobile", so it would be applied first
    let json = r#"{ "max": { "star_count": 7 }, "mobile": { "disk_segments": 2 } }"#;
    assert!(matches!(
        profiles.merge_json(json),
        Err(ConfigError::InvalidProfile { .. })
    ));
    assert_eq!(profiles.get("max").unwrap(), &ModeProfile::max());
    assert_eq!(profiles.get("mobile").unwrap(), &ModeProfile::mobile());
}

#[test]
fn new_modes_must_be_complete() {
    let mut profiles = ProfileSet::builtin();
    let err = profiles
        .merge_json(r#"{ "cinema": { "star_count": 4000 } }"#)
        .unwrap_err();
    match err {
        ConfigError::InvalidProfile { name, reason } => {
            assert_eq!(name, "cinema");
            assert!(reason.contains("disk_segments"));
            assert!(!reason.contains("star_count"));
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(profiles.get("cinema").is_err());
}
