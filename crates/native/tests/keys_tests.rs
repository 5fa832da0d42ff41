// Tests for the keyboard command table.

#![allow(dead_code)]
mod keys {
    include!("../src/keys.rs");
}

use gargantua_core::BloomParam;
use keys::*;
use winit::keyboard::KeyCode;

#[test]
fn mode_and_horizon_toggles() {
    assert_eq!(command_for_key(KeyCode::KeyM), Some(Command::ToggleMode));
    assert_eq!(command_for_key(KeyCode::KeyH), Some(Command::ToggleHorizon));
    assert_eq!(command_for_key(KeyCode::Escape), Some(Command::Quit));
}

#[test]
fn paired_keys_step_in_opposite_directions() {
    let pairs = [
        (KeyCode::BracketLeft, KeyCode::BracketRight),
        (KeyCode::Comma, KeyCode::Period),
        (KeyCode::Minus, KeyCode::Equal),
        (KeyCode::Semicolon, KeyCode::Quote),
        (KeyCode::Digit9, KeyCode::Digit0),
    ];
    for (down, up) in pairs {
        let value = |c| match c {
            Some(Command::Spin(d)) | Some(Command::Intensity(d)) | Some(Command::Bloom(_, d)) => d,
            other => panic!("unexpected {other:?}"),
        };
        let (d, u) = (value(command_for_key(down)), value(command_for_key(up)));
        assert!(d < 0.0 && u > 0.0);
        assert_eq!(d, -u);
    }
}

#[test]
fn every_bloom_field_has_a_key_pair() {
    let param = |k| match command_for_key(k) {
        Some(Command::Bloom(p, _)) => p,
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(param(KeyCode::Equal), BloomParam::Strength);
    assert_eq!(param(KeyCode::Quote), BloomParam::Radius);
    assert_eq!(param(KeyCode::Digit0), BloomParam::Threshold);
    assert_eq!(param(KeyCode::Minus), param(KeyCode::Equal));
    assert_eq!(param(KeyCode::Semicolon), param(KeyCode::Quote));
    assert_eq!(param(KeyCode::Digit9), param(KeyCode::Digit0));
}

#[test]
fn arrows_orbit_on_one_axis() {
    assert_eq!(
        command_for_key(KeyCode::ArrowLeft),
        Some(Command::Orbit {
            yaw: -ORBIT_STEP,
            pitch: 0.0
        })
    );
    assert_eq!(
        command_for_key(KeyCode::ArrowUp),
        Some(Command::Orbit {
            yaw: 0.0,
            pitch: ORBIT_STEP
        })
    );
}

#[test]
fn unmapped_keys_do_nothing() {
    assert_eq!(command_for_key(KeyCode::KeyQ), None);
    assert_eq!(command_for_key(KeyCode::Space), None);
}
