use gargantua_core::BloomParam;
use winit::keyboard::KeyCode;

pub const SPIN_STEP: f32 = 0.05;
pub const INTENSITY_STEP: f32 = 0.1;
pub const BLOOM_STEP: f32 = 0.1;
pub const BLOOM_FINE_STEP: f32 = 0.05;
pub const ORBIT_STEP: f32 = 0.08;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    ToggleMode,
    ToggleHorizon,
    Spin(f32),
    Intensity(f32),
    Bloom(BloomParam, f32),
    Orbit { yaw: f32, pitch: f32 },
    Quit,
}

pub fn command_for_key(key: KeyCode) -> Option<Command> {
    let cmd = match key {
        KeyCode::KeyM => Command::ToggleMode,
        KeyCode::KeyH => Command::ToggleHorizon,
        KeyCode::BracketLeft => Command::Spin(-SPIN_STEP),
        KeyCode::BracketRight => Command::Spin(SPIN_STEP),
        KeyCode::Comma => Command::Intensity(-INTENSITY_STEP),
        KeyCode::Period => Command::Intensity(INTENSITY_STEP),
        KeyCode::Minus => Command::Bloom(BloomParam::Strength, -BLOOM_STEP),
        KeyCode::Equal => Command::Bloom(BloomParam::Strength, BLOOM_STEP),
        KeyCode::Semicolon => Command::Bloom(BloomParam::Radius, -BLOOM_FINE_STEP),
        KeyCode::Quote => Command::Bloom(BloomParam::Radius, BLOOM_FINE_STEP),
        KeyCode::Digit9 => Command::Bloom(BloomParam::Threshold, -BLOOM_FINE_STEP),
        KeyCode::Digit0 => Command::Bloom(BloomParam::Threshold, BLOOM_FINE_STEP),
        KeyCode::ArrowLeft => Command::Orbit {
            yaw: -ORBIT_STEP,
            pitch: 0.0,
        },
        KeyCode::ArrowRight => Command::Orbit {
            yaw: ORBIT_STEP,
            pitch: 0.0,
        },
        KeyCode::ArrowUp => Command::Orbit {
            yaw: 0.0,
            pitch: ORBIT_STEP,
        },
        KeyCode::ArrowDown => Command::Orbit {
            yaw: 0.0,
            pitch: -ORBIT_STEP,
        },
        KeyCode::Escape => Command::Quit,
        _ => return None,
    };
    Some(cmd)
}
