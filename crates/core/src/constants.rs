// Shared tuning constants for the scene, the gesture smoother and the
// post-processing chain. Keep magic numbers here rather than inline.

// Gesture smoothing (fraction per frame tick)
pub const SMOOTH_RATE_SCALE: f32 = 0.15;
pub const SMOOTH_RATE_ROTATION: f32 = 0.15;
pub const SMOOTH_RATE_PULSE: f32 = 0.20;

// Raw relaxation toward rest when the hand is lost (per frame tick)
pub const RELAX_RATE_SCALE: f32 = 0.05;
pub const RELAX_FACTOR_ROTATION: f32 = 0.9; // multiplicative
pub const RELAX_FACTOR_PULSE: f32 = 0.9; // multiplicative

// Frames without any sample before the raw signal is treated as lost
pub const GESTURE_STALE_FRAMES: u32 = 45;

// Raw gesture clamp ranges
pub const GESTURE_SCALE_MIN: f32 = 0.6;
pub const GESTURE_SCALE_MAX: f32 = 3.5;
pub const GESTURE_ROT_LIMIT: f32 = 2.0;
pub const GESTURE_PULSE_MAX: f32 = 3.0;

// Root transform follow rate toward the smoothed rotation
pub const ROOT_FOLLOW_RATE: f32 = 0.08;

// Pulse contribution to disk intensity
pub const PULSE_INTENSITY_GAIN: f32 = 0.3;

// Scene geometry (world units)
pub const HORIZON_RADIUS: f32 = 22.0;
pub const HORIZON_SEGMENTS: u32 = 128;
pub const PHOTON_RING_INNER: f32 = 20.3;
pub const PHOTON_RING_OUTER: f32 = 21.0;
pub const PHOTON_RING_SEGMENTS: u32 = 256;
pub const DISK_INNER: f32 = 24.0;
pub const DISK_OUTER: f32 = 120.0;
pub const HALO_INNER: f32 = 40.0;
pub const HALO_OUTER: f32 = 140.0;
pub const HALO_SEGMENTS: u32 = 200;
pub const JET_RADIUS: f32 = 10.0;
pub const JET_LENGTH: f32 = 200.0;
pub const JET_OFFSET: f32 = 110.0;
pub const JET_RADIAL_SEGMENTS: u32 = 32;
pub const JET_HEIGHT_SEGMENTS: u32 = 32;

// Starfield shell
pub const STAR_RADIUS_MIN: f32 = 600.0;
pub const STAR_RADIUS_SPAN: f32 = 1200.0;
pub const STAR_VERTICAL_SQUASH: f32 = 0.6;
pub const STARFIELD_SEED: u64 = 0x5EED_57A2;

// Camera
pub const CAMERA_FOV_DEG: f32 = 50.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 5000.0;
pub const CAMERA_HEIGHT: f32 = 18.0;
pub const CAMERA_DISTANCE: f32 = 160.0;
pub const AUTO_CAMERA_SWAY_X: f32 = 15.0;
pub const AUTO_CAMERA_SWAY_Y: f32 = 4.0;
pub const AUTO_CAMERA_FREQ_X: f32 = 0.05;
pub const AUTO_CAMERA_FREQ_Y: f32 = 0.07;
pub const ORBIT_DAMPING: f32 = 0.1;

// Lensing field
pub const LENS_FALLOFF: f32 = 0.004; // k in strength * k / (r^2 + eps)
pub const LENS_EPSILON: f32 = 0.01;
pub const LENS_SHELL_INNER: f32 = 0.18;
pub const LENS_SHELL_OUTER: f32 = 0.48;
pub const LENS_BEND_LIMIT: f32 = 0.9;
pub const LENS_SWIRL: f32 = 0.6;
pub const LENS_MIX_INNER: f32 = 0.20;
pub const LENS_MIX_OUTER: f32 = 0.45;
// swirl wobble, detailed shading only
pub const LENS_SHIMMER: f32 = 0.15;
pub const LENS_SHIMMER_RATE: f32 = 1.7;

// Bloom chain
pub const BLOOM_MIP_LEVELS: usize = 4;

// Render targets
pub const MIN_SAFE_TARGET_SIZE: u32 = 64;

// Default UI slider values
pub const DEFAULT_DISK_SPIN: f32 = 0.25;
pub const DEFAULT_DISK_INTENSITY: f32 = 1.0;

// Upper bound on a single frame delta; larger gaps (suspended tab, debugger) are clipped
pub const MAX_FRAME_DT: f32 = 0.25;
