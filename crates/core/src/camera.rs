//! Scene camera: a perspective look-at camera plus the rig that moves it
//! (manual orbit with damping and the background auto-sway).

use glam::{Mat4, Vec3};

use crate::constants::*;

/// Simple right-handed camera description with perspective projection.
#[derive(Clone, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub aspect: f32,
    pub fovy_radians: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    /// Compute the clip-space projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy_radians, self.aspect, self.znear, self.zfar)
    }
    /// Compute the view matrix that transforms world to view space.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

/// Orbit rig around the origin. Manual input moves a goal; the actual angles
/// chase the goal with [`ORBIT_DAMPING`] per frame.
#[derive(Clone, Debug)]
pub struct CameraRig {
    yaw: f32,
    pitch: f32,
    yaw_goal: f32,
    pitch_goal: f32,
    distance: f32,
    aspect: f32,
}

impl CameraRig {
    pub fn new(aspect: f32) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            yaw_goal: 0.0,
            pitch_goal: 0.0,
            distance: CAMERA_DISTANCE,
            aspect,
        }
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    /// Nudge the orbit goal (radians).
    pub fn orbit(&mut self, d_yaw: f32, d_pitch: f32) {
        self.yaw_goal += d_yaw;
        self.pitch_goal = (self.pitch_goal + d_pitch).clamp(-1.2, 1.2);
    }

    /// Advance damping and compose the auto-sway for elapsed time `t` seconds.
    pub fn update(&mut self, t: f32, auto_speed: f32) -> Camera {
        self.yaw += (self.yaw_goal - self.yaw) * ORBIT_DAMPING;
        self.pitch += (self.pitch_goal - self.pitch) * ORBIT_DAMPING;

        let sway = Vec3::new(
            (t * AUTO_CAMERA_FREQ_X * auto_speed).sin() * AUTO_CAMERA_SWAY_X,
            CAMERA_HEIGHT + (t * AUTO_CAMERA_FREQ_Y * auto_speed).sin() * AUTO_CAMERA_SWAY_Y,
            self.distance,
        );
        let orbit = Mat4::from_rotation_y(self.yaw) * Mat4::from_rotation_x(-self.pitch);
        Camera {
            eye: orbit.transform_point3(sway),
            target: Vec3::ZERO,
            up: Vec3::Y,
            aspect: self.aspect,
            fovy_radians: CAMERA_FOV_DEG.to_radians(),
            znear: CAMERA_NEAR,
            zfar: CAMERA_FAR,
        }
    }
}
