//! Kinematics utilities for two-wheeled differential-drive robots.
//!
//! The `DifferentialDrive` struct maps wheel rates to body velocities with the
//! unicycle model and inverts body velocity commands back to wheel rates.
//!
//! Sign convention: linear velocity is positive forwards, and angular velocity
//! is positive when the left wheel runs faster than the right one (the robot
//! turns toward its right side).
//!
//! # Example
//! ```rust
//! use twb_core::utils::math::kinematics::DifferentialDrive;
//! let drive = DifferentialDrive::new(100.0, 50.0);
//! let (v, w) = drive.body_velocity(1.0, 1.0);
//! assert!(v > 0.0);
//! assert!(w.abs() < 1e-6);
//! ```
//!
use core::f32::consts::PI;

/// Geometry of a two-wheeled differential-drive robot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifferentialDrive {
    /// Distance between the wheel contact points
    track_width: f32,
    /// Radius of each wheel
    wheel_radius: f32,
}

impl DifferentialDrive {
    /// Instantiate with a given track width and wheel radius.
    ///
    /// Both must be positive; this is only checked in debug builds.
    pub fn new(
        track_width: f32,
        wheel_radius: f32,
    ) -> Self {
        debug_assert!(track_width > 0.0, "track width must be positive");
        debug_assert!(wheel_radius > 0.0, "wheel radius must be positive");
        Self {
            track_width,
            wheel_radius,
        }
    }

    /// Ground speed of a wheel turning at `rps` revolutions per second.
    pub fn wheel_speed(
        &self,
        rps: f32,
    ) -> f32 {
        rps * 2.0 * PI * self.wheel_radius
    }

    /// Recover body velocities from signed wheel rates.
    ///
    /// # Returns
    ///
    /// `(v, ω)` where `v = (v_l + v_r) / 2` and `ω = (v_l - v_r) / L`.
    pub fn body_velocity(
        &self,
        left_rps: f32,
        right_rps: f32,
    ) -> (f32, f32) {
        let v_left = self.wheel_speed(left_rps);
        let v_right = self.wheel_speed(right_rps);
        (
            (v_left + v_right) / 2.0,
            (v_left - v_right) / self.track_width,
        )
    }

    /// Compute the wheel rates (rev/s) that produce linear velocity `v` and
    /// angular velocity `omega`.
    pub fn wheel_rates(
        &self,
        v: f32,
        omega: f32,
    ) -> (f32, f32) {
        let half_turn = omega * self.track_width / 2.0;
        let circumference = 2.0 * PI * self.wheel_radius;
        ((v + half_turn) / circumference, (v - half_turn) / circumference)
    }
}
