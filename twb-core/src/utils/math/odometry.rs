//! Wheel odometry.
//!
//! `TwoWheelOdometryManager` reads both wheel encoders on every query and
//! applies the unicycle model from [`DifferentialDrive`]. It holds no state
//! besides the geometry, so each answer reflects the encoders' rates at the
//! moment of the call.

use super::kinematics::DifferentialDrive;
use crate::utils::controllers::encoder::Encoder;

/// Anything that can report the robot body's instantaneous velocity.
pub trait OdometryManager {
    /// Forward velocity, in wheel-radius units per second.
    fn linear_velocity(&self) -> f32;

    /// Angular velocity in rad/s, positive when turning toward the right side.
    fn angular_velocity(&self) -> f32;
}

impl<O: OdometryManager + ?Sized> OdometryManager for &O {
    fn linear_velocity(&self) -> f32 {
        (**self).linear_velocity()
    }

    fn angular_velocity(&self) -> f32 {
        (**self).angular_velocity()
    }
}

/// Odometry for a differential-drive robot from a left and a right encoder.
///
/// The encoders may be owned or borrowed (`&E` is also an [`Encoder`]).
pub struct TwoWheelOdometryManager<L, R> {
    drive: DifferentialDrive,
    left: L,
    right: R,
}

impl<L, R> TwoWheelOdometryManager<L, R>
where
    L: Encoder,
    R: Encoder,
{
    pub fn new(
        track_width: f32,
        wheel_radius: f32,
        left: L,
        right: R,
    ) -> Self {
        Self::with_drive(DifferentialDrive::new(track_width, wheel_radius), left, right)
    }

    pub fn with_drive(
        drive: DifferentialDrive,
        left: L,
        right: R,
    ) -> Self {
        Self { drive, left, right }
    }

    pub fn left(&self) -> &L {
        &self.left
    }

    pub fn right(&self) -> &R {
        &self.right
    }

    /// `(linear, angular)` from a single read of each encoder.
    pub fn velocity(&self) -> (f32, f32) {
        self.drive.body_velocity(
            self.left.revolutions_per_second(),
            self.right.revolutions_per_second(),
        )
    }
}

impl<L, R> OdometryManager for TwoWheelOdometryManager<L, R>
where
    L: Encoder,
    R: Encoder,
{
    fn linear_velocity(&self) -> f32 {
        self.velocity().0
    }

    fn angular_velocity(&self) -> f32 {
        self.velocity().1
    }
}

#[cfg(test)]
mod tests {
    use core::f32::consts::PI;

    use super::*;
    use crate::utils::controllers::encoder::{Direction, MockEncoder};

    const WIDTH: f32 = 100.0;
    const RADIUS: f32 = 50.0;

    fn close(
        a: f32,
        b: f32,
    ) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_at_rest() {
        let left = MockEncoder::new();
        let right = MockEncoder::new();
        let odom = TwoWheelOdometryManager::new(WIDTH, RADIUS, &left, &right);
        assert_eq!(odom.linear_velocity(), 0.0);
        assert_eq!(odom.angular_velocity(), 0.0);
    }

    #[test]
    fn test_straight_forwards() {
        let left = MockEncoder::new();
        let right = MockEncoder::new();
        let odom = TwoWheelOdometryManager::new(WIDTH, RADIUS, &left, &right);

        for step in 0..20 {
            let rate = step as f32 * 0.1;
            left.set_revolutions_per_second(rate);
            right.set_revolutions_per_second(rate);
            assert!(close(odom.linear_velocity(), 2.0 * PI * RADIUS * rate));
            assert!(close(odom.angular_velocity(), 0.0));
        }

        left.set_revolutions_per_second(1.0);
        right.set_revolutions_per_second(1.0);
        assert!((odom.linear_velocity() - 314.16).abs() < 1e-2);
    }

    #[test]
    fn test_turning() {
        let left = MockEncoder::new();
        let right = MockEncoder::new();
        let odom = TwoWheelOdometryManager::new(WIDTH, RADIUS, &left, &right);

        left.set_revolutions_per_second(1.0);
        for step in 0..20 {
            let rate = step as f32 * 0.1;
            right.set_revolutions_per_second(rate);
            let expected = 0.5 * 2.0 * PI * RADIUS * (1.0 + rate);
            assert!(close(odom.linear_velocity(), expected));
        }
    }

    #[test]
    fn test_spot_turn() {
        let left = MockEncoder::new();
        let right = MockEncoder::new();
        let odom = TwoWheelOdometryManager::new(WIDTH, RADIUS, &left, &right);

        left.set_direction(Direction::Forwards);
        right.set_direction(Direction::Backwards);
        for step in 0..20 {
            let rate = step as f32 * 0.1;
            left.set_revolutions_per_second(rate);
            right.set_revolutions_per_second(rate);
            assert!(close(odom.linear_velocity(), 0.0));
        }

        left.set_revolutions_per_second(1.0);
        right.set_revolutions_per_second(1.0);
        assert!((odom.angular_velocity() - 6.283).abs() < 1e-3);
    }

    #[test]
    fn test_backing_up() {
        let left = MockEncoder::new();
        let right = MockEncoder::new();
        let odom = TwoWheelOdometryManager::new(WIDTH, RADIUS, &left, &right);

        left.set_direction(Direction::Backwards);
        right.set_direction(Direction::Backwards);
        left.set_revolutions_per_second(1.0);
        right.set_revolutions_per_second(0.5);
        let v_left = -2.0 * PI * RADIUS;
        let v_right = -PI * RADIUS;
        assert!(odom.linear_velocity() < 0.0);
        assert!(close(odom.linear_velocity(), (v_left + v_right) / 2.0));
        assert!(close(odom.angular_velocity(), (v_left - v_right) / WIDTH));
        assert!(odom.angular_velocity() < 0.0);
    }

    #[test]
    fn test_angular_left_only() {
        let left = MockEncoder::new();
        let right = MockEncoder::new();
        let odom = TwoWheelOdometryManager::new(WIDTH, RADIUS, &left, &right);

        for step in 1..20 {
            let rate = step as f32 * 0.1;
            left.set_revolutions_per_second(rate);
            let expected = 2.0 * PI * RADIUS * rate / WIDTH;
            assert!(close(odom.angular_velocity(), expected));
        }
    }

    #[test]
    fn test_owned_encoders_through_trait_object() {
        let odom = TwoWheelOdometryManager::new(WIDTH, RADIUS, MockEncoder::new(), MockEncoder::new());
        odom.left().set_revolutions_per_second(1.0);
        let manager: &dyn OdometryManager = &odom;
        assert!(manager.linear_velocity() > 0.0);
        assert!(manager.angular_velocity() > 0.0);

        odom.right().set_revolutions_per_second(1.0);
        assert!(close(manager.angular_velocity(), 0.0));
    }
}
