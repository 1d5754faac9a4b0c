//! Module Exports
//!
//! This file exports the hardware-facing modules of the drive system.
//!
//! - `board`: pin table, interrupt dispatch and clocks.
//! - `encoder`: quadrature wheel encoders.
//! - `motor`: PWM motor drivers and drive commands.

pub mod board;
pub mod encoder;
pub mod motor;

pub use board::{InvalidPinError, Side};
pub use encoder::{Direction, Encoder, MockEncoder, RotaryEncoder};
pub use motor::{DriveCommand, Motor, WheelMotor, DRIVE_CHANNEL};

use crate::utils::math::{kinematics::DifferentialDrive, odometry::OdometryManager};

/// Errors from either wheel's motor.
#[derive(Debug)]
pub enum DriveError<L, R> {
    Left(L),
    Right(R),
}

/// Owns both wheel motors and the odometry, and executes `DriveCommand`s.
pub struct DriveController<LM, RM, O> {
    pub left: LM,
    pub right: RM,
    pub odometry: O,
    drive: DifferentialDrive,
    max_wheel_rps: f32,
}

impl<LM, RM, O> DriveController<LM, RM, O>
where
    LM: WheelMotor,
    RM: WheelMotor,
    O: OdometryManager,
{
    /// `max_wheel_rps` is the wheel rate at 100% duty; body twist commands
    /// are scaled against it.
    pub fn new(
        left: LM,
        right: RM,
        odometry: O,
        drive: DifferentialDrive,
        max_wheel_rps: f32,
    ) -> Self {
        DriveController {
            left,
            right,
            odometry,
            drive,
            max_wheel_rps,
        }
    }

    /// Execute a `DriveCommand`.
    ///
    /// Returns `(linear, angular)` velocity for `Odom` or `None` for other commands.
    pub fn execute_command(
        &mut self,
        command: DriveCommand,
    ) -> Result<Option<(f32, f32)>, DriveError<LM::Error, RM::Error>> {
        match command {
            DriveCommand::W { l, r } => {
                self.apply_wheel_speeds(l, r)?;
                Ok(None)
            }
            DriveCommand::T { v, w } => {
                let (l, r) = self.twist_to_percent(v, w);
                self.apply_wheel_speeds(l, r)?;
                Ok(None)
            }
            DriveCommand::Stop => {
                self.left.stop().map_err(DriveError::Left)?;
                self.right.stop().map_err(DriveError::Right)?;
                Ok(None)
            }
            DriveCommand::Odom => Ok(Some((
                self.odometry.linear_velocity(),
                self.odometry.angular_velocity(),
            ))),
        }
    }

    /// Wheel duties in percent for body velocities `v` and `w`.
    pub fn twist_to_percent(
        &self,
        v: f32,
        w: f32,
    ) -> (f32, f32) {
        let (l, r) = self.drive.wheel_rates(v, w);
        (
            100.0 * l / self.max_wheel_rps,
            100.0 * r / self.max_wheel_rps,
        )
    }

    /// Applies signed wheel speeds (percent) to both motors.
    pub fn apply_wheel_speeds(
        &mut self,
        left: f32,
        right: f32,
    ) -> Result<(), DriveError<LM::Error, RM::Error>> {
        self.left.set_speed(left).map_err(DriveError::Left)?;
        self.right.set_speed(right).map_err(DriveError::Right)?;
        Ok(())
    }

    pub async fn drive_ch(&mut self) -> ! {
        loop {
            let command = DRIVE_CHANNEL.receiver().receive().await;
            tracing::info!("Received Drive Command: {:?}", command);
            match self.execute_command(command) {
                Ok(Some((linear, angular))) => {
                    tracing::info!(linear, angular, "Odometry Read");
                }
                Ok(None) => tracing::info!("Drive command executed successfully"),
                Err(e) => tracing::error!("Drive command failed: {:?}", e),
            }
        }
    }
}
