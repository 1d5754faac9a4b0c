//! DC motor driver for the Two-Wheel Bot.
//!
//! Each motor is driven by a direction pin (`LOW` = forwards, `HIGH` =
//! backwards) and a PWM speed pin. Drive commands are received via
//! `DRIVE_CHANNEL`.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::{
    digital::{self, OutputPin},
    pwm::{self, SetDutyCycle},
};
use serde::{Deserialize, Serialize};

use super::{
    board::{Board, InvalidPinError},
    encoder::Direction,
};

/// Channel used to receive drive commands (`DriveCommand` messages).
pub static DRIVE_CHANNEL: embassy_sync::channel::Channel<
    CriticalSectionRawMutex,
    DriveCommand,
    16,
> = embassy_sync::channel::Channel::new();

/// Drive command variants.
///
/// Serialized as JSON with tag `"dc"`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "dc", rename_all = "snake_case")]
pub enum DriveCommand {
    /// Per-wheel speed in percent; negative values reverse the wheel.
    W { l: f32, r: f32 },
    /// Body twist: linear velocity `v` and angular velocity `w`.
    T { v: f32, w: f32 },
    /// Stop both wheels.
    Stop,
    /// Read the current odometry estimate.
    Odom,
}

/// Errors raised while driving the motor pins.
#[derive(Debug)]
pub enum MotorError<DE, PE> {
    Pin(InvalidPinError),
    Direction(DE),
    Duty(PE),
}

/// A wheel motor that accepts a signed speed in percent.
pub trait WheelMotor {
    type Error: core::fmt::Debug;

    fn set_speed(
        &mut self,
        percent: f32,
    ) -> Result<(), Self::Error>;

    fn stop(&mut self) -> Result<(), Self::Error> {
        self.set_speed(0.0)
    }
}

/// PWM motor with a direction pin.
pub struct Motor<D, P> {
    direction_pin: D,
    speed_pin: P,
    direction: Direction,
}

impl<D, P> Motor<D, P>
where
    D: OutputPin,
    P: SetDutyCycle,
{
    /// Create a motor, leaving it stopped and set to forwards.
    pub fn new(
        direction_pin: D,
        speed_pin: P,
    ) -> Result<Self, MotorError<D::Error, P::Error>> {
        let mut motor = Motor {
            direction_pin,
            speed_pin,
            direction: Direction::Forwards,
        };
        motor.set_direction_forwards()?;
        motor
            .speed_pin
            .set_duty_cycle_fully_off()
            .map_err(MotorError::Duty)?;
        Ok(motor)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction_forwards(&mut self) -> Result<(), MotorError<D::Error, P::Error>> {
        self.direction_pin
            .set_low()
            .map_err(MotorError::Direction)?;
        self.direction = Direction::Forwards;
        Ok(())
    }

    pub fn set_direction_backwards(&mut self) -> Result<(), MotorError<D::Error, P::Error>> {
        self.direction_pin
            .set_high()
            .map_err(MotorError::Direction)?;
        self.direction = Direction::Backwards;
        Ok(())
    }

    /// Duty for `percent` of full speed, clamped to `0..=100`.
    fn duty_for(
        &self,
        percent: f32,
    ) -> u16 {
        let max = self.speed_pin.max_duty_cycle() as f32;
        let fraction = percent.clamp(0.0, 100.0) / 100.0;
        libm::roundf(max * fraction) as u16
    }
}

impl<Pn> Motor<Pn, Pn>
where
    Pn: OutputPin + SetDutyCycle,
{
    /// Claim the direction and speed pins from `board`.
    pub fn from_board<'a, Bd>(
        board: &'a Bd,
        direction_pin: u8,
        speed_pin: u8,
    ) -> Result<Self, MotorError<<Pn as digital::ErrorType>::Error, <Pn as pwm::ErrorType>::Error>>
    where
        Bd: Board<Pin<'a> = Pn> + 'a,
    {
        let direction = board.pin(direction_pin).map_err(MotorError::Pin)?;
        let speed = board.pin(speed_pin).map_err(MotorError::Pin)?;
        tracing::debug!(direction_pin, speed_pin, "motor configured");
        Self::new(direction, speed)
    }
}

impl<D, P> WheelMotor for Motor<D, P>
where
    D: OutputPin,
    P: SetDutyCycle,
{
    type Error = MotorError<D::Error, P::Error>;

    /// Negative `percent` selects backwards; the magnitude is clamped to 100.
    /// Zero keeps the current direction.
    fn set_speed(
        &mut self,
        percent: f32,
    ) -> Result<(), Self::Error> {
        if percent > 0.0 {
            self.set_direction_forwards()?;
        } else if percent < 0.0 {
            self.set_direction_backwards()?;
        }
        let duty = self.duty_for(libm::fabsf(percent));
        self.speed_pin
            .set_duty_cycle(duty)
            .map_err(MotorError::Duty)
    }
}
