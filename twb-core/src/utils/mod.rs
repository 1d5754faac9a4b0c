//! Utility re-exports and helper macros for the Two-Wheel Bot.
//!
//! This module re-exports the drive components, timing, kinematics and
//! configuration:
//!
//! - `config`: serde-deserializable robot description
//! - `controllers`: board access, wheel encoders and motors
//! - `math`: differential-drive kinematics and wheel odometry
//!
//! The `mk_static!` macro simplifies static initialization in no-std contexts.

pub mod config;
pub mod controllers;
pub mod math;

pub use config::{ConfigError, RobotConfig};
pub use controllers::DriveController;
pub use embassy_time::*;
pub use math::kinematics::DifferentialDrive as dd;
pub use math::odometry::{OdometryManager, TwoWheelOdometryManager};

#[macro_export]
/// Initialize a no-std static cell and write the given value into it.
///
/// This macro creates a `static_cell::StaticCell` for type `$t` and initializes
/// it with `$val`, returning a mutable reference to the stored value. The cell
/// type is reached through this crate, so callers need no `static_cell` dependency.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: $crate::static_cell::StaticCell<$t> =
            $crate::static_cell::StaticCell::new();
        STATIC_CELL.uninit().write($val)
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_mk_static_yields_distinct_cells() {
        let first: &'static mut u32 = crate::mk_static!(u32, 1);
        let second: &'static mut u32 = crate::mk_static!(u32, 2);
        *first += 10;
        assert_eq!((*first, *second), (11, 2));
    }
}
