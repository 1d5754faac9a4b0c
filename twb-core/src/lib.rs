//! Core drivers and odometry for the Two-Wheel Bot on no-std embedded platforms.
//!
//! For a host-side simulation, see the `twb-app/mock-mcu` binary.
#![cfg_attr(not(test), no_std)]

pub mod utils;

#[doc(hidden)]
pub use static_cell;
