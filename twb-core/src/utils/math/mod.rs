//! Math utilities for the Two-Wheel Bot.
//!
//! This module provides differential-drive kinematics and the wheel odometry
//! built on top of it.

pub mod kinematics;
pub mod odometry;
