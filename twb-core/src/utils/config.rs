//! Robot configuration.
//!
//! `RobotConfig` describes the geometry, encoder calibration and pin wiring of
//! the robot. Every field has a default, so a JSON document only needs to
//! list what differs from the reference build:
//!
//! ```json
//! { "track_width": 0.16, "stall_timeout_ms": 250 }
//! ```

use core::fmt;

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

/// Why a config document was rejected.
#[derive(Debug)]
pub enum ConfigError {
    /// Not valid JSON, or a field has the wrong shape.
    Json(serde_json::Error),
    /// A geometry or calibration value that must be finite and positive is not.
    NonPositive { field: &'static str, value: f32 },
}

impl fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ConfigError::Json(e) => write!(f, "invalid config document: {}", e),
            ConfigError::NonPositive { field, value } => {
                write!(f, "`{}` must be finite and greater than 0, got {}", field, value)
            }
        }
    }
}

impl core::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

/// Pins wired to one wheel.
///
/// A wheel entry in a config document must list all four pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelPins {
    /// Encoder channel A, attached to the wheel's external interrupt.
    pub encoder_a: u8,
    /// Encoder channel B.
    pub encoder_b: u8,
    pub motor_direction: u8,
    /// PWM-capable pin driving the motor speed.
    pub motor_speed: u8,
}

impl WheelPins {
    pub const LEFT: WheelPins = WheelPins {
        encoder_a: 2,
        encoder_b: 4,
        motor_direction: 7,
        motor_speed: 5,
    };

    pub const RIGHT: WheelPins = WheelPins {
        encoder_a: 3,
        encoder_b: 8,
        motor_direction: 12,
        motor_speed: 6,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// Distance between the wheel contact points (m).
    pub track_width: f32,
    /// Wheel radius (m).
    pub wheel_radius: f32,
    /// Encoder channel A edges per wheel revolution.
    pub edges_per_revolution: f32,
    /// Wheel rate reached at 100% duty, used to map velocity commands.
    pub max_wheel_rps: f32,
    /// Report a stopped wheel after this long without an encoder edge.
    pub stall_timeout_ms: Option<u64>,
    pub left: WheelPins,
    pub right: WheelPins,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            track_width: 0.15,
            wheel_radius: 0.035,
            edges_per_revolution: 40.0,
            max_wheel_rps: 3.0,
            stall_timeout_ms: None,
            left: WheelPins::LEFT,
            right: WheelPins::RIGHT,
        }
    }
}

impl RobotConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: RobotConfig = serde_json::from_slice(bytes)?;
        config.validate()?;
        tracing::info!(?config, "robot config loaded");
        Ok(config)
    }

    /// Check that every divisor and scale factor is finite and positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("track_width", self.track_width),
            ("wheel_radius", self.wheel_radius),
            ("edges_per_revolution", self.edges_per_revolution),
            ("max_wheel_rps", self.max_wheel_rps),
        ];
        for (field, value) in fields {
            if !(value.is_finite() && value > 0.0) {
                tracing::warn!(field, value, "robot config rejected");
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        Ok(())
    }

    /// Encoder scale factor: wheel revolutions per channel A edge.
    pub fn revolutions_per_edge(&self) -> f32 {
        1.0 / self.edges_per_revolution
    }

    pub fn stall_timeout(&self) -> Option<Duration> {
        self.stall_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = RobotConfig::from_json(b"{}").unwrap();
        assert_eq!(config, RobotConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = RobotConfig::from_json(
            br#"{
                "track_width": 0.2,
                "stall_timeout_ms": 250,
                "right": {"encoder_a": 3, "encoder_b": 9, "motor_direction": 12, "motor_speed": 6}
            }"#,
        )
        .unwrap();
        assert_eq!(config.track_width, 0.2);
        assert_eq!(config.stall_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.right.encoder_b, 9);
        assert_eq!(config.left, WheelPins::LEFT);
    }

    #[test]
    fn test_revolutions_per_edge() {
        let config = RobotConfig {
            edges_per_revolution: 4.0,
            ..RobotConfig::default()
        };
        assert_eq!(config.revolutions_per_edge(), 0.25);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(
            RobotConfig::from_json(b"{\"track_width\": \"wide\"}"),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            RobotConfig::from_json(br#"{"left": {"encoder_a": 2}}"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_rejects_non_positive_geometry() {
        let cases = [
            (r#"{"edges_per_revolution": 0}"#, "edges_per_revolution"),
            (r#"{"track_width": 0}"#, "track_width"),
            (r#"{"wheel_radius": -0.035}"#, "wheel_radius"),
            (r#"{"max_wheel_rps": -3}"#, "max_wheel_rps"),
            (r#"{"track_width": 1e39}"#, "track_width"),
        ];
        for (doc, expected) in cases {
            match RobotConfig::from_json(doc.as_bytes()) {
                Err(ConfigError::NonPositive { field, .. }) => assert_eq!(field, expected),
                other => panic!("{} accepted: {:?}", expected, other),
            }
        }

        let nan = RobotConfig {
            wheel_radius: f32::NAN,
            ..RobotConfig::default()
        };
        assert!(matches!(
            nan.validate(),
            Err(ConfigError::NonPositive { field: "wheel_radius", .. })
        ));
        assert!(RobotConfig::default().validate().is_ok());
    }
}
