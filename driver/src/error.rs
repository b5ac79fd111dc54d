//! Dust cap error types
//!
//! Provides structured error types for cap, light and settings operations.

use std::time::Duration;

/// Errors raised by the dust cap driver
#[derive(Debug, thiserror::Error)]
pub enum CapError {
    /// The servo script exited non-zero, reported failure or could not be spawned
    #[error("Moving servo failed ({command}): {reason}")]
    ActuationFailed { command: String, reason: String },

    /// A required external interpreter or library is missing at connect time
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    /// The relay property could not be looked up
    #[error("Relay property not available: {property}")]
    RelayUnavailable { property: String },

    #[error("Device not connected")]
    NotConnected,

    #[error("Operation not supported")]
    NotSupported,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    /// An external command did not finish within the configured timeout
    #[error("Command '{command}' timed out after {duration:?}")]
    CommandTimeout { command: String, duration: Duration },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for CapError {
    fn from(err: serde_json::Error) -> Self {
        CapError::Config(err.to_string())
    }
}

/// Result type for dust cap operations
pub type CapResult<T> = Result<T, CapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CapError::ActuationFailed {
            command: "/usr/bin/arduino_servo.py /dev/ttyUSB0 0 140 40".to_string(),
            reason: "exit status 1".to_string(),
        };
        assert!(err.to_string().contains("arduino_servo.py"));
        assert!(err.to_string().contains("exit status 1"));

        let err = CapError::RelayUnavailable {
            property: "USBRelay2 Roof.POWER_SWITCH_2.POWER_ON_SWITCH".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Relay property not available: USBRelay2 Roof.POWER_SWITCH_2.POWER_ON_SWITCH"
        );
    }

    #[test]
    fn test_not_connected_display() {
        assert_eq!(CapError::NotConnected.to_string(), "Device not connected");
    }

    #[test]
    fn test_command_timeout_display() {
        let err = CapError::CommandTimeout {
            command: "indi_getprop".to_string(),
            duration: Duration::from_secs(5),
        };
        let msg = err.to_string();
        assert!(msg.contains("indi_getprop"));
        assert!(msg.contains("5s"));
    }

    #[test]
    fn test_json_error_maps_to_config() {
        let err: CapError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, CapError::Config(_)));
    }
}
