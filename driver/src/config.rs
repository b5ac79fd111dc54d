//! Persisted driver settings

use crate::calibration::CalibrationConfig;
use crate::error::{CapError, CapResult};
use crate::light::LightType;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const MAX_SERVO_ID: u8 = 6;
pub const MAX_LIGHT_SWITCH: u8 = 7;
pub const MAX_TRAVEL_DEGREES: f64 = 180.0;
pub const MIN_LIMIT_PERCENT: f64 = 50.0;
pub const MAX_LIMIT_PERCENT: f64 = 100.0;

/// Settings reloaded at startup and saved after each settings change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub servo_id: u8,
    pub light_switch: u8,
    pub light_type: LightType,
    pub device_path: String,
    pub calibration: CalibrationConfig,
    /// Servo helper script
    pub servo_script: String,
    pub getprop: String,
    pub setprop: String,
    /// Name of the device owning the light relay
    pub relay_device: String,
    /// Command whose success proves the servo script can run
    pub dependency_check: Vec<String>,
    pub simulation: bool,
    /// Unset means external commands may run forever
    pub command_timeout_secs: Option<u64>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            servo_id: 0,
            light_switch: 0,
            light_type: LightType::UsbRelay2,
            device_path: "/dev/ttyUSB0".to_string(),
            calibration: CalibrationConfig::default(),
            servo_script: "/usr/bin/arduino_servo.py".to_string(),
            getprop: "indi_getprop".to_string(),
            setprop: "indi_setprop".to_string(),
            relay_device: "USBRelay2 Roof".to_string(),
            dependency_check: vec![
                "python3".to_string(),
                "-c".to_string(),
                "import pyfirmata".to_string(),
            ],
            simulation: false,
            command_timeout_secs: None,
        }
    }
}

impl DriverConfig {
    /// Load settings, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> CapResult<Self> {
        if !path.exists() {
            tracing::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: DriverConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> CapResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> CapResult<()> {
        validate_servo_id(self.servo_id)?;
        validate_light_switch(self.light_switch)?;
        validate_travel(self.calibration.travel_open)?;
        validate_travel(self.calibration.travel_close)?;
        validate_limit(self.calibration.limit_open)?;
        validate_limit(self.calibration.limit_close)?;
        if self.dependency_check.is_empty() {
            return Err(CapError::Config("dependency_check must name a program".to_string()));
        }
        Ok(())
    }
}

pub fn validate_servo_id(id: u8) -> CapResult<u8> {
    if id > MAX_SERVO_ID {
        return Err(CapError::InvalidParameter(format!(
            "servo id {} out of range [0, {}]",
            id, MAX_SERVO_ID
        )));
    }
    Ok(id)
}

pub fn validate_light_switch(index: u8) -> CapResult<u8> {
    if index > MAX_LIGHT_SWITCH {
        return Err(CapError::InvalidParameter(format!(
            "light switch {} out of range [0, {}]",
            index, MAX_LIGHT_SWITCH
        )));
    }
    Ok(index)
}

pub fn validate_travel(degrees: f64) -> CapResult<f64> {
    if !(0.0..=MAX_TRAVEL_DEGREES).contains(&degrees) {
        return Err(CapError::InvalidParameter(format!(
            "travel {} out of range [0, {}]",
            degrees, MAX_TRAVEL_DEGREES
        )));
    }
    Ok(degrees)
}

pub fn validate_limit(percent: f64) -> CapResult<f64> {
    if !(MIN_LIMIT_PERCENT..=MAX_LIMIT_PERCENT).contains(&percent) {
        return Err(CapError::InvalidParameter(format!(
            "limit {} out of range [{}, {}]",
            percent, MIN_LIMIT_PERCENT, MAX_LIMIT_PERCENT
        )));
    }
    Ok(percent)
}
