//! Property names and request decoding
//!
//! Property updates from the host arrive as a property name plus a list of
//! named element values. They are decoded into a [`CapRequest`] once, here,
//! and validated before the driver sees them.

use crate::config::{self, DriverConfig};
use crate::error::{CapError, CapResult};
use crate::light::LightType;

/// Property and element names exposed by the driver
pub mod properties {
    // Main tab
    pub const CAP_PARK: &str = "CAP_PARK";
    pub const PARK: &str = "PARK";
    pub const UNPARK: &str = "UNPARK";
    pub const FLAT_LIGHT_CONTROL: &str = "FLAT_LIGHT_CONTROL";
    pub const FLAT_LIGHT_ON: &str = "FLAT_LIGHT_ON";
    pub const FLAT_LIGHT_OFF: &str = "FLAT_LIGHT_OFF";
    pub const FLAT_LIGHT_INTENSITY: &str = "FLAT_LIGHT_INTENSITY";
    pub const FLAT_LIGHT_INTENSITY_VALUE: &str = "FLAT_LIGHT_INTENSITY_VALUE";
    pub const STEPP_MOVE: &str = "STEPP_MOVE";
    pub const STEPP_ABS: &str = "STEPP_ABS";

    // Options tab
    pub const TYPE_SELECT: &str = "TYPE_SELECT";
    pub const TYPE_USBRELAY2: &str = "TYPE_USBRELAY2";
    pub const TYPE_NONE: &str = "TYPE_NONE";
    pub const DEVICE_PATH: &str = "DEVICE_PATH";

    // Calibration tab
    pub const SERVO_ID: &str = "SERVO_ID";
    pub const LIGHT_SWITCH: &str = "LIGHT_SWITCH";
    pub const ROOF_TRAVEL_LIMITS: &str = "ROOF_TRAVEL_LIMITS";
    pub const ROOF_PREFERED_LIMITS: &str = "ROOF_PREFERED_LIMITS";
    pub const LIMIT_OPEN: &str = "LIMIT_OPEN";
    pub const LIMIT_CLOSE: &str = "LIMIT_CLOSE";
}

/// Property state reported back to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyState {
    Idle,
    Ok,
    Busy,
    Alert,
}

/// One element of an incoming property update
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Number(f64),
    Switch(bool),
    Text(String),
}

/// A decoded property update
#[derive(Debug, Clone, PartialEq)]
pub enum CapRequest {
    Park,
    Unpark,
    /// Direct servo angle, bypassing calibration
    MoveToAngle(f64),
    Light(bool),
    Brightness(u16),
    ServoId(u8),
    LightSwitch(u8),
    Travel { open: f64, close: f64 },
    Limits { open: f64, close: f64 },
    DevicePath(String),
    LightType(LightType),
}

impl CapRequest {
    /// Decode a property update. Two-element vectors may be partially
    /// updated; missing elements keep their `current` value.
    pub fn decode(
        property: &str,
        elements: &[(&str, ElementValue)],
        current: &DriverConfig,
    ) -> CapResult<Self> {
        use properties::*;

        match property {
            CAP_PARK => match switch_on(property, elements, &[PARK, UNPARK])? {
                PARK => Ok(CapRequest::Park),
                _ => Ok(CapRequest::Unpark),
            },
            FLAT_LIGHT_CONTROL => {
                let on = switch_on(property, elements, &[FLAT_LIGHT_ON, FLAT_LIGHT_OFF])?;
                Ok(CapRequest::Light(on == FLAT_LIGHT_ON))
            }
            TYPE_SELECT => match switch_on(property, elements, &[TYPE_USBRELAY2, TYPE_NONE])? {
                TYPE_USBRELAY2 => Ok(CapRequest::LightType(LightType::UsbRelay2)),
                _ => Ok(CapRequest::LightType(LightType::None)),
            },
            STEPP_MOVE => {
                let angle = required_number(property, elements, STEPP_ABS)?;
                if !(0.0..=180.0).contains(&angle) {
                    return Err(CapError::InvalidParameter(format!(
                        "step angle {} out of range [0, 180]",
                        angle
                    )));
                }
                Ok(CapRequest::MoveToAngle(angle))
            }
            FLAT_LIGHT_INTENSITY => {
                let value = required_number(property, elements, FLAT_LIGHT_INTENSITY_VALUE)?;
                Ok(CapRequest::Brightness(whole_number(value, u16::MAX as u64)? as u16))
            }
            SERVO_ID => {
                let value = required_number(property, elements, SERVO_ID)?;
                let id = whole_number(value, config::MAX_SERVO_ID as u64)? as u8;
                Ok(CapRequest::ServoId(config::validate_servo_id(id)?))
            }
            LIGHT_SWITCH => {
                let value = required_number(property, elements, LIGHT_SWITCH)?;
                let index = whole_number(value, config::MAX_LIGHT_SWITCH as u64)? as u8;
                Ok(CapRequest::LightSwitch(config::validate_light_switch(index)?))
            }
            ROOF_TRAVEL_LIMITS => {
                let cal = &current.calibration;
                let open = number(property, elements, LIMIT_OPEN)?.unwrap_or(cal.travel_open);
                let close = number(property, elements, LIMIT_CLOSE)?.unwrap_or(cal.travel_close);
                Ok(CapRequest::Travel {
                    open: config::validate_travel(open)?,
                    close: config::validate_travel(close)?,
                })
            }
            ROOF_PREFERED_LIMITS => {
                let cal = &current.calibration;
                let open = number(property, elements, LIMIT_OPEN)?.unwrap_or(cal.limit_open);
                let close = number(property, elements, LIMIT_CLOSE)?.unwrap_or(cal.limit_close);
                Ok(CapRequest::Limits {
                    open: config::validate_limit(open)?,
                    close: config::validate_limit(close)?,
                })
            }
            DEVICE_PATH => match find(elements, DEVICE_PATH) {
                Some(ElementValue::Text(path)) if !path.trim().is_empty() => {
                    Ok(CapRequest::DevicePath(path.trim().to_string()))
                }
                Some(_) => Err(CapError::InvalidParameter(
                    "device path must be non-empty text".to_string(),
                )),
                None => Err(missing(property, DEVICE_PATH)),
            },
            other => Err(CapError::UnknownProperty(other.to_string())),
        }
    }
}

fn find<'a>(elements: &'a [(&str, ElementValue)], name: &str) -> Option<&'a ElementValue> {
    elements.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
}

fn missing(property: &str, element: &str) -> CapError {
    CapError::InvalidParameter(format!("{} requires element {}", property, element))
}

fn number(property: &str, elements: &[(&str, ElementValue)], name: &str) -> CapResult<Option<f64>> {
    match find(elements, name) {
        Some(ElementValue::Number(v)) if v.is_finite() => Ok(Some(*v)),
        Some(_) => Err(CapError::InvalidParameter(format!(
            "{}.{} must be a finite number",
            property, name
        ))),
        None => Ok(None),
    }
}

fn required_number(property: &str, elements: &[(&str, ElementValue)], name: &str) -> CapResult<f64> {
    number(property, elements, name)?.ok_or_else(|| missing(property, name))
}

fn whole_number(value: f64, max: u64) -> CapResult<u64> {
    if value < 0.0 || value.fract() != 0.0 || value > max as f64 {
        return Err(CapError::InvalidParameter(format!(
            "{} is not a whole number in [0, {}]",
            value, max
        )));
    }
    Ok(value as u64)
}

/// Name of the switch turned on in a one-of-many switch vector
fn switch_on(
    property: &str,
    elements: &[(&str, ElementValue)],
    names: &[&'static str],
) -> CapResult<&'static str> {
    for &name in names {
        if let Some(ElementValue::Switch(true)) = find(elements, name) {
            return Ok(name);
        }
    }
    Err(CapError::InvalidParameter(format!(
        "{} needs one of {:?} switched on",
        property, names
    )))
}
