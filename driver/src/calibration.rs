//! Servo calibration
//!
//! There is no way to read the physical servo position, so the open and
//! closed positions are always derived from the configured travel endpoints
//! and the preferred limits.

use serde::{Deserialize, Serialize};

/// Which end of travel a full move heads to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapTarget {
    Open,
    Closed,
}

impl CapTarget {
    /// Target for a park (`true`) or unpark (`false`) request
    pub fn from_closing(closing: bool) -> Self {
        if closing {
            CapTarget::Closed
        } else {
            CapTarget::Open
        }
    }
}

/// Travel endpoints (degrees) and preferred limits (percent)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub travel_open: f64,
    pub travel_close: f64,
    pub limit_open: f64,
    pub limit_close: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            travel_open: 140.0,
            travel_close: 40.0,
            limit_open: 100.0,
            limit_close: 100.0,
        }
    }
}

impl CalibrationConfig {
    /// Absolute servo position in degrees for a fully open or fully closed cap.
    ///
    /// Whichever travel endpoint is larger decides whether "open" points
    /// toward 180 or toward 0. A limit below 100% pulls the position back
    /// from the larger endpoint, or pushes it forward from the smaller one.
    /// Each limit only ever scales its own endpoint.
    pub fn full_position(&self, target: CapTarget) -> f64 {
        let open_is_larger = self.travel_open > self.travel_close;

        let pos = match target {
            CapTarget::Open if open_is_larger => self.travel_open * (self.limit_open / 100.0),
            CapTarget::Open => self.travel_open * (1.0 + (100.0 - self.limit_open) / 100.0),
            CapTarget::Closed if open_is_larger => {
                self.travel_close * (1.0 + (100.0 - self.limit_close) / 100.0)
            }
            CapTarget::Closed => self.travel_close * (self.limit_close / 100.0),
        };

        tracing::debug!("Full position for {:?}: {:6.2}", target, pos);
        pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calib(travel_open: f64, travel_close: f64, limit_open: f64, limit_close: f64) -> CalibrationConfig {
        CalibrationConfig {
            travel_open,
            travel_close,
            limit_open,
            limit_close,
        }
    }

    #[test]
    fn test_default_travel_full_limits() {
        let c = CalibrationConfig::default();
        assert_eq!(c.full_position(CapTarget::Open), 140.0);
        assert_eq!(c.full_position(CapTarget::Closed), 40.0);
    }

    #[test]
    fn test_reversed_travel_open_limit() {
        let c = calib(40.0, 140.0, 80.0, 100.0);
        assert!((c.full_position(CapTarget::Open) - 48.0).abs() < 1e-9);
    }

    #[test]
    fn test_reversed_travel_closed_scales_down() {
        let c = calib(40.0, 140.0, 100.0, 50.0);
        assert!((c.full_position(CapTarget::Closed) - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_closed_limit_pushes_up_from_small_endpoint() {
        let c = calib(140.0, 40.0, 100.0, 90.0);
        assert!((c.full_position(CapTarget::Closed) - 44.0).abs() < 1e-9);
    }

    #[test]
    fn test_open_position_increases_with_limit() {
        let mut previous = f64::MIN;
        for limit in 50..=100 {
            let c = calib(140.0, 40.0, limit as f64, 100.0);
            let pos = c.full_position(CapTarget::Open);
            assert!((pos - 140.0 * limit as f64 / 100.0).abs() < 1e-9);
            assert!(pos > previous);
            previous = pos;
        }
    }

    #[test]
    fn test_equal_travel_uses_reversed_branch() {
        let c = calib(90.0, 90.0, 50.0, 50.0);
        assert!((c.full_position(CapTarget::Closed) - 45.0).abs() < 1e-9);
        assert!((c.full_position(CapTarget::Open) - 135.0).abs() < 1e-9);
    }

    #[test]
    fn test_full_position_is_idempotent() {
        let c = calib(120.0, 10.0, 73.0, 61.0);
        let first = c.full_position(CapTarget::Open);
        assert_eq!(first, c.full_position(CapTarget::Open));
        let closed = c.full_position(CapTarget::Closed);
        assert_eq!(closed, c.full_position(CapTarget::Closed));
    }

    #[test]
    fn test_target_from_closing() {
        assert_eq!(CapTarget::from_closing(true), CapTarget::Closed);
        assert_eq!(CapTarget::from_closing(false), CapTarget::Open);
    }
}
