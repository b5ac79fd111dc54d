//! Servo Dust Cap Driver
//!
//! Drives a servo-actuated telescope dust cap and its relay-switched flat
//! light through external helper commands.
//!
//! ## Features
//!
//! - Calibrated open/closed positions from travel endpoints and preferred limits
//! - Move state machine with persisted park status
//! - Direct angle stepping for calibrating travel
//! - Relay flat light control with lookup before switching
//! - Typed property requests validated once at the boundary
//! - Simulation mode and optional command timeouts

mod actuator;
mod calibration;
mod command;
mod config;
mod driver;
mod error;
mod light;
mod park;
mod protocol;
mod state;

pub use actuator::{ScriptServo, ServoActuator, ServoMove, SimulatedServo};
pub use calibration::{CalibrationConfig, CapTarget};
pub use command::{run_command, CommandLine, CommandOutput};
pub use config::DriverConfig;
pub use driver::{CapDriver, CapStatus, MoveRequest, DEFAULT_DEVICE_NAME};
pub use error::{CapError, CapResult};
pub use light::{LightController, LightType, PropToolRelay, RelayControl};
pub use park::{FileParkStore, MemoryParkStore, ParkData, ParkStore};
pub use protocol::{properties, CapRequest, ElementValue, PropertyState};
pub use state::{CalibratorState, CoverState, MoveState};
