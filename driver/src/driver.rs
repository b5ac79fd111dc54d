//! Dust cap driver
//!
//! Owns the settings, the move state and the external collaborators (servo
//! actuator, light relay, park store). The host calls into it from a single
//! thread of control: property updates go through [`CapDriver::handle`] and
//! the periodic timer through [`CapDriver::tick`].

use crate::actuator::{ScriptServo, ServoActuator, ServoMove, SimulatedServo};
use crate::calibration::CapTarget;
use crate::command::{run_command, CommandLine};
use crate::config::DriverConfig;
use crate::error::{CapError, CapResult};
use crate::light::{LightController, LightType, PropToolRelay, RelayControl};
use crate::park::{ParkData, ParkStore};
use crate::protocol::{CapRequest, PropertyState};
use crate::state::{CalibratorState, CoverState, MoveState};

pub const DEFAULT_DEVICE_NAME: &str = "Arduino Cap";

/// What a move is heading for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveRequest {
    FullOpen,
    FullClose,
    /// Absolute degrees (0-180), no calibration applied
    DirectAngle(f64),
}

/// Snapshot of the driver for status reporting
#[derive(Debug, Clone)]
pub struct CapStatus {
    pub device_name: String,
    pub connected: bool,
    pub cover_state: CoverState,
    pub calibrator_state: CalibratorState,
    pub position: f64,
    pub park_state: PropertyState,
    pub light_type: LightType,
}

/// Servo driven dust cap with relay switched flat light
#[derive(Debug)]
pub struct CapDriver {
    device_name: String,
    config: DriverConfig,
    state: MoveState,
    actuator: Box<dyn ServoActuator>,
    light: LightController,
    park_store: Box<dyn ParkStore>,
    connected: bool,
    /// Between connect and the first timer tick
    initializing: bool,
    light_on: bool,
    light_available: bool,
    park_state: PropertyState,
}

impl CapDriver {
    pub fn new(
        config: DriverConfig,
        actuator: Box<dyn ServoActuator>,
        relay: Box<dyn RelayControl>,
        park_store: Box<dyn ParkStore>,
    ) -> Self {
        let light = LightController::new(relay, config.relay_device.clone());
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            config,
            state: MoveState::default(),
            actuator,
            light,
            park_store,
            connected: false,
            initializing: true,
            light_on: false,
            light_available: false,
            park_state: PropertyState::Idle,
        }
    }

    /// Build the driver with the external script and property tools named in
    /// the settings, or a simulated servo in simulation mode.
    pub fn from_config(config: DriverConfig, park_store: Box<dyn ParkStore>) -> Self {
        let timeout = config.command_timeout();
        let actuator: Box<dyn ServoActuator> = if config.simulation {
            Box::new(SimulatedServo)
        } else {
            Box::new(ScriptServo::new(config.servo_script.clone(), timeout))
        };
        let relay = PropToolRelay::new(config.getprop.clone(), config.setprop.clone(), timeout);
        Self::new(config, actuator, Box::new(relay), park_store)
    }

    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn move_state(&self) -> &MoveState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_light_on(&self) -> bool {
        self.light_on
    }

    /// Whether the light on/off control is currently offered to clients
    pub fn light_control_available(&self) -> bool {
        self.light_available
    }

    // =========================================================================
    // Connection
    // =========================================================================

    /// Check the servo script's dependencies and seed the move state from the
    /// persisted park status.
    pub async fn connect(&mut self) -> CapResult<()> {
        if self.config.simulation {
            tracing::info!("{} is online (simulated)", self.device_name);
        } else {
            let check = CommandLine::from_parts(&self.config.dependency_check)?;
            let ok = match run_command(&check, self.config.command_timeout()).await {
                Ok(output) => output.succeeded(),
                Err(e) => {
                    tracing::debug!("Dependency check failed: {}", e);
                    false
                }
            };
            if !ok {
                tracing::error!(
                    "{} is offline, did not initialize. Check failed: {}",
                    self.device_name,
                    check
                );
                return Err(CapError::MissingDependency(check.to_string()));
            }
            tracing::info!("{} is online.", self.device_name);
        }

        let parked = self.park_store.load()?.parked;
        tracing::info!(
            "Park status initialized to {}",
            if parked { "parked" } else { "unparked" }
        );

        self.state = MoveState::seeded(parked);
        self.park_state = PropertyState::Ok;
        self.light_on = false;
        self.connected = true;
        self.initializing = true;
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.connected = false;
        self.light_available = false;
        self.light_on = false;
        tracing::info!("{} is offline.", self.device_name);
    }

    /// Periodic timer entry point. The first tick after connecting sets the
    /// position to the calibrated end for the persisted park status, or for
    /// a park/unpark requested before this tick.
    pub fn tick(&mut self) {
        if !self.connected || !self.initializing {
            return;
        }

        let target = CapTarget::from_closing(self.state.is_closing);
        self.state.current_position = self.config.calibration.full_position(target);
        self.light_available = self.config.light_type.uses_relay();
        self.initializing = false;

        if self.park_state == PropertyState::Busy {
            self.complete_park();
        }
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Apply a decoded property update and return the state to report
    pub async fn handle(&mut self, request: CapRequest) -> CapResult<PropertyState> {
        match request {
            CapRequest::Park => self.park_cap().await,
            CapRequest::Unpark => self.unpark_cap().await,
            CapRequest::MoveToAngle(angle) => {
                self.move_to_angle(angle).await?;
                Ok(PropertyState::Ok)
            }
            CapRequest::Light(enable) => {
                self.require_connected()?;
                if self.enable_light(enable).await {
                    Ok(PropertyState::Ok)
                } else {
                    Ok(PropertyState::Alert)
                }
            }
            CapRequest::Brightness(value) => {
                self.light.set_brightness(value)?;
                Ok(PropertyState::Ok)
            }
            CapRequest::ServoId(id) => {
                self.config.servo_id = id;
                Ok(PropertyState::Ok)
            }
            CapRequest::LightSwitch(index) => {
                self.config.light_switch = index;
                Ok(PropertyState::Ok)
            }
            CapRequest::Travel { open, close } => {
                self.config.calibration.travel_open = open;
                self.config.calibration.travel_close = close;
                Ok(PropertyState::Ok)
            }
            CapRequest::Limits { open, close } => {
                self.config.calibration.limit_open = open;
                self.config.calibration.limit_close = close;
                Ok(PropertyState::Ok)
            }
            CapRequest::DevicePath(path) => {
                self.config.device_path = path;
                Ok(PropertyState::Ok)
            }
            CapRequest::LightType(light_type) => {
                self.set_light_type(light_type);
                Ok(PropertyState::Ok)
            }
        }
    }

    /// Close the cap. Before the first tick this only records the direction.
    pub async fn park_cap(&mut self) -> CapResult<PropertyState> {
        self.full_move(true).await
    }

    /// Open the cap. Before the first tick this only records the direction.
    pub async fn unpark_cap(&mut self) -> CapResult<PropertyState> {
        self.full_move(false).await
    }

    /// Set the servo straight to `angle`, used when calibrating travel.
    /// Never touches the park status.
    pub async fn move_to_angle(&mut self, angle: f64) -> CapResult<()> {
        self.require_connected()?;
        self.start_move(MoveRequest::DirectAngle(angle)).await
    }

    /// Switch the flat light; `false` when the relay could not be reached
    pub async fn enable_light(&mut self, enable: bool) -> bool {
        let ok = self
            .light
            .enable(self.config.light_type, self.config.light_switch, enable)
            .await;
        if ok && self.config.light_type.uses_relay() {
            self.light_on = enable;
        }
        ok
    }

    pub fn set_brightness(&self, value: u16) -> CapResult<()> {
        self.light.set_brightness(value)
    }

    fn set_light_type(&mut self, light_type: LightType) {
        self.config.light_type = light_type;
        tracing::debug!(
            "Light switch type set to {}",
            if light_type.uses_relay() { "USBRelay2 Roof." } else { "No lightsource" }
        );

        self.light_available = light_type.uses_relay() && self.connected && !self.initializing;
        if !light_type.uses_relay() {
            self.light_on = false;
        }
    }

    async fn full_move(&mut self, closing: bool) -> CapResult<PropertyState> {
        self.require_connected()?;

        self.state.is_closing = closing;
        self.park_state = PropertyState::Busy;

        if self.initializing {
            return Ok(PropertyState::Busy);
        }

        let request = if closing {
            MoveRequest::FullClose
        } else {
            MoveRequest::FullOpen
        };
        self.start_move(request).await?;
        Ok(self.park_state)
    }

    /// Run one move through the state machine: Idle -> Moving -> Idle.
    ///
    /// The actuation is awaited in place, so the state is back to idle when
    /// this returns, whether the move worked or not.
    pub async fn start_move(&mut self, request: MoveRequest) -> CapResult<()> {
        if self.state.is_moving {
            tracing::warn!(
                "Move to {:?} supersedes unfinished move to {:?}",
                request,
                self.state.pending_target
            );
        }

        let calibration = self.config.calibration;
        let (target, step) = match request {
            MoveRequest::FullOpen => (calibration.full_position(CapTarget::Open), false),
            MoveRequest::FullClose => (calibration.full_position(CapTarget::Closed), false),
            MoveRequest::DirectAngle(angle) => (angle, true),
        };
        match request {
            MoveRequest::FullOpen => self.state.is_closing = false,
            MoveRequest::FullClose => self.state.is_closing = true,
            MoveRequest::DirectAngle(_) => {}
        }

        // No need to have the light on behind a closed cap
        if request == MoveRequest::FullClose && self.light_on {
            self.enable_light(false).await;
        }

        let from = self.state.current_position;
        if step {
            tracing::info!("Setting servo to {:6.2} without interpolation", target);
        } else {
            tracing::info!(
                "{} from {:6.2}, to {:6.2}",
                if request == MoveRequest::FullClose { "Closing" } else { "Opening" },
                from,
                target
            );
        }

        self.state.begin(target, step);
        let mv = ServoMove {
            device_path: self.config.device_path.clone(),
            servo_id: self.config.servo_id,
            target,
            current: if step { target } else { from },
        };
        let result = self.actuator.move_servo(&mv).await;
        self.state.finish(result.is_ok());

        if let Err(e) = result {
            tracing::error!("Moving servo failed: {}", e);
            if !step {
                self.park_state = PropertyState::Alert;
            }
            return Err(e);
        }

        if !step {
            self.complete_park();
        }
        Ok(())
    }

    fn complete_park(&mut self) {
        let parked = self.state.is_closing;
        if let Err(e) = self.park_store.save(ParkData { parked }) {
            tracing::error!("Failed to persist park status: {}", e);
        }
        self.park_state = PropertyState::Ok;
    }

    fn require_connected(&self) -> CapResult<()> {
        if self.connected {
            Ok(())
        } else {
            Err(CapError::NotConnected)
        }
    }

    // =========================================================================
    // Status
    // =========================================================================

    pub fn cover_state(&self) -> CoverState {
        if !self.connected {
            return CoverState::Unknown;
        }
        if self.state.is_moving {
            return CoverState::Moving;
        }
        match self.park_state {
            PropertyState::Ok if self.state.is_closing => CoverState::Closed,
            PropertyState::Ok => CoverState::Open,
            PropertyState::Busy => CoverState::Moving,
            PropertyState::Idle | PropertyState::Alert => CoverState::Unknown,
        }
    }

    pub fn calibrator_state(&self) -> CalibratorState {
        if !self.config.light_type.uses_relay() {
            CalibratorState::NotPresent
        } else if self.light_on {
            CalibratorState::Ready
        } else {
            CalibratorState::Off
        }
    }

    pub fn status(&self) -> CapStatus {
        CapStatus {
            device_name: self.device_name.clone(),
            connected: self.connected,
            cover_state: self.cover_state(),
            calibrator_state: self.calibrator_state(),
            position: self.state.current_position,
            park_state: self.park_state,
            light_type: self.config.light_type,
        }
    }
}
