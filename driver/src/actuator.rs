//! Servo actuation
//!
//! The servo is driven by a helper script taking
//! `<device path> <servo id> <target degrees> <current degrees>`. When the
//! current and target degrees are equal the script sets the servo directly,
//! otherwise it interpolates from current to target.

use crate::command::{run_command, CommandLine};
use crate::error::{CapError, CapResult};
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

/// Parameters of a single servo move
#[derive(Debug, Clone, PartialEq)]
pub struct ServoMove {
    pub device_path: String,
    pub servo_id: u8,
    pub target: f64,
    pub current: f64,
}

impl ServoMove {
    /// Script arguments; degrees are truncated to whole numbers
    pub fn args(&self) -> [String; 4] {
        [
            self.device_path.clone(),
            self.servo_id.to_string(),
            (self.target as i64).to_string(),
            (self.current as i64).to_string(),
        ]
    }
}

/// Anything that can physically move the servo
#[async_trait]
pub trait ServoActuator: Send + Sync + Debug {
    async fn move_servo(&self, mv: &ServoMove) -> CapResult<()>;
}

/// Runs the external servo script
#[derive(Debug, Clone)]
pub struct ScriptServo {
    script: String,
    timeout: Option<Duration>,
}

impl ScriptServo {
    pub fn new(script: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            script: script.into(),
            timeout,
        }
    }

    fn command_line(&self, mv: &ServoMove) -> CommandLine {
        mv.args()
            .into_iter()
            .fold(CommandLine::new(&self.script), |cmd, arg| cmd.arg(arg))
    }
}

#[async_trait]
impl ServoActuator for ScriptServo {
    async fn move_servo(&self, mv: &ServoMove) -> CapResult<()> {
        let cmd = self.command_line(mv);

        let output = match run_command(&cmd, self.timeout).await {
            Ok(output) => output,
            Err(CapError::Io(e)) => {
                return Err(CapError::ActuationFailed {
                    command: cmd.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(e) => return Err(e),
        };

        if !output.succeeded() {
            return Err(CapError::ActuationFailed {
                command: cmd.to_string(),
                reason: output.failure_reason(),
            });
        }

        tracing::debug!("Servo moved with command: {}", cmd);
        Ok(())
    }
}

/// Stand-in used in simulation mode; every move succeeds
#[derive(Debug, Clone, Default)]
pub struct SimulatedServo;

#[async_trait]
impl ServoActuator for SimulatedServo {
    async fn move_servo(&self, mv: &ServoMove) -> CapResult<()> {
        tracing::debug!(
            "Simulated servo {} move to {:6.2} from {:6.2}",
            mv.servo_id,
            mv.target,
            mv.current
        );
        Ok(())
    }
}
