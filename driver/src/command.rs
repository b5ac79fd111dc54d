//! External command execution
//!
//! Every servo move and relay switch goes through a subprocess. Commands are
//! attempted exactly once and awaited to completion; a timeout applies only
//! when one is configured.

use crate::error::{CapError, CapResult};
use std::fmt;
use std::time::Duration;

/// A program plus its arguments, built without a shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Build from a `[program, args...]` list as stored in the settings
    pub fn from_parts(parts: &[String]) -> CapResult<Self> {
        let (program, args) = parts
            .split_first()
            .ok_or_else(|| CapError::Config("empty command".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_ok: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
}

impl CommandOutput {
    /// Non-zero exit, or output starting with '1', counts as failure
    pub fn succeeded(&self) -> bool {
        self.exit_ok && !self.stdout.starts_with('1')
    }

    pub fn failure_reason(&self) -> String {
        match self.exit_code {
            Some(code) if code != 0 => format!("exit status {}", code),
            None if !self.exit_ok => "terminated by signal".to_string(),
            _ => format!("reported failure: {}", self.stdout.trim()),
        }
    }
}

/// Run a command and capture its stdout.
///
/// Spawn errors surface as [`CapError::Io`]; callers treat them the same as
/// a failed command.
pub async fn run_command(cmd: &CommandLine, timeout: Option<Duration>) -> CapResult<CommandOutput> {
    tracing::debug!("Running command: {}", cmd);

    let mut process = tokio::process::Command::new(&cmd.program);
    process.args(&cmd.args).kill_on_drop(true);

    let output = match timeout {
        Some(duration) => tokio::time::timeout(duration, process.output())
            .await
            .map_err(|_| CapError::CommandTimeout {
                command: cmd.to_string(),
                duration,
            })??,
        None => process.output().await?,
    };

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    tracing::debug!("Command output: {}", stdout.trim_end());

    Ok(CommandOutput {
        exit_ok: output.status.success(),
        exit_code: output.status.code(),
        stdout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_quotes_spaced_args() {
        let cmd = CommandLine::new("indi_getprop").arg("USBRelay2 Roof.POWER_SWITCH_0.POWER_ON_SWITCH");
        assert_eq!(
            cmd.to_string(),
            "indi_getprop \"USBRelay2 Roof.POWER_SWITCH_0.POWER_ON_SWITCH\""
        );
    }

    #[test]
    fn test_from_parts() {
        let parts = vec!["python3".to_string(), "-c".to_string(), "import pyfirmata".to_string()];
        let cmd = CommandLine::from_parts(&parts).unwrap();
        assert_eq!(cmd.program, "python3");
        assert_eq!(cmd.args, vec!["-c", "import pyfirmata"]);

        assert!(CommandLine::from_parts(&[]).is_err());
    }

    #[test]
    fn test_output_starting_with_one_is_failure() {
        let out = CommandOutput {
            exit_ok: true,
            exit_code: Some(0),
            stdout: "1\n".to_string(),
        };
        assert!(!out.succeeded());
        assert!(out.failure_reason().contains("reported failure"));

        let out = CommandOutput {
            exit_ok: true,
            exit_code: Some(0),
            stdout: "0\n".to_string(),
        };
        assert!(out.succeeded());
    }

    #[tokio::test]
    async fn test_run_true_and_false() {
        let ok = run_command(&CommandLine::new("true"), None).await.unwrap();
        assert!(ok.succeeded());

        let failed = run_command(&CommandLine::new("false"), None).await.unwrap();
        assert!(!failed.succeeded());
        assert_eq!(failed.failure_reason(), "exit status 1");
    }

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let out = run_command(&CommandLine::new("echo").arg("hello"), None).await.unwrap();
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let result = run_command(&CommandLine::new("/nonexistent/servocap-test-binary"), None).await;
        assert!(matches!(result, Err(CapError::Io(_))));
    }

    #[tokio::test]
    async fn test_timeout() {
        let cmd = CommandLine::new("sleep").arg("5");
        let result = run_command(&cmd, Some(Duration::from_millis(50))).await;
        assert!(matches!(result, Err(CapError::CommandTimeout { .. })));
    }
}
