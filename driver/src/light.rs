//! Flat light control
//!
//! The flat light hangs off a relay owned by another device. The relay is
//! reached through the `indi_getprop` / `indi_setprop` tools, addressing the
//! power switch property by index.

use crate::command::{run_command, CommandLine};
use crate::error::{CapError, CapResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;

/// Light source selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightType {
    /// Relay-switched light on a USBRelay2 device
    UsbRelay2,
    /// No light source attached
    None,
}

impl LightType {
    pub fn uses_relay(&self) -> bool {
        matches!(self, LightType::UsbRelay2)
    }
}

/// Access to the relay's switch properties
#[async_trait]
pub trait RelayControl: Send + Sync + Debug {
    /// Check that the property exists on the relay device
    async fn lookup(&self, property: &str) -> CapResult<()>;

    /// Apply a `property=value` assignment
    async fn set(&self, assignment: &str) -> CapResult<()>;
}

/// Relay access via the command line property tools
#[derive(Debug, Clone)]
pub struct PropToolRelay {
    getprop: String,
    setprop: String,
    timeout: Option<Duration>,
}

impl PropToolRelay {
    pub fn new(getprop: impl Into<String>, setprop: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            getprop: getprop.into(),
            setprop: setprop.into(),
            timeout,
        }
    }
}

#[async_trait]
impl RelayControl for PropToolRelay {
    async fn lookup(&self, property: &str) -> CapResult<()> {
        let cmd = CommandLine::new(&self.getprop).arg(property);
        let unavailable = || CapError::RelayUnavailable {
            property: property.to_string(),
        };

        // The lookup must print the property to count as found
        match run_command(&cmd, self.timeout).await {
            Ok(output) if output.succeeded() && !output.stdout.trim().is_empty() => Ok(()),
            Ok(_) | Err(CapError::Io(_)) => {
                tracing::debug!("Relay lookup failed. Attempted cmd was: {}", cmd);
                Err(unavailable())
            }
            Err(e) => Err(e),
        }
    }

    async fn set(&self, assignment: &str) -> CapResult<()> {
        // indi_setprop prints nothing on success or failure, so its result is not inspected
        let cmd = CommandLine::new(&self.setprop).arg(assignment);
        run_command(&cmd, self.timeout).await.map(|_| ())
    }
}

/// Switches the flat light on and off
#[derive(Debug)]
pub struct LightController {
    relay: Box<dyn RelayControl>,
    relay_device: String,
}

impl LightController {
    pub fn new(relay: Box<dyn RelayControl>, relay_device: impl Into<String>) -> Self {
        Self {
            relay,
            relay_device: relay_device.into(),
        }
    }

    fn switch_property(&self, switch_index: u8, element: &str) -> String {
        format!("{}.POWER_SWITCH_{}.{}", self.relay_device, switch_index, element)
    }

    /// Turn the light on or off. Returns `false` when the relay could not be
    /// reached; with no light source configured this is a no-op.
    pub async fn enable(&self, light_type: LightType, switch_index: u8, enable: bool) -> bool {
        if !light_type.uses_relay() {
            return true;
        }

        let action = if enable { "Enable" } else { "Disable" };
        let check = self.switch_property(switch_index, "POWER_ON_SWITCH");

        if let Err(e) = self.relay.lookup(&check).await {
            tracing::error!(
                "{} flat light failed. Is {} connected, and power switch {} defined? ({})",
                action,
                self.relay_device,
                switch_index,
                e
            );
            return false;
        }

        let element = if enable { "POWER_ON_SWITCH" } else { "POWER_OFF_SWITCH" };
        let assignment = format!("{}=On", self.switch_property(switch_index, element));
        if let Err(e) = self.relay.set(&assignment).await {
            tracing::debug!("Relay set command returned: {}", e);
        }

        tracing::info!("Light source {}.", if enable { "enabled" } else { "disabled" });
        true
    }

    /// Brightness cannot be controlled through a relay
    pub fn set_brightness(&self, _value: u16) -> CapResult<()> {
        Err(CapError::NotSupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct RecordingRelay {
        calls: Arc<Mutex<Vec<String>>>,
        missing: bool,
    }

    #[async_trait]
    impl RelayControl for RecordingRelay {
        async fn lookup(&self, property: &str) -> CapResult<()> {
            self.calls.lock().unwrap().push(format!("get {}", property));
            if self.missing {
                Err(CapError::RelayUnavailable {
                    property: property.to_string(),
                })
            } else {
                Ok(())
            }
        }

        async fn set(&self, assignment: &str) -> CapResult<()> {
            self.calls.lock().unwrap().push(format!("set {}", assignment));
            Ok(())
        }
    }

    fn controller(missing: bool) -> (LightController, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let relay = RecordingRelay {
            calls: calls.clone(),
            missing,
        };
        (LightController::new(Box::new(relay), "USBRelay2 Roof"), calls)
    }

    #[tokio::test]
    async fn test_enable_checks_then_sets() {
        let (light, calls) = controller(false);
        assert!(light.enable(LightType::UsbRelay2, 2, true).await);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                "get USBRelay2 Roof.POWER_SWITCH_2.POWER_ON_SWITCH".to_string(),
                "set USBRelay2 Roof.POWER_SWITCH_2.POWER_ON_SWITCH=On".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_disable_uses_off_switch() {
        let (light, calls) = controller(false);
        assert!(light.enable(LightType::UsbRelay2, 0, false).await);
        assert_eq!(
            calls.lock().unwrap()[1],
            "set USBRelay2 Roof.POWER_SWITCH_0.POWER_OFF_SWITCH=On"
        );
    }

    #[tokio::test]
    async fn test_missing_relay_returns_false_without_set() {
        let (light, calls) = controller(true);
        assert!(!light.enable(LightType::UsbRelay2, 1, true).await);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_light_type_is_noop() {
        let (light, calls) = controller(true);
        assert!(light.enable(LightType::None, 1, true).await);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_brightness_unsupported() {
        let (light, _) = controller(false);
        assert!(matches!(light.set_brightness(128), Err(CapError::NotSupported)));
    }

    #[tokio::test]
    async fn test_prop_tool_lookup_requires_output() {
        let relay = PropToolRelay::new("true", "true", None);
        assert!(matches!(
            relay.lookup("Relay.POWER_SWITCH_0.POWER_ON_SWITCH").await,
            Err(CapError::RelayUnavailable { .. })
        ));

        let relay = PropToolRelay::new("echo", "true", None);
        assert!(relay.lookup("Relay.POWER_SWITCH_0.POWER_ON_SWITCH").await.is_ok());
    }

    #[tokio::test]
    async fn test_prop_tool_missing_binary_is_unavailable() {
        let relay = PropToolRelay::new("/nonexistent/indi_getprop", "true", None);
        assert!(matches!(
            relay.lookup("x").await,
            Err(CapError::RelayUnavailable { .. })
        ));
    }
}
