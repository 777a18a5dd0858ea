// ── Runtime coordinator configuration ──
//
// Describes *which* device to talk to and how to tune the automation
// loops. Never touches disk: the config crate builds one of these per
// profile and hands it in.

use std::time::Duration;

use crate::control::{DEFAULT_BASE_TEMPERATURE, DEFAULT_THERMISTOR};
use crate::coordinator::HvacMode;

/// Stable identity of one thermostat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub device_id: String,
    /// Hardware address announced over discovery; compared case-insensitively.
    pub mac: String,
    pub model: String,
    pub name: String,
}

impl DeviceIdentity {
    pub fn matches_hardware_id(&self, hardware_id: &str) -> bool {
        self.mac.eq_ignore_ascii_case(hardware_id.trim())
    }
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub identity: DeviceIdentity,
    /// Last known network address (host or host:port).
    pub address: String,
    pub base_temperature: f64,
    pub thermistor: String,
    /// Tick of the hysteresis loop while in `auto`.
    pub auto_mode_interval: Duration,
    /// How long one discovery watch listens for announcements.
    pub rediscovery_window: Duration,
}

impl CoordinatorConfig {
    pub fn new(identity: DeviceIdentity, address: impl Into<String>) -> Self {
        Self {
            identity,
            address: address.into(),
            base_temperature: DEFAULT_BASE_TEMPERATURE,
            thermistor: DEFAULT_THERMISTOR.to_owned(),
            auto_mode_interval: Duration::from_secs(1),
            rediscovery_window: Duration::from_secs(10),
        }
    }
}

/// Settings pushed to a device once its coordinator is running.
/// `None` leaves whatever the device reports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitialState {
    pub mode: Option<HvacMode>,
    pub target: Option<f64>,
    pub child_lock: Option<bool>,
}
