// ── Event model ──
//
// Everything that crosses the device boundary, in either direction.
// Inbound events come out of the codec; outbound events are built by
// the coordinator and its automation loops.

use serde::Serialize;

/// A typed fact or command exchanged with the thermostat.
///
/// Temperatures are degrees Celsius, passed through from the wire
/// without conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Temperature measured by the device's own sensor.
    CurrentTemperature { temperature: f64 },

    /// Setpoint the device regulates towards.
    TargetTemperature { temperature: f64 },

    /// Heating regulation enabled / disabled.
    Heating { on: bool },

    /// Physical button lock.
    ChildLock { on: bool },

    /// Setpoint bounds and hysteresis step reported by the device.
    ThermostatSettings { min: f64, max: f64, step: f64 },

    /// Floor thermistor nominal resistance, e.g. `"10_kOm"`.
    ThermistorSettings { resistance: String },

    /// Voice assistant account pairing.
    AliceCredentials {
        login: String,
        #[serde(skip_serializing)]
        password: String,
    },
}

impl Event {
    /// Stable, value-free name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CurrentTemperature { .. } => "current_temperature",
            Self::TargetTemperature { .. } => "target_temperature",
            Self::Heating { .. } => "heating",
            Self::ChildLock { .. } => "child_lock",
            Self::ThermostatSettings { .. } => "thermostat_settings",
            Self::ThermistorSettings { .. } => "thermistor_settings",
            Self::AliceCredentials { .. } => "alice_credentials",
        }
    }

    pub fn target(temperature: f64) -> Self {
        Self::TargetTemperature { temperature }
    }

    pub fn heating(on: bool) -> Self {
        Self::Heating { on }
    }
}
