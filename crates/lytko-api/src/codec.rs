// ── Wire codec ──
//
// Pure mapping between JSON frames and [`Event`]s. Inbound and outbound
// shapes are deliberately asymmetric: the device reports a full status
// snapshot and accepts one narrow setter per command.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::Event;

// ── Inbound ──────────────────────────────────────────────────────────

/// Raw inbound envelope, discriminated by `action`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action")]
enum Inbound {
    #[serde(rename = "thermostat")]
    Thermostat(ThermostatStatus),

    #[serde(other)]
    Unknown,
}

/// Periodic status report pushed by the thermostat.
#[derive(Debug, Deserialize)]
struct ThermostatStatus {
    t_target: f64,
    heat: String,
    t_curr: f64,
    target_max: f64,
    target_min: f64,
    hysteresis: f64,
}

/// Expand one decoded wire message into events.
///
/// A thermostat status report yields exactly four events, always in the
/// order target, heating, current, settings. Anything else (unknown
/// action, missing or mistyped fields) yields nothing.
pub fn decode(raw: &Value) -> Vec<Event> {
    match Inbound::deserialize(raw) {
        Ok(Inbound::Thermostat(status)) => vec![
            Event::TargetTemperature {
                temperature: status.t_target,
            },
            Event::Heating {
                on: status.heat == "heat",
            },
            Event::CurrentTemperature {
                temperature: status.t_curr,
            },
            Event::ThermostatSettings {
                min: status.target_min,
                max: status.target_max,
                step: status.hysteresis,
            },
        ],
        Ok(Inbound::Unknown) => {
            tracing::trace!(action = ?raw.get("action"), "ignoring unrecognized message");
            Vec::new()
        }
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed message");
            Vec::new()
        }
    }
}

/// Parse a text frame and decode it. Invalid JSON yields nothing.
pub fn decode_text(text: &str) -> Vec<Event> {
    match serde_json::from_str::<Value>(text) {
        Ok(raw) => decode(&raw),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring non-JSON frame");
            Vec::new()
        }
    }
}

// ── Outbound ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(tag = "action")]
enum Outbound<'a> {
    #[serde(rename = "thermostat.set.target")]
    SetTarget { t_target: f64 },

    #[serde(rename = "thermostat.set.mode")]
    SetMode { heat: &'static str },

    #[serde(rename = "thermostat.set.sensor")]
    SetSensor { sensor: &'a str },

    #[serde(rename = "alice.login")]
    AliceLogin {
        login: &'a str,
        #[serde(rename = "pass")]
        password: &'a str,
    },
}

/// Encode an event into its outbound wire shape.
///
/// Returns `None` for events the device does not accept (they are
/// reports, not commands).
pub fn encode(event: &Event) -> Option<Value> {
    let outbound = match event {
        Event::TargetTemperature { temperature } => Outbound::SetTarget {
            t_target: *temperature,
        },
        Event::Heating { on } => Outbound::SetMode {
            heat: if *on { "on" } else { "off" },
        },
        Event::ThermistorSettings { resistance } => Outbound::SetSensor { sensor: resistance },
        Event::AliceCredentials { login, password } => Outbound::AliceLogin { login, password },
        Event::CurrentTemperature { .. }
        | Event::ChildLock { .. }
        | Event::ThermostatSettings { .. } => return None,
    };

    match serde_json::to_value(outbound) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, kind = event.kind(), "failed to encode event");
            None
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
