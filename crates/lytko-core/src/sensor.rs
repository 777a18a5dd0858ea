// ── External temperature sensor ──

use tokio::sync::watch;

/// A subscribed external sensor: its id and a feed of raw state strings.
#[derive(Debug, Clone)]
pub struct ExternalSensor {
    pub id: String,
    pub readings: watch::Receiver<String>,
}

/// Interpretation of one raw sensor state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorReading {
    Temperature(f64),
    /// `unavailable` / `unknown`, or an empty state.
    Unavailable,
    Invalid,
}

pub fn parse_sensor_reading(raw: &str) -> SensorReading {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("unavailable") || raw.eq_ignore_ascii_case("unknown") {
        return SensorReading::Unavailable;
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => SensorReading::Temperature(value),
        _ => SensorReading::Invalid,
    }
}
