// ── Logical controls ──
//
// Host-facing state mirrored from the device. Each control owns a
// `watch` channel: setters update the presented state and notify
// subscribers, nothing here talks to the device.

mod base_temperature;
mod child_lock;
mod climate;
mod select;

use thiserror::Error;

pub use base_temperature::{BaseTemperatureControl, BaseTemperatureState, DEFAULT_BASE_TEMPERATURE};
pub use child_lock::ChildLockControl;
pub use climate::{ClimateControl, ClimateState};
pub use select::{
    DEFAULT_THERMISTOR, ExternalSensorSelect, ResistanceSelect, THERMISTOR_OPTIONS,
};

/// Rejected control update.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },

    #[error("Invalid bounds: min {min}, max {max}, step {step}")]
    InvalidBounds { min: f64, max: f64, step: f64 },

    #[error("Value {value} is outside [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },
}

fn finite(field: &'static str, value: f64) -> Result<f64, ControlError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ControlError::NonFinite { field })
    }
}

fn check_bounds(min: f64, max: f64, step: f64) -> Result<(), ControlError> {
    let valid = min.is_finite() && max.is_finite() && step.is_finite() && min <= max && step >= 0.0;
    if valid {
        Ok(())
    } else {
        Err(ControlError::InvalidBounds { min, max, step })
    }
}

/// Bit-exact float equality, used to suppress no-op notifications.
fn same(a: f64, b: f64) -> bool {
    a.to_bits() == b.to_bits()
}

fn same_opt(a: Option<f64>, b: Option<f64>) -> bool {
    a.map(f64::to_bits) == b.map(f64::to_bits)
}
