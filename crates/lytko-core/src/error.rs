// ── Core error types ──
//
// Named failures surfaced to the host. Transport faults are absorbed by
// the connection client and never appear here; the `From<ControlError>`
// impl lifts control validation failures into domain variants.

use thiserror::Error;

use crate::control::ControlError;
use crate::coordinator::HvacMode;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot open device link to {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("Could not pair the device with the voice assistant: {reason}")]
    VoiceAssistantPairing { reason: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Mode '{mode}' is not available (no external sensor configured)")]
    ModeUnavailable { mode: HvacMode },

    #[error("Invalid option '{option}' (expected one of: {expected})")]
    InvalidOption { option: String, expected: String },

    #[error("Value {value} is outside the allowed range [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },

    #[error("Invalid time '{value}' (expected HH:MM)")]
    InvalidTime { value: String },

    #[error("A schedule named '{name}' is already attached")]
    ScheduleExists { name: String },

    // ── Control state errors ─────────────────────────────────────────
    #[error(transparent)]
    Control(ControlError),
}

// ── Conversion from control errors ───────────────────────────────────

impl From<ControlError> for CoreError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::OutOfRange { value, min, max } => Self::OutOfRange { value, min, max },
            other => Self::Control(other),
        }
    }
}
