//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use lytko_config::ConfigError;
use lytko_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the thermostat at {address}: {reason}")]
    #[diagnostic(
        code(lytko::connection_failed),
        help(
            "Check that the thermostat is powered and on the same network.\n\
             Address: {address}\n\
             If it moved, update `address` in the profile or run: lytko run"
        )
    )]
    ConnectionFailed { address: String, reason: String },

    #[error("Voice assistant pairing failed: {reason}")]
    #[diagnostic(
        code(lytko::pairing_failed),
        help("Check the login and password, then retry: lytko pair-alice --login <login>")
    )]
    PairingFailed { reason: String },

    // ── Credentials ──────────────────────────────────────────────────
    #[error("No voice assistant credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(lytko::no_credentials),
        help(
            "Set `alice_login` in the profile and store the password with:\n\
             lytko config set-password --profile {profile}"
        )
    )]
    NoCredentials { profile: String },

    // ── Device state ─────────────────────────────────────────────────
    #[error("Mode '{mode}' is not available")]
    #[diagnostic(
        code(lytko::mode_unavailable),
        help("Auto mode needs an `external_sensor` in the profile.")
    )]
    ModeUnavailable { mode: String },

    #[error("A schedule named '{name}' is defined twice")]
    #[diagnostic(code(lytko::conflict), help("Schedule names must be unique per profile."))]
    Conflict { name: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(lytko::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(lytko::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Config file: {path}"
        )
    )]
    ProfileNotFound {
        name: String,
        available: String,
        path: String,
    },

    #[error(transparent)]
    #[diagnostic(code(lytko::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(lytko::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::PairingFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::ModeUnavailable { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { address, reason } => {
                CliError::ConnectionFailed { address, reason }
            }
            CoreError::VoiceAssistantPairing { reason } => CliError::PairingFailed { reason },
            CoreError::ModeUnavailable { mode } => CliError::ModeUnavailable {
                mode: mode.to_string(),
            },
            CoreError::ScheduleExists { name } => CliError::Conflict { name },
            CoreError::InvalidOption { option, expected } => CliError::Validation {
                field: "option".into(),
                reason: format!("'{option}' is not one of {expected}"),
            },
            CoreError::InvalidTime { value } => CliError::Validation {
                field: "time".into(),
                reason: format!("'{value}' is not HH:MM"),
            },
            other @ (CoreError::OutOfRange { .. } | CoreError::Control(_)) => {
                CliError::Validation {
                    field: "value".into(),
                    reason: other.to_string(),
                }
            }
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: "(run: lytko config profiles)".into(),
                path: lytko_config::config_path().display().to_string(),
            },
            other => CliError::Config(Box::new(other)),
        }
    }
}
