//! Shared configuration for the lytko binary.
//!
//! TOML profiles (one per thermostat), credential resolution (env +
//! keyring + plaintext), and translation into `lytko_core` runtime types.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Weekday};
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use lytko_api::ReconnectConfig;
use lytko_core::{
    CoordinatorConfig, DeviceIdentity, HolidaySet, HvacMode, InitialState, Schedule,
    ScheduleContext, SystemClock,
};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Dates on which holiday-exempt schedules do not run.
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named thermostat profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            holidays: Vec::new(),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Pick a profile by name, falling back to `default_profile`.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into());

        match self.profiles.get(&name) {
            Some(profile) => Ok((name, profile)),
            None => Err(ConfigError::UnknownProfile { name }),
        }
    }

    pub fn holiday_set(&self) -> HolidaySet {
        self.holidays.iter().copied().collect()
    }

    /// Schedule context backed by the system clock.
    pub fn schedule_context(&self) -> ScheduleContext {
        ScheduleContext {
            holidays: Arc::new(self.holiday_set()),
            clock: Arc::new(SystemClock),
            tick: Duration::from_secs(self.defaults.schedule_tick_secs.max(1)),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_rediscovery_window")]
    pub rediscovery_window_secs: u64,

    /// How often the `run` command re-arms rediscovery.
    #[serde(default = "default_rediscovery_interval")]
    pub rediscovery_interval_secs: u64,

    #[serde(default = "default_auto_mode_interval")]
    pub auto_mode_interval_secs: u64,

    #[serde(default = "default_schedule_tick")]
    pub schedule_tick_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: default_reconnect_delay(),
            connect_timeout_secs: default_connect_timeout(),
            rediscovery_window_secs: default_rediscovery_window(),
            rediscovery_interval_secs: default_rediscovery_interval(),
            auto_mode_interval_secs: default_auto_mode_interval(),
            schedule_tick_secs: default_schedule_tick(),
        }
    }
}

impl Defaults {
    pub fn reconnect_config(&self) -> ReconnectConfig {
        ReconnectConfig {
            delay: Duration::from_secs(self.reconnect_delay_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs.max(1)),
        }
    }
}

fn default_reconnect_delay() -> u64 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_rediscovery_window() -> u64 {
    10
}
fn default_rediscovery_interval() -> u64 {
    300
}
fn default_auto_mode_interval() -> u64 {
    1
}
fn default_schedule_tick() -> u64 {
    60
}

/// A named thermostat profile.
#[derive(Debug, Deserialize, Serialize)]
pub struct Profile {
    /// Stable device id (also the serial shown by the device).
    pub device_id: String,

    /// Hardware address, matched against discovery announcements.
    pub mac: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Display name. Defaults to the profile name.
    pub name: Option<String>,

    /// Last known network address (host or host:port).
    pub address: String,

    #[serde(default = "default_base_temperature")]
    pub base_temperature: f64,

    /// Floor thermistor rating in kΩ, e.g. "10" or "6.8".
    #[serde(default = "default_thermistor")]
    pub thermistor: String,

    /// Voice assistant account login.
    pub alice_login: Option<String>,

    /// Voice assistant password (plaintext -- prefer keyring or env var).
    pub alice_password: Option<String>,

    /// Environment variable name containing the voice assistant password.
    pub alice_password_env: Option<String>,

    pub external_sensor: Option<SensorSource>,

    /// Mode applied once the daemon is running: "off", "heat" or "auto".
    pub mode: Option<HvacMode>,

    /// Target temperature applied at start-up.
    pub target: Option<f64>,

    pub child_lock: Option<bool>,

    #[serde(default)]
    pub schedules: Vec<ScheduleEntry>,
}

fn default_model() -> String {
    "TW1".into()
}
fn default_base_temperature() -> f64 {
    lytko_core::control::DEFAULT_BASE_TEMPERATURE
}
fn default_thermistor() -> String {
    lytko_core::control::DEFAULT_THERMISTOR.into()
}

/// External temperature sensor read from a file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SensorSource {
    pub id: String,
    pub path: PathBuf,
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
}

fn default_poll_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleEntry {
    pub name: String,
    pub temperature: f64,
    /// `HH:MM`
    pub start: String,
    /// `HH:MM`
    pub end: String,
    pub days: Vec<Weekday>,
    /// Run on holiday dates too.
    #[serde(default)]
    pub holidays: bool,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "lytko", "lytko").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("lytko");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from an explicit file, layered over defaults and under
/// `LYTKO_`-prefixed environment variables (`__` separates sections).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("LYTKO_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the voice assistant password from the credential chain.
pub fn resolve_alice_password(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's alice_password_env → env var lookup
    if let Some(ref env_name) = profile.alice_password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new("lytko", &format!("{profile_name}/alice-password")) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref password) = profile.alice_password {
        return Ok(SecretString::from(password.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Login and password for voice assistant pairing, if a login is set.
pub fn resolve_alice_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<Option<(String, SecretString)>, ConfigError> {
    let Some(ref login) = profile.alice_login else {
        return Ok(None);
    };
    let password = resolve_alice_password(profile, profile_name)?;
    Ok(Some((login.clone(), password)))
}

// ── Translation into core types ─────────────────────────────────────

/// Build a `CoordinatorConfig` from a profile.
pub fn profile_to_coordinator_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<CoordinatorConfig, ConfigError> {
    if profile.address.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "address".into(),
            reason: format!("profile '{profile_name}' has no device address"),
        });
    }
    if profile.mac.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "mac".into(),
            reason: format!("profile '{profile_name}' has no hardware address"),
        });
    }

    let identity = DeviceIdentity {
        device_id: profile.device_id.clone(),
        mac: profile.mac.trim().to_owned(),
        model: profile.model.clone(),
        name: profile.name.clone().unwrap_or_else(|| profile_name.to_owned()),
    };

    let mut config = CoordinatorConfig::new(identity, profile.address.trim());
    config.base_temperature = profile.base_temperature;
    config.thermistor.clone_from(&profile.thermistor);
    config.auto_mode_interval = Duration::from_secs(defaults.auto_mode_interval_secs.max(1));
    config.rediscovery_window = Duration::from_secs(defaults.rediscovery_window_secs);
    Ok(config)
}

/// Start-up settings the daemon applies after connecting.
pub fn profile_initial_state(profile: &Profile) -> InitialState {
    InitialState {
        mode: profile.mode,
        target: profile.target,
        child_lock: profile.child_lock,
    }
}

/// Parse every schedule of a profile.
pub fn profile_schedules(profile: &Profile) -> Result<Vec<Schedule>, ConfigError> {
    profile
        .schedules
        .iter()
        .map(|entry| {
            Schedule::new(
                entry.name.clone(),
                entry.temperature,
                &entry.start,
                &entry.end,
                entry.days.iter().copied(),
                entry.holidays,
            )
            .map_err(|e| ConfigError::Validation {
                field: format!("schedules.{}", entry.name),
                reason: e.to_string(),
            })
        })
        .collect()
}
