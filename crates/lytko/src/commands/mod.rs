//! Command handlers and the helpers they share.

pub mod config_cmd;
pub mod pair;
pub mod run;
pub mod send;
pub mod watch;

use std::path::PathBuf;

use lytko_api::{DeviceClient, EventHandler, device_url};
use lytko_config::{Config, Profile};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Config loading ───────────────────────────────────────────────────

/// Loaded configuration plus the file it came from.
pub struct Loaded {
    pub config: Config,
    pub path: PathBuf,
}

impl Loaded {
    pub fn from_global(global: &GlobalOpts) -> Result<Self, CliError> {
        let path = global
            .config
            .clone()
            .unwrap_or_else(lytko_config::config_path);
        let config = lytko_config::load_config_from(&path)?;
        Ok(Self { config, path })
    }

    /// Resolve `--profile` (or the default profile) with a helpful error.
    pub fn profile(&self, global: &GlobalOpts) -> Result<(String, &Profile), CliError> {
        self.config
            .profile(global.profile.as_deref())
            .map_err(|e| match e {
                lytko_config::ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                    name,
                    available: self.available_profiles(),
                    path: self.path.display().to_string(),
                },
                other => other.into(),
            })
    }

    pub fn available_profiles(&self) -> String {
        let mut names: Vec<_> = self.config.profiles.keys().cloned().collect();
        if names.is_empty() {
            return "(none)".into();
        }
        names.sort();
        names.join(", ")
    }
}

// ── One-shot device links ────────────────────────────────────────────

/// Build a client for `profile` without connecting.
pub fn device_client(
    profile: &Profile,
    config: &Config,
    handler: EventHandler,
) -> Result<DeviceClient, CliError> {
    let url = device_url(profile.address.trim()).map_err(|e| CliError::Validation {
        field: "address".into(),
        reason: e.to_string(),
    })?;
    Ok(DeviceClient::new(
        url,
        handler,
        config.defaults.reconnect_config(),
    ))
}

/// Connect once; on failure close the client so nothing keeps retrying.
pub async fn connect_or_fail(client: &DeviceClient, address: &str) -> Result<(), CliError> {
    if client.connect().await {
        return Ok(());
    }
    client.close().await;
    Err(CliError::ConnectionFailed {
        address: address.to_owned(),
        reason: "handshake did not complete".into(),
    })
}
