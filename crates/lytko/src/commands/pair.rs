//! Voice assistant pairing.

use lytko_core::{DeviceCoordinator, WsConnector};
use owo_colors::OwoColorize;

use crate::cli::{GlobalOpts, PairArgs};
use crate::commands::Loaded;
use crate::error::CliError;

pub async fn handle(args: PairArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let loaded = Loaded::from_global(global)?;
    let (name, profile) = loaded.profile(global)?;
    let defaults = &loaded.config.defaults;

    let Some(login) = args.login.or_else(|| profile.alice_login.clone()) else {
        return Err(CliError::NoCredentials { profile: name });
    };
    let password = lytko_config::resolve_alice_password(profile, &name)?;

    let config = lytko_config::profile_to_coordinator_config(profile, &name, defaults)?;
    let coordinator = DeviceCoordinator::new(config, WsConnector::new(defaults.reconnect_config()))?;
    coordinator.initialize(None, None).await?;

    let paired = coordinator.pair_voice_assistant(&login, &password).await;
    coordinator.stop().await;
    paired?;

    if !global.quiet {
        eprintln!(
            "{} Pairing request for '{login}' sent to '{name}'",
            "✓".green()
        );
    }
    Ok(())
}
