//! One-shot device commands.

use std::sync::Arc;

use lytko_api::Event;
use lytko_core::control::ResistanceSelect;
use owo_colors::OwoColorize;

use crate::cli::{GlobalOpts, SendArgs, SendCommand, Switch};
use crate::commands::{Loaded, connect_or_fail, device_client};
use crate::error::CliError;

pub async fn handle(args: SendArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let event = build_event(args.command)?;

    let loaded = Loaded::from_global(global)?;
    let (name, profile) = loaded.profile(global)?;
    let address = profile.address.trim().to_owned();

    let client = device_client(profile, &loaded.config, Arc::new(|_| {}))?;
    connect_or_fail(&client, &address).await?;

    let sent = client.try_send(&event).await;
    client.close().await;
    sent.map_err(|e| CliError::ConnectionFailed {
        address,
        reason: e.to_string(),
    })?;

    if !global.quiet {
        eprintln!("{} Sent {} to '{name}'", "✓".green(), event.kind());
    }
    Ok(())
}

fn build_event(command: SendCommand) -> Result<Event, CliError> {
    match command {
        SendCommand::Target { temperature } => {
            if !temperature.is_finite() {
                return Err(CliError::Validation {
                    field: "temperature".into(),
                    reason: format!("{temperature} is not a finite number"),
                });
            }
            Ok(Event::target(temperature))
        }
        SendCommand::Heat { state } => Ok(Event::heating(state == Switch::On)),
        SendCommand::Sensor { resistance } => Ok(Event::ThermistorSettings {
            resistance: ResistanceSelect::wire_value(&resistance)?,
        }),
    }
}
