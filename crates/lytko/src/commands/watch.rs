//! Stream decoded device events to stdout as JSON lines.

use std::sync::Arc;
use std::time::Duration;

use lytko_api::{ConnectionState, Event, EventHandler};
use owo_colors::OwoColorize;
use tracing::{info, warn};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::commands::{Loaded, device_client};
use crate::error::CliError;

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let loaded = Loaded::from_global(global)?;
    let (name, profile) = loaded.profile(global)?;

    let handler: EventHandler = Arc::new(|event: Event| match serde_json::to_string(&event) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(kind = event.kind(), error = %e, "failed to render event"),
    });
    let client = device_client(profile, &loaded.config, handler)?;

    let connected = client.connect().await;
    if !global.quiet {
        if connected {
            eprintln!(
                "{} Watching '{name}' at {} (Ctrl-C to stop)",
                "✓".green(),
                profile.address
            );
        } else {
            eprintln!(
                "{} '{name}' is not reachable yet, retrying every {}s",
                "!".yellow(),
                loaded.config.defaults.reconnect_delay_secs
            );
        }
    }

    let deadline = async move {
        match args.duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut state = client.subscribe_state();

    let outcome = loop {
        tokio::select! {
            biased;
            signal = &mut ctrl_c => break signal.map_err(CliError::from),
            () = &mut deadline => break Ok(()),
            changed = state.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = *state.borrow_and_update();
                info!(device = %name, state = ?current, "link state changed");
                if current == ConnectionState::Connected && !global.quiet {
                    eprintln!("{} Connected to '{name}'", "✓".green());
                }
            }
        }
    };

    client.close().await;
    outcome
}
