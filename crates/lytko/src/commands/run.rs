//! The link daemon: one coordinator per selected profile.

use std::time::Duration;

use lytko_config::{Config, Profile};
use lytko_core::{DeviceCoordinator, DiscoveryAnnouncement, WsConnector};
use owo_colors::OwoColorize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{GlobalOpts, RunArgs};
use crate::commands::Loaded;
use crate::discovery::Browser;
use crate::error::CliError;
use crate::sensor::spawn_file_sensor;

/// A started coordinator and the helper tasks the daemon owns for it.
struct RunningDevice {
    name: String,
    coordinator: DeviceCoordinator,
    tasks: Vec<JoinHandle<()>>,
}

impl RunningDevice {
    async fn stop(self) {
        self.coordinator.stop().await;
        for task in self.tasks {
            let _ = task.await;
        }
        info!(device = %self.name, "device stopped");
    }
}

pub async fn handle(args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let loaded = Loaded::from_global(global)?;
    let selected = select_profiles(&loaded, global, args.all)?;

    let cancel = CancellationToken::new();
    let browser = if args.no_discovery {
        None
    } else {
        match Browser::start(cancel.child_token()) {
            Ok(browser) => Some(browser),
            Err(e) => {
                warn!(error = %e, "mDNS unavailable, running without rediscovery");
                None
            }
        }
    };

    let mut devices = Vec::with_capacity(selected.len());
    for (name, profile) in selected {
        match start_device(&loaded.config, name, profile, browser.as_ref(), &cancel).await {
            Ok(device) => {
                if !global.quiet {
                    eprintln!(
                        "{} {} → {}",
                        "✓".green(),
                        device.name.bold(),
                        profile.address
                    );
                }
                devices.push(device);
            }
            Err(e) => {
                shutdown(devices, browser, &cancel).await;
                return Err(e);
            }
        }
    }

    if !global.quiet {
        eprintln!("Running {} device(s), Ctrl-C to stop", devices.len());
    }
    let signal = tokio::signal::ctrl_c().await;
    info!("shutting down");

    shutdown(devices, browser, &cancel).await;
    signal.map_err(CliError::from)
}

fn select_profiles<'a>(
    loaded: &'a Loaded,
    global: &GlobalOpts,
    all: bool,
) -> Result<Vec<(String, &'a Profile)>, CliError> {
    if !all {
        return Ok(vec![loaded.profile(global)?]);
    }
    let mut profiles: Vec<_> = loaded
        .config
        .profiles
        .iter()
        .map(|(name, profile)| (name.clone(), profile))
        .collect();
    if profiles.is_empty() {
        return Err(CliError::Validation {
            field: "profiles".into(),
            reason: format!("no profiles configured in {}", loaded.path.display()),
        });
    }
    profiles.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(profiles)
}

async fn start_device(
    config: &Config,
    name: String,
    profile: &Profile,
    browser: Option<&Browser>,
    cancel: &CancellationToken,
) -> Result<RunningDevice, CliError> {
    let defaults = &config.defaults;
    let coordinator_config = lytko_config::profile_to_coordinator_config(profile, &name, defaults)?;
    let schedules = lytko_config::profile_schedules(profile)?;
    let coordinator = DeviceCoordinator::new(
        coordinator_config,
        WsConnector::new(defaults.reconnect_config()),
    )?;

    let mut tasks = Vec::new();
    let sensor = profile.external_sensor.as_ref().map(|source| {
        let (sensor, task) = spawn_file_sensor(source, cancel.child_token());
        tasks.push(task);
        sensor
    });

    if let Err(e) = coordinator
        .initialize(sensor, browser.map(Browser::subscribe))
        .await
    {
        coordinator.stop().await;
        return Err(e.into());
    }

    let ctx = config.schedule_context();
    for schedule in schedules {
        if let Err(e) = coordinator.add_schedule(schedule, ctx.clone()) {
            coordinator.stop().await;
            return Err(e.into());
        }
    }

    let initial = lytko_config::profile_initial_state(profile);
    if let Err(e) = coordinator.apply_initial_state(&initial).await {
        coordinator.stop().await;
        return Err(e.into());
    }

    match lytko_config::resolve_alice_credentials(profile, &name) {
        Ok(Some((login, password))) => {
            coordinator
                .pair_voice_assistant_in_background(
                    login,
                    password,
                    Duration::from_secs(defaults.reconnect_delay_secs.max(1)),
                )
                .await;
        }
        Ok(None) => {}
        Err(e) => warn!(device = %name, error = %e, "voice assistant credentials unavailable"),
    }

    if let Some(browser) = browser {
        if defaults.rediscovery_interval_secs > 0 {
            tasks.push(tokio::spawn(rearm_discovery(
                coordinator.clone(),
                browser.feed(),
                Duration::from_secs(defaults.rediscovery_interval_secs),
                Duration::from_secs(defaults.rediscovery_window_secs),
                cancel.child_token(),
            )));
        }
    }

    tasks.push(tokio::spawn(report_climate(
        name.clone(),
        coordinator.clone(),
        cancel.child_token(),
    )));

    Ok(RunningDevice {
        name,
        coordinator,
        tasks,
    })
}

/// Open a fresh rediscovery window every `interval`.
async fn rearm_discovery(
    coordinator: DeviceCoordinator,
    feed: broadcast::Sender<DiscoveryAnnouncement>,
    interval: Duration,
    window: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                coordinator.watch_discovery(feed.subscribe(), window).await;
            }
        }
    }
}

/// Log every climate change at `info`.
async fn report_climate(name: String, coordinator: DeviceCoordinator, cancel: CancellationToken) {
    let mut climate = coordinator.climate().subscribe();
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = climate.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = climate.borrow_and_update().clone();
                info!(
                    device = %name,
                    mode = %state.mode(),
                    temperature = ?state.displayed_temperature(),
                    target = ?state.target_temperature,
                    heating = state.heating,
                    "climate updated"
                );
            }
        }
    }
}

async fn shutdown(devices: Vec<RunningDevice>, browser: Option<Browser>, cancel: &CancellationToken) {
    cancel.cancel();
    for device in devices {
        device.stop().await;
    }
    if let Some(browser) = browser {
        browser.join().await;
    }
}
