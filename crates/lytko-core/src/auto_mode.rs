// ── Auto-mode hysteresis loop ──
//
// While the climate is in `auto`, an external sensor reading replaces the
// device's own sensor: every tick the loop pins the device setpoint to
// its upper bound and switches heating on/off itself around the local target.

use std::time::Duration;

use lytko_api::Event;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::coordinator::DeviceCoordinator;
use crate::link::Connector;

/// Heating action for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    TurnOn,
    TurnOff,
    Hold,
}

/// Hysteresis rule: below `target - step` heat, above `target + step`
/// stop, otherwise leave heating as it is.
pub fn decide(reading: f64, target: f64, step: f64) -> Decision {
    if reading < target - step {
        Decision::TurnOn
    } else if reading > target + step {
        Decision::TurnOff
    } else {
        Decision::Hold
    }
}

pub(crate) async fn auto_mode_task<C: Connector>(
    coordinator: DeviceCoordinator<C>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX), "auto mode loop started");

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let state = coordinator.climate().snapshot();
        let (Some(reading), Some(target)) = (state.external_temperature, state.target_temperature) else {
            trace!("auto mode idle: waiting for external reading and target");
            continue;
        };

        // Keep the device's own regulation out of the way. Sent every tick.
        coordinator.send_device_command(Event::target(state.max)).await;

        match decide(reading, target, state.step) {
            Decision::TurnOn => coordinator.apply_heating(true).await,
            Decision::TurnOff => coordinator.apply_heating(false).await,
            Decision::Hold => {}
        }
    }

    debug!("auto mode loop stopped");
}
