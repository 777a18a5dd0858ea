use serde::Serialize;
use tokio::sync::watch;

use super::{ControlError, check_bounds, finite, same, same_opt};
use crate::coordinator::HvacMode;

/// Snapshot of the climate control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimateState {
    /// Last reading from the device's own sensor.
    pub current_temperature: Option<f64>,
    pub target_temperature: Option<f64>,
    pub heating: bool,
    /// Last reading from the external sensor, if one is subscribed.
    pub external_temperature: Option<f64>,
    /// External sensor drives heating (`auto` mode).
    pub auto_mode: bool,
    /// An external sensor is configured, so `auto` may be selected.
    pub auto_available: bool,
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Default for ClimateState {
    fn default() -> Self {
        Self {
            current_temperature: None,
            target_temperature: None,
            heating: false,
            external_temperature: None,
            auto_mode: false,
            auto_available: false,
            min: 0.0,
            max: 100.0,
            step: 0.5,
        }
    }
}

impl ClimateState {
    pub fn mode(&self) -> HvacMode {
        if self.auto_mode {
            HvacMode::Auto
        } else if self.heating {
            HvacMode::Heat
        } else {
            HvacMode::Off
        }
    }

    /// The temperature shown to the user: the external reading in `auto`,
    /// the device reading otherwise.
    pub fn displayed_temperature(&self) -> Option<f64> {
        if self.auto_mode {
            self.external_temperature
        } else {
            self.current_temperature
        }
    }

    pub fn available_modes(&self) -> Vec<HvacMode> {
        let mut modes = vec![HvacMode::Off, HvacMode::Heat];
        if self.auto_available {
            modes.push(HvacMode::Auto);
        }
        modes
    }
}

/// Thermostat climate entity.
#[derive(Debug)]
pub struct ClimateControl {
    state: watch::Sender<ClimateState>,
}

impl Default for ClimateControl {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ClimateControl {
    pub fn new(auto_available: bool) -> Self {
        let (state, _) = watch::channel(ClimateState {
            auto_available,
            ..ClimateState::default()
        });
        Self { state }
    }

    pub fn snapshot(&self) -> ClimateState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ClimateState> {
        self.state.subscribe()
    }

    pub fn set_current_temperature(&self, temperature: f64) -> Result<(), ControlError> {
        let temperature = finite("current temperature", temperature)?;
        self.state.send_if_modified(|s| {
            let changed = !same_opt(s.current_temperature, Some(temperature));
            s.current_temperature = Some(temperature);
            changed
        });
        Ok(())
    }

    pub fn set_target_temperature(&self, temperature: f64) -> Result<(), ControlError> {
        let temperature = finite("target temperature", temperature)?;
        self.state.send_if_modified(|s| {
            let changed = !same_opt(s.target_temperature, Some(temperature));
            s.target_temperature = Some(temperature);
            changed
        });
        Ok(())
    }

    pub fn set_external_temperature(&self, temperature: f64) -> Result<(), ControlError> {
        let temperature = finite("external temperature", temperature)?;
        self.state.send_if_modified(|s| {
            let changed = !same_opt(s.external_temperature, Some(temperature));
            s.external_temperature = Some(temperature);
            changed
        });
        Ok(())
    }

    pub fn set_heating(&self, on: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.heating != on;
            s.heating = on;
            changed
        });
    }

    /// Apply device-reported setpoint bounds and hysteresis step.
    pub fn set_bounds(&self, min: f64, max: f64, step: f64) -> Result<(), ControlError> {
        check_bounds(min, max, step)?;
        self.state.send_if_modified(|s| {
            let changed = !(same(s.min, min) && same(s.max, max) && same(s.step, step));
            s.min = min;
            s.max = max;
            s.step = step;
            changed
        });
        Ok(())
    }

    pub(crate) fn set_auto_mode(&self, enabled: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.auto_mode != enabled;
            s.auto_mode = enabled;
            changed
        });
    }

    pub(crate) fn set_auto_available(&self, available: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.auto_available != available;
            s.auto_available = available;
            if !available {
                s.external_temperature = None;
            }
            changed
        });
    }
}
