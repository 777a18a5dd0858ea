use serde::Serialize;
use tokio::sync::watch;

use super::{ControlError, check_bounds, finite, same};

pub const DEFAULT_BASE_TEMPERATURE: f64 = 20.0;

/// Baseline setpoint applied when a schedule window ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseTemperatureState {
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

#[derive(Debug)]
pub struct BaseTemperatureControl {
    state: watch::Sender<BaseTemperatureState>,
}

impl Default for BaseTemperatureControl {
    fn default() -> Self {
        let (state, _) = watch::channel(BaseTemperatureState {
            value: DEFAULT_BASE_TEMPERATURE,
            min: 0.0,
            max: 100.0,
            step: 0.0,
        });
        Self { state }
    }
}

impl BaseTemperatureControl {
    /// Build with an initial value, checked against the default bounds.
    pub fn with_value(value: f64) -> Result<Self, ControlError> {
        let control = Self::default();
        control.set_value(value)?;
        Ok(control)
    }

    pub fn value(&self) -> f64 {
        self.state.borrow().value
    }

    pub fn snapshot(&self) -> BaseTemperatureState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BaseTemperatureState> {
        self.state.subscribe()
    }

    pub fn set_value(&self, value: f64) -> Result<(), ControlError> {
        let value = finite("base temperature", value)?;
        let (min, max) = {
            let s = self.state.borrow();
            (s.min, s.max)
        };
        if value < min || value > max {
            return Err(ControlError::OutOfRange { value, min, max });
        }
        self.state.send_if_modified(|s| {
            let changed = !same(s.value, value);
            s.value = value;
            changed
        });
        Ok(())
    }

    /// Apply device-reported bounds. The stored value is kept as is.
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
}
