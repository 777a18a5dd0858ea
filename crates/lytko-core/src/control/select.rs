use tokio::sync::watch;

use crate::error::CoreError;

/// Supported floor thermistor ratings, in kΩ.
pub const THERMISTOR_OPTIONS: [&str; 9] = ["5", "6.8", "10", "12", "14.8", "15", "20", "33", "47"];

pub const DEFAULT_THERMISTOR: &str = "10";

// ── Thermistor resistance ────────────────────────────────────────────

#[derive(Debug)]
pub struct ResistanceSelect {
    option: watch::Sender<String>,
}

impl Default for ResistanceSelect {
    fn default() -> Self {
        let (option, _) = watch::channel(DEFAULT_THERMISTOR.to_owned());
        Self { option }
    }
}

impl ResistanceSelect {
    pub fn with_option(option: &str) -> Result<Self, CoreError> {
        let select = Self::default();
        select.set_option(option)?;
        Ok(select)
    }

    /// Accept a decimal comma, then check against [`THERMISTOR_OPTIONS`].
    pub fn normalize(option: &str) -> Result<String, CoreError> {
        let normalized = option.trim().replace(',', ".");
        if THERMISTOR_OPTIONS.contains(&normalized.as_str()) {
            Ok(normalized)
        } else {
            Err(CoreError::InvalidOption {
                option: option.to_owned(),
                expected: THERMISTOR_OPTIONS.join(", "),
            })
        }
    }

    /// Wire value for an option, e.g. `"6.8"` becomes `"6.8_kOm"`.
    pub fn wire_value(option: &str) -> Result<String, CoreError> {
        Ok(format!("{}_kOm", Self::normalize(option)?))
    }

    pub fn current(&self) -> String {
        self.option.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.option.subscribe()
    }

    pub fn set_option(&self, option: &str) -> Result<(), CoreError> {
        let normalized = Self::normalize(option)?;
        self.option.send_if_modified(|current| {
            let changed = *current != normalized;
            *current = normalized;
            changed
        });
        Ok(())
    }
}

// ── External sensor ──────────────────────────────────────────────────

/// Which external temperature sensor, if any, feeds `auto` mode.
#[derive(Debug)]
pub struct ExternalSensorSelect {
    selected: watch::Sender<Option<String>>,
}

impl Default for ExternalSensorSelect {
    fn default() -> Self {
        let (selected, _) = watch::channel(None);
        Self { selected }
    }
}

impl ExternalSensorSelect {
    pub fn current(&self) -> Option<String> {
        self.selected.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.selected.subscribe()
    }

    pub fn set_selected(&self, sensor_id: Option<String>) {
        self.selected.send_if_modified(|current| {
            let changed = *current != sensor_id;
            *current = sensor_id;
            changed
        });
    }
}
