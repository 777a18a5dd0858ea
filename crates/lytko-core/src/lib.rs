//! Device coordination layer between `lytko-api` and the `lytko` binary.
//!
//! - **[`DeviceCoordinator`]**: per-device owner of the single link
//!   (through the [`Connector`] port) and the logical controls. Dispatches
//!   inbound events in wire order, swaps the link on rediscovery, and owns
//!   every automation task it starts.
//!
//! - **Controls** ([`control`]): climate, child lock, base temperature and
//!   the two selects, each backed by a `tokio::sync::watch` channel.
//!
//! - **Automation**: the hysteresis loop in [`auto_mode`] and the
//!   minute-exact [`Schedule`] evaluator with its [`HolidaySet`].

pub mod auto_mode;
pub mod config;
pub mod control;
pub mod coordinator;
pub mod discovery;
pub mod error;
pub mod holidays;
pub mod link;
pub mod schedule;
pub mod sensor;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{CoordinatorConfig, DeviceIdentity, InitialState};
pub use control::{
    BaseTemperatureControl, ChildLockControl, ClimateControl, ClimateState, ControlError,
    ExternalSensorSelect, ResistanceSelect, THERMISTOR_OPTIONS,
};
pub use coordinator::{DeviceCoordinator, HvacMode};
pub use discovery::DiscoveryAnnouncement;
pub use error::CoreError;
pub use holidays::HolidaySet;
pub use link::{Connector, DeviceLink, WsConnector};
pub use schedule::{Boundary, Clock, Schedule, ScheduleContext, SystemClock};
pub use sensor::{ExternalSensor, SensorReading, parse_sensor_reading};

pub use lytko_api::Event;
