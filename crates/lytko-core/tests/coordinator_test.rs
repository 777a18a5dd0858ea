#![allow(clippy::unwrap_used)]
// Integration tests for `DeviceCoordinator` using a recording fake connector.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use tokio::sync::{broadcast, watch};

use lytko_api::EventHandler;
use lytko_core::{
    Clock, Connector, CoordinatorConfig, CoreError, DeviceCoordinator, DeviceIdentity, DeviceLink,
    DiscoveryAnnouncement, Event, ExternalSensor, HolidaySet, HvacMode, InitialState, Schedule,
    ScheduleContext,
};

// ── Fakes ───────────────────────────────────────────────────────────

#[derive(Default)]
struct Record {
    opened: Vec<String>,
    closed: Vec<String>,
    sent: Vec<Event>,
    handlers: Vec<EventHandler>,
    fail_try_send: bool,
    link_down: bool,
    fail_open: bool,
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Record>>);

impl Recorder {
    fn opened(&self) -> Vec<String> {
        self.0.lock().unwrap().opened.clone()
    }

    fn closed(&self) -> Vec<String> {
        self.0.lock().unwrap().closed.clone()
    }

    fn take_sent(&self) -> Vec<Event> {
        std::mem::take(&mut self.0.lock().unwrap().sent)
    }

    fn handler(&self, index: usize) -> EventHandler {
        Arc::clone(&self.0.lock().unwrap().handlers[index])
    }

    fn fail_try_send(&self, fail: bool) {
        self.0.lock().unwrap().fail_try_send = fail;
    }

    fn fail_open(&self, fail: bool) {
        self.0.lock().unwrap().fail_open = fail;
    }

    /// While down, best-effort sends are dropped like on a broken transport.
    fn link_down(&self, down: bool) {
        self.0.lock().unwrap().link_down = down;
    }
}

struct FakeConnector {
    recorder: Recorder,
}

struct FakeLink {
    address: String,
    recorder: Recorder,
    closed: AtomicBool,
}

impl DeviceLink for FakeLink {
    fn send(&self, event: &Event) -> impl Future<Output = ()> + Send {
        let mut record = self.recorder.0.lock().unwrap();
        if !record.link_down && !self.closed.load(Ordering::Acquire) {
            record.sent.push(event.clone());
        }
        async {}
    }

    fn try_send(
        &self,
        event: &Event,
    ) -> impl Future<Output = Result<(), lytko_api::Error>> + Send {
        let result = {
            let mut record = self.recorder.0.lock().unwrap();
            if record.fail_try_send || self.closed.load(Ordering::Acquire) {
                Err(lytko_api::Error::NotConnected)
            } else {
                record.sent.push(event.clone());
                Ok(())
            }
        };
        async move { result }
    }

    fn close(&self) -> impl Future<Output = ()> + Send {
        self.closed.store(true, Ordering::Release);
        self.recorder
            .0
            .lock()
            .unwrap()
            .closed
            .push(self.address.clone());
        async {}
    }
}

impl Connector for FakeConnector {
    type Link = FakeLink;

    fn open(
        &self,
        address: &str,
        handler: EventHandler,
    ) -> impl Future<Output = Result<FakeLink, CoreError>> + Send {
        let failed = {
            let mut record = self.recorder.0.lock().unwrap();
            if record.fail_open {
                true
            } else {
                record.opened.push(address.to_owned());
                record.handlers.push(handler);
                false
            }
        };
        let result = if failed {
            Err(CoreError::ConnectionFailed {
                address: address.to_owned(),
                reason: "invalid address".into(),
            })
        } else {
            Ok(FakeLink {
                address: address.to_owned(),
                recorder: self.recorder.clone(),
                closed: AtomicBool::new(false),
            })
        };
        async move { result }
    }
}

struct FixedClock(NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

const MAC: &str = "AA:BB:CC:DD:EE:FF";

fn config() -> CoordinatorConfig {
    let identity = DeviceIdentity {
        device_id: "A1B2C3".into(),
        mac: MAC.into(),
        model: "TW1".into(),
        name: "Living room".into(),
    };
    CoordinatorConfig::new(identity, "10.0.0.5")
}

fn coordinator() -> (DeviceCoordinator<FakeConnector>, Recorder) {
    let recorder = Recorder::default();
    let connector = FakeConnector {
        recorder: recorder.clone(),
    };
    (DeviceCoordinator::new(config(), connector).unwrap(), recorder)
}

async fn started() -> (DeviceCoordinator<FakeConnector>, Recorder) {
    let (coordinator, recorder) = coordinator();
    coordinator.initialize(None, None).await.unwrap();
    (coordinator, recorder)
}

fn sensor(initial: &str) -> (ExternalSensor, watch::Sender<String>) {
    let (tx, rx) = watch::channel(initial.to_owned());
    (
        ExternalSensor {
            id: "hall".into(),
            readings: rx,
        },
        tx,
    )
}

/// Let spawned tasks drain their queues.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

fn monday_at(hour: u32, minute: u32) -> NaiveDateTime {
    // 2026-01-05 is a Monday.
    NaiveDate::from_ymd_opt(2026, 1, 5)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn schedule_ctx(now: NaiveDateTime) -> ScheduleContext {
    ScheduleContext {
        holidays: Arc::new(HolidaySet::new()),
        clock: Arc::new(FixedClock(now)),
        tick: Duration::from_secs(60),
    }
}

// ── Construction ────────────────────────────────────────────────────

#[test]
fn test_invalid_config_is_rejected() {
    let mut bad_base = config();
    bad_base.base_temperature = 150.0;
    let err = DeviceCoordinator::new(
        bad_base,
        FakeConnector {
            recorder: Recorder::default(),
        },
    )
    .err()
    .unwrap();
    assert!(matches!(err, CoreError::OutOfRange { .. }));

    let mut bad_thermistor = config();
    bad_thermistor.thermistor = "7".into();
    let err = DeviceCoordinator::new(
        bad_thermistor,
        FakeConnector {
            recorder: Recorder::default(),
        },
    )
    .err()
    .unwrap();
    assert!(matches!(err, CoreError::InvalidOption { .. }));
}

// ── Inbound dispatch ────────────────────────────────────────────────

#[tokio::test]
async fn test_inbound_status_updates_controls() {
    let (coordinator, recorder) = started().await;
    assert_eq!(recorder.opened(), vec!["10.0.0.5"]);

    let handler = recorder.handler(0);
    let raw = r#"{"action":"thermostat","t_target":22.5,"heat":"heat","t_curr":21.0,"target_max":35.0,"target_min":5.0,"hysteresis":0.5}"#;
    for event in lytko_api::decode_text(raw) {
        handler(event);
    }
    handler(Event::ChildLock { on: true });
    settle().await;

    let climate = coordinator.climate().snapshot();
    assert_eq!(climate.target_temperature, Some(22.5));
    assert_eq!(climate.current_temperature, Some(21.0));
    assert!(climate.heating);
    assert_eq!((climate.min, climate.max, climate.step), (5.0, 35.0, 0.5));
    assert_eq!(coordinator.climate().snapshot().mode(), HvacMode::Heat);

    let base = coordinator.base_temperature().snapshot();
    assert_eq!((base.min, base.max), (5.0, 35.0));
    assert!(coordinator.child_lock().is_on());

    coordinator.stop().await;
}

#[tokio::test]
async fn test_failed_event_does_not_block_later_events() {
    let (coordinator, recorder) = started().await;
    let handler = recorder.handler(0);

    handler(Event::ThermostatSettings {
        min: 35.0,
        max: 5.0,
        step: 0.5,
    });
    handler(Event::target(21.0));
    settle().await;

    let climate = coordinator.climate().snapshot();
    assert_eq!(climate.target_temperature, Some(21.0));
    assert_eq!(climate.max, 100.0);

    coordinator.stop().await;
}

// ── External sensor override ────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_override_ignores_device_readings() {
    let (coordinator, _recorder) = coordinator();
    let (sensor, _tx) = sensor("19.0");
    coordinator.initialize(Some(sensor), None).await.unwrap();

    coordinator.set_target_temperature(21.0).await.unwrap();
    coordinator.handle_event(Event::CurrentTemperature { temperature: 20.0 });
    coordinator.set_mode(HvacMode::Auto).await.unwrap();
    assert!(coordinator.is_external_sensor_active());

    coordinator.handle_event(Event::target(30.0));
    coordinator.handle_event(Event::CurrentTemperature { temperature: 25.0 });
    coordinator.handle_event(Event::heating(false));

    let climate = coordinator.climate().snapshot();
    assert_eq!(climate.target_temperature, Some(21.0));
    assert_eq!(climate.current_temperature, Some(20.0));
    assert!(!climate.heating);
    assert_eq!(climate.displayed_temperature(), Some(19.0));

    coordinator.stop().await;
}

#[tokio::test]
async fn test_auto_mode_requires_sensor() {
    let (coordinator, _recorder) = started().await;
    assert!(!coordinator.climate().snapshot().auto_available);

    let err = coordinator.set_mode(HvacMode::Auto).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::ModeUnavailable {
            mode: HvacMode::Auto
        }
    ));

    coordinator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_auto_mode_drives_heating_from_external_sensor() {
    let (coordinator, recorder) = coordinator();
    let (sensor, tx) = sensor("19.0");
    coordinator.initialize(Some(sensor), None).await.unwrap();
    coordinator.set_target_temperature(20.0).await.unwrap();
    recorder.take_sent();

    coordinator.set_mode(HvacMode::Auto).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let sent = recorder.take_sent();
    assert_eq!(sent.first(), Some(&Event::target(100.0)));
    assert!(sent.contains(&Event::heating(true)));
    assert!(coordinator.climate().snapshot().heating);

    // Inside the band: hold.
    tx.send("19.6".into()).unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(coordinator.climate().snapshot().heating);

    tx.send("20.6".into()).unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!coordinator.climate().snapshot().heating);

    let sent = recorder.take_sent();
    assert!(sent.contains(&Event::heating(false)));
    // The setpoint stays pinned on every tick.
    assert!(sent.contains(&Event::target(100.0)));

    coordinator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_auto_mode_pins_setpoint_after_link_recovers() {
    let (coordinator, recorder) = coordinator();
    let (sensor, _tx) = sensor("19.0");
    coordinator.initialize(Some(sensor), None).await.unwrap();
    coordinator.set_target_temperature(20.0).await.unwrap();
    recorder.take_sent();

    recorder.link_down(true);
    coordinator.set_mode(HvacMode::Auto).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(recorder.take_sent().is_empty());

    recorder.link_down(false);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let sent = recorder.take_sent();
    assert!(sent.contains(&Event::target(100.0)), "pin not re-sent: {sent:?}");
    assert!(sent.contains(&Event::heating(true)));

    coordinator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_leaving_auto_restores_target() {
    let (coordinator, recorder) = coordinator();
    let (sensor, _tx) = sensor("20.0");
    coordinator.initialize(Some(sensor), None).await.unwrap();
    coordinator.set_target_temperature(20.0).await.unwrap();
    coordinator.set_mode(HvacMode::Auto).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    recorder.take_sent();

    coordinator.set_mode(HvacMode::Heat).await.unwrap();
    assert_eq!(
        recorder.take_sent(),
        vec![Event::heating(true), Event::target(20.0)]
    );
    assert!(!coordinator.is_external_sensor_active());
    assert_eq!(coordinator.climate().snapshot().mode(), HvacMode::Heat);

    // No further auto-mode commands once the loop is gone.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(recorder.take_sent().is_empty());

    coordinator.stop().await;
}

#[tokio::test]
async fn test_sensor_readings_are_filtered() {
    let (coordinator, _recorder) = coordinator();
    let (sensor, tx) = sensor("18.5");
    coordinator.initialize(Some(sensor), None).await.unwrap();
    assert_eq!(coordinator.climate().snapshot().external_temperature, Some(18.5));
    assert_eq!(coordinator.external_sensor().current().as_deref(), Some("hall"));

    tx.send("warm".into()).unwrap();
    settle().await;
    assert_eq!(coordinator.climate().snapshot().external_temperature, Some(18.5));

    tx.send("unavailable".into()).unwrap();
    settle().await;
    assert_eq!(coordinator.climate().snapshot().external_temperature, Some(18.5));

    tx.send("19.25".into()).unwrap();
    settle().await;
    assert_eq!(coordinator.climate().snapshot().external_temperature, Some(19.25));

    coordinator.update_sensor_subscription(None).await;
    let climate = coordinator.climate().snapshot();
    assert!(!climate.auto_available);
    assert_eq!(coordinator.external_sensor().current(), None);

    coordinator.stop().await;
}

// ── Rediscovery ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_rediscovery_swaps_link_exactly_once() {
    let (coordinator, recorder) = coordinator();
    let (tx, rx) = broadcast::channel(8);
    coordinator.initialize(None, Some(rx)).await.unwrap();

    let announcement = DiscoveryAnnouncement {
        address: "10.0.0.9".into(),
        hardware_id: MAC.to_lowercase(),
    };
    tx.send(announcement.clone()).unwrap();
    tx.send(announcement).unwrap();
    tx.send(DiscoveryAnnouncement {
        address: "10.0.0.77".into(),
        hardware_id: "11:22:33:44:55:66".into(),
    })
    .unwrap();
    settle().await;

    assert_eq!(recorder.opened(), vec!["10.0.0.5", "10.0.0.9"]);
    assert_eq!(recorder.closed(), vec!["10.0.0.5"]);
    assert_eq!(coordinator.address().await, "10.0.0.9");
    assert_eq!(coordinator.generation(), 2);

    coordinator.stop().await;
}

#[tokio::test]
async fn test_events_from_replaced_link_are_dropped() {
    let (coordinator, recorder) = started().await;
    let old = recorder.handler(0);

    let swapped = coordinator
        .apply_discovery(&DiscoveryAnnouncement {
            address: "10.0.0.9".into(),
            hardware_id: MAC.into(),
        })
        .await;
    assert!(swapped);
    let new = recorder.handler(1);

    old(Event::ChildLock { on: true });
    new(Event::target(21.0));
    settle().await;

    assert_eq!(coordinator.climate().snapshot().target_temperature, Some(21.0));
    assert!(!coordinator.child_lock().is_on());

    coordinator.stop().await;
}

#[tokio::test]
async fn test_failed_replacement_keeps_current_link() {
    let (coordinator, recorder) = started().await;
    let current = recorder.handler(0);
    recorder.fail_open(true);

    let swapped = coordinator
        .apply_discovery(&DiscoveryAnnouncement {
            address: "not a host".into(),
            hardware_id: MAC.into(),
        })
        .await;
    assert!(!swapped);
    assert_eq!(coordinator.address().await, "10.0.0.5");
    assert_eq!(coordinator.generation(), 1);
    assert!(recorder.closed().is_empty());

    // The current link still carries events both ways.
    current(Event::target(21.0));
    settle().await;
    assert_eq!(coordinator.climate().snapshot().target_temperature, Some(21.0));
    coordinator.turn_on().await;
    assert_eq!(recorder.take_sent(), vec![Event::heating(true)]);

    coordinator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_discovery_window_expires() {
    let (coordinator, recorder) = coordinator();
    let (tx, rx) = broadcast::channel(8);
    coordinator.initialize(None, Some(rx)).await.unwrap();

    tokio::time::sleep(Duration::from_secs(11)).await;
    let _ = tx.send(DiscoveryAnnouncement {
        address: "10.0.0.9".into(),
        hardware_id: MAC.into(),
    });
    settle().await;

    assert_eq!(recorder.opened(), vec!["10.0.0.5"]);
    coordinator.stop().await;
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_commands_before_initialize_are_dropped() {
    let (coordinator, recorder) = coordinator();
    coordinator.send_device_command(Event::heating(true)).await;
    assert!(recorder.take_sent().is_empty());
    assert!(recorder.opened().is_empty());
}

#[tokio::test]
async fn test_target_and_heating_commands() {
    let (coordinator, recorder) = started().await;

    coordinator.set_target_temperature(21.5).await.unwrap();
    coordinator.turn_on().await;
    coordinator.turn_off().await;

    assert_eq!(
        recorder.take_sent(),
        vec![
            Event::target(21.5),
            Event::heating(true),
            Event::heating(false)
        ]
    );
    let climate = coordinator.climate().snapshot();
    assert_eq!(climate.target_temperature, Some(21.5));
    assert_eq!(climate.mode(), HvacMode::Off);

    coordinator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_initial_state_enters_auto_mode() {
    let (coordinator, recorder) = coordinator();
    let (sensor, _tx) = sensor("18.0");
    coordinator.initialize(Some(sensor), None).await.unwrap();

    coordinator
        .apply_initial_state(&InitialState {
            mode: Some(HvacMode::Auto),
            target: Some(21.0),
            child_lock: Some(true),
        })
        .await
        .unwrap();
    assert!(coordinator.child_lock().is_on());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let climate = coordinator.climate().snapshot();
    assert_eq!(climate.mode(), HvacMode::Auto);
    assert_eq!(climate.target_temperature, Some(21.0));
    assert!(climate.heating);

    let sent = recorder.take_sent();
    assert_eq!(
        &sent[..2],
        &[Event::target(21.0), Event::ChildLock { on: true }]
    );
    assert!(sent.contains(&Event::target(100.0)));
    assert!(sent.contains(&Event::heating(true)));

    coordinator.stop().await;
}

#[tokio::test]
async fn test_initial_auto_without_sensor_is_rejected() {
    let (coordinator, recorder) = started().await;
    let err = coordinator
        .apply_initial_state(&InitialState {
            mode: Some(HvacMode::Auto),
            ..InitialState::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ModeUnavailable { .. }));
    assert!(recorder.take_sent().is_empty());

    coordinator.stop().await;
}

#[tokio::test]
async fn test_select_thermistor() {
    let (coordinator, recorder) = started().await;

    coordinator.select_thermistor("6,8").await.unwrap();
    assert_eq!(
        recorder.take_sent(),
        vec![Event::ThermistorSettings {
            resistance: "6.8_kOm".into()
        }]
    );
    assert_eq!(coordinator.thermistor().current(), "6.8");

    let err = coordinator.select_thermistor("7").await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidOption { .. }));
    assert!(recorder.take_sent().is_empty());

    coordinator.stop().await;
}

#[tokio::test]
async fn test_child_lock_and_base_temperature() {
    let (coordinator, recorder) = started().await;

    coordinator.set_child_lock(true).await;
    assert!(coordinator.child_lock().is_on());

    recorder.handler(0)(Event::ThermostatSettings {
        min: 5.0,
        max: 35.0,
        step: 0.5,
    });
    settle().await;

    let err = coordinator.set_base_temperature(40.0).unwrap_err();
    assert!(matches!(err, CoreError::OutOfRange { .. }));
    coordinator.set_base_temperature(18.0).unwrap();
    assert_eq!(coordinator.base_temperature().value(), 18.0);

    coordinator.stop().await;
}

#[tokio::test]
async fn test_voice_assistant_pairing() {
    let (coordinator, recorder) = started().await;
    let password = SecretString::from("hunter2");

    coordinator
        .pair_voice_assistant("user", &password)
        .await
        .unwrap();
    assert_eq!(
        recorder.take_sent(),
        vec![Event::AliceCredentials {
            login: "user".into(),
            password: "hunter2".into()
        }]
    );

    recorder.fail_try_send(true);
    let err = coordinator
        .pair_voice_assistant("user", &password)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::VoiceAssistantPairing { .. }));

    coordinator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_background_pairing_retries_until_link_accepts() {
    let (coordinator, recorder) = started().await;
    recorder.fail_try_send(true);

    coordinator
        .pair_voice_assistant_in_background(
            "user".into(),
            SecretString::from("hunter2"),
            Duration::from_secs(5),
        )
        .await;
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert!(recorder.take_sent().is_empty());

    recorder.fail_try_send(false);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(
        recorder.take_sent(),
        vec![Event::AliceCredentials {
            login: "user".into(),
            password: "hunter2".into()
        }]
    );

    coordinator.stop().await;
}

// ── Schedules ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_schedule_start_fires_once_per_minute() {
    let (coordinator, recorder) = started().await;
    let schedule =
        Schedule::new("Morning", 23.0, "07:00", "22:00", [Weekday::Mon], false).unwrap();

    coordinator
        .add_schedule(schedule.clone(), schedule_ctx(monday_at(7, 0)))
        .unwrap();
    settle().await;
    assert_eq!(
        recorder.take_sent(),
        vec![Event::target(23.0), Event::heating(true)]
    );

    // The frozen clock stays on 07:00: no second firing.
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(recorder.take_sent().is_empty());

    let err = coordinator
        .add_schedule(schedule, schedule_ctx(monday_at(7, 0)))
        .unwrap_err();
    assert!(matches!(err, CoreError::ScheduleExists { .. }));

    assert!(coordinator.remove_schedule("Morning").await);
    assert!(!coordinator.remove_schedule("Morning").await);

    coordinator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_schedule_end_restores_base_temperature() {
    let (coordinator, recorder) = started().await;
    coordinator.set_base_temperature(19.0).unwrap();

    let schedule =
        Schedule::new("Evening", 23.0, "07:00", "22:00", [Weekday::Mon], false).unwrap();
    coordinator
        .add_schedule(schedule, schedule_ctx(monday_at(22, 0)))
        .unwrap();
    settle().await;

    assert_eq!(
        recorder.take_sent(),
        vec![Event::heating(true), Event::target(19.0)]
    );

    coordinator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_schedule_off_minute_sends_nothing() {
    let (coordinator, recorder) = started().await;
    let schedule =
        Schedule::new("Morning", 23.0, "07:00", "22:00", [Weekday::Mon], false).unwrap();
    coordinator
        .add_schedule(schedule, schedule_ctx(monday_at(7, 1)))
        .unwrap();
    tokio::time::sleep(Duration::from_secs(130)).await;

    assert!(recorder.take_sent().is_empty());
    coordinator.stop().await;
}

// ── Teardown ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_stop_tears_everything_down() {
    let (coordinator, recorder) = started().await;
    let schedule =
        Schedule::new("Morning", 23.0, "07:00", "22:00", [Weekday::Mon], false).unwrap();
    coordinator
        .add_schedule(schedule, schedule_ctx(monday_at(12, 0)))
        .unwrap();
    assert_eq!(coordinator.schedule_names(), vec!["Morning"]);

    coordinator.stop().await;

    assert_eq!(recorder.closed(), vec!["10.0.0.5"]);
    assert!(coordinator.schedule_names().is_empty());

    coordinator.send_device_command(Event::heating(true)).await;
    assert!(recorder.take_sent().is_empty());
}
