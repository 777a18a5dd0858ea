// ── Device coordinator ──
//
// Per-device owner of the single link and the logical controls. Routes
// inbound events to controls in wire order, turns host commands into
// outbound events, swaps the link when the device changes address, and
// owns the auto-mode, schedule, sensor and discovery tasks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use lytko_api::{Event, EventHandler};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::auto_mode::auto_mode_task;
use crate::config::{CoordinatorConfig, DeviceIdentity, InitialState};
use crate::control::{
    BaseTemperatureControl, ChildLockControl, ClimateControl, ControlError, ExternalSensorSelect,
    ResistanceSelect,
};
use crate::discovery::DiscoveryAnnouncement;
use crate::error::CoreError;
use crate::link::{Connector, DeviceLink, WsConnector};
use crate::schedule::{Schedule, ScheduleContext, schedule_task};
use crate::sensor::{ExternalSensor, SensorReading, parse_sensor_reading};

// ── HvacMode ─────────────────────────────────────────────────────────

/// Climate operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum HvacMode {
    Off,
    Heat,
    /// External sensor drives heating.
    Auto,
}

// ── Task handles ─────────────────────────────────────────────────────

/// A spawned task together with the token that stops it.
struct OwnedTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl OwnedTask {
    async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

struct LinkSlot<L> {
    address: String,
    link: Option<L>,
}

// ── DeviceCoordinator ────────────────────────────────────────────────

/// Cheaply cloneable handle to one device's coordinator.
pub struct DeviceCoordinator<C: Connector = WsConnector> {
    inner: Arc<CoordinatorInner<C>>,
}

impl<C: Connector> Clone for DeviceCoordinator<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CoordinatorInner<C: Connector> {
    config: CoordinatorConfig,
    connector: C,
    /// Current link and its address. Held across swaps and sends so the
    /// two never interleave.
    link: Mutex<LinkSlot<C::Link>>,
    /// Identifies the current link; bumped on every open.
    generation: AtomicU64,
    events_tx: mpsc::UnboundedSender<(u64, Event)>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<(u64, Event)>>>,
    climate: Arc<ClimateControl>,
    child_lock: Arc<ChildLockControl>,
    base_temperature: Arc<BaseTemperatureControl>,
    thermistor: Arc<ResistanceSelect>,
    external_sensor: Arc<ExternalSensorSelect>,
    /// External sensor is authoritative: device current/target reports
    /// are ignored while set.
    external_sensor_active: AtomicBool,
    cancel: CancellationToken,
    auto_mode: Mutex<Option<OwnedTask>>,
    sensor_task: Mutex<Option<OwnedTask>>,
    discovery_task: Mutex<Option<OwnedTask>>,
    schedules: DashMap<String, OwnedTask>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<C: Connector> DeviceCoordinator<C> {
    /// Build the coordinator and its controls. Does NOT connect -- call
    /// [`initialize()`](Self::initialize).
    pub fn new(config: CoordinatorConfig, connector: C) -> Result<Self, CoreError> {
        let base_temperature = BaseTemperatureControl::with_value(config.base_temperature)?;
        let thermistor = ResistanceSelect::with_option(&config.thermistor)?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(Self {
            inner: Arc::new(CoordinatorInner {
                link: Mutex::new(LinkSlot {
                    address: config.address.clone(),
                    link: None,
                }),
                config,
                connector,
                generation: AtomicU64::new(0),
                events_tx,
                events_rx: Mutex::new(Some(events_rx)),
                climate: Arc::new(ClimateControl::new(false)),
                child_lock: Arc::new(ChildLockControl::default()),
                base_temperature: Arc::new(base_temperature),
                thermistor: Arc::new(thermistor),
                external_sensor: Arc::new(ExternalSensorSelect::default()),
                external_sensor_active: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                auto_mode: Mutex::new(None),
                sensor_task: Mutex::new(None),
                discovery_task: Mutex::new(None),
                schedules: DashMap::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn identity(&self) -> &DeviceIdentity {
        &self.inner.config.identity
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    pub fn climate(&self) -> &Arc<ClimateControl> {
        &self.inner.climate
    }

    pub fn child_lock(&self) -> &Arc<ChildLockControl> {
        &self.inner.child_lock
    }

    pub fn base_temperature(&self) -> &Arc<BaseTemperatureControl> {
        &self.inner.base_temperature
    }

    pub fn thermistor(&self) -> &Arc<ResistanceSelect> {
        &self.inner.thermistor
    }

    pub fn external_sensor(&self) -> &Arc<ExternalSensorSelect> {
        &self.inner.external_sensor
    }

    pub async fn address(&self) -> String {
        self.inner.link.lock().await.address.clone()
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    pub fn is_external_sensor_active(&self) -> bool {
        self.inner.external_sensor_active.load(Ordering::Acquire)
    }

    pub fn schedule_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.schedules.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start dispatching, open the link, subscribe the external sensor
    /// and, when a feed is given, watch for address changes.
    pub async fn initialize(
        &self,
        sensor: Option<ExternalSensor>,
        discovery: Option<broadcast::Receiver<DiscoveryAnnouncement>>,
    ) -> Result<(), CoreError> {
        let Some(rx) = self.inner.events_rx.lock().await.take() else {
            debug!(device = %self.identity().device_id, "coordinator already initialized");
            return Ok(());
        };

        let cancel = self.inner.cancel.child_token();
        let handle = tokio::spawn(dispatch_task(self.clone(), rx, cancel));
        self.inner.task_handles.lock().await.push(handle);

        {
            let mut slot = self.inner.link.lock().await;
            let link = self.open_link(&slot.address).await?;
            slot.link = Some(link);
            info!(
                device = %self.identity().device_id,
                address = %slot.address,
                "device link opened"
            );
        }

        self.update_sensor_subscription(sensor).await;

        if let Some(feed) = discovery {
            self.watch_discovery(feed, self.inner.config.rediscovery_window)
                .await;
        }

        Ok(())
    }

    /// Apply start-up settings in order: target, child lock, then mode.
    pub async fn apply_initial_state(&self, initial: &InitialState) -> Result<(), CoreError> {
        if let Some(target) = initial.target {
            self.set_target_temperature(target).await?;
        }
        if let Some(on) = initial.child_lock {
            self.set_child_lock(on).await;
        }
        if let Some(mode) = initial.mode {
            self.set_mode(mode).await?;
        }
        Ok(())
    }

    /// Cancel every task owned by the coordinator and close the link.
    pub async fn stop(&self) {
        for slot in [
            &self.inner.auto_mode,
            &self.inner.sensor_task,
            &self.inner.discovery_task,
        ] {
            let task = slot.lock().await.take();
            if let Some(task) = task {
                task.stop().await;
            }
        }

        for name in self.schedule_names() {
            if let Some((_, task)) = self.inner.schedules.remove(&name) {
                task.stop().await;
            }
        }

        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        if let Some(link) = self.inner.link.lock().await.link.take() {
            link.close().await;
        }
        info!(device = %self.identity().device_id, "coordinator stopped");
    }

    // ── Inbound ──────────────────────────────────────────────────────

    /// Apply one inbound event to the controls. Failures are logged and
    /// swallowed so later events still land.
    pub fn handle_event(&self, event: Event) {
        let kind = event.kind();
        if let Err(e) = self.apply_event(event) {
            debug!(kind, error = %e, "failed to apply device event");
        }
    }

    fn apply_event(&self, event: Event) -> Result<(), ControlError> {
        let overridden = self.is_external_sensor_active();
        let climate = &self.inner.climate;

        match event {
            Event::TargetTemperature { temperature } => {
                if overridden {
                    trace!("device target ignored while external sensor is active");
                } else {
                    climate.set_target_temperature(temperature)?;
                }
            }
            Event::CurrentTemperature { temperature } => {
                if overridden {
                    trace!("device reading ignored while external sensor is active");
                } else {
                    climate.set_current_temperature(temperature)?;
                }
            }
            Event::Heating { on } => climate.set_heating(on),
            Event::ChildLock { on } => self.inner.child_lock.set_child_lock(on),
            Event::ThermostatSettings { min, max, step } => {
                climate.set_bounds(min, max, step)?;
                self.inner.base_temperature.set_bounds(min, max, step)?;
            }
            Event::ThermistorSettings { .. } | Event::AliceCredentials { .. } => {
                trace!("outbound-only event received, ignoring");
            }
        }
        Ok(())
    }

    // ── Outbound ─────────────────────────────────────────────────────

    /// Forward a command to the current link. Dropped when no link is open.
    pub async fn send_device_command(&self, event: Event) {
        let slot = self.inner.link.lock().await;
        match slot.link.as_ref() {
            Some(link) => link.send(&event).await,
            None => debug!(kind = event.kind(), "no device link, dropping command"),
        }
    }

    pub async fn set_target_temperature(&self, temperature: f64) -> Result<(), CoreError> {
        self.inner.climate.set_target_temperature(temperature)?;
        if !self.inner.climate.snapshot().auto_mode {
            self.send_device_command(Event::target(temperature)).await;
        }
        Ok(())
    }

    pub async fn turn_on(&self) {
        self.apply_heating(true).await;
    }

    pub async fn turn_off(&self) {
        self.apply_heating(false).await;
    }

    /// Send a heating command and mirror it locally.
    pub(crate) async fn apply_heating(&self, on: bool) {
        self.send_device_command(Event::heating(on)).await;
        self.inner.climate.set_heating(on);
    }

    pub async fn set_mode(&self, mode: HvacMode) -> Result<(), CoreError> {
        let before = self.inner.climate.snapshot().mode();

        match mode {
            HvacMode::Auto => {
                if !self.inner.climate.snapshot().auto_available {
                    return Err(CoreError::ModeUnavailable { mode });
                }
                self.inner.external_sensor_active.store(true, Ordering::Release);
                self.inner.climate.set_auto_mode(true);
                self.start_auto_mode().await;
            }
            HvacMode::Off => {
                self.leave_auto().await;
                self.turn_off().await;
            }
            HvacMode::Heat => {
                self.leave_auto().await;
                self.turn_on().await;
            }
        }

        if before == HvacMode::Auto && mode != HvacMode::Auto {
            self.restore_target().await;
        }

        info!(device = %self.identity().device_id, from = %before, to = %mode, "mode changed");
        Ok(())
    }

    /// Child lock has no outbound wire shape: the command is offered to the
    /// link (which drops it) and the switch state is updated locally.
    pub async fn set_child_lock(&self, on: bool) {
        self.send_device_command(Event::ChildLock { on }).await;
        self.inner.child_lock.set_child_lock(on);
    }

    pub async fn select_thermistor(&self, option: &str) -> Result<(), CoreError> {
        let resistance = ResistanceSelect::wire_value(option)?;
        self.send_device_command(Event::ThermistorSettings { resistance })
            .await;
        self.inner.thermistor.set_option(option)?;
        Ok(())
    }

    pub fn set_base_temperature(&self, value: f64) -> Result<(), CoreError> {
        self.inner.base_temperature.set_value(value)?;
        Ok(())
    }

    pub async fn pair_voice_assistant(
        &self,
        login: &str,
        password: &SecretString,
    ) -> Result<(), CoreError> {
        let event = Event::AliceCredentials {
            login: login.to_owned(),
            password: password.expose_secret().to_owned(),
        };

        let slot = self.inner.link.lock().await;
        let Some(link) = slot.link.as_ref() else {
            return Err(CoreError::VoiceAssistantPairing {
                reason: "device link is not open".into(),
            });
        };
        link.try_send(&event)
            .await
            .map_err(|e| CoreError::VoiceAssistantPairing {
                reason: e.to_string(),
            })?;

        info!(device = %self.identity().device_id, login, "voice assistant pairing sent");
        Ok(())
    }

    /// Keep offering the credentials every `retry` until the device link
    /// takes them or the coordinator stops.
    pub async fn pair_voice_assistant_in_background(
        &self,
        login: String,
        password: SecretString,
        retry: Duration,
    ) {
        let cancel = self.inner.cancel.child_token();
        let coordinator = self.clone();
        let handle = tokio::spawn(async move {
            let mut attempt: u32 = 0;
            loop {
                match coordinator.pair_voice_assistant(&login, &password).await {
                    Ok(()) => break,
                    Err(e) if attempt == 0 => {
                        warn!(device = %coordinator.identity().device_id, error = %e, "voice assistant pairing failed, will retry");
                    }
                    Err(e) => debug!(error = %e, attempt, "voice assistant pairing retry failed"),
                }
                attempt = attempt.saturating_add(1);

                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(retry) => {}
                }
            }
        });
        self.inner.task_handles.lock().await.push(handle);
    }

    // ── Auto mode ────────────────────────────────────────────────────

    async fn start_auto_mode(&self) {
        let mut slot = self.inner.auto_mode.lock().await;
        if slot.is_some() {
            return;
        }
        let cancel = self.inner.cancel.child_token();
        let handle = tokio::spawn(auto_mode_task(
            self.clone(),
            self.inner.config.auto_mode_interval,
            cancel.clone(),
        ));
        *slot = Some(OwnedTask { cancel, handle });
    }

    /// Cancel the auto loop and hand control back to the device sensor.
    async fn leave_auto(&self) {
        let task = self.inner.auto_mode.lock().await.take();
        if let Some(task) = task {
            task.stop().await;
        }
        self.inner.external_sensor_active.store(false, Ordering::Release);
        self.inner.climate.set_auto_mode(false);
    }

    /// Give the device a definite setpoint after leaving `auto`: the local
    /// target if known, else the last device reading.
    async fn restore_target(&self) {
        let state = self.inner.climate.snapshot();
        match state.target_temperature.or(state.current_temperature) {
            Some(temperature) => self.send_device_command(Event::target(temperature)).await,
            None => debug!("no target to restore after leaving auto mode"),
        }
    }

    // ── External sensor ──────────────────────────────────────────────

    /// Replace the external sensor subscription. `None` unsubscribes and,
    /// if the climate was in `auto`, leaves it.
    pub async fn update_sensor_subscription(&self, sensor: Option<ExternalSensor>) {
        let previous = self.inner.sensor_task.lock().await.take();
        if let Some(task) = previous {
            task.stop().await;
        }

        self.inner
            .external_sensor
            .set_selected(sensor.as_ref().map(|s| s.id.clone()));

        let Some(ExternalSensor { id, mut readings }) = sensor else {
            if self.inner.climate.snapshot().auto_mode {
                info!("external sensor removed, leaving auto mode");
                self.leave_auto().await;
                self.restore_target().await;
            }
            self.inner.climate.set_auto_available(false);
            return;
        };

        self.inner.climate.set_auto_available(true);
        let current = readings.borrow_and_update().clone();
        self.apply_sensor_reading(&id, &current);

        let cancel = self.inner.cancel.child_token();
        let coordinator = self.clone();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    changed = readings.changed() => {
                        if changed.is_err() {
                            debug!(sensor = %id, "sensor feed closed");
                            break;
                        }
                        let raw = readings.borrow_and_update().clone();
                        coordinator.apply_sensor_reading(&id, &raw);
                    }
                }
            }
        });
        *self.inner.sensor_task.lock().await = Some(OwnedTask { cancel, handle });
    }

    fn apply_sensor_reading(&self, sensor: &str, raw: &str) {
        match parse_sensor_reading(raw) {
            SensorReading::Temperature(value) => {
                if let Err(e) = self.inner.climate.set_external_temperature(value) {
                    debug!(sensor, error = %e, "failed to apply external reading");
                }
            }
            SensorReading::Unavailable => trace!(sensor, "external sensor has no reading"),
            SensorReading::Invalid => {
                warn!(sensor, value = raw, "invalid temperature value from external sensor");
            }
        }
    }

    // ── Rediscovery ──────────────────────────────────────────────────

    /// Listen to `feed` for `window`, swapping the link whenever this
    /// device is announced at a new address. Replaces any running watch.
    pub async fn watch_discovery(
        &self,
        mut feed: broadcast::Receiver<DiscoveryAnnouncement>,
        window: Duration,
    ) {
        let previous = self.inner.discovery_task.lock().await.take();
        if let Some(task) = previous {
            task.stop().await;
        }

        let cancel = self.inner.cancel.child_token();
        let token = cancel.clone();
        let coordinator = self.clone();
        let handle = tokio::spawn(async move {
            let deadline = tokio::time::sleep(window);
            tokio::pin!(deadline);

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    () = &mut deadline => {
                        debug!("rediscovery window closed");
                        break;
                    }
                    announcement = feed.recv() => match announcement {
                        Ok(announcement) => {
                            coordinator.apply_discovery(&announcement).await;
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "discovery feed lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        });
        *self.inner.discovery_task.lock().await = Some(OwnedTask { cancel, handle });
    }

    /// Swap the link if `announcement` places this device at a new address.
    /// Returns whether a swap happened.
    pub async fn apply_discovery(&self, announcement: &DiscoveryAnnouncement) -> bool {
        if !self.identity().matches_hardware_id(&announcement.hardware_id) {
            return false;
        }

        let mut slot = self.inner.link.lock().await;
        if slot.address == announcement.address {
            trace!(address = %slot.address, "device announced at known address");
            return false;
        }

        info!(
            device = %self.identity().device_id,
            old = %slot.address,
            new = %announcement.address,
            "device address changed, replacing link"
        );

        let previous = self.generation();
        let link = match self.open_link(&announcement.address).await {
            Ok(link) => link,
            Err(e) => {
                // Keep talking to the old address until the next announcement.
                self.inner.generation.store(previous, Ordering::Release);
                error!(
                    device = %self.identity().device_id,
                    address = %announcement.address,
                    error = %e,
                    "failed to open replacement link, keeping current link"
                );
                return false;
            }
        };

        if let Some(old) = slot.link.replace(link) {
            old.close().await;
        }
        slot.address.clone_from(&announcement.address);
        true
    }

    // ── Schedules ────────────────────────────────────────────────────

    pub fn add_schedule(&self, schedule: Schedule, ctx: ScheduleContext) -> Result<(), CoreError> {
        match self.inner.schedules.entry(schedule.name().to_owned()) {
            Entry::Occupied(entry) => Err(CoreError::ScheduleExists {
                name: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                info!(device = %self.identity().device_id, schedule = schedule.name(), %schedule, "schedule attached");
                let cancel = self.inner.cancel.child_token();
                let handle = tokio::spawn(schedule_task(self.clone(), schedule, ctx, cancel.clone()));
                entry.insert(OwnedTask { cancel, handle });
                Ok(())
            }
        }
    }

    pub async fn remove_schedule(&self, name: &str) -> bool {
        let Some((_, task)) = self.inner.schedules.remove(name) else {
            return false;
        };
        task.stop().await;
        info!(device = %self.identity().device_id, schedule = name, "schedule removed");
        true
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Open a link tagged with a fresh generation. Caller holds the slot lock.
    async fn open_link(&self, address: &str) -> Result<C::Link, CoreError> {
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let tx = self.inner.events_tx.clone();
        let handler: EventHandler = Arc::new(move |event| {
            let _ = tx.send((generation, event));
        });
        self.inner.connector.open(address, handler).await
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Drain inbound events in order, dropping those from replaced links.
async fn dispatch_task<C: Connector>(
    coordinator: DeviceCoordinator<C>,
    mut rx: mpsc::UnboundedReceiver<(u64, Event)>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            item = rx.recv() => {
                let Some((generation, event)) = item else { break };
                if generation == coordinator.generation() {
                    coordinator.handle_event(event);
                } else {
                    debug!(kind = event.kind(), generation, "dropping event from replaced link");
                }
            }
        }
    }
}
