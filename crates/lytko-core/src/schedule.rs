// ── Schedule evaluator ──
//
// A schedule fires on exact local-minute equality with its start or end
// time, on active weekdays, optionally skipping holidays. A missed tick
// skips that boundary until the next matching day.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use lytko_api::Event;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::coordinator::DeviceCoordinator;
use crate::error::CoreError;
use crate::holidays::HolidaySet;
use crate::link::Connector;

const TIME_FORMAT: &str = "%H:%M";

// ── Clock ────────────────────────────────────────────────────────────

/// Source of local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Shared inputs for every schedule task of a coordinator.
#[derive(Clone)]
pub struct ScheduleContext {
    pub holidays: Arc<HolidaySet>,
    pub clock: Arc<dyn Clock>,
    pub tick: Duration,
}

impl ScheduleContext {
    pub fn new(holidays: HolidaySet) -> Self {
        Self {
            holidays: Arc::new(holidays),
            clock: Arc::new(SystemClock),
            tick: Duration::from_secs(60),
        }
    }
}

impl fmt::Debug for ScheduleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleContext")
            .field("holidays", &self.holidays.len())
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

// ── Schedule ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    name: String,
    temperature: f64,
    start: NaiveTime,
    end: NaiveTime,
    days: HashSet<Weekday>,
    on_holidays: bool,
}

impl Schedule {
    pub fn new(
        name: impl Into<String>,
        temperature: f64,
        start: &str,
        end: &str,
        days: impl IntoIterator<Item = Weekday>,
        on_holidays: bool,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            name: name.into(),
            temperature,
            start: parse_time(start)?,
            end: parse_time(end)?,
            days: days.into_iter().collect(),
            on_holidays,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Whether the schedule runs at all on `date`.
    pub fn is_active_on(&self, date: NaiveDate, holidays: &HolidaySet) -> bool {
        if holidays.contains(date) && !self.on_holidays {
            return false;
        }
        self.days.contains(&date.weekday())
    }

    /// The boundary that falls on the minute of `now`, if any. Start wins
    /// when start and end coincide.
    pub fn boundary_at(&self, now: NaiveDateTime, holidays: &HolidaySet) -> Option<Boundary> {
        if !self.is_active_on(now.date(), holidays) {
            return None;
        }
        let minute = NaiveTime::from_hms_opt(now.hour(), now.minute(), 0)?;
        if minute == self.start {
            Some(Boundary::Start)
        } else if minute == self.end {
            Some(Boundary::End)
        } else {
            None
        }
    }

    /// Command pair for a boundary. The end sequence re-enables heating
    /// before restoring the base setpoint.
    pub fn commands(&self, boundary: Boundary, base_temperature: f64) -> [Event; 2] {
        match boundary {
            Boundary::Start => [Event::target(self.temperature), Event::heating(true)],
            Boundary::End => [Event::heating(true), Event::target(base_temperature)],
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}, {}°C",
            self.start.format(TIME_FORMAT),
            self.end.format(TIME_FORMAT),
            self.temperature
        )
    }
}

fn parse_time(value: &str) -> Result<NaiveTime, CoreError> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT).map_err(|_| CoreError::InvalidTime {
        value: value.to_owned(),
    })
}

// ── Task ─────────────────────────────────────────────────────────────

pub(crate) async fn schedule_task<C: Connector>(
    coordinator: DeviceCoordinator<C>,
    schedule: Schedule,
    ctx: ScheduleContext,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(ctx.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_fired: Option<NaiveDateTime> = None;

    debug!(schedule = schedule.name(), "schedule task started");

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let now = ctx.clock.now();
        let Some(boundary) = schedule.boundary_at(now, &ctx.holidays) else {
            continue;
        };

        // One firing per boundary minute, however short the tick.
        let minute = now.with_second(0).and_then(|t| t.with_nanosecond(0));
        if minute.is_some() && minute == last_fired {
            continue;
        }
        last_fired = minute;

        info!(schedule = schedule.name(), ?boundary, "schedule boundary reached");
        let base = coordinator.base_temperature().value();
        for event in schedule.commands(boundary, base) {
            coordinator.send_device_command(event).await;
        }
    }

    debug!(schedule = schedule.name(), "schedule task stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn at(date: (i32, u32, u32), time: (u32, u32)) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_hms_opt(time.0, time.1, 0)
            .unwrap()
    }

    fn monday_schedule() -> Schedule {
        Schedule::new("Morning", 23.0, "07:00", "22:00", [Weekday::Mon], false).unwrap()
    }

    // 2026-01-05 is a Monday.
    const MONDAY: (i32, u32, u32) = (2026, 1, 5);

    #[test]
    fn fires_start_on_active_day() {
        let schedule = monday_schedule();
        let holidays = HolidaySet::new();
        assert_eq!(schedule.boundary_at(at(MONDAY, (7, 0)), &holidays), Some(Boundary::Start));
        assert_eq!(
            schedule.commands(Boundary::Start, 20.0),
            [Event::target(23.0), Event::heating(true)]
        );
    }

    #[test]
    fn next_minute_does_nothing() {
        let schedule = monday_schedule();
        assert_eq!(schedule.boundary_at(at(MONDAY, (7, 1)), &HolidaySet::new()), None);
    }

    #[test]
    fn seconds_within_the_minute_still_match() {
        let schedule = monday_schedule();
        let now = NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(7, 0, 42)
            .unwrap();
        assert_eq!(schedule.boundary_at(now, &HolidaySet::new()), Some(Boundary::Start));
    }

    #[test]
    fn holiday_monday_is_skipped() {
        let schedule = monday_schedule();
        let holidays: HolidaySet = [NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()]
            .into_iter()
            .collect();
        assert_eq!(schedule.boundary_at(at(MONDAY, (7, 0)), &holidays), None);
    }

    #[test]
    fn holiday_counts_when_enabled() {
        let schedule = Schedule::new("Always", 22.0, "07:00", "22:00", [Weekday::Mon], true).unwrap();
        let holidays: HolidaySet = [NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()]
            .into_iter()
            .collect();
        assert_eq!(schedule.boundary_at(at(MONDAY, (7, 0)), &holidays), Some(Boundary::Start));
    }

    #[test]
    fn inactive_weekday_is_skipped() {
        let schedule = monday_schedule();
        // Tuesday
        assert_eq!(schedule.boundary_at(at((2026, 1, 6), (7, 0)), &HolidaySet::new()), None);
    }

    #[test]
    fn end_sequence_heats_then_restores_base() {
        let schedule = monday_schedule();
        assert_eq!(schedule.boundary_at(at(MONDAY, (22, 0)), &HolidaySet::new()), Some(Boundary::End));
        assert_eq!(
            schedule.commands(Boundary::End, 19.5),
            [Event::heating(true), Event::target(19.5)]
        );
    }

    #[test]
    fn start_wins_when_boundaries_coincide() {
        let schedule = Schedule::new("Same", 21.0, "08:00", "08:00", [Weekday::Mon], false).unwrap();
        assert_eq!(schedule.boundary_at(at(MONDAY, (8, 0)), &HolidaySet::new()), Some(Boundary::Start));
    }

    #[test]
    fn malformed_times_are_rejected() {
        for bad in ["7", "25:00", "07:60", "seven"] {
            let err = Schedule::new("Bad", 20.0, bad, "22:00", [Weekday::Mon], false).unwrap_err();
            assert!(matches!(err, CoreError::InvalidTime { .. }), "{bad} accepted");
        }
    }

    #[test]
    fn display_summarises_window() {
        assert_eq!(monday_schedule().to_string(), "07:00 - 22:00, 23°C");
    }
}
