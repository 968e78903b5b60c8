//! Weekly availability schedule + existing events → per-day free slots.
//!
//! A schedule gives, for each weekday, whether the person is available and the
//! wall-clock window they are available in. A day's free slots are that window
//! minus every event occurrence overlapping the day, clipped to local midnight
//! on both ends.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::availability::DayAvailability;
use crate::calendar::{end_of_day, resolve_local, start_of_day, DayOfWeek, DstPolicy};
use crate::error::{EngineError, Result};
use crate::event::RecurringEvent;
use crate::expander::{expand_instances, ExpandOptions, ExpandedEvent};
use crate::slot::{FreeSlot, WallTime};

/// Availability for one weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub enabled: bool,
    pub start_time: WallTime,
    pub end_time: WallTime,
}

/// Seven entries keyed `MONDAY`..`SUNDAY`. Missing weekdays are unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeeklySchedule {
    days: BTreeMap<DayOfWeek, DaySchedule>,
}

impl WeeklySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `day` available between `start` and `end`.
    pub fn with_day(mut self, day: DayOfWeek, start: WallTime, end: WallTime) -> Self {
        self.days.insert(
            day,
            DaySchedule {
                enabled: true,
                start_time: start,
                end_time: end,
            },
        );
        self
    }

    pub fn get(&self, day: DayOfWeek) -> Option<&DaySchedule> {
        self.days.get(&day)
    }

    /// The available window for `day`, if it is enabled and non-empty.
    pub fn window(&self, day: DayOfWeek) -> Option<FreeSlot> {
        let entry = self.days.get(&day).filter(|d| d.enabled)?;
        FreeSlot::new(entry.start_time, entry.end_time).ok()
    }

    /// Reject enabled days whose window is empty or inverted.
    pub fn validate(&self) -> Result<()> {
        for (day, entry) in &self.days {
            if entry.enabled && entry.start_time >= entry.end_time {
                return Err(EngineError::InvalidSchedule(format!(
                    "{day:?}: startTime {} is not before endTime {}",
                    entry.start_time, entry.end_time
                )));
            }
        }
        Ok(())
    }
}

/// Free slots on `date`: the schedule window minus `busy`, in `tz` wall time.
///
/// Returns `None` when the weekday is not available at all. A day that is
/// available but fully booked yields `Some` with no slots.
pub fn day_availability(
    schedule: &WeeklySchedule,
    date: NaiveDate,
    busy: &[ExpandedEvent],
    tz: &Tz,
) -> Option<DayAvailability> {
    let window = schedule.window(DayOfWeek::of(date))?;
    let midnight = start_of_day(date);

    let blocks: Vec<(u16, u16)> = busy
        .iter()
        .filter_map(|event| clip_to_day(event, midnight, tz))
        .collect();

    Some(DayAvailability::new(date, subtract(window, blocks)))
}

/// Per-day availability for every date in `[from, to]`.
///
/// Each event is expanded over the range (plus the preceding day, so an
/// overnight occurrence still blocks the early hours of `from`).
pub fn free_days(
    schedule: &WeeklySchedule,
    events: &[RecurringEvent],
    from: NaiveDate,
    to: NaiveDate,
    options: &ExpandOptions,
) -> Vec<DayAvailability> {
    if to < from {
        return Vec::new();
    }
    let tz = &options.timezone;
    let lead_in = from.pred_opt().unwrap_or(from);
    let window_start = local_to_utc(tz, start_of_day(lead_in));
    let window_end = local_to_utc(tz, end_of_day(to));

    let busy: Vec<ExpandedEvent> = events
        .iter()
        .flat_map(|event| expand_instances(event, window_start, window_end, options))
        .collect();
    tracing::debug!(
        events = events.len(),
        occurrences = busy.len(),
        %from,
        %to,
        "Computing free days"
    );

    from.iter_days()
        .take_while(|date| *date <= to)
        .filter_map(|date| day_availability(schedule, date, &busy, tz))
        .collect()
}

fn local_to_utc(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    resolve_local(tz, local, DstPolicy::ShiftForward).unwrap_or_else(|| local.and_utc())
}

/// The part of `event` inside the local day starting at `midnight`, as
/// minutes since midnight. End minutes round up.
fn clip_to_day(event: &ExpandedEvent, midnight: NaiveDateTime, tz: &Tz) -> Option<(u16, u16)> {
    const DAY_SECONDS: i64 = 24 * 60 * 60;

    let offset = |instant: DateTime<Utc>| {
        (instant.with_timezone(tz).naive_local() - midnight)
            .num_seconds()
            .clamp(0, DAY_SECONDS)
    };
    let start = offset(event.start) / 60;
    let end = (offset(event.end) + 59) / 60;

    (start < end).then(|| (start as u16, end as u16))
}

/// `window` minus the union of `blocks`. Touching blocks merge; no
/// zero-length slot is produced.
fn subtract(window: FreeSlot, mut blocks: Vec<(u16, u16)>) -> Vec<FreeSlot> {
    blocks.sort_unstable();

    let window_end = window.end().minutes();
    let mut cursor = window.start().minutes();
    let mut free = Vec::new();

    for (start, end) in blocks {
        if start >= window_end {
            break;
        }
        if end <= cursor {
            continue;
        }
        if start > cursor {
            free.extend(slot_from_minutes(cursor, start));
        }
        cursor = end;
    }
    if cursor < window_end {
        free.extend(slot_from_minutes(cursor, window_end));
    }
    free
}

fn slot_from_minutes(start: u16, end: u16) -> Option<FreeSlot> {
    FreeSlot::new(WallTime::from_minutes(start)?, WallTime::from_minutes(end)?).ok()
}
