//! Local-calendar building blocks shared by the expander and the schedule.
//!
//! Recurrence arithmetic happens on wall-clock components in a caller-chosen
//! timezone; this module owns the handful of types and helpers that translate
//! between those components and UTC instants.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
    Weekday,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

// ── Day of week ─────────────────────────────────────────────────────────────

/// A weekday as the backend spells it (`"MONDAY"` .. `"SUNDAY"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    /// Parse a two-letter iCalendar weekday code (`MO`, `TU`, ...).
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "MO" => Some(DayOfWeek::Monday),
            "TU" => Some(DayOfWeek::Tuesday),
            "WE" => Some(DayOfWeek::Wednesday),
            "TH" => Some(DayOfWeek::Thursday),
            "FR" => Some(DayOfWeek::Friday),
            "SA" => Some(DayOfWeek::Saturday),
            "SU" => Some(DayOfWeek::Sunday),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "MO",
            DayOfWeek::Tuesday => "TU",
            DayOfWeek::Wednesday => "WE",
            DayOfWeek::Thursday => "TH",
            DayOfWeek::Friday => "FR",
            DayOfWeek::Saturday => "SA",
            DayOfWeek::Sunday => "SU",
        }
    }

    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl From<DayOfWeek> for Weekday {
    fn from(day: DayOfWeek) -> Self {
        match day {
            DayOfWeek::Monday => Weekday::Mon,
            DayOfWeek::Tuesday => Weekday::Tue,
            DayOfWeek::Wednesday => Weekday::Wed,
            DayOfWeek::Thursday => Weekday::Thu,
            DayOfWeek::Friday => Weekday::Fri,
            DayOfWeek::Saturday => Weekday::Sat,
            DayOfWeek::Sunday => Weekday::Sun,
        }
    }
}

// ── Configurable week start ─────────────────────────────────────────────────

/// Which day begins a week when a WEEKLY rule with `BYDAY` rolls over into its
/// next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStartDay {
    /// ISO 8601 convention.
    Monday,
    /// The convention of the mobile calendar grid.
    #[default]
    Sunday,
}

/// How many days `day` is from the week-start day.
pub fn days_from_week_start(day: DayOfWeek, week_start: WeekStartDay) -> i64 {
    let weekday: Weekday = day.into();
    match week_start {
        WeekStartDay::Monday => weekday.num_days_from_monday() as i64,
        WeekStartDay::Sunday => weekday.num_days_from_sunday() as i64,
    }
}

// ── DST handling ────────────────────────────────────────────────────────────

/// Policy for generated wall-clock times that do not exist in the timezone
/// (the hour skipped by a spring-forward transition).
///
/// Ambiguous wall-clock times (fall-back) always resolve to the earlier instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DstPolicy {
    /// Drop the occurrence.
    Skip,
    /// Move the occurrence one hour later, past the gap.
    #[default]
    ShiftForward,
}

/// Resolve a local wall-clock datetime in `tz` to a UTC instant.
///
/// Returns `None` only when the time falls in a DST gap and the policy is
/// [`DstPolicy::Skip`].
pub fn resolve_local(tz: &Tz, local: NaiveDateTime, policy: DstPolicy) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => match policy {
            DstPolicy::Skip => None,
            DstPolicy::ShiftForward => tz
                .from_local_datetime(&(local + Duration::hours(1)))
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
        },
    }
}

/// Local midnight at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

/// The last representable second of `date` (23:59:59), used for inclusive limits.
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default())
}
