//! Recurring event → concrete occurrence instants inside a window.
//!
//! Generation walks a cursor over local wall-clock components (year, month,
//! day, time) in [`ExpandOptions::timezone`] rather than over UTC instants, so
//! an 18:00 dinner stays at 18:00 across DST changes and month lengths. Each
//! candidate is converted to a UTC instant only when it is emitted.
//!
//! Expansion is bounded three ways: the rule's `UNTIL`, the window end, and
//! `today + horizon_years`. Independently, at most
//! [`ExpandOptions::max_iterations`] cursor positions are visited; hitting
//! that cap stops generation and sets [`Expansion::truncated`].

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::calendar::{
    days_from_week_start, end_of_day, resolve_local, DayOfWeek, DstPolicy, WeekStartDay,
};
use crate::event::RecurringEvent;
use crate::rule::{Frequency, RecurrenceRule};

pub const DEFAULT_MAX_ITERATIONS: usize = 1000;
pub const DEFAULT_HORIZON_YEARS: u32 = 2;

/// Knobs for [`expand`].
///
/// There is no `Default`: the caller must say what "today" is, which keeps
/// expansion free of clock access and reproducible in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandOptions {
    /// Anchor for the absolute ceiling `today + horizon_years`.
    pub today: NaiveDate,
    pub horizon_years: u32,
    pub max_iterations: usize,
    /// Zone whose wall-clock components the cursor walks.
    pub timezone: Tz,
    pub week_start: WeekStartDay,
    pub dst_policy: DstPolicy,
}

impl ExpandOptions {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            horizon_years: DEFAULT_HORIZON_YEARS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            timezone: Tz::UTC,
            week_start: WeekStartDay::default(),
            dst_policy: DstPolicy::default(),
        }
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_horizon_years(mut self, horizon_years: u32) -> Self {
        self.horizon_years = horizon_years;
        self
    }

    pub fn with_week_start(mut self, week_start: WeekStartDay) -> Self {
        self.week_start = week_start;
        self
    }

    pub fn with_dst_policy(mut self, dst_policy: DstPolicy) -> Self {
        self.dst_policy = dst_policy;
        self
    }
}

/// The outcome of one expansion.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expansion {
    /// Strictly increasing occurrence start instants.
    pub occurrences: Vec<DateTime<Utc>>,
    /// Cursor positions visited.
    pub iterations: usize,
    /// `true` when the iteration cap stopped generation before the limit.
    pub truncated: bool,
}

impl Expansion {
    fn passthrough(start: DateTime<Utc>) -> Self {
        Self {
            occurrences: vec![start],
            iterations: 0,
            truncated: false,
        }
    }
}

/// One materialized occurrence with its end time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ExpandedEvent {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Expand `event` into its occurrence start instants within
/// `[window_start, window_end]`.
///
/// Non-recurring events, and events whose pattern is missing or cannot be
/// parsed, yield exactly their original start regardless of the window.
/// Occurrences whose UTC date is listed in `exception_dates` are omitted.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, TimeZone, Utc};
/// use pairtime_engine::{expand, ExpandOptions, RecurringEvent};
///
/// let start = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
/// let event = RecurringEvent::recurring(start, start + chrono::TimeDelta::hours(1), "FREQ=DAILY");
/// let options = ExpandOptions::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
///
/// let window_end = Utc.with_ymd_and_hms(2025, 1, 10, 23, 59, 59).unwrap();
/// let expansion = expand(&event, start, window_end, &options);
/// assert_eq!(expansion.occurrences.len(), 10);
/// assert!(!expansion.truncated);
/// ```
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(
        pattern = ?event.recurrence_pattern,
        window_start = %window_start,
        window_end = %window_end
    )
)]
pub fn expand(
    event: &RecurringEvent,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    options: &ExpandOptions,
) -> Expansion {
    let rule = match event.rule() {
        None => return Expansion::passthrough(event.start_date_time),
        Some(Err(err)) => {
            tracing::debug!(error = %err, "Unparseable recurrence rule, treating as single occurrence");
            return Expansion::passthrough(event.start_date_time);
        }
        Some(Ok(rule)) => rule,
    };
    expand_rule(event, &rule, window_start, window_end, options)
}

/// Like [`expand`], but pairs each occurrence start with its end
/// (`start + (end_date_time - start_date_time)`).
pub fn expand_instances(
    event: &RecurringEvent,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    options: &ExpandOptions,
) -> Vec<ExpandedEvent> {
    let duration = event.duration();
    expand(event, window_start, window_end, options)
        .occurrences
        .into_iter()
        .map(|start| ExpandedEvent {
            start,
            end: start + duration,
        })
        .collect()
}

fn expand_rule(
    event: &RecurringEvent,
    rule: &RecurrenceRule,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    options: &ExpandOptions,
) -> Expansion {
    let tz = &options.timezone;
    let mut cursor = anchor(event.start_date_time.with_timezone(tz).naive_local(), rule);
    let limit = Cursor::from_local(stop_limit(rule, window_end, options));
    let week_offsets = week_offsets(rule, options.week_start);

    let mut expansion = Expansion::default();

    while cursor <= limit {
        if expansion.iterations >= options.max_iterations {
            expansion.truncated = true;
            tracing::warn!(
                iterations = expansion.iterations,
                occurrences = expansion.occurrences.len(),
                rule = %rule,
                "Iteration cap reached, expansion truncated"
            );
            break;
        }
        expansion.iterations += 1;

        if let Some(local) = cursor.local().filter(|_| satisfies(rule, &cursor)) {
            match resolve_local(tz, local, options.dst_policy) {
                Some(instant)
                    if instant >= window_start
                        && instant <= window_end
                        && !event.is_exception(instant) =>
                {
                    tracing::trace!(%instant, "Occurrence");
                    expansion.occurrences.push(instant);
                }
                Some(_) => {}
                None => tracing::debug!(%local, "Occurrence falls in DST gap, skipped"),
            }
        }

        cursor = match advance(rule, cursor, options.week_start, &week_offsets) {
            Some(next) => next,
            None => break,
        };
    }

    expansion
}

/// Where generation starts: the event's local start, with MONTHLY/YEARLY
/// month and day pinned to the rule's filters when it has them.
fn anchor(local: NaiveDateTime, rule: &RecurrenceRule) -> Cursor {
    let mut cursor = Cursor::from_local(local);
    match rule.frequency {
        Frequency::Monthly => {
            if let Some(day) = rule.by_month_day {
                cursor.day = day;
            }
        }
        Frequency::Yearly => {
            if let Some(month) = rule.by_month {
                cursor.month = month;
            }
            if let Some(day) = rule.by_month_day {
                cursor.day = day;
            }
        }
        Frequency::Daily | Frequency::Weekly => {}
    }
    cursor
}

/// `min(UNTIL 23:59:59, window_end, today + horizon 23:59:59)` in local time.
fn stop_limit(
    rule: &RecurrenceRule,
    window_end: DateTime<Utc>,
    options: &ExpandOptions,
) -> NaiveDateTime {
    let horizon = options
        .today
        .checked_add_months(Months::new(options.horizon_years.saturating_mul(12)))
        .unwrap_or(NaiveDate::MAX);

    let mut limit = end_of_day(horizon).min(window_end.with_timezone(&options.timezone).naive_local());
    if let Some(until) = rule.until {
        limit = limit.min(end_of_day(until));
    }
    limit
}

/// Sorted positions of the rule's `BYDAY` weekdays within a week.
fn week_offsets(rule: &RecurrenceRule, week_start: WeekStartDay) -> Vec<i64> {
    let mut offsets: Vec<i64> = rule
        .by_weekday
        .iter()
        .map(|day| days_from_week_start(*day, week_start))
        .collect();
    offsets.sort_unstable();
    offsets
}

fn satisfies(rule: &RecurrenceRule, cursor: &Cursor) -> bool {
    let Some(date) = cursor.date() else {
        return false;
    };
    match rule.frequency {
        Frequency::Weekly if !rule.by_weekday.is_empty() => {
            rule.by_weekday.contains(&DayOfWeek::of(date))
        }
        Frequency::Monthly => rule.by_month_day.map_or(true, |day| date.day() == day),
        Frequency::Yearly => match (rule.by_month, rule.by_month_day) {
            (Some(month), Some(day)) => date.month() == month && date.day() == day,
            _ => true,
        },
        Frequency::Daily | Frequency::Weekly => true,
    }
}

fn advance(
    rule: &RecurrenceRule,
    cursor: Cursor,
    week_start: WeekStartDay,
    week_offsets: &[i64],
) -> Option<Cursor> {
    let interval = rule.interval.max(1);
    match rule.frequency {
        Frequency::Daily => cursor.add_days(i64::from(interval)),
        Frequency::Weekly => {
            let Some(&first) = week_offsets.first() else {
                return cursor.add_days(7 * i64::from(interval));
            };
            let position = days_from_week_start(DayOfWeek::of(cursor.date()?), week_start);
            match week_offsets.iter().find(|&&offset| offset > position) {
                Some(next) => cursor.add_days(next - position),
                // Last allowed weekday of this cycle: skip to the first one `interval` weeks on.
                None => cursor.add_days(7 * i64::from(interval) - position + first),
            }
        }
        Frequency::Monthly => {
            let mut next = cursor.add_months(interval)?;
            if let Some(day) = rule.by_month_day {
                next.day = day;
            }
            Some(next)
        }
        Frequency::Yearly => {
            let mut next = cursor.add_years(interval)?;
            if let Some(month) = rule.by_month {
                next.month = month;
            }
            if let Some(day) = rule.by_month_day {
                next.day = day;
            }
            Some(next)
        }
    }
}

/// Local calendar position. The day may not exist in its month (31 April);
/// such positions order correctly but never produce an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Cursor {
    year: i32,
    month: u32,
    day: u32,
    time: NaiveTime,
}

impl Cursor {
    fn from_local(local: NaiveDateTime) -> Self {
        Self {
            year: local.year(),
            month: local.month(),
            day: local.day(),
            time: local.time(),
        }
    }

    fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    fn local(&self) -> Option<NaiveDateTime> {
        self.date().map(|date| date.and_time(self.time))
    }

    fn add_days(self, days: i64) -> Option<Self> {
        let date = self.date()?.checked_add_signed(chrono::TimeDelta::try_days(days)?)?;
        Some(Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
            time: self.time,
        })
    }

    /// Month arithmetic on components only; the day is carried unchanged.
    fn add_months(self, months: u32) -> Option<Self> {
        let index = i64::from(self.year) * 12 + i64::from(self.month - 1) + i64::from(months);
        Some(Self {
            year: i32::try_from(index.div_euclid(12)).ok()?,
            month: u32::try_from(index.rem_euclid(12)).ok()? + 1,
            ..self
        })
    }

    fn add_years(self, years: u32) -> Option<Self> {
        Some(Self {
            year: self.year.checked_add(i32::try_from(years).ok()?)?,
            ..self
        })
    }
}
