//! Event records as the backend delivers them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::rule::RecurrenceRule;

/// A calendar event, possibly recurring.
///
/// Field names follow the backend JSON (`startDateTime`, `isRecurring`, ...).
/// The rule stays a raw string here so that a malformed pattern never prevents
/// the rest of the record from loading; [`RecurringEvent::rule`] parses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringEvent {
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurrence_pattern: Option<String>,
    #[serde(default)]
    pub exception_dates: Vec<ExceptionDate>,
}

impl RecurringEvent {
    /// A one-off event.
    pub fn single(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start_date_time: start,
            end_date_time: end,
            is_recurring: false,
            recurrence_pattern: None,
            exception_dates: Vec::new(),
        }
    }

    /// A recurring event with the given rule string.
    pub fn recurring(start: DateTime<Utc>, end: DateTime<Utc>, pattern: impl Into<String>) -> Self {
        Self {
            is_recurring: true,
            recurrence_pattern: Some(pattern.into()),
            ..Self::single(start, end)
        }
    }

    pub fn with_exception(mut self, date: NaiveDate) -> Self {
        self.exception_dates.push(ExceptionDate(date));
        self
    }

    /// `end - start`; every occurrence keeps this length.
    pub fn duration(&self) -> TimeDelta {
        self.end_date_time - self.start_date_time
    }

    /// The parsed recurrence rule.
    ///
    /// `None` when the event is not recurring or carries no pattern;
    /// `Some(Err(_))` when the pattern is present but unparseable.
    pub fn rule(&self) -> Option<Result<RecurrenceRule>> {
        if !self.is_recurring {
            return None;
        }
        let pattern = self.recurrence_pattern.as_deref()?.trim();
        if pattern.is_empty() {
            return None;
        }
        Some(pattern.parse())
    }

    /// Whether `instant` falls on one of the deleted dates (UTC day granularity).
    pub fn is_exception(&self, instant: DateTime<Utc>) -> bool {
        let day = instant.date_naive();
        self.exception_dates.iter().any(|ex| ex.0 == day)
    }
}

/// A deleted occurrence, normalized to its UTC calendar date.
///
/// Accepts `YYYY-MM-DD`, RFC 3339, or a bare `YYYY-MM-DDTHH:MM:SS` (read as
/// UTC). Serializes back as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExceptionDate(pub NaiveDate);

impl FromStr for ExceptionDate {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self(date));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self(dt.with_timezone(&Utc).date_naive()));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Self(naive.date()))
            .map_err(|e| EngineError::InvalidDate(format!("'{s}': {e}")))
    }
}

impl TryFrom<String> for ExceptionDate {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ExceptionDate> for String {
    fn from(value: ExceptionDate) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ExceptionDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}
