//! Recurrence rule strings → typed [`RecurrenceRule`].
//!
//! The backend stores rules as semicolon-separated `KEY=VALUE` pairs, e.g.
//! `FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE,FR;UNTIL=20251231`. Recognized keys are
//! `FREQ`, `INTERVAL`, `BYDAY`, `BYMONTHDAY`, `BYMONTH` and `UNTIL`; anything
//! else is ignored.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::DayOfWeek;
use crate::error::EngineError;

/// Unit the cursor advances by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl FromStr for Frequency {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            "YEARLY" => Ok(Frequency::Yearly),
            other => Err(EngineError::InvalidRule(format!("unknown FREQ '{other}'"))),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        };
        f.write_str(s)
    }
}

/// A parsed recurrence rule.
///
/// Absent filters mean "unconstrained": a WEEKLY rule with an empty
/// `by_weekday` repeats on the anchor's own weekday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Always at least 1.
    pub interval: u32,
    pub by_weekday: BTreeSet<DayOfWeek>,
    pub by_month_day: Option<u32>,
    pub by_month: Option<u32>,
    /// Inclusive through 23:59:59 local time.
    pub until: Option<NaiveDate>,
}

impl RecurrenceRule {
    /// A rule with the given frequency and no filters.
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            by_weekday: BTreeSet::new(),
            by_month_day: None,
            by_month: None,
            until: None,
        }
    }

    pub fn interval(mut self, interval: u32) -> Self {
        self.interval = interval.max(1);
        self
    }

    pub fn on_weekdays(mut self, days: impl IntoIterator<Item = DayOfWeek>) -> Self {
        self.by_weekday = days.into_iter().collect();
        self
    }

    pub fn on_month_day(mut self, day: u32) -> Self {
        self.by_month_day = Some(day);
        self
    }

    pub fn in_month(mut self, month: u32) -> Self {
        self.by_month = Some(month);
        self
    }

    pub fn until(mut self, until: NaiveDate) -> Self {
        self.until = Some(until);
        self
    }
}

impl FromStr for RecurrenceRule {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.trim();
        let body = body
            .strip_prefix("RRULE:")
            .or_else(|| body.strip_prefix("rrule:"))
            .unwrap_or(body);

        let mut frequency = None;
        let mut rule = RecurrenceRule::new(Frequency::Daily);

        for token in body.split(';') {
            let Some((key, value)) = token.split_once('=') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_ascii_uppercase().as_str() {
                "FREQ" => frequency = Some(value.parse::<Frequency>()?),
                "INTERVAL" => {
                    rule.interval = value.parse::<u32>().ok().filter(|n| *n > 0).unwrap_or(1);
                }
                "BYDAY" => {
                    rule.by_weekday = value.split(',').filter_map(DayOfWeek::from_code).collect();
                }
                "BYMONTHDAY" => rule.by_month_day = Some(parse_ranged(key, value, 1..=31)?),
                "BYMONTH" => rule.by_month = Some(parse_ranged(key, value, 1..=12)?),
                "UNTIL" => rule.until = Some(parse_until(value)?),
                _ => {}
            }
        }

        rule.frequency = frequency
            .ok_or_else(|| EngineError::InvalidRule(format!("missing FREQ in '{s}'")))?;
        Ok(rule)
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={};INTERVAL={}", self.frequency, self.interval)?;
        if !self.by_weekday.is_empty() {
            let codes: Vec<&str> = self.by_weekday.iter().map(|d| d.code()).collect();
            write!(f, ";BYDAY={}", codes.join(","))?;
        }
        if let Some(day) = self.by_month_day {
            write!(f, ";BYMONTHDAY={day}")?;
        }
        if let Some(month) = self.by_month {
            write!(f, ";BYMONTH={month}")?;
        }
        if let Some(until) = self.until {
            write!(f, ";UNTIL={}", until.format("%Y%m%d"))?;
        }
        Ok(())
    }
}

fn parse_ranged(
    key: &str,
    value: &str,
    range: std::ops::RangeInclusive<u32>,
) -> Result<u32, EngineError> {
    value
        .parse::<u32>()
        .ok()
        .filter(|n| range.contains(n))
        .ok_or_else(|| {
            EngineError::InvalidRule(format!(
                "{} must be in {}..={}, got '{value}'",
                key.trim(),
                range.start(),
                range.end()
            ))
        })
}

/// `UNTIL` is exactly eight digits, `YYYYMMDD`.
fn parse_until(value: &str) -> Result<NaiveDate, EngineError> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EngineError::InvalidRule(format!(
            "UNTIL must be YYYYMMDD, got '{value}'"
        )));
    }
    let field = |range: std::ops::Range<usize>| value[range].parse::<u32>().unwrap_or(0);
    NaiveDate::from_ymd_opt(field(0..4) as i32, field(4..6), field(6..8))
        .ok_or_else(|| EngineError::InvalidRule(format!("UNTIL '{value}' is not a calendar date")))
}
