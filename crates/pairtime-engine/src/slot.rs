//! Wall-clock times and free slots scoped to a single calendar day.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

const MINUTES_PER_DAY: u16 = 24 * 60;

/// A time of day with minute precision, written `"HH:MM"`.
///
/// `"24:00"` is accepted as the end of the day so that a slot can run up to
/// midnight; it is never a valid slot start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WallTime(u16);

impl WallTime {
    pub const MIDNIGHT: WallTime = WallTime(0);
    pub const END_OF_DAY: WallTime = WallTime(MINUTES_PER_DAY);

    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        let total = hour.checked_mul(60).and_then(|h| h.checked_add(minute));
        match total {
            Some(total) if minute < 60 && total <= u32::from(MINUTES_PER_DAY) => Ok(Self(total as u16)),
            _ => Err(EngineError::InvalidTime(format!("{hour:02}:{minute:02}"))),
        }
    }

    /// Build from minutes since midnight, `0..=1440`.
    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes <= MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }
}

impl FromStr for WallTime {
    type Err = EngineError;

    /// Parses `HH:MM`, tolerating a trailing `:SS` which is truncated.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || EngineError::InvalidTime(format!("expected HH:MM, got '{s}'"));
        let mut parts = s.trim().split(':');
        let (Some(h), Some(m)) = (parts.next(), parts.next()) else {
            return Err(invalid());
        };
        if let Some(sec) = parts.next() {
            if sec.len() != 2 || !sec.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
        }
        if parts.next().is_some()
            || !(1..=2).contains(&h.len())
            || m.len() != 2
            || !h.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let hour: u32 = h.parse().map_err(|_| invalid())?;
        let minute: u32 = m.parse().map_err(|_| invalid())?;
        WallTime::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for WallTime {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<WallTime> for String {
    fn from(value: WallTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// A contiguous free block within one day. Always `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSlot")]
pub struct FreeSlot {
    start: WallTime,
    end: WallTime,
}

#[derive(Deserialize)]
struct RawSlot {
    start: WallTime,
    end: WallTime,
}

impl TryFrom<RawSlot> for FreeSlot {
    type Error = EngineError;

    fn try_from(raw: RawSlot) -> Result<Self> {
        FreeSlot::new(raw.start, raw.end)
    }
}

impl FreeSlot {
    pub fn new(start: WallTime, end: WallTime) -> Result<Self> {
        if start >= end {
            return Err(EngineError::InvalidTime(format!(
                "slot must start before it ends: {start}-{end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse a pair of `"HH:MM"` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(start.parse()?, end.parse()?)
    }

    pub fn start(&self) -> WallTime {
        self.start
    }

    pub fn end(&self) -> WallTime {
        self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        i64::from(self.end.minutes()) - i64::from(self.start.minutes())
    }

    /// The shared part of two slots, if any. Touching slots do not overlap.
    pub fn overlap(&self, other: &FreeSlot) -> Option<FreeSlot> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        FreeSlot::new(start, end).ok()
    }
}

impl fmt::Display for FreeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
