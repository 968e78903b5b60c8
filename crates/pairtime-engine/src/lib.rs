//! # pairtime-engine
//!
//! Deterministic calendar computation for a shared couples' calendar.
//!
//! The engine turns backend event records into concrete occurrences, derives
//! each person's per-day free time from a weekly schedule, and intersects two
//! people's free time into mutual availability. Everything is a pure function
//! over its inputs: no clock access, no I/O, no shared state.
//!
//! ## Modules
//!
//! - [`rule`] — Recurrence rule string → [`RecurrenceRule`]
//! - [`event`] — Backend event records and exception dates
//! - [`expander`] — Recurring event → occurrence instants within a window
//! - [`calendar`] — Weekdays, week start, DST policy, local ↔ UTC resolution
//! - [`slot`] — `"HH:MM"` wall-clock times and free slots
//! - [`schedule`] — Weekly schedule + events → per-day free slots
//! - [`availability`] — Mutual free time of two people
//! - [`error`] — Error types

pub mod availability;
pub mod calendar;
pub mod error;
pub mod event;
pub mod expander;
pub mod rule;
pub mod schedule;
pub mod slot;

pub use availability::{
    find_first_mutual_slot, intersect, summarize, DayAvailability, MutualDayAvailability,
    MutualSummary,
};
pub use calendar::{DayOfWeek, DstPolicy, WeekStartDay};
pub use error::EngineError;
pub use event::{ExceptionDate, RecurringEvent};
pub use expander::{expand, expand_instances, ExpandOptions, ExpandedEvent, Expansion};
pub use rule::{Frequency, RecurrenceRule};
pub use schedule::{day_availability, free_days, DaySchedule, WeeklySchedule};
pub use slot::{FreeSlot, WallTime};
