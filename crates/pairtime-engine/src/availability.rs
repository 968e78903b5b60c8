//! Mutual availability of two people from their per-day free slots.
//!
//! Days are matched by calendar date. For each shared date every slot of one
//! side is compared against every slot of the other; each non-empty overlap
//! becomes a mutual slot. Days without any mutual slot are dropped.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::DayOfWeek;
use crate::slot::FreeSlot;

/// One person's free time on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub day_of_week: DayOfWeek,
    #[serde(default)]
    pub free_slots: Vec<FreeSlot>,
}

impl DayAvailability {
    pub fn new(date: NaiveDate, free_slots: Vec<FreeSlot>) -> Self {
        Self {
            date,
            day_of_week: DayOfWeek::of(date),
            free_slots,
        }
    }
}

/// Time both people have free on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutualDayAvailability {
    pub date: NaiveDate,
    pub day_of_week: DayOfWeek,
    pub mutual_free_slots: Vec<FreeSlot>,
    pub total_mutual_minutes: i64,
}

/// Totals across a set of mutual days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutualSummary {
    pub days_with_overlap: usize,
    pub total_mutual_minutes: i64,
}

/// Intersect two people's availability.
///
/// The result is ordered by date and contains only dates present in both
/// inputs with at least one overlapping slot. Within a day, mutual slots are
/// ordered by start time and exact duplicates are collapsed. Entries sharing a
/// date within one input are treated as a single day.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use pairtime_engine::{intersect, DayAvailability, FreeSlot};
///
/// let date = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
/// let a = vec![DayAvailability::new(date, vec![FreeSlot::parse("09:00", "12:00").unwrap()])];
/// let b = vec![DayAvailability::new(date, vec![
///     FreeSlot::parse("10:00", "11:00").unwrap(),
///     FreeSlot::parse("13:00", "14:00").unwrap(),
/// ])];
///
/// let mutual = intersect(&a, &b);
/// assert_eq!(mutual.len(), 1);
/// assert_eq!(mutual[0].total_mutual_minutes, 60);
/// ```
pub fn intersect(
    days_a: &[DayAvailability],
    days_b: &[DayAvailability],
) -> Vec<MutualDayAvailability> {
    let by_date_b = group_by_date(days_b);

    group_by_date(days_a)
        .into_iter()
        .filter_map(|(date, (day_of_week, slots_a))| {
            let (_, slots_b) = by_date_b.get(&date)?;

            let mut mutual: Vec<FreeSlot> = slots_a
                .iter()
                .flat_map(|a| slots_b.iter().filter_map(move |b| a.overlap(b)))
                .collect();
            if mutual.is_empty() {
                return None;
            }
            mutual.sort_unstable();
            mutual.dedup();

            let total_mutual_minutes = mutual.iter().map(FreeSlot::duration_minutes).sum();
            Some(MutualDayAvailability {
                date,
                day_of_week,
                mutual_free_slots: mutual,
                total_mutual_minutes,
            })
        })
        .collect()
}

/// Number of days with mutual time and the grand total of mutual minutes.
pub fn summarize(days: &[MutualDayAvailability]) -> MutualSummary {
    MutualSummary {
        days_with_overlap: days.iter().filter(|d| !d.mutual_free_slots.is_empty()).count(),
        total_mutual_minutes: days.iter().map(|d| d.total_mutual_minutes).sum(),
    }
}

/// The earliest mutual slot (by date, then start) lasting at least
/// `min_minutes`.
pub fn find_first_mutual_slot(
    days: &[MutualDayAvailability],
    min_minutes: i64,
) -> Option<(NaiveDate, FreeSlot)> {
    days.iter()
        .flat_map(|day| {
            day.mutual_free_slots
                .iter()
                .filter(move |slot| slot.duration_minutes() >= min_minutes)
                .map(move |slot| (day.date, *slot))
        })
        .min()
}

fn group_by_date(days: &[DayAvailability]) -> BTreeMap<NaiveDate, (DayOfWeek, Vec<FreeSlot>)> {
    let mut grouped: BTreeMap<NaiveDate, (DayOfWeek, Vec<FreeSlot>)> = BTreeMap::new();
    for day in days {
        grouped
            .entry(day.date)
            .or_insert_with(|| (day.day_of_week, Vec::new()))
            .1
            .extend(day.free_slots.iter().copied());
    }
    grouped
}
