//! Tests for recurring event expansion.

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use pairtime_engine::{expand, expand_instances, DstPolicy, ExpandOptions, RecurringEvent};

fn utc(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, sec).unwrap()
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// A 90-minute recurring event.
fn recurring(start: DateTime<Utc>, pattern: &str) -> RecurringEvent {
    RecurringEvent::recurring(start, start + TimeDelta::minutes(90), pattern)
}

fn options(today: NaiveDate) -> ExpandOptions {
    ExpandOptions::new(today)
}

#[test]
fn non_recurring_event_passes_through_regardless_of_window() {
    let start = utc(2025, 3, 1, 10, 0, 0);
    let event = RecurringEvent::single(start, start + TimeDelta::hours(1));

    // Window is a year away from the event.
    let result = expand(
        &event,
        utc(2026, 1, 1, 0, 0, 0),
        utc(2026, 1, 31, 23, 59, 59),
        &options(date(2025, 1, 1)),
    );

    assert_eq!(result.occurrences, vec![start]);
    assert!(!result.truncated);
}

#[test]
fn unparseable_rule_falls_back_to_single_occurrence() {
    let start = utc(2025, 3, 1, 10, 0, 0);
    for pattern in ["INTERVAL=2;BYDAY=MO", "FREQ=DAILY;UNTIL=2025-12-31", "FREQ=SECONDLY"] {
        let event = recurring(start, pattern);
        let result = expand(
            &event,
            utc(2025, 3, 1, 0, 0, 0),
            utc(2025, 3, 31, 0, 0, 0),
            &options(date(2025, 3, 1)),
        );
        assert_eq!(result.occurrences, vec![start], "pattern: {pattern}");
    }
}

#[test]
fn daily_rule_yields_one_occurrence_per_day() {
    let event = recurring(utc(2025, 1, 1, 10, 0, 0), "FREQ=DAILY;INTERVAL=1");

    let result = expand(
        &event,
        utc(2025, 1, 1, 0, 0, 0),
        utc(2025, 1, 10, 23, 59, 59),
        &options(date(2025, 1, 1)),
    );

    assert_eq!(result.occurrences.len(), 10, "expected Jan 1..=Jan 10");
    for (i, occurrence) in result.occurrences.iter().enumerate() {
        assert_eq!(*occurrence, utc(2025, 1, 1 + i as u32, 10, 0, 0));
    }
}

#[test]
fn daily_interval_skips_days() {
    let event = recurring(utc(2025, 1, 1, 10, 0, 0), "FREQ=DAILY;INTERVAL=3");

    let result = expand(
        &event,
        utc(2025, 1, 1, 0, 0, 0),
        utc(2025, 1, 10, 23, 59, 59),
        &options(date(2025, 1, 1)),
    );

    let days: Vec<u32> = result.occurrences.iter().map(|d| d.day()).collect();
    assert_eq!(days, vec![1, 4, 7, 10]);
}

#[test]
fn weekly_byday_yields_three_per_week_in_any_two_week_window() {
    // 2025-01-01 is a Wednesday.
    let event = recurring(utc(2025, 1, 1, 18, 0, 0), "FREQ=WEEKLY;INTERVAL=1;BYDAY=MO,WE,FR");

    for first_day in 5..=11 {
        let window_start = utc(2025, 1, first_day, 0, 0, 0);
        let window_end = window_start + TimeDelta::days(14) - TimeDelta::seconds(1);
        let result = expand(&event, window_start, window_end, &options(date(2025, 1, 1)));

        assert_eq!(
            result.occurrences.len(),
            6,
            "window starting Jan {first_day}: {:?}",
            result.occurrences
        );
        for occurrence in &result.occurrences {
            assert!(
                matches!(occurrence.weekday(), Weekday::Mon | Weekday::Wed | Weekday::Fri),
                "{occurrence} is not Mon/Wed/Fri"
            );
        }
    }
}

#[test]
fn weekly_byday_with_interval_skips_alternate_weeks() {
    let event = recurring(utc(2025, 1, 1, 18, 0, 0), "FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE,FR");

    let result = expand(
        &event,
        utc(2025, 1, 1, 0, 0, 0),
        utc(2025, 1, 31, 23, 59, 59),
        &options(date(2025, 1, 1)),
    );

    let days: Vec<u32> = result.occurrences.iter().map(|d| d.day()).collect();
    assert_eq!(days, vec![1, 3, 13, 15, 17, 27, 29, 31]);
}

#[test]
fn weekly_without_byday_repeats_on_anchor_weekday() {
    let event = recurring(utc(2025, 1, 1, 18, 0, 0), "FREQ=WEEKLY");

    let result = expand(
        &event,
        utc(2025, 1, 1, 0, 0, 0),
        utc(2025, 1, 31, 23, 59, 59),
        &options(date(2025, 1, 1)),
    );

    let days: Vec<u32> = result.occurrences.iter().map(|d| d.day()).collect();
    assert_eq!(days, vec![1, 8, 15, 22, 29]);
    assert!(result.occurrences.iter().all(|d| d.weekday() == Weekday::Wed));
}

#[test]
fn until_is_inclusive_through_end_of_day() {
    let event = recurring(utc(2025, 1, 1, 10, 0, 0), "FREQ=DAILY;UNTIL=20250110");

    let result = expand(
        &event,
        utc(2025, 1, 1, 0, 0, 0),
        utc(2025, 1, 31, 0, 0, 0),
        &options(date(2025, 1, 1)),
    );

    assert_eq!(result.occurrences.len(), 10);
    assert_eq!(result.occurrences.last(), Some(&utc(2025, 1, 10, 10, 0, 0)));
}

#[test]
fn until_includes_occurrence_at_last_second() {
    let event = recurring(utc(2025, 1, 1, 23, 59, 59), "FREQ=DAILY;UNTIL=20250105");

    let result = expand(
        &event,
        utc(2025, 1, 1, 0, 0, 0),
        utc(2025, 1, 31, 0, 0, 0),
        &options(date(2025, 1, 1)),
    );

    assert_eq!(result.occurrences.len(), 5);
    assert_eq!(result.occurrences.last(), Some(&utc(2025, 1, 5, 23, 59, 59)));
    assert!(!result.occurrences.contains(&utc(2025, 1, 6, 23, 59, 59)));
}

#[test]
fn exception_date_removes_exactly_one_occurrence() {
    let event = recurring(utc(2025, 1, 1, 18, 0, 0), "FREQ=WEEKLY").with_exception(date(2025, 1, 15));

    let result = expand(
        &event,
        utc(2025, 1, 1, 0, 0, 0),
        utc(2025, 1, 31, 23, 59, 59),
        &options(date(2025, 1, 1)),
    );

    let days: Vec<u32> = result.occurrences.iter().map(|d| d.day()).collect();
    assert_eq!(days, vec![1, 8, 22, 29]);
}

#[test]
fn exception_comparison_ignores_time_of_day() {
    // The exception is stored with a different time than the occurrence.
    let json = r#"{
        "startDateTime": "2025-01-01T18:00:00Z",
        "endDateTime": "2025-01-01T19:30:00Z",
        "isRecurring": true,
        "recurrencePattern": "FREQ=WEEKLY",
        "exceptionDates": ["2025-01-08T06:15:00.000Z"]
    }"#;
    let event: RecurringEvent = serde_json::from_str(json).unwrap();

    let result = expand(
        &event,
        utc(2025, 1, 1, 0, 0, 0),
        utc(2025, 1, 20, 0, 0, 0),
        &options(date(2025, 1, 1)),
    );

    assert_eq!(
        result.occurrences,
        vec![utc(2025, 1, 1, 18, 0, 0), utc(2025, 1, 15, 18, 0, 0)]
    );
}

#[test]
fn every_instance_keeps_original_duration() {
    let event = recurring(utc(2025, 1, 1, 18, 0, 0), "FREQ=WEEKLY;BYDAY=MO,WE,FR");

    let instances = expand_instances(
        &event,
        utc(2025, 1, 1, 0, 0, 0),
        utc(2025, 2, 28, 23, 59, 59),
        &options(date(2025, 1, 1)),
    );

    assert!(!instances.is_empty());
    for instance in &instances {
        assert_eq!(instance.end - instance.start, TimeDelta::minutes(90));
        assert_eq!(instance.end.format("%H:%M").to_string(), "19:30");
    }
}

#[test]
fn monthly_bymonthday_31_skips_short_months_and_terminates() {
    // Anchored in April, which has no 31st.
    let event = recurring(utc(2025, 4, 10, 12, 0, 0), "FREQ=MONTHLY;INTERVAL=1;BYMONTHDAY=31");

    let result = expand(
        &event,
        utc(2025, 4, 1, 0, 0, 0),
        utc(2025, 12, 31, 23, 59, 59),
        &options(date(2025, 4, 1)),
    );

    let months: Vec<u32> = result.occurrences.iter().map(|d| d.month()).collect();
    assert_eq!(months, vec![5, 7, 8, 10, 12]);
    assert!(result.occurrences.iter().all(|d| d.day() == 31));
    assert!(result.iterations <= 1000);
    assert!(!result.truncated);
}

#[test]
fn monthly_without_bymonthday_keeps_anchor_day() {
    let event = recurring(utc(2025, 1, 31, 9, 0, 0), "FREQ=MONTHLY");

    let result = expand(
        &event,
        utc(2025, 1, 1, 0, 0, 0),
        utc(2025, 6, 30, 23, 59, 59),
        &options(date(2025, 1, 1)),
    );

    assert_eq!(
        result.occurrences,
        vec![
            utc(2025, 1, 31, 9, 0, 0),
            utc(2025, 3, 31, 9, 0, 0),
            utc(2025, 5, 31, 9, 0, 0),
        ]
    );
}

#[test]
fn monthly_bymonthday_overrides_stored_anchor_day() {
    // Stored instant is late on the 14th; the rule says the 15th.
    let event = recurring(utc(2025, 1, 14, 23, 30, 0), "FREQ=MONTHLY;BYMONTHDAY=15");

    let result = expand(
        &event,
        utc(2025, 1, 1, 0, 0, 0),
        utc(2025, 3, 31, 23, 59, 59),
        &options(date(2025, 1, 1)),
    );

    assert_eq!(
        result.occurrences,
        vec![
            utc(2025, 1, 15, 23, 30, 0),
            utc(2025, 2, 15, 23, 30, 0),
            utc(2025, 3, 15, 23, 30, 0),
        ]
    );
}

#[test]
fn yearly_leap_day_only_in_leap_years() {
    let event = recurring(utc(2024, 2, 29, 20, 0, 0), "FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=29");
    let opts = options(date(2024, 1, 1)).with_horizon_years(10);

    let result = expand(&event, utc(2024, 1, 1, 0, 0, 0), utc(2032, 12, 31, 23, 59, 59), &opts);

    assert_eq!(
        result.occurrences,
        vec![
            utc(2024, 2, 29, 20, 0, 0),
            utc(2028, 2, 29, 20, 0, 0),
            utc(2032, 2, 29, 20, 0, 0),
        ]
    );
}

#[test]
fn horizon_caps_expansion_two_years_from_today() {
    let event = recurring(utc(2025, 6, 1, 12, 0, 0), "FREQ=YEARLY");

    let result = expand(
        &event,
        utc(2025, 1, 1, 0, 0, 0),
        utc(2035, 1, 1, 0, 0, 0),
        &options(date(2025, 1, 1)),
    );

    // 2025-06-01 and 2026-06-01; 2027-06-01 is past 2027-01-01.
    assert_eq!(result.occurrences.len(), 2);
}

#[test]
fn contradictory_rule_terminates_with_no_occurrences() {
    let event = recurring(utc(2025, 1, 1, 12, 0, 0), "FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=30");

    let result = expand(
        &event,
        utc(2025, 1, 1, 0, 0, 0),
        utc(2026, 12, 31, 0, 0, 0),
        &options(date(2025, 1, 1)),
    );

    assert!(result.occurrences.is_empty());
    assert!(!result.truncated);
}

#[test]
fn iteration_cap_truncates_old_daily_series() {
    // ~10 years of daily positions before the window; the cap is hit first.
    let event = recurring(utc(2015, 1, 1, 8, 0, 0), "FREQ=DAILY");

    let result = expand(
        &event,
        utc(2025, 1, 1, 0, 0, 0),
        utc(2025, 1, 31, 23, 59, 59),
        &options(date(2025, 1, 1)),
    );

    assert!(result.truncated, "expected truncation flag");
    assert_eq!(result.iterations, 1000);
    assert!(result.occurrences.is_empty());
}

#[test]
fn raising_the_cap_reaches_the_window() {
    let event = recurring(utc(2015, 1, 1, 8, 0, 0), "FREQ=DAILY");
    let opts = options(date(2025, 1, 1)).with_max_iterations(10_000);

    let result = expand(&event, utc(2025, 1, 1, 0, 0, 0), utc(2025, 1, 31, 23, 59, 59), &opts);

    assert!(!result.truncated);
    assert_eq!(result.occurrences.len(), 31);
}

#[test]
fn occurrences_before_window_start_are_not_emitted() {
    let event = recurring(utc(2025, 1, 1, 10, 0, 0), "FREQ=DAILY");

    let result = expand(
        &event,
        utc(2025, 1, 5, 10, 0, 0),
        utc(2025, 1, 7, 10, 0, 0),
        &options(date(2025, 1, 1)),
    );

    assert_eq!(
        result.occurrences,
        vec![
            utc(2025, 1, 5, 10, 0, 0),
            utc(2025, 1, 6, 10, 0, 0),
            utc(2025, 1, 7, 10, 0, 0),
        ]
    );
}

#[test]
fn wall_clock_time_survives_dst_change() {
    // Mondays at 18:00 New York time, across the 2026-03-08 spring forward.
    let tz: Tz = "America/New_York".parse().unwrap();
    let event = recurring(utc(2026, 3, 2, 23, 0, 0), "FREQ=WEEKLY");
    let opts = options(date(2026, 3, 1)).with_timezone(tz);

    let result = expand(&event, utc(2026, 3, 1, 0, 0, 0), utc(2026, 3, 20, 0, 0, 0), &opts);

    assert_eq!(
        result.occurrences,
        vec![
            utc(2026, 3, 2, 23, 0, 0),
            utc(2026, 3, 9, 22, 0, 0),
            utc(2026, 3, 16, 22, 0, 0),
        ]
    );
}

#[test]
fn dst_gap_policy_controls_nonexistent_times() {
    // Daily at 02:30 New York time; 2026-03-08 02:30 does not exist.
    let tz: Tz = "America/New_York".parse().unwrap();
    let event = recurring(utc(2026, 3, 7, 7, 30, 0), "FREQ=DAILY");
    let window = (utc(2026, 3, 7, 0, 0, 0), utc(2026, 3, 9, 12, 0, 0));

    let skip = options(date(2026, 3, 1)).with_timezone(tz).with_dst_policy(DstPolicy::Skip);
    let skipped = expand(&event, window.0, window.1, &skip);
    assert_eq!(
        skipped.occurrences,
        vec![utc(2026, 3, 7, 7, 30, 0), utc(2026, 3, 9, 6, 30, 0)]
    );

    let shift = options(date(2026, 3, 1)).with_timezone(tz);
    let shifted = expand(&event, window.0, window.1, &shift);
    assert_eq!(shifted.occurrences.len(), 3);
    assert_eq!(shifted.occurrences[1], utc(2026, 3, 8, 7, 30, 0));
}
