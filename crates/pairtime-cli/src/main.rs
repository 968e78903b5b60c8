//! `pairtime`: expand shared-calendar events and compute mutual free time.
//!
//! Every subcommand reads JSON in the backend's shapes and prints pretty JSON
//! to stdout. Diagnostics go to stderr, filtered by `RUST_LOG` (default `warn`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand, ValueEnum};
use pairtime_engine::calendar::{end_of_day, resolve_local, start_of_day};
use pairtime_engine::expander::{DEFAULT_HORIZON_YEARS, DEFAULT_MAX_ITERATIONS};
use pairtime_engine::{
    expand, find_first_mutual_slot, free_days, intersect, summarize, DayAvailability, DstPolicy,
    ExpandOptions, FreeSlot, MutualDayAvailability, MutualSummary, RecurringEvent, WeekStartDay,
    WeeklySchedule,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pairtime", version, about = "Shared calendar recurrence and mutual availability")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Expand one event record into its occurrences within a date range
    Expand {
        /// JSON file holding a single event record
        #[arg(long)]
        event: PathBuf,
        /// First day of the window (YYYY-MM-DD, inclusive)
        #[arg(long)]
        from: NaiveDate,
        /// Last day of the window (YYYY-MM-DD, inclusive)
        #[arg(long)]
        to: NaiveDate,
        #[command(flatten)]
        options: ExpandArgs,
    },
    /// Intersect two people's per-day free slots
    Mutual {
        /// JSON array of day availability for the first person
        a: PathBuf,
        /// JSON array of day availability for the second person
        b: PathBuf,
        /// Also report the earliest mutual slot at least this long
        #[arg(long)]
        min_minutes: Option<i64>,
    },
    /// Derive per-day free slots from a weekly schedule and existing events
    Free {
        /// JSON object keyed MONDAY..SUNDAY
        #[arg(long)]
        schedule: PathBuf,
        /// JSON array of event records
        #[arg(long)]
        events: Option<PathBuf>,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        #[command(flatten)]
        options: ExpandArgs,
    },
}

#[derive(Debug, Args)]
struct ExpandArgs {
    /// Reference date for the expansion horizon (defaults to the current UTC date)
    #[arg(long)]
    today: Option<NaiveDate>,
    /// IANA timezone whose wall clock recurrences follow
    #[arg(long, default_value = "UTC", value_parser = parse_tz)]
    tz: Tz,
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,
    #[arg(long, default_value_t = DEFAULT_HORIZON_YEARS)]
    horizon_years: u32,
    #[arg(long, value_enum, default_value_t = WeekStart::Sunday)]
    week_start: WeekStart,
    /// What to do with occurrences that fall in a DST gap
    #[arg(long, value_enum, default_value_t = DstGap::Shift)]
    dst_gap: DstGap,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WeekStart {
    Monday,
    Sunday,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DstGap {
    Skip,
    Shift,
}

impl ExpandArgs {
    fn to_options(&self) -> ExpandOptions {
        let today = self.today.unwrap_or_else(|| Utc::now().date_naive());
        ExpandOptions::new(today)
            .with_timezone(self.tz)
            .with_max_iterations(self.max_iterations)
            .with_horizon_years(self.horizon_years)
            .with_week_start(match self.week_start {
                WeekStart::Monday => WeekStartDay::Monday,
                WeekStart::Sunday => WeekStartDay::Sunday,
            })
            .with_dst_policy(match self.dst_gap {
                DstGap::Skip => DstPolicy::Skip,
                DstGap::Shift => DstPolicy::ShiftForward,
            })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MutualReport {
    days: Vec<MutualDayAvailability>,
    summary: MutualSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_slot: Option<FirstSlot>,
}

#[derive(Serialize)]
struct FirstSlot {
    date: NaiveDate,
    #[serde(flatten)]
    slot: FreeSlot,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Expand {
            event,
            from,
            to,
            options,
        } => {
            let event: RecurringEvent = read_json(&event)?;
            let options = options.to_options();
            let (window_start, window_end) = window(from, to, &options.timezone)?;
            print_json(&expand(&event, window_start, window_end, &options))
        }
        Command::Mutual { a, b, min_minutes } => {
            let days_a: Vec<DayAvailability> = read_json(&a)?;
            let days_b: Vec<DayAvailability> = read_json(&b)?;
            tracing::debug!(a = days_a.len(), b = days_b.len(), "Loaded availability");
            let days = intersect(&days_a, &days_b);
            let first_slot = min_minutes
                .and_then(|min| find_first_mutual_slot(&days, min))
                .map(|(date, slot)| FirstSlot { date, slot });
            print_json(&MutualReport {
                summary: summarize(&days),
                days,
                first_slot,
            })
        }
        Command::Free {
            schedule,
            events,
            from,
            to,
            options,
        } => {
            check_range(from, to)?;
            let schedule: WeeklySchedule = read_json(&schedule)?;
            schedule
                .validate()
                .context("schedule has an unusable day")?;
            let events: Vec<RecurringEvent> = match events {
                Some(path) => read_json(&path)?,
                None => Vec::new(),
            };
            tracing::debug!(events = events.len(), "Loaded schedule and events");
            print_json(&free_days(&schedule, &events, from, to, &options.to_options()))
        }
    }
}

/// `[from 00:00, to 23:59:59]` in `tz`, as UTC instants.
fn window(from: NaiveDate, to: NaiveDate, tz: &Tz) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    check_range(from, to)?;
    let start = resolve_local(tz, start_of_day(from), DstPolicy::ShiftForward)
        .with_context(|| format!("{from} has no local midnight in {tz}"))?;
    let end = resolve_local(tz, end_of_day(to), DstPolicy::ShiftForward)
        .with_context(|| format!("{to} has no local end of day in {tz}"))?;
    tracing::debug!(%start, %end, %tz, "Expansion window");
    Ok((start, end))
}

fn check_range(from: NaiveDate, to: NaiveDate) -> Result<()> {
    if to < from {
        bail!("--to {to} is before --from {from}");
    }
    Ok(())
}

fn parse_tz(name: &str) -> std::result::Result<Tz, String> {
    name.parse::<Tz>()
        .map_err(|_| format!("unknown IANA timezone `{name}`"))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}
