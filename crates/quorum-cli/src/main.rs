//! `quorum` CLI — resolve quorum calendars and render their feeds from a JSON
//! snapshot.
//!
//! ## Usage
//!
//! ```sh
//! # iCalendar feed for the calendar's default range (stdin → stdout)
//! cat team.json | quorum feed
//!
//! # Feed for an explicit range, with a fixed DTSTAMP and UID host
//! quorum feed -s team.json --from 2025-06-30 --to 2025-07-06 \
//!     --host cal.example.com --generated-at 2025-06-29T08:00:00Z
//!
//! # Resolved slots per date as JSON
//! quorum range -s team.json --from 2025-06-30 --to 2025-07-06
//!
//! # Eligibility, effective availability and slots of one date
//! quorum date -s team.json --date 2025-07-04
//!
//! # Dates that may carry events
//! quorum eligible -s team.json --from 2025-12-20 --to 2025-12-31
//!
//! # Check a snapshot without resolving anything
//! quorum validate -s team.json
//! ```
//!
//! Logs go to stderr. `RUST_LOG` takes precedence over `--verbose`.

use std::io::{self, Read};

use anyhow::{Context, Result};
use chrono::{DateTime, Days, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use quorum_engine::time::parse_date;
use quorum_engine::{
    build_feed, eligible_dates, resolve_range, summarize_date, uid_host, CalendarConfig,
    DateRange, HolidayCache, MemoryStore, DEFAULT_HORIZON_DAYS,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "quorum",
    version,
    about = "Quorum calendar resolution and iCalendar feeds",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log engine decisions (debug level) to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct SnapshotArgs {
    /// Calendar snapshot JSON (reads from stdin if omitted)
    #[arg(short, long)]
    snapshot: Option<String>,
}

#[derive(Args)]
struct RangeArgs {
    /// First date (YYYY-MM-DD); defaults to the calendar start or today
    #[arg(long, value_parser = parse_date)]
    from: Option<NaiveDate>,
    /// Last date (YYYY-MM-DD); defaults to the calendar end or a 90-day horizon
    #[arg(long, value_parser = parse_date)]
    to: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the iCalendar feed
    Feed {
        #[command(flatten)]
        input: SnapshotArgs,
        #[command(flatten)]
        range: RangeArgs,
        /// Forwarded host of the request (first entry wins, port stripped)
        #[arg(long)]
        host: Option<String>,
        /// UID host used when no forwarded host is given
        #[arg(long, env = "QUORUM_DEFAULT_DOMAIN", default_value = "localhost")]
        default_domain: String,
        /// DTSTAMP instant (RFC 3339); defaults to now
        #[arg(long, value_parser = parse_instant)]
        generated_at: Option<DateTime<Utc>>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Print the resolved slots of every date in a range as JSON
    Range {
        #[command(flatten)]
        input: SnapshotArgs,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Summarize a single date as JSON
    Date {
        #[command(flatten)]
        input: SnapshotArgs,
        /// The date to summarize (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
    },
    /// List the dates of a range that may carry events
    Eligible {
        #[command(flatten)]
        input: SnapshotArgs,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Validate a snapshot and print a short summary
    Validate {
        #[command(flatten)]
        input: SnapshotArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let holidays = HolidayCache::builtin();

    match cli.command {
        Commands::Feed {
            input,
            range,
            host,
            default_domain,
            generated_at,
            output,
        } => {
            let store = load_store(&input)?;
            let generated_at = generated_at.unwrap_or_else(Utc::now);
            let range = date_range(store.calendar(), &range, generated_at)?;
            let host = uid_host(host.as_deref(), &default_domain);

            let feed = build_feed(
                store.calendar(),
                store.snapshot(),
                range,
                &holidays,
                &host,
                generated_at,
            );
            write_output(output.as_deref(), &feed)?;
        }
        Commands::Range { input, range } => {
            let store = load_store(&input)?;
            let range = date_range(store.calendar(), &range, Utc::now())?;
            let days = resolve_range(store.calendar(), store.snapshot(), range, &holidays);
            println!("{}", serde_json::to_string_pretty(&days)?);
        }
        Commands::Date { input, date } => {
            let store = load_store(&input)?;
            let summary = summarize_date(store.calendar(), store.snapshot(), date, &holidays);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Eligible { input, range } => {
            let store = load_store(&input)?;
            let range = date_range(store.calendar(), &range, Utc::now())?;
            for date in eligible_dates(store.calendar(), range.start, range.end, &holidays) {
                println!("{}", date);
            }
        }
        Commands::Validate { input } => {
            let store = load_store(&input)?;
            let calendar = store.calendar();
            let snapshot = store.snapshot();
            println!(
                "ok: calendar '{}' ({}), threshold {}, {} participants, {} windows, {} recurrences",
                calendar.id,
                calendar.name,
                calendar.threshold,
                snapshot.participants.len(),
                snapshot.windows.len(),
                snapshot.recurrences.len()
            );
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    let instant = DateTime::parse_from_rfc3339(raw.trim())
        .with_context(|| format!("expected an RFC 3339 instant, got '{}'", raw))?;
    Ok(instant.with_timezone(&Utc))
}

/// Explicit bounds win. Otherwise the calendar's own range applies; an explicit
/// `--from` alone runs to the calendar end or the default horizon.
fn date_range(config: &CalendarConfig, args: &RangeArgs, now: DateTime<Utc>) -> Result<DateRange> {
    let default = DateRange::for_calendar_at(config, now);
    let start = args.from.unwrap_or(default.start);
    let end = match (args.to, args.from) {
        (Some(to), _) => to,
        (None, None) => default.end,
        (None, Some(from)) => config.end_date.unwrap_or_else(|| {
            from.checked_add_days(Days::new(DEFAULT_HORIZON_DAYS))
                .unwrap_or(from)
        }),
    };
    tracing::debug!(%start, %end, "date range");
    DateRange::new(start, end).context("Invalid date range")
}

fn load_store(args: &SnapshotArgs) -> Result<MemoryStore> {
    let raw = read_input(args.snapshot.as_deref())?;
    MemoryStore::from_json(&raw).context("Invalid snapshot")
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
