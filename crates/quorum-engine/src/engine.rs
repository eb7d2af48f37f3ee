//! Request-level entry points: date and range summaries, and the feed.
//!
//! Each call re-derives slots from the snapshot it is given; nothing is cached
//! between calls except holidays (through the injected [`HolidayCache`]).
//! Failures are isolated per date: a malformed record degrades its date to an
//! empty slot list and is logged, the rest of the request proceeds.

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::aggregator::{availability_pairs, AvailabilityAggregator, DayAvailability};
use crate::eligibility::eligible_dates;
use crate::error::{QuorumError, Result};
use crate::holidays::{HolidayCache, HolidaySource};
use crate::ics::{render_feed, FeedOptions};
use crate::model::{AvailabilityWindow, CalendarConfig, DaySlots, ResolvedSlot};
use crate::resolver::resolve_slots;
use crate::store::Snapshot;

/// Feed horizon used when a calendar has no end date.
pub const DEFAULT_HORIZON_DAYS: u64 = 90;

/// Inclusive range of dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(QuorumError::Validation(format!(
                "range start {} is after end {}",
                start, end
            )));
        }
        Ok(DateRange { start, end })
    }

    pub fn single(date: NaiveDate) -> Self {
        DateRange {
            start: date,
            end: date,
        }
    }

    /// The calendar's own bounds, falling back to `today` and a
    /// [`DEFAULT_HORIZON_DAYS`] horizon for whichever end is open.
    pub fn for_calendar(config: &CalendarConfig, today: NaiveDate) -> Self {
        let start = config.start_date.unwrap_or(today);
        let end = config.end_date.unwrap_or_else(|| {
            start
                .checked_add_days(Days::new(DEFAULT_HORIZON_DAYS))
                .unwrap_or(start)
        });
        DateRange {
            start,
            end: end.max(start),
        }
    }

    /// [`for_calendar`](Self::for_calendar) anchored at the current date in
    /// the calendar's own timezone. Unknown zones fall back to UTC.
    pub fn for_calendar_at(config: &CalendarConfig, now: DateTime<Utc>) -> Self {
        Self::for_calendar(config, local_today(config, now))
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// The calendar-local date at instant `now`.
pub fn local_today(config: &CalendarConfig, now: DateTime<Utc>) -> NaiveDate {
    match config.timezone.parse::<Tz>() {
        Ok(tz) => now.with_timezone(&tz).date_naive(),
        Err(_) => now.date_naive(),
    }
}

/// Everything known about one date of a calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateSummary {
    pub date: NaiveDate,
    /// Whether weekday, holiday policy and bounds allow events on this date.
    pub eligible: bool,
    pub availability: DayAvailability,
    pub slots: Vec<ResolvedSlot>,
    /// Set when the date's records were malformed and it was degraded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Resolve one date from pre-materialized windows.
///
/// Every participant with a window on `date` takes part; manual windows
/// replace recurring ones. Malformed windows degrade the date to no slots.
pub fn resolve_date(
    config: &CalendarConfig,
    date: NaiveDate,
    windows: &[AvailabilityWindow],
) -> Vec<ResolvedSlot> {
    let aggregator = AvailabilityAggregator::new(windows, &[]);
    let participants = aggregator.participants_with_windows();
    match resolve_day(config, &aggregator, date, participants) {
        Ok((_, day)) => day.slots,
        Err(err) => {
            degrade(config, date, &err);
            Vec::new()
        }
    }
}

/// Resolve every eligible date of `range` that reaches quorum.
///
/// Dates without slots are omitted. The range is intersected with the
/// calendar's bounds.
pub fn resolve_range<S: HolidaySource>(
    config: &CalendarConfig,
    snapshot: &Snapshot,
    range: DateRange,
    holidays: &HolidayCache<S>,
) -> Vec<DaySlots> {
    let aggregator = AvailabilityAggregator::new(&snapshot.windows, &snapshot.recurrences);

    let days: Vec<DaySlots> = eligible_dates(config, range.start, range.end, holidays)
        .filter_map(|date| {
            match resolve_day(config, &aggregator, date, snapshot.participant_ids()) {
                Ok((_, day)) => Some(day),
                Err(err) => {
                    degrade(config, date, &err);
                    None
                }
            }
        })
        .filter(|day| !day.slots.is_empty())
        .collect();

    tracing::debug!(
        calendar = %config.id,
        start = %range.start,
        end = %range.end,
        dates = days.len(),
        "resolved range"
    );
    days
}

/// Eligibility, effective availability and slots of a single date.
pub fn summarize_date<S: HolidaySource>(
    config: &CalendarConfig,
    snapshot: &Snapshot,
    date: NaiveDate,
    holidays: &HolidayCache<S>,
) -> DateSummary {
    let eligible = config.is_date_allowed(date, holidays);
    let aggregator = AvailabilityAggregator::new(&snapshot.windows, &snapshot.recurrences);

    match resolve_day(config, &aggregator, date, snapshot.participant_ids()) {
        Ok((availability, day)) => DateSummary {
            date,
            eligible,
            availability,
            slots: if eligible { day.slots } else { Vec::new() },
            error: None,
        },
        Err(err) => {
            degrade(config, date, &err);
            DateSummary {
                date,
                eligible,
                availability: DayAvailability::new(),
                slots: Vec::new(),
                error: Some(err.to_string()),
            }
        }
    }
}

/// Resolve `range` and render it as an iCalendar feed.
pub fn build_feed<S: HolidaySource>(
    config: &CalendarConfig,
    snapshot: &Snapshot,
    range: DateRange,
    holidays: &HolidayCache<S>,
    host: &str,
    generated_at: DateTime<Utc>,
) -> String {
    let days = resolve_range(config, snapshot, range, holidays);
    let options = FeedOptions {
        host,
        generated_at,
        participants: &snapshot.participants,
    };
    render_feed(config, &days, &options)
}

fn resolve_day<'p, I>(
    config: &CalendarConfig,
    aggregator: &AvailabilityAggregator<'_>,
    date: NaiveDate,
    participants: I,
) -> Result<(DayAvailability, DaySlots)>
where
    I: IntoIterator<Item = &'p str>,
{
    let availability = aggregator.for_date(date, participants)?;

    let pairs = availability_pairs(&availability).filter_map(|(id, window)| {
        match config.allowed_hours {
            Some(hours) => hours.clip(window).map(|clipped| (id, clipped)),
            None => Some((id, window)),
        }
    });
    let slots = resolve_slots(date, pairs, config.threshold, config.min_duration_minutes());

    let notes = availability
        .iter()
        .filter_map(|(id, w)| w.note.clone().map(|note| (id.clone(), note)))
        .collect();

    let day = DaySlots { date, slots, notes };
    Ok((availability, day))
}

fn degrade(config: &CalendarConfig, date: NaiveDate, err: &QuorumError) {
    tracing::warn!(
        calendar = %config.id,
        %date,
        error = %err,
        "malformed availability, date resolved without slots"
    );
}
