//! Weekly recurrence expansion -- turns a [`RecurrencePattern`] into concrete
//! per-date availability windows over a queried range.
//!
//! Expansion is lazy and steps a week at a time from the first matching date,
//! so its cost is proportional to the number of occurrences, not the range
//! length. [`Expansion`] is `Clone`: cloning it (or calling [`expand`] again)
//! restarts the sequence.

use chrono::{Days, NaiveDate};

use crate::model::{AvailabilityWindow, RecurrencePattern, WindowSource};
use crate::time::weekday_index;

/// Lazy iterator over the occurrences of one pattern within a date range.
#[derive(Debug, Clone)]
pub struct Expansion<'a> {
    pattern: &'a RecurrencePattern,
    next: Option<NaiveDate>,
    last: NaiveDate,
}

/// Expand `pattern` over the inclusive range `[range_start, range_end]`.
///
/// A date yields a window iff its weekday is the pattern's day-of-week, it lies
/// within `[valid_from, valid_to]` (open ends unbounded), and it is not one of
/// the pattern's exceptions. Exceptions suppress the whole occurrence.
///
/// An invalid day-of-week or an empty range yields nothing.
pub fn expand(
    pattern: &RecurrencePattern,
    range_start: NaiveDate,
    range_end: NaiveDate,
) -> Expansion<'_> {
    let first = pattern.valid_from.map_or(range_start, |f| f.max(range_start));
    let last = pattern.valid_to.map_or(range_end, |t| t.min(range_end));

    let next = if pattern.day_of_week > 6 || first > last {
        None
    } else {
        let offset = (7 + pattern.day_of_week - weekday_index(first)) % 7;
        first.checked_add_days(Days::new(u64::from(offset)))
    };

    Expansion {
        pattern,
        next,
        last,
    }
}

impl Iterator for Expansion<'_> {
    type Item = AvailabilityWindow;

    fn next(&mut self) -> Option<AvailabilityWindow> {
        loop {
            let date = self.next.filter(|d| *d <= self.last)?;
            self.next = date.checked_add_days(Days::new(7));
            if !self.pattern.exceptions.contains(&date) {
                return Some(occurrence(self.pattern, date));
            }
        }
    }
}

fn occurrence(pattern: &RecurrencePattern, date: NaiveDate) -> AvailabilityWindow {
    AvailabilityWindow {
        participant_id: pattern.participant_id.clone(),
        date,
        start_time: Some(pattern.start_time),
        end_time: Some(pattern.end_time),
        source: WindowSource::Recurring,
        recurrence_id: Some(pattern.id.clone()),
        note: None,
    }
}

impl RecurrencePattern {
    /// The occurrence on `date`, if the pattern produces one there.
    pub fn occurrence_on(&self, date: NaiveDate) -> Option<AvailabilityWindow> {
        expand(self, date, date).next()
    }
}
