//! Quorum slot resolution for a single date.
//!
//! Sweep line over minute-of-day boundaries:
//!
//! 1. every distinct window start/end becomes a boundary (all-day = `[0, 1440)`);
//! 2. consecutive boundaries form micro-intervals;
//! 3. each micro-interval is covered by the participants whose window contains
//!    it (start inclusive, end exclusive);
//! 4. micro-intervals with at least `threshold` covering participants qualify;
//! 5. touching qualifying micro-intervals merge into one maximal slot, any
//!    non-qualifying gap splits;
//! 6. slots shorter than the minimum duration are dropped;
//! 7. survivors are numbered 0-based in chronological order;
//! 8. each slot records who covers all of it.
//!
//! All arithmetic is on whole minutes.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::model::{Availability, ResolvedSlot};
use crate::time::TimeOfDay;

#[derive(Debug)]
struct OpenSlot<'a> {
    start: u16,
    end: u16,
    participants: BTreeSet<&'a str>,
}

/// Resolve the quorum slots of `date`.
///
/// `windows` is the per-date participant → availability map (one entry per
/// participant). A threshold above the participant count, or no windows at
/// all, yields an empty list. A threshold of 0 is treated as 1.
pub fn resolve_slots<'a, I>(
    date: NaiveDate,
    windows: I,
    threshold: u32,
    min_duration_minutes: u32,
) -> Vec<ResolvedSlot>
where
    I: IntoIterator<Item = (&'a str, Availability)>,
{
    let threshold = threshold.max(1) as usize;

    let spans: Vec<(&str, u16, u16)> = windows
        .into_iter()
        .map(|(id, availability)| {
            let (start, end) = availability.span();
            (id, start, end)
        })
        .filter(|&(_, start, end)| start < end)
        .collect();

    if spans.len() < threshold {
        return Vec::new();
    }

    let mut boundaries: Vec<u16> = spans
        .iter()
        .flat_map(|&(_, start, end)| [start, end])
        .collect();
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut merged: Vec<OpenSlot> = Vec::new();
    for pair in boundaries.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let covering: Vec<&str> = spans
            .iter()
            .filter(|&&(_, start, end)| start <= from && to <= end)
            .map(|&(id, _, _)| id)
            .collect();

        if covering.len() < threshold {
            continue;
        }

        if let Some(last) = merged.last_mut() {
            if last.end == from {
                // Touching, so the current slot grows.
                last.end = to;
                last.participants.extend(covering);
                continue;
            }
        }
        merged.push(OpenSlot {
            start: from,
            end: to,
            participants: covering.into_iter().collect(),
        });
    }

    merged
        .into_iter()
        .filter(|slot| u32::from(slot.end - slot.start) >= min_duration_minutes)
        .enumerate()
        .map(|(index, slot)| ResolvedSlot {
            date,
            start: TimeOfDay::from_start_minute(slot.start),
            end: TimeOfDay::from_end_minute(slot.end),
            index,
            attendees: spans
                .iter()
                .filter(|&&(_, start, end)| start <= slot.start && slot.end <= end)
                .map(|&(id, _, _)| id.to_string())
                .collect(),
            participants: slot.participants.into_iter().map(str::to_string).collect(),
        })
        .collect()
}
