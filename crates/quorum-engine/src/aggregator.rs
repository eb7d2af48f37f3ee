//! Effective availability per participant and date.
//!
//! Combines stored windows with recurrence-expanded ones. Precedence: a manual
//! window for (participant, date) replaces any recurring window for the same
//! pair outright -- the two are never merged.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{Availability, AvailabilityWindow, RecurrencePattern, WindowSource};

/// The window that counts for one participant on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveWindow {
    pub availability: Availability,
    pub source: WindowSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Participant id → effective window. Participants without availability are
/// absent.
pub type DayAvailability = BTreeMap<String, EffectiveWindow>;

/// Indexes stored windows by date and resolves per-date availability.
#[derive(Debug, Clone)]
pub struct AvailabilityAggregator<'a> {
    by_date: HashMap<NaiveDate, Vec<&'a AvailabilityWindow>>,
    recurrences: &'a [RecurrencePattern],
}

impl<'a> AvailabilityAggregator<'a> {
    /// `windows` may mix manual entries with pre-materialized recurring ones;
    /// `recurrences` are expanded on demand.
    pub fn new(windows: &'a [AvailabilityWindow], recurrences: &'a [RecurrencePattern]) -> Self {
        let mut by_date: HashMap<NaiveDate, Vec<&'a AvailabilityWindow>> = HashMap::new();
        for window in windows {
            by_date.entry(window.date).or_default().push(window);
        }
        AvailabilityAggregator {
            by_date,
            recurrences,
        }
    }

    /// Effective windows on `date` for the given participants.
    ///
    /// When several manual windows exist for one participant the last one
    /// supplied wins.
    ///
    /// # Errors
    /// Returns `QuorumError::Validation` if a window that would count for
    /// this date is malformed. Callers degrade the date rather than the
    /// request.
    pub fn for_date<'p, I>(&self, date: NaiveDate, participants: I) -> Result<DayAvailability>
    where
        I: IntoIterator<Item = &'p str>,
    {
        let stored = self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[]);
        let mut day = DayAvailability::new();

        for participant in participants {
            let own = move || {
                stored
                    .iter()
                    .copied()
                    .filter(move |w| w.participant_id == participant)
            };

            let manual = own().filter(|w| w.source == WindowSource::Manual).last();
            let chosen = match manual {
                Some(window) => Some(window.clone()),
                None => own()
                    .filter(|w| w.source == WindowSource::Recurring)
                    .find(|w| self.still_recurs(w))
                    .cloned()
                    .or_else(|| self.expanded(participant, date)),
            };

            if let Some(window) = chosen {
                day.insert(
                    participant.to_string(),
                    EffectiveWindow {
                        availability: window.availability()?,
                        source: window.source,
                        note: window.note,
                    },
                );
            }
        }

        Ok(day)
    }

    /// A materialized window counts only while its named recurrence still
    /// produces an occurrence on that date. Windows naming a pattern outside
    /// this snapshot are taken as stored.
    fn still_recurs(&self, window: &AvailabilityWindow) -> bool {
        let Some(id) = window.recurrence_id.as_deref() else {
            return true;
        };
        self.recurrences
            .iter()
            .find(|r| r.id == id)
            .map_or(true, |r| r.occurrence_on(window.date).is_some())
    }

    fn expanded(&self, participant: &str, date: NaiveDate) -> Option<AvailabilityWindow> {
        self.recurrences
            .iter()
            .filter(|r| r.participant_id == participant)
            .find_map(|r| r.occurrence_on(date))
    }

    /// Distinct participant ids that have any stored window.
    pub fn participants_with_windows(&self) -> Vec<&'a str> {
        let mut ids: Vec<&'a str> = self
            .by_date
            .values()
            .flatten()
            .copied()
            .map(|w| w.participant_id.as_str())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Flatten effective windows into the resolver's input shape.
pub fn availability_pairs(
    day: &DayAvailability,
) -> impl Iterator<Item = (&str, Availability)> + '_ {
    day.iter().map(|(id, w)| (id.as_str(), w.availability))
}
