//! In-memory availability snapshot with write-boundary validation.
//!
//! Every write is validated before it lands, so the resolver only ever sees
//! well-formed data. Failures are typed: `Validation` for malformed input,
//! `Conflict` for duplicate ids and overlapping recurrences, `NotFound` for
//! missing participants, windows and recurrences.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{QuorumError, Result};
use crate::model::{
    AvailabilityWindow, CalendarConfig, Participant, RecurrencePattern, WindowSource,
};
use crate::time::weekday_index;

/// Availability records of one calendar, as read at request start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub windows: Vec<AvailabilityWindow>,
    #[serde(default)]
    pub recurrences: Vec<RecurrencePattern>,
}

impl Snapshot {
    pub fn participant_ids(&self) -> impl Iterator<Item = &str> {
        self.participants.iter().map(|p| p.id.as_str())
    }
}

/// A calendar plus its snapshot, as exchanged in JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarData {
    pub calendar: CalendarConfig,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

/// Validating store for one calendar's participants and availability.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryStore {
    calendar: CalendarConfig,
    snapshot: Snapshot,
}

impl MemoryStore {
    pub fn new(calendar: CalendarConfig) -> Result<Self> {
        calendar.validate()?;
        Ok(MemoryStore {
            calendar,
            snapshot: Snapshot::default(),
        })
    }

    /// Rebuild a store by replaying every record through the write path.
    pub fn load(data: CalendarData) -> Result<Self> {
        let mut store = MemoryStore::new(data.calendar)?;
        for participant in data.snapshot.participants {
            store.add_participant(participant)?;
        }
        for recurrence in data.snapshot.recurrences {
            store.add_recurrence(recurrence)?;
        }
        for window in data.snapshot.windows {
            match window.source {
                WindowSource::Manual => store.set_manual_window(window)?,
                WindowSource::Recurring => store.add_materialized_window(window)?,
            }
        }
        Ok(store)
    }

    /// Parse and load the JSON form of [`CalendarData`].
    pub fn from_json(json: &str) -> Result<Self> {
        let data: CalendarData = serde_json::from_str(json)
            .map_err(|e| QuorumError::Validation(format!("invalid snapshot JSON: {}", e)))?;
        MemoryStore::load(data)
    }

    pub fn to_json(&self) -> Result<String> {
        let data = CalendarData {
            calendar: self.calendar.clone(),
            snapshot: self.snapshot.clone(),
        };
        serde_json::to_string_pretty(&data)
            .map_err(|e| QuorumError::Configuration(format!("snapshot serialization: {}", e)))
    }

    pub fn calendar(&self) -> &CalendarConfig {
        &self.calendar
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    // ── Participants ────────────────────────────────────────────────────────

    pub fn add_participant(&mut self, participant: Participant) -> Result<()> {
        if participant.id.trim().is_empty() {
            return Err(QuorumError::Validation("participant id is empty".to_string()));
        }
        if self.find_participant(&participant.id).is_some() {
            return Err(QuorumError::Conflict(format!(
                "participant '{}' already exists",
                participant.id
            )));
        }
        tracing::debug!(participant = %participant.id, "participant added");
        self.snapshot.participants.push(participant);
        Ok(())
    }

    pub fn participant(&self, id: &str) -> Result<&Participant> {
        self.find_participant(id)
            .ok_or_else(|| QuorumError::not_found("participant", id))
    }

    /// Remove a participant together with all of their availability.
    pub fn remove_participant(&mut self, id: &str) -> Result<Participant> {
        let position = self
            .snapshot
            .participants
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| QuorumError::not_found("participant", id))?;
        self.snapshot.windows.retain(|w| w.participant_id != id);
        self.snapshot.recurrences.retain(|r| r.participant_id != id);
        Ok(self.snapshot.participants.remove(position))
    }

    fn find_participant(&self, id: &str) -> Option<&Participant> {
        self.snapshot.participants.iter().find(|p| p.id == id)
    }

    // ── Manual windows ──────────────────────────────────────────────────────

    /// Store a manual window, replacing any earlier manual window for the same
    /// participant and date.
    pub fn set_manual_window(&mut self, mut window: AvailabilityWindow) -> Result<()> {
        self.participant(&window.participant_id)?;
        window.availability()?;
        window.source = WindowSource::Manual;
        window.recurrence_id = None;

        self.snapshot.windows.retain(|w| {
            !(w.source == WindowSource::Manual
                && w.participant_id == window.participant_id
                && w.date == window.date)
        });
        self.snapshot.windows.push(window);
        Ok(())
    }

    pub fn manual_window(
        &self,
        participant_id: &str,
        date: NaiveDate,
    ) -> Result<&AvailabilityWindow> {
        self.snapshot
            .windows
            .iter()
            .find(|w| {
                w.source == WindowSource::Manual
                    && w.participant_id == participant_id
                    && w.date == date
            })
            .ok_or_else(|| {
                QuorumError::not_found("window", format!("{}/{}", participant_id, date))
            })
    }

    pub fn remove_manual_window(
        &mut self,
        participant_id: &str,
        date: NaiveDate,
    ) -> Result<AvailabilityWindow> {
        let position = self
            .snapshot
            .windows
            .iter()
            .position(|w| {
                w.source == WindowSource::Manual
                    && w.participant_id == participant_id
                    && w.date == date
            })
            .ok_or_else(|| {
                QuorumError::not_found("window", format!("{}/{}", participant_id, date))
            })?;
        Ok(self.snapshot.windows.remove(position))
    }

    /// Accept a recurring window that storage already materialized. Its
    /// recurrence, when named, must exist, belong to the same participant and
    /// produce an occurrence on the window's date.
    fn add_materialized_window(&mut self, window: AvailabilityWindow) -> Result<()> {
        self.participant(&window.participant_id)?;
        window.availability()?;
        if let Some(id) = &window.recurrence_id {
            let recurrence = self.recurrence(id)?;
            if recurrence.participant_id != window.participant_id {
                return Err(QuorumError::Validation(format!(
                    "window on {} names recurrence '{}' of another participant",
                    window.date, id
                )));
            }
            if recurrence.occurrence_on(window.date).is_none() {
                return Err(QuorumError::Validation(format!(
                    "window on {} is not an occurrence of recurrence '{}'",
                    window.date, id
                )));
            }
        }
        self.snapshot.windows.push(window);
        Ok(())
    }

    // ── Recurrences ─────────────────────────────────────────────────────────

    /// Add a weekly recurrence.
    ///
    /// # Errors
    /// `NotFound` for an unknown participant, `Validation` for a malformed
    /// pattern, `Conflict` for a duplicate id or a pattern overlapping an
    /// existing one on the same participant and day-of-week.
    pub fn add_recurrence(&mut self, recurrence: RecurrencePattern) -> Result<()> {
        self.participant(&recurrence.participant_id)?;
        recurrence.validate()?;
        for exception in &recurrence.exceptions {
            check_exception_weekday(&recurrence, *exception)?;
        }

        if self.find_recurrence(&recurrence.id).is_some() {
            return Err(QuorumError::Conflict(format!(
                "recurrence '{}' already exists",
                recurrence.id
            )));
        }
        if let Some(existing) = self
            .snapshot
            .recurrences
            .iter()
            .find(|r| r.overlaps(&recurrence))
        {
            tracing::debug!(
                new = %recurrence.id,
                existing = %existing.id,
                "rejecting overlapping recurrence"
            );
            return Err(QuorumError::Conflict(format!(
                "recurrence '{}' overlaps '{}' for participant '{}' on day {}",
                recurrence.id, existing.id, recurrence.participant_id, recurrence.day_of_week
            )));
        }

        self.snapshot.recurrences.push(recurrence);
        Ok(())
    }

    pub fn recurrence(&self, id: &str) -> Result<&RecurrencePattern> {
        self.find_recurrence(id)
            .ok_or_else(|| QuorumError::not_found("recurrence", id))
    }

    pub fn remove_recurrence(&mut self, id: &str) -> Result<RecurrencePattern> {
        let position = self
            .snapshot
            .recurrences
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| QuorumError::not_found("recurrence", id))?;
        self.snapshot
            .windows
            .retain(|w| w.recurrence_id.as_deref() != Some(id));
        Ok(self.snapshot.recurrences.remove(position))
    }

    /// Suppress the occurrence of recurrence `id` on `date`, including any
    /// window already materialized for it.
    pub fn add_exception(&mut self, id: &str, date: NaiveDate) -> Result<()> {
        let recurrence = self
            .snapshot
            .recurrences
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| QuorumError::not_found("recurrence", id))?;
        check_exception_weekday(recurrence, date)?;
        recurrence.exceptions.insert(date);

        let before = self.snapshot.windows.len();
        self.snapshot
            .windows
            .retain(|w| !(w.date == date && w.recurrence_id.as_deref() == Some(id)));
        tracing::debug!(
            recurrence = %id,
            %date,
            dropped = before - self.snapshot.windows.len(),
            "exception added"
        );
        Ok(())
    }

    pub fn remove_exception(&mut self, id: &str, date: NaiveDate) -> Result<()> {
        let recurrence = self
            .snapshot
            .recurrences
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| QuorumError::not_found("recurrence", id))?;
        if !recurrence.exceptions.remove(&date) {
            return Err(QuorumError::not_found(
                "exception",
                format!("{}/{}", id, date),
            ));
        }
        Ok(())
    }

    fn find_recurrence(&self, id: &str) -> Option<&RecurrencePattern> {
        self.snapshot.recurrences.iter().find(|r| r.id == id)
    }
}

fn check_exception_weekday(recurrence: &RecurrencePattern, date: NaiveDate) -> Result<()> {
    if weekday_index(date) != recurrence.day_of_week {
        return Err(QuorumError::Validation(format!(
            "exception {} does not fall on day {} of recurrence '{}'",
            date, recurrence.day_of_week, recurrence.id
        )));
    }
    Ok(())
}
