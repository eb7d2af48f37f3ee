//! Calendar configuration, availability records and resolved slots.
//!
//! These types cross the persistence boundary as JSON (via `serde`). Write-side
//! validation lives on the types themselves (`validate`, `availability`); the
//! resolver assumes values that passed it.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{QuorumError, Result};
use crate::time::{weekday_index, TimeOfDay, MINUTES_PER_DAY};

/// How public holidays interact with the allowed-weekday set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolidaysPolicy {
    /// Holiday status plays no part; only the weekday set decides.
    #[default]
    Ignore,
    /// Holidays are always eligible, whatever their weekday.
    Allow,
    /// Holidays are never eligible.
    Block,
}

/// Daily hours events may be scheduled in. Persisted as a JSON object
/// (`{"start":"09:00","end":"17:00"}`) and parsed only at that boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedHours {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl AllowedHours {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Result<Self> {
        if start.minutes() >= end.as_end_minute() {
            return Err(QuorumError::Validation(format!(
                "allowed hours end {} must be after start {}",
                end, start
            )));
        }
        Ok(AllowedHours { start, end })
    }

    /// Parse the persisted allowed-hours blob.
    ///
    /// # Errors
    /// Returns `QuorumError::Configuration` when the blob is not valid JSON,
    /// misses a field, or describes an empty range.
    pub fn from_json(raw: &str) -> Result<Self> {
        let hours: AllowedHours = serde_json::from_str(raw)
            .map_err(|e| QuorumError::Configuration(format!("allowed hours: {}", e)))?;
        AllowedHours::new(hours.start, hours.end)
            .map_err(|e| QuorumError::Configuration(format!("allowed hours: {}", e)))
    }

    pub fn to_json(&self) -> String {
        format!(r#"{{"start":"{}","end":"{}"}}"#, self.start, self.end)
    }

    /// Clip an availability to these hours. `None` when nothing remains.
    pub fn clip(&self, availability: Availability) -> Option<Availability> {
        let (start, end) = availability.span();
        let start = start.max(self.start.minutes());
        let end = end.min(self.end.as_end_minute());
        (start < end).then(|| Availability::from_span(start, end))
    }
}

/// Calendar configuration supplied by the calendar-management collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub id: String,
    pub name: String,
    /// Minimum number of simultaneously available participants.
    pub threshold: u32,
    /// Allowed days of week, Sunday = 0 through Saturday = 6.
    #[serde(default = "all_weekdays")]
    pub allowed_weekdays: BTreeSet<u8>,
    /// IANA timezone name, emitted as a client hint and used to pick the
    /// holiday country.
    pub timezone: String,
    #[serde(default)]
    pub holidays_policy: HolidaysPolicy,
    #[serde(default)]
    pub allow_holiday_eves: bool,
    #[serde(default)]
    pub min_duration_hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_hours: Option<AllowedHours>,
}

fn all_weekdays() -> BTreeSet<u8> {
    (0..7).collect()
}

impl CalendarConfig {
    /// A calendar with every weekday allowed, holidays ignored and no bounds.
    pub fn new(id: impl Into<String>, name: impl Into<String>, threshold: u32) -> Self {
        CalendarConfig {
            id: id.into(),
            name: name.into(),
            threshold,
            allowed_weekdays: all_weekdays(),
            timezone: "UTC".to_string(),
            holidays_policy: HolidaysPolicy::Ignore,
            allow_holiday_eves: false,
            min_duration_hours: 0.0,
            start_date: None,
            end_date: None,
            allowed_hours: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(QuorumError::Validation("calendar id is empty".to_string()));
        }
        if self.threshold < 1 {
            return Err(QuorumError::Validation(
                "threshold must be at least 1".to_string(),
            ));
        }
        if self.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(QuorumError::Validation(format!(
                "unknown timezone '{}'",
                self.timezone
            )));
        }
        if let Some(day) = self.allowed_weekdays.iter().find(|d| **d > 6) {
            return Err(QuorumError::Validation(format!(
                "invalid day of week {} (expected 0-6)",
                day
            )));
        }
        if !self.min_duration_hours.is_finite() || self.min_duration_hours < 0.0 {
            return Err(QuorumError::Validation(format!(
                "minimum duration must be a non-negative number of hours, got {}",
                self.min_duration_hours
            )));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(QuorumError::Validation(format!(
                    "calendar start date {} is after end date {}",
                    start, end
                )));
            }
        }
        if let Some(hours) = self.allowed_hours {
            AllowedHours::new(hours.start, hours.end)?;
        }
        Ok(())
    }

    /// Minimum slot length in whole minutes (hours are converted once, here).
    pub fn min_duration_minutes(&self) -> u32 {
        if self.min_duration_hours.is_finite() && self.min_duration_hours > 0.0 {
            (self.min_duration_hours * 60.0).round() as u32
        } else {
            0
        }
    }

    /// Whether `date` lies within the calendar's optional date bounds.
    pub fn within_bounds(&self, date: NaiveDate) -> bool {
        self.start_date.is_none_or(|start| date >= start)
            && self.end_date.is_none_or(|end| date <= end)
    }

    pub fn allows_weekday(&self, date: NaiveDate) -> bool {
        self.allowed_weekdays.contains(&weekday_index(date))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Participant {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowSource {
    #[default]
    Manual,
    Recurring,
}

/// The effective availability of one participant on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Availability {
    AllDay,
    Window { start: TimeOfDay, end: TimeOfDay },
}

impl Availability {
    pub fn window(start: TimeOfDay, end: TimeOfDay) -> Result<Self> {
        if start.minutes() >= end.as_end_minute() {
            return Err(QuorumError::Validation(format!(
                "end time {} must be after start time {}",
                end, start
            )));
        }
        Ok(Availability::Window { start, end })
    }

    /// Half-open minute span `[start, end)`; all-day is `[0, 1440)`.
    pub fn span(&self) -> (u16, u16) {
        match *self {
            Availability::AllDay => (0, MINUTES_PER_DAY),
            Availability::Window { start, end } => (start.minutes(), end.as_end_minute()),
        }
    }

    pub(crate) fn from_span(start: u16, end: u16) -> Self {
        if start == 0 && end >= MINUTES_PER_DAY {
            Availability::AllDay
        } else {
            Availability::Window {
                start: TimeOfDay::from_start_minute(start),
                end: TimeOfDay::from_end_minute(end),
            }
        }
    }

    /// `00:00–23:59` counts as all day whichever way it was entered.
    pub fn is_all_day(&self) -> bool {
        self.span() == (0, MINUTES_PER_DAY)
    }
}

/// One availability record, as stored per participant and date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub participant_id: String,
    pub date: NaiveDate,
    /// `None` together with `end_time` means all day.
    #[serde(default)]
    pub start_time: Option<TimeOfDay>,
    #[serde(default)]
    pub end_time: Option<TimeOfDay>,
    #[serde(default)]
    pub source: WindowSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AvailabilityWindow {
    pub fn manual(
        participant_id: impl Into<String>,
        date: NaiveDate,
        start: TimeOfDay,
        end: TimeOfDay,
    ) -> Self {
        AvailabilityWindow {
            participant_id: participant_id.into(),
            date,
            start_time: Some(start),
            end_time: Some(end),
            source: WindowSource::Manual,
            recurrence_id: None,
            note: None,
        }
    }

    pub fn all_day(participant_id: impl Into<String>, date: NaiveDate) -> Self {
        AvailabilityWindow {
            participant_id: participant_id.into(),
            date,
            start_time: None,
            end_time: None,
            source: WindowSource::Manual,
            recurrence_id: None,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Interpret the nullable time pair.
    ///
    /// # Errors
    /// Returns `QuorumError::Validation` when only one bound is set or the end
    /// is not after the start.
    pub fn availability(&self) -> Result<Availability> {
        match (self.start_time, self.end_time) {
            (None, None) => Ok(Availability::AllDay),
            (Some(start), Some(end)) => Availability::window(start, end),
            _ => Err(QuorumError::Validation(format!(
                "window for '{}' on {} has only one time bound",
                self.participant_id, self.date
            ))),
        }
    }
}

/// A weekly recurring availability template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrencePattern {
    pub id: String,
    pub participant_id: String,
    /// Sunday = 0 through Saturday = 6.
    pub day_of_week: u8,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<NaiveDate>,
    /// Dates on which this occurrence is suppressed entirely.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub exceptions: BTreeSet<NaiveDate>,
}

impl RecurrencePattern {
    pub fn weekly(
        id: impl Into<String>,
        participant_id: impl Into<String>,
        day_of_week: u8,
        start: TimeOfDay,
        end: TimeOfDay,
    ) -> Self {
        RecurrencePattern {
            id: id.into(),
            participant_id: participant_id.into(),
            day_of_week,
            start_time: start,
            end_time: end,
            valid_from: None,
            valid_to: None,
            exceptions: BTreeSet::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.day_of_week > 6 {
            return Err(QuorumError::Validation(format!(
                "invalid day of week {} (expected 0-6)",
                self.day_of_week
            )));
        }
        Availability::window(self.start_time, self.end_time)?;
        if let (Some(from), Some(to)) = (self.valid_from, self.valid_to) {
            if from > to {
                return Err(QuorumError::Validation(format!(
                    "recurrence valid_from {} is after valid_to {}",
                    from, to
                )));
            }
        }
        Ok(())
    }

    /// Whether `date` lies inside the validity range (open ends unbounded).
    pub fn in_validity(&self, date: NaiveDate) -> bool {
        self.valid_from.is_none_or(|from| date >= from)
            && self.valid_to.is_none_or(|to| date <= to)
    }

    /// Two patterns clash when they belong to the same participant, fall on the
    /// same weekday and their validity ranges intersect.
    pub fn overlaps(&self, other: &RecurrencePattern) -> bool {
        if self.participant_id != other.participant_id || self.day_of_week != other.day_of_week {
            return false;
        }
        let starts_before_other_ends = match (self.valid_from, other.valid_to) {
            (Some(from), Some(to)) => from <= to,
            _ => true,
        };
        let other_starts_before_end = match (other.valid_from, self.valid_to) {
            (Some(from), Some(to)) => from <= to,
            _ => true,
        };
        starts_before_other_ends && other_starts_before_end
    }
}

/// A maximal continuous interval on one date that meets quorum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSlot {
    pub date: NaiveDate,
    pub start: TimeOfDay,
    /// `23:59` here means the slot runs to the end of the day.
    pub end: TimeOfDay,
    /// 0-based chronological position within the date.
    pub index: usize,
    /// Everyone available during some qualifying part of the slot.
    pub participants: BTreeSet<String>,
    /// Participants whose window covers the whole slot.
    pub attendees: BTreeSet<String>,
}

impl ResolvedSlot {
    pub fn duration_minutes(&self) -> u32 {
        u32::from(self.end.as_end_minute() - self.start.minutes())
    }

    pub fn is_all_day(&self) -> bool {
        self.start == TimeOfDay::MIDNIGHT && self.end == TimeOfDay::LAST_MINUTE
    }
}

/// The resolved slots of a single date, plus the per-participant notes that
/// feed into event descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySlots {
    pub date: NaiveDate,
    pub slots: Vec<ResolvedSlot>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub notes: BTreeMap<String, String>,
}
