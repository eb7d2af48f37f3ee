//! Wall-clock time-of-day values at one-minute granularity.
//!
//! All interval arithmetic in the engine is done on whole minutes since
//! midnight. An end time of `23:59` closes the day: it covers the final minute
//! and maps to the exclusive boundary `1440`, so `00:00–23:59` spans the
//! complete day.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{QuorumError, Result};

/// Minutes in a day; the exclusive end boundary of an all-day interval.
pub const MINUTES_PER_DAY: u16 = 1440;

/// A time of day in whole minutes, `00:00` through `23:59`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);
    pub const LAST_MINUTE: TimeOfDay = TimeOfDay(MINUTES_PER_DAY - 1);

    /// Build a time from hour and minute components.
    ///
    /// # Errors
    /// Returns `QuorumError::Validation` if `hour > 23` or `minute > 59`.
    pub fn from_hm(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(QuorumError::Validation(format!(
                "time out of range: {:02}:{:02}",
                hour, minute
            )));
        }
        Ok(TimeOfDay((hour * 60 + minute) as u16))
    }

    /// Parse `HH:MM` or `HH:MM:SS`. Seconds are accepted (relational stores
    /// emit them) but must be zero-padded and are truncated.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || QuorumError::Validation(format!("malformed time '{}'", s));

        let mut parts = s.trim().split(':');
        let hour = parts.next().ok_or_else(invalid)?;
        let minute = parts.next().ok_or_else(invalid)?;
        let second = parts.next();
        if parts.next().is_some() {
            return Err(invalid());
        }

        let field = |p: &str| -> Result<u32> {
            if p.len() != 2 || !p.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            p.parse().map_err(|_| invalid())
        };

        let (h, m) = (field(hour)?, field(minute)?);
        if let Some(sec) = second {
            if field(sec)? > 59 {
                return Err(invalid());
            }
        }
        Self::from_hm(h, m).map_err(|_| invalid())
    }

    /// Minutes since midnight (`0..=1439`).
    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u32 {
        u32::from(self.0 / 60)
    }

    pub fn minute(self) -> u32 {
        u32::from(self.0 % 60)
    }

    /// The exclusive minute boundary this time represents when it closes an
    /// interval. `23:59` closes the day and becomes `1440`.
    pub fn as_end_minute(self) -> u16 {
        if self == Self::LAST_MINUTE {
            MINUTES_PER_DAY
        } else {
            self.0
        }
    }

    /// Inverse of [`as_end_minute`](Self::as_end_minute).
    pub fn from_end_minute(minute: u16) -> Self {
        if minute >= MINUTES_PER_DAY {
            Self::LAST_MINUTE
        } else {
            TimeOfDay(minute)
        }
    }

    /// Build a start time from a minute offset, clamping into the day.
    pub(crate) fn from_start_minute(minute: u16) -> Self {
        TimeOfDay(minute.min(MINUTES_PER_DAY - 1))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = QuorumError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TimeOfDay::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Day-of-week index with Sunday = 0 through Saturday = 6.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| QuorumError::Validation(format!("malformed date '{}': {}", s, e)))
}
