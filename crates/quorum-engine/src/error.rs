//! Error types for quorum-engine operations.
//!
//! Every variant is raised at the write boundary (validation, store lookups,
//! persisted configuration). The resolver itself never fails: "no quorum" and
//! "no availability" are ordinary empty results.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuorumError {
    /// Malformed date or time, invalid day-of-week, end not after start.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Overlapping recurrence for the same participant and day-of-week.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing calendar, participant or recurrence.
    #[error("Not found: {kind} '{id}'")]
    NotFound { kind: &'static str, id: String },

    /// Unparseable persisted configuration (e.g. the allowed-hours blob).
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl QuorumError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        QuorumError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, QuorumError>;
