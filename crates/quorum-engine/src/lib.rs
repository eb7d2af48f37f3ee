//! # quorum-engine
//!
//! Availability resolution and event-slot derivation for quorum calendars.
//!
//! Participants enter one-off availability windows and weekly recurring
//! patterns. For every eligible date the engine finds the maximal time slots in
//! which at least `threshold` participants are available at once, and renders
//! them as an RFC 5545 feed with floating times and stable UIDs.
//!
//! The engine is synchronous and side-effect free: every request re-derives its
//! slots from an immutable snapshot.
//!
//! ## Modules
//!
//! - [`eligibility`] — allowed weekdays, holiday policy, holiday eves
//! - [`holidays`] — timezone → country, rule-based holidays, injected cache
//! - [`recurrence`] — weekly pattern → lazy per-date windows
//! - [`aggregator`] — effective window per participant and date
//! - [`resolver`] — sweep-line quorum slot resolution
//! - [`ics`] — iCalendar feed rendering
//! - [`engine`] — date/range summaries and feed building
//! - [`store`] — validating in-memory snapshot store
//! - [`model`], [`time`], [`error`] — data types and errors

pub mod aggregator;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod holidays;
pub mod ics;
pub mod model;
pub mod recurrence;
pub mod resolver;
pub mod store;
pub mod time;

pub use aggregator::{AvailabilityAggregator, DayAvailability, EffectiveWindow};
pub use eligibility::{eligible_dates, is_allowed};
pub use engine::{
    build_feed, local_today, resolve_date, resolve_range, summarize_date, DateRange, DateSummary,
    DEFAULT_HORIZON_DAYS,
};
pub use error::QuorumError;
pub use holidays::{country_for_timezone, BuiltinHolidays, CountryCode, HolidayCache, HolidaySource};
pub use ics::{render_feed, uid_host, FeedOptions, CACHE_CONTROL, CONTENT_TYPE};
pub use model::{
    AllowedHours, Availability, AvailabilityWindow, CalendarConfig, DaySlots, HolidaysPolicy,
    Participant, RecurrencePattern, ResolvedSlot, WindowSource,
};
pub use recurrence::expand;
pub use resolver::resolve_slots;
pub use store::{CalendarData, MemoryStore, Snapshot};
pub use time::TimeOfDay;
