//! RFC 5545 feed rendering for resolved slots.
//!
//! - Times are floating (FORM #1): no `TZID`, no trailing `Z`. The calendar's
//!   zone is only a client hint via `X-WR-TIMEZONE`; no `VTIMEZONE` is emitted.
//! - UIDs hash the calendar id, date, slot index and host, so they are stable
//!   across refetches.
//! - `SUMMARY` is `"{name} #{n}"` where `n` counts qualifying *dates* across
//!   the feed, starting at 1. All slots of one date share a number.
//! - A `00:00–23:59` slot becomes a full-day (`VALUE=DATE`) event. Any other
//!   slot that closes the day ends at the following midnight.
//! - Serialization (CRLF, 75-octet folding) is left to `icalendar`; TEXT
//!   values are escaped here before they are handed over.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use icalendar::{
    Calendar, CalendarDateTime, Component, DatePerhapsTime, Event, EventLike, Property,
};
use sha2::{Digest, Sha256};

use crate::model::{CalendarConfig, DaySlots, Participant, ResolvedSlot};
use crate::time::{TimeOfDay, MINUTES_PER_DAY};

pub const CONTENT_TYPE: &str = "text/calendar; charset=utf-8";
pub const CACHE_CONTROL: &str = "no-cache, no-store, must-revalidate";

/// Rendering inputs that do not come from the calendar itself.
#[derive(Debug, Clone)]
pub struct FeedOptions<'a> {
    /// Host component of event UIDs, see [`uid_host`].
    pub host: &'a str,
    /// Stamped as `DTSTAMP`; pass the request instant (or a fixed value for
    /// reproducible output).
    pub generated_at: DateTime<Utc>,
    /// Used to print participant names in descriptions; unknown ids are
    /// printed as-is.
    pub participants: &'a [Participant],
}

/// Pick the UID host: the first entry of a forwarded-host header (without a
/// port) when running behind a proxy, otherwise `default_domain`.
pub fn uid_host(forwarded_host: Option<&str>, default_domain: &str) -> String {
    forwarded_host
        .and_then(|raw| raw.split(',').next())
        .map(|host| strip_port(host.trim()))
        .filter(|host| !host.is_empty())
        .unwrap_or(default_domain)
        .to_ascii_lowercase()
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(close) => &host[..=close],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port))
            if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) && !name.contains(':') =>
        {
            name
        }
        _ => host,
    }
}

/// Stable event UID for slot `index` of `date`.
pub fn event_uid(calendar_id: &str, date: NaiveDate, index: usize, host: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(calendar_id.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(date.format("%Y-%m-%d").to_string().as_bytes());
    hasher.update(b"\x1f");
    hasher.update(index.to_string().as_bytes());
    hasher.update(b"\x1f");
    hasher.update(host.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}@{}", &digest[..32], host)
}

/// Render the feed for `config` from resolved days.
///
/// Days are emitted in date order; days without slots are skipped and do not
/// consume an event number.
pub fn render_feed(
    config: &CalendarConfig,
    days: &[DaySlots],
    options: &FeedOptions<'_>,
) -> String {
    let names: BTreeMap<&str, &str> = options
        .participants
        .iter()
        .map(|p| (p.id.as_str(), p.name.as_str()))
        .collect();

    let mut ordered: Vec<&DaySlots> = days.iter().filter(|d| !d.slots.is_empty()).collect();
    ordered.sort_by_key(|d| d.date);

    let mut calendar = Calendar::new();
    calendar
        .append_property(Property::new("METHOD", "PUBLISH"))
        .append_property(Property::new("X-WR-CALNAME", &escape_text(&config.name)))
        .append_property(Property::new("X-WR-TIMEZONE", &config.timezone));

    for (number, day) in (1..).zip(ordered) {
        for slot in &day.slots {
            calendar.push(slot_event(config, day, slot, number, &names, options));
        }
    }

    calendar.to_string()
}

fn slot_event(
    config: &CalendarConfig,
    day: &DaySlots,
    slot: &ResolvedSlot,
    number: usize,
    names: &BTreeMap<&str, &str>,
    options: &FeedOptions<'_>,
) -> Event {
    let next_day = slot.date.checked_add_days(Days::new(1)).unwrap_or(slot.date);
    let (starts, ends) = if slot.is_all_day() {
        (DatePerhapsTime::Date(slot.date), DatePerhapsTime::Date(next_day))
    } else {
        // An end that closes the day is the following midnight.
        let end = if slot.end.as_end_minute() == MINUTES_PER_DAY {
            floating(next_day, TimeOfDay::MIDNIGHT)
        } else {
            floating(slot.date, slot.end)
        };
        (floating(slot.date, slot.start), end)
    };

    Event::new()
        .uid(&event_uid(&config.id, slot.date, slot.index, options.host))
        .timestamp(options.generated_at)
        .starts(starts)
        .ends(ends)
        .summary(&escape_text(&format!("{} #{}", config.name, number)))
        .description(&escape_text(&describe(day, slot, names)))
        .add_property("TRANSP", "OPAQUE")
        .done()
}

/// Wall-clock time with no zone designator (RFC 5545 FORM #1).
fn floating(date: NaiveDate, time: TimeOfDay) -> DatePerhapsTime {
    let time = NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or_default();
    DatePerhapsTime::DateTime(CalendarDateTime::Floating(date.and_time(time)))
}

fn describe(day: &DaySlots, slot: &ResolvedSlot, names: &BTreeMap<&str, &str>) -> String {
    let name = |id: &str| names.get(id).copied().unwrap_or(id).to_string();

    let mut lines = Vec::new();
    if !slot.attendees.is_empty() {
        let whole: Vec<String> = slot.attendees.iter().map(|id| name(id.as_str())).collect();
        lines.push(format!("Available: {}", whole.join(", ")));
    }

    let partial: Vec<String> = slot
        .participants
        .iter()
        .filter(|id| !slot.attendees.contains(*id))
        .map(|id| name(id.as_str()))
        .collect();
    if !partial.is_empty() {
        lines.push(format!("Partly available: {}", partial.join(", ")));
    }

    let notes: Vec<String> = slot
        .participants
        .iter()
        .filter_map(|id| {
            day.notes
                .get(id)
                .map(|note| format!("{}: {}", name(id.as_str()), note))
        })
        .collect();
    if !notes.is_empty() {
        lines.push(String::new());
        lines.push("Notes:".to_string());
        lines.extend(notes);
    }

    lines.join("\n")
}

/// Escape a TEXT value (RFC 5545 §3.3.11).
pub fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            _ => escaped.push(ch),
        }
    }
    escaped
}
