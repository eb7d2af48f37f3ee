//! WASM bindings for quorum-engine.
//!
//! Exposes slot resolution, date summaries, eligibility checks and feed
//! rendering to JavaScript via `wasm-bindgen`. Complex values cross the
//! boundary as JSON strings in the same shapes the engine serializes: a
//! snapshot is `{"calendar": {...}, "participants": [...], "windows": [...],
//! "recurrences": [...]}`, dates are `YYYY-MM-DD`.
//!
//! Each export builds its own holiday cache, so calls share no state.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p quorum-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target nodejs --out-dir packages/quorum-engine-js/wasm/ \
//!   target/wasm32-unknown-unknown/release/quorum_engine_wasm.wasm
//! ```

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use quorum_engine::time::parse_date;
use quorum_engine::{
    build_feed, is_allowed, resolve_date, resolve_range, summarize_date, uid_host,
    AvailabilityWindow, CalendarConfig, DateRange, HolidayCache, HolidaysPolicy, MemoryStore,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Argument parsing, with plain string errors so it runs outside a JS host
// ---------------------------------------------------------------------------

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization error: {}", e))
}

fn date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_date(raw).map_err(|e| e.to_string())
}

fn load_snapshot(json: &str) -> Result<MemoryStore, String> {
    MemoryStore::from_json(json).map_err(|e| e.to_string())
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("Invalid instant '{}': {}", raw, e))
}

fn parse_policy(raw: &str) -> Result<HolidaysPolicy, String> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_ascii_lowercase()))
        .map_err(|_| format!("Unknown holidays policy '{}' (expected ignore, allow or block)", raw))
}

/// Explicit bounds win; missing ones come from the calendar's own range as
/// seen at `now`.
fn range_arg(
    config: &CalendarConfig,
    from: Option<&str>,
    to: Option<&str>,
    now: DateTime<Utc>,
) -> Result<DateRange, String> {
    let default = DateRange::for_calendar_at(config, now);
    let start = from.map(date_arg).transpose()?.unwrap_or(default.start);
    let end = to.map(date_arg).transpose()?.unwrap_or(default.end);
    DateRange::new(start, end).map_err(|e| e.to_string())
}

fn resolve_date_impl(config_json: &str, date: &str, windows_json: &str) -> Result<String, String> {
    let config: CalendarConfig = serde_json::from_str(config_json)
        .map_err(|e| format!("Invalid calendar JSON: {}", e))?;
    config.validate().map_err(|e| e.to_string())?;
    let windows: Vec<AvailabilityWindow> = serde_json::from_str(windows_json)
        .map_err(|e| format!("Invalid windows JSON: {}", e))?;

    to_json(&resolve_date(&config, date_arg(date)?, &windows))
}

fn resolve_range_impl(snapshot_json: &str, from: &str, to: &str) -> Result<String, String> {
    let store = load_snapshot(snapshot_json)?;
    let range = DateRange::new(date_arg(from)?, date_arg(to)?).map_err(|e| e.to_string())?;
    let holidays = HolidayCache::builtin();

    to_json(&resolve_range(store.calendar(), store.snapshot(), range, &holidays))
}

fn summarize_date_impl(snapshot_json: &str, date: &str) -> Result<String, String> {
    let store = load_snapshot(snapshot_json)?;
    let holidays = HolidayCache::builtin();

    to_json(&summarize_date(
        store.calendar(),
        store.snapshot(),
        date_arg(date)?,
        &holidays,
    ))
}

fn build_feed_impl(
    snapshot_json: &str,
    generated_at: &str,
    default_domain: &str,
    forwarded_host: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<String, String> {
    let store = load_snapshot(snapshot_json)?;
    let generated_at = parse_instant(generated_at)?;
    let range = range_arg(store.calendar(), from, to, generated_at)?;
    let host = uid_host(forwarded_host, default_domain);
    let holidays = HolidayCache::builtin();

    Ok(build_feed(
        store.calendar(),
        store.snapshot(),
        range,
        &holidays,
        &host,
        generated_at,
    ))
}

fn is_allowed_impl(
    date: &str,
    timezone: &str,
    allowed_weekdays_json: &str,
    holidays_policy: &str,
    allow_holiday_eves: bool,
) -> Result<bool, String> {
    let weekdays: BTreeSet<u8> = serde_json::from_str(allowed_weekdays_json)
        .map_err(|e| format!("Invalid weekdays JSON: {}", e))?;
    let policy = parse_policy(holidays_policy)?;
    let holidays = HolidayCache::builtin();

    Ok(is_allowed(
        date_arg(date)?,
        timezone,
        &weekdays,
        policy,
        allow_holiday_eves,
        &holidays,
    ))
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Resolve the quorum slots of one date from stored windows.
///
/// Returns a JSON array of slots (`{date, start, end, index, participants,
/// attendees}`).
///
/// # Arguments
/// - `config_json` -- calendar configuration object
/// - `date` -- the date to resolve (`YYYY-MM-DD`)
/// - `windows_json` -- array of availability windows for that date
#[wasm_bindgen(js_name = "resolveDate")]
pub fn resolve_date_js(config_json: &str, date: &str, windows_json: &str) -> Result<String, JsValue> {
    resolve_date_impl(config_json, date, windows_json).map_err(|e| JsValue::from_str(&e))
}

/// Resolve every eligible date of `[from, to]` that reaches quorum.
///
/// Returns a JSON array of `{date, slots, notes}` objects.
#[wasm_bindgen(js_name = "resolveRange")]
pub fn resolve_range_js(snapshot_json: &str, from: &str, to: &str) -> Result<String, JsValue> {
    resolve_range_impl(snapshot_json, from, to).map_err(|e| JsValue::from_str(&e))
}

/// Eligibility, effective availability and slots of a single date.
#[wasm_bindgen(js_name = "summarizeDate")]
pub fn summarize_date_js(snapshot_json: &str, date: &str) -> Result<String, JsValue> {
    summarize_date_impl(snapshot_json, date).map_err(|e| JsValue::from_str(&e))
}

/// Render the calendar's iCalendar feed.
///
/// # Arguments
/// - `snapshot_json` -- calendar snapshot
/// - `generated_at` -- RFC 3339 instant stamped as `DTSTAMP`; also anchors the
///   default range
/// - `default_domain` -- UID host when no forwarded host is given
/// - `forwarded_host` -- optional forwarded-host header value
/// - `from`, `to` -- optional range bounds (`YYYY-MM-DD`)
#[wasm_bindgen(js_name = "buildFeed")]
pub fn build_feed_js(
    snapshot_json: &str,
    generated_at: &str,
    default_domain: &str,
    forwarded_host: Option<String>,
    from: Option<String>,
    to: Option<String>,
) -> Result<String, JsValue> {
    build_feed_impl(
        snapshot_json,
        generated_at,
        default_domain,
        forwarded_host.as_deref(),
        from.as_deref(),
        to.as_deref(),
    )
    .map_err(|e| JsValue::from_str(&e))
}

/// Whether `date` may carry events under the given weekday set and holiday
/// policy (`"ignore"`, `"allow"` or `"block"`).
#[wasm_bindgen(js_name = "isAllowed")]
pub fn is_allowed_js(
    date: &str,
    timezone: &str,
    allowed_weekdays_json: &str,
    holidays_policy: &str,
    allow_holiday_eves: bool,
) -> Result<bool, JsValue> {
    is_allowed_impl(
        date,
        timezone,
        allowed_weekdays_json,
        holidays_policy,
        allow_holiday_eves,
    )
    .map_err(|e| JsValue::from_str(&e))
}
