//! Tests for quorum slot resolution on a single date.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use quorum_engine::resolver::resolve_slots;
use quorum_engine::{Availability, ResolvedSlot, TimeOfDay};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn t(s: &str) -> TimeOfDay {
    s.parse().unwrap()
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()
}

fn window(start: &str, end: &str) -> Availability {
    Availability::window(t(start), t(end)).unwrap()
}

fn ids(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn resolve(windows: &[(&'static str, Availability)], threshold: u32, min: u32) -> Vec<ResolvedSlot> {
    resolve_slots(day(), windows.iter().copied(), threshold, min)
}

// ── Documented scenarios ────────────────────────────────────────────────────

#[test]
fn gap_between_quorum_regions_yields_two_slots() {
    let windows = [
        ("p1", window("00:00", "23:59")),
        ("p2", window("00:00", "12:00")),
        ("p3", window("14:00", "23:59")),
    ];

    let slots = resolve(&windows, 2, 0);

    assert_eq!(slots.len(), 2);
    assert_eq!((slots[0].start, slots[0].end), (t("00:00"), t("12:00")));
    assert_eq!(slots[0].participants, ids(&["p1", "p2"]));
    assert_eq!(slots[0].index, 0);

    assert_eq!((slots[1].start, slots[1].end), (t("14:00"), t("23:59")));
    assert_eq!(slots[1].participants, ids(&["p1", "p3"]));
    assert_eq!(slots[1].index, 1);
}

#[test]
fn touching_quorum_regions_merge_into_one_slot() {
    let windows = [
        ("p1", window("00:00", "23:59")),
        ("p2", window("00:00", "12:00")),
        ("p3", window("12:00", "23:59")),
    ];

    let slots = resolve(&windows, 2, 0);

    assert_eq!(slots.len(), 1, "adjacent qualifying intervals must merge");
    assert_eq!((slots[0].start, slots[0].end), (t("00:00"), t("23:59")));
    assert!(slots[0].is_all_day());
    assert_eq!(slots[0].participants, ids(&["p1", "p2", "p3"]));
    // Only p1 is there for the whole slot.
    assert_eq!(slots[0].attendees, ids(&["p1"]));
}

// ── Empty outcomes ──────────────────────────────────────────────────────────

#[test]
fn threshold_above_participant_count_is_empty_not_error() {
    let windows = [
        ("p1", window("09:00", "17:00")),
        ("p2", window("09:00", "17:00")),
    ];
    assert!(resolve(&windows, 3, 0).is_empty());
}

#[test]
fn no_availability_is_empty() {
    assert!(resolve(&[], 1, 0).is_empty());
}

#[test]
fn overlapping_but_never_simultaneous_enough_is_empty() {
    let windows = [
        ("p1", window("09:00", "11:00")),
        ("p2", window("10:00", "12:00")),
        ("p3", window("11:30", "13:00")),
    ];
    assert!(resolve(&windows, 3, 0).is_empty());
}

// ── Sweep-line behaviour ────────────────────────────────────────────────────

#[test]
fn threshold_one_unions_all_windows() {
    let windows = [
        ("p1", window("09:00", "10:00")),
        ("p2", window("09:30", "11:00")),
        ("p3", window("13:00", "14:00")),
    ];

    let slots = resolve(&windows, 1, 0);

    assert_eq!(slots.len(), 2);
    assert_eq!((slots[0].start, slots[0].end), (t("09:00"), t("11:00")));
    assert_eq!(slots[0].participants, ids(&["p1", "p2"]));
    assert!(slots[0].attendees.is_empty());
    assert_eq!((slots[1].start, slots[1].end), (t("13:00"), t("14:00")));
}

#[test]
fn quorum_is_only_the_overlap() {
    let windows = [
        ("p1", window("09:00", "12:00")),
        ("p2", window("10:30", "15:00")),
    ];

    let slots = resolve(&windows, 2, 0);

    assert_eq!(slots.len(), 1);
    assert_eq!((slots[0].start, slots[0].end), (t("10:30"), t("12:00")));
    assert_eq!(slots[0].duration_minutes(), 90);
    assert_eq!(slots[0].attendees, ids(&["p1", "p2"]));
}

#[test]
fn handoff_between_participants_keeps_quorum_continuous() {
    // p1 leaves exactly when p3 arrives; p2 is there throughout.
    let windows = [
        ("p1", window("08:00", "12:00")),
        ("p2", window("08:00", "18:00")),
        ("p3", window("12:00", "18:00")),
    ];

    let slots = resolve(&windows, 2, 0);

    assert_eq!(slots.len(), 1);
    assert_eq!((slots[0].start, slots[0].end), (t("08:00"), t("18:00")));
    assert_eq!(slots[0].attendees, ids(&["p2"]));
}

#[test]
fn all_day_variant_equals_explicit_full_day() {
    let explicit = [("p1", window("00:00", "23:59")), ("p2", window("00:00", "23:59"))];
    let implicit = [("p1", Availability::AllDay), ("p2", Availability::AllDay)];

    assert_eq!(resolve(&explicit, 2, 0), resolve(&implicit, 2, 0));
}

#[test]
fn end_of_day_window_covers_last_minute() {
    let windows = [
        ("p1", window("22:00", "23:59")),
        ("p2", Availability::AllDay),
    ];

    let slots = resolve(&windows, 2, 0);

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].end, TimeOfDay::LAST_MINUTE);
    assert_eq!(slots[0].duration_minutes(), 120);
}

// ── Minimum duration ────────────────────────────────────────────────────────

#[test]
fn short_slots_are_dropped_and_indices_stay_dense() {
    let windows = [
        ("p1", window("09:00", "17:00")),
        ("p2", window("09:00", "10:00")),
        ("p3", window("11:00", "17:00")),
    ];

    let all = resolve(&windows, 2, 0);
    assert_eq!(all.len(), 2);

    let long_only = resolve(&windows, 2, 120);
    assert_eq!(long_only.len(), 1);
    assert_eq!((long_only[0].start, long_only[0].end), (t("11:00"), t("17:00")));
    assert_eq!(long_only[0].index, 0, "numbering happens after filtering");
}

#[test]
fn slot_exactly_at_minimum_duration_survives() {
    let windows = [("p1", window("09:00", "10:00")), ("p2", window("09:00", "10:00"))];
    assert_eq!(resolve(&windows, 2, 60).len(), 1);
    assert!(resolve(&windows, 2, 61).is_empty());
}

// ── Determinism ─────────────────────────────────────────────────────────────

#[test]
fn input_order_does_not_matter() {
    let forward = [
        ("a", window("09:00", "12:00")),
        ("b", window("10:00", "14:00")),
        ("c", window("11:00", "16:00")),
    ];
    let mut backward = forward;
    backward.reverse();

    assert_eq!(resolve(&forward, 2, 0), resolve(&backward, 2, 0));
}

#[test]
fn zero_threshold_behaves_as_one() {
    let windows = [("p1", window("09:00", "10:00"))];
    assert_eq!(resolve(&windows, 0, 0), resolve(&windows, 1, 0));
}
