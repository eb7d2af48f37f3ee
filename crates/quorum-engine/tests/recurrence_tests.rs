//! Tests for weekly recurrence expansion.

use chrono::NaiveDate;
use quorum_engine::{expand, AvailabilityWindow, RecurrencePattern, TimeOfDay, WindowSource};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn t(s: &str) -> TimeOfDay {
    s.parse().unwrap()
}

const MONDAY: u8 = 1;
const SATURDAY: u8 = 6;

fn mondays_nine_to_five() -> RecurrencePattern {
    RecurrencePattern::weekly("r1", "alice", MONDAY, t("09:00"), t("17:00"))
}

fn dates(windows: impl Iterator<Item = AvailabilityWindow>) -> Vec<NaiveDate> {
    windows.map(|w| w.date).collect()
}

// ── Basic expansion ─────────────────────────────────────────────────────────

#[test]
fn expands_every_matching_weekday_in_range() {
    let pattern = mondays_nine_to_five();
    let got = dates(expand(&pattern, date(2025, 6, 1), date(2025, 6, 30)));
    assert_eq!(
        got,
        vec![
            date(2025, 6, 2),
            date(2025, 6, 9),
            date(2025, 6, 16),
            date(2025, 6, 23),
            date(2025, 6, 30),
        ]
    );
}

#[test]
fn occurrences_carry_pattern_times_and_provenance() {
    let pattern = mondays_nine_to_five();
    let first = expand(&pattern, date(2025, 6, 1), date(2025, 6, 30))
        .next()
        .unwrap();

    assert_eq!(first.participant_id, "alice");
    assert_eq!(first.start_time, Some(t("09:00")));
    assert_eq!(first.end_time, Some(t("17:00")));
    assert_eq!(first.source, WindowSource::Recurring);
    assert_eq!(first.recurrence_id.as_deref(), Some("r1"));
}

#[test]
fn range_bounds_are_inclusive() {
    let pattern = mondays_nine_to_five();
    let got = dates(expand(&pattern, date(2025, 6, 9), date(2025, 6, 16)));
    assert_eq!(got, vec![date(2025, 6, 9), date(2025, 6, 16)]);
}

#[test]
fn range_without_matching_weekday_is_empty() {
    let pattern = mondays_nine_to_five();
    // Tuesday through Sunday.
    assert_eq!(expand(&pattern, date(2025, 6, 10), date(2025, 6, 15)).count(), 0);
}

#[test]
fn inverted_range_is_empty() {
    let pattern = mondays_nine_to_five();
    assert_eq!(expand(&pattern, date(2025, 6, 30), date(2025, 6, 1)).count(), 0);
}

#[test]
fn invalid_day_of_week_yields_nothing() {
    let mut pattern = mondays_nine_to_five();
    pattern.day_of_week = 7;
    assert_eq!(expand(&pattern, date(2025, 6, 1), date(2025, 6, 30)).count(), 0);
    assert!(pattern.validate().is_err());
}

// ── Validity and exceptions ─────────────────────────────────────────────────

#[test]
fn validity_range_clips_expansion() {
    let mut pattern = mondays_nine_to_five();
    pattern.valid_from = Some(date(2025, 6, 5));
    pattern.valid_to = Some(date(2025, 6, 23));

    let got = dates(expand(&pattern, date(2025, 6, 1), date(2025, 6, 30)));
    assert_eq!(got, vec![date(2025, 6, 9), date(2025, 6, 16), date(2025, 6, 23)]);
}

#[test]
fn open_ended_validity_is_unbounded() {
    let mut pattern = RecurrencePattern::weekly("r2", "bob", SATURDAY, t("10:00"), t("12:00"));
    pattern.valid_from = Some(date(2025, 1, 1));

    // Far-future Saturdays are still produced.
    let got = dates(expand(&pattern, date(2030, 1, 1), date(2030, 1, 14)));
    assert_eq!(got, vec![date(2030, 1, 5), date(2030, 1, 12)]);
}

#[test]
fn exceptions_suppress_whole_occurrences() {
    let mut pattern = mondays_nine_to_five();
    pattern.exceptions.insert(date(2025, 6, 9));
    pattern.exceptions.insert(date(2025, 6, 30));

    let got = dates(expand(&pattern, date(2025, 6, 1), date(2025, 6, 30)));
    assert_eq!(got, vec![date(2025, 6, 2), date(2025, 6, 16), date(2025, 6, 23)]);
}

#[test]
fn occurrence_on_checks_a_single_date() {
    let mut pattern = mondays_nine_to_five();
    pattern.exceptions.insert(date(2025, 6, 9));

    assert!(pattern.occurrence_on(date(2025, 6, 2)).is_some());
    assert!(pattern.occurrence_on(date(2025, 6, 3)).is_none());
    assert!(pattern.occurrence_on(date(2025, 6, 9)).is_none());
}

// ── Laziness ────────────────────────────────────────────────────────────────

#[test]
fn expansion_is_restartable_by_cloning() {
    let pattern = mondays_nine_to_five();
    let expansion = expand(&pattern, date(2025, 6, 1), date(2025, 12, 31));

    let first_two: Vec<NaiveDate> = dates(expansion.clone().take(2));
    assert_eq!(first_two, vec![date(2025, 6, 2), date(2025, 6, 9)]);
    assert_eq!(expansion.count(), 31);
}

#[test]
fn huge_range_is_cheap_to_start() {
    let pattern = mondays_nine_to_five();
    let first = expand(&pattern, date(2000, 1, 1), date(9999, 12, 31)).next();
    // 2000-01-03 is the first Monday of 2000.
    assert_eq!(first.map(|w| w.date), Some(date(2000, 1, 3)));
}

// ── Validation and overlap ──────────────────────────────────────────────────

#[test]
fn validation_rejects_bad_times_and_ranges() {
    let backwards = RecurrencePattern::weekly("r", "alice", MONDAY, t("17:00"), t("09:00"));
    assert!(backwards.validate().is_err());

    let mut inverted = mondays_nine_to_five();
    inverted.valid_from = Some(date(2025, 7, 1));
    inverted.valid_to = Some(date(2025, 6, 1));
    assert!(inverted.validate().is_err());

    assert!(mondays_nine_to_five().validate().is_ok());
}

#[test]
fn overlap_requires_same_participant_weekday_and_validity() {
    let base = mondays_nine_to_five();

    let mut other_day = base.clone();
    other_day.day_of_week = 2;
    assert!(!base.overlaps(&other_day));

    let mut other_person = base.clone();
    other_person.participant_id = "bob".to_string();
    assert!(!base.overlaps(&other_person));

    // Open-ended ranges intersect everything.
    assert!(base.overlaps(&base.clone()));

    let mut spring = base.clone();
    spring.valid_from = Some(date(2025, 3, 1));
    spring.valid_to = Some(date(2025, 5, 31));
    let mut summer = base.clone();
    summer.valid_from = Some(date(2025, 6, 1));
    summer.valid_to = Some(date(2025, 8, 31));
    assert!(!spring.overlaps(&summer));
    assert!(!summer.overlaps(&spring));

    summer.valid_from = Some(date(2025, 5, 31));
    assert!(spring.overlaps(&summer));
}
