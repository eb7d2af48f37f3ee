//! Integration tests for the `quorum` CLI binary.
//!
//! These tests use `assert_cmd` and `predicates` to run the feed, range, date,
//! eligible and validate subcommands through the actual binary, including
//! stdin input, file output, environment configuration and error reporting.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;

/// Helper: path to the team.json fixture.
fn team_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/team.json")
}

/// Helper: path to a snapshot with two overlapping recurrences.
fn overlapping_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/overlapping.json")
}

fn team_json() -> String {
    std::fs::read_to_string(team_path()).expect("team.json fixture must exist")
}

/// Helper: `quorum` with a clean logging environment.
fn quorum() -> Command {
    let mut cmd = cargo_bin_cmd!("quorum");
    cmd.env_remove("RUST_LOG").env_remove("QUORUM_DEFAULT_DOMAIN");
    cmd
}

const WEEK: [&str; 4] = ["--from", "2025-06-30", "--to", "2025-07-06"];

// ─────────────────────────────────────────────────────────────────────────────
// feed
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn feed_renders_the_week() {
    quorum()
        .args(["feed", "-s", team_path()])
        .args(WEEK)
        .args(["--host", "Cal.Example.com:443", "--generated-at", "2025-06-29T08:00:00Z"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("BEGIN:VCALENDAR\r\n"))
        .stdout(predicate::str::contains("X-WR-TIMEZONE:America/New_York\r\n"))
        .stdout(predicate::str::contains("DTSTART:20250630T130000\r\n"))
        .stdout(predicate::str::contains("DTSTART:20250702T100000\r\n"))
        .stdout(predicate::str::contains("SUMMARY:Team #2\r\n"))
        .stdout(predicate::str::contains("DTSTAMP:20250629T080000Z\r\n"))
        .stdout(predicate::str::contains("@cal.example.com\r\n"))
        // Independence Day is blocked.
        .stdout(predicate::str::contains("20250704").not());
}

#[test]
fn feed_reads_stdin_and_default_domain_from_env() {
    quorum()
        .env("QUORUM_DEFAULT_DOMAIN", "feeds.example.org")
        .arg("feed")
        .args(WEEK)
        .args(["--generated-at", "2025-06-29T08:00:00Z"])
        .write_stdin(team_json())
        .assert()
        .success()
        .stdout(predicate::str::contains("@feeds.example.org\r\n"));
}

#[test]
fn feed_is_reproducible() {
    let run = || {
        quorum()
            .args(["feed", "-s", team_path()])
            .args(WEEK)
            .args(["--generated-at", "2025-06-29T08:00:00+02:00"])
            .output()
            .unwrap()
            .stdout
    };
    let first = run();
    assert!(!first.is_empty());
    assert_eq!(first, run());
}

#[test]
fn feed_writes_to_file() {
    let output_path = std::env::temp_dir().join("quorum-cli-test-feed.ics");
    let _ = std::fs::remove_file(&output_path);

    quorum()
        .args(["feed", "-s", team_path()])
        .args(WEEK)
        .args(["--generated-at", "2025-06-29T08:00:00Z", "-o"])
        .arg(&output_path)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let content = std::fs::read_to_string(&output_path).expect("output file must exist");
    assert_eq!(content.matches("BEGIN:VEVENT").count(), 2);
    let _ = std::fs::remove_file(&output_path);
}

#[test]
fn feed_rejects_a_bad_instant() {
    quorum()
        .args(["feed", "-s", team_path(), "--generated-at", "yesterday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("RFC 3339"));
}

// ─────────────────────────────────────────────────────────────────────────────
// range / date / eligible
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn range_prints_resolved_days_as_json() {
    let output = quorum()
        .args(["range", "-s", team_path()])
        .args(WEEK)
        .output()
        .unwrap();
    assert!(output.status.success());

    let days: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let days = days.as_array().unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[0]["date"], "2025-06-30");
    assert_eq!(days[0]["slots"][0]["start"], "13:00");
    assert_eq!(days[0]["slots"][0]["end"], "17:00");
    assert_eq!(days[1]["date"], "2025-07-02");
    assert_eq!(days[1]["notes"]["carol"], "leaves early");
}

#[test]
fn date_summarizes_a_blocked_holiday() {
    let output = quorum()
        .args(["date", "-s", team_path(), "--date", "2025-07-04"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["eligible"], false);
    assert_eq!(summary["slots"].as_array().unwrap().len(), 0);
    assert_eq!(summary["availability"]["bob"]["source"], "recurring");
    assert_eq!(summary["availability"]["bob"]["availability"]["end"], "12:00");
}

#[test]
fn eligible_lists_weekdays_without_holidays() {
    quorum()
        .args(["eligible", "-s", team_path()])
        .args(WEEK)
        .assert()
        .success()
        .stdout("2025-06-30\n2025-07-01\n2025-07-02\n2025-07-03\n");
}

#[test]
fn inverted_range_is_an_error() {
    quorum()
        .args(["range", "-s", team_path(), "--from", "2025-07-06", "--to", "2025-06-30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date range"));
}

#[test]
fn malformed_date_argument_is_rejected() {
    quorum()
        .args(["date", "-s", team_path(), "--date", "2025-13-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed date"));
}

// ─────────────────────────────────────────────────────────────────────────────
// validate
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn validate_summarizes_a_good_snapshot() {
    quorum()
        .args(["validate", "-s", team_path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("ok: calendar 'cal-1' (Team)"))
        .stdout(predicate::str::contains("3 participants, 1 windows, 5 recurrences"));
}

#[test]
fn validate_reports_conflicts() {
    quorum()
        .args(["validate", "-s", overlapping_path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid snapshot"))
        .stderr(predicate::str::contains("Conflict"));
}

#[test]
fn malformed_json_on_stdin_is_an_error() {
    quorum()
        .arg("validate")
        .write_stdin("{ not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid snapshot"));
}

#[test]
fn missing_file_is_an_error() {
    quorum()
        .args(["validate", "-s", "/nonexistent/quorum/team.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging and help
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn quiet_by_default() {
    quorum()
        .args(["range", "-s", team_path()])
        .args(WEEK)
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn verbose_logs_to_stderr() {
    quorum()
        .args(["range", "--verbose", "-s", team_path()])
        .args(WEEK)
        .assert()
        .success()
        .stderr(predicate::str::contains("resolved range"));
}

#[test]
fn no_subcommand_prints_help() {
    quorum()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
