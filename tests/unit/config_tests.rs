//! Unit tests for configuration parsing and validation.
//!
//! Validates defaults, partial TOML overrides, duration accessors, file
//! loading, and every validation rejection.

use std::io::Write;
use std::time::Duration;

use trivia_arena::config::ArenaConfig;
use trivia_arena::GameError;

#[test]
fn defaults_match_documented_values() {
    let config = ArenaConfig::default();

    assert_eq!(config.timers.default_timeout_seconds, 30);
    assert_eq!(config.timers.challenge_timeout_seconds, 45);
    assert_eq!(config.timers.countdown_marks_seconds, vec![20, 10]);
    assert_eq!(config.timers.revalidation_interval_seconds, 10);
    assert_eq!(config.timers.fallback_grace_seconds, 15);
    assert_eq!(config.sweep.interval_seconds, 300);
    assert_eq!(config.sweep.max_session_seconds, 300);
    assert_eq!(config.health.error_window_seconds, 300);
    assert_eq!(config.health.warning_error_threshold, 5);
    assert_eq!(config.health.critical_error_threshold, 15);
    assert_eq!(config.health.inaccessible_warning_threshold, 3);
    assert_eq!(config.timer_event_capacity, 256);
}

#[test]
fn empty_document_equals_defaults() {
    let config = ArenaConfig::from_toml_str("").expect("empty config");
    assert_eq!(config, ArenaConfig::default());
}

#[test]
fn partial_override_keeps_other_defaults() {
    let config = ArenaConfig::from_toml_str(
        r"
[timers]
default_timeout_seconds = 20
countdown_marks_seconds = [15, 5]
",
    )
    .expect("partial config");

    assert_eq!(config.timers.default_timeout_seconds, 20);
    assert_eq!(config.timers.countdown_marks_seconds, vec![15, 5]);
    // Untouched sections keep their defaults.
    assert_eq!(config.timers.challenge_timeout_seconds, 45);
    assert_eq!(config.sweep.interval_seconds, 300);
    assert_eq!(config.health.warning_error_threshold, 5);
}

#[test]
fn duration_accessors_convert_seconds() {
    let config = ArenaConfig::from_toml_str(
        r"
[timers]
default_timeout_seconds = 7
challenge_timeout_seconds = 11
revalidation_interval_seconds = 3
fallback_grace_seconds = 4

[sweep]
interval_seconds = 60
max_session_seconds = 90

[health]
error_window_seconds = 120
",
    )
    .expect("config");

    assert_eq!(config.default_timeout(), Duration::from_secs(7));
    assert_eq!(config.challenge_timeout(), Duration::from_secs(11));
    assert_eq!(config.revalidation_interval(), Duration::from_secs(3));
    assert_eq!(config.fallback_grace(), Duration::from_secs(4));
    assert_eq!(config.sweep_interval(), Duration::from_secs(60));
    assert_eq!(config.max_session_age(), Duration::from_secs(90));
    assert_eq!(config.error_window(), Duration::from_secs(120));
}

#[test]
fn load_from_path_reads_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[timers]\ndefault_timeout_seconds = 12").expect("write");

    let config = ArenaConfig::load_from_path(file.path()).expect("load");
    assert_eq!(config.timers.default_timeout_seconds, 12);
}

#[test]
fn load_from_missing_path_is_config_error() {
    let err = ArenaConfig::load_from_path("/nonexistent/trivia.toml")
        .expect_err("missing file must fail");
    assert!(matches!(err, GameError::Config(_)), "got {err:?}");
}

#[test]
fn malformed_toml_is_config_error() {
    let err = ArenaConfig::from_toml_str("timers = 'not a table'").expect_err("parse must fail");
    assert!(matches!(err, GameError::Config(_)), "got {err:?}");
}

#[test]
fn zero_timeout_rejected() {
    let err = ArenaConfig::from_toml_str("[timers]\ndefault_timeout_seconds = 0")
        .expect_err("validation must fail");
    assert!(
        err.to_string().contains("default_timeout_seconds"),
        "got {err}"
    );
}

#[test]
fn zero_challenge_timeout_rejected() {
    let err = ArenaConfig::from_toml_str("[timers]\nchallenge_timeout_seconds = 0")
        .expect_err("validation must fail");
    assert!(
        err.to_string().contains("challenge_timeout_seconds"),
        "got {err}"
    );
}

#[test]
fn zero_revalidation_interval_rejected() {
    let err = ArenaConfig::from_toml_str("[timers]\nrevalidation_interval_seconds = 0")
        .expect_err("validation must fail");
    assert!(
        err.to_string().contains("revalidation_interval_seconds"),
        "got {err}"
    );
}

#[test]
fn zero_countdown_mark_rejected() {
    let err = ArenaConfig::from_toml_str("[timers]\ncountdown_marks_seconds = [20, 0]")
        .expect_err("validation must fail");
    assert!(
        err.to_string().contains("countdown_marks_seconds"),
        "got {err}"
    );
}

#[test]
fn zero_sweep_interval_rejected() {
    let err = ArenaConfig::from_toml_str("[sweep]\ninterval_seconds = 0")
        .expect_err("validation must fail");
    assert!(err.to_string().contains("interval_seconds"), "got {err}");
}

#[test]
fn max_session_below_default_timeout_rejected() {
    let err = ArenaConfig::from_toml_str(
        r"
[timers]
default_timeout_seconds = 30

[sweep]
max_session_seconds = 10
",
    )
    .expect_err("validation must fail");
    assert!(err.to_string().contains("max_session_seconds"), "got {err}");
}

#[test]
fn critical_below_warning_rejected() {
    let err = ArenaConfig::from_toml_str(
        r"
[health]
warning_error_threshold = 10
critical_error_threshold = 5
",
    )
    .expect_err("validation must fail");
    assert!(
        err.to_string().contains("critical_error_threshold"),
        "got {err}"
    );
}

#[test]
fn zero_event_capacity_rejected() {
    let err = ArenaConfig::from_toml_str("timer_event_capacity = 0")
        .expect_err("validation must fail");
    assert!(err.to_string().contains("timer_event_capacity"), "got {err}");
}
