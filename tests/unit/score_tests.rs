//! Unit tests for the time-decay scoring rule.
//!
//! The rule: 10% decay per 5 seconds elapsed, capped at 50%, floored at 1
//! point for a correct answer; incorrect answers always score 0.

use std::time::Duration;

use trivia_arena::game::answers::score;

#[test]
fn instant_answer_earns_full_points() {
    assert_eq!(score(10, Duration::ZERO, true), 10);
    assert_eq!(score(30, Duration::from_millis(20), true), 30);
}

#[test]
fn decay_is_ten_percent_per_five_seconds() {
    assert_eq!(score(10, Duration::from_secs(5), true), 9);
    assert_eq!(score(10, Duration::from_secs(10), true), 8);
    assert_eq!(score(20, Duration::from_secs(5), true), 18);
    assert_eq!(score(30, Duration::from_secs(15), true), 21);
}

#[test]
fn partial_seconds_decay_linearly() {
    // 2.5 s is a 5% penalty: floor(10 * 0.95) = 9.
    assert_eq!(score(10, Duration::from_millis(2500), true), 9);
    // 7.5 s is a 15% penalty: floor(20 * 0.85) = 17.
    assert_eq!(score(20, Duration::from_millis(7500), true), 17);
}

#[test]
fn decay_caps_at_half() {
    assert_eq!(score(10, Duration::from_secs(25), true), 5);
    assert_eq!(score(10, Duration::from_secs(300), true), 5);
    assert_eq!(score(30, Duration::from_secs(60), true), 15);
}

#[test]
fn correct_answer_never_scores_below_one() {
    assert_eq!(score(1, Duration::from_secs(30), true), 1);
    assert_eq!(score(0, Duration::ZERO, true), 1);
}

#[test]
fn incorrect_answer_scores_zero() {
    assert_eq!(score(10, Duration::ZERO, false), 0);
    assert_eq!(score(30, Duration::from_secs(2), false), 0);
}
