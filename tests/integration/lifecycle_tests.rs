//! Integration tests for the session lifecycle.
//!
//! Validates:
//! - channel exclusivity under sequential and racing starts
//! - permission gating and inaccessible-mark recovery
//! - stale-session eviction by a later start attempt
//! - explicit ends, idempotent ends, and lifecycle snapshots

use std::sync::Arc;
use std::time::Duration;

use trivia_arena::models::{ChannelId, Difficulty, EndReason, UserId};
use trivia_arena::{GameError, StartGame};

use super::test_helpers::{
    arena_config, blank_question, choice_question, fast_config, mixed_bank, test_engine,
    test_engine_with_probe, ScriptedProbe,
};

#[tokio::test]
async fn second_start_on_busy_channel_is_rejected() {
    let engine = test_engine(fast_config(), vec![choice_question()]);
    let channel = ChannelId(1);

    let first = engine
        .start_game(StartGame::new(channel, UserId(10)))
        .await
        .expect("first start");

    let err = engine
        .start_game(StartGame::new(channel, UserId(11)))
        .await
        .expect_err("second start must be rejected");
    assert!(matches!(err, GameError::Concurrency(_)), "got {err:?}");

    // The original session is untouched by the rejection.
    let active = engine.active_game(channel).await.expect("still active");
    assert_eq!(active.id, first.id);
}

#[tokio::test]
async fn racing_starts_yield_exactly_one_session() {
    let engine = Arc::new(test_engine(fast_config(), vec![choice_question()]));
    let channel = ChannelId(7);

    let mut handles = Vec::new();
    for user in 1..=8_u64 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine.start_game(StartGame::new(channel, UserId(user))).await
        }));
    }

    let mut started = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.expect("start task") {
            Ok(_) => started += 1,
            Err(GameError::Concurrency(_)) => rejected += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(started, 1);
    assert_eq!(rejected, 7);
    assert_eq!(engine.stats().await.active_sessions, 1);
}

#[tokio::test]
async fn channels_host_sessions_independently() {
    let engine = test_engine(fast_config(), vec![choice_question()]);

    for raw in 1..=3_u64 {
        engine
            .start_game(StartGame::new(ChannelId(raw), UserId(raw)))
            .await
            .expect("start");
    }
    assert_eq!(engine.stats().await.active_sessions, 3);

    assert!(engine.end_game(ChannelId(2), EndReason::Cancelled).await);

    assert!(engine.active_game(ChannelId(1)).await.is_some());
    assert!(engine.active_game(ChannelId(2)).await.is_none());
    assert!(engine.active_game(ChannelId(3)).await.is_some());
}

#[tokio::test]
async fn unreachable_channel_is_refused_and_marked() {
    let probe = ScriptedProbe::open();
    let engine = test_engine_with_probe(fast_config(), vec![choice_question()], Arc::clone(&probe));
    let channel = ChannelId(40);

    probe.deny(channel);
    let err = engine
        .start_game(StartGame::new(channel, UserId(1)))
        .await
        .expect_err("denied channel must refuse the start");
    assert!(matches!(err, GameError::Permission(_)), "got {err:?}");

    let report = engine.health_report().await;
    assert_eq!(report.inaccessible_channels, vec![channel]);
    // The failed start leaves no bookkeeping behind.
    assert_eq!(engine.stats().await.locks, 0);

    // Once the channel recovers, a start succeeds and sheds the mark.
    probe.allow(channel);
    engine
        .start_game(StartGame::new(channel, UserId(1)))
        .await
        .expect("start after recovery");
    assert!(engine.health_report().await.inaccessible_channels.is_empty());
}

#[tokio::test]
async fn stale_session_is_evicted_by_the_next_start() {
    let config = arena_config(
        r"
[timers]
default_timeout_seconds = 1
revalidation_interval_seconds = 1
fallback_grace_seconds = 1

[sweep]
interval_seconds = 300
max_session_seconds = 2
",
    );
    let engine = test_engine(config, vec![choice_question()]);
    let channel = ChannelId(5);

    // Park a session far past the hard maximum age; the long override keeps
    // its own timers from resolving it first.
    let stale = engine
        .start_game(
            StartGame::new(channel, UserId(1)).with_timeout(Duration::from_secs(3600)),
        )
        .await
        .expect("first start");

    tokio::time::sleep(Duration::from_millis(2300)).await;

    let replacement = engine
        .start_game(StartGame::new(channel, UserId(2)))
        .await
        .expect("start over the stale session");
    assert_ne!(replacement.id, stale.id);

    let active = engine.active_game(channel).await.expect("active");
    assert_eq!(active.id, replacement.id);
    assert_eq!(active.user_id, UserId(2));
}

#[tokio::test]
async fn end_game_reports_whether_a_session_ended() {
    let engine = test_engine(fast_config(), vec![choice_question()]);
    let channel = ChannelId(9);
    let reason = EndReason::Cancelled;

    engine
        .start_game(StartGame::new(channel, UserId(1)))
        .await
        .expect("start");

    assert!(engine.end_game(channel, reason).await);
    // Ending again, or ending an idle channel, is a reported no-op.
    assert!(!engine.end_game(channel, reason).await);
    assert!(!engine.end_game(ChannelId(999), reason).await);
}

#[tokio::test]
async fn active_game_snapshots_the_live_session() {
    let engine = test_engine(fast_config(), vec![choice_question()]);
    let channel = ChannelId(12);
    let user = UserId(34);

    let started = engine
        .start_game(StartGame::new(channel, user))
        .await
        .expect("start");

    let active = engine.active_game(channel).await.expect("active");
    assert_eq!(active.id, started.id);
    assert_eq!(active.channel_id, channel);
    assert_eq!(active.user_id, user);
    assert!(active.is_live());
    assert!(!active.challenge);
    assert_eq!(active.timeout, Duration::from_secs(2));
    assert!(active.participants.contains(&user));

    engine.end_game(channel, EndReason::Cancelled).await;
    assert!(engine.active_game(channel).await.is_none());
}

#[tokio::test]
async fn challenge_sessions_use_the_longer_timeout() {
    let engine = test_engine(fast_config(), vec![choice_question()]);

    let session = engine
        .start_game(StartGame::new(ChannelId(3), UserId(1)).as_challenge())
        .await
        .expect("start challenge");
    assert!(session.challenge);
    assert_eq!(session.timeout, Duration::from_secs(4));
    assert_eq!(engine.stats().await.challenge_sessions, 1);
}

#[tokio::test]
async fn timeout_override_wins_over_defaults() {
    let engine = test_engine(fast_config(), vec![choice_question()]);

    let session = engine
        .start_game(
            StartGame::new(ChannelId(4), UserId(1)).with_timeout(Duration::from_secs(90)),
        )
        .await
        .expect("start");
    assert_eq!(session.timeout, Duration::from_secs(90));
}

#[tokio::test]
async fn empty_bank_fails_the_start_cleanly() {
    let engine = test_engine(fast_config(), Vec::new());

    let err = engine
        .start_game(StartGame::new(ChannelId(6), UserId(1)))
        .await
        .expect_err("no question available");
    assert!(matches!(err, GameError::Game(_)), "got {err:?}");

    let stats = engine.stats().await;
    assert_eq!(stats.active_sessions, 0);
    assert_eq!(stats.timers, 0);
    assert_eq!(stats.locks, 0);
}

#[tokio::test]
async fn difficulty_constraint_selects_matching_questions() {
    let engine = test_engine(fast_config(), mixed_bank());

    let session = engine
        .start_game(StartGame::new(ChannelId(8), UserId(1)).with_difficulty(Difficulty::Hard))
        .await
        .expect("start");
    assert_eq!(session.difficulty, Difficulty::Hard);
    assert_eq!(session.question.text, blank_question().text);
}

#[tokio::test]
async fn unstocked_difficulty_tier_fails_the_start() {
    let engine = test_engine(fast_config(), vec![choice_question()]);

    let err = engine
        .start_game(
            StartGame::new(ChannelId(2), UserId(1)).with_difficulty(Difficulty::Medium),
        )
        .await
        .expect_err("easy-only bank has no medium questions");
    assert!(matches!(err, GameError::Game(_)), "got {err:?}");
    assert_eq!(engine.stats().await.locks, 0);
}
