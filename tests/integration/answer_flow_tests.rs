//! Integration tests for answer ingestion and arbitration.
//!
//! Validates:
//! - single-shot resolution for correct and incorrect answers
//! - shape filtering per question kind (reactions and text)
//! - checker-failure containment
//! - time-decayed scoring through the public answer path
//! - exactly-once resolution under racing answers

use std::sync::Arc;
use std::time::Duration;

use trivia_arena::models::{ChannelId, UserId};
use trivia_arena::providers::StaticQuestionSource;
use trivia_arena::{GameEngine, StartGame};

use super::test_helpers::{
    blank_question, choice_question, fast_config, init_tracing, test_engine, truth_question,
    FailingChecker, ScriptedProbe,
};

#[tokio::test]
async fn correct_reaction_resolves_the_game() {
    let engine = test_engine(fast_config(), vec![choice_question()]);
    let channel = ChannelId(1);

    engine
        .start_game(StartGame::new(channel, UserId(1)))
        .await
        .expect("start");

    let outcome = engine
        .process_reaction_answer(channel, UserId(2), "🇧")
        .await
        .expect("answer path")
        .expect("resolved");
    assert!(outcome.correct);
    assert_eq!(outcome.points, 10);
    assert!(outcome.elapsed < Duration::from_secs(1));
    assert_eq!(
        outcome.explanation.as_deref(),
        Some("Mercury orbits at roughly a third of Earth's distance.")
    );

    assert!(engine.active_game(channel).await.is_none());
    let stats = engine.stats().await;
    assert_eq!(stats.active_sessions, 0);
    assert_eq!(stats.timers, 0);
    assert_eq!(stats.locks, 0);
}

#[tokio::test]
async fn wrong_answer_also_closes_the_game() {
    let engine = test_engine(fast_config(), vec![choice_question()]);
    let channel = ChannelId(2);

    engine
        .start_game(StartGame::new(channel, UserId(1)))
        .await
        .expect("start");

    let outcome = engine
        .process_reaction_answer(channel, UserId(1), "🇦")
        .await
        .expect("answer path")
        .expect("resolved");
    assert!(!outcome.correct);
    assert_eq!(outcome.points, 0);

    // One shot per question: wrong answers burn the session too.
    assert!(engine.active_game(channel).await.is_none());
}

#[tokio::test]
async fn later_answers_find_no_game() {
    let engine = test_engine(fast_config(), vec![choice_question()]);
    let channel = ChannelId(3);

    engine
        .start_game(StartGame::new(channel, UserId(1)))
        .await
        .expect("start");
    engine
        .process_text_answer(channel, UserId(1), "b")
        .await
        .expect("answer path")
        .expect("resolved");

    let follow_up = engine
        .process_text_answer(channel, UserId(2), "b")
        .await
        .expect("answer path");
    assert!(follow_up.is_none());
}

#[tokio::test]
async fn answers_to_idle_channels_are_ignored() {
    let engine = test_engine(fast_config(), vec![choice_question()]);

    let outcome = engine
        .process_text_answer(ChannelId(77), UserId(1), "b")
        .await
        .expect("answer path");
    assert!(outcome.is_none());
    // The idle path allocates no per-channel bookkeeping.
    assert_eq!(engine.stats().await.locks, 0);
}

#[tokio::test]
async fn invalid_shapes_leave_the_session_running() {
    let engine = test_engine(fast_config(), vec![choice_question()]);
    let channel = ChannelId(4);

    engine
        .start_game(StartGame::new(channel, UserId(1)))
        .await
        .expect("start");

    // Neither a stray glyph nor unrelated text is an answer shape.
    assert!(engine
        .process_reaction_answer(channel, UserId(2), "🎉")
        .await
        .expect("answer path")
        .is_none());
    assert!(engine
        .process_text_answer(channel, UserId(2), "zebra")
        .await
        .expect("answer path")
        .is_none());
    assert!(engine.active_game(channel).await.is_some());

    // A legal shape still resolves the same session afterwards.
    let outcome = engine
        .process_text_answer(channel, UserId(2), "B")
        .await
        .expect("answer path")
        .expect("resolved");
    assert!(outcome.correct);
}

#[tokio::test]
async fn fill_blank_ignores_reactions() {
    let engine = test_engine(fast_config(), vec![blank_question()]);
    let channel = ChannelId(5);

    engine
        .start_game(StartGame::new(channel, UserId(1)))
        .await
        .expect("start");

    assert!(engine
        .process_reaction_answer(channel, UserId(1), "🇦")
        .await
        .expect("answer path")
        .is_none());
    assert!(engine.active_game(channel).await.is_some());

    let outcome = engine
        .process_text_answer(channel, UserId(1), "paris")
        .await
        .expect("answer path")
        .expect("resolved");
    assert!(outcome.correct);
}

#[tokio::test]
async fn fill_blank_normalizes_and_accepts_variations() {
    let engine = test_engine(fast_config(), vec![blank_question()]);

    // Case and punctuation are forgiven.
    engine
        .start_game(StartGame::new(ChannelId(6), UserId(1)))
        .await
        .expect("start");
    let outcome = engine
        .process_text_answer(ChannelId(6), UserId(1), "  PARIS!  ")
        .await
        .expect("answer path")
        .expect("resolved");
    assert!(outcome.correct);

    // Leading articles drop out of longer phrases, matching a variation.
    engine
        .start_game(StartGame::new(ChannelId(7), UserId(1)))
        .await
        .expect("start");
    let outcome = engine
        .process_text_answer(ChannelId(7), UserId(1), "the Paris France")
        .await
        .expect("answer path")
        .expect("resolved");
    assert!(outcome.correct);
}

#[tokio::test]
async fn true_false_accepts_synonyms_and_glyphs() {
    let engine = test_engine(fast_config(), vec![truth_question()]);

    engine
        .start_game(StartGame::new(ChannelId(8), UserId(1)))
        .await
        .expect("start");
    let outcome = engine
        .process_text_answer(ChannelId(8), UserId(1), "yes")
        .await
        .expect("answer path")
        .expect("resolved");
    assert!(outcome.correct);

    // The cross glyph parses as "false", which is simply wrong here.
    engine
        .start_game(StartGame::new(ChannelId(9), UserId(1)))
        .await
        .expect("start");
    let outcome = engine
        .process_reaction_answer(ChannelId(9), UserId(1), "❌")
        .await
        .expect("answer path")
        .expect("resolved");
    assert!(!outcome.correct);
    assert_eq!(outcome.points, 0);
}

#[tokio::test]
async fn checker_failure_scores_the_answer_incorrect() {
    init_tracing();
    let engine = GameEngine::start(
        fast_config(),
        Arc::new(StaticQuestionSource::new(vec![choice_question()])),
        Arc::new(FailingChecker),
        ScriptedProbe::open(),
    );
    let channel = ChannelId(10);

    engine
        .start_game(StartGame::new(channel, UserId(1)))
        .await
        .expect("start");

    // The right glyph, but the checker backend is down: scored wrong, and
    // the session still resolves rather than hanging.
    let outcome = engine
        .process_reaction_answer(channel, UserId(1), "🇧")
        .await
        .expect("answer path")
        .expect("resolved");
    assert!(!outcome.correct);
    assert_eq!(outcome.points, 0);
    assert!(engine.active_game(channel).await.is_none());
    assert_eq!(engine.health_report().await.recent_errors, 1);
}

#[tokio::test]
async fn points_decay_with_answer_delay() {
    let engine = test_engine(fast_config(), vec![choice_question()]);
    let channel = ChannelId(11);

    engine
        .start_game(
            StartGame::new(channel, UserId(1)).with_timeout(Duration::from_secs(10)),
        )
        .await
        .expect("start");

    tokio::time::sleep(Duration::from_secs(1)).await;

    // Anywhere in the 0.5 s – 5 s band a 10-point question pays 9.
    let outcome = engine
        .process_text_answer(channel, UserId(1), "b")
        .await
        .expect("answer path")
        .expect("resolved");
    assert!(outcome.correct);
    assert_eq!(outcome.points, 9);
    assert!(outcome.elapsed >= Duration::from_secs(1));
}

#[tokio::test]
async fn racing_answers_resolve_exactly_once() {
    let engine = Arc::new(test_engine(fast_config(), vec![choice_question()]));
    let channel = ChannelId(12);

    engine
        .start_game(StartGame::new(channel, UserId(1)))
        .await
        .expect("start");

    let mut handles = Vec::new();
    for user in 1..=6_u64 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine.process_text_answer(channel, UserId(user), "b").await
        }));
    }

    let mut resolved = 0;
    let mut ignored = 0;
    for handle in handles {
        match handle.await.expect("answer task").expect("answer path") {
            Some(_) => resolved += 1,
            None => ignored += 1,
        }
    }
    assert_eq!(resolved, 1);
    assert_eq!(ignored, 5);

    let stats = engine.stats().await;
    assert_eq!(stats.active_sessions, 0);
    assert_eq!(stats.timers, 0);
    assert_eq!(stats.locks, 0);
}
