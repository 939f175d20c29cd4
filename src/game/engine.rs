//! The game engine: channel-exclusive session lifecycle.
//!
//! All mutating paths for one channel serialize on that channel's lock;
//! cross-channel operations never contend. Background work (timer events,
//! maintenance) runs in tasks owned by the engine and is stopped by
//! [`GameEngine::shutdown`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::ArenaConfig;
use crate::errors::{GameError, Result};
use crate::messaging::{ChannelProbe, PermissionGate};
use crate::models::{
    AnswerOutcome, ChannelId, Difficulty, EndReason, GameSession, UserId,
};
use crate::providers::{AnswerChecker, QuestionSource};

use super::answers;
use super::cleanup::{end_channel, release_channel};
use super::expiry::spawn_timer_consumer;
use super::monitor::{self, EngineStats, ErrorTracker, HealthReport};
use super::notifier::{ContainedNotifier, SessionNotifier};
use super::store::SessionStore;
use super::timer::{SessionTimer, TimerEvent};

/// Request to start a game on a channel.
pub struct StartGame {
    /// Channel to host the session.
    pub channel: ChannelId,
    /// User starting the session.
    pub user: UserId,
    /// Difficulty constraint for question selection; `None` accepts any tier.
    pub difficulty: Option<Difficulty>,
    /// Whether the session runs as a challenge (longer default timeout).
    pub challenge: bool,
    /// Timeout override; `None` uses the configured default for the mode.
    pub timeout: Option<Duration>,
    /// Recipient of countdown and timeout notifications for this session.
    pub notifier: Option<Arc<dyn SessionNotifier>>,
}

impl StartGame {
    /// A standard-mode request with no difficulty constraint or notifier.
    #[must_use]
    pub fn new(channel: ChannelId, user: UserId) -> Self {
        Self {
            channel,
            user,
            difficulty: None,
            challenge: false,
            timeout: None,
            notifier: None,
        }
    }

    /// Constrain question selection to one difficulty tier.
    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    /// Run the session as a challenge.
    #[must_use]
    pub fn as_challenge(mut self) -> Self {
        self.challenge = true;
        self
    }

    /// Override the session timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a notifier for countdown and timeout messages.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn SessionNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }
}

impl std::fmt::Debug for StartGame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartGame")
            .field("channel", &self.channel)
            .field("user", &self.user)
            .field("difficulty", &self.difficulty)
            .field("challenge", &self.challenge)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// The two ways an answer can arrive.
enum AnswerInput<'a> {
    Reaction(&'a str),
    Text(&'a str),
}

/// Channel-exclusive trivia session engine.
///
/// Construct with [`GameEngine::start`], which also spawns the timer-event
/// consumer and the maintenance sweep. Call [`GameEngine::shutdown`] to stop
/// background work and end every live session.
pub struct GameEngine {
    config: ArenaConfig,
    questions: Arc<dyn QuestionSource>,
    checker: Arc<dyn AnswerChecker>,
    store: Arc<SessionStore>,
    gate: Arc<PermissionGate>,
    errors: Arc<ErrorTracker>,
    event_tx: mpsc::Sender<TimerEvent>,
    cancel: CancellationToken,
    background: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl GameEngine {
    /// Construct the engine and spawn its background tasks.
    #[must_use]
    pub fn start(
        config: ArenaConfig,
        questions: Arc<dyn QuestionSource>,
        checker: Arc<dyn AnswerChecker>,
        probe: Arc<dyn ChannelProbe>,
    ) -> Self {
        let store = Arc::new(SessionStore::new());
        let gate = Arc::new(PermissionGate::new(probe));
        let errors = Arc::new(ErrorTracker::new(config.error_window()));
        let (event_tx, event_rx) = mpsc::channel(config.timer_event_capacity);
        let cancel = CancellationToken::new();

        let consumer = spawn_timer_consumer(
            event_rx,
            Arc::clone(&store),
            Arc::clone(&gate),
            Arc::clone(&errors),
            cancel.clone(),
        );
        let maintenance = monitor::spawn_maintenance(
            Arc::clone(&store),
            Arc::clone(&gate),
            Arc::clone(&errors),
            config.clone(),
            cancel.clone(),
        );

        info!(
            default_timeout_seconds = config.timers.default_timeout_seconds,
            sweep_interval_seconds = config.sweep.interval_seconds,
            "game engine started"
        );

        Self {
            config,
            questions,
            checker,
            store,
            gate,
            errors,
            event_tx,
            cancel,
            background: Mutex::new(vec![consumer, maintenance]),
            closed: AtomicBool::new(false),
        }
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Start a game on a channel.
    ///
    /// The channel is probed before anything else, so an unreachable channel
    /// can never acquire a session. A live session on the channel rejects
    /// the start; a stale one is evicted and replaced.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Permission` when the channel probe fails,
    /// `GameError::Concurrency` when the channel already hosts a live game,
    /// and `GameError::Game` when the question source comes up empty or the
    /// engine has been shut down.
    pub async fn start_game(&self, request: StartGame) -> Result<GameSession> {
        // A session started after shutdown would never get timer service.
        if self.closed.load(Ordering::SeqCst) {
            return Err(GameError::Game("engine is shut down".into()));
        }

        let channel = request.channel;
        let lock = self.store.channel_lock(channel).await;
        let guard = lock.lock().await;

        if let Err(err) = self.gate.ensure_usable(channel).await {
            self.errors.record().await;
            drop(guard);
            drop(lock);
            self.store.prune_channel_lock(channel).await;
            return Err(err);
        }

        if let Some(existing) = self.store.session(channel).await {
            if existing.is_stale(self.config.fallback_grace(), self.config.max_session_age()) {
                warn!(
                    channel = %channel,
                    session = %existing.id,
                    "evicting stale session left behind by a missed teardown"
                );
                release_channel(&self.store, channel, EndReason::Expired).await;
            } else {
                drop(guard);
                return Err(GameError::Concurrency(format!(
                    "channel {channel} already has an active game"
                )));
            }
        }

        let Some(question) = self.questions.fetch(request.difficulty).await else {
            drop(guard);
            drop(lock);
            self.store.prune_channel_lock(channel).await;
            return Err(GameError::Game("no question available".into()));
        };

        let timeout = request.timeout.unwrap_or_else(|| {
            if request.challenge {
                self.config.challenge_timeout()
            } else {
                self.config.default_timeout()
            }
        });

        let session = GameSession::new(channel, request.user, question, request.challenge, timeout);
        let session_id = session.id;
        if let Err(err) = self.store.insert_session(session.clone()).await {
            self.errors.record().await;
            drop(guard);
            return Err(err);
        }

        if let Some(notifier) = request.notifier {
            self.store
                .register_notifier(channel, ContainedNotifier::new(channel, notifier))
                .await;
        }

        let timer = SessionTimer::new(
            channel,
            session_id,
            timeout,
            &self.config,
            Arc::clone(&self.store),
            self.event_tx.clone(),
        )
        .spawn();
        if let Some(displaced) = self.store.install_timer(channel, timer).await {
            displaced.shutdown().await;
        }

        // A successful start proves the channel reachable again.
        self.gate.clear(channel).await;
        drop(guard);

        info!(
            channel = %channel,
            session = %session_id,
            difficulty = %session.difficulty,
            challenge = session.challenge,
            timeout_seconds = timeout.as_secs(),
            "game started"
        );
        Ok(session)
    }

    /// Process a reaction-style answer (an emoji glyph).
    ///
    /// Returns `Ok(None)` when there is nothing to act on: the channel has
    /// no game, or the glyph is not an answer shape for the question's kind.
    ///
    /// # Errors
    ///
    /// Returns `GameError::State` when the channel's session turned out to
    /// be stale and was torn down instead of accepting the answer.
    pub async fn process_reaction_answer(
        &self,
        channel: ChannelId,
        user: UserId,
        glyph: &str,
    ) -> Result<Option<AnswerOutcome>> {
        self.ingest_answer(channel, user, AnswerInput::Reaction(glyph))
            .await
    }

    /// Process a typed answer.
    ///
    /// Returns `Ok(None)` when there is nothing to act on: the channel has
    /// no game, or the text does not parse as an answer for the question's
    /// kind.
    ///
    /// # Errors
    ///
    /// Returns `GameError::State` when the channel's session turned out to
    /// be stale and was torn down instead of accepting the answer.
    pub async fn process_text_answer(
        &self,
        channel: ChannelId,
        user: UserId,
        text: &str,
    ) -> Result<Option<AnswerOutcome>> {
        self.ingest_answer(channel, user, AnswerInput::Text(text))
            .await
    }

    /// Shared answer path: first shape-valid answer resolves the session,
    /// right or wrong.
    async fn ingest_answer(
        &self,
        channel: ChannelId,
        user: UserId,
        input: AnswerInput<'_>,
    ) -> Result<Option<AnswerOutcome>> {
        // Idle channels must not allocate lock entries.
        if !self.store.has_session(channel).await {
            return Ok(None);
        }

        let lock = self.store.channel_lock(channel).await;
        let guard = lock.lock().await;

        let Some(session) = self.store.session(channel).await else {
            drop(guard);
            drop(lock);
            self.store.prune_channel_lock(channel).await;
            return Ok(None);
        };

        if session.is_stale(self.config.fallback_grace(), self.config.max_session_age()) {
            self.errors.record().await;
            release_channel(&self.store, channel, EndReason::Expired).await;
            drop(guard);
            drop(lock);
            self.store.prune_channel_lock(channel).await;
            return Err(GameError::State(format!(
                "game in channel {channel} had already expired"
            )));
        }

        let parsed = match &input {
            AnswerInput::Reaction(glyph) => answers::parse_reaction(&session.question, glyph),
            AnswerInput::Text(text) => answers::parse_text(&session.question, text),
        };
        let Some(candidate) = parsed else {
            drop(guard);
            return Ok(None);
        };

        self.store.record_participant(channel, user).await;
        let elapsed = session.elapsed();

        let correct = match self.checker.check(&session.question, &candidate).await {
            Ok(correct) => correct,
            Err(err) => {
                warn!(
                    channel = %channel,
                    error = %err,
                    "answer check failed; scoring as incorrect"
                );
                self.errors.record().await;
                false
            }
        };
        let points = answers::score(session.question.effective_points(), elapsed, correct);
        let outcome = AnswerOutcome {
            correct,
            points,
            elapsed,
            explanation: session.question.explanation.clone(),
        };

        release_channel(&self.store, channel, EndReason::Answered).await;
        drop(guard);
        drop(lock);
        self.store.prune_channel_lock(channel).await;

        info!(
            channel = %channel,
            user = %user,
            answer = %candidate,
            correct,
            points,
            elapsed = ?elapsed,
            "answer resolved the game"
        );
        Ok(Some(outcome))
    }

    /// End the channel's game, if one is running. Returns whether a session
    /// was ended. Ending an idle channel is a no-op.
    pub async fn end_game(&self, channel: ChannelId, reason: EndReason) -> bool {
        end_channel(&self.store, channel, reason).await.is_some()
    }

    /// The channel's live session, if any.
    pub async fn active_game(&self, channel: ChannelId) -> Option<GameSession> {
        self.store.session(channel).await
    }

    /// End every live session with the given reason. Returns how many were
    /// ended.
    pub async fn force_end_all(&self, reason: EndReason) -> usize {
        let mut ended = 0;
        for channel in self.store.session_channels().await {
            if end_channel(&self.store, channel, reason).await.is_some() {
                ended += 1;
            }
        }
        ended
    }

    /// Point-in-time health snapshot.
    pub async fn health_report(&self) -> HealthReport {
        monitor::build_health_report(&self.store, &self.gate, &self.errors, &self.config).await
    }

    /// Point-in-time bookkeeping counters.
    pub async fn stats(&self) -> EngineStats {
        monitor::build_stats(&self.store).await
    }

    /// Stop background tasks and end every live session.
    ///
    /// Idempotent; later calls find nothing left to stop.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.cancel.cancel();

        let handles = std::mem::take(&mut *self.background.lock().await);
        for result in join_all(handles).await {
            if let Err(err) = result {
                error!(error = %err, "background task terminated abnormally");
            }
        }

        let ended = self.force_end_all(EndReason::Shutdown).await;
        info!(ended, "game engine shut down");
    }
}

impl std::fmt::Debug for GameEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
