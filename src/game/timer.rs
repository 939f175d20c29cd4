//! Per-session countdown and timeout timers.
//!
//! Each active session arms two tasks: a primary timer that sleeps in small
//! increments (never longer than the revalidation interval), re-checks on
//! every wake that its session is still the channel's live session, and
//! emits countdown marks and the deadline expiry; and a fallback timer that
//! fires once at timeout plus grace in case the primary dies silently.
//!
//! Timers never touch notifiers or the store's mutating paths themselves;
//! they only emit [`TimerEvent`]s for the engine's consumer. Events carry
//! the session id so a replaced session can never inherit a predecessor's
//! expiry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::ArenaConfig;
use crate::models::ChannelId;

use super::store::SessionStore;

/// Events emitted by session timers for the engine's timer-event consumer.
#[derive(Debug, Clone)]
pub(crate) enum TimerEvent {
    /// A countdown mark was crossed with `remaining` time to the deadline.
    Countdown {
        /// Channel whose session crossed the mark.
        channel: ChannelId,
        /// Session the mark belongs to.
        session_id: Uuid,
        /// Remaining time the mark represents.
        remaining: Duration,
    },
    /// The session deadline passed without an answer.
    DeadlineExpired {
        /// Channel whose session expired.
        channel: ChannelId,
        /// Session that expired.
        session_id: Uuid,
    },
    /// The fallback safety timer fired with the session still live.
    FallbackExpired {
        /// Channel whose session the fallback reaped.
        channel: ChannelId,
        /// Session the fallback reaped.
        session_id: Uuid,
    },
}

/// Builder for a session's timer pair.
///
/// Call [`spawn`](Self::spawn) to start both background tasks.
pub(crate) struct SessionTimer {
    channel: ChannelId,
    session_id: Uuid,
    timeout: Duration,
    marks: Vec<Duration>,
    revalidation: Duration,
    grace: Duration,
    store: Arc<SessionStore>,
    event_tx: mpsc::Sender<TimerEvent>,
    cancel: CancellationToken,
}

impl SessionTimer {
    /// Construct a timer pair for one session (does not start the tasks yet).
    ///
    /// Countdown marks are taken from the configuration, keeping only marks
    /// strictly below the session timeout, largest first.
    pub(crate) fn new(
        channel: ChannelId,
        session_id: Uuid,
        timeout: Duration,
        config: &ArenaConfig,
        store: Arc<SessionStore>,
        event_tx: mpsc::Sender<TimerEvent>,
    ) -> Self {
        let mut marks: Vec<Duration> = config
            .timers
            .countdown_marks_seconds
            .iter()
            .copied()
            .map(Duration::from_secs)
            .filter(|mark| *mark < timeout)
            .collect();
        marks.sort_unstable_by(|a, b| b.cmp(a));
        marks.dedup();

        Self {
            channel,
            session_id,
            timeout,
            marks,
            revalidation: config.revalidation_interval(),
            grace: config.fallback_grace(),
            store,
            event_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn the primary and fallback tasks and return the controlling
    /// handle.
    #[must_use]
    pub(crate) fn spawn(self) -> TimerHandle {
        let cancel = self.cancel.clone();

        let fallback = tokio::spawn(
            Self::run_fallback(
                self.channel,
                self.session_id,
                self.timeout.saturating_add(self.grace),
                Arc::clone(&self.store),
                self.event_tx.clone(),
                self.cancel.clone(),
            )
            .instrument(info_span!("fallback_timer", channel = %self.channel)),
        );

        let span = info_span!("session_timer", channel = %self.channel);
        let primary = tokio::spawn(self.run_primary().instrument(span));

        TimerHandle {
            cancel,
            primary: Some(primary),
            fallback: Some(fallback),
        }
    }

    /// Primary timer loop: revalidate, fire due marks, detect the deadline.
    async fn run_primary(self) {
        let deadline = Instant::now() + self.timeout;
        let mut next_mark = 0;

        loop {
            if !self.store.is_current(self.channel, self.session_id).await {
                debug!(channel = %self.channel, "session resolved; primary timer exiting");
                return;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.emit(TimerEvent::DeadlineExpired {
                    channel: self.channel,
                    session_id: self.session_id,
                })
                .await;
                return;
            }

            // Cross every due mark, but notify only the most recent one so a
            // late wake never floods the channel with stale countdowns.
            let mut crossed = None;
            while next_mark < self.marks.len() && remaining <= self.marks[next_mark] {
                crossed = Some(self.marks[next_mark]);
                next_mark += 1;
            }
            if let Some(mark) = crossed {
                let delivered = self
                    .emit(TimerEvent::Countdown {
                        channel: self.channel,
                        session_id: self.session_id,
                        remaining: mark,
                    })
                    .await;
                if !delivered {
                    return;
                }
            }

            // Sleep to the next mark or the deadline, bounded by the
            // revalidation interval so external invalidation is noticed.
            let mut sleep_for = remaining.min(self.revalidation);
            if let Some(mark) = self.marks.get(next_mark) {
                sleep_for = sleep_for.min(remaining.saturating_sub(*mark));
            }

            tokio::select! {
                () = self.cancel.cancelled() => {
                    debug!(channel = %self.channel, "primary timer cancelled");
                    return;
                }
                () = tokio::time::sleep(sleep_for) => {}
            }
        }
    }

    /// Send an event unless cancelled; `false` means the timer should exit.
    async fn emit(&self, event: TimerEvent) -> bool {
        tokio::select! {
            () = self.cancel.cancelled() => false,
            result = self.event_tx.send(event) => result.is_ok(),
        }
    }

    /// Fallback safety timer: one sleep, then reap if still live.
    async fn run_fallback(
        channel: ChannelId,
        session_id: Uuid,
        fire_after: Duration,
        store: Arc<SessionStore>,
        event_tx: mpsc::Sender<TimerEvent>,
        cancel: CancellationToken,
    ) {
        tokio::select! {
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(fire_after) => {}
        }

        if !store.is_current(channel, session_id).await {
            return;
        }

        warn!(
            channel = %channel,
            session = %session_id,
            "fallback timer firing; primary timer missed the deadline"
        );
        let event = TimerEvent::FallbackExpired {
            channel,
            session_id,
        };
        tokio::select! {
            () = cancel.cancelled() => {}
            _ = event_tx.send(event) => {}
        }
    }
}

/// Handle over a session's timer pair.
pub(crate) struct TimerHandle {
    cancel: CancellationToken,
    primary: Option<JoinHandle<()>>,
    fallback: Option<JoinHandle<()>>,
}

impl TimerHandle {
    /// Cancel both timer tasks and wait for them to exit.
    pub(crate) async fn shutdown(mut self) {
        self.cancel.cancel();
        for handle in [self.primary.take(), self.fallback.take()]
            .into_iter()
            .flatten()
        {
            let _ = handle.await;
        }
    }
}

impl Drop for TimerHandle {
    /// Cancel the timer tasks when the handle is dropped.
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle").finish_non_exhaustive()
    }
}
