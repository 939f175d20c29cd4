//! Health reporting and the periodic maintenance sweep.
//!
//! The sweep is the last line of defense behind the per-session timers: it
//! force-ends sessions the timers should already have resolved, re-probes
//! channels that still host sessions, clears inaccessible marks for
//! channels that recovered, and prunes bookkeeping the hot paths left
//! behind.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};

use crate::config::ArenaConfig;
use crate::messaging::PermissionGate;
use crate::models::{ChannelId, Difficulty, EndReason, QuestionKind};

use super::cleanup::end_channel;
use super::store::SessionStore;

// ── Error tracking ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct TrackerState {
    recent: VecDeque<DateTime<Utc>>,
    last: Option<DateTime<Utc>>,
}

/// Rolling window of engine error timestamps.
///
/// Feeds the health report; old entries are pruned on every read and by
/// the maintenance sweep, so an idle engine decays back to healthy.
#[derive(Debug)]
pub(crate) struct ErrorTracker {
    window: Duration,
    state: Mutex<TrackerState>,
}

impl ErrorTracker {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Record one engine error at the current instant.
    pub(crate) async fn record(&self) {
        let now = Utc::now();
        let mut state = self.state.lock().await;
        state.recent.push_back(now);
        state.last = Some(now);
        Self::prune_front(self.window, now, &mut state.recent);
    }

    /// Number of errors inside the rolling window.
    pub(crate) async fn recent_count(&self) -> usize {
        let mut state = self.state.lock().await;
        Self::prune_front(self.window, Utc::now(), &mut state.recent);
        state.recent.len()
    }

    /// Timestamp of the most recent error, if any was ever recorded.
    pub(crate) async fn last_error_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.last
    }

    /// Drop entries that fell out of the window.
    pub(crate) async fn prune(&self) {
        let mut state = self.state.lock().await;
        Self::prune_front(self.window, Utc::now(), &mut state.recent);
    }

    fn prune_front(window: Duration, now: DateTime<Utc>, recent: &mut VecDeque<DateTime<Utc>>) {
        while let Some(front) = recent.front() {
            let age = (now - *front).to_std().unwrap_or_default();
            if age > window {
                recent.pop_front();
            } else {
                break;
            }
        }
    }
}

// ── Health report ────────────────────────────────────────────────────────

/// Coarse engine health classification.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Operating normally.
    Healthy,
    /// Degraded but functional; worth a look.
    Warning,
    /// Sessions are leaking or errors are piling up.
    Critical,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
        };
        write!(f, "{name}")
    }
}

/// Point-in-time health snapshot of the engine.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Overall classification derived from the fields below.
    pub status: HealthStatus,
    /// Sessions currently live.
    pub active_sessions: usize,
    /// Live sessions past their timeout plus grace; any value above zero
    /// means the timers are not keeping up.
    pub overdue_sessions: usize,
    /// Errors recorded inside the rolling window.
    pub recent_errors: usize,
    /// Timestamp of the most recent error, if any.
    pub last_error_at: Option<DateTime<Utc>>,
    /// Channels currently marked inaccessible, sorted.
    pub inaccessible_channels: Vec<ChannelId>,
}

/// Point-in-time bookkeeping counters, mostly for operator dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    /// Sessions currently live.
    pub active_sessions: usize,
    /// Live sessions running as challenges.
    pub challenge_sessions: usize,
    /// Live sessions bucketed by difficulty.
    pub by_difficulty: HashMap<Difficulty, usize>,
    /// Live sessions bucketed by question kind.
    pub by_kind: HashMap<QuestionKind, usize>,
    /// Armed timer pairs.
    pub timers: usize,
    /// Registered notifiers.
    pub notifiers: usize,
    /// Channel lock entries held by the registry.
    pub locks: usize,
}

/// Assemble the health report from the live stores.
pub(crate) async fn build_health_report(
    store: &SessionStore,
    gate: &PermissionGate,
    errors: &ErrorTracker,
    config: &ArenaConfig,
) -> HealthReport {
    let sessions = store.sessions_snapshot().await;
    let grace = config.fallback_grace();
    let max_age = config.max_session_age();
    let overdue_sessions = sessions
        .iter()
        .filter(|session| session.is_stale(grace, max_age))
        .count();

    let recent_errors = errors.recent_count().await;
    let last_error_at = errors.last_error_at().await;
    let inaccessible_channels = gate.inaccessible_channels().await;

    let health = &config.health;
    let status = if overdue_sessions > 0 || recent_errors >= health.critical_error_threshold {
        HealthStatus::Critical
    } else if recent_errors >= health.warning_error_threshold
        || inaccessible_channels.len() >= health.inaccessible_warning_threshold
    {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    };

    HealthReport {
        status,
        active_sessions: sessions.len(),
        overdue_sessions,
        recent_errors,
        last_error_at,
        inaccessible_channels,
    }
}

/// Assemble bookkeeping counters from the live stores.
pub(crate) async fn build_stats(store: &SessionStore) -> EngineStats {
    let sessions = store.sessions_snapshot().await;

    let mut challenge_sessions = 0;
    let mut by_difficulty: HashMap<Difficulty, usize> = HashMap::new();
    let mut by_kind: HashMap<QuestionKind, usize> = HashMap::new();
    for session in &sessions {
        if session.challenge {
            challenge_sessions += 1;
        }
        *by_difficulty.entry(session.difficulty).or_insert(0) += 1;
        *by_kind.entry(session.question.kind).or_insert(0) += 1;
    }

    EngineStats {
        active_sessions: sessions.len(),
        challenge_sessions,
        by_difficulty,
        by_kind,
        timers: store.timer_count().await,
        notifiers: store.notifier_count().await,
        locks: store.lock_count().await,
    }
}

// ── Maintenance sweep ────────────────────────────────────────────────────

/// Spawn the periodic maintenance task.
pub(crate) fn spawn_maintenance(
    store: Arc<SessionStore>,
    gate: Arc<PermissionGate>,
    errors: Arc<ErrorTracker>,
    config: ArenaConfig,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(config.sweep_interval()) => {}
                }
                run_sweep(&store, &gate, &errors, &config).await;
            }
            debug!("maintenance task exiting");
        }
        .instrument(info_span!("maintenance")),
    )
}

/// One maintenance pass over all engine state.
async fn run_sweep(
    store: &SessionStore,
    gate: &PermissionGate,
    errors: &ErrorTracker,
    config: &ArenaConfig,
) {
    let grace = config.fallback_grace();
    let max_age = config.max_session_age();

    // Force-end sessions the timers should already have resolved.
    let mut expired = 0usize;
    for session in store.sessions_snapshot().await {
        if session.is_stale(grace, max_age)
            && end_channel(store, session.channel_id, EndReason::Expired)
                .await
                .is_some()
        {
            expired += 1;
        }
    }

    // Re-probe channels still hosting sessions; a lost channel gets marked
    // and its session ended rather than running to an invisible timeout.
    let mut lost = 0usize;
    for channel in store.session_channels().await {
        if store.has_session(channel).await && !gate.probe(channel).await {
            gate.mark_inaccessible(channel).await;
            errors.record().await;
            if end_channel(store, channel, EndReason::Inaccessible)
                .await
                .is_some()
            {
                lost += 1;
            }
        }
    }

    // Channels that recovered shed their inaccessible mark.
    let mut recovered = 0usize;
    for channel in gate.inaccessible_channels().await {
        if gate.probe(channel).await {
            gate.clear(channel).await;
            recovered += 1;
        }
    }

    errors.prune().await;
    let pruned_locks = store.prune_idle_locks().await;

    debug!(
        expired,
        lost, recovered, pruned_locks, "maintenance sweep complete"
    );
}
