//! Channel-keyed session state: sessions, locks, timers, and notifiers.
//!
//! All four maps live behind one store so the at-most-one-session-per-channel
//! invariant has a single enforcement point and the tables can be audited
//! together (the maintenance sweep checks that none of them grow without
//! bound). Structural mutations for a channel happen while holding that
//! channel's lock; creating a channel's lock happens under the registry's
//! own mutex.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error};
use uuid::Uuid;

use crate::models::{ChannelId, EndReason, GameSession, UserId};
use crate::{GameError, Result};

use super::notifier::ContainedNotifier;
use super::timer::TimerHandle;

/// Per-channel mutual-exclusion primitive handed out by the registry.
pub(crate) type ChannelLock = Arc<Mutex<()>>;

/// The single source of truth for active sessions and their resources.
pub struct SessionStore {
    sessions: Mutex<HashMap<ChannelId, GameSession>>,
    locks: Mutex<HashMap<ChannelId, ChannelLock>>,
    timers: Mutex<HashMap<ChannelId, TimerHandle>>,
    notifiers: Mutex<HashMap<ChannelId, ContainedNotifier>>,
}

impl SessionStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
            timers: Mutex::new(HashMap::new()),
            notifiers: Mutex::new(HashMap::new()),
        }
    }

    // ── Channel locks ────────────────────────────────────────────────────────

    /// Get or lazily create the channel's lock.
    pub(crate) async fn channel_lock(&self, channel: ChannelId) -> ChannelLock {
        let mut locks = self.locks.lock().await;
        Arc::clone(
            locks
                .entry(channel)
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Drop the channel's lock entry if no session exists for the channel
    /// and nobody else holds a clone of the lock.
    pub(crate) async fn prune_channel_lock(&self, channel: ChannelId) {
        if self.sessions.lock().await.contains_key(&channel) {
            return;
        }
        let mut locks = self.locks.lock().await;
        if let Some(lock) = locks.get(&channel) {
            if Arc::strong_count(lock) == 1 {
                locks.remove(&channel);
            }
        }
    }

    /// Sweep pass over the whole registry; returns how many entries were
    /// dropped.
    pub(crate) async fn prune_idle_locks(&self) -> usize {
        let occupied: HashSet<ChannelId> = self.sessions.lock().await.keys().copied().collect();
        let mut locks = self.locks.lock().await;
        let before = locks.len();
        locks.retain(|channel, lock| occupied.contains(channel) || Arc::strong_count(lock) > 1);
        before - locks.len()
    }

    // ── Sessions ─────────────────────────────────────────────────────────────

    /// Insert a new session, enforcing the at-most-one invariant.
    ///
    /// # Errors
    ///
    /// Returns `GameError::State` if a live session already occupies the
    /// channel. Callers serialize on the channel lock, so hitting this is an
    /// invariant violation, not ordinary contention.
    pub(crate) async fn insert_session(&self, session: GameSession) -> Result<()> {
        let channel = session.channel_id;
        let mut sessions = self.sessions.lock().await;
        if let Some(existing) = sessions.get(&channel) {
            if existing.is_live() {
                error!(
                    channel = %channel,
                    existing = %existing.id,
                    incoming = %session.id,
                    "refusing to double-book channel"
                );
                return Err(GameError::State(format!(
                    "channel {channel} already holds a live session"
                )));
            }
        }
        sessions.insert(channel, session);
        Ok(())
    }

    /// Clone the channel's session, live or not.
    pub async fn session(&self, channel: ChannelId) -> Option<GameSession> {
        self.sessions.lock().await.get(&channel).cloned()
    }

    /// Whether a session entry exists for the channel.
    pub async fn has_session(&self, channel: ChannelId) -> bool {
        self.sessions.lock().await.contains_key(&channel)
    }

    /// Whether the channel's stored session is `session_id` and still live.
    /// Timer tasks use this so a replaced session never inherits the old
    /// session's timer events.
    pub(crate) async fn is_current(&self, channel: ChannelId, session_id: Uuid) -> bool {
        self.sessions
            .lock()
            .await
            .get(&channel)
            .is_some_and(|s| s.id == session_id && s.is_live())
    }

    /// Stamp the channel's session as ended and remove it from the store.
    /// Returns the removed session, or `None` if the channel was idle.
    pub(crate) async fn complete_session(
        &self,
        channel: ChannelId,
        reason: EndReason,
    ) -> Option<GameSession> {
        let mut sessions = self.sessions.lock().await;
        let mut session = sessions.remove(&channel)?;
        if session.is_live() {
            session.mark_ended(reason);
        }
        debug!(
            channel = %channel,
            session = %session.id,
            reason = %reason,
            "session removed from store"
        );
        Some(session)
    }

    /// Add `user` to the session's participant set.
    pub(crate) async fn record_participant(&self, channel: ChannelId, user: UserId) {
        if let Some(session) = self.sessions.lock().await.get_mut(&channel) {
            session.record_participant(user);
        }
    }

    /// Channels that currently hold a session.
    pub async fn session_channels(&self) -> Vec<ChannelId> {
        self.sessions.lock().await.keys().copied().collect()
    }

    /// Snapshot of every stored session.
    pub async fn sessions_snapshot(&self) -> Vec<GameSession> {
        self.sessions.lock().await.values().cloned().collect()
    }

    // ── Timers ───────────────────────────────────────────────────────────────

    /// Install the channel's timer handle, returning any displaced handle so
    /// the caller can shut it down.
    pub(crate) async fn install_timer(
        &self,
        channel: ChannelId,
        handle: TimerHandle,
    ) -> Option<TimerHandle> {
        self.timers.lock().await.insert(channel, handle)
    }

    /// Remove and return the channel's timer handle.
    pub(crate) async fn take_timer(&self, channel: ChannelId) -> Option<TimerHandle> {
        self.timers.lock().await.remove(&channel)
    }

    // ── Notifiers ────────────────────────────────────────────────────────────

    /// Register the channel's contained notifier.
    pub(crate) async fn register_notifier(&self, channel: ChannelId, notifier: ContainedNotifier) {
        self.notifiers.lock().await.insert(channel, notifier);
    }

    /// Clone the channel's contained notifier, if one is registered.
    pub(crate) async fn notifier(&self, channel: ChannelId) -> Option<ContainedNotifier> {
        self.notifiers.lock().await.get(&channel).cloned()
    }

    /// Drop the channel's notifier registration.
    pub(crate) async fn remove_notifier(&self, channel: ChannelId) {
        self.notifiers.lock().await.remove(&channel);
    }

    // ── Table sizes ──────────────────────────────────────────────────────────

    /// Number of installed timer handles.
    pub async fn timer_count(&self) -> usize {
        self.timers.lock().await.len()
    }

    /// Number of registered notifiers.
    pub async fn notifier_count(&self) -> usize {
        self.notifiers.lock().await.len()
    }

    /// Number of channel-lock entries.
    pub async fn lock_count(&self) -> usize {
        self.locks.lock().await.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}
