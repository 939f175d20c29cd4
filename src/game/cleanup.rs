//! Session teardown shared by every exit path.
//!
//! Answered, timed out, cancelled, swept, reaped, or shut down, a session
//! always leaves through [`release_channel`]: remove the session record,
//! stop its timers, drop its notifier. Each step tolerates the state the
//! previous exit already left behind, so double teardown is a no-op.

use crate::models::{ChannelId, EndReason, GameSession};

use super::store::SessionStore;

/// Tear down a channel's session while its channel lock is held.
///
/// Returns the removed session, if one was still present.
pub(crate) async fn release_channel(
    store: &SessionStore,
    channel: ChannelId,
    reason: EndReason,
) -> Option<GameSession> {
    let session = store.complete_session(channel, reason).await;
    if let Some(timer) = store.take_timer(channel).await {
        timer.shutdown().await;
    }
    store.remove_notifier(channel).await;
    session
}

/// End a channel's session from outside the channel lock.
///
/// Fast-paths to `None` when the channel is idle so callers probing random
/// channels never allocate lock entries. Prunes the channel's lock entry
/// after release.
pub(crate) async fn end_channel(
    store: &SessionStore,
    channel: ChannelId,
    reason: EndReason,
) -> Option<GameSession> {
    if !store.has_session(channel).await {
        return None;
    }

    let lock = store.channel_lock(channel).await;
    let guard = lock.lock().await;
    let session = release_channel(store, channel, reason).await;
    drop(guard);
    // Our own clone must go before pruning, or the entry always looks shared.
    drop(lock);

    store.prune_channel_lock(channel).await;
    session
}
