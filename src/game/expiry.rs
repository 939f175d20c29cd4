//! Timer-event consumer: the single place countdowns and expiries land.
//!
//! Timer tasks only emit events; this consumer owns every notifier
//! invocation and all expiry teardown. That split keeps the timers free to
//! cancel instantly and guarantees the timeout notification fires at most
//! once per session: expiry is re-verified under the channel lock, and the
//! session is removed in the same lock hold.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::messaging::PermissionGate;
use crate::models::{ChannelId, EndReason};

use super::cleanup::{end_channel, release_channel};
use super::monitor::ErrorTracker;
use super::notifier::NotifyOutcome;
use super::store::SessionStore;
use super::timer::TimerEvent;

/// Spawn the consumer task that drains timer events until cancelled or the
/// channel closes.
pub(crate) fn spawn_timer_consumer(
    mut events: mpsc::Receiver<TimerEvent>,
    store: Arc<SessionStore>,
    gate: Arc<PermissionGate>,
    errors: Arc<ErrorTracker>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                () = cancel.cancelled() => break,
                maybe = events.recv() => match maybe {
                    Some(event) => event,
                    None => break,
                },
            };

            match event {
                TimerEvent::Countdown {
                    channel,
                    session_id,
                    remaining,
                } => handle_countdown(&store, &gate, &errors, channel, session_id, remaining).await,
                TimerEvent::DeadlineExpired {
                    channel,
                    session_id,
                } => handle_expiry(&store, &gate, &errors, channel, session_id, false).await,
                TimerEvent::FallbackExpired {
                    channel,
                    session_id,
                } => handle_expiry(&store, &gate, &errors, channel, session_id, true).await,
            }
        }
        debug!("timer event consumer exiting");
    })
}

/// Deliver a countdown mark.
///
/// Runs outside the channel lock so a slow send never blocks answers. A
/// lost channel tears the session down instead of letting it run to a
/// timeout nobody can see.
async fn handle_countdown(
    store: &SessionStore,
    gate: &PermissionGate,
    errors: &ErrorTracker,
    channel: ChannelId,
    session_id: Uuid,
    remaining: Duration,
) {
    if !store.is_current(channel, session_id).await {
        return;
    }
    let Some(notifier) = store.notifier(channel).await else {
        return;
    };

    match notifier.countdown(remaining).await {
        NotifyOutcome::Delivered => {}
        NotifyOutcome::ChannelLost => {
            errors.record().await;
            gate.mark_inaccessible(channel).await;
            end_channel(store, channel, EndReason::Inaccessible).await;
        }
        NotifyOutcome::Failed => errors.record().await,
    }
}

/// Resolve a session deadline (primary or fallback).
///
/// Re-verifies the session under the channel lock, delivers the timeout
/// notification while still holding it, and removes the session in the
/// same hold. An answer racing in either wins the lock first and removes
/// the session, in which case this is a no-op, or it loses and finds the
/// channel empty.
async fn handle_expiry(
    store: &SessionStore,
    gate: &PermissionGate,
    errors: &ErrorTracker,
    channel: ChannelId,
    session_id: Uuid,
    fallback: bool,
) {
    if !store.is_current(channel, session_id).await {
        return;
    }

    let lock = store.channel_lock(channel).await;
    let guard = lock.lock().await;

    if !store.is_current(channel, session_id).await {
        drop(guard);
        drop(lock);
        store.prune_channel_lock(channel).await;
        return;
    }

    let mut reason = EndReason::TimedOut;
    if let Some(notifier) = store.notifier(channel).await {
        match notifier.timed_out().await {
            NotifyOutcome::Delivered => {}
            NotifyOutcome::ChannelLost => {
                errors.record().await;
                gate.mark_inaccessible(channel).await;
                reason = EndReason::Inaccessible;
            }
            NotifyOutcome::Failed => errors.record().await,
        }
    }

    release_channel(store, channel, reason).await;
    drop(guard);
    drop(lock);
    store.prune_channel_lock(channel).await;

    info!(
        channel = %channel,
        reason = %reason,
        fallback,
        "session expired without an answer"
    );
}
