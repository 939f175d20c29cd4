//! Caller-facing session notifications and the containment layer.
//!
//! Callers implement [`SessionNotifier`] to hear about countdown marks and
//! timeouts. The engine never invokes a caller's notifier directly: every
//! registered notifier is wrapped in a [`ContainedNotifier`], which runs each
//! invocation on its own task and folds the result into a [`NotifyOutcome`].
//! A failing or panicking notifier can therefore never corrupt game flow;
//! the worst it can do is lose its own notification.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use crate::messaging::{ChannelMessenger, MessengerResult};
use crate::models::ChannelId;

/// Session event callbacks supplied by the caller at game start.
pub trait SessionNotifier: Send + Sync {
    /// A countdown mark was reached with `remaining` time left.
    fn countdown(
        &self,
        remaining: Duration,
    ) -> Pin<Box<dyn Future<Output = MessengerResult<()>> + Send + '_>>;

    /// The session timed out without an answer.
    fn timed_out(&self) -> Pin<Box<dyn Future<Output = MessengerResult<()>> + Send + '_>>;
}

/// Containment verdict for a single notifier invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// The notifier ran to completion.
    Delivered,
    /// The notifier reported a permission or not-found failure; the channel
    /// should be treated as inaccessible.
    ChannelLost,
    /// The notifier failed some other way (transport fault or panic).
    Failed,
}

/// A caller notifier wrapped for safe invocation from engine tasks.
#[derive(Clone)]
pub(crate) struct ContainedNotifier {
    channel: ChannelId,
    inner: Arc<dyn SessionNotifier>,
}

impl ContainedNotifier {
    pub(crate) fn new(channel: ChannelId, inner: Arc<dyn SessionNotifier>) -> Self {
        Self { channel, inner }
    }

    /// Invoke the countdown callback with containment.
    pub(crate) async fn countdown(&self, remaining: Duration) -> NotifyOutcome {
        let inner = Arc::clone(&self.inner);
        let joined = tokio::spawn(async move { inner.countdown(remaining).await }).await;
        self.classify("countdown", joined)
    }

    /// Invoke the timeout callback with containment.
    pub(crate) async fn timed_out(&self) -> NotifyOutcome {
        let inner = Arc::clone(&self.inner);
        let joined = tokio::spawn(async move { inner.timed_out().await }).await;
        self.classify("timed_out", joined)
    }

    fn classify(
        &self,
        op: &'static str,
        joined: Result<MessengerResult<()>, tokio::task::JoinError>,
    ) -> NotifyOutcome {
        match joined {
            Ok(Ok(())) => NotifyOutcome::Delivered,
            Ok(Err(err)) if err.is_channel_lost() => {
                warn!(channel = %self.channel, op, %err, "notifier lost the channel");
                NotifyOutcome::ChannelLost
            }
            Ok(Err(err)) => {
                warn!(channel = %self.channel, op, %err, "notifier failed");
                NotifyOutcome::Failed
            }
            Err(join_err) => {
                error!(channel = %self.channel, op, %join_err, "notifier task panicked");
                NotifyOutcome::Failed
            }
        }
    }
}

impl std::fmt::Debug for ContainedNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainedNotifier")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

/// Ready-made notifier that posts plain countdown and timeout messages
/// through a [`ChannelMessenger`].
///
/// Callers who want richer messages (embeds, answer reveals) implement
/// [`SessionNotifier`] themselves.
pub struct MessengerNotifier {
    messenger: Arc<dyn ChannelMessenger>,
    channel: ChannelId,
    timeout_text: String,
}

impl MessengerNotifier {
    /// Construct a notifier posting to `channel`.
    #[must_use]
    pub fn new(messenger: Arc<dyn ChannelMessenger>, channel: ChannelId) -> Self {
        Self {
            messenger,
            channel,
            timeout_text: "⏰ Time's up! The question went unanswered.".into(),
        }
    }

    /// Override the message posted on timeout.
    #[must_use]
    pub fn with_timeout_text(mut self, text: impl Into<String>) -> Self {
        self.timeout_text = text.into();
        self
    }
}

impl SessionNotifier for MessengerNotifier {
    fn countdown(
        &self,
        remaining: Duration,
    ) -> Pin<Box<dyn Future<Output = MessengerResult<()>> + Send + '_>> {
        Box::pin(async move {
            let text = format!("⏰ {} seconds remaining!", remaining.as_secs());
            self.messenger.send(self.channel, &text).await
        })
    }

    fn timed_out(&self) -> Pin<Box<dyn Future<Output = MessengerResult<()>> + Send + '_>> {
        Box::pin(async move { self.messenger.send(self.channel, &self.timeout_text).await })
    }
}

impl std::fmt::Debug for MessengerNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessengerNotifier")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}
