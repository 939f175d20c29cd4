//! Messaging boundary: capability traits, the tagged boundary error, and the
//! permission gate.
//!
//! The engine never talks to a chat transport directly. Callers implement
//! [`ChannelProbe`] (and usually [`ChannelMessenger`] for their notifiers)
//! and translate their transport's failures into [`MessengerError`], so core
//! game flow depends only on the permission-denied / not-found / transport
//! distinction and never on a transport library's error hierarchy.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::models::ChannelId;
use crate::{GameError, Result};

/// Failure tag reported by the messaging capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessengerError {
    /// The transport refused the operation for lack of permission.
    PermissionDenied(String),
    /// The channel or message no longer exists.
    NotFound(String),
    /// Any other communication failure.
    Transport(String),
}

impl MessengerError {
    /// Whether this failure means the channel is gone for good until fixed
    /// externally (as opposed to a transient transport fault).
    #[must_use]
    pub fn is_channel_lost(&self) -> bool {
        matches!(self, Self::PermissionDenied(_) | Self::NotFound(_))
    }
}

impl Display for MessengerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied(msg) => write!(f, "permission denied: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
        }
    }
}

impl std::error::Error for MessengerError {}

/// Result alias for operations crossing the messaging boundary.
pub type MessengerResult<T> = std::result::Result<T, MessengerError>;

/// Pre-flight probe that messaging is usable in a channel.
///
/// Implementations should confirm the capabilities a game needs: sending
/// messages, embedding content, adding reactions, and reading recent history.
pub trait ChannelProbe: Send + Sync {
    /// Whether the messaging capability is currently usable in `channel`.
    fn check(&self, channel: ChannelId) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;
}

/// Outbound messaging capability consumed by notifier implementations.
pub trait ChannelMessenger: Send + Sync {
    /// Post a text message to `channel`.
    fn send(
        &self,
        channel: ChannelId,
        text: &str,
    ) -> Pin<Box<dyn Future<Output = MessengerResult<()>> + Send + '_>>;

    /// Add a reaction glyph to the most recent game prompt in `channel`.
    fn react(
        &self,
        channel: ChannelId,
        glyph: &str,
    ) -> Pin<Box<dyn Future<Output = MessengerResult<()>> + Send + '_>>;
}

/// Permission pre-flight and the set of channels known to be inaccessible.
///
/// The set is advisory: it feeds health reporting and lets the sweep skip
/// channels that already failed, but every start attempt re-probes, and a
/// successful start clears the channel's mark.
pub struct PermissionGate {
    probe: Arc<dyn ChannelProbe>,
    inaccessible: Mutex<HashSet<ChannelId>>,
}

impl PermissionGate {
    /// Construct a gate over the given probe with an empty inaccessible set.
    #[must_use]
    pub fn new(probe: Arc<dyn ChannelProbe>) -> Self {
        Self {
            probe,
            inaccessible: Mutex::new(HashSet::new()),
        }
    }

    /// Run the raw probe without touching the inaccessible set.
    pub async fn probe(&self, channel: ChannelId) -> bool {
        self.probe.check(channel).await
    }

    /// Probe `channel` and require success.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Permission` and marks the channel inaccessible if
    /// the probe fails.
    pub async fn ensure_usable(&self, channel: ChannelId) -> Result<()> {
        if self.probe.check(channel).await {
            return Ok(());
        }
        self.mark_inaccessible(channel).await;
        Err(GameError::Permission(format!(
            "messaging capability unusable in channel {channel}"
        )))
    }

    /// Record `channel` as inaccessible. Returns `true` if it was not
    /// already marked.
    pub async fn mark_inaccessible(&self, channel: ChannelId) -> bool {
        let newly_marked = self.inaccessible.lock().await.insert(channel);
        if newly_marked {
            warn!(channel = %channel, "channel marked inaccessible");
        }
        newly_marked
    }

    /// Clear `channel` from the inaccessible set.
    pub async fn clear(&self, channel: ChannelId) {
        if self.inaccessible.lock().await.remove(&channel) {
            debug!(channel = %channel, "channel accessibility restored");
        }
    }

    /// Whether `channel` is currently marked inaccessible.
    pub async fn is_inaccessible(&self, channel: ChannelId) -> bool {
        self.inaccessible.lock().await.contains(&channel)
    }

    /// Number of channels currently marked inaccessible.
    pub async fn inaccessible_count(&self) -> usize {
        self.inaccessible.lock().await.len()
    }

    /// Snapshot of the inaccessible set, sorted for stable output.
    pub async fn inaccessible_channels(&self) -> Vec<ChannelId> {
        let mut channels: Vec<ChannelId> =
            self.inaccessible.lock().await.iter().copied().collect();
        channels.sort_unstable();
        channels
    }
}

impl std::fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGate").finish_non_exhaustive()
    }
}
