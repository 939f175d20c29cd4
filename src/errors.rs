//! Error types shared across the crate.

use std::fmt::{Display, Formatter};

/// Shared game-engine result type.
pub type Result<T> = std::result::Result<T, GameError>;

/// Game error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum GameError {
    /// Messaging capability is unusable in the target channel. User-facing;
    /// not retryable until the channel's permissions are fixed externally.
    Permission(String),
    /// Channel is already occupied by a still-valid session. User-facing;
    /// retry once the current game resolves.
    Concurrency(String),
    /// Internal session state violated an invariant; the offending session
    /// has been forcibly cleaned up.
    State(String),
    /// Catch-all game failure, logged with context.
    Game(String),
    /// Configuration parsing or validation failure.
    Config(String),
}

impl Display for GameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Permission(msg) => write!(f, "permission: {msg}"),
            Self::Concurrency(msg) => write!(f, "concurrency: {msg}"),
            Self::State(msg) => write!(f, "state: {msg}"),
            Self::Game(msg) => write!(f, "game: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for GameError {}

impl From<toml::de::Error> for GameError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<serde_json::Error> for GameError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("invalid question bank: {err}"))
    }
}
