//! Domain model module declarations and shared identifier types.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

pub mod outcome;
pub mod question;
pub mod session;

pub use outcome::{AnswerOutcome, CandidateAnswer};
pub use question::{Difficulty, Question, QuestionKind};
pub use session::{EndReason, GameSession};

/// Channel identifier, the scoping unit for session exclusivity.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl Display for ChannelId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChannelId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// User identifier as assigned by the chat platform.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}
