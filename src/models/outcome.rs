//! Answer shapes and the per-session outcome handed back to callers.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The parsed shape of an answer attempt, passed to the correctness checker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CandidateAnswer {
    /// Multiple-choice option index (0-based).
    Choice(usize),
    /// True/false value.
    Bool(bool),
    /// Free-text answer, trimmed.
    Text(String),
}

impl Display for CandidateAnswer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Choice(index) => write!(f, "choice {index}"),
            Self::Bool(value) => write!(f, "bool {value}"),
            Self::Text(text) => write!(f, "text '{text}'"),
        }
    }
}

/// Result of a resolved session, produced once per completed question.
///
/// Not persisted by this crate; score and stat storage is the caller's
/// concern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AnswerOutcome {
    /// Whether the answer was correct.
    pub correct: bool,
    /// Points earned after time decay; zero for incorrect answers.
    pub points: u32,
    /// Time from session start to the answer.
    pub elapsed: Duration,
    /// Explanation from the question snapshot, if the provider supplied one.
    pub explanation: Option<String>,
}
