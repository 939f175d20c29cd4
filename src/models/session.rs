//! Session model and liveness helpers.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::question::{Difficulty, Question};
use super::{ChannelId, UserId};

/// Why a session ended. Recorded at teardown and carried in logs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// A shape-valid answer resolved the question.
    Answered,
    /// The session timer expired without an answer.
    TimedOut,
    /// The caller ended the session explicitly.
    Cancelled,
    /// The maintenance sweep reclaimed a session past the hard maximum age,
    /// or a stale session was replaced by a new start attempt.
    Expired,
    /// The channel lost the permissions required for messaging.
    Inaccessible,
    /// The engine shut down while the session was active.
    Shutdown,
}

impl Display for EndReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Answered => "answered",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
            Self::Inaccessible => "inaccessible",
            Self::Shutdown => "shutdown",
        };
        write!(f, "{name}")
    }
}

/// One question's lifecycle within one channel.
///
/// At most one non-completed session exists per channel at any instant; the
/// session store enforces that invariant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GameSession {
    /// Unique session identifier.
    pub id: Uuid,
    /// Channel this session is scoped to.
    pub channel_id: ChannelId,
    /// User who started the session.
    pub user_id: UserId,
    /// Snapshot of the question being played.
    pub question: Question,
    /// Difficulty tier, copied from the question at start.
    pub difficulty: Difficulty,
    /// Start timestamp.
    pub started_at: DateTime<Utc>,
    /// End timestamp, set at teardown.
    pub ended_at: Option<DateTime<Utc>>,
    /// Whether the session has completed.
    pub completed: bool,
    /// Why the session ended, set at teardown.
    pub end_reason: Option<EndReason>,
    /// Whether this is a challenge-variant session.
    pub challenge: bool,
    /// Users who reached answer processing, plus the initiator.
    pub participants: HashSet<UserId>,
    /// Configured timeout for this session.
    pub timeout: Duration,
}

impl GameSession {
    /// Construct a new live session. The initiator is pre-seeded into the
    /// participant set and the difficulty is copied from the question.
    #[must_use]
    pub fn new(
        channel_id: ChannelId,
        user_id: UserId,
        question: Question,
        challenge: bool,
        timeout: Duration,
    ) -> Self {
        let difficulty = question.difficulty;
        let mut participants = HashSet::new();
        participants.insert(user_id);
        Self {
            id: Uuid::new_v4(),
            channel_id,
            user_id,
            question,
            difficulty,
            started_at: Utc::now(),
            ended_at: None,
            completed: false,
            end_reason: None,
            challenge,
            participants,
            timeout,
        }
    }

    /// Wall-clock time elapsed since the session started, clamped to zero.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        (Utc::now() - self.started_at).to_std().unwrap_or_default()
    }

    /// Time left before the configured timeout, saturating at zero.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.timeout.saturating_sub(self.elapsed())
    }

    /// Whether the configured timeout has passed.
    #[must_use]
    pub fn deadline_passed(&self) -> bool {
        self.elapsed() >= self.timeout
    }

    /// Whether the session is still playable.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.completed
    }

    /// Whether the session should be treated as abandoned: completed but
    /// still stored, past its deadline plus the fallback grace, or past the
    /// hard maximum age.
    #[must_use]
    pub fn is_stale(&self, fallback_grace: Duration, max_age: Duration) -> bool {
        if self.completed {
            return true;
        }
        let elapsed = self.elapsed();
        elapsed > self.timeout.saturating_add(fallback_grace) || elapsed > max_age
    }

    /// Stamp the session as ended.
    pub fn mark_ended(&mut self, reason: EndReason) {
        self.completed = true;
        self.ended_at = Some(Utc::now());
        self.end_reason = Some(reason);
    }

    /// Record an answer attempt by `user`. Returns `true` if the user was
    /// not already a participant.
    pub fn record_participant(&mut self, user: UserId) -> bool {
        self.participants.insert(user)
    }
}
