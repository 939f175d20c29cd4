//! Collaborator seams for question selection and answer correctness, plus
//! ready-made implementations.
//!
//! The engine only ever calls the [`QuestionSource`] and [`AnswerChecker`]
//! traits; [`StaticQuestionSource`] and [`StandardAnswerChecker`] are
//! provided for callers who do not need a database-backed question bank or
//! custom validation rules.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use crate::game::answers::{normalize_answer_text, CANONICAL_TRUE_WORDS};
use crate::models::{CandidateAnswer, Difficulty, Question, QuestionKind};
use crate::Result;

/// Source of questions for new sessions.
pub trait QuestionSource: Send + Sync {
    /// Fetch a question, optionally constrained to a difficulty tier.
    /// Returns `None` when no matching question is available.
    fn fetch(
        &self,
        difficulty: Option<Difficulty>,
    ) -> Pin<Box<dyn Future<Output = Option<Question>> + Send + '_>>;
}

/// Delegated correctness check for a parsed answer.
pub trait AnswerChecker: Send + Sync {
    /// Whether `answer` is correct for `question`.
    ///
    /// # Errors
    ///
    /// Implementations may fail (e.g., on external lookups); the engine
    /// contains such failures and scores the answer as incorrect.
    fn check<'a>(
        &'a self,
        question: &'a Question,
        answer: &'a CandidateAnswer,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;
}

/// In-memory question bank with round-robin selection.
#[derive(Debug)]
pub struct StaticQuestionSource {
    questions: Vec<Question>,
    cursor: AtomicUsize,
}

impl StaticQuestionSource {
    /// Build a bank from an explicit question list.
    #[must_use]
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Build a bank from a JSON array of questions.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Config` if the document is not a valid question
    /// array.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let questions: Vec<Question> = serde_json::from_str(raw)?;
        Ok(Self::new(questions))
    }

    /// Number of questions in the bank.
    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the bank is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl QuestionSource for StaticQuestionSource {
    fn fetch(
        &self,
        difficulty: Option<Difficulty>,
    ) -> Pin<Box<dyn Future<Output = Option<Question>> + Send + '_>> {
        Box::pin(async move {
            let candidates: Vec<&Question> = self
                .questions
                .iter()
                .filter(|q| difficulty.is_none_or(|d| q.difficulty == d))
                .collect();
            if candidates.is_empty() {
                debug!(?difficulty, "question bank has no match");
                return None;
            }
            let index = self.cursor.fetch_add(1, Ordering::Relaxed) % candidates.len();
            Some(candidates[index].clone())
        })
    }
}

/// The stock correctness rules: multiple choice by index or option text,
/// true/false by truth synonyms, fill-in-the-blank against the canonical
/// answer and its variations, all compared after normalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardAnswerChecker;

impl StandardAnswerChecker {
    fn check_choice(question: &Question, index: usize) -> bool {
        if question.options.is_empty() || index >= question.options.len() {
            return false;
        }
        // The canonical answer is either the option index as a string or the
        // option text itself.
        if let Ok(correct_index) = question.correct_answer.trim().parse::<usize>() {
            return index == correct_index;
        }
        normalize_answer_text(&question.options[index])
            == normalize_answer_text(&question.correct_answer)
    }

    fn check_bool(question: &Question, value: bool) -> bool {
        let correct = question.correct_answer.trim().to_lowercase();
        let correct_is_true = CANONICAL_TRUE_WORDS.contains(&correct.as_str());
        value == correct_is_true
    }

    fn check_text(question: &Question, text: &str) -> bool {
        let candidate = normalize_answer_text(text);
        if candidate == normalize_answer_text(&question.correct_answer) {
            return true;
        }
        question
            .answer_variations
            .iter()
            .any(|variation| candidate == normalize_answer_text(variation))
    }
}

impl AnswerChecker for StandardAnswerChecker {
    fn check<'a>(
        &'a self,
        question: &'a Question,
        answer: &'a CandidateAnswer,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(async move {
            let correct = match (question.kind, answer) {
                (QuestionKind::MultipleChoice, CandidateAnswer::Choice(index)) => {
                    Self::check_choice(question, *index)
                }
                (QuestionKind::TrueFalse, CandidateAnswer::Bool(value)) => {
                    Self::check_bool(question, *value)
                }
                (QuestionKind::FillBlank, CandidateAnswer::Text(text)) => {
                    Self::check_text(question, text)
                }
                // Shape/kind mismatches never score.
                _ => false,
            };
            Ok(correct)
        })
    }
}
