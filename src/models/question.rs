//! Question model: kinds, difficulties, and the question snapshot.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::GameError;

/// Question difficulty tier, each carrying a base point value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Entry-level question, 10 base points.
    Easy,
    /// Mid-tier question, 20 base points.
    Medium,
    /// Hard question, 30 base points.
    Hard,
}

impl Difficulty {
    /// Base point value before time decay.
    #[must_use]
    pub fn base_points(self) -> u32 {
        match self {
            Self::Easy => 10,
            Self::Medium => 20,
            Self::Hard => 30,
        }
    }
}

impl Display for Difficulty {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Difficulty {
    type Err = GameError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(GameError::Game(format!("unknown difficulty '{other}'"))),
        }
    }
}

/// Supported question formats, each with its own answer modalities.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// Up to four options answered by choice glyph, letter, digit, or text.
    MultipleChoice,
    /// Answered by the check/cross glyphs or a truth synonym.
    TrueFalse,
    /// Answered by free text only.
    FillBlank,
}

impl Display for QuestionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::MultipleChoice => "multiple_choice",
            Self::TrueFalse => "true_false",
            Self::FillBlank => "fill_blank",
        };
        write!(f, "{name}")
    }
}

/// One trivia question as handed over by a question provider.
///
/// Sessions hold a snapshot of the question they were started with, so later
/// changes in the provider never affect a running game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Question {
    /// Provider-assigned identifier, if any.
    #[serde(default)]
    pub id: Option<i64>,
    /// The question text shown to players.
    pub text: String,
    /// Question format.
    pub kind: QuestionKind,
    /// Difficulty tier.
    pub difficulty: Difficulty,
    /// Topical category label.
    #[serde(default = "default_category")]
    pub category: String,
    /// Canonical correct answer. For multiple choice this is either the
    /// option index as a string or the option text itself.
    pub correct_answer: String,
    /// Option texts for multiple choice, in display order.
    #[serde(default)]
    pub options: Vec<String>,
    /// Accepted alternative spellings for fill-in-the-blank answers.
    #[serde(default)]
    pub answer_variations: Vec<String>,
    /// Optional explanation revealed after the question resolves.
    #[serde(default)]
    pub explanation: Option<String>,
    /// Points awarded before time decay.
    #[serde(default)]
    pub point_value: u32,
}

fn default_category() -> String {
    "general".into()
}

impl Question {
    /// Construct a question with the difficulty's base point value and no
    /// options, variations, or explanation.
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        kind: QuestionKind,
        difficulty: Difficulty,
        correct_answer: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            text: text.into(),
            kind,
            difficulty,
            category: default_category(),
            correct_answer: correct_answer.into(),
            options: Vec::new(),
            answer_variations: Vec::new(),
            explanation: None,
            point_value: difficulty.base_points(),
        }
    }

    /// Set the multiple-choice options.
    #[must_use]
    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    /// Set the accepted fill-in-the-blank variations.
    #[must_use]
    pub fn with_variations(mut self, variations: Vec<String>) -> Self {
        self.answer_variations = variations;
        self
    }

    /// Set the post-resolution explanation.
    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Set the category label.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Points for this question, falling back to the difficulty's base value
    /// when the provider left the point value unset.
    #[must_use]
    pub fn effective_points(&self) -> u32 {
        if self.point_value == 0 {
            self.difficulty.base_points()
        } else {
            self.point_value
        }
    }
}
