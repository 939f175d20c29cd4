//! Answer shape parsing, text normalization, scoring, and display helpers.
//!
//! Parsing only decides whether an input is a legal *shape* for the active
//! question's kind; correctness is the [`AnswerChecker`](crate::providers::AnswerChecker)'s
//! job. Glyph membership is the whole shape check for reactions, so an
//! out-of-range choice (🇩 on a two-option question) reaches the checker and
//! scores as incorrect rather than being silently ignored.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::models::{CandidateAnswer, Question, QuestionKind};

// ── Glyph and synonym tables ─────────────────────────────────────────────────

/// Choice glyphs for multiple-choice reactions, in option order.
pub const CHOICE_GLYPHS: [&str; 4] = ["🇦", "🇧", "🇨", "🇩"];

/// Reaction glyph meaning "true".
pub const TRUE_GLYPH: &str = "✅";

/// Reaction glyph meaning "false".
pub const FALSE_GLYPH: &str = "❌";

/// Text inputs accepted as "true" for true/false questions.
const TRUE_WORDS: [&str; 7] = ["true", "t", "yes", "y", "1", "correct", "right"];

/// Text inputs accepted as "false" for true/false questions.
const FALSE_WORDS: [&str; 7] = ["false", "f", "no", "n", "0", "incorrect", "wrong"];

/// Words a question's canonical `correct_answer` may use to mean "true".
/// Narrower than [`TRUE_WORDS`]: authoring vocabulary, not player input.
pub(crate) const CANONICAL_TRUE_WORDS: [&str; 5] = ["true", "t", "yes", "y", "1"];

// ── Shape parsing ────────────────────────────────────────────────────────────

/// Parse a reaction glyph into a candidate answer for `question`.
///
/// Returns `None` when the glyph is not a legal shape for the question's
/// kind; fill-in-the-blank questions never accept reactions.
#[must_use]
pub fn parse_reaction(question: &Question, glyph: &str) -> Option<CandidateAnswer> {
    match question.kind {
        QuestionKind::MultipleChoice => CHOICE_GLYPHS
            .iter()
            .position(|&g| g == glyph)
            .map(CandidateAnswer::Choice),
        QuestionKind::TrueFalse => match glyph {
            TRUE_GLYPH => Some(CandidateAnswer::Bool(true)),
            FALSE_GLYPH => Some(CandidateAnswer::Bool(false)),
            _ => None,
        },
        QuestionKind::FillBlank => None,
    }
}

/// Parse a text message into a candidate answer for `question`.
///
/// Multiple choice accepts a single letter `a`-`d`, a digit `0`-`3`, or the
/// full option text (compared after normalization). True/false accepts the
/// truth synonym tables. Fill-in-the-blank accepts any non-empty trimmed
/// string. Returns `None` for everything else.
#[must_use]
pub fn parse_text(question: &Question, text: &str) -> Option<CandidateAnswer> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    match question.kind {
        QuestionKind::FillBlank => Some(CandidateAnswer::Text(trimmed.to_owned())),
        QuestionKind::TrueFalse => {
            let lower = trimmed.to_lowercase();
            if TRUE_WORDS.contains(&lower.as_str()) {
                Some(CandidateAnswer::Bool(true))
            } else if FALSE_WORDS.contains(&lower.as_str()) {
                Some(CandidateAnswer::Bool(false))
            } else {
                None
            }
        }
        QuestionKind::MultipleChoice => parse_choice_text(question, trimmed),
    }
}

fn parse_choice_text(question: &Question, trimmed: &str) -> Option<CandidateAnswer> {
    let lower = trimmed.to_lowercase();

    // Single letter a-d.
    if let [letter @ b'a'..=b'd'] = lower.as_bytes() {
        return Some(CandidateAnswer::Choice(usize::from(letter - b'a')));
    }

    // Digit 0-3.
    if let Ok(index) = lower.parse::<usize>() {
        if index <= 3 {
            return Some(CandidateAnswer::Choice(index));
        }
    }

    // Full option text.
    let candidate = normalize_answer_text(trimmed);
    question
        .options
        .iter()
        .position(|option| normalize_answer_text(option) == candidate)
        .map(CandidateAnswer::Choice)
}

// ── Normalization ────────────────────────────────────────────────────────────

static PUNCTUATION: OnceLock<Regex> = OnceLock::new();

#[allow(clippy::expect_used)] // Literal pattern; valid by construction.
fn punctuation() -> &'static Regex {
    PUNCTUATION.get_or_init(|| Regex::new(r#"[.,!?;:"'()]"#).expect("punctuation pattern"))
}

/// Normalize free text for lenient comparison: lowercase, strip punctuation,
/// collapse whitespace, and drop the articles `the`/`a`/`an` when the phrase
/// is longer than two words.
#[must_use]
pub fn normalize_answer_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = punctuation().replace_all(&lowered, "");
    let words: Vec<&str> = stripped.split_whitespace().collect();
    if words.len() > 2 {
        words
            .into_iter()
            .filter(|word| !matches!(*word, "the" | "a" | "an"))
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        words.join(" ")
    }
}

// ── Scoring ──────────────────────────────────────────────────────────────────

/// Compute points for an answer: 10% decay per 5 seconds elapsed, capped at
/// 50%, floored at 1 point for a correct answer; 0 for an incorrect one.
#[must_use]
pub fn score(base_points: u32, elapsed: Duration, correct: bool) -> u32 {
    if !correct {
        return 0;
    }
    let decay_permille = (elapsed.as_millis() / 50).min(500);
    let scaled = (u128::from(base_points) * (1000 - decay_permille)) / 1000;
    // scaled <= base_points, so the conversion cannot truncate.
    let points = u32::try_from(scaled).unwrap_or(base_points);
    points.max(1)
}

// ── Display helpers ──────────────────────────────────────────────────────────

/// A user-facing hint of the expected answer format for `question`.
#[must_use]
pub fn answer_format_hint(question: &Question) -> &'static str {
    match question.kind {
        QuestionKind::MultipleChoice => "React with 🇦, 🇧, 🇨, or 🇩, or type A, B, C, D",
        QuestionKind::TrueFalse => "React with ✅ for True or ❌ for False, or type true/false",
        QuestionKind::FillBlank => "Type your answer in the chat",
    }
}

/// Format the correct answer for reveal messages: glyph plus option text for
/// multiple choice, glyph plus `True`/`False` for true/false, the canonical
/// answer text otherwise.
#[must_use]
pub fn correct_answer_display(question: &Question) -> String {
    match question.kind {
        QuestionKind::MultipleChoice => {
            if let Ok(index) = question.correct_answer.trim().parse::<usize>() {
                if let (Some(glyph), Some(option)) =
                    (CHOICE_GLYPHS.get(index), question.options.get(index))
                {
                    return format!("{glyph} {option}");
                }
            }
            let correct = normalize_answer_text(&question.correct_answer);
            for (index, option) in question.options.iter().enumerate() {
                if normalize_answer_text(option) == correct {
                    if let Some(glyph) = CHOICE_GLYPHS.get(index) {
                        return format!("{glyph} {option}");
                    }
                    return option.clone();
                }
            }
            question.correct_answer.clone()
        }
        QuestionKind::TrueFalse => {
            let correct = question.correct_answer.trim().to_lowercase();
            if CANONICAL_TRUE_WORDS.contains(&correct.as_str()) {
                format!("{TRUE_GLYPH} True")
            } else {
                format!("{FALSE_GLYPH} False")
            }
        }
        QuestionKind::FillBlank => question.correct_answer.clone(),
    }
}
