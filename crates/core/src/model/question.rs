use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("a question needs at least two options, got {count}")]
    TooFewOptions { count: usize },

    #[error("option {index} is empty")]
    EmptyOption { index: usize },

    #[error("a question needs at least one correct option")]
    NoCorrectOption,

    #[error("correct index {index} is out of range for {count} options")]
    CorrectOutOfRange { index: usize, count: usize },

    #[error("single-choice question lists {count} correct options")]
    AmbiguousSingleChoice { count: usize },
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated question as it appears in a catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct: Vec<usize>,
    #[serde(default)]
    pub multiple: bool,
}

impl QuestionDraft {
    /// Validates the draft into an immutable `Question`.
    ///
    /// Duplicate correct indices collapse into one.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the prompt or an option is blank, fewer
    /// than two options are given, no correct index is listed, an index is
    /// out of range, or a single-choice question lists several answers.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let prompt = self.prompt.trim().to_owned();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }

        let count = self.options.len();
        if count < 2 {
            return Err(QuestionError::TooFewOptions { count });
        }
        if let Some(index) = self.options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuestionError::EmptyOption { index });
        }

        let correct: BTreeSet<usize> = self.correct.into_iter().collect();
        if correct.is_empty() {
            return Err(QuestionError::NoCorrectOption);
        }
        if let Some(&index) = correct.iter().find(|&&i| i >= count) {
            return Err(QuestionError::CorrectOutOfRange { index, count });
        }
        if !self.multiple && correct.len() > 1 {
            return Err(QuestionError::AmbiguousSingleChoice {
                count: correct.len(),
            });
        }

        Ok(Question {
            prompt,
            options: self.options,
            correct,
            multiple: self.multiple,
        })
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Immutable multiple-choice question in canonical option order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    prompt: String,
    options: Vec<String>,
    correct: BTreeSet<usize>,
    multiple: bool,
}

impl Question {
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Option texts in canonical order.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    /// Canonical indices of the correct options.
    #[must_use]
    pub fn correct(&self) -> &BTreeSet<usize> {
        &self.correct
    }

    #[must_use]
    pub fn is_correct_option(&self, canonical: usize) -> bool {
        self.correct.contains(&canonical)
    }

    /// Whether the learner may pick more than one option.
    #[must_use]
    pub fn allows_multiple(&self) -> bool {
        self.multiple
    }
}
