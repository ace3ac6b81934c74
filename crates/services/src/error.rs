//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::grading::GradeError;
use quiz_core::model::{SectionId, SectionStateError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Problems the learner can fix; shown inline next to the question.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("select at least one option before answering")]
    NoSelection,

    #[error("option {display} does not exist; the question has {option_count} options")]
    OptionOutOfRange { display: usize, option_count: usize },

    #[error("only one option may be selected for this question")]
    SingleChoiceOnly,

    #[error("this question was already answered")]
    AlreadyGraded,
}

/// Errors emitted by the quiz services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("unknown section: {0}")]
    UnknownSection(String),

    #[error("section {section} has no question {index}")]
    QuestionOutOfRange { section: SectionId, index: usize },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Grade(#[from] GradeError),

    #[error(transparent)]
    SectionState(#[from] SectionStateError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl QuizError {
    /// True for errors the learner caused and can correct.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Errors emitted while bootstrapping the services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
