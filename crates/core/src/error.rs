use thiserror::Error;

use crate::grading::GradeError;
use crate::model::{CatalogError, PermutationError, QuestionError, SectionStateError};

/// Umbrella error for the domain layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Permutation(#[from] PermutationError),
    #[error(transparent)]
    SectionState(#[from] SectionStateError),
    #[error(transparent)]
    Grade(#[from] GradeError),
}
