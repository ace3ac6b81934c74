mod attempt;
mod catalog;
mod ids;
mod permutation;
mod question;
mod section_state;

pub use attempt::AttemptRecord;
pub use catalog::{CatalogError, QuizCatalog, Section};
pub use ids::{ParseIdError, SectionId};
pub use permutation::{Permutation, PermutationError};
pub use question::{Question, QuestionDraft, QuestionError};
pub use section_state::{SectionPhase, SectionState, SectionStateError};
