mod service;
mod view;

// Public API of the section subsystem.
pub use crate::error::{QuizError, ValidationError};
pub use service::SectionService;
pub use view::{DisplayedOption, QuestionView, SectionListItem, SectionTotal, SectionView};
