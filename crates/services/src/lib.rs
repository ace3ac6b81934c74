#![forbid(unsafe_code)]

pub mod error;
pub mod history;
pub mod navigation;
pub mod quiz_services;
pub mod sections;
pub mod shuffle;

pub use quiz_core::Clock;

pub use error::{QuizError, QuizServicesError, ValidationError};
pub use history::{AttemptDay, AttemptHistoryService};
pub use navigation::{MenuReturn, Navigator, Route};
pub use quiz_services::QuizServices;
pub use sections::{
    DisplayedOption, QuestionView, SectionListItem, SectionService, SectionTotal, SectionView,
};
pub use shuffle::ShuffleEngine;
