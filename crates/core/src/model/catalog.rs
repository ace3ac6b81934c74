use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::SectionId;
use crate::model::question::{Question, QuestionDraft, QuestionError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("catalog has no sections")]
    Empty,

    #[error("section {0} is declared more than once")]
    DuplicateSection(SectionId),

    #[error("section {0} has no questions")]
    EmptySection(SectionId),

    #[error("section {section}, question {number}: {source}")]
    Question {
        section: SectionId,
        /// 1-based question number.
        number: usize,
        #[source]
        source: QuestionError,
    },
}

//
// ─── SECTION ───────────────────────────────────────────────────────────────────
//

/// Ordered list of questions shown together on one page.
///
/// Question order is fixed; only option order is shuffled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    id: SectionId,
    title: String,
    questions: Vec<Question>,
}

impl Section {
    /// Builds a section, falling back to the capitalized id when no title is
    /// given.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::EmptySection` if `questions` is empty.
    pub fn new(
        id: SectionId,
        title: Option<String>,
        questions: Vec<Question>,
    ) -> Result<Self, CatalogError> {
        if questions.is_empty() {
            return Err(CatalogError::EmptySection(id));
        }
        let title = title
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| id.capitalized());
        Ok(Self {
            id,
            title,
            questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> &SectionId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
struct CatalogFile {
    sections: Vec<SectionFile>,
}

#[derive(Debug, Deserialize)]
struct SectionFile {
    id: SectionId,
    #[serde(default)]
    title: Option<String>,
    questions: Vec<QuestionDraft>,
}

/// Every section the quiz offers, in menu order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizCatalog {
    sections: Vec<Section>,
}

impl QuizCatalog {
    /// # Errors
    ///
    /// Returns `CatalogError` if there are no sections or two share an id.
    pub fn new(sections: Vec<Section>) -> Result<Self, CatalogError> {
        if sections.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for section in &sections {
            if !seen.insert(section.id().clone()) {
                return Err(CatalogError::DuplicateSection(section.id().clone()));
            }
        }
        Ok(Self { sections })
    }

    /// Parses and validates a JSON catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` for malformed JSON or any invalid section or question.
    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        let mut sections = Vec::with_capacity(file.sections.len());
        for section in file.sections {
            let mut questions = Vec::with_capacity(section.questions.len());
            for (idx, draft) in section.questions.into_iter().enumerate() {
                let question = draft.validate().map_err(|source| CatalogError::Question {
                    section: section.id.clone(),
                    number: idx + 1,
                    source,
                })?;
                questions.push(question);
            }
            sections.push(Section::new(section.id, section.title, questions)?);
        }
        Self::new(sections)
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id().as_str() == id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.section(id).is_some()
    }
}
