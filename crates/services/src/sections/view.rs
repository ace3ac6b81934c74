use quiz_core::grading::{GradeOutcome, OptionMark};
use quiz_core::model::{Permutation, Question, SectionId, SectionPhase};
use std::collections::BTreeSet;

/// Presentation-agnostic snapshot of a section.
///
/// Not a UI view-model: no pre-formatted strings,
/// no colors. A renderer paints it; it never feeds state back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionView {
    pub id: SectionId,
    pub title: String,
    pub phase: SectionPhase,
    pub questions: Vec<QuestionView>,
}

impl SectionView {
    /// Points earned on questions graded so far.
    #[must_use]
    pub fn score_so_far(&self) -> u32 {
        let correct = self
            .questions
            .iter()
            .filter(|q| q.correct == Some(true))
            .count();
        u32::try_from(correct).unwrap_or(u32::MAX)
    }
}

/// One question with options in the order they are shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub index: usize,
    /// 1-based number for display.
    pub number: usize,
    pub prompt: String,
    pub allows_multiple: bool,
    pub options: Vec<DisplayedOption>,
    pub graded: bool,
    /// Verdict once graded.
    pub correct: Option<bool>,
}

impl QuestionView {
    pub(crate) fn build(
        index: usize,
        question: &Question,
        permutation: &Permutation,
        selection: &BTreeSet<usize>,
        outcome: Option<&GradeOutcome>,
    ) -> Self {
        let options = permutation
            .display_order()
            .iter()
            .enumerate()
            .map(|(display_index, &canonical_index)| DisplayedOption {
                display_index,
                canonical_index,
                text: question
                    .options()
                    .get(canonical_index)
                    .cloned()
                    .unwrap_or_default(),
                selected: selection.contains(&display_index),
                mark: outcome.and_then(|o| o.mark_at(display_index)),
            })
            .collect();

        Self {
            index,
            number: index + 1,
            prompt: question.prompt().to_owned(),
            allows_multiple: question.allows_multiple(),
            options,
            graded: outcome.is_some(),
            correct: outcome.map(GradeOutcome::is_correct),
        }
    }

    #[must_use]
    pub fn selected_display_indices(&self) -> BTreeSet<usize> {
        self.options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.display_index)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayedOption {
    pub display_index: usize,
    pub canonical_index: usize,
    pub text: String,
    pub selected: bool,
    /// Feedback mark, present only once the question is graded.
    pub mark: Option<OptionMark>,
}

/// Result of asking for a section's aggregate score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionTotal {
    /// Some questions have no answer; 1-based numbers, ascending.
    Missing { questions: Vec<usize> },
    /// Every question graded; the attempt was recorded.
    Completed { score: u32, total: u32 },
}

impl SectionTotal {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Menu entry for a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionListItem {
    pub id: SectionId,
    pub title: String,
    pub question_count: usize,
    pub phase: SectionPhase,
}
