//! Exact-match grading of a learner's selection.
//!
//! Selections arrive in display-index space and are translated through the
//! question's [`Permutation`] before being compared with the canonical
//! correct set. There is no partial credit.

use std::collections::BTreeSet;
use thiserror::Error;

use crate::model::{Permutation, Question};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GradeError {
    #[error("select at least one option before answering")]
    NoSelection,

    #[error("display index {display} is out of range for {option_count} options")]
    SelectionOutOfRange { display: usize, option_count: usize },

    #[error("shuffle covers {found} options but the question has {expected}")]
    PermutationMismatch { expected: usize, found: usize },
}

//
// ─── OUTCOME ───────────────────────────────────────────────────────────────────
//

/// How a single displayed option should be marked after grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionMark {
    /// Correct and picked.
    SelectedCorrect,
    /// Correct but not picked.
    MissedCorrect,
    /// Picked but wrong.
    SelectedIncorrect,
    /// Neither picked nor correct.
    Neutral,
}

impl OptionMark {
    /// Options highlighted as the right answer, whether picked or not.
    #[must_use]
    pub fn is_correct_option(self) -> bool {
        matches!(self, Self::SelectedCorrect | Self::MissedCorrect)
    }
}

/// Feedback for one option, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionFeedback {
    pub display_index: usize,
    pub canonical_index: usize,
    pub mark: OptionMark,
}

/// Verdict for one question plus per-option feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeOutcome {
    correct: bool,
    options: Vec<OptionFeedback>,
}

impl GradeOutcome {
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.correct
    }

    /// 1 for a fully correct answer, 0 otherwise.
    #[must_use]
    pub fn points(&self) -> u32 {
        u32::from(self.correct)
    }

    /// Feedback in display order.
    #[must_use]
    pub fn options(&self) -> &[OptionFeedback] {
        &self.options
    }

    #[must_use]
    pub fn mark_at(&self, display_index: usize) -> Option<OptionMark> {
        self.options.get(display_index).map(|o| o.mark)
    }
}

//
// ─── GRADING ───────────────────────────────────────────────────────────────────
//

/// Grades `selection` (display indices) against `question`.
///
/// # Errors
///
/// Returns `GradeError::NoSelection` for an empty selection,
/// `GradeError::PermutationMismatch` if the permutation does not cover the
/// question's options, and `GradeError::SelectionOutOfRange` for display
/// indices past the last option.
pub fn grade(
    question: &Question,
    selection: &BTreeSet<usize>,
    permutation: &Permutation,
) -> Result<GradeOutcome, GradeError> {
    if selection.is_empty() {
        return Err(GradeError::NoSelection);
    }
    let option_count = question.option_count();
    if permutation.len() != option_count {
        return Err(GradeError::PermutationMismatch {
            expected: option_count,
            found: permutation.len(),
        });
    }

    let mut chosen = BTreeSet::new();
    for &display in selection {
        let canonical = permutation
            .canonical(display)
            .ok_or(GradeError::SelectionOutOfRange {
                display,
                option_count,
            })?;
        chosen.insert(canonical);
    }

    let correct = &chosen == question.correct();

    let options = permutation
        .display_order()
        .iter()
        .enumerate()
        .map(|(display_index, &canonical_index)| {
            let picked = selection.contains(&display_index);
            let mark = match (question.is_correct_option(canonical_index), picked) {
                (true, true) => OptionMark::SelectedCorrect,
                (true, false) => OptionMark::MissedCorrect,
                (false, true) => OptionMark::SelectedIncorrect,
                (false, false) => OptionMark::Neutral,
            };
            OptionFeedback {
                display_index,
                canonical_index,
                mark,
            }
        })
        .collect();

    Ok(GradeOutcome { correct, options })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionDraft;

    fn question(option_count: usize, correct: &[usize]) -> Question {
        QuestionDraft {
            prompt: "Q".into(),
            options: (0..option_count).map(|i| format!("opt {i}")).collect(),
            correct: correct.to_vec(),
            multiple: correct.len() > 1,
        }
        .validate()
        .unwrap()
    }

    fn perm(order: &[usize]) -> Permutation {
        Permutation::from_display_order(order.to_vec()).unwrap()
    }

    fn picks(items: &[usize]) -> BTreeSet<usize> {
        items.iter().copied().collect()
    }

    #[test]
    fn empty_selection_is_rejected() {
        let q = question(3, &[0]);
        assert_eq!(
            grade(&q, &BTreeSet::new(), &perm(&[0, 1, 2])),
            Err(GradeError::NoSelection)
        );
    }

    #[test]
    fn maps_display_indices_through_the_shuffle() {
        // Canonical 1 is correct and shown at display position 2.
        let q = question(3, &[1]);
        let p = perm(&[2, 0, 1]);

        assert!(grade(&q, &picks(&[2]), &p).unwrap().is_correct());
        assert!(!grade(&q, &picks(&[1]), &p).unwrap().is_correct());
    }

    #[test]
    fn exact_set_in_any_display_order_is_correct() {
        let q = question(4, &[0, 2, 3]);
        for order in [[0, 1, 2, 3], [3, 2, 1, 0], [1, 3, 0, 2]] {
            let p = perm(&order);
            let displayed: BTreeSet<usize> =
                [0, 2, 3].iter().map(|&c| p.display_of(c).unwrap()).collect();
            let outcome = grade(&q, &displayed, &p).unwrap();
            assert!(outcome.is_correct());
            assert_eq!(outcome.points(), 1);
        }
    }

    #[test]
    fn subset_and_superset_score_zero() {
        let q = question(4, &[0, 2, 3]);
        let p = perm(&[0, 1, 2, 3]);

        let subset = grade(&q, &picks(&[0, 2]), &p).unwrap();
        assert!(!subset.is_correct());
        assert_eq!(subset.points(), 0);

        let superset = grade(&q, &picks(&[0, 1, 2, 3]), &p).unwrap();
        assert!(!superset.is_correct());
    }

    #[test]
    fn grading_is_deterministic() {
        let q = question(3, &[0, 1]);
        let p = perm(&[1, 2, 0]);
        let sel = picks(&[0, 2]);
        let first = grade(&q, &sel, &p).unwrap();
        for _ in 0..5 {
            assert_eq!(grade(&q, &sel, &p).unwrap(), first);
        }
    }

    #[test]
    fn marks_every_option_for_feedback() {
        // Display order: canonical [1, 0, 2]; canonical 0 and 2 correct.
        let q = question(3, &[0, 2]);
        let p = perm(&[1, 0, 2]);
        let outcome = grade(&q, &picks(&[0, 2]), &p).unwrap();

        assert_eq!(outcome.mark_at(0), Some(OptionMark::SelectedIncorrect));
        assert_eq!(outcome.mark_at(1), Some(OptionMark::MissedCorrect));
        assert_eq!(outcome.mark_at(2), Some(OptionMark::SelectedCorrect));
        assert!(outcome.options()[1].mark.is_correct_option());
        assert_eq!(outcome.options()[0].canonical_index, 1);
    }

    #[test]
    fn rejects_out_of_range_and_mismatched_shuffles() {
        let q = question(3, &[0]);
        assert_eq!(
            grade(&q, &picks(&[5]), &perm(&[0, 1, 2])),
            Err(GradeError::SelectionOutOfRange {
                display: 5,
                option_count: 3
            })
        );
        assert_eq!(
            grade(&q, &picks(&[0]), &perm(&[0, 1])),
            Err(GradeError::PermutationMismatch {
                expected: 3,
                found: 2
            })
        );
    }
}
