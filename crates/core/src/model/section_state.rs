use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::model::permutation::Permutation;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SectionStateError {
    #[error("question {question} has no selection to grade")]
    NoSelection { question: usize },

    #[error("question {question} has no recorded shuffle")]
    MissingPermutation { question: usize },

    #[error("questions still ungraded: {missing:?}")]
    Incomplete { missing: Vec<usize> },
}

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Lifecycle position of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionPhase {
    /// Nothing stored yet.
    Fresh,
    /// State exists; option order is still reshuffled on every render.
    Unfrozen,
    /// Option order is fixed; the learner is answering.
    InProgress,
    /// The total was shown with every question graded.
    Completed,
}

impl SectionPhase {
    #[must_use]
    pub fn of(state: Option<&SectionState>) -> Self {
        match state {
            None => Self::Fresh,
            Some(s) if s.is_total_shown() => Self::Completed,
            Some(s) if s.is_frozen() => Self::InProgress,
            Some(_) => Self::Unfrozen,
        }
    }
}

//
// ─── SECTION STATE ─────────────────────────────────────────────────────────────
//

/// Persisted progress for one section.
///
/// Selections are stored in display-index space; `shuffle_map` translates
/// them back to canonical option indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionState {
    #[serde(default)]
    shuffle_frozen: bool,
    #[serde(default)]
    shuffle_map: BTreeMap<usize, Permutation>,
    #[serde(default)]
    answers: BTreeMap<usize, BTreeSet<usize>>,
    #[serde(default)]
    graded: BTreeMap<usize, bool>,
    #[serde(default)]
    total_shown: bool,
}

impl SectionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn phase(&self) -> SectionPhase {
        SectionPhase::of(Some(self))
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.shuffle_frozen
    }

    #[must_use]
    pub fn is_total_shown(&self) -> bool {
        self.total_shown
    }

    #[must_use]
    pub fn permutation(&self, question: usize) -> Option<&Permutation> {
        self.shuffle_map.get(&question)
    }

    #[must_use]
    pub fn shuffle_map(&self) -> &BTreeMap<usize, Permutation> {
        &self.shuffle_map
    }

    /// Raw selection for `question` in display-index space.
    #[must_use]
    pub fn selection(&self, question: usize) -> Option<&BTreeSet<usize>> {
        self.answers.get(&question)
    }

    #[must_use]
    pub fn has_selection(&self, question: usize) -> bool {
        self.answers.get(&question).is_some_and(|s| !s.is_empty())
    }

    #[must_use]
    pub fn is_graded(&self, question: usize) -> bool {
        self.graded.get(&question).copied().unwrap_or(false)
    }

    /// Fixes option order for the whole section at once.
    ///
    /// `displayed` holds the order currently on screen per question. Questions
    /// that already have a recorded permutation of the same length keep it; a
    /// recorded permutation of another length is stale and gets replaced.
    /// Returns `false` when the section was already frozen, in which case
    /// nothing changes.
    pub fn freeze(&mut self, displayed: BTreeMap<usize, Permutation>) -> bool {
        if self.shuffle_frozen {
            return false;
        }
        for (question, permutation) in displayed {
            match self.shuffle_map.get(&question) {
                Some(recorded) if recorded.len() == permutation.len() => {}
                _ => {
                    self.shuffle_map.insert(question, permutation);
                }
            }
        }
        self.shuffle_frozen = true;
        true
    }

    /// Replaces the recorded permutation for `question`.
    pub fn replace_permutation(&mut self, question: usize, permutation: Permutation) {
        self.shuffle_map.insert(question, permutation);
    }

    pub fn set_selection(&mut self, question: usize, selection: BTreeSet<usize>) {
        self.answers.insert(question, selection);
    }

    /// Marks `question` as submitted.
    ///
    /// # Errors
    ///
    /// Returns `SectionStateError` if the question has no selection or no
    /// recorded permutation.
    pub fn mark_graded(&mut self, question: usize) -> Result<(), SectionStateError> {
        if !self.has_selection(question) {
            return Err(SectionStateError::NoSelection { question });
        }
        if !self.shuffle_map.contains_key(&question) {
            return Err(SectionStateError::MissingPermutation { question });
        }
        self.graded.insert(question, true);
        Ok(())
    }

    /// Questions in `0..question_count` not yet graded.
    #[must_use]
    pub fn ungraded(&self, question_count: usize) -> Vec<usize> {
        (0..question_count).filter(|&q| !self.is_graded(q)).collect()
    }

    /// Ungraded questions that nevertheless have a selection.
    #[must_use]
    pub fn pending(&self, question_count: usize) -> Vec<usize> {
        (0..question_count)
            .filter(|&q| !self.is_graded(q) && self.has_selection(q))
            .collect()
    }

    /// Marks the section completed.
    ///
    /// # Errors
    ///
    /// Returns `SectionStateError::Incomplete` listing 0-based indices of
    /// ungraded questions.
    pub fn mark_total_shown(&mut self, question_count: usize) -> Result<(), SectionStateError> {
        let missing = self.ungraded(question_count);
        if !missing.is_empty() {
            return Err(SectionStateError::Incomplete { missing });
        }
        self.total_shown = true;
        Ok(())
    }
}
