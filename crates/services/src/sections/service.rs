use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use quiz_core::grading::{self, GradeOutcome};
use quiz_core::model::{
    AttemptRecord, Permutation, Question, QuizCatalog, Section, SectionPhase, SectionState,
};
use storage::QuizStore;

use super::view::{QuestionView, SectionListItem, SectionTotal, SectionView};
use crate::Clock;
use crate::error::{QuizError, ValidationError};
use crate::history::AttemptHistoryService;
use crate::shuffle::ShuffleEngine;

/// Owns the per-section lifecycle: lazy creation, freezing option order on
/// first interaction, grading, completion and reset.
///
/// Every mutating call writes the full section document through the
/// [`QuizStore`] before returning.
#[derive(Clone)]
pub struct SectionService {
    clock: Clock,
    catalog: Arc<QuizCatalog>,
    store: Arc<QuizStore>,
    shuffle: Arc<ShuffleEngine>,
    history: AttemptHistoryService,
}

impl SectionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<QuizCatalog>,
        store: Arc<QuizStore>,
        shuffle: Arc<ShuffleEngine>,
    ) -> Self {
        let history = AttemptHistoryService::new(Arc::clone(&store));
        Self {
            clock,
            catalog,
            store,
            shuffle,
            history,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &QuizCatalog {
        &self.catalog
    }

    fn section(&self, id: &str) -> Result<&Section, QuizError> {
        self.catalog
            .section(id)
            .ok_or_else(|| QuizError::UnknownSection(id.to_owned()))
    }

    fn question(section: &Section, index: usize) -> Result<&Question, QuizError> {
        section
            .question(index)
            .ok_or_else(|| QuizError::QuestionOutOfRange {
                section: section.id().clone(),
                index,
            })
    }

    /// Menu listing with each section's current phase.
    #[must_use]
    pub fn list_sections(&self) -> Vec<SectionListItem> {
        self.catalog
            .sections()
            .iter()
            .map(|s| SectionListItem {
                id: s.id().clone(),
                title: s.title().to_owned(),
                question_count: s.question_count(),
                phase: SectionPhase::of(self.store.section(s.id()).as_ref()),
            })
            .collect()
    }

    /// # Errors
    ///
    /// Returns `QuizError::UnknownSection` for ids missing from the catalog.
    pub fn phase(&self, id: &str) -> Result<SectionPhase, QuizError> {
        let section = self.section(id)?;
        Ok(SectionPhase::of(self.store.section(section.id()).as_ref()))
    }

    /// Returns the stored state, creating and persisting an empty one on
    /// first visit.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` for unknown sections or storage failures.
    pub async fn ensure_section_state(&self, id: &str) -> Result<SectionState, QuizError> {
        let section = self.section(id)?;
        if let Some(state) = self.store.section(section.id()) {
            return Ok(state);
        }
        let state = SectionState::new();
        self.store.put_section(section.id(), state.clone()).await?;
        tracing::debug!(section = %section.id(), "section state created");
        Ok(state)
    }

    /// Option order to show for `question`.
    ///
    /// Before the section is frozen each call may return a different order;
    /// afterwards the recorded order is returned verbatim.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` for unknown sections/questions or storage failures.
    pub async fn permutation_for_question(
        &self,
        id: &str,
        question: usize,
    ) -> Result<Permutation, QuizError> {
        let section = self.section(id)?;
        let q = Self::question(section, question)?;
        let state = self.ensure_section_state(id).await?;
        Ok(self
            .shuffle
            .build_or_reuse(section.id(), &state, question, q.option_count()))
    }

    /// Snapshot of the whole section for rendering, including restored
    /// selections and feedback for graded questions.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` for unknown sections or storage failures.
    pub async fn render_section(&self, id: &str) -> Result<SectionView, QuizError> {
        let section = self.section(id)?;
        let state = self.ensure_section_state(id).await?;

        let questions = section
            .questions()
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let permutation =
                    self.shuffle
                        .build_or_reuse(section.id(), &state, index, question.option_count());
                let selection = state.selection(index).cloned().unwrap_or_default();
                let outcome = if state.is_graded(index) {
                    grading::grade(question, &selection, &permutation).ok()
                } else {
                    None
                };
                QuestionView::build(index, question, &permutation, &selection, outcome.as_ref())
            })
            .collect();

        Ok(SectionView {
            id: section.id().clone(),
            title: section.title().to_owned(),
            phase: state.phase(),
            questions,
        })
    }

    /// Orders currently on screen for every question lacking a usable
    /// recorded permutation. Questions never rendered get a fresh order.
    fn displayed_orders(
        &self,
        section: &Section,
        state: &SectionState,
    ) -> BTreeMap<usize, Permutation> {
        let mut displayed = BTreeMap::new();
        for (index, question) in section.questions().iter().enumerate() {
            let n = question.option_count();
            if state.permutation(index).is_some_and(|p| p.len() == n) {
                continue;
            }
            let order = self
                .shuffle
                .displayed(section.id(), index)
                .filter(|p| p.len() == n)
                .unwrap_or_else(|| self.shuffle.shuffle_for_display(section.id(), index, n));
            displayed.insert(index, order);
        }
        displayed
    }

    fn freeze_in_place(&self, section: &Section, state: &mut SectionState) -> bool {
        if state.is_frozen() {
            return false;
        }
        let displayed = self.displayed_orders(section, state);
        let frozen = state.freeze(displayed);
        if frozen {
            tracing::debug!(section = %section.id(), "option order frozen");
        }
        frozen
    }

    /// Freezes option order for the whole section. Returns `false` if it was
    /// already frozen.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` for unknown sections or storage failures.
    pub async fn freeze_section(&self, id: &str) -> Result<bool, QuizError> {
        let section = self.section(id)?;
        let mut state = self.ensure_section_state(id).await?;
        let changed = self.freeze_in_place(section, &mut state);
        if changed {
            self.store.put_section(section.id(), state).await?;
        }
        Ok(changed)
    }

    /// Stores the learner's current selection (display indices) for
    /// `question`. The first interaction in a section freezes its order.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Validation` for out-of-range options, several
    /// options on a single-choice question, or an already graded question.
    /// Returns other `QuizError`s for unknown ids or storage failures.
    pub async fn record_selection_change(
        &self,
        id: &str,
        question: usize,
        selection: BTreeSet<usize>,
    ) -> Result<(), QuizError> {
        let section = self.section(id)?;
        let q = Self::question(section, question)?;
        let mut state = self.ensure_section_state(id).await?;

        if state.is_graded(question) {
            return Err(ValidationError::AlreadyGraded.into());
        }
        validate_selection(q, &selection)?;

        self.freeze_in_place(section, &mut state);
        state.set_selection(question, selection);
        self.store.put_section(section.id(), state).await?;
        Ok(())
    }

    /// Returns the recorded permutation, rebuilding it from the order on
    /// screen if it is missing or no longer fits the question.
    fn repair_permutation(
        &self,
        section: &Section,
        state: &mut SectionState,
        question: usize,
        option_count: usize,
    ) -> Permutation {
        if let Some(p) = state.permutation(question).filter(|p| p.len() == option_count) {
            return p.clone();
        }
        tracing::warn!(
            section = %section.id(),
            question,
            "shuffle mapping missing at grading time, rebuilding from displayed order"
        );
        let rebuilt = self
            .shuffle
            .displayed(section.id(), question)
            .filter(|p| p.len() == option_count)
            .unwrap_or_else(|| Permutation::identity(option_count));
        state.replace_permutation(question, rebuilt.clone());
        rebuilt
    }

    fn grade_in_place(
        &self,
        section: &Section,
        state: &mut SectionState,
        index: usize,
        question: &Question,
    ) -> Result<GradeOutcome, QuizError> {
        self.freeze_in_place(section, state);
        let permutation = self.repair_permutation(section, state, index, question.option_count());
        let selection = state.selection(index).cloned().unwrap_or_default();
        let outcome = grading::grade(question, &selection, &permutation)?;
        state.mark_graded(index)?;
        Ok(outcome)
    }

    /// Grades the stored selection for `question` and locks it.
    ///
    /// Submitting an already graded question returns the same verdict again.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Validation(ValidationError::NoSelection)` when
    /// nothing is selected; nothing is changed in that case.
    pub async fn submit_question(
        &self,
        id: &str,
        question: usize,
    ) -> Result<GradeOutcome, QuizError> {
        let section = self.section(id)?;
        let q = Self::question(section, question)?;
        let mut state = self.ensure_section_state(id).await?;

        if !state.has_selection(question) {
            return Err(ValidationError::NoSelection.into());
        }

        let before = state.clone();
        let outcome = self.grade_in_place(section, &mut state, question, q)?;
        if state != before {
            self.store.put_section(section.id(), state).await?;
        }
        tracing::debug!(
            section = %section.id(),
            question,
            correct = outcome.is_correct(),
            "question graded"
        );
        Ok(outcome)
    }

    fn score(section: &Section, state: &SectionState) -> u32 {
        section
            .questions()
            .iter()
            .enumerate()
            .filter_map(|(index, question)| {
                let permutation = state.permutation(index)?;
                let selection = state.selection(index)?;
                grading::grade(question, selection, permutation).ok()
            })
            .map(|outcome| outcome.points())
            .sum()
    }

    /// Computes the section total.
    ///
    /// Questions with a selection that were never submitted are graded
    /// first. If any question is still unanswered the missing numbers are
    /// returned and the section stays in progress. Otherwise the section is
    /// marked completed and an attempt is appended to the history. If the
    /// attempt cannot be recorded the section is put back in progress.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` for unknown sections or storage failures.
    pub async fn request_section_total(&self, id: &str) -> Result<SectionTotal, QuizError> {
        let section = self.section(id)?;
        let mut state = self.ensure_section_state(id).await?;
        let count = section.question_count();

        let mut dirty = false;
        for index in state.pending(count) {
            let question = Self::question(section, index)?;
            match self.grade_in_place(section, &mut state, index, question) {
                Ok(_) => dirty = true,
                Err(err) => {
                    tracing::warn!(
                        section = %section.id(),
                        question = index,
                        error = %err,
                        "pending answer could not be graded"
                    );
                }
            }
        }

        let missing: Vec<usize> = state.ungraded(count).into_iter().map(|q| q + 1).collect();
        if !missing.is_empty() {
            if dirty {
                self.store.put_section(section.id(), state).await?;
            }
            tracing::debug!(section = %section.id(), ?missing, "total requested with unanswered questions");
            return Ok(SectionTotal::Missing { questions: missing });
        }

        let score = Self::score(section, &state);
        let total = u32::try_from(count).unwrap_or(u32::MAX);
        let in_progress = state.clone();
        state.mark_total_shown(count)?;
        self.store.put_section(section.id(), state).await?;

        let record = AttemptRecord::new(
            section.id().clone(),
            section.title(),
            self.clock.now(),
            score,
            total,
        );
        // Completion and its attempt record land together or not at all.
        if let Err(err) = self.history.record(record).await {
            if let Err(rollback) = self.store.put_section(section.id(), in_progress).await {
                tracing::warn!(
                    section = %section.id(),
                    error = %rollback,
                    "completion could not be rolled back"
                );
            }
            return Err(err);
        }
        tracing::info!(section = %section.id(), score, total, "section completed");

        Ok(SectionTotal::Completed { score, total })
    }

    /// Deletes a completed section's state so the next visit starts over.
    /// In-progress sections are left untouched. Returns whether state was
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` for unknown sections or storage failures.
    pub async fn clear_section_if_completed(&self, id: &str) -> Result<bool, QuizError> {
        let section = self.section(id)?;
        let completed = self
            .store
            .section(section.id())
            .is_some_and(|s| s.is_total_shown());
        if !completed {
            return Ok(false);
        }
        let removed = self.store.remove_section(section.id()).await?;
        tracing::debug!(section = %section.id(), "completed section reset");
        Ok(removed)
    }
}

fn validate_selection(question: &Question, selection: &BTreeSet<usize>) -> Result<(), ValidationError> {
    let option_count = question.option_count();
    if let Some(&display) = selection.iter().find(|&&d| d >= option_count) {
        return Err(ValidationError::OptionOutOfRange {
            display,
            option_count,
        });
    }
    if !question.allows_multiple() && selection.len() > 1 {
        return Err(ValidationError::SingleChoiceOnly);
    }
    Ok(())
}
