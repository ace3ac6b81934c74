use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::Rng;
use rand::seq::SliceRandom;

use quiz_core::model::{Permutation, SectionId, SectionState};

/// Upper bound on reshuffles when a new order equals the previous one.
pub const MAX_RESHUFFLES: usize = 10;

/// Produces option orders for questions whose section is not frozen yet.
///
/// Remembers the last order handed out per question for the lifetime of the
/// engine (one page load). That memory is what a freeze snapshots, and it lets
/// consecutive renders avoid showing the exact same order twice in a row.
#[derive(Default)]
pub struct ShuffleEngine {
    displayed: Mutex<HashMap<(SectionId, usize), Permutation>>,
}

impl ShuffleEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn displayed_guard(&self) -> MutexGuard<'_, HashMap<(SectionId, usize), Permutation>> {
        self.displayed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the recorded permutation for `question`, or a fresh ephemeral
    /// one when nothing usable is recorded.
    ///
    /// A recorded permutation whose length no longer matches `option_count`
    /// is treated as absent.
    pub fn build_or_reuse(
        &self,
        section: &SectionId,
        state: &SectionState,
        question: usize,
        option_count: usize,
    ) -> Permutation {
        match state.permutation(question) {
            Some(recorded) if recorded.len() == option_count => recorded.clone(),
            _ => self.shuffle_for_display(section, question, option_count),
        }
    }

    /// Generates a new order for display using the thread-local RNG.
    pub fn shuffle_for_display(
        &self,
        section: &SectionId,
        question: usize,
        option_count: usize,
    ) -> Permutation {
        self.shuffle_for_display_with(&mut rand::rng(), section, question, option_count)
    }

    /// Generates a new order for display and remembers it as the one on screen.
    pub fn shuffle_for_display_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        section: &SectionId,
        question: usize,
        option_count: usize,
    ) -> Permutation {
        let key = (section.clone(), question);
        let mut guard = self.displayed_guard();
        let next = shuffle_avoiding(rng, option_count, guard.get(&key));
        guard.insert(key, next.clone());
        next
    }

    /// The order most recently handed out for `question`, if any.
    #[must_use]
    pub fn displayed(&self, section: &SectionId, question: usize) -> Option<Permutation> {
        self.displayed_guard()
            .get(&(section.clone(), question))
            .cloned()
    }
}

/// Shuffles `0..option_count`, reshuffling up to [`MAX_RESHUFFLES`] times
/// while the result equals `previous`.
///
/// Only the immediately previous order is avoided; older orders may recur.
pub fn shuffle_avoiding<R: Rng + ?Sized>(
    rng: &mut R,
    option_count: usize,
    previous: Option<&Permutation>,
) -> Permutation {
    let mut order: Vec<usize> = (0..option_count).collect();
    order.shuffle(rng);

    if let Some(prev) = previous.filter(|p| p.len() == option_count) {
        let mut attempts = 0;
        while order.as_slice() == prev.display_order() && attempts < MAX_RESHUFFLES {
            order.shuffle(rng);
            attempts += 1;
        }
    }

    Permutation::from_display_order(order).unwrap_or_else(|_| Permutation::identity(option_count))
}
