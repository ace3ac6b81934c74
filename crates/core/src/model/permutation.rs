use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PermutationError {
    #[error("permutation is empty")]
    Empty,

    #[error("display index {display} is missing from the mapping")]
    MissingDisplayIndex { display: usize },

    #[error("canonical index {canonical} is out of range for {len} options")]
    CanonicalOutOfRange { canonical: usize, len: usize },

    #[error("canonical index {canonical} appears more than once")]
    DuplicateCanonical { canonical: usize },
}

/// Mapping from displayed option position to canonical option index.
///
/// `displayed[d] == c` means the option shown at position `d` is canonical
/// option `c`. Always a bijection over `0..len`.
///
/// Persists as a `{ "display": canonical }` object so stored documents keep
/// the `shuffleMap` shape used by earlier versions of the quiz.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<usize, usize>",
    into = "BTreeMap<usize, usize>"
)]
pub struct Permutation {
    displayed: Vec<usize>,
}

impl Permutation {
    /// Canonical order, display index == canonical index.
    #[must_use]
    pub fn identity(len: usize) -> Self {
        Self {
            displayed: (0..len).collect(),
        }
    }

    /// Builds a permutation from the displayed order of canonical indices.
    ///
    /// # Errors
    ///
    /// Returns `PermutationError` if `displayed` is empty or not a bijection
    /// over `0..displayed.len()`.
    pub fn from_display_order(displayed: Vec<usize>) -> Result<Self, PermutationError> {
        if displayed.is_empty() {
            return Err(PermutationError::Empty);
        }
        let len = displayed.len();
        let mut seen = vec![false; len];
        for &canonical in &displayed {
            if canonical >= len {
                return Err(PermutationError::CanonicalOutOfRange { canonical, len });
            }
            if seen[canonical] {
                return Err(PermutationError::DuplicateCanonical { canonical });
            }
            seen[canonical] = true;
        }
        Ok(Self { displayed })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.displayed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.displayed.is_empty()
    }

    /// Canonical index shown at `display`, if in range.
    #[must_use]
    pub fn canonical(&self, display: usize) -> Option<usize> {
        self.displayed.get(display).copied()
    }

    /// Display position of canonical option `canonical`, if in range.
    #[must_use]
    pub fn display_of(&self, canonical: usize) -> Option<usize> {
        self.displayed.iter().position(|&c| c == canonical)
    }

    /// Canonical indices in display order.
    #[must_use]
    pub fn display_order(&self) -> &[usize] {
        &self.displayed
    }

    /// Reorders canonical items into display order.
    pub fn apply<'a, T>(&self, canonical: &'a [T]) -> Vec<&'a T> {
        self.displayed
            .iter()
            .filter_map(|&c| canonical.get(c))
            .collect()
    }
}

impl TryFrom<BTreeMap<usize, usize>> for Permutation {
    type Error = PermutationError;

    fn try_from(map: BTreeMap<usize, usize>) -> Result<Self, Self::Error> {
        let mut displayed = Vec::with_capacity(map.len());
        for (expected, (display, canonical)) in map.into_iter().enumerate() {
            if display != expected {
                return Err(PermutationError::MissingDisplayIndex { display: expected });
            }
            displayed.push(canonical);
        }
        Self::from_display_order(displayed)
    }
}

impl From<Permutation> for BTreeMap<usize, usize> {
    fn from(permutation: Permutation) -> Self {
        permutation.displayed.into_iter().enumerate().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_bijections() {
        assert_eq!(
            Permutation::from_display_order(vec![0, 0, 1]),
            Err(PermutationError::DuplicateCanonical { canonical: 0 })
        );
        assert_eq!(
            Permutation::from_display_order(vec![0, 3, 1]),
            Err(PermutationError::CanonicalOutOfRange { canonical: 3, len: 3 })
        );
        assert_eq!(
            Permutation::from_display_order(Vec::new()),
            Err(PermutationError::Empty)
        );
    }

    #[test]
    fn maps_both_directions() {
        let p = Permutation::from_display_order(vec![2, 0, 1]).unwrap();
        assert_eq!(p.canonical(0), Some(2));
        assert_eq!(p.display_of(2), Some(0));
        assert_eq!(p.display_of(1), Some(2));
        assert_eq!(p.canonical(3), None);

        let texts = ["a", "b", "c"];
        let shown: Vec<&str> = p.apply(&texts).into_iter().copied().collect();
        assert_eq!(shown, vec!["c", "a", "b"]);
    }

    #[test]
    fn persists_as_display_to_canonical_object() {
        let p = Permutation::from_display_order(vec![1, 2, 0]).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"0":1,"1":2,"2":0}"#);

        let back: Permutation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn gapped_display_keys_fail_to_load() {
        let err = serde_json::from_str::<Permutation>(r#"{"0":1,"2":0}"#);
        assert!(err.is_err());
    }
}
