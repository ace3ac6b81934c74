//! Typed access to the quiz documents kept in a [`KeyValueStore`].
//!
//! The store loads section progress and the attempt log once when opened and
//! writes the full document back on every mutation. Unreadable or malformed
//! documents are replaced by empty defaults instead of being reported.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;

use quiz_core::model::{AttemptRecord, SectionId, SectionState};

use crate::repository::{KeyValueStore, StorageError};

/// Section id → progress document.
pub const STATE_KEY: &str = "quiz_state_v2";
/// Append-only list of completed attempts.
pub const ATTEMPT_LOG_KEY: &str = "quiz_attempt_log_v1";
/// Menu scroll offset, cleared on every page load.
pub const SCROLL_POSITION_KEY: &str = "quiz_scroll_position_v1";

/// Session-scoped context object over the durable store.
///
/// One instance per page lifecycle; every component that reads or writes quiz
/// progress goes through it.
pub struct QuizStore {
    kv: Arc<dyn KeyValueStore>,
    sections: Mutex<BTreeMap<SectionId, SectionState>>,
    attempts: Mutex<Vec<AttemptRecord>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn to_json<T: Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

async fn load_or_default<T>(kv: &dyn KeyValueStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match kv.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(err) => {
            tracing::warn!(key, error = %err, "quiz store unreadable, starting empty");
            return T::default();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(key, error = %err, "quiz store document malformed, starting empty");
            T::default()
        }
    }
}

impl QuizStore {
    /// Loads the persisted documents. Never fails: missing, unreadable or
    /// malformed documents yield empty state.
    pub async fn open(kv: Arc<dyn KeyValueStore>) -> Self {
        let sections = load_or_default(kv.as_ref(), STATE_KEY).await;
        let attempts = load_or_default(kv.as_ref(), ATTEMPT_LOG_KEY).await;
        Self {
            kv,
            sections: Mutex::new(sections),
            attempts: Mutex::new(attempts),
        }
    }

    #[must_use]
    pub fn section(&self, id: &SectionId) -> Option<SectionState> {
        lock(&self.sections).get(id).cloned()
    }

    #[must_use]
    pub fn section_ids(&self) -> Vec<SectionId> {
        lock(&self.sections).keys().cloned().collect()
    }

    /// Writes the whole progress document with `state` stored for `id`.
    /// The in-memory copy changes only once the write succeeded.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be serialized or written.
    pub async fn put_section(&self, id: &SectionId, state: SectionState) -> Result<(), StorageError> {
        let mut next = lock(&self.sections).clone();
        next.insert(id.clone(), state);
        self.kv.set(STATE_KEY, &to_json(&next)?).await?;
        *lock(&self.sections) = next;
        Ok(())
    }

    /// Deletes the progress for `id`. Returns whether anything was stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be serialized or written.
    pub async fn remove_section(&self, id: &SectionId) -> Result<bool, StorageError> {
        let mut next = lock(&self.sections).clone();
        if next.remove(id).is_none() {
            return Ok(false);
        }
        self.kv.set(STATE_KEY, &to_json(&next)?).await?;
        *lock(&self.sections) = next;
        Ok(true)
    }

    /// All recorded attempts in insertion order.
    #[must_use]
    pub fn attempts(&self) -> Vec<AttemptRecord> {
        lock(&self.attempts).clone()
    }

    /// Appends `record` and writes the whole attempt log. The in-memory log
    /// grows only once the write succeeded.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the log cannot be serialized or written.
    pub async fn append_attempt(&self, record: AttemptRecord) -> Result<(), StorageError> {
        let mut next = lock(&self.attempts).clone();
        next.push(record);
        self.kv.set(ATTEMPT_LOG_KEY, &to_json(&next)?).await?;
        *lock(&self.attempts) = next;
        Ok(())
    }

    /// Last saved menu scroll offset. Unreadable values read as `None`.
    pub async fn scroll_position(&self) -> Option<u32> {
        match self.kv.get(SCROLL_POSITION_KEY).await {
            Ok(raw) => raw.and_then(|v| v.trim().parse().ok()),
            Err(err) => {
                tracing::warn!(error = %err, "scroll position unreadable");
                None
            }
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be written.
    pub async fn save_scroll_position(&self, offset: u32) -> Result<(), StorageError> {
        self.kv.set(SCROLL_POSITION_KEY, &offset.to_string()).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be removed.
    pub async fn clear_scroll_position(&self) -> Result<(), StorageError> {
        self.kv.remove(SCROLL_POSITION_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;
    use async_trait::async_trait;
    use quiz_core::time::fixed_now;

    /// Accepts reads, refuses every write.
    struct ReadOnly(InMemoryRepository);

    #[async_trait]
    impl KeyValueStore for ReadOnly {
        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get(key).await
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Connection("read-only".into()))
        }

        async fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Connection("read-only".into()))
        }
    }

    fn id(raw: &str) -> SectionId {
        raw.parse().unwrap()
    }

    #[tokio::test]
    async fn missing_documents_open_empty() {
        let store = QuizStore::open(Arc::new(InMemoryRepository::new())).await;
        assert!(store.section_ids().is_empty());
        assert!(store.attempts().is_empty());
        assert_eq!(store.scroll_position().await, None);
    }

    #[tokio::test]
    async fn malformed_documents_fall_back_to_empty() {
        let repo = InMemoryRepository::with_entries([
            (STATE_KEY, "{not json"),
            (ATTEMPT_LOG_KEY, "[{\"sectionId\": 3}]"),
            (SCROLL_POSITION_KEY, "abc"),
        ]);
        let store = QuizStore::open(Arc::new(repo)).await;
        assert!(store.section_ids().is_empty());
        assert!(store.attempts().is_empty());
        assert_eq!(store.scroll_position().await, None);
    }

    #[tokio::test]
    async fn writes_through_and_reloads() {
        let repo = InMemoryRepository::new();
        let store = QuizStore::open(Arc::new(repo.clone())).await;

        store.put_section(&id("historia"), SectionState::new()).await.unwrap();
        store
            .append_attempt(AttemptRecord::new(id("historia"), "Historia", fixed_now(), 2, 3))
            .await
            .unwrap();
        store.save_scroll_position(420).await.unwrap();

        let raw = repo.get(STATE_KEY).await.unwrap().unwrap();
        assert!(raw.contains("\"historia\""));

        let reopened = QuizStore::open(Arc::new(repo)).await;
        assert_eq!(reopened.section(&id("historia")), Some(SectionState::new()));
        assert_eq!(reopened.attempts().len(), 1);
        assert_eq!(reopened.attempts()[0].score(), 2);
        assert_eq!(reopened.scroll_position().await, Some(420));
    }

    #[tokio::test]
    async fn remove_section_reports_presence() {
        let repo = InMemoryRepository::new();
        let store = QuizStore::open(Arc::new(repo.clone())).await;
        store.put_section(&id("a"), SectionState::new()).await.unwrap();
        store.put_section(&id("b"), SectionState::new()).await.unwrap();

        assert!(store.remove_section(&id("a")).await.unwrap());
        assert!(!store.remove_section(&id("a")).await.unwrap());

        let reopened = QuizStore::open(Arc::new(repo)).await;
        assert_eq!(reopened.section_ids(), vec![id("b")]);
    }

    #[tokio::test]
    async fn clearing_scroll_position_removes_it() {
        let store = QuizStore::open(Arc::new(InMemoryRepository::new())).await;
        store.save_scroll_position(10).await.unwrap();
        store.clear_scroll_position().await.unwrap();
        assert_eq!(store.scroll_position().await, None);
    }

    #[tokio::test]
    async fn failed_writes_leave_memory_unchanged() {
        let repo = InMemoryRepository::new();
        let seeded = QuizStore::open(Arc::new(repo.clone())).await;
        seeded.put_section(&id("a"), SectionState::new()).await.unwrap();

        let store = QuizStore::open(Arc::new(ReadOnly(repo))).await;
        assert!(store.put_section(&id("b"), SectionState::new()).await.is_err());
        assert!(store.remove_section(&id("a")).await.is_err());
        assert!(
            store
                .append_attempt(AttemptRecord::new(id("a"), "A", fixed_now(), 1, 1))
                .await
                .is_err()
        );

        assert_eq!(store.section_ids(), vec![id("a")]);
        assert!(store.attempts().is_empty());
    }
}
