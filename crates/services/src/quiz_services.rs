use std::sync::Arc;

use quiz_core::model::QuizCatalog;
use storage::{QuizStore, Storage};

use crate::Clock;
use crate::error::QuizServicesError;
use crate::history::AttemptHistoryService;
use crate::navigation::Navigator;
use crate::sections::SectionService;
use crate::shuffle::ShuffleEngine;

/// Assembles the quiz services over one store for one page lifecycle.
#[derive(Clone)]
pub struct QuizServices {
    catalog: Arc<QuizCatalog>,
    store: Arc<QuizStore>,
    sections: SectionService,
    history: Arc<AttemptHistoryService>,
    navigator: Arc<Navigator>,
}

impl QuizServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `QuizServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        catalog: QuizCatalog,
    ) -> Result<Self, QuizServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::with_storage(storage, clock, catalog).await)
    }

    /// Build services over a throwaway in-memory store.
    pub async fn in_memory(clock: Clock, catalog: QuizCatalog) -> Self {
        Self::with_storage(Storage::in_memory(), clock, catalog).await
    }

    /// Loads persisted progress from `storage` and wires the services.
    pub async fn with_storage(storage: Storage, clock: Clock, catalog: QuizCatalog) -> Self {
        let catalog = Arc::new(catalog);
        let store = Arc::new(QuizStore::open(Arc::clone(&storage.kv)).await);
        let sections = SectionService::new(
            clock,
            Arc::clone(&catalog),
            Arc::clone(&store),
            Arc::new(ShuffleEngine::new()),
        );
        let history = Arc::new(AttemptHistoryService::new(Arc::clone(&store)));
        let navigator = Arc::new(Navigator::new(sections.clone(), Arc::clone(&store)));

        Self {
            catalog,
            store,
            sections,
            history,
            navigator,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<QuizCatalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn store(&self) -> Arc<QuizStore> {
        Arc::clone(&self.store)
    }

    #[must_use]
    pub fn sections(&self) -> &SectionService {
        &self.sections
    }

    #[must_use]
    pub fn history(&self) -> Arc<AttemptHistoryService> {
        Arc::clone(&self.history)
    }

    #[must_use]
    pub fn navigator(&self) -> Arc<Navigator> {
        Arc::clone(&self.navigator)
    }
}
