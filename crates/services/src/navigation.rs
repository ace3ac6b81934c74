use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use quiz_core::model::{QuizCatalog, SectionId};
use storage::QuizStore;

use crate::error::QuizError;
use crate::sections::{SectionService, SectionView};

/// Where the learner is: the section menu or one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Menu,
    Section(SectionId),
}

impl Route {
    /// Parses a location fragment such as `#historia`.
    ///
    /// Empty fragments, `menu`, and ids missing from `catalog` route to the
    /// menu.
    #[must_use]
    pub fn from_fragment(fragment: &str, catalog: &QuizCatalog) -> Self {
        let raw = fragment.trim().trim_start_matches('#');
        if raw.is_empty() || raw == "menu" {
            return Self::Menu;
        }
        catalog
            .section(raw)
            .map_or(Self::Menu, |s| Self::Section(s.id().clone()))
    }

    #[must_use]
    pub fn fragment(&self) -> String {
        match self {
            Self::Menu => "#menu".to_owned(),
            Self::Section(id) => format!("#{id}"),
        }
    }
}

/// Outcome of leaving a section for the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuReturn {
    /// True when the section had been completed and its state was deleted.
    pub cleared: bool,
    /// Menu scroll offset saved when the section was opened.
    pub scroll_offset: Option<u32>,
}

/// Tracks the open section across one page lifecycle and keeps the menu
/// scroll position in the store.
pub struct Navigator {
    sections: SectionService,
    store: Arc<QuizStore>,
    current: Mutex<Option<SectionId>>,
}

impl Navigator {
    #[must_use]
    pub fn new(sections: SectionService, store: Arc<QuizStore>) -> Self {
        Self {
            sections,
            store,
            current: Mutex::new(None),
        }
    }

    fn current_guard(&self) -> MutexGuard<'_, Option<SectionId>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn current(&self) -> Route {
        self.current_guard()
            .clone()
            .map_or(Route::Menu, Route::Section)
    }

    /// Start of a page load: forgets the saved scroll position and opens
    /// the section named by `fragment`, if any.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` for storage failures.
    pub async fn page_loaded(&self, fragment: &str) -> Result<Option<SectionView>, QuizError> {
        if let Err(err) = self.store.clear_scroll_position().await {
            tracing::warn!(error = %err, "could not clear saved scroll position");
        }
        match Route::from_fragment(fragment, self.sections.catalog()) {
            Route::Menu => {
                *self.current_guard() = None;
                Ok(None)
            }
            Route::Section(id) => {
                let view = self.sections.render_section(id.as_str()).await?;
                *self.current_guard() = Some(id);
                Ok(Some(view))
            }
        }
    }

    /// Opens a section from the menu, remembering where the menu was
    /// scrolled to.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` for unknown sections or storage failures.
    pub async fn open_section(&self, id: &str, scroll_offset: u32) -> Result<SectionView, QuizError> {
        let view = self.sections.render_section(id).await?;
        self.store.save_scroll_position(scroll_offset).await?;
        *self.current_guard() = Some(view.id.clone());
        tracing::debug!(section = %view.id, scroll_offset, "section opened");
        Ok(view)
    }

    /// Leaves the current section. A completed section is reset so the
    /// next visit is a fresh attempt.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` for storage failures.
    pub async fn return_to_menu(&self) -> Result<MenuReturn, QuizError> {
        let left = self.current_guard().take();
        let cleared = match left {
            Some(id) => self.sections.clear_section_if_completed(id.as_str()).await?,
            None => false,
        };
        Ok(MenuReturn {
            cleared,
            scroll_offset: self.store.scroll_position().await,
        })
    }
}
