use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::SectionId;

/// One completed run through a section, as shown in the progress history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    section_id: SectionId,
    section_title: String,
    #[serde(rename = "iso")]
    completed_at: DateTime<Utc>,
    score: u32,
    total: u32,
}

impl AttemptRecord {
    #[must_use]
    pub fn new(
        section_id: SectionId,
        section_title: impl Into<String>,
        completed_at: DateTime<Utc>,
        score: u32,
        total: u32,
    ) -> Self {
        Self {
            section_id,
            section_title: section_title.into(),
            completed_at,
            score,
            total,
        }
    }

    #[must_use]
    pub fn section_id(&self) -> &SectionId {
        &self.section_id
    }

    #[must_use]
    pub fn section_title(&self) -> &str {
        &self.section_title
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Calendar date of completion as seen from `offset`.
    #[must_use]
    pub fn local_date(&self, offset: FixedOffset) -> NaiveDate {
        self.completed_at.with_timezone(&offset).date_naive()
    }
}
