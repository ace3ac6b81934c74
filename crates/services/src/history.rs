use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};

use quiz_core::model::AttemptRecord;
use storage::QuizStore;

use crate::error::QuizError;

/// Attempts completed on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptDay {
    pub date: NaiveDate,
    pub entries: Vec<AttemptRecord>,
}

/// Append-only log of completed attempts.
#[derive(Clone)]
pub struct AttemptHistoryService {
    store: Arc<QuizStore>,
}

impl AttemptHistoryService {
    #[must_use]
    pub fn new(store: Arc<QuizStore>) -> Self {
        Self { store }
    }

    /// Appends `entry` to the log.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Storage` if the log cannot be written.
    pub async fn record(&self, entry: AttemptRecord) -> Result<(), QuizError> {
        self.store.append_attempt(entry).await?;
        Ok(())
    }

    /// Every attempt in the order it was recorded.
    #[must_use]
    pub fn list(&self) -> Vec<AttemptRecord> {
        self.store.attempts()
    }

    /// Attempts grouped by calendar date as seen from `offset`.
    ///
    /// Most recent date first. Inside a date entries are ordered by section
    /// title, and repeated attempts at the same section newest first.
    #[must_use]
    pub fn grouped(&self, offset: FixedOffset) -> Vec<AttemptDay> {
        group_by_date(self.list(), offset)
    }
}

fn group_by_date(mut attempts: Vec<AttemptRecord>, offset: FixedOffset) -> Vec<AttemptDay> {
    attempts.sort_by(|a, b| {
        b.local_date(offset)
            .cmp(&a.local_date(offset))
            .then_with(|| a.section_title().cmp(b.section_title()))
            .then_with(|| b.completed_at().cmp(&a.completed_at()))
    });

    let mut days: Vec<AttemptDay> = Vec::new();
    for attempt in attempts {
        let date = attempt.local_date(offset);
        match days.last_mut() {
            Some(day) if day.date == date => day.entries.push(attempt),
            _ => days.push(AttemptDay {
                date,
                entries: vec![attempt],
            }),
        }
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::time::fixed_now;
    use storage::InMemoryRepository;

    fn attempt(section: &str, title: &str, hours: i64, score: u32) -> AttemptRecord {
        AttemptRecord::new(
            section.parse().unwrap(),
            title,
            fixed_now() + Duration::hours(hours),
            score,
            3,
        )
    }

    async fn service() -> AttemptHistoryService {
        let store = QuizStore::open(Arc::new(InMemoryRepository::new())).await;
        AttemptHistoryService::new(Arc::new(store))
    }

    #[tokio::test]
    async fn record_appends_in_order() {
        let history = service().await;
        assert!(history.list().is_empty());

        history.record(attempt("b", "Beta", 0, 1)).await.unwrap();
        history.record(attempt("a", "Alpha", 1, 2)).await.unwrap();

        let titles: Vec<_> = history
            .list()
            .iter()
            .map(|a| a.section_title().to_owned())
            .collect();
        assert_eq!(titles, ["Beta", "Alpha"]);
    }

    #[tokio::test]
    async fn groups_by_date_newest_first_and_titles_ascending() {
        let history = service().await;
        // fixed_now() is 22:13 UTC, so +2h lands on the next day.
        history.record(attempt("z", "Zoology", -2, 1)).await.unwrap();
        history.record(attempt("a", "Algebra", -1, 2)).await.unwrap();
        history.record(attempt("m", "Music", 2, 3)).await.unwrap();

        let days = history.grouped(FixedOffset::east_opt(0).unwrap());
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2023, 11, 15).unwrap());
        assert_eq!(days[0].entries.len(), 1);

        assert_eq!(days[1].date, NaiveDate::from_ymd_opt(2023, 11, 14).unwrap());
        let titles: Vec<_> = days[1].entries.iter().map(|a| a.section_title()).collect();
        assert_eq!(titles, ["Algebra", "Zoology"]);
    }

    #[tokio::test]
    async fn repeated_attempts_at_one_section_are_newest_first() {
        let history = service().await;
        history.record(attempt("a", "Algebra", -3, 1)).await.unwrap();
        history.record(attempt("a", "Algebra", -1, 3)).await.unwrap();

        let days = history.grouped(FixedOffset::east_opt(0).unwrap());
        let scores: Vec<_> = days[0].entries.iter().map(AttemptRecord::score).collect();
        assert_eq!(scores, [3, 1]);
    }

    #[tokio::test]
    async fn offset_decides_the_calendar_date() {
        let history = service().await;
        history.record(attempt("a", "Algebra", 0, 1)).await.unwrap();

        let utc = history.grouped(FixedOffset::east_opt(0).unwrap());
        let plus_three = history.grouped(FixedOffset::east_opt(3 * 3600).unwrap());
        assert_eq!(utc[0].date, NaiveDate::from_ymd_opt(2023, 11, 14).unwrap());
        assert_eq!(plus_three[0].date, NaiveDate::from_ymd_opt(2023, 11, 15).unwrap());
    }
}
