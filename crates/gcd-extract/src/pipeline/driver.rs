//! Batch extraction driver
//!
//! Reads the source in pages of `batch_size` rows, hands every row to an
//! [`Extractor`] and commits the resume cursor after each one. Rows are
//! processed strictly one at a time in id order; the cursor is only ever
//! advanced past a row whose writes have completed.

use std::time::{Duration, Instant};

use gcd_common::GcdError;
use thiserror::Error;
use tracing::{error, info};

use super::source::{RowSource, SourceRow};
use crate::extractor::{ExtractOutcome, Extractor};
use crate::progress::{format_duration, ProgressTracker};
use crate::repository::RepositoryError;

/// Errors that stop an extraction run
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Failed to count source rows")]
    Count(#[source] RepositoryError),

    #[error("Failed to fetch source page {page}")]
    Source {
        page: u64,
        #[source]
        source: RepositoryError,
    },

    #[error("Extraction failed at row {row_id}")]
    Row {
        row_id: i64,
        #[source]
        source: RepositoryError,
    },

    #[error("Failed to record progress")]
    Progress(#[from] GcdError),
}

impl DriverError {
    /// Id of the row that failed, when a row was at fault
    pub fn row_id(&self) -> Option<i64> {
        match self {
            DriverError::Row { row_id, .. } => Some(*row_id),
            _ => None,
        }
    }

    /// Whether a re-run can be expected to get past this failure
    pub fn is_retryable(&self) -> bool {
        match self {
            DriverError::Count(source)
            | DriverError::Source { source, .. }
            | DriverError::Row { source, .. } => source.is_retryable(),
            DriverError::Progress(_) => false,
        }
    }
}

/// Totals of one extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub rows_processed: u64,
    pub pages: u64,
    pub records_written: u64,
    pub rows_skipped: u64,
    pub unresolved_names: u64,
    /// Watermark the run started from
    pub started_after_id: i64,
    pub last_processed_id: Option<i64>,
    pub elapsed: Duration,
}

impl ExtractionSummary {
    fn record(&mut self, row_id: i64, outcome: &ExtractOutcome) {
        self.rows_processed += 1;
        self.records_written += outcome.records_written;
        self.unresolved_names += outcome.unresolved_names;
        if outcome.skipped {
            self.rows_skipped += 1;
        }
        self.last_processed_id = Some(row_id);
    }
}

/// Sequential, resumable page-by-page extraction
#[derive(Debug, Clone, Copy)]
pub struct BatchDriver {
    batch_size: i64,
    start_id: i64,
}

impl BatchDriver {
    pub fn new(batch_size: u32) -> Self {
        Self {
            batch_size: i64::from(batch_size.max(1)),
            start_id: 0,
        }
    }

    /// Watermark used when the tracker has no cursor yet
    pub fn with_start_id(mut self, start_id: i64) -> Self {
        self.start_id = start_id;
        self
    }

    pub fn batch_size(&self) -> i64 {
        self.batch_size
    }

    /// Run `extractor` over every source row after the resume point
    ///
    /// The watermark (`id > last_processed_id`) is read from `tracker` once;
    /// pages then advance by OFFSET over that fixed result set. A page with
    /// no rows ends the run; a short page does not. The first row error
    /// aborts the run, leaving the cursor on the last row that succeeded.
    pub async fn extract_and_insert<S, E>(
        &self,
        source: &S,
        extractor: &E,
        tracker: &mut ProgressTracker,
    ) -> Result<ExtractionSummary, DriverError>
    where
        S: RowSource,
        E: Extractor<Row = S::Row>,
    {
        let extraction_type = extractor.extraction_type();
        let started_after_id = tracker.get_last_processed_item_id(self.start_id);

        let remaining = source
            .count_after(started_after_id)
            .await
            .map_err(DriverError::Count)?;
        let total_items = tracker.num_completed() + u64::try_from(remaining).unwrap_or(0);

        info!(
            %extraction_type,
            started_after_id,
            remaining,
            total_items,
            batch_size = self.batch_size,
            "Starting extraction"
        );

        let run_started = Instant::now();
        let mut total_time = Duration::from_millis(tracker.total_time_millis());
        let mut summary = ExtractionSummary {
            started_after_id,
            ..Default::default()
        };
        let mut page: u64 = 0;

        loop {
            let offset = self.batch_size.saturating_mul(i64::try_from(page).unwrap_or(i64::MAX));
            let rows = source
                .fetch_page(started_after_id, self.batch_size, offset)
                .await
                .map_err(|source| DriverError::Source { page, source })?;

            if rows.is_empty() {
                break;
            }

            for row in &rows {
                let row_id = row.id();
                let row_started = Instant::now();

                let outcome = match extractor.extract(row).await {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        error!(
                            %extraction_type,
                            row_id,
                            retryable = err.is_retryable(),
                            error = %err,
                            "Row extraction failed, stopping"
                        );
                        return Err(DriverError::Row { row_id, source: err });
                    },
                };

                total_time = total_time.saturating_add(row_started.elapsed());
                let total_time_millis = u64::try_from(total_time.as_millis()).unwrap_or(u64::MAX);
                tracker.update_progress_info(row_id, total_time_millis)?;
                summary.record(row_id, &outcome);
            }

            summary.pages += 1;
            if let Some(progress) = tracker.progress_info() {
                info!(
                    %extraction_type,
                    page,
                    rows = rows.len() as u64,
                    last_processed_id = progress.last_processed_item_id,
                    completed = progress.num_completed,
                    total_items,
                    percent = %format!("{:.1}", progress.completion_percentage(total_items)),
                    eta = %format_duration(progress.estimate_remaining(total_items)),
                    "Page complete"
                );
            }
            page += 1;
        }

        summary.elapsed = run_started.elapsed();
        info!(
            %extraction_type,
            rows_processed = summary.rows_processed,
            pages = summary.pages,
            records_written = summary.records_written,
            rows_skipped = summary.rows_skipped,
            unresolved_names = summary.unresolved_names,
            elapsed = %format_duration(summary.elapsed),
            "Extraction complete"
        );

        Ok(summary)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::extractor::ExtractionKind;
    use crate::models::StoryCreditsRow;
    use crate::pipeline::MemoryRowSource;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records the ids it sees; fails on `fail_on`
    struct Recording {
        seen: Mutex<Vec<i64>>,
        fail_on: Option<i64>,
    }

    impl Recording {
        fn new(fail_on: Option<i64>) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                fail_on,
            }
        }

        fn seen(&self) -> Vec<i64> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Extractor for Recording {
        type Row = StoryCreditsRow;

        fn extraction_type(&self) -> ExtractionKind {
            ExtractionKind::Credit
        }

        async fn extract(&self, row: &StoryCreditsRow) -> Result<ExtractOutcome, RepositoryError> {
            if self.fail_on == Some(row.id) {
                return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
            }
            self.seen.lock().unwrap().push(row.id);
            Ok(ExtractOutcome {
                records_written: 1,
                ..Default::default()
            })
        }
    }

    fn source(ids: &[i64]) -> MemoryRowSource<StoryCreditsRow> {
        MemoryRowSource::new(
            ids.iter()
                .map(|&id| StoryCreditsRow {
                    id,
                    ..Default::default()
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_processes_all_pages_in_order() {
        let dir = TempDir::new().unwrap();
        let mut tracker = ProgressTracker::open(dir.path().join("p.json"), "Credit").unwrap();
        let extractor = Recording::new(None);

        let summary = BatchDriver::new(2)
            .extract_and_insert(&source(&[5, 1, 4, 2, 3]), &extractor, &mut tracker)
            .await
            .unwrap();

        assert_eq!(extractor.seen(), vec![1, 2, 3, 4, 5]);
        assert_eq!(summary.rows_processed, 5);
        assert_eq!(summary.pages, 3);
        assert_eq!(summary.records_written, 5);
        assert_eq!(summary.last_processed_id, Some(5));
        assert_eq!(tracker.get_last_processed_item_id(0), 5);
        assert_eq!(tracker.num_completed(), 5);
    }

    #[tokio::test]
    async fn test_start_id_applies_only_without_cursor() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("p.json");
        let extractor = Recording::new(None);

        let mut tracker = ProgressTracker::open(&path, "Credit").unwrap();
        BatchDriver::new(10)
            .with_start_id(2)
            .extract_and_insert(&source(&[1, 2, 3]), &extractor, &mut tracker)
            .await
            .unwrap();
        assert_eq!(extractor.seen(), vec![3]);

        let extractor = Recording::new(None);
        let mut tracker = ProgressTracker::open(&path, "Credit").unwrap();
        BatchDriver::new(10)
            .with_start_id(0)
            .extract_and_insert(&source(&[1, 2, 3, 4]), &extractor, &mut tracker)
            .await
            .unwrap();
        assert_eq!(extractor.seen(), vec![4]);
    }

    #[tokio::test]
    async fn test_row_error_stops_run() {
        let dir = TempDir::new().unwrap();
        let mut tracker = ProgressTracker::open(dir.path().join("p.json"), "Credit").unwrap();
        let extractor = Recording::new(Some(3));

        let err = BatchDriver::new(2)
            .extract_and_insert(&source(&[1, 2, 3, 4]), &extractor, &mut tracker)
            .await
            .unwrap_err();

        assert_eq!(err.row_id(), Some(3));
        assert!(err.is_retryable());
        assert_eq!(extractor.seen(), vec![1, 2]);
        assert_eq!(tracker.get_last_processed_item_id(0), 2);
    }

    #[tokio::test]
    async fn test_empty_source() {
        let dir = TempDir::new().unwrap();
        let mut tracker = ProgressTracker::open(dir.path().join("p.json"), "Credit").unwrap();

        let summary = BatchDriver::new(2)
            .extract_and_insert(&source(&[]), &Recording::new(None), &mut tracker)
            .await
            .unwrap();

        assert_eq!(summary.rows_processed, 0);
        assert_eq!(summary.pages, 0);
        assert_eq!(summary.last_processed_id, None);
        assert!(!dir.path().join("p.json").exists());
    }

    #[tokio::test]
    async fn test_run_survives_huge_saved_total_time() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("p.json");
        std::fs::write(
            &path,
            format!(
                r#"{{"Credit": {{"lastProcessedItemId": 1, "totalTimeMillis": {}, "numCompleted": 1}}}}"#,
                i64::MAX
            ),
        )
        .unwrap();
        let mut tracker = ProgressTracker::open(&path, "Credit").unwrap();
        let extractor = Recording::new(None);

        let summary = BatchDriver::new(1)
            .extract_and_insert(&source(&[1, 2, 3, 4]), &extractor, &mut tracker)
            .await
            .unwrap();

        assert_eq!(extractor.seen(), vec![2, 3, 4]);
        assert_eq!(summary.pages, 3);
        assert!(tracker.total_time_millis() >= i64::MAX as u64);
    }
}
