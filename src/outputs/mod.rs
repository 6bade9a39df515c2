//! Storage sinks for a finished scrape cycle.
//!
//! # Submodules
//!
//! - [`json`]: Writes the cycle's records and reports to a dated JSON file
//! - [`rest`]: Posts records to the storage backend's HTTP API
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── 061500.json
//!     └── 181500.json
//!
//! POST {api_base_url}/api/articles          # one per record
//! POST {api_base_url}/api/scraper/last-run  # once per cycle
//! ```
//!
//! A failed save is counted and logged; it never aborts the rest of the
//! batch.

pub mod json;
pub mod rest;

use crate::error::ScrapeError;
use crate::models::{ArticleRecord, SourceReport};
use tracing::{error, info, instrument, warn};

/// A storage collaborator that accepts article records.
pub trait ArticleSink {
    /// Persist one record.
    async fn save_article(&self, record: &ArticleRecord) -> Result<(), ScrapeError>;

    /// Called once after every record of a cycle has been offered.
    async fn complete_cycle(&self, reports: &[SourceReport]) -> Result<(), ScrapeError>;
}

/// The sink chosen at startup.
#[derive(Debug)]
pub enum Sink {
    Json(json::JsonStore),
    Rest(rest::RestStore),
}

impl ArticleSink for Sink {
    async fn save_article(&self, record: &ArticleRecord) -> Result<(), ScrapeError> {
        match self {
            Sink::Json(s) => s.save_article(record).await,
            Sink::Rest(s) => s.save_article(record).await,
        }
    }

    async fn complete_cycle(&self, reports: &[SourceReport]) -> Result<(), ScrapeError> {
        match self {
            Sink::Json(s) => s.complete_cycle(reports).await,
            Sink::Rest(s) => s.complete_cycle(reports).await,
        }
    }
}

/// Hand every record to `sink`, then close the cycle.
///
/// Returns `(saved, failed)`. Per-record failures are tolerated; only a
/// failure to close the cycle is returned.
#[instrument(level = "info", skip_all, fields(records = records.len()))]
pub async fn persist<S: ArticleSink>(
    sink: &S,
    records: &[ArticleRecord],
    reports: &[SourceReport],
) -> Result<(usize, usize), ScrapeError> {
    let mut saved = 0usize;
    let mut failed = 0usize;
    for record in records {
        match sink.save_article(record).await {
            Ok(()) => saved += 1,
            Err(e) => {
                failed += 1;
                warn!(
                    source = %record.source_name,
                    url = %record.original_url,
                    error = %e,
                    "Failed to save article; continuing"
                );
            }
        }
    }

    if let Err(e) = sink.complete_cycle(reports).await {
        error!(error = %e, "Failed to close scrape cycle");
        return Err(e);
    }
    info!(saved, failed, "Persisted scrape cycle");
    Ok((saved, failed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Region};
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Flaky {
        saved: Mutex<Vec<String>>,
        closed: Mutex<bool>,
    }

    impl ArticleSink for Flaky {
        async fn save_article(&self, record: &ArticleRecord) -> Result<(), ScrapeError> {
            if record.original_title.contains("reject") {
                return Err(ScrapeError::Storage("rejected".into()));
            }
            self.saved.lock().unwrap().push(record.original_title.clone());
            Ok(())
        }

        async fn complete_cycle(&self, _reports: &[SourceReport]) -> Result<(), ScrapeError> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    pub(crate) fn record(title: &str) -> ArticleRecord {
        ArticleRecord {
            source_name: "NDTV".into(),
            original_title: title.into(),
            rephrased_title: None,
            original_url: "https://www.ndtv.com/india-news/a".into(),
            full_content: Some("Body".into()),
            excerpt: Some("Body".into()),
            published_at: None,
            image_url: Some("https://placehold.co/x".into()),
            author: None,
            category: Category::Politics,
            region: Region::Indian,
            scraped_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_persist_counts_failures_without_aborting() {
        let sink = Flaky::default();
        let records = vec![
            record("Monsoon session of parliament begins"),
            record("Backend will reject this particular story"),
            record("Election commission announces poll dates"),
        ];
        let (saved, failed) = persist(&sink, &records, &[]).await.unwrap();
        assert_eq!((saved, failed), (2, 1));
        assert_eq!(sink.saved.lock().unwrap().len(), 2);
        assert!(*sink.closed.lock().unwrap());
    }
}
