//! JSON file sink.
//!
//! Records are buffered in memory and written in one file when the cycle
//! completes:
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     └── 061500.json   # {"scrapedAt", "articles": [..], "sources": [..]}
//! ```

use super::ArticleSink;
use crate::error::ScrapeError;
use crate::models::{ArticleRecord, SourceReport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::fs;
use tracing::{error, info, instrument};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CycleFile<'a> {
    scraped_at: DateTime<Utc>,
    articles: &'a [ArticleRecord],
    sources: &'a [SourceReport],
}

/// Buffers records and writes `{dir}/{YYYY-MM-DD}/{HHMMSS}.json`.
#[derive(Debug)]
pub struct JsonStore {
    json_output_dir: String,
    records: Mutex<Vec<ArticleRecord>>,
}

impl JsonStore {
    pub fn new(json_output_dir: &str) -> Self {
        Self {
            json_output_dir: json_output_dir.trim_end_matches('/').to_string(),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Path the cycle file is written to at `at`.
    pub fn path_for(&self, at: DateTime<Utc>) -> PathBuf {
        PathBuf::from(&self.json_output_dir)
            .join(at.format("%Y-%m-%d").to_string())
            .join(format!("{}.json", at.format("%H%M%S")))
    }

    fn take_records(&self) -> Vec<ArticleRecord> {
        match self.records.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl ArticleSink for JsonStore {
    async fn save_article(&self, record: &ArticleRecord) -> Result<(), ScrapeError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| ScrapeError::Storage("record buffer poisoned".into()))?;
        guard.push(record.clone());
        Ok(())
    }

    #[instrument(level = "info", skip_all, fields(json_output_dir = %self.json_output_dir))]
    async fn complete_cycle(&self, reports: &[SourceReport]) -> Result<(), ScrapeError> {
        let now = Utc::now();
        let records = self.take_records();
        let json = serde_json::to_string_pretty(&CycleFile {
            scraped_at: now,
            articles: &records,
            sources: reports,
        })
        .map_err(|e| ScrapeError::Storage(e.to_string()))?;

        let path = self.path_for(now);
        if let Some(dir) = path.parent() {
            info!(dir = %dir.display(), "Ensuring JSON directory exists");
            if let Err(e) = fs::create_dir_all(dir).await {
                error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
                return Err(ScrapeError::Storage(e.to_string()));
            }
        }

        info!(path = %path.display(), "Writing JSON");
        fs::write(&path, json)
            .await
            .map_err(|e| ScrapeError::Storage(e.to_string()))?;
        info!(path = %path.display(), articles = records.len(), "Wrote JSON batch file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::persist;
    use crate::outputs::tests::record;
    use chrono::TimeZone;

    #[test]
    fn test_path_is_dated() {
        let store = JsonStore::new("/data/out/");
        let at = Utc.with_ymd_and_hms(2025, 5, 6, 6, 15, 0).unwrap();
        assert_eq!(
            store.path_for(at),
            PathBuf::from("/data/out/2025-05-06/061500.json")
        );
    }

    #[tokio::test]
    async fn test_cycle_file_holds_records_and_reports() {
        let dir = std::env::temp_dir().join(format!("pulse_json_{}", std::process::id()));
        let store = JsonStore::new(dir.to_str().unwrap());
        let reports = vec![SourceReport {
            source: "NDTV".into(),
            selected: 1,
            shortfall: 19,
            ..SourceReport::default()
        }];

        persist(&store, &[record("Monsoon session of parliament begins")], &reports)
            .await
            .unwrap();

        let mut days = std::fs::read_dir(&dir).unwrap();
        let day = days.next().unwrap().unwrap().path();
        let file = std::fs::read_dir(day).unwrap().next().unwrap().unwrap().path();
        let v: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(file).unwrap()).unwrap();
        assert_eq!(v["articles"][0]["originalTitle"], "Monsoon session of parliament begins");
        assert_eq!(v["sources"][0]["source"], "NDTV");
        assert!(v["scrapedAt"].is_string());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
