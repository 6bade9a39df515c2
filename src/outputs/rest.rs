//! HTTP client for the storage backend.
//!
//! - `GET  {base}/api/sources`: configured sources
//! - `POST {base}/api/articles`: one article record
//! - `POST {base}/api/scraper/last-run`: cycle summary
//!
//! Requests carry `Authorization: Bearer {token}` when a token is set.

use super::ArticleSink;
use crate::error::ScrapeError;
use crate::models::{ArticleRecord, SourceConfig, SourceReport};
use chrono::Utc;
use reqwest::{Client, RequestBuilder};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, instrument};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl RestStore {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ScrapeError::Storage(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ScrapeError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| ScrapeError::Storage(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ScrapeError::HttpStatus(response.status().as_u16()));
        }
        Ok(response)
    }

    /// Sources configured in the backend, active or not.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::Storage`] when the backend is unreachable or returns a
    /// body that is not a source list.
    #[instrument(level = "info", skip_all, fields(base_url = %self.base_url))]
    pub async fn fetch_sources(&self) -> Result<Vec<SourceConfig>, ScrapeError> {
        let response = self
            .send(self.client.get(self.endpoint("/api/sources")))
            .await
            .map_err(|e| ScrapeError::Storage(format!("reading sources: {e}")))?;
        let sources: Vec<SourceConfig> = response
            .json()
            .await
            .map_err(|e| ScrapeError::Storage(format!("decoding sources: {e}")))?;
        info!(count = sources.len(), "Loaded sources from backend");
        Ok(sources)
    }
}

impl ArticleSink for RestStore {
    async fn save_article(&self, record: &ArticleRecord) -> Result<(), ScrapeError> {
        self.send(self.client.post(self.endpoint("/api/articles")).json(record))
            .await?;
        debug!(url = %record.original_url, "Saved article");
        Ok(())
    }

    #[instrument(level = "info", skip_all)]
    async fn complete_cycle(&self, reports: &[SourceReport]) -> Result<(), ScrapeError> {
        let selected: usize = reports.iter().map(|r| r.selected).sum();
        let body = json!({
            "lastRun": Utc::now(),
            "articles": selected,
            "sources": reports,
        });
        self.send(self.client.post(self.endpoint("/api/scraper/last-run")).json(&body))
            .await?;
        info!(selected, "Recorded scraper run");
        Ok(())
    }
}
