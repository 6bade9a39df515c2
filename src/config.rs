//! Scraper settings and source list loading.
//!
//! Settings come from an optional YAML file; every field has a default so an
//! empty file (or no file at all) yields the reference configuration of
//! 20 articles per source split 10/10 across regions.

use crate::error::ScrapeError;
use crate::models::SourceConfig;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    /// Articles kept per source.
    pub target_total: usize,
    /// Sources scraped at once.
    pub source_concurrency: usize,
    /// Article pages fetched at once within one source.
    pub candidate_concurrency: usize,
    /// Items taken from the head of a feed.
    pub feed_cap: usize,
    /// Candidates taken from a listing page.
    pub listing_cap: usize,
    /// Body text shorter than this triggers the secondary extraction pass.
    pub min_content_len: usize,
    /// Token overlap above which two titles are the same story.
    pub duplicate_overlap: f64,
    pub max_attempts: usize,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub backoff_jitter_ms: u64,
    /// Minimum and maximum gap between two requests to the same host.
    pub politeness_min_ms: u64,
    pub politeness_max_ms: u64,
    pub feed_timeout_secs: u64,
    pub listing_timeout_secs: u64,
    pub article_timeout_secs: u64,
    pub source_timeout_secs: u64,
    /// Append `[IMAGE: ..]`, `[VIDEO]` and `[EMBEDDED]` lines to article bodies.
    pub include_media_refs: bool,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            target_total: 20,
            source_concurrency: 3,
            candidate_concurrency: 4,
            feed_cap: 25,
            listing_cap: 40,
            min_content_len: 100,
            duplicate_overlap: 0.6,
            max_attempts: 3,
            backoff_base_ms: 500,
            backoff_max_ms: 8_000,
            backoff_jitter_ms: 250,
            politeness_min_ms: 500,
            politeness_max_ms: 2_000,
            feed_timeout_secs: 10,
            listing_timeout_secs: 15,
            article_timeout_secs: 20,
            source_timeout_secs: 180,
            include_media_refs: true,
        }
    }
}

impl ScraperSettings {
    /// Load settings from a YAML file, or defaults when `path` is `None`.
    #[instrument(level = "info")]
    pub fn load(path: Option<&str>) -> Result<Self, ScrapeError> {
        let Some(path) = path else {
            info!("No settings file given; using defaults");
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ScrapeError::Config(format!("reading {path}: {e}")))?;
        let settings = Self::from_yaml(&raw)?;
        info!(path, target_total = settings.target_total, "Loaded scraper settings");
        Ok(settings)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ScrapeError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Self =
            serde_yaml::from_str(raw).map_err(|e| ScrapeError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ScrapeError> {
        if self.target_total == 0 {
            return Err(ScrapeError::Config("target_total must be positive".into()));
        }
        if self.max_attempts == 0 {
            return Err(ScrapeError::Config("max_attempts must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.duplicate_overlap) {
            return Err(ScrapeError::Config(
                "duplicate_overlap must be within 0..=1".into(),
            ));
        }
        if self.politeness_min_ms > self.politeness_max_ms {
            return Err(ScrapeError::Config(
                "politeness_min_ms exceeds politeness_max_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }

    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout_secs)
    }

    pub fn article_timeout(&self) -> Duration {
        Duration::from_secs(self.article_timeout_secs)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }
}

/// Load a YAML list of sources.
#[instrument(level = "info")]
pub fn load_sources(path: &str) -> Result<Vec<SourceConfig>, ScrapeError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ScrapeError::Config(format!("reading {path}: {e}")))?;
    let sources: Vec<SourceConfig> =
        serde_yaml::from_str(&raw).map_err(|e| ScrapeError::Config(e.to_string()))?;
    info!(count = sources.len(), "Loaded sources");
    Ok(sources)
}

/// The outlets scraped when no source list is supplied.
pub fn default_sources() -> Vec<SourceConfig> {
    [
        ("BBC News", "https://www.bbc.com/news"),
        ("CNN", "https://edition.cnn.com"),
        ("The Guardian", "https://www.theguardian.com/international"),
        ("NPR News", "https://www.npr.org/sections/news"),
        ("Associated Press", "https://apnews.com"),
        ("TechCrunch", "https://techcrunch.com"),
        ("The Verge", "https://www.theverge.com"),
        ("Engadget", "https://www.engadget.com"),
        ("Ars Technica", "https://arstechnica.com"),
        ("WIRED", "https://www.wired.com"),
        ("Hacker News", "https://news.ycombinator.com"),
        ("India Today", "https://www.indiatoday.in"),
        ("NDTV", "https://www.ndtv.com"),
        ("Times of India", "https://timesofindia.indiatimes.com"),
        ("The Hindu", "https://www.thehindu.com"),
        ("Economic Times", "https://economictimes.indiatimes.com"),
        ("Bloomberg", "https://www.bloomberg.com"),
        ("Wall Street Journal", "https://www.wsj.com"),
        ("Forbes", "https://www.forbes.com"),
        ("Financial Times", "https://www.ft.com"),
    ]
    .into_iter()
    .map(|(name, url)| SourceConfig::new(name, url))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_configuration() {
        let s = ScraperSettings::default();
        assert_eq!(s.target_total, 20);
        assert_eq!(s.source_concurrency, 3);
        assert_eq!(s.max_attempts, 3);
        assert_eq!(s.feed_cap, 25);
        assert!((s.duplicate_overlap - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let s = ScraperSettings::from_yaml("target_total: 10\ninclude_media_refs: false\n").unwrap();
        assert_eq!(s.target_total, 10);
        assert!(!s.include_media_refs);
        assert_eq!(s.listing_cap, 40);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let s = ScraperSettings::from_yaml("  \n").unwrap();
        assert_eq!(s.target_total, 20);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        assert!(matches!(
            ScraperSettings::from_yaml("target_total: 0\n"),
            Err(ScrapeError::Config(_))
        ));
        assert!(matches!(
            ScraperSettings::from_yaml("duplicate_overlap: 1.5\n"),
            Err(ScrapeError::Config(_))
        ));
        assert!(matches!(
            ScraperSettings::from_yaml("politeness_min_ms: 900\npoliteness_max_ms: 100\n"),
            Err(ScrapeError::Config(_))
        ));
    }

    #[test]
    fn test_default_sources_are_unique_and_active() {
        let sources = default_sources();
        assert_eq!(sources.len(), 20);
        let mut names: Vec<_> = sources.iter().map(|s| s.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 20);
        assert!(sources.iter().all(|s| s.active));
    }
}
