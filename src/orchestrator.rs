//! One scrape cycle across every configured source.
//!
//! ## Per-source pipeline
//!
//! 1. **Discover**: feed first (from the source config or the outlet table),
//!    then the listing page when the feed is missing, broken or thin
//! 2. **Dedupe** within the source
//! 3. **Extract** each candidate's article page (bounded concurrency)
//! 4. **Fill** missing content, excerpt and image with placeholders
//! 5. **Classify** category and region
//! 6. **Select** a balanced batch from stories no other source has claimed
//!
//! Sources run concurrently up to `source_concurrency`, each under a hard
//! timeout. A source that fails or times out yields an empty batch and a
//! report saying so; it never aborts the cycle.

use crate::classify::Classifier;
use crate::config::ScraperSettings;
use crate::dedupe::{Deduplicator, SeenTitles};
use crate::error::ScrapeError;
use crate::fetcher::Fetcher;
use crate::models::{
    Candidate, ClassifiedArticle, ExtractedContent, Region, ScrapeBatch, SourceConfig, SourceReport,
};
use crate::scrapers::article::ArticleExtractor;
use crate::scrapers::sites::{self, SiteProfile};
use crate::scrapers::{feed, listing};
use crate::select::select;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Everything a cycle produced, in source configuration order.
#[derive(Debug, Default)]
pub struct CycleOutcome {
    pub batches: Vec<ScrapeBatch>,
    pub reports: Vec<SourceReport>,
}

impl CycleOutcome {
    pub fn articles(&self) -> impl Iterator<Item = &ClassifiedArticle> {
        self.batches.iter().flat_map(|b| b.articles.iter())
    }
}

/// Content quality counters over a cycle's selected articles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub total: usize,
    pub with_full_content: usize,
    pub with_media_refs: usize,
    pub with_real_image: usize,
    pub with_author: usize,
}

impl QualityReport {
    pub fn tally<'a>(articles: impl IntoIterator<Item = &'a ClassifiedArticle>, min_content_len: usize) -> Self {
        let mut report = Self::default();
        for article in articles {
            let content = &article.content;
            let text = content.full_content.as_deref().unwrap_or_default();
            report.total += 1;
            if text.chars().count() > min_content_len && !text.starts_with(PLACEHOLDER_MARK) {
                report.with_full_content += 1;
            }
            if ["[IMAGE", "[VIDEO]", "[EMBEDDED]"].iter().any(|m| text.contains(m)) {
                report.with_media_refs += 1;
            }
            if content
                .image_url
                .as_deref()
                .is_some_and(|u| !u.starts_with(sites::PLACEHOLDER_HOST))
            {
                report.with_real_image += 1;
            }
            if content.author.is_some() {
                report.with_author += 1;
            }
        }
        report
    }
}

/// Prefix of synthesized article bodies.
const PLACEHOLDER_MARK: &str = "[SUMMARY]";

/// Runs scrape cycles. Holds the process-wide seen-titles set, so one
/// orchestrator never selects the same story for two sources.
pub struct Orchestrator<'a> {
    fetcher: &'a Fetcher,
    classifier: &'a Classifier,
    settings: &'a ScraperSettings,
    seen: SeenTitles,
}

impl<'a> Orchestrator<'a> {
    pub fn new(fetcher: &'a Fetcher, classifier: &'a Classifier, settings: &'a ScraperSettings) -> Self {
        Self {
            fetcher,
            classifier,
            settings,
            seen: SeenTitles::new(settings.duplicate_overlap),
        }
    }

    /// Scrape every active source.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::Config`] when no source is active. Source-level
    /// failures are reported per source, never returned.
    #[instrument(level = "info", skip_all, fields(sources = sources.len()))]
    pub async fn run_cycle(&self, sources: &[SourceConfig]) -> Result<CycleOutcome, ScrapeError> {
        let active: Vec<(usize, &SourceConfig)> = sources.iter().filter(|s| s.active).enumerate().collect();
        if active.is_empty() {
            return Err(ScrapeError::Config("no active sources configured".into()));
        }
        info!(
            active = active.len(),
            concurrency = self.settings.source_concurrency,
            "Starting scrape cycle"
        );

        let mut results: Vec<(usize, ScrapeBatch, SourceReport)> = stream::iter(active)
            .map(|(idx, source)| async move {
                let (batch, report) = self.run_source_bounded(source).await;
                (idx, batch, report)
            })
            .buffer_unordered(self.settings.source_concurrency.max(1))
            .collect()
            .await;
        results.sort_by_key(|(idx, _, _)| *idx);

        let (batches, reports): (Vec<_>, Vec<_>) = results.into_iter().map(|(_, b, r)| (b, r)).unzip();
        let outcome = CycleOutcome { batches, reports };
        info!(
            selected = outcome.articles().count(),
            claimed = self.seen.claimed(),
            "Scrape cycle complete"
        );
        Ok(outcome)
    }

    async fn run_source_bounded(&self, source: &SourceConfig) -> (ScrapeBatch, SourceReport) {
        match timeout(self.settings.source_timeout(), self.run_source(source)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    source = %source.name,
                    timeout_secs = self.settings.source_timeout_secs,
                    "Source timed out; abandoning it for this cycle"
                );
                let (batch, mut report) = self.empty(source);
                report.timed_out = true;
                (batch, report)
            }
        }
    }

    fn empty(&self, source: &SourceConfig) -> (ScrapeBatch, SourceReport) {
        let target = self.settings.target_total;
        (
            ScrapeBatch {
                source_name: source.name.clone(),
                target,
                articles: Vec::new(),
            },
            SourceReport {
                source: source.name.clone(),
                shortfall: target,
                ..SourceReport::default()
            },
        )
    }

    /// Run the full pipeline for one source.
    #[instrument(level = "info", skip_all, fields(source = %source.name))]
    pub async fn run_source(&self, source: &SourceConfig) -> (ScrapeBatch, SourceReport) {
        let base_url = match Url::parse(&source.url) {
            Ok(u) => u,
            Err(e) => {
                warn!(url = %source.url, error = %e, "Source URL does not parse; skipping");
                return self.empty(source);
            }
        };
        let site = sites::lookup(&base_url);

        let discovered = self.discover(source, &base_url, site).await;
        let candidates = Deduplicator::new(self.settings.duplicate_overlap).dedupe(discovered);
        let candidate_count = candidates.len();
        if candidates.is_empty() {
            warn!("No candidates from feed or listing page");
            return self.empty(source);
        }

        let extractor = ArticleExtractor::new(self.fetcher, self.settings);
        let extracted: Vec<(Candidate, ExtractedContent)> = stream::iter(candidates)
            .map(|candidate| async move {
                let content = extractor.extract_content(candidate.link.as_str()).await;
                (candidate, content)
            })
            .buffered(self.settings.candidate_concurrency.max(1))
            .collect()
            .await;
        let extracted_count = extracted
            .iter()
            .filter(|(_, content)| content.full_content.is_some())
            .count();

        let pool: Vec<ClassifiedArticle> = extracted
            .into_iter()
            .map(|(candidate, content)| self.finish(candidate, content))
            .collect();

        let target = self.settings.target_total;
        let articles = self
            .seen
            .select_unclaimed(pool, |fresh| select(fresh, target, &source.name).articles);
        let batch = ScrapeBatch {
            source_name: source.name.clone(),
            target,
            articles,
        };

        let report = SourceReport {
            source: source.name.clone(),
            candidates: candidate_count,
            extracted: extracted_count,
            selected: batch.articles.len(),
            indian: batch.count(Region::Indian),
            international: batch.count(Region::International),
            shortfall: batch.shortfall(),
            timed_out: false,
        };
        info!(
            candidates = report.candidates,
            extracted = report.extracted,
            selected = report.selected,
            shortfall = report.shortfall,
            "Source done"
        );
        (batch, report)
    }

    /// Feed candidates first; listing-page candidates when the feed gave
    /// fewer than the target. Links are unique in the result.
    async fn discover(&self, source: &SourceConfig, base_url: &Url, site: &SiteProfile) -> Vec<Candidate> {
        let target = self.settings.target_total;
        let mut candidates = Vec::<Candidate>::new();

        if let Some(feed_url) = source.feed_url.as_deref().or(site.feed_url) {
            match self.fetcher.fetch(feed_url, self.settings.feed_timeout()).await {
                Ok(bytes) => {
                    candidates.extend(feed::parse_feed(&bytes, &source.name, self.settings.feed_cap));
                    info!(feed = feed_url, count = candidates.len(), "Feed candidates");
                }
                Err(e) => warn!(feed = feed_url, error = %e, "Feed fetch failed; falling back to listing page"),
            }
        }

        if candidates.len() < target {
            match self
                .fetcher
                .fetch_text(&source.url, self.settings.listing_timeout())
                .await
            {
                Ok(html) => candidates.extend(listing::extract_candidates(
                    &html,
                    base_url,
                    &source.name,
                    site.listing_selectors,
                    self.settings.listing_cap,
                )),
                Err(e) => warn!(url = %source.url, error = %e, "Listing page fetch failed"),
            }
        }

        candidates
            .into_iter()
            .unique_by(|c| c.link.clone())
            .collect()
    }

    fn finish(&self, candidate: Candidate, content: ExtractedContent) -> ClassifiedArticle {
        if content.is_empty() {
            debug!(url = %candidate.link, "Nothing extracted; using placeholders");
        }
        // Labels come from what the page said, never from placeholder text.
        let (category, region) = self.classifier.classify(
            &candidate.title,
            content.full_content.as_deref().unwrap_or_default(),
            &candidate.source_name,
        );
        let content = with_placeholders(&candidate, content);
        ClassifiedArticle {
            candidate,
            content,
            category,
            region,
        }
    }
}

/// Guarantee non-empty content, excerpt and image, and fall back to the
/// feed's publish time.
pub fn with_placeholders(candidate: &Candidate, mut content: ExtractedContent) -> ExtractedContent {
    if content
        .full_content
        .as_deref()
        .is_none_or(|t| t.trim().is_empty())
    {
        content.full_content = Some(format!(
            "{PLACEHOLDER_MARK} {}\n\nRead the full story at {}.",
            candidate.title, candidate.source_name
        ));
    }
    if content.excerpt.as_deref().is_none_or(str::is_empty) {
        content.excerpt = Some(candidate.title.clone());
    }
    if content.image_url.as_deref().is_none_or(str::is_empty) {
        content.image_url = Some(sites::placeholder_image(&candidate.link));
    }
    if content.published_at.is_none() {
        content.published_at = candidate.published_hint;
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::test_settings;
    use crate::models::Category;
    use std::time::Duration;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const EMPTY_FEED: &str =
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Empty</title></channel></rss>"#;

    const HEADLINES: [&str; 5] = [
        "Monsoon arrives early across southern coastal states",
        "Parliament debates new data protection framework bill",
        "Chipmaker unveils faster processors for thin laptops",
        "Cricket board announces squad for upcoming away tour",
        "Astronomers detect water vapour on a distant planet",
    ];

    fn listing_page() -> String {
        let items: String = HEADLINES
            .iter()
            .enumerate()
            .map(|(i, h)| format!(r#"<h2><a href="/story/{i}">{h}</a></h2>"#))
            .collect();
        format!("<html><body><nav><a href='/'>Home</a></nav>{items}</body></html>")
    }

    async fn outlet(server: &MockServer, listing: &str) {
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_FEED))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(listing))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_page()))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/story/\d+$"))
            .respond_with(ResponseTemplate::new(500))
            .mount(server)
            .await;
    }

    fn source(server: &MockServer, name: &str, listing: &str) -> SourceConfig {
        SourceConfig {
            name: name.to_string(),
            url: format!("{}{}", server.uri(), listing),
            active: true,
            feed_url: Some(format!("{}/feed.xml", server.uri())),
        }
    }

    #[tokio::test]
    async fn test_empty_feed_falls_back_to_listing_with_placeholders() {
        let server = MockServer::start().await;
        outlet(&server, "/news").await;

        let settings = test_settings();
        let fetcher = Fetcher::new(&settings).unwrap();
        let classifier = Classifier::default();
        let orchestrator = Orchestrator::new(&fetcher, &classifier, &settings);

        let outcome = orchestrator
            .run_cycle(&[source(&server, "Test Outlet", "/news")])
            .await
            .unwrap();

        let batch = &outcome.batches[0];
        assert!(batch.articles.len() <= 5);
        assert_eq!(batch.articles.len(), 5);
        for article in &batch.articles {
            let text = article.content.full_content.as_deref().unwrap();
            assert!(!text.is_empty());
            assert!(text.contains(article.title()));
            assert!(article.content.image_url.as_deref().is_some_and(|u| !u.is_empty()));
        }

        let report = &outcome.reports[0];
        assert_eq!(report.candidates, 5);
        assert_eq!(report.extracted, 0);
        assert_eq!(report.selected, 5);
        assert_eq!(report.shortfall, 15);
        assert!(!report.timed_out);

        let quality = QualityReport::tally(outcome.articles(), settings.min_content_len);
        assert_eq!(quality.total, 5);
        assert_eq!(quality.with_full_content, 0);
        assert_eq!(quality.with_real_image, 0);
    }

    #[tokio::test]
    async fn test_same_story_is_not_selected_twice_across_sources() {
        let server = MockServer::start().await;
        outlet(&server, "/a").await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_page()))
            .mount(&server)
            .await;

        let settings = test_settings();
        let fetcher = Fetcher::new(&settings).unwrap();
        let classifier = Classifier::default();
        let orchestrator = Orchestrator::new(&fetcher, &classifier, &settings);

        let outcome = orchestrator
            .run_cycle(&[source(&server, "Outlet A", "/a"), source(&server, "Outlet B", "/b")])
            .await
            .unwrap();

        assert_eq!(outcome.batches.len(), 2);
        assert_eq!(outcome.batches[0].source_name, "Outlet A");
        assert_eq!(outcome.articles().count(), 5);
    }

    #[tokio::test]
    async fn test_no_active_sources_is_a_config_error() {
        let settings = test_settings();
        let fetcher = Fetcher::new(&settings).unwrap();
        let classifier = Classifier::default();
        let orchestrator = Orchestrator::new(&fetcher, &classifier, &settings);

        let mut inactive = SourceConfig::new("Off", "https://example.com");
        inactive.active = false;
        assert!(matches!(
            orchestrator.run_cycle(&[]).await,
            Err(ScrapeError::Config(_))
        ));
        assert!(matches!(
            orchestrator.run_cycle(&[inactive]).await,
            Err(ScrapeError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_slow_source_times_out_with_empty_batch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(listing_page())
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let settings = ScraperSettings {
            source_timeout_secs: 1,
            ..test_settings()
        };
        let fetcher = Fetcher::new(&settings).unwrap();
        let classifier = Classifier::default();
        let orchestrator = Orchestrator::new(&fetcher, &classifier, &settings);

        let slow = SourceConfig::new("Slow Outlet", &format!("{}/slow", server.uri()));
        let outcome = orchestrator.run_cycle(&[slow]).await.unwrap();
        assert!(outcome.batches[0].articles.is_empty());
        assert!(outcome.reports[0].timed_out);
        assert_eq!(outcome.reports[0].shortfall, 20);
    }

    #[tokio::test]
    async fn test_unreachable_source_yields_empty_batch() {
        let settings = test_settings();
        let fetcher = Fetcher::new(&settings).unwrap();
        let classifier = Classifier::default();
        let orchestrator = Orchestrator::new(&fetcher, &classifier, &settings);

        let broken = SourceConfig::new("Broken", "not a url");
        let outcome = orchestrator.run_cycle(&[broken]).await.unwrap();
        assert!(outcome.batches[0].articles.is_empty());
        assert_eq!(outcome.reports[0].candidates, 0);
    }

    #[test]
    fn test_link_words_do_not_sway_labels_of_placeholder_articles() {
        let settings = test_settings();
        let fetcher = Fetcher::new(&settings).unwrap();
        let classifier = Classifier::default();
        let orchestrator = Orchestrator::new(&fetcher, &classifier, &settings);
        let title = "Residents gather for annual town celebration downtown";

        for link in [
            "https://www.example.org/business/markets/story-1",
            "https://www.example.org/world/goa-trip?ref=ipl",
        ] {
            let candidate = Candidate::new(title, Url::parse(link).unwrap(), "Wire Desk").unwrap();
            let article = orchestrator.finish(candidate, ExtractedContent::default());
            assert_eq!(article.category, Category::General, "{link}");
            assert_eq!(article.region, Region::International, "{link}");
            let body = article.content.full_content.as_deref().unwrap();
            assert!(body.starts_with(PLACEHOLDER_MARK));
            assert!(!body.contains(link));
        }
    }

    #[test]
    fn test_placeholders_fill_only_missing_fields() {
        let candidate = Candidate::new(
            "Monsoon arrives early across southern coastal states",
            Url::parse("https://www.ndtv.com/india-news/monsoon").unwrap(),
            "NDTV",
        )
        .unwrap()
        .with_published_hint(chrono::DateTime::parse_from_rfc3339("2025-07-01T10:00:00+05:30").ok());

        let filled = with_placeholders(&candidate, ExtractedContent::default());
        assert!(filled.full_content.as_deref().unwrap().contains("Monsoon arrives early"));
        assert_eq!(filled.excerpt.as_deref(), Some(candidate.title.as_str()));
        assert!(filled.image_url.as_deref().unwrap().contains("d71920"));
        assert_eq!(filled.published_at, candidate.published_hint);

        let real = ExtractedContent {
            full_content: Some("Real body".into()),
            image_url: Some("https://cdn.example.com/a.jpg".into()),
            ..Default::default()
        };
        let kept = with_placeholders(&candidate, real);
        assert_eq!(kept.full_content.as_deref(), Some("Real body"));
        assert_eq!(kept.image_url.as_deref(), Some("https://cdn.example.com/a.jpg"));
    }
}
