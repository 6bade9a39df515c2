//! Data models for sources, candidates and classified articles.
//!
//! This module defines the records that flow through one scrape cycle:
//! - [`SourceConfig`]: one configured outlet
//! - [`Candidate`]: an unvalidated (title, link) pair from a feed or listing page
//! - [`ExtractedContent`]: what the article extractor recovered for one candidate
//! - [`ClassifiedArticle`]: candidate + content + derived category/region
//! - [`ScrapeBatch`] / [`SourceReport`]: the per-source result and its yield
//! - [`ArticleRecord`]: the camelCase record handed to the storage backend

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Titles shorter than this many characters are navigation or menu noise.
pub const MIN_TITLE_CHARS: usize = 20;

/// One configured news outlet.
///
/// `isActive` is accepted as an alias so records exported by the REST
/// backend can be loaded directly.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Display name, unique across the configuration.
    pub name: String,
    /// Listing page URL.
    pub url: String,
    #[serde(default = "default_active", alias = "isActive")]
    pub active: bool,
    /// Feed override; when absent the outlet table decides.
    #[serde(default, alias = "feedUrl", skip_serializing_if = "Option::is_none")]
    pub feed_url: Option<String>,
}

fn default_active() -> bool {
    true
}

impl SourceConfig {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            active: true,
            feed_url: None,
        }
    }
}

/// A (title, link) pair discovered on a listing page or in a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub title: String,
    pub link: Url,
    pub source_name: String,
    /// Publish time advertised by the feed, if any.
    pub published_hint: Option<DateTime<FixedOffset>>,
}

impl Candidate {
    /// Build a candidate, rejecting titles below [`MIN_TITLE_CHARS`] and
    /// links that are not http(s).
    ///
    /// This is the only constructor, so every candidate list in the crate
    /// honours the title floor.
    pub fn new(title: &str, link: Url, source_name: &str) -> Option<Self> {
        let title = crate::utils::normalize_whitespace(title);
        if title.chars().count() < MIN_TITLE_CHARS {
            return None;
        }
        if !matches!(link.scheme(), "http" | "https") {
            return None;
        }
        Some(Self {
            title,
            link,
            source_name: source_name.to_string(),
            published_hint: None,
        })
    }

    pub fn with_published_hint(mut self, published: Option<DateTime<FixedOffset>>) -> Self {
        self.published_hint = published;
        self
    }
}

/// Content recovered from one article page. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedContent {
    pub full_content: Option<String>,
    pub excerpt: Option<String>,
    pub published_at: Option<DateTime<FixedOffset>>,
    pub image_url: Option<String>,
    pub author: Option<String>,
}

impl ExtractedContent {
    pub fn is_empty(&self) -> bool {
        self.full_content.is_none()
            && self.excerpt.is_none()
            && self.published_at.is_none()
            && self.image_url.is_none()
            && self.author.is_none()
    }
}

/// Topic buckets. Declaration order is the tie-break and selection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Technology,
    Business,
    Politics,
    Sports,
    Science,
    Entertainment,
    General,
}

impl Category {
    /// Every category, in the fixed order the quota selector walks.
    pub const ALL: [Category; 7] = [
        Category::Technology,
        Category::Business,
        Category::Politics,
        Category::Sports,
        Category::Science,
        Category::Entertainment,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Technology => "technology",
            Category::Business => "business",
            Category::Politics => "politics",
            Category::Sports => "sports",
            Category::Science => "science",
            Category::Entertainment => "entertainment",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Indian,
    International,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Indian => "indian",
            Region::International => "international",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate with its content and derived labels. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedArticle {
    pub candidate: Candidate,
    pub content: ExtractedContent,
    pub category: Category,
    pub region: Region,
}

impl ClassifiedArticle {
    pub fn title(&self) -> &str {
        &self.candidate.title
    }

    pub fn source_name(&self) -> &str {
        &self.candidate.source_name
    }
}

/// The selected articles for one source, indian first then international.
#[derive(Debug, Clone, Default)]
pub struct ScrapeBatch {
    pub source_name: String,
    pub target: usize,
    pub articles: Vec<ClassifiedArticle>,
}

impl ScrapeBatch {
    pub fn count(&self, region: Region) -> usize {
        self.articles.iter().filter(|a| a.region == region).count()
    }

    /// How many articles short of the target this batch is.
    pub fn shortfall(&self) -> usize {
        self.target.saturating_sub(self.articles.len())
    }
}

/// Per-source yield, reported at the end of a cycle.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub source: String,
    pub candidates: usize,
    pub extracted: usize,
    pub selected: usize,
    pub indian: usize,
    pub international: usize,
    pub shortfall: usize,
    pub timed_out: bool,
}

/// Record handed to the storage backend.
///
/// Field names follow the backend's article schema.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    pub source_name: String,
    pub original_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rephrased_title: Option<String>,
    pub original_url: String,
    pub full_content: Option<String>,
    pub excerpt: Option<String>,
    /// ISO-8601, or absent.
    pub published_at: Option<String>,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub category: Category,
    pub region: Region,
    pub scraped_at: DateTime<Utc>,
}

impl From<&ClassifiedArticle> for ArticleRecord {
    fn from(article: &ClassifiedArticle) -> Self {
        Self {
            source_name: article.candidate.source_name.clone(),
            original_title: article.candidate.title.clone(),
            rephrased_title: None,
            original_url: article.candidate.link.to_string(),
            full_content: article.content.full_content.clone(),
            excerpt: article.content.excerpt.clone(),
            published_at: article.content.published_at.map(|d| d.to_rfc3339()),
            image_url: article.content.image_url.clone(),
            author: article.content.author.clone(),
            category: article.category,
            region: article.region,
            scraped_at: Utc::now(),
        }
    }
}
