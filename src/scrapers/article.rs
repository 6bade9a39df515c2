//! Article page extraction.
//!
//! An article page is reduced to body text plus metadata. Body text comes
//! from the first strategy that clears the content floor:
//!
//! 1. JSON-LD `articleBody`
//! 2. Paragraph-density scoring (the densest paragraph cluster wins)
//! 3. The outlet's own content selectors
//! 4. Generic article containers
//! 5. Every non-boilerplate paragraph on the page
//!
//! Extraction never fails: a page that cannot be fetched or parsed yields
//! [`ExtractedContent::default`], and the caller substitutes placeholders.

use super::media;
use super::sites::{self, SiteProfile};
use super::{clean_text, first_attr, in_noise, selector};
use crate::config::ScraperSettings;
use crate::error::ScrapeError;
use crate::fetcher::Fetcher;
use crate::models::ExtractedContent;
use crate::strategy::{Strategy, first_success};
use crate::utils::{excerpt_of, normalize_whitespace, strip_tags, truncate_for_log};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Paragraphs shorter than this are captions, bylines or UI labels.
const MIN_PARAGRAPH_CHARS: usize = 30;
/// Paragraphs shorter than this do not contribute to density scores.
const MIN_SCORED_PARAGRAPH_CHARS: usize = 25;
/// Boilerplate phrases only disqualify paragraphs up to this length.
const BOILERPLATE_MAX_CHARS: usize = 250;
const EXCERPT_CHARS: usize = 280;

const BOILERPLATE: &[&str] = &[
    "subscribe",
    "advertisement",
    "follow us",
    "sign up",
    "newsletter",
    "all rights reserved",
    "cookie",
    "click here",
    "read more",
    "download the app",
    "share this",
    "terms of use",
    "privacy policy",
    "also read",
];

const GENERIC_CONTAINERS: &[&str] = &[
    r#"[itemprop="articleBody"]"#,
    ".article-body",
    ".story-body",
    ".entry-content",
    ".post-content",
    "article",
    "main",
    r#"[role="main"]"#,
    "#main-content",
    ".main-content",
    "#content",
    ".content",
];

const ARTICLE_TYPES: &[&str] = &[
    "NewsArticle",
    "Article",
    "ReportageNewsArticle",
    "AnalysisNewsArticle",
    "Report",
    "BlogPosting",
    "LiveBlogPosting",
];

const LD_DATE_KEYS: &[&str] = &["datePublished", "dateCreated", "dateModified"];

const META_DATES: &[&str] = &[
    r#"meta[property="article:published_time"]"#,
    r#"meta[itemprop="datePublished"]"#,
    r#"meta[name="pubdate"]"#,
    r#"meta[name="publishdate"]"#,
    r#"meta[name="date"]"#,
    r#"meta[name="dc.date"]"#,
    r#"meta[property="og:updated_time"]"#,
    r#"meta[property="article:modified_time"]"#,
];

const META_AUTHORS: &[&str] = &[
    r#"meta[name="author"]"#,
    r#"meta[property="article:author"]"#,
    r#"meta[name="byl"]"#,
    r#"meta[name="parsely-author"]"#,
];

const BYLINE_SELECTORS: &[&str] = &[
    r#"[rel="author"]"#,
    r#"[itemprop="author"]"#,
    r#"[class*="byline"]"#,
    r#"[class*="author"]"#,
];

const META_DESCRIPTIONS: &[&str] = &[
    r#"meta[name="description"]"#,
    r#"meta[property="og:description"]"#,
    r#"meta[name="twitter:description"]"#,
];

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("static selector"));
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("static selector"));
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img").expect("static selector"));
static LD_JSON: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("static selector")
});
static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[.!?]["'”’)]?\s+"#).expect("static regex"));

/// A parsed article page and what the strategies need to read it.
pub struct Page<'a> {
    pub document: &'a Html,
    pub url: &'a Url,
    pub site: &'static SiteProfile,
    /// Flattened JSON-LD objects found on the page.
    pub ld: &'a [Value],
    pub min_content_len: usize,
}

impl Page<'_> {
    fn long_enough(&self, text: &str) -> bool {
        text.chars().count() >= self.min_content_len
    }
}

/// Body text plus the image found inside the winning container, if any.
#[derive(Debug, Clone, PartialEq)]
struct Body {
    text: String,
    top_image: Option<String>,
}

/// Fetches article pages and extracts their content.
#[derive(Debug, Clone, Copy)]
pub struct ArticleExtractor<'a> {
    fetcher: &'a Fetcher,
    timeout: Duration,
    min_content_len: usize,
    include_media_refs: bool,
}

impl<'a> ArticleExtractor<'a> {
    pub fn new(fetcher: &'a Fetcher, settings: &ScraperSettings) -> Self {
        Self {
            fetcher,
            timeout: settings.article_timeout(),
            min_content_len: settings.min_content_len,
            include_media_refs: settings.include_media_refs,
        }
    }

    /// Fetch `url` and extract its content. Never fails; every problem
    /// degrades to absent fields.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn extract_content(&self, url: &str) -> ExtractedContent {
        let page_url = match Url::parse(url) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => u,
            _ => {
                warn!("Not an absolute http(s) URL; skipping extraction");
                return ExtractedContent::default();
            }
        };

        let html = match self.fetcher.fetch_text(url, self.timeout).await {
            Ok(html) => html,
            Err(e) => {
                warn!(error = %e, "Article fetch failed");
                return ExtractedContent::default();
            }
        };

        let content = extract_from_html(
            &html,
            &page_url,
            self.min_content_len,
            self.include_media_refs,
        );
        info!(
            chars = content.full_content.as_deref().map_or(0, |t| t.chars().count()),
            has_author = content.author.is_some(),
            has_date = content.published_at.is_some(),
            "Extracted article"
        );
        content
    }
}

/// Extract content from an already-fetched article page.
///
/// `image_url` is always set: a content image when one is found, the
/// outlet's placeholder otherwise. `full_content` is absent unless some
/// strategy produced at least `min_content_len` characters.
pub fn extract_from_html(
    html: &str,
    page_url: &Url,
    min_content_len: usize,
    include_media_refs: bool,
) -> ExtractedContent {
    let document = Html::parse_document(html);
    let ld = ld_objects(&document);
    let page = Page {
        document: &document,
        url: page_url,
        site: sites::lookup(page_url),
        ld: &ld,
        min_content_len,
    };

    let (text, top_image) = match main_text(&page) {
        Ok(body) => (Some(body.text), body.top_image),
        Err(e) => {
            debug!(url = %page_url, error = %e, "No body text");
            (None, None)
        }
    };

    let excerpt = description(&page).or_else(|| text.as_deref().map(|t| excerpt_of(t, EXCERPT_CHARS)));
    let image_url = media::lead_image(&page, top_image);
    let full_content = text.map(|t| {
        if include_media_refs {
            media::append_media_refs(t, &media::media_refs(&page))
        } else {
            t
        }
    });

    ExtractedContent {
        full_content,
        excerpt,
        published_at: published_at(&page),
        image_url: Some(image_url),
        author: author(&page),
    }
}

fn main_text(page: &Page<'_>) -> Result<Body, ScrapeError> {
    let chain: &[Strategy<Page<'_>, Body>] = &[
        ("json_ld_body", ld_article_body),
        ("density", densest_cluster),
        ("site_selectors", site_containers),
        ("generic_containers", generic_containers),
        ("all_paragraphs", all_paragraphs),
    ];
    let (name, body) = first_success(chain, page).ok_or_else(|| {
        ScrapeError::Quality(format!("no strategy reached {} chars", page.min_content_len))
    })?;
    debug!(
        strategy = name,
        preview = %truncate_for_log(&body.text, 80),
        "Body text extracted"
    );
    Ok(body)
}

/* -------------------- BODY STRATEGIES -------------------- */

fn ld_article_body(page: &Page<'_>) -> Option<Body> {
    page.ld
        .iter()
        .filter(|v| is_article_type(v))
        .filter_map(|v| v.get("articleBody").and_then(Value::as_str))
        .map(strip_tags)
        .find(|text| page.long_enough(text))
        .map(|text| Body {
            text,
            top_image: None,
        })
}

/// Score each paragraph's parent (full weight) and grandparent (half
/// weight), discount by link density, and keep the paragraphs under the
/// best-scoring element.
fn densest_cluster(page: &Page<'_>) -> Option<Body> {
    let mut scores: Vec<(ElementRef<'_>, f64)> = Vec::new();
    for p in page.document.select(&PARAGRAPH).filter(|p| !in_noise(*p)) {
        let text = clean_text(p);
        let len = text.chars().count();
        if len < MIN_SCORED_PARAGRAPH_CHARS {
            continue;
        }
        let score = 1.0 + text.matches(',').count() as f64 + (len / 100).min(3) as f64;
        for (depth, ancestor) in p.ancestors().filter_map(ElementRef::wrap).take(2).enumerate() {
            let share = if depth == 0 { score } else { score / 2.0 };
            match scores.iter_mut().find(|(el, _)| *el == ancestor) {
                Some((_, total)) => *total += share,
                None => scores.push((ancestor, share)),
            }
        }
    }

    let mut best: Option<(ElementRef<'_>, f64)> = None;
    for (el, score) in scores {
        let adjusted = score * (1.0 - link_density(el));
        if best.is_none_or(|(_, b)| adjusted > b) {
            best = Some((el, adjusted));
        }
    }
    let (container, _) = best?;

    let paragraphs = container
        .select(&PARAGRAPH)
        .filter(|p| !in_noise(*p))
        .map(clean_text);
    let text = assemble(paragraphs).filter(|t| page.long_enough(t))?;
    let top_image = container
        .select(&IMAGE)
        .find_map(|img| media::plausible_image(img, page.url));
    Some(Body { text, top_image })
}

fn link_density(el: ElementRef<'_>) -> f64 {
    let total = clean_text(el).chars().count();
    if total == 0 {
        return 1.0;
    }
    let linked: usize = el
        .select(&ANCHOR)
        .map(|a| clean_text(a).chars().count())
        .sum();
    (linked as f64 / total as f64).min(1.0)
}

fn site_containers(page: &Page<'_>) -> Option<Body> {
    containers(page, page.site.content_selectors)
}

fn generic_containers(page: &Page<'_>) -> Option<Body> {
    containers(page, GENERIC_CONTAINERS)
}

/// First selector whose matches hold enough text. Paragraphs inside the
/// matches are preferred; containers without paragraphs use their full text.
fn containers(page: &Page<'_>, selectors: &[&str]) -> Option<Body> {
    selectors.iter().filter_map(|css| selector(css)).find_map(|sel| {
        let matches: Vec<ElementRef<'_>> = page
            .document
            .select(&sel)
            .filter(|el| !in_noise(*el))
            .collect();
        if matches.is_empty() {
            return None;
        }
        let paragraphs = matches
            .iter()
            .flat_map(|el| el.select(&PARAGRAPH))
            .filter(|p| !in_noise(*p))
            .map(clean_text);
        let text = assemble(paragraphs)
            .filter(|t| page.long_enough(t))
            .or_else(|| assemble(matches.iter().map(|el| clean_text(*el))))?;
        page.long_enough(&text).then_some(Body {
            text,
            top_image: None,
        })
    })
}

fn all_paragraphs(page: &Page<'_>) -> Option<Body> {
    let paragraphs = page
        .document
        .select(&PARAGRAPH)
        .filter(|p| !in_noise(*p))
        .map(clean_text);
    assemble(paragraphs)
        .filter(|t| page.long_enough(t))
        .map(|text| Body {
            text,
            top_image: None,
        })
}

/* -------------------- TEXT CLEANUP -------------------- */

fn is_boilerplate(paragraph: &str) -> bool {
    if paragraph.chars().count() > BOILERPLATE_MAX_CHARS {
        return false;
    }
    let lower = paragraph.to_lowercase();
    BOILERPLATE.iter().any(|phrase| lower.contains(phrase))
}

fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(text) {
        out.push(text[start..m.end()].trim());
        start = m.end();
    }
    out.push(text[start..].trim());
    out.retain(|s| !s.is_empty());
    out
}

/// Join paragraphs with blank lines, dropping short and boilerplate
/// paragraphs and any sentence already seen earlier on the page.
fn assemble(blocks: impl IntoIterator<Item = String>) -> Option<String> {
    let mut seen = HashSet::<String>::new();
    let mut paragraphs = Vec::<String>::new();
    for block in blocks {
        if block.chars().count() < MIN_PARAGRAPH_CHARS || is_boilerplate(&block) {
            continue;
        }
        let fresh: Vec<&str> = sentences(&block)
            .into_iter()
            .filter(|s| seen.insert(s.to_lowercase()))
            .collect();
        if !fresh.is_empty() {
            paragraphs.push(fresh.join(" "));
        }
    }
    (!paragraphs.is_empty()).then(|| paragraphs.join("\n\n"))
}

/* -------------------- JSON-LD -------------------- */

fn ld_objects(document: &Html) -> Vec<Value> {
    let mut out = Vec::new();
    for script in document.select(&LD_JSON) {
        let raw = script.text().collect::<String>();
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(v) => flatten_ld(v, &mut out),
            Err(e) => debug!(error = %e, "Skipping unparseable JSON-LD block"),
        }
    }
    out
}

fn flatten_ld(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|item| flatten_ld(item, out)),
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten_ld(graph, out);
            }
            out.push(Value::Object(map));
        }
        _ => {}
    }
}

/// Objects without `@type` are given the benefit of the doubt.
fn is_article_type(v: &Value) -> bool {
    match v.get("@type") {
        None => true,
        Some(Value::String(t)) => ARTICLE_TYPES.contains(&t.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| ARTICLE_TYPES.contains(&t)),
        Some(_) => false,
    }
}

/* -------------------- METADATA -------------------- */

fn published_at(page: &Page<'_>) -> Option<DateTime<FixedOffset>> {
    let chain: &[Strategy<Page<'_>, DateTime<FixedOffset>>] = &[
        ("json_ld_date", ld_published),
        ("meta_date", meta_published),
        ("time_element", time_published),
    ];
    first_success(chain, page).map(|(_, dt)| dt)
}

fn ld_published(page: &Page<'_>) -> Option<DateTime<FixedOffset>> {
    page.ld
        .iter()
        .filter(|v| is_article_type(v))
        .flat_map(|v| {
            LD_DATE_KEYS
                .iter()
                .filter_map(move |k| v.get(*k).and_then(Value::as_str))
        })
        .find_map(parse_date)
}

fn meta_published(page: &Page<'_>) -> Option<DateTime<FixedOffset>> {
    META_DATES
        .iter()
        .filter_map(|css| first_attr(page.document, css, "content"))
        .find_map(|raw| parse_date(&raw))
}

fn time_published(page: &Page<'_>) -> Option<DateTime<FixedOffset>> {
    let sel = selector("time[datetime]")?;
    page.document
        .select(&sel)
        .filter_map(|t| t.value().attr("datetime"))
        .find_map(parse_date)
}

/// Parse the date shapes seen in article metadata. Dates without an
/// offset are taken as UTC. Template placeholders such as `[date]` are
/// rejected.
pub fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = normalize_whitespace(raw);
    if raw.is_empty() || (raw.contains('[') && raw.contains(']')) {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(&raw) {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(&raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&raw, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

fn author(page: &Page<'_>) -> Option<String> {
    let chain: &[Strategy<Page<'_>, String>] = &[
        ("meta_author", meta_author),
        ("json_ld_author", ld_author),
        ("byline", byline_author),
    ];
    first_success(chain, page).map(|(_, a)| a)
}

fn meta_author(page: &Page<'_>) -> Option<String> {
    META_AUTHORS
        .iter()
        .filter_map(|css| first_attr(page.document, css, "content"))
        .find_map(|raw| clean_author(&raw))
}

fn ld_author(page: &Page<'_>) -> Option<String> {
    page.ld
        .iter()
        .filter(|v| is_article_type(v))
        .filter_map(|v| v.get("author"))
        .find_map(|author| {
            let names: Vec<&str> = match author {
                Value::String(name) => vec![name.as_str()],
                Value::Object(_) => author.get("name").and_then(Value::as_str).into_iter().collect(),
                Value::Array(items) => items
                    .iter()
                    .filter_map(|a| a.as_str().or_else(|| a.get("name").and_then(Value::as_str)))
                    .collect(),
                _ => Vec::new(),
            };
            clean_author(&names.join(", "))
        })
}

fn byline_author(page: &Page<'_>) -> Option<String> {
    BYLINE_SELECTORS
        .iter()
        .filter_map(|css| selector(css))
        .flat_map(|sel| page.document.select(&sel).map(clean_text).collect::<Vec<_>>())
        .find_map(|raw| clean_author(&raw))
}

/// Strip a leading "By", and refuse URLs and anything too long to be a name.
fn clean_author(raw: &str) -> Option<String> {
    let name = normalize_whitespace(raw);
    let name = if name.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("by ")) {
        name[3..].trim().to_string()
    } else {
        name
    };
    let lower = name.to_ascii_lowercase();
    if name.is_empty() || name.chars().count() > 80 || lower.starts_with("http") {
        return None;
    }
    Some(name)
}

fn description(page: &Page<'_>) -> Option<String> {
    META_DESCRIPTIONS
        .iter()
        .filter_map(|css| first_attr(page.document, css, "content"))
        .map(|raw| normalize_whitespace(&raw))
        .find(|d| !d.is_empty())
}
