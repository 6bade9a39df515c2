//! Headline discovery on listing pages.
//!
//! No DOM schema is shared across outlets, so candidates are recovered by a
//! priority-ordered cascade of CSS selectors: the outlet's own selectors
//! first, then broad headline heuristics. Passes accumulate until `cap`
//! candidates are found.

use crate::models::Candidate;
use crate::utils::normalize_whitespace;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

/// Headline heuristics tried after the outlet's own selectors.
pub const GENERIC_SELECTORS: &[&str] = &[
    "h1 a[href]",
    "h2 a[href]",
    "h3 a[href]",
    "h1",
    "h2",
    "h3",
    r#"a[class*="headline"]"#,
    r#"[class*="headline"]"#,
    r#"a[class*="title"]"#,
    r#"[class*="title"]"#,
    r#"[class*="story"] a[href]"#,
    r#"[class*="story"]"#,
    "article h1",
    "article h2",
    "article h3",
];

/// Recover up to `cap` candidates from a listing page.
///
/// Relative links are resolved against `base_url`. Elements without a
/// resolvable http(s) link, titles below the title floor, and links already
/// seen on this page are skipped.
pub fn extract_candidates(
    html: &str,
    base_url: &Url,
    source_name: &str,
    site_selectors: &[&str],
    cap: usize,
) -> Vec<Candidate> {
    let document = Html::parse_document(html);
    let mut seen_links = HashSet::<String>::new();
    let mut out = Vec::<Candidate>::new();

    for css in site_selectors.iter().chain(GENERIC_SELECTORS) {
        if out.len() >= cap {
            break;
        }
        let Ok(selector) = Selector::parse(css) else {
            warn!(selector = css, "Unparseable listing selector; skipping");
            continue;
        };

        let before = out.len();
        for element in document.select(&selector) {
            if out.len() >= cap {
                break;
            }
            let Some(candidate) = candidate_from(element, base_url, source_name) else {
                continue;
            };
            if seen_links.insert(candidate.link.to_string()) {
                out.push(candidate);
            }
        }
        debug!(selector = css, added = out.len() - before, "Listing selector pass");
    }

    info!(source = source_name, count = out.len(), "Extracted listing candidates");
    out
}

fn candidate_from(element: ElementRef<'_>, base_url: &Url, source_name: &str) -> Option<Candidate> {
    let title = normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "));
    let href = link_href(element)?;
    let link = resolve_link(base_url, href)?;
    Candidate::new(&title, link, source_name)
}

/// The element's own href, else the first descendant anchor, else the
/// nearest enclosing anchor.
fn link_href(element: ElementRef<'_>) -> Option<&str> {
    if element.value().name() == "a" {
        if let Some(href) = element.value().attr("href") {
            return Some(href);
        }
    }
    if let Ok(anchor) = Selector::parse("a[href]") {
        if let Some(href) = element
            .select(&anchor)
            .next()
            .and_then(|a| a.value().attr("href"))
        {
            return Some(href);
        }
    }
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "a")
        .and_then(|a| a.value().attr("href"))
}

/// Resolve `href` against `base`, refusing fragments and pseudo-URLs.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    let lower = href.to_ascii_lowercase();
    if href.is_empty()
        || href.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }
    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://news.example.com/world/").unwrap()
    }

    const PAGE: &str = r#"
<html><body>
  <nav><a href="/">Home</a><a href="/sport">Sport</a></nav>
  <div class="promo">
    <h2 class="promo-headline"><a href="/world/election-results-2025">Election results spark celebrations across the capital</a></h2>
  </div>
  <a href="/tech/chip-shortage"><h3>Chip shortage eases as new factories come online</h3></a>
  <h2>A headline with no link anywhere around it at all</h2>
  <div class="story-card"><a href="https://other.example.org/markets?id=4#top">Markets close higher after a volatile trading week</a></div>
  <h2><a href="javascript:void(0)">Clicking this does nothing useful for readers</a></h2>
  <h3><a href="/world/election-results-2025">Election results spark celebrations across the capital</a></h3>
</body></html>"#;

    #[test]
    fn test_extracts_and_resolves_links() {
        let out = extract_candidates(PAGE, &base(), "Example", &[], 40);
        let links: Vec<_> = out.iter().map(|c| c.link.as_str()).collect();
        assert!(links.contains(&"https://news.example.com/world/election-results-2025"));
        assert!(links.contains(&"https://news.example.com/tech/chip-shortage"));
        assert!(links.contains(&"https://other.example.org/markets?id=4"));
        assert_eq!(out.len(), 3, "duplicates, javascript links and link-less headlines are dropped");
        assert!(out.iter().all(|c| c.source_name == "Example"));
    }

    #[test]
    fn test_short_navigation_titles_never_survive() {
        let out = extract_candidates(PAGE, &base(), "Example", &["nav a"], 40);
        assert!(out.iter().all(|c| c.title.chars().count() >= 20));
    }

    #[test]
    fn test_site_selectors_run_first() {
        let out = extract_candidates(PAGE, &base(), "Example", &[".story-card a"], 40);
        assert_eq!(out[0].link.as_str(), "https://other.example.org/markets?id=4");
    }

    #[test]
    fn test_cap_bounds_output() {
        let out = extract_candidates(PAGE, &base(), "Example", &[], 1);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_bad_site_selector_is_skipped() {
        let out = extract_candidates(PAGE, &base(), "Example", &["h2[[["], 40);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_resolve_link_rejects_pseudo_urls() {
        assert!(resolve_link(&base(), "#comments").is_none());
        assert!(resolve_link(&base(), "JavaScript:alert(1)").is_none());
        assert!(resolve_link(&base(), "mailto:desk@example.com").is_none());
        assert_eq!(
            resolve_link(&base(), "../india/story#x").unwrap().as_str(),
            "https://news.example.com/india/story"
        );
    }
}
