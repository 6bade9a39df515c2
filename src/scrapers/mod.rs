//! Candidate discovery and article extraction.
//!
//! Discovery follows a two-path pattern per outlet:
//!
//! 1. **Feed**: when the outlet table (or the source config) names a feed,
//!    its items become candidates ([`feed`]).
//! 2. **Listing page**: when the feed is missing, broken or thin, headline
//!    heuristics run over the outlet's listing page ([`listing`]).
//!
//! Each candidate's article page is then fetched and reduced to text and
//! metadata ([`article`]), with image and inline media handling in [`media`].
//!
//! # Common Patterns
//!
//! - Outlet quirks live in the [`sites`] table, never in code branches
//! - Fallback chains are ordered [`crate::strategy::Strategy`] lists
//! - Failures are logged and degrade to empty values; nothing here aborts a run

pub mod article;
pub mod feed;
pub mod listing;
pub mod media;
pub mod sites;

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

/// Elements whose text is never article content.
pub(crate) const NOISE_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "footer", "aside", "header", "form", "button",
    "iframe", "svg", "figcaption", "template",
];

/// Parse a selector, logging instead of failing on bad input.
pub(crate) fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(selector = css, error = %e, "Unparseable selector");
            None
        }
    }
}

/// First non-empty `attr` of the first element matching `css`.
pub(crate) fn first_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// True when `el` is, or sits inside, a noise element.
pub(crate) fn in_noise(el: ElementRef<'_>) -> bool {
    std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .any(|e| NOISE_TAGS.contains(&e.value().name()))
}

/// Visible text of `el`, skipping noise subtrees, whitespace-normalized.
pub(crate) fn clean_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        let Node::Text(t) = node.value() else {
            continue;
        };
        if node.parent().and_then(ElementRef::wrap).is_some_and(in_noise) {
            continue;
        }
        out.push_str(t);
        out.push(' ');
    }
    crate::utils::normalize_whitespace(&out)
}
