//! RSS 2.0 / RSS 1.0 / Atom feed parsing.
//!
//! Feeds are ordered newest-first by convention, so taking a prefix of the
//! items is a cheap recency filter. Parsing walks the XML events and only
//! looks at the unprefixed children of each `item`/`entry`, so extension
//! elements (`media:*`, `atom:link`, `dc:*`) and undeclared HTML entities do
//! not spoil the feed. A feed with no usable items sends the caller to the
//! listing-page heuristics.

use crate::models::Candidate;
use crate::utils::strip_tags;
use chrono::{DateTime, FixedOffset};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, warn};
use url::Url;

/// A feed item before title/link validation.
#[derive(Debug)]
struct RawItem {
    title: String,
    link: String,
    published: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Published,
    Updated,
}

/// Fields collected while inside one `item`/`entry`. The first value seen
/// for a field wins.
#[derive(Debug, Default)]
struct OpenItem {
    level: usize,
    capture: Option<(Field, String)>,
    title: Option<String>,
    link: Option<String>,
    /// Atom `<link href rel>` pairs, in document order.
    links: Vec<(Option<String>, String)>,
    published: Option<String>,
    updated: Option<String>,
}

impl OpenItem {
    fn new(level: usize) -> Self {
        Self { level, ..Self::default() }
    }

    fn store(&mut self, field: Field, raw: String) {
        if raw.trim().is_empty() {
            return;
        }
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
        };
        if slot.is_none() {
            *slot = Some(raw);
        }
    }

    fn push_link_attrs(&mut self, e: &BytesStart) {
        let mut href = None;
        let mut rel = None;
        for attr in e.attributes().with_checks(false).flatten() {
            let value = strip_tags(&String::from_utf8_lossy(&attr.value));
            match attr.key.local_name().as_ref() {
                b"href" => href = Some(value),
                b"rel" => rel = Some(value),
                _ => {}
            }
        }
        if let Some(href) = href.filter(|h| !h.is_empty()) {
            self.links.push((rel, href));
        }
    }

    fn finish(self) -> Option<RawItem> {
        let link = self.link.map(|l| strip_tags(&l)).filter(|l| !l.is_empty()).or_else(|| {
            self.links
                .iter()
                .find(|(rel, _)| matches!(rel.as_deref(), None | Some("alternate")))
                .or_else(|| self.links.first())
                .map(|(_, href)| href.clone())
        })?;
        // Titles are often HTML escaped inside XML, so decode then strip again.
        let title = strip_tags(&strip_tags(&self.title?));
        Some(RawItem {
            title,
            link,
            published: self.published.or(self.updated).map(|d| strip_tags(&d)),
        })
    }
}

/// Parse feed bytes into at most `cap` candidates, in feed order.
///
/// Items whose title is below the title floor or whose link is not an
/// absolute http(s) URL are skipped; they do not count toward `cap`.
/// XML that breaks part way keeps the items completed before the break.
pub fn parse_feed(xml: &[u8], source_name: &str, cap: usize) -> impl Iterator<Item = Candidate> {
    let text = String::from_utf8_lossy(xml);
    let items = parse_items(&text, source_name);
    debug!(source = source_name, items = items.len(), "Parsed feed items");

    let source_name = source_name.to_string();
    items
        .into_iter()
        .filter_map(move |item| {
            let link = Url::parse(item.link.trim()).ok()?;
            let published = item.published.as_deref().and_then(parse_feed_date);
            Candidate::new(&item.title, link, &source_name)
                .map(|c| c.with_published_hint(published))
        })
        .take(cap)
}

fn field_of(local: &[u8]) -> Option<Field> {
    match local {
        b"title" => Some(Field::Title),
        b"link" => Some(Field::Link),
        b"pubDate" | b"published" => Some(Field::Published),
        b"updated" => Some(Field::Updated),
        _ => None,
    }
}

fn is_item(e: &BytesStart) -> bool {
    e.name().prefix().is_none() && matches!(e.local_name().as_ref(), b"item" | b"entry")
}

fn parse_items(text: &str, source_name: &str) -> Vec<RawItem> {
    let mut reader = Reader::from_str(text);
    let mut buf = Vec::new();
    let mut items = Vec::new();
    let mut open: Option<OpenItem> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                if open.is_none() {
                    if is_item(&e) {
                        open = Some(OpenItem::new(depth));
                    }
                } else if let Some(item) = open.as_mut().filter(|i| depth == i.level + 1) {
                    if e.name().prefix().is_none() {
                        let local = e.local_name();
                        if local.as_ref() == b"link" {
                            item.push_link_attrs(&e);
                        }
                        if let Some(field) = field_of(local.as_ref()) {
                            item.capture = Some((field, String::new()));
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(item) = open.as_mut() {
                    if depth == item.level && e.name().prefix().is_none() && e.local_name().as_ref() == b"link" {
                        item.push_link_attrs(&e);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let Some((_, text)) = open.as_mut().and_then(|i| i.capture.as_mut()) {
                    text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::CData(t)) => {
                if let Some((_, text)) = open.as_mut().and_then(|i| i.capture.as_mut()) {
                    text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::GeneralRef(r)) => {
                // Left encoded; `strip_tags` knows the full HTML entity table.
                if let Some((_, text)) = open.as_mut().and_then(|i| i.capture.as_mut()) {
                    text.push('&');
                    text.push_str(&String::from_utf8_lossy(&r));
                    text.push(';');
                }
            }
            Ok(Event::End(_)) => {
                if let Some(item) = open.as_mut() {
                    if depth == item.level + 1 {
                        if let Some((field, raw)) = item.capture.take() {
                            item.store(field, raw);
                        }
                    }
                }
                if open.as_ref().is_some_and(|i| i.level == depth) {
                    items.extend(open.take().and_then(OpenItem::finish));
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(
                    source = source_name,
                    error = %e,
                    position = reader.buffer_position(),
                    kept = items.len(),
                    "Feed XML broke off; keeping items read so far"
                );
                break;
            }
        }
        buf.clear();
    }
    items
}

/// Feeds use RFC 2822 (RSS) or RFC 3339 (Atom).
pub fn parse_feed_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
}
