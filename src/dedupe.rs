//! Near-duplicate detection by normalized title.
//!
//! Two titles are duplicates when the exact key (normalized title, source)
//! was already seen, or when their token sets overlap by more than the
//! configured fraction of the larger set.
//!
//! [`Deduplicator`] is a plain single-owner filter used inside one source's
//! pool. [`SeenTitles`] wraps one behind a mutex for the process-wide pass
//! across concurrently scraped sources.

use crate::models::{Candidate, ClassifiedArticle};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Anything with a title and a source.
pub trait Titled {
    fn title(&self) -> &str;
    fn source_name(&self) -> &str;
}

impl Titled for Candidate {
    fn title(&self) -> &str {
        &self.title
    }

    fn source_name(&self) -> &str {
        &self.source_name
    }
}

impl Titled for ClassifiedArticle {
    fn title(&self) -> &str {
        ClassifiedArticle::title(self)
    }

    fn source_name(&self) -> &str {
        ClassifiedArticle::source_name(self)
    }
}

fn words(title: &str) -> impl Iterator<Item = String> + '_ {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Lowercased alphanumeric tokens of `title`.
pub fn tokens(title: &str) -> HashSet<String> {
    words(title).collect()
}

/// Shared tokens as a fraction of the larger token set.
pub fn overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let larger = a.len().max(b.len());
    if larger == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / larger as f64
}

fn normalized(title: &str) -> String {
    words(title).collect::<Vec<_>>().join(" ")
}

/// Order-preserving duplicate filter. The first occurrence wins.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    threshold: f64,
    keys: HashSet<(String, String)>,
    token_sets: Vec<HashSet<String>>,
}

impl Deduplicator {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            keys: HashSet::new(),
            token_sets: Vec::new(),
        }
    }

    /// True if `item` duplicates something already admitted.
    pub fn is_duplicate(&self, item: &impl Titled) -> bool {
        let key = (normalized(item.title()), item.source_name().to_string());
        if self.keys.contains(&key) {
            return true;
        }
        let toks = tokens(item.title());
        self.token_sets
            .iter()
            .any(|seen| overlap(&toks, seen) > self.threshold)
    }

    /// Record `item` unless it is a duplicate. Returns whether it was new.
    pub fn admit(&mut self, item: &impl Titled) -> bool {
        if self.is_duplicate(item) {
            debug!(title = item.title(), source = item.source_name(), "Dropping duplicate");
            return false;
        }
        self.keys
            .insert((normalized(item.title()), item.source_name().to_string()));
        self.token_sets.push(tokens(item.title()));
        true
    }

    /// Keep the first occurrence of each story, in input order.
    pub fn dedupe<T: Titled>(&mut self, items: Vec<T>) -> Vec<T> {
        items.into_iter().filter(|item| self.admit(item)).collect()
    }
}

/// Process-wide seen set shared by concurrently scraped sources.
#[derive(Debug, Clone)]
pub struct SeenTitles {
    inner: Arc<Mutex<Deduplicator>>,
}

impl SeenTitles {
    pub fn new(threshold: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Deduplicator::new(threshold))),
        }
    }

    /// Drop articles already claimed by another source, let `select` pick
    /// from the rest, then claim what it picked. Runs under one lock so
    /// two sources cannot claim the same story, and stories a source did
    /// not select stay available to others.
    pub fn select_unclaimed<F>(&self, pool: Vec<ClassifiedArticle>, select: F) -> Vec<ClassifiedArticle>
    where
        F: FnOnce(Vec<ClassifiedArticle>) -> Vec<ClassifiedArticle>,
    {
        let mut seen = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = pool.len();
        let fresh: Vec<_> = pool.into_iter().filter(|a| !seen.is_duplicate(a)).collect();
        if fresh.len() < before {
            debug!(dropped = before - fresh.len(), "Stories already claimed by other sources");
        }
        let chosen = select(fresh);
        for article in &chosen {
            seen.admit(article);
        }
        chosen
    }

    /// Number of stories claimed so far.
    pub fn claimed(&self) -> usize {
        match self.inner.lock() {
            Ok(guard) => guard.token_sets.len(),
            Err(poisoned) => poisoned.into_inner().token_sets.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, ExtractedContent, Region};
    use url::Url;

    fn cand(title: &str, source: &str) -> Candidate {
        Candidate::new(title, Url::parse("https://example.com/a").unwrap(), source).unwrap()
    }

    fn article(title: &str, source: &str) -> ClassifiedArticle {
        ClassifiedArticle {
            candidate: cand(title, source),
            content: ExtractedContent::default(),
            category: Category::General,
            region: Region::International,
        }
    }

    #[test]
    fn test_identical_normalized_titles_collapse() {
        let mut d = Deduplicator::new(0.6);
        let out = d.dedupe(vec![
            cand("Parliament passes the data protection bill", "X"),
            cand("PARLIAMENT passes the data-protection bill!", "X"),
        ]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_high_overlap_collapses_and_keeps_first() {
        // 6 of 7 tokens shared
        let mut d = Deduplicator::new(0.6);
        let out = d.dedupe(vec![
            cand("Stock markets rally after rate cut news", "A"),
            cand("Stock markets rally after rate cut announcement", "B"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source_name, "A");
    }

    #[test]
    fn test_low_overlap_stays_distinct() {
        // one shared token out of five
        let mut d = Deduplicator::new(0.6);
        let out = d.dedupe(vec![
            cand("alpha bravo charlie delta echo", "X"),
            cand("alpha foxtrot golf hotel india", "X"),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_overlap_uses_larger_set() {
        let a = tokens("one two three");
        let b = tokens("one two three four five six");
        assert!((overlap(&a, &b) - 0.5).abs() < f64::EPSILON);
        assert_eq!(overlap(&HashSet::new(), &HashSet::new()), 0.0);
    }

    #[test]
    fn test_exactly_threshold_is_not_duplicate() {
        // 3 of 5 shared = 0.6, which is not more than 0.6
        let mut d = Deduplicator::new(0.6);
        let out = d.dedupe(vec![
            cand("alpha bravo charlie delta echo", "X"),
            cand("alpha bravo charlie kilo lima", "X"),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_seen_titles_blocks_cross_source_repeats_only_after_claim() {
        let seen = SeenTitles::new(0.6);
        let first = seen.select_unclaimed(
            vec![
                article("Monsoon arrives early over the Kerala coast", "NDTV"),
                article("Chip maker unveils faster laptop processor line", "NDTV"),
            ],
            |pool| pool.into_iter().take(1).collect(),
        );
        assert_eq!(first.len(), 1);
        assert_eq!(seen.claimed(), 1);

        let second = seen.select_unclaimed(
            vec![
                article("Monsoon arrives early over Kerala coast", "The Hindu"),
                article("Chip maker unveils faster laptop processor line", "The Hindu"),
            ],
            |pool| pool,
        );
        assert_eq!(second.len(), 1, "only the unclaimed story survives");
        assert_eq!(second[0].title(), "Chip maker unveils faster laptop processor line");
        assert_eq!(seen.claimed(), 2);
    }
}
