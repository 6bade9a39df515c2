//! Balanced per-source selection.
//!
//! The target is split between regions (indian gets `target / 2`,
//! international the rest). Within each region, a first pass takes up to
//! `max(1, half / categories_present)` articles from every category in
//! [`Category::ALL`] order, then a backfill pass tops up from whatever is
//! left, again in category order. Short supply yields a short batch; the
//! target is never padded.

use crate::models::{Category, ClassifiedArticle, Region, ScrapeBatch};
use std::collections::VecDeque;
use tracing::{debug, info};

/// Pick a balanced batch of at most `target_total` articles from `pool`.
pub fn select(pool: Vec<ClassifiedArticle>, target_total: usize, source_name: &str) -> ScrapeBatch {
    let indian_target = target_total / 2;
    let international_target = target_total - indian_target;

    let (indian, international): (Vec<_>, Vec<_>) =
        pool.into_iter().partition(|a| a.region == Region::Indian);

    let mut articles = pick_region(indian, indian_target);
    let indian_count = articles.len();
    articles.extend(pick_region(international, international_target));

    let batch = ScrapeBatch {
        source_name: source_name.to_string(),
        target: target_total,
        articles,
    };
    info!(
        source = source_name,
        selected = batch.articles.len(),
        indian = indian_count,
        international = batch.articles.len() - indian_count,
        shortfall = batch.shortfall(),
        "Selected batch"
    );
    batch
}

/// Diversity pass then backfill, both in fixed category order. Input order
/// is preserved within each category.
fn pick_region(region_pool: Vec<ClassifiedArticle>, half: usize) -> Vec<ClassifiedArticle> {
    if half == 0 || region_pool.is_empty() {
        return Vec::new();
    }

    let mut buckets: Vec<VecDeque<ClassifiedArticle>> =
        Category::ALL.iter().map(|_| VecDeque::new()).collect();
    for article in region_pool {
        let idx = Category::ALL
            .iter()
            .position(|c| *c == article.category)
            .unwrap_or(Category::ALL.len() - 1);
        buckets[idx].push_back(article);
    }

    let present = buckets.iter().filter(|b| !b.is_empty()).count();
    let per_category = (half / present).max(1);
    debug!(half, present, per_category, "Region quota");

    let mut chosen = Vec::with_capacity(half);
    for bucket in buckets.iter_mut() {
        for _ in 0..per_category {
            if chosen.len() >= half {
                break;
            }
            match bucket.pop_front() {
                Some(article) => chosen.push(article),
                None => break,
            }
        }
    }

    for bucket in buckets.iter_mut() {
        while chosen.len() < half {
            match bucket.pop_front() {
                Some(article) => chosen.push(article),
                None => break,
            }
        }
    }
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candidate, ExtractedContent};
    use std::collections::HashSet;
    use url::Url;

    fn art(n: usize, category: Category, region: Region) -> ClassifiedArticle {
        ClassifiedArticle {
            candidate: Candidate::new(
                &format!("Synthetic headline number {n} for selection"),
                Url::parse(&format!("https://example.com/{n}")).unwrap(),
                "Src",
            )
            .unwrap(),
            content: ExtractedContent::default(),
            category,
            region,
        }
    }

    fn pool(groups: &[(Category, Region, usize)]) -> Vec<ClassifiedArticle> {
        let mut n = 0;
        let mut out = Vec::new();
        for (cat, region, count) in groups {
            for _ in 0..*count {
                out.push(art(n, *cat, *region));
                n += 1;
            }
        }
        out
    }

    #[test]
    fn test_full_supply_gives_exact_split() {
        use Category::*;
        use Region::*;
        let p = pool(&[
            (Technology, Indian, 5),
            (Politics, Indian, 5),
            (Sports, Indian, 5),
            (Business, International, 6),
            (Science, International, 6),
            (Entertainment, International, 6),
        ]);
        let batch = select(p, 20, "Src");
        assert_eq!(batch.articles.len(), 20);
        assert_eq!(batch.count(Indian), 10);
        assert_eq!(batch.count(International), 10);
        assert_eq!(batch.shortfall(), 0);
    }

    #[test]
    fn test_indian_articles_come_first() {
        use Category::*;
        use Region::*;
        let p = pool(&[(Technology, International, 3), (Politics, Indian, 3)]);
        let batch = select(p, 20, "Src");
        let regions: Vec<_> = batch.articles.iter().map(|a| a.region).collect();
        assert_eq!(regions, vec![Indian, Indian, Indian, International, International, International]);
    }

    #[test]
    fn test_short_indian_supply_is_partial_not_padded() {
        use Category::*;
        use Region::*;
        let p = pool(&[
            (Politics, Indian, 4),
            (Business, International, 8),
            (Sports, International, 8),
        ]);
        let batch = select(p, 20, "Src");
        assert_eq!(batch.count(Indian), 4);
        assert_eq!(batch.count(International), 10);
        assert_eq!(batch.articles.len(), 14);
        assert_eq!(batch.shortfall(), 6);
    }

    #[test]
    fn test_diversity_pass_spreads_across_categories() {
        use Category::*;
        use Region::*;
        // 10 general articles listed first would swamp a naive take(10).
        let p = pool(&[
            (General, International, 10),
            (Technology, International, 10),
            (Business, International, 10),
        ]);
        let batch = select(p, 20, "Src");
        let cats: Vec<_> = batch.articles.iter().map(|a| a.category).collect();
        // per_category = max(1, 10 / 3) = 3, then backfill in category order
        assert_eq!(cats.iter().filter(|c| **c == Technology).count(), 4);
        assert_eq!(cats.iter().filter(|c| **c == Business).count(), 3);
        assert_eq!(cats.iter().filter(|c| **c == General).count(), 3);
    }

    #[test]
    fn test_many_sparse_categories_still_fill_half() {
        use Category::*;
        use Region::*;
        // 7 categories, half = 10: one each on the first pass, then backfill.
        let p = pool(&[
            (Technology, Indian, 3),
            (Business, Indian, 3),
            (Politics, Indian, 3),
            (Sports, Indian, 1),
            (Science, Indian, 1),
            (Entertainment, Indian, 1),
            (General, Indian, 1),
        ]);
        let batch = select(p, 20, "Src");
        assert_eq!(batch.count(Indian), 10);
        let cats: HashSet<_> = batch.articles.iter().map(|a| a.category).collect();
        assert_eq!(cats.len(), 7);
    }

    #[test]
    fn test_selection_preserves_input_order_within_category() {
        use Category::*;
        use Region::*;
        let p = pool(&[(Technology, Indian, 15)]);
        let batch = select(p, 20, "Src");
        let links: Vec<_> = batch.articles.iter().map(|a| a.candidate.link.path().to_string()).collect();
        let expected: Vec<_> = (0..10).map(|n| format!("/{n}")).collect();
        assert_eq!(links, expected);
    }

    #[test]
    fn test_empty_pool_and_zero_target() {
        assert!(select(Vec::new(), 20, "Src").articles.is_empty());
        let p = pool(&[(Category::Technology, Region::Indian, 3)]);
        assert!(select(p, 0, "Src").articles.is_empty());
    }

    #[test]
    fn test_odd_target_gives_extra_slot_to_international() {
        use Category::*;
        use Region::*;
        let p = pool(&[(Technology, Indian, 10), (Technology, International, 10)]);
        let batch = select(p, 5, "Src");
        assert_eq!(batch.count(Indian), 2);
        assert_eq!(batch.count(International), 3);
    }
}
