//! Topic and region classification.
//!
//! Classification is a pure function of (title, content, source name). All
//! vocabulary lives in a [`KeywordTable`] so tests and deployments can swap
//! gazetteers without touching the scoring code.
//!
//! Matching is whole-word: text is lowercased, punctuation becomes spaces,
//! and a keyword matches only when it appears bounded by spaces. `"modi"`
//! therefore does not hit `"modified"`, while `"tamil nadu"` matches as a
//! phrase.

use crate::models::{Category, Region};
use tracing::debug;

/// Vocabulary and weights used by the [`Classifier`].
#[derive(Debug, Clone)]
pub struct KeywordTable {
    /// Terms whose presence anywhere marks an article as Indian.
    pub region_keywords: Vec<String>,
    /// Source-name terms for outlets branded as Indian.
    pub indian_sources: Vec<String>,
    /// Scoring vocabulary. Row order is the tie-break order.
    pub category_keywords: Vec<(Category, Vec<String>)>,
    /// Source-name terms that pin every article to one category.
    pub source_categories: Vec<(String, Category)>,
    pub title_weight: u32,
    pub body_weight: u32,
    /// Minimum winning score; below it the article is `general`.
    pub threshold: u32,
}

fn terms(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self {
            region_keywords: terms(&[
                "india", "indian", "indians", "delhi", "new delhi", "mumbai", "bengaluru",
                "bangalore", "chennai", "kolkata", "hyderabad", "pune", "ahmedabad", "jaipur",
                "lucknow", "kerala", "karnataka", "tamil nadu", "maharashtra", "gujarat", "punjab",
                "bihar", "uttar pradesh", "west bengal", "rajasthan", "assam", "kashmir", "odisha",
                "telangana", "andhra pradesh", "goa", "modi", "rahul gandhi", "bjp",
                "indian national congress", "aam aadmi party", "lok sabha", "rajya sabha", "isro",
                "rbi", "reserve bank of india", "sebi", "niti aayog", "bcci", "ipl", "rupee",
                "sensex", "nifty", "bollywood", "aiims", "iit",
            ]),
            indian_sources: terms(&[
                "india",
                "ndtv",
                "the hindu",
                "times of india",
                "economic times",
                "hindustan times",
                "indian express",
                "mint",
            ]),
            category_keywords: vec![
                (
                    Category::Technology,
                    terms(&[
                        "technology", "tech", "software", "ai", "artificial intelligence",
                        "smartphone", "iphone", "android", "app", "apps", "startup", "cyber",
                        "cybersecurity", "hacker", "chip", "chips", "semiconductor", "internet",
                        "google", "apple", "microsoft", "openai", "robot", "cloud", "computer",
                        "gadget", "5g",
                    ]),
                ),
                (
                    Category::Business,
                    terms(&[
                        "business", "market", "markets", "stock", "stocks", "shares", "economy",
                        "economic", "gdp", "inflation", "bank", "banks", "investor", "investors",
                        "revenue", "profit", "earnings", "trade", "tariff", "tariffs", "ipo",
                        "sensex", "nifty", "rupee", "company", "ceo", "merger", "acquisition",
                    ]),
                ),
                (
                    Category::Politics,
                    terms(&[
                        "election", "elections", "minister", "government", "parliament",
                        "president", "prime minister", "party", "vote", "voters", "policy",
                        "senate", "congress", "lok sabha", "bjp", "democrat", "republican",
                        "campaign", "bill", "diplomat", "opposition", "cabinet",
                    ]),
                ),
                (
                    Category::Sports,
                    terms(&[
                        "cricket", "football", "soccer", "tennis", "match", "tournament",
                        "league", "olympics", "ipl", "bcci", "player", "players", "coach",
                        "team", "championship", "fifa", "nba", "world cup", "wicket", "innings",
                        "goal", "medal",
                    ]),
                ),
                (
                    Category::Science,
                    terms(&[
                        "science", "scientist", "scientists", "research", "researchers", "study",
                        "space", "nasa", "isro", "planet", "climate", "species", "physics",
                        "biology", "vaccine", "disease", "telescope", "asteroid", "moon", "mars",
                        "fossil",
                    ]),
                ),
                (
                    Category::Entertainment,
                    terms(&[
                        "film", "films", "movie", "movies", "bollywood", "hollywood", "actor",
                        "actress", "music", "album", "song", "celebrity", "box office",
                        "netflix", "series", "oscars", "oscar", "singer", "concert", "trailer",
                    ]),
                ),
            ],
            source_categories: vec![
                ("techcrunch".into(), Category::Technology),
                ("the verge".into(), Category::Technology),
                ("engadget".into(), Category::Technology),
                ("ars technica".into(), Category::Technology),
                ("wired".into(), Category::Technology),
                ("hacker news".into(), Category::Technology),
                ("economic times".into(), Category::Business),
                ("bloomberg".into(), Category::Business),
                ("wall street journal".into(), Category::Business),
                ("wsj".into(), Category::Business),
                ("forbes".into(), Category::Business),
                ("financial times".into(), Category::Business),
            ],
            title_weight: 3,
            body_weight: 1,
            threshold: 2,
        }
    }
}

/// Lowercase, replace non-alphanumerics with spaces, collapse, and pad with
/// one space each side so `contains(" term ")` is a whole-word test.
fn padded(text: &str) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase();
    format!(" {} ", flat.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn normalize_terms(list: &[String]) -> Vec<String> {
    list.iter()
        .map(|t| padded(t))
        .filter(|t| !t.trim().is_empty())
        .collect()
}

/// Weighted keyword classifier over a [`KeywordTable`].
#[derive(Debug, Clone)]
pub struct Classifier {
    region_keywords: Vec<String>,
    indian_sources: Vec<String>,
    category_keywords: Vec<(Category, Vec<String>)>,
    source_categories: Vec<(String, Category)>,
    title_weight: u32,
    body_weight: u32,
    threshold: u32,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&KeywordTable::default())
    }
}

impl Classifier {
    pub fn new(table: &KeywordTable) -> Self {
        Self {
            region_keywords: normalize_terms(&table.region_keywords),
            indian_sources: normalize_terms(&table.indian_sources),
            category_keywords: table
                .category_keywords
                .iter()
                .map(|(cat, words)| (*cat, normalize_terms(words)))
                .collect(),
            source_categories: table
                .source_categories
                .iter()
                .map(|(source, cat)| (padded(source), *cat))
                .filter(|(source, _)| !source.trim().is_empty())
                .collect(),
            title_weight: table.title_weight,
            body_weight: table.body_weight,
            threshold: table.threshold,
        }
    }

    pub fn classify(&self, title: &str, content: &str, source_name: &str) -> (Category, Region) {
        let title = padded(title);
        let body = padded(content);
        let source = padded(source_name);
        let category = self.category_of(&title, &body, &source);
        let region = self.region_of(&title, &body, &source);
        debug!(source = source_name, %category, %region, "Classified");
        (category, region)
    }

    fn region_of(&self, title: &str, body: &str, source: &str) -> Region {
        if self.indian_sources.iter().any(|s| source.contains(s.as_str())) {
            return Region::Indian;
        }
        let hit = self
            .region_keywords
            .iter()
            .any(|k| title.contains(k.as_str()) || body.contains(k.as_str()) || source.contains(k.as_str()));
        if hit { Region::Indian } else { Region::International }
    }

    fn category_of(&self, title: &str, body: &str, source: &str) -> Category {
        if let Some((_, cat)) = self
            .source_categories
            .iter()
            .find(|(s, _)| source.contains(s.as_str()))
        {
            return *cat;
        }

        let mut best = (Category::General, 0u32);
        for (cat, words) in &self.category_keywords {
            let score: u32 = words
                .iter()
                .map(|w| {
                    let mut s = 0;
                    if title.contains(w.as_str()) {
                        s += self.title_weight;
                    }
                    if body.contains(w.as_str()) {
                        s += self.body_weight;
                    }
                    s
                })
                .sum();
            if score > best.1 {
                best = (*cat, score);
            }
        }
        if best.1 >= self.threshold {
            best.0
        } else {
            Category::General
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(title: &str, content: &str, source: &str) -> (Category, Region) {
        Classifier::default().classify(title, content, source)
    }

    #[test]
    fn test_region_from_title_keyword() {
        let (_, region) = classify("Heavy rain lashes Mumbai suburbs overnight", "", "Reuters");
        assert_eq!(region, Region::Indian);
    }

    #[test]
    fn test_region_from_body_only_keyword() {
        let (_, region) = classify(
            "Heavy rain lashes coastal suburbs overnight",
            "Officials in Chennai said schools would stay shut.",
            "Reuters",
        );
        assert_eq!(region, Region::Indian);
    }

    #[test]
    fn test_region_defaults_to_international() {
        let (_, region) = classify(
            "European leaders meet in Brussels for summit",
            "The bloc discussed energy prices.",
            "BBC News",
        );
        assert_eq!(region, Region::International);
    }

    #[test]
    fn test_region_matches_whole_words_only() {
        let (_, region) = classify(
            "Genetically modified crops approved in Europe",
            "Regulators cited a goal of independence.",
            "BBC News",
        );
        assert_eq!(region, Region::International, "'modi' and 'goa' must not match inside words");
    }

    #[test]
    fn test_indian_branded_source_forces_indian() {
        let (_, region) = classify("European leaders meet in Brussels for summit", "", "NDTV");
        assert_eq!(region, Region::Indian);
        let (_, region) = classify("European leaders meet in Brussels for summit", "", "Times of India");
        assert_eq!(region, Region::Indian);
    }

    #[test]
    fn test_title_hits_outweigh_body_hits() {
        let (category, _) = classify(
            "Cricket team clinches series in final over",
            "The film crew watched from the stands.",
            "BBC News",
        );
        assert_eq!(category, Category::Sports);
    }

    #[test]
    fn test_single_body_hit_falls_below_threshold() {
        let (category, _) = classify(
            "Residents gather for annual town celebration",
            "Local music filled the square.",
            "BBC News",
        );
        assert_eq!(category, Category::General);
    }

    #[test]
    fn test_ties_resolve_to_earlier_category() {
        // One title hit each for technology ("startup") and business ("market").
        let (category, _) = classify("Startup eyes new market after funding round", "", "BBC News");
        assert_eq!(category, Category::Technology);
    }

    #[test]
    fn test_source_category_override_short_circuits_scoring() {
        let (category, _) = classify(
            "Cricket team clinches series in final over",
            "Players celebrated the match.",
            "TechCrunch",
        );
        assert_eq!(category, Category::Technology);
        let (category, _) = classify("Cricket team clinches series in final over", "", "Bloomberg");
        assert_eq!(category, Category::Business);
    }

    #[test]
    fn test_gazetteer_can_be_swapped() {
        let table = KeywordTable {
            region_keywords: vec!["atlantis".into()],
            indian_sources: vec![],
            category_keywords: vec![(Category::Science, vec!["kraken".into()])],
            source_categories: vec![],
            ..KeywordTable::default()
        };
        let classifier = Classifier::new(&table);
        assert_eq!(
            classifier.classify("Kraken sighted off the coast of Atlantis", "", "NDTV"),
            (Category::Science, Region::Indian)
        );
        assert_eq!(
            classifier.classify("Monsoon arrives in Kerala ahead of schedule", "", "X"),
            (Category::General, Region::International)
        );
    }

    #[test]
    fn test_classify_is_deterministic_and_idempotent() {
        let classifier = Classifier::default();
        let args = (
            "RBI holds repo rate as inflation cools",
            "The Reserve Bank of India kept rates unchanged, citing easing prices.",
            "The Hindu",
        );
        let first = classifier.classify(args.0, args.1, args.2);
        for _ in 0..5 {
            assert_eq!(classifier.classify(args.0, args.1, args.2), first);
        }
        assert_eq!(first, (Category::Business, Region::Indian));
    }
}
