//! Declarative outlet table.
//!
//! Each known outlet is one [`SiteProfile`] row: the domains it serves, an
//! optional feed, listing-page selectors tuned to its layout, article body
//! selectors, and the colour of its placeholder image. Supporting a new
//! outlet means adding a row here; no code path branches on outlet names.
//!
//! Unknown domains resolve to [`GENERIC`], which has no feed and no
//! site-specific selectors, so the generic heuristics do all the work.

use crate::utils::stable_hash;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteProfile {
    pub label: &'static str,
    /// Hosts this row answers for. A host matches when it equals an entry or
    /// is a subdomain of it.
    pub domains: &'static [&'static str],
    pub feed_url: Option<&'static str>,
    /// Tried before the generic headline heuristics on listing pages.
    pub listing_selectors: &'static [&'static str],
    /// Tried before the generic body containers on article pages.
    pub content_selectors: &'static [&'static str],
    /// Background colour (hex, no `#`) of the placeholder image.
    pub placeholder_color: &'static str,
}

pub const GENERIC: SiteProfile = SiteProfile {
    label: "News",
    domains: &[],
    feed_url: None,
    listing_selectors: &[],
    content_selectors: &[],
    placeholder_color: "",
};

const PALETTE: &[&str] = &["1f2937", "1e3a8a", "7c2d12", "14532d", "581c87", "831843", "0f766e"];

static SITES: &[SiteProfile] = &[
    SiteProfile {
        label: "BBC News",
        domains: &["bbc.com", "bbc.co.uk"],
        feed_url: Some("https://feeds.bbci.co.uk/news/rss.xml"),
        listing_selectors: &[
            r#"a[data-testid="internal-link"] h2"#,
            r#"h2[data-testid="card-headline"]"#,
            "h2.sc-4fedabc7-3",
            "h3.sc-8ea7699c-3",
        ],
        content_selectors: &[r#"article div[data-component="text-block"]"#, "article"],
        placeholder_color: "bb1919",
    },
    SiteProfile {
        label: "CNN",
        domains: &["cnn.com"],
        feed_url: Some("http://rss.cnn.com/rss/edition.rss"),
        listing_selectors: &[".container__headline-text", ".card--lite a[href]"],
        content_selectors: &[".article__content", ".article--lite"],
        placeholder_color: "cc0000",
    },
    SiteProfile {
        label: "The Guardian",
        domains: &["theguardian.com"],
        feed_url: Some("https://www.theguardian.com/international/rss"),
        listing_selectors: &[r#"a[data-link-name="article"]"#, ".dcr-lv2v9o"],
        content_selectors: &[r#"div[data-gu-name="body"]"#, "#maincontent"],
        placeholder_color: "052962",
    },
    SiteProfile {
        label: "NPR",
        domains: &["npr.org"],
        feed_url: Some("https://feeds.npr.org/1001/rss.xml"),
        listing_selectors: &["h2.title a", ".story-text h2"],
        content_selectors: &["#storytext"],
        placeholder_color: "2c3e50",
    },
    SiteProfile {
        label: "AP News",
        domains: &["apnews.com"],
        feed_url: None,
        listing_selectors: &[".PagePromo-title a", ".PagePromoContentIcons-text"],
        content_selectors: &[".RichTextStoryBody", ".RichTextBody"],
        placeholder_color: "000000",
    },
    SiteProfile {
        label: "TechCrunch",
        domains: &["techcrunch.com"],
        feed_url: Some("https://techcrunch.com/feed/"),
        listing_selectors: &[".loop-card__title a", "h2.post-block__title a"],
        content_selectors: &[".entry-content", ".article-content"],
        placeholder_color: "0a9e01",
    },
    SiteProfile {
        label: "The Verge",
        domains: &["theverge.com"],
        feed_url: Some("https://www.theverge.com/rss/index.xml"),
        listing_selectors: &["h2 a[href]", "a[class*=\"group-hover\"]"],
        content_selectors: &[".duet--article--article-body-component"],
        placeholder_color: "5200ff",
    },
    SiteProfile {
        label: "Engadget",
        domains: &["engadget.com"],
        feed_url: Some("https://www.engadget.com/rss.xml"),
        listing_selectors: &["h4 a[href]", "h2 a[href]"],
        content_selectors: &[".caas-body", "#caas-art-0"],
        placeholder_color: "1a1a1a",
    },
    SiteProfile {
        label: "Ars Technica",
        domains: &["arstechnica.com"],
        feed_url: Some("https://feeds.arstechnica.com/arstechnica/index"),
        listing_selectors: &["header h2 a", "article h2 a"],
        content_selectors: &[".post-content", ".article-content"],
        placeholder_color: "ff4e00",
    },
    SiteProfile {
        label: "WIRED",
        domains: &["wired.com"],
        feed_url: Some("https://www.wired.com/feed/rss"),
        listing_selectors: &[".summary-item__hed-link", "h3.summary-item__hed"],
        content_selectors: &[".body__inner-container"],
        placeholder_color: "000000",
    },
    SiteProfile {
        label: "Hacker News",
        domains: &["news.ycombinator.com"],
        feed_url: Some("https://news.ycombinator.com/rss"),
        listing_selectors: &[".titleline > a"],
        content_selectors: &[],
        placeholder_color: "ff6600",
    },
    SiteProfile {
        label: "India Today",
        domains: &["indiatoday.in"],
        feed_url: Some("https://www.indiatoday.in/rss/home"),
        listing_selectors: &[".B1S3_story__title__nOWSE a", "h2 a[href*=\"/story/\"]"],
        content_selectors: &[".story-with-main-sec", ".description"],
        placeholder_color: "c4161c",
    },
    SiteProfile {
        label: "NDTV",
        domains: &["ndtv.com"],
        feed_url: Some("https://feeds.feedburner.com/ndtvnews-top-stories"),
        listing_selectors: &[".newsHdng a", ".crd_ttl8 a"],
        content_selectors: &[".Art-exp_wr", "#ins_storybody"],
        placeholder_color: "d71920",
    },
    SiteProfile {
        label: "Times of India",
        domains: &["timesofindia.indiatimes.com"],
        feed_url: Some("https://timesofindia.indiatimes.com/rssfeedstopstories.cms"),
        listing_selectors: &["figcaption", ".w_tle a"],
        content_selectors: &["._s30J", ".Normal"],
        placeholder_color: "a50000",
    },
    SiteProfile {
        label: "The Hindu",
        domains: &["thehindu.com"],
        feed_url: Some("https://www.thehindu.com/news/feeder/default.rss"),
        listing_selectors: &["h3.title a", ".element .title a"],
        content_selectors: &[r#"div[itemprop="articleBody"]"#, ".articlebodycontent"],
        placeholder_color: "1c1c1c",
    },
    SiteProfile {
        label: "Economic Times",
        domains: &["economictimes.indiatimes.com"],
        feed_url: Some("https://economictimes.indiatimes.com/rssfeedsdefault.cms"),
        listing_selectors: &[".eachStory h3 a", ".story_list a"],
        content_selectors: &[".artText", ".article_wrap"],
        placeholder_color: "ed1c24",
    },
    SiteProfile {
        label: "Bloomberg",
        domains: &["bloomberg.com"],
        feed_url: Some("https://feeds.bloomberg.com/markets/news.rss"),
        listing_selectors: &[r#"a[data-component="headline"]"#],
        content_selectors: &[".body-content"],
        placeholder_color: "000000",
    },
    SiteProfile {
        label: "Wall Street Journal",
        domains: &["wsj.com"],
        feed_url: Some("https://feeds.a.dj.com/rss/RSSWorldNews.xml"),
        listing_selectors: &[r#"h3[class*="WSJTheme--headline"] a"#],
        content_selectors: &["section.article-content"],
        placeholder_color: "0274b6",
    },
    SiteProfile {
        label: "Forbes",
        domains: &["forbes.com"],
        feed_url: Some("https://www.forbes.com/innovation/feed/"),
        listing_selectors: &[".stream-item__title", "h3 a[href*=\"/sites/\"]"],
        content_selectors: &[".article-body"],
        placeholder_color: "0a0a0a",
    },
    SiteProfile {
        label: "Financial Times",
        domains: &["ft.com"],
        feed_url: Some("https://www.ft.com/rss/home"),
        listing_selectors: &[".js-teaser-heading-link", ".o-teaser__heading a"],
        content_selectors: &[".article__content-body", "#article-body"],
        placeholder_color: "fff1e5",
    },
];

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Find the outlet row serving `url`, or [`GENERIC`].
pub fn lookup(url: &Url) -> &'static SiteProfile {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    SITES
        .iter()
        .find(|site| site.domains.iter().any(|d| host_matches(&host, d)))
        .unwrap_or(&GENERIC)
}

/// Host of generated placeholder images.
pub const PLACEHOLDER_HOST: &str = "https://placehold.co/";

/// Deterministic placeholder image for the outlet serving `url`.
///
/// Known outlets use their own colour and label; unknown hosts get a colour
/// picked from a fixed palette by hashing the host, labelled with the host.
pub fn placeholder_image(url: &Url) -> String {
    let host = url
        .host_str()
        .unwrap_or("news")
        .trim_start_matches("www.")
        .to_ascii_lowercase();
    let site = lookup(url);
    let (color, label) = if site.domains.is_empty() {
        let idx = (stable_hash(&host) % PALETTE.len() as u64) as usize;
        (PALETTE[idx], host.as_str())
    } else {
        (site.placeholder_color, site.label)
    };
    format!(
        "{PLACEHOLDER_HOST}1200x630/{}/ffffff/png?text={}",
        color,
        urlencoding::encode(label)
    )
}
