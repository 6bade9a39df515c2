//! Lead image selection and inline media references.

use super::article::Page;
use super::{first_attr, in_noise, selector};
use crate::scrapers::sites::placeholder_image;
use crate::strategy::{Strategy, first_success};
use itertools::Itertools;
use scraper::ElementRef;
use tracing::debug;
use url::Url;

const META_IMAGES: &[&str] = &[
    r#"meta[property="og:image"]"#,
    r#"meta[property="og:image:url"]"#,
    r#"meta[name="twitter:image"]"#,
    r#"meta[name="twitter:image:src"]"#,
    r#"meta[property="twitter:image"]"#,
];

/// Substrings that mark an image as chrome rather than content.
const IMAGE_NOISE: &[&str] = &[
    "logo", "icon", "sprite", "pixel", "avatar", "blank", "spacer", "placeholder", "1x1",
    "badge", "tracking",
];

const LAZY_SRC_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src", "data-original"];

/// Hosts whose iframes are kept as embedded media.
const EMBED_HOSTS: &[&str] = &[
    "youtube.com",
    "youtube-nocookie.com",
    "youtu.be",
    "vimeo.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "facebook.com",
    "dailymotion.com",
    "soundcloud.com",
    "spotify.com",
];

const CONTENT_SCOPES: &[&str] = &[
    "article",
    r#"[itemprop="articleBody"]"#,
    "main",
    r#"[role="main"]"#,
];

pub const MAX_MEDIA_REFS: usize = 10;

/// Pick the article's lead image.
///
/// Order: the image found inside the detected main content, social meta
/// tags, the first plausible content image, and finally the outlet's
/// placeholder. Never empty.
pub fn lead_image(page: &Page<'_>, top_image: Option<String>) -> String {
    if let Some(image) = top_image {
        debug!("Using main-content image");
        return image;
    }
    let chain: &[Strategy<Page<'_>, String>] = &[
        ("meta_image", meta_image),
        ("first_content_image", first_content_image),
    ];
    first_success(chain, page)
        .map(|(_, image)| image)
        .unwrap_or_else(|| placeholder_image(page.url))
}

fn meta_image(page: &Page<'_>) -> Option<String> {
    META_IMAGES
        .iter()
        .filter_map(|css| first_attr(page.document, css, "content"))
        .find_map(|src| absolutize(page.url, &src))
}

fn first_content_image(page: &Page<'_>) -> Option<String> {
    let img = selector("img")?;
    match content_scope(page) {
        Some(scope) => scope
            .select(&img)
            .find_map(|i| plausible_image(i, page.url)),
        None => page
            .document
            .select(&img)
            .filter(|i| !in_noise(*i))
            .find_map(|i| plausible_image(i, page.url)),
    }
}

/// Absolute URL of `img` unless it looks like a logo, icon, tracker or
/// spacer.
pub(crate) fn plausible_image(img: ElementRef<'_>, base: &Url) -> Option<String> {
    let el = img.value();
    let src = LAZY_SRC_ATTRS
        .iter()
        .filter_map(|a| el.attr(a))
        .map(str::trim)
        .find(|s| !s.is_empty() && !s.starts_with("data:"))?;

    let lower = src.to_ascii_lowercase();
    let class = el.attr("class").unwrap_or_default().to_ascii_lowercase();
    if lower.ends_with(".svg") || IMAGE_NOISE.iter().any(|n| lower.contains(n) || class.contains(n)) {
        return None;
    }
    let tiny = |attr: &str| {
        el.attr(attr)
            .and_then(|v| v.trim().trim_end_matches("px").parse::<u32>().ok())
            .is_some_and(|n| n <= 50)
    };
    if tiny("width") || tiny("height") {
        return None;
    }
    absolutize(base, src)
}

fn absolutize(base: &Url, src: &str) -> Option<String> {
    let url = base.join(src.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

fn content_scope<'a>(page: &Page<'a>) -> Option<ElementRef<'a>> {
    CONTENT_SCOPES
        .iter()
        .filter_map(|css| selector(css))
        .find_map(|sel| page.document.select(&sel).next())
}

fn is_embed_host(url: &Url) -> bool {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    EMBED_HOSTS.iter().any(|d| {
        host == *d
            || host
                .strip_suffix(d)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// Inline references to images, videos and known embeds in the article
/// body, in document order, deduplicated by URL and capped at
/// [`MAX_MEDIA_REFS`].
///
/// Lines look like `[IMAGE: alt] url`, `[VIDEO] url` or `[EMBEDDED] url`.
pub fn media_refs(page: &Page<'_>) -> Vec<String> {
    let Some(sel) = selector("img, video, video source, iframe") else {
        return Vec::new();
    };
    let elements: Vec<ElementRef<'_>> = match content_scope(page) {
        Some(scope) => scope.select(&sel).collect(),
        None => page.document.select(&sel).collect(),
    };

    elements
        .into_iter()
        .filter(|el| !el.parent().and_then(ElementRef::wrap).is_some_and(in_noise))
        .filter_map(|el| media_ref(el, page.url))
        .unique_by(|(_, url)| url.clone())
        .take(MAX_MEDIA_REFS)
        .map(|(label, url)| format!("{label} {url}"))
        .collect()
}

fn media_ref(el: ElementRef<'_>, base: &Url) -> Option<(String, String)> {
    match el.value().name() {
        "img" => {
            let url = plausible_image(el, base)?;
            let alt = crate::utils::normalize_whitespace(el.value().attr("alt").unwrap_or_default());
            let label = if alt.is_empty() {
                "[IMAGE]".to_string()
            } else {
                format!("[IMAGE: {alt}]")
            };
            Some((label, url))
        }
        "video" | "source" => {
            let url = absolutize(base, el.value().attr("src")?)?;
            Some(("[VIDEO]".to_string(), url))
        }
        "iframe" => {
            let src = el.value().attr("src").or_else(|| el.value().attr("data-src"))?;
            let url = base.join(src.trim()).ok()?;
            is_embed_host(&url).then(|| ("[EMBEDDED]".to_string(), url.to_string()))
        }
        _ => None,
    }
}

/// Append media reference lines after the body text.
pub fn append_media_refs(text: String, refs: &[String]) -> String {
    if refs.is_empty() {
        text
    } else {
        format!("{text}\n\n{}", refs.join("\n"))
    }
}
