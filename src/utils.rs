//! Utility functions for string cleanup, hashing and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Whitespace normalization and tag stripping for titles and body text
//! - Truncation for logging and excerpts
//! - A stable string hash for deterministic per-domain choices
//! - File system validation for output directories

use scraper::Html;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a byte
/// count indicator appended. Cuts always land on a character boundary.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}…(+{} bytes)", &s[..idx], s.len() - idx),
    }
}

/// Collapse every run of whitespace into a single space and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove markup from a fragment and decode its HTML entities, e.g. a
/// feed title that was HTML escaped inside the XML.
pub fn strip_tags(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    normalize_whitespace(&fragment.root_element().text().collect::<String>())
}

/// Cut `text` to at most `max_chars`, backing off to the last word
/// boundary and appending an ellipsis when anything was dropped.
pub fn excerpt_of(text: &str, max_chars: usize) -> String {
    let flat = normalize_whitespace(text);
    let Some((cut, _)) = flat.char_indices().nth(max_chars) else {
        return flat;
    };
    let head = &flat[..cut];
    let head = match head.rfind(' ') {
        Some(space) if space > 0 => &head[..space],
        _ => head,
    };
    format!("{}…", head.trim_end_matches([',', ';', ':', '.', ' ']))
}

/// FNV-1a over the bytes of `s`. Stable across runs and platforms.
pub fn stable_hash(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in s.bytes() {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
