//! # Pulse Scraper
//!
//! A news scraping pipeline that collects headlines from a configured list of
//! outlets, extracts each article's full text and metadata, labels it by
//! category and region, and hands a balanced batch per outlet to storage.
//!
//! ## Features
//!
//! - Discovers candidates from RSS/Atom feeds, falling back to heuristic
//!   headline selectors on listing pages
//! - Extracts article text by content density, site selectors and paragraph
//!   scraping, with JSON-LD and meta-tag metadata
//! - Classifies category and Indian/international region from keyword tables
//! - Selects up to 20 articles per outlet (10 Indian, 10 international) with
//!   category diversity, never repeating a story across outlets
//! - Stores results in dated JSON files or posts them to a REST backend
//! - Optionally rephrases headlines through a chat-completions API
//!
//! ## Usage
//!
//! ```sh
//! pulse_scraper -j ./output
//! pulse_scraper --sources sources.yaml --api-base-url http://localhost:5000
//! ```
//!
//! ## Architecture
//!
//! 1. **Discovery**: feed, then listing page, per source
//! 2. **Extraction**: one fetch per candidate, bounded concurrency
//! 3. **Labelling**: category and region per article
//! 4. **Selection**: balanced batch per source, cross-source dedupe
//! 5. **Output**: JSON file or REST backend

use clap::Parser;
use futures::stream::{self, StreamExt};
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod classify;
mod cli;
mod config;
mod dedupe;
mod error;
mod fetcher;
mod models;
mod orchestrator;
mod outputs;
mod rephrase;
mod scrapers;
mod select;
mod strategy;
mod utils;

use classify::Classifier;
use cli::Cli;
use config::{ScraperSettings, default_sources, load_sources};
use fetcher::Fetcher;
use models::{ArticleRecord, SourceConfig};
use orchestrator::{Orchestrator, QualityReport};
use outputs::{Sink, json::JsonStore, persist, rest::RestStore};
use rephrase::{ChatRephraser, RetryRephrase, rephrase_or_keep};
use utils::ensure_writable_dir;

const REPHRASE_CONCURRENCY: usize = 4;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("pulse_scraper starting up");

    let args = Cli::parse();
    debug!(?args.json_output_dir, ?args.config, ?args.sources, "Parsed CLI arguments");

    let settings = ScraperSettings::load(args.config.as_deref())?;

    // ---- Storage sink ----
    let rest = match args.api_base_url.as_deref() {
        Some(base) => Some(RestStore::new(base, args.api_token.clone())?),
        None => None,
    };
    if rest.is_none() {
        if let Err(e) = ensure_writable_dir(&args.json_output_dir).await {
            error!(
                path = %args.json_output_dir,
                error = %e,
                "JSON output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    // ---- Sources ----
    let mut sources: Vec<SourceConfig> = match (&args.sources, &rest) {
        (Some(path), _) => load_sources(path)?,
        (None, Some(store)) => store.fetch_sources().await?,
        (None, None) => default_sources(),
    };
    if let Some(only) = args.only.as_deref() {
        sources.retain(|s| s.name.eq_ignore_ascii_case(only));
        if sources.is_empty() {
            warn!(only, "No configured source has that name");
        }
    }
    info!(count = sources.len(), "Loaded sources");

    // ---- Scrape ----
    let fetcher = Fetcher::new(&settings)?;
    let classifier = Classifier::default();
    let orchestrator = Orchestrator::new(&fetcher, &classifier, &settings);
    let outcome = orchestrator.run_cycle(&sources).await?;

    let mut records: Vec<ArticleRecord> = outcome.articles().map(ArticleRecord::from).collect();

    // ---- Optional headline rephrasing ----
    match (args.rephrase, args.openrouter_api_key.as_deref()) {
        (true, Some(key)) => {
            let rephraser = RetryRephrase::new(ChatRephraser::new(key)?, 2, std::time::Duration::from_secs(1));
            let rephraser = &rephraser;
            records = stream::iter(records)
                .map(|mut record| async move {
                    record.rephrased_title =
                        rephrase_or_keep(rephraser, &record.original_title, &record.source_name).await;
                    record
                })
                .buffered(REPHRASE_CONCURRENCY)
                .collect()
                .await;
            let rephrased = records.iter().filter(|r| r.rephrased_title.is_some()).count();
            info!(rephrased, total = records.len(), "Headline rephrasing complete");
        }
        (true, None) => warn!("--rephrase given without an API key; keeping original headlines"),
        _ => {}
    }

    // ---- Persist ----
    let sink = match rest {
        Some(store) => Sink::Rest(store),
        None => Sink::Json(JsonStore::new(&args.json_output_dir)),
    };
    let (saved, failed) = persist(&sink, &records, &outcome.reports).await?;

    // ---- Report ----
    for report in &outcome.reports {
        info!(
            source = %report.source,
            candidates = report.candidates,
            extracted = report.extracted,
            selected = report.selected,
            indian = report.indian,
            international = report.international,
            shortfall = report.shortfall,
            timed_out = report.timed_out,
            "Source yield"
        );
    }
    let quality = QualityReport::tally(outcome.articles(), settings.min_content_len);
    info!(
        total = quality.total,
        with_full_content = quality.with_full_content,
        with_media_refs = quality.with_media_refs,
        with_real_image = quality.with_real_image,
        with_author = quality.with_author,
        saved,
        failed,
        "Content quality"
    );

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
