//! Command-line interface definitions for the scraper.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Secrets and the backend address can also be provided via environment
//! variables.

use clap::Parser;

/// Command-line arguments for one scrape cycle.
///
/// # Examples
///
/// ```sh
/// # Built-in outlets, results written as JSON
/// pulse_scraper -j ./output
///
/// # Sources and settings from files, results posted to the backend
/// pulse_scraper --sources sources.yaml --config scraper.yaml \
///     --api-base-url http://localhost:5000
///
/// # One outlet only, with headline rephrasing
/// pulse_scraper --only "The Hindu" --rephrase
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for the JSON batch file
    #[arg(short, long, default_value = "./output")]
    pub json_output_dir: String,

    /// Optional path to a YAML scraper settings file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Optional path to a YAML list of sources (name, url, active)
    #[arg(short, long)]
    pub sources: Option<String>,

    /// Scrape only the source with this name
    #[arg(long)]
    pub only: Option<String>,

    /// Base URL of the storage backend; when set, sources are read from and
    /// articles are posted to it instead of the JSON directory
    #[arg(long, env = "PULSE_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Bearer token for the storage backend
    #[arg(long, env = "MASTER_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Rephrase headlines through the chat-completions service
    #[arg(long)]
    pub rephrase: bool,

    /// API key for the headline rephrasing service
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub openrouter_api_key: Option<String>,
}
