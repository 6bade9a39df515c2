//! Optional headline rephrasing through an OpenAI-compatible chat API.
//!
//! - [`Rephrase`]: async headline rewrite
//! - [`ChatRephraser`]: chat-completions client (OpenRouter by default)
//! - [`RetryRephrase`]: decorator adding exponential backoff with jitter
//!
//! A rewrite is always optional: [`rephrase_or_keep`] turns every failure
//! into `None`, and the caller keeps the original headline.

use rand::{Rng, rng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "mistralai/mistral-7b-instruct:free";

/// Rewrites a headline.
pub trait Rephrase {
    async fn rephrase(&self, headline: &str, source_name: &str) -> Result<String, Box<dyn Error>>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Chat-completions client.
#[derive(Debug, Clone)]
pub struct ChatRephraser {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl ChatRephraser {
    pub fn new(api_key: &str) -> Result<Self, Box<dyn Error>> {
        Self::with_endpoint(api_key, DEFAULT_ENDPOINT, DEFAULT_MODEL)
    }

    pub fn with_endpoint(api_key: &str, endpoint: &str, model: &str) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

fn prompt(headline: &str, source_name: &str) -> String {
    format!(
        "Rephrase this news headline from {source_name} so it keeps the same facts \
         but uses different wording. Reply with the headline only.\n\n{headline}"
    )
}

/// Strip whitespace and one layer of surrounding quotes.
pub fn clean_headline(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = ['"', '\'', '“', '”']
        .iter()
        .fold(trimmed, |s, q| s.strip_prefix(*q).unwrap_or(s));
    let unquoted = ['"', '\'', '“', '”']
        .iter()
        .fold(unquoted, |s, q| s.strip_suffix(*q).unwrap_or(s));
    unquoted.trim().to_string()
}

impl Rephrase for ChatRephraser {
    #[instrument(level = "debug", skip_all)]
    async fn rephrase(&self, headline: &str, source_name: &str) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".into(),
                content: prompt(headline, source_name),
            }],
            max_tokens: 100,
            temperature: 0.7,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        let body: ChatResponse = response.json().await?;
        let text = body
            .choices
            .into_iter()
            .next()
            .map(|c| clean_headline(&c.message.content))
            .unwrap_or_default();
        debug!(elapsed_ms = t0.elapsed().as_millis() as u64, "Chat API answered");
        if text.is_empty() {
            return Err("empty rephrase".into());
        }
        Ok(text)
    }
}

/// Adds exponential backoff retry to any [`Rephrase`] implementation.
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryRephrase<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T: Rephrase> RetryRephrase<T> {
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl<T> RetryRephrase<T> {
    /// Delay before retry number `attempt` (1-based), without jitter.
    fn backoff(&self, attempt: usize) -> Duration {
        let shift = attempt.saturating_sub(1).min(16) as u32;
        self.base_delay.saturating_mul(1 << shift).min(self.max_delay)
    }
}

impl<T> fmt::Debug for RetryRephrase<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryRephrase")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T: Rephrase> Rephrase for RetryRephrase<T> {
    #[instrument(level = "debug", skip_all)]
    async fn rephrase(&self, headline: &str, source_name: &str) -> Result<String, Box<dyn Error>> {
        let mut attempt = 0usize;
        loop {
            match self.inner.rephrase(headline, source_name).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        error!(attempt, max = self.max_retries, error = %e, "rephrase() exhausted retries");
                        return Err(e);
                    }
                    let delay = self.backoff(attempt);
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);
                    warn!(attempt, max = self.max_retries, ?delay, error = %e, "rephrase() failed; backing off");
                    sleep(delay).await;
                }
            }
        }
    }
}

/// The rewritten headline, or `None` when the service fails or answers with
/// nothing new.
pub async fn rephrase_or_keep<R: Rephrase>(rephraser: &R, headline: &str, source_name: &str) -> Option<String> {
    match rephraser.rephrase(headline, source_name).await {
        Ok(text) if !text.is_empty() && text != headline => Some(text),
        Ok(_) => None,
        Err(e) => {
            warn!(source = source_name, error = %e, "Keeping original headline");
            None
        }
    }
}
