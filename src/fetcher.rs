//! HTTP GET with browser-like headers, bounded retries and per-host politeness.
//!
//! # Retry Strategy
//!
//! Only idempotent GETs are issued, and only throttling / transient upstream
//! statuses (429, 500, 502, 503, 504) are retried:
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=jitter)
//! ```
//!
//! Total attempts are bounded by [`RetryPolicy::max_attempts`] (3 by default).
//! Timeouts and connection failures are returned immediately; the caller
//! treats them as "nothing from this path" and moves to the next strategy.
//!
//! # Politeness
//!
//! [`HostThrottle`] hands out request slots per host spaced by a jittered gap,
//! so concurrent workers hitting the same outlet are serialized.

use crate::config::ScraperSettings;
use crate::error::FetchError;
use rand::{Rng, rng};
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, instrument, warn};
use url::Url;

const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) ",
    "AppleWebKit/537.36 (KHTML, like Gecko) ",
    "Chrome/127.0.0.0 Safari/537.36"
);

/// Exponential backoff parameters for retryable statuses.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: Duration,
}

impl RetryPolicy {
    /// Delay before the attempt following failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: usize) -> Duration {
        let shift = attempt.saturating_sub(1).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            delay
        } else {
            delay + Duration::from_millis(rng().random_range(0..=jitter_ms))
        }
    }
}

impl From<&ScraperSettings> for RetryPolicy {
    fn from(s: &ScraperSettings) -> Self {
        Self {
            max_attempts: s.max_attempts.max(1),
            base_delay: Duration::from_millis(s.backoff_base_ms),
            max_delay: Duration::from_millis(s.backoff_max_ms),
            jitter: Duration::from_millis(s.backoff_jitter_ms),
        }
    }
}

/// Spaces requests to the same host by a jittered gap.
pub struct HostThrottle {
    min_gap: Duration,
    max_gap: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl HostThrottle {
    pub fn new(min_gap: Duration, max_gap: Duration) -> Self {
        Self {
            min_gap,
            max_gap: max_gap.max(min_gap),
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    fn gap(&self) -> Duration {
        let (lo, hi) = (self.min_gap.as_millis() as u64, self.max_gap.as_millis() as u64);
        if hi <= lo {
            self.min_gap
        } else {
            Duration::from_millis(rng().random_range(lo..=hi))
        }
    }

    /// Reserve the next slot for `host` and sleep until it arrives.
    pub async fn wait(&self, host: &str) {
        let slot = {
            let mut slots = self
                .next_slot
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let now = Instant::now();
            let slot = slots
                .get(host)
                .copied()
                .filter(|t| *t > now)
                .unwrap_or(now);
            slots.insert(host.to_string(), slot + self.gap());
            slot
        };
        if slot > Instant::now() {
            debug!(host, wait_ms = (slot - Instant::now()).as_millis() as u64, "Politeness delay");
            sleep_until(slot).await;
        }
    }
}

impl fmt::Debug for HostThrottle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostThrottle")
            .field("min_gap", &self.min_gap)
            .field("max_gap", &self.max_gap)
            .finish()
    }
}

/// Shared HTTP client for feeds, listing pages and articles.
#[derive(Debug)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
    throttle: HostThrottle,
}

impl Fetcher {
    pub fn new(settings: &ScraperSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers({
                let mut h = HeaderMap::new();
                h.insert(
                    ACCEPT,
                    HeaderValue::from_static(
                        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                    ),
                );
                h.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
                h
            })
            .pool_idle_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            client,
            policy: RetryPolicy::from(settings),
            throttle: HostThrottle::new(
                Duration::from_millis(settings.politeness_min_ms),
                Duration::from_millis(settings.politeness_max_ms),
            ),
        })
    }

    /// GET `url`, retrying retryable statuses, and return the raw body.
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }
        let host = parsed.host_str().unwrap_or_default().to_string();

        let mut attempt = 0usize;
        loop {
            attempt += 1;
            self.throttle.wait(&host).await;

            let response = self.client.get(parsed.clone()).timeout(timeout).send().await;
            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    let err = FetchError::from(e);
                    warn!(attempt, error = %err, "GET failed");
                    return Err(err);
                }
            };

            let status = response.status().as_u16();
            if response.status().is_success() {
                let body = response.bytes().await.map_err(FetchError::from)?;
                debug!(attempt, bytes = body.len(), "GET succeeded");
                return Ok(body.to_vec());
            }

            if !FetchError::is_retryable_status(status) || attempt >= self.policy.max_attempts {
                warn!(attempt, status, max = self.policy.max_attempts, "GET gave up");
                return Err(FetchError::HttpStatus(status));
            }

            let delay = self.policy.delay_after(attempt);
            warn!(attempt, status, ?delay, "Retryable status; backing off");
            sleep(delay).await;
        }
    }

    /// [`Fetcher::fetch`] decoded as UTF-8, replacing invalid sequences.
    pub async fn fetch_text(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let bytes = self.fetch(url, timeout).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
pub(crate) fn test_settings() -> ScraperSettings {
    ScraperSettings {
        backoff_base_ms: 1,
        backoff_max_ms: 5,
        backoff_jitter_ms: 0,
        politeness_min_ms: 0,
        politeness_max_ms: 0,
        feed_timeout_secs: 5,
        listing_timeout_secs: 5,
        article_timeout_secs: 5,
        source_timeout_secs: 30,
        ..ScraperSettings::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            jitter: Duration::ZERO,
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(300));
        assert_eq!(policy.delay_after(10), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_settings()).unwrap();
        let body = fetcher
            .fetch_text(&format!("{}/ok", server.uri()), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn test_fetch_retries_server_errors_up_to_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_settings()).unwrap();
        let err = fetcher
            .fetch(&format!("{}/flaky", server.uri()), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::HttpStatus(503));
    }

    #[tokio::test]
    async fn test_fetch_does_not_retry_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_settings()).unwrap();
        let err = fetcher
            .fetch(&format!("{}/missing", server.uri()), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::HttpStatus(404));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_settings()).unwrap();
        let err = fetcher
            .fetch(&format!("{}/slow", server.uri()), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Timeout);
    }

    #[tokio::test]
    async fn test_fetch_rejects_pseudo_urls() {
        let fetcher = Fetcher::new(&test_settings()).unwrap();
        for url in ["javascript:void(0)", "mailto:desk@example.com", "not a url"] {
            assert!(matches!(
                fetcher.fetch(url, Duration::from_secs(1)).await,
                Err(FetchError::InvalidUrl(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_throttle_spaces_same_host() {
        let throttle = HostThrottle::new(Duration::from_millis(40), Duration::from_millis(40));
        let t0 = Instant::now();
        throttle.wait("example.com").await;
        throttle.wait("example.com").await;
        throttle.wait("other.org").await;
        let elapsed = t0.elapsed();
        assert!(elapsed >= Duration::from_millis(40));
        assert!(elapsed < Duration::from_millis(400));
    }
}
