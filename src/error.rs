//! Error taxonomy for the scrape pipeline.
//!
//! Almost everything in the extraction cascade is recoverable: a failure at
//! one step means "try the next strategy", so most of these values are logged
//! and dropped rather than propagated. Only [`ScrapeError::Config`] and
//! [`ScrapeError::Storage`] are allowed to end a cycle.

use thiserror::Error;

/// Failure of a single HTTP GET after retries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Statuses worth another attempt: throttling and transient upstream errors.
    pub fn is_retryable_status(status: u16) -> bool {
        matches!(status, 429 | 500 | 502 | 503 | 504)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = e.status() {
            FetchError::HttpStatus(status.as_u16())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// Run-level error taxonomy.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("content below quality floor: {0}")]
    Quality(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("storage unavailable: {0}")]
    Storage(String),
}

impl From<FetchError> for ScrapeError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::HttpStatus(s) => ScrapeError::HttpStatus(s),
            FetchError::InvalidUrl(u) => ScrapeError::Parse(format!("invalid url {u}")),
            other => ScrapeError::Network(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        for s in [429, 500, 502, 503, 504] {
            assert!(FetchError::is_retryable_status(s), "{s} should retry");
        }
        for s in [200, 301, 400, 403, 404, 501] {
            assert!(!FetchError::is_retryable_status(s), "{s} should not retry");
        }
    }

    #[test]
    fn test_fetch_error_maps_into_taxonomy() {
        assert!(matches!(
            ScrapeError::from(FetchError::HttpStatus(503)),
            ScrapeError::HttpStatus(503)
        ));
        assert!(matches!(
            ScrapeError::from(FetchError::Timeout),
            ScrapeError::Network(_)
        ));
        assert!(matches!(
            ScrapeError::from(FetchError::InvalidUrl("x".into())),
            ScrapeError::Parse(_)
        ));
    }
}
