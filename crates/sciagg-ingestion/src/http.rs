//! Rate-limited HTTP access shared by every source client.
//!
//! Each client owns one [`HttpClient`], and with it one [`RateLimiter`]; limiters
//! are never shared between sources. Requests that fail with 429, 5xx or a
//! connection problem are retried with exponential backoff.

use std::time::Duration;

use reqwest::StatusCode;
use sciagg_common::Source;
use tokio::sync::Mutex;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, warn};

use crate::error::{HarvestError, Result};

const USER_AGENT: &str = concat!(
    "sciagg/",
    env!("CARGO_PKG_VERSION"),
    " (personal literature aggregator)"
);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ── Rate limiter ─────────────────────────────────────────────────────────────

/// Enforces a minimum interval between request starts.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// `rpm` requests per minute; zero disables the limit.
    pub fn per_minute(rpm: u32) -> Self {
        let min_interval = if rpm == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(60.0 / f64::from(rpm))
        };
        Self { min_interval, last_request: Mutex::new(None) }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the next request may start, then claim the slot.
    ///
    /// The lock is held while sleeping so concurrent callers queue up behind
    /// each other instead of all waking at the same instant.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let next = prev + self.min_interval;
            if next > Instant::now() {
                sleep_until(next).await;
            }
        }
        *last = Some(Instant::now());
    }
}

// ── Retry policy ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`: 1s, 2s, 4s, ...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs(1) }
    }
}

// ── Client ───────────────────────────────────────────────────────────────────

pub struct HttpClient {
    client: reqwest::Client,
    limiter: RateLimiter,
    retry: RetryPolicy,
    origin: Source,
}

impl HttpClient {
    pub fn new(origin: Source, requests_per_minute: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            limiter: RateLimiter::per_minute(requests_per_minute),
            retry: RetryPolicy::default(),
            origin,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn origin(&self) -> Source {
        self.origin
    }

    /// GET `url` with `query` and return the body as text.
    pub async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        let mut last_error = String::new();

        for attempt in 1..=self.retry.max_attempts {
            self.limiter.acquire().await;
            debug!(source = %self.origin, url, attempt, "GET");

            match self.client.get(url).query(query).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        match resp.text().await {
                            Ok(body) => return Ok(body),
                            Err(e) => last_error = format!("reading body: {e}"),
                        }
                    } else if is_retryable_status(status) {
                        last_error = format!("HTTP {status}");
                    } else {
                        return Err(HarvestError::Permanent {
                            origin: self.origin,
                            message: format!("HTTP {status} from {url}"),
                        });
                    }
                }
                Err(e) if e.is_builder() => {
                    return Err(HarvestError::Permanent {
                        origin: self.origin,
                        message: e.to_string(),
                    });
                }
                Err(e) => last_error = e.to_string(),
            }

            if attempt < self.retry.max_attempts {
                let delay = self.retry.delay_after(attempt);
                warn!(
                    source = %self.origin,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %last_error,
                    "Request failed, retrying"
                );
                sleep(delay).await;
            }
        }

        Err(HarvestError::Transient {
            origin: self.origin,
            attempts: self.retry.max_attempts,
            message: last_error,
        })
    }

    /// GET `url` and decode the body as JSON.
    pub async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<serde_json::Value> {
        let body = self.get_text(url, query).await?;
        serde_json::from_str(&body).map_err(|e| HarvestError::Parse {
            origin: self.origin,
            message: e.to_string(),
        })
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_interval_from_rpm() {
        assert_eq!(RateLimiter::per_minute(10).min_interval(), Duration::from_secs(6));
        assert_eq!(RateLimiter::per_minute(120).min_interval(), Duration::from_millis(500));
        assert_eq!(RateLimiter::per_minute(0).min_interval(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_limiter_spaces_requests() {
        let limiter = RateLimiter::per_minute(30);
        let start = Instant::now();
        for _ in 0..4 {
            limiter.acquire().await;
        }
        // Four requests at 30 rpm: three full 2s gaps.
        assert!(start.elapsed() >= Duration::from_secs(6));
        assert!(start.elapsed() < Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_limiter_first_request_is_immediate() {
        let limiter = RateLimiter::per_minute(1);
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
    }
}
