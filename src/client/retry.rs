//! Retry policy for transient Trello failures.
//!
//! Two waits are in play:
//!
//! - **Rate limiting (429)**: wait for the advisory `Retry-After`, or a fixed
//!   default when the header is missing.
//! - **Server errors (5xx) and transport failures**: exponential backoff that
//!   doubles from [`RetryPolicy::base_delay`] and is capped at
//!   [`RetryPolicy::max_delay`].
//!
//! Waiting goes through the [`Sleeper`] trait so tests can record delays
//! instead of sleeping.

use std::time::Duration;

use async_trait::async_trait;
use backon::{BackoffBuilder, ExponentialBuilder};
use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Bounds and delays for one logical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// First exponential backoff delay.
    pub base_delay: Duration,
    /// Ceiling for exponential backoff delays.
    pub max_delay: Duration,
    /// Wait used for a 429 without a usable `Retry-After` header.
    pub rate_limit_wait: Duration,
    /// Ceiling applied to advisory `Retry-After` values.
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            rate_limit_wait: Duration::from_secs(1),
            max_retry_after: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// Delay schedule for 5xx and transport failures.
    ///
    /// Yields at most `max_attempts - 1` delays, one per retry.
    pub fn backoff(&self) -> impl Iterator<Item = Duration> {
        ExponentialBuilder::default()
            .with_factor(2.0)
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
            .build()
    }

    /// Wait before retrying a 429, given the advisory value in seconds.
    pub fn rate_limit_delay(&self, retry_after: Option<u64>) -> Duration {
        match retry_after {
            Some(secs) => Duration::from_secs(secs).min(self.max_retry_after),
            None => self.rate_limit_wait,
        }
    }
}

/// Classification of one HTTP status for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    RateLimited,
    ServerError,
    ClientError,
}

pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        429 => StatusClass::RateLimited,
        500..=599 => StatusClass::ServerError,
        _ => StatusClass::ClientError,
    }
}

/// Read `Retry-After` as whole seconds.
///
/// HTTP-date values are not used by Trello and are treated as absent.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

/// Suspends the current operation between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.rate_limit_wait, Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            ..RetryPolicy::default()
        };
        let delays: Vec<Duration> = policy.backoff().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(5),
            ]
        );
    }

    #[test]
    fn test_single_attempt_has_no_backoff() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff().count(), 0);
    }

    #[test]
    fn test_rate_limit_delay_prefers_header() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.rate_limit_delay(Some(4)), Duration::from_secs(4));
        assert_eq!(policy.rate_limit_delay(None), Duration::from_secs(1));
        assert_eq!(policy.rate_limit_delay(Some(3600)), Duration::from_secs(120));
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(200), StatusClass::Success);
        assert_eq!(classify_status(204), StatusClass::Success);
        assert_eq!(classify_status(429), StatusClass::RateLimited);
        assert_eq!(classify_status(500), StatusClass::ServerError);
        assert_eq!(classify_status(503), StatusClass::ServerError);
        assert_eq!(classify_status(400), StatusClass::ClientError);
        assert_eq!(classify_status(403), StatusClass::ClientError);
        assert_eq!(classify_status(404), StatusClass::ClientError);
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(parse_retry_after(&headers), Some(12));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[tokio::test]
    async fn test_tokio_sleeper_sleeps() {
        let start = std::time::Instant::now();
        TokioSleeper.sleep(Duration::from_millis(20)).await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
