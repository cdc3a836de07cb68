//
//  atlassian-operations
//  api/retry.rs
//
//  Created by Ngonidzashe Mangudya on 2026/10/19.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Retry Policy
//!
//! Decides whether a failed attempt is retried, how long to wait, and what
//! runs in between.
//!
//! ## Decision order
//!
//! 1. A body that failed to decode into the success sink or error shape is
//!    permanent and never retried, whatever the status code.
//! 2. The base policy ([`default_retry_policy`] unless replaced): transport
//!    errors and 5xx responses other than 501.
//! 3. Custom conditions in registration order; the first `true` wins.
//!
//! ## Hooks
//!
//! [`RetryHook`]s run after an attempt is judged retryable and before the
//! backoff sleep. Any closure `Fn(&RetryAttempt) -> anyhow::Result<()>` is a
//! hook. An error from a hook stops the loop and becomes the result of `send`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Method, StatusCode};

/// What a retry predicate gets to look at for one finished attempt.
#[derive(Debug)]
pub struct RetryCheck<'a> {
    /// Request method.
    pub method: &'a Method,
    /// Final request URL, query included.
    pub url: &'a str,
    /// 1-based attempt number that just finished.
    pub attempt: u32,
    /// Response status, when a response was received.
    pub status: Option<StatusCode>,
    /// Response headers, when a response was received.
    pub headers: Option<&'a HeaderMap>,
    /// Transport error, when no usable response was received.
    pub error: Option<&'a reqwest::Error>,
    /// Body decode failure for the success sink or error shape.
    pub decode_error: Option<&'a serde_json::Error>,
}

impl RetryCheck<'_> {
    /// Whether this attempt can never succeed by retrying.
    pub fn is_permanent(&self) -> bool {
        self.decode_error.is_some() || self.error.is_some_and(reqwest::Error::is_decode)
    }
}

/// A predicate over a finished attempt.
pub type RetryCondition = Arc<dyn Fn(&RetryCheck<'_>) -> bool + Send + Sync>;

/// The base policy: retry transport errors and server errors.
///
/// Transport errors raised while building the request or following redirects
/// are not retried; they fail the same way every time. 501 Not Implemented is
/// not retried either.
pub fn default_retry_policy(check: &RetryCheck<'_>) -> bool {
    if let Some(err) = check.error {
        return !(err.is_builder() || err.is_redirect());
    }

    check
        .status
        .is_some_and(|s| s.is_server_error() && s != StatusCode::NOT_IMPLEMENTED)
}

/// Base policy OR'd with caller-supplied conditions.
#[derive(Clone)]
pub struct RetryPolicy {
    base: RetryCondition,
    conditions: Vec<RetryCondition>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base: Arc::new(default_retry_policy),
            conditions: Vec::new(),
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("conditions", &self.conditions.len())
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// Replaces the base policy.
    pub fn set_base<F>(&mut self, base: F)
    where
        F: Fn(&RetryCheck<'_>) -> bool + Send + Sync + 'static,
    {
        self.base = Arc::new(base);
    }

    /// Appends a custom condition.
    pub fn add_condition<F>(&mut self, condition: F)
    where
        F: Fn(&RetryCheck<'_>) -> bool + Send + Sync + 'static,
    {
        self.conditions.push(Arc::new(condition));
    }

    /// Number of custom conditions registered.
    pub fn condition_count(&self) -> usize {
        self.conditions.len()
    }

    /// Decides whether the attempt described by `check` is retried.
    pub fn should_retry(&self, check: &RetryCheck<'_>) -> bool {
        if check.is_permanent() {
            return false;
        }
        if (self.base)(check) {
            return true;
        }
        self.conditions.iter().any(|condition| condition(check))
    }
}

/// Describes a retry that is about to happen. Passed to every [`RetryHook`].
#[derive(Debug, Clone)]
pub struct RetryAttempt {
    pub method: Method,
    pub url: String,
    /// 1-based number of the attempt that failed.
    pub attempt: u32,
    /// Status of the failed attempt, if a response arrived.
    pub status: Option<u16>,
    /// Transport error of the failed attempt, rendered.
    pub error: Option<String>,
    /// How long the client will wait before the next attempt.
    pub wait: Duration,
}

/// Side-effecting callback run before each retry.
#[async_trait]
pub trait RetryHook: Send + Sync {
    async fn before_retry(&self, attempt: &RetryAttempt) -> anyhow::Result<()>;
}

#[async_trait]
impl<F> RetryHook for F
where
    F: Fn(&RetryAttempt) -> anyhow::Result<()> + Send + Sync,
{
    async fn before_retry(&self, attempt: &RetryAttempt) -> anyhow::Result<()> {
        self(attempt)
    }
}

/// How the wait between attempts grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backoff {
    /// `min * 2^(retry - 1)`, capped at `max`. A `Retry-After` header on a
    /// 429 or 503 takes precedence.
    #[default]
    Exponential,
    /// `(min + random[0, max - min)) * retry`.
    LinearJitter,
}

impl Backoff {
    /// Wait before retry number `retry` (1-based).
    pub fn delay(&self, min: Duration, max: Duration, retry: u32, retry_after: Option<Duration>) -> Duration {
        let retry = retry.max(1);
        match self {
            Self::Exponential => {
                if let Some(wait) = retry_after {
                    return wait.min(max);
                }
                let factor = 2u32.checked_pow(retry - 1).unwrap_or(u32::MAX);
                min.checked_mul(factor).unwrap_or(max).min(max)
            }
            Self::LinearJitter => {
                if max <= min {
                    return min.saturating_mul(retry);
                }
                let span = (max - min).as_nanos().min(u64::MAX as u128) as u64;
                let jitter = Duration::from_nanos(rand::rng().random_range(0..span));
                (min + jitter).saturating_mul(retry)
            }
        }
    }
}

/// Reads a `Retry-After` header given in seconds.
///
/// Only 429 and 503 responses carry a meaningful value.
pub fn retry_after(status: StatusCode, headers: &HeaderMap) -> Option<Duration> {
    if status != StatusCode::TOO_MANY_REQUESTS && status != StatusCode::SERVICE_UNAVAILABLE {
        return None;
    }
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn check(method: &Method, status: Option<StatusCode>) -> RetryCheck<'_> {
        RetryCheck {
            method,
            url: "https://example.com",
            attempt: 1,
            status,
            headers: None,
            error: None,
            decode_error: None,
        }
    }

    #[test]
    fn test_default_policy_statuses() {
        for code in [500, 502, 503, 504] {
            assert!(default_retry_policy(&check(&Method::GET, StatusCode::from_u16(code).ok())));
        }
        for code in [200, 400, 404, 429, 501] {
            assert!(!default_retry_policy(&check(&Method::GET, StatusCode::from_u16(code).ok())));
        }
    }

    #[test]
    fn test_conditions_are_ored() {
        let get = Method::GET;
        let mut policy = RetryPolicy::default();
        assert!(!policy.should_retry(&check(&get, Some(StatusCode::CONFLICT))));

        policy.add_condition(|_| false);
        policy.add_condition(|c| c.status == Some(StatusCode::CONFLICT));
        assert_eq!(policy.condition_count(), 2);
        assert!(policy.should_retry(&check(&get, Some(StatusCode::CONFLICT))));
        assert!(!policy.should_retry(&check(&get, Some(StatusCode::NOT_FOUND))));
    }

    #[test]
    fn test_decode_error_overrides_everything() {
        let mut policy = RetryPolicy::default();
        policy.add_condition(|_| true);

        let get = Method::GET;
        let decode = serde_json::from_str::<u32>("nope").unwrap_err();
        let mut c = check(&get, Some(StatusCode::INTERNAL_SERVER_ERROR));
        c.decode_error = Some(&decode);
        assert!(c.is_permanent());
        assert!(!policy.should_retry(&c));
    }

    #[test]
    fn test_replaced_base_policy() {
        let mut policy = RetryPolicy::default();
        policy.set_base(|_| false);
        assert!(!policy.should_retry(&check(&Method::GET, Some(StatusCode::BAD_GATEWAY))));
    }

    #[test]
    fn test_exponential_backoff() {
        let min = Duration::from_millis(100);
        let max = Duration::from_millis(1000);
        let b = Backoff::Exponential;
        assert_eq!(b.delay(min, max, 1, None), Duration::from_millis(100));
        assert_eq!(b.delay(min, max, 2, None), Duration::from_millis(200));
        assert_eq!(b.delay(min, max, 3, None), Duration::from_millis(400));
        assert_eq!(b.delay(min, max, 5, None), max);
        assert_eq!(b.delay(min, max, 60, None), max);
        assert_eq!(b.delay(min, max, 1, Some(Duration::from_millis(700))), Duration::from_millis(700));
        assert_eq!(b.delay(min, max, 1, Some(Duration::from_secs(60))), max);
    }

    #[test]
    fn test_linear_jitter_bounds() {
        let min = Duration::from_millis(10);
        let max = Duration::from_millis(20);
        for retry in 1..5 {
            let wait = Backoff::LinearJitter.delay(min, max, retry, None);
            assert!(wait >= min * retry);
            assert!(wait < max * retry);
        }
        assert_eq!(Backoff::LinearJitter.delay(max, min, 3, None), max * 3);
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(
            retry_after(StatusCode::TOO_MANY_REQUESTS, &headers),
            Some(Duration::from_secs(7))
        );
        assert_eq!(retry_after(StatusCode::INTERNAL_SERVER_ERROR, &headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after(StatusCode::SERVICE_UNAVAILABLE, &headers), None);
    }

    #[tokio::test]
    async fn test_closure_is_a_hook() {
        let hook = |attempt: &RetryAttempt| {
            anyhow::ensure!(attempt.attempt < 2, "too many");
            Ok(())
        };
        let mut attempt = RetryAttempt {
            method: Method::GET,
            url: "https://example.com".to_string(),
            attempt: 1,
            status: Some(500),
            error: None,
            wait: Duration::from_millis(1),
        };
        assert!(hook.before_retry(&attempt).await.is_ok());
        attempt.attempt = 2;
        assert!(hook.before_retry(&attempt).await.is_err());
    }
}
