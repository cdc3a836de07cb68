//
//  atlassian-operations
//  api/client.rs
//
//  Created by Ngonidzashe Mangudya on 2026/10/19.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # HTTP Client
//!
//! [`HttpClient`] owns the transport-level settings shared by every request
//! to one backend and hands out pre-configured [`Request`]s.
//!
//! ## Features
//!
//! - Optional base URL applied to every request
//! - Authorization header derived from the active [`AuthStrategy`]
//! - Bounded retries with exponential or jittered backoff
//! - Retry hooks and extra retry conditions
//! - Cancellation token and per-attempt timeout inherited by requests
//!
//! The client is configured once, then shared immutably. Settings changed
//! after a request was created do not affect that request.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;

use super::common::ClientError;
use super::request::Request;
use super::retry::{Backoff, RetryCheck, RetryHook, RetryPolicy};
use crate::auth::AuthStrategy;

/// Retries after the first attempt unless configured otherwise.
pub const DEFAULT_RETRY_MAX: u32 = 4;
/// Lower backoff bound unless configured otherwise.
pub const DEFAULT_RETRY_WAIT_MIN: Duration = Duration::from_secs(1);
/// Upper backoff bound unless configured otherwise.
pub const DEFAULT_RETRY_WAIT_MAX: Duration = Duration::from_secs(30);

/// Snapshot of the settings a request needs to send and retry.
#[derive(Clone)]
pub(crate) struct Transport {
    pub(crate) http: Client,
    pub(crate) retry_max: u32,
    pub(crate) retry_wait_min: Duration,
    pub(crate) retry_wait_max: Duration,
    pub(crate) backoff: Backoff,
    pub(crate) policy: RetryPolicy,
    pub(crate) hooks: Vec<Arc<dyn RetryHook>>,
}

/// Retry-capable HTTP client for one backend.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
///
/// use atlassian_operations::api::{ErrorCodeToObjectMap, HttpClient};
/// use atlassian_operations::auth::AuthStrategy;
///
/// # async fn example() -> Result<(), atlassian_operations::api::ClientError> {
/// let mut client = HttpClient::new()?;
/// client
///     .configure(
///         "https://api.atlassian.com/jsm/ops/api/cloud-id/",
///         4,
///         Duration::from_secs(1),
///         Duration::from_secs(30),
///     )
///     .set_auth(AuthStrategy::basic("me@example.com", "api-token"));
///
/// let mut request = client.new_request();
/// request
///     .join_base_url("v1/alerts")
///     .set_error_parse_map(ErrorCodeToObjectMap::ops());
/// let response = request.send().await?;
/// println!("status {:?}", response.status_code());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpClient {
    transport: Transport,
    base_url: Option<String>,
    auth: AuthStrategy,
    cancellation: Option<CancellationToken>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("auth", &self.auth)
            .field("retry_max", &self.transport.retry_max)
            .field("retry_wait_min", &self.transport.retry_wait_min)
            .field("retry_wait_max", &self.transport.retry_wait_max)
            .field("backoff", &self.transport.backoff)
            .field("hooks", &self.transport.hooks.len())
            .field("conditions", &self.transport.policy.condition_count())
            .finish()
    }
}

impl HttpClient {
    /// Creates a client with default retry settings and no auth.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Build`] when the TLS backend cannot be
    /// initialised.
    pub fn new() -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self::with_http(http))
    }

    /// Creates a client around an existing `reqwest::Client`.
    pub fn with_http(http: Client) -> Self {
        Self {
            transport: Transport {
                http,
                retry_max: DEFAULT_RETRY_MAX,
                retry_wait_min: DEFAULT_RETRY_WAIT_MIN,
                retry_wait_max: DEFAULT_RETRY_WAIT_MAX,
                backoff: Backoff::default(),
                policy: RetryPolicy::default(),
                hooks: Vec::new(),
            },
            base_url: None,
            auth: AuthStrategy::None,
            cancellation: None,
            timeout: None,
        }
    }

    /// Sets the base URL and retry bounds in one call. No validation happens
    /// here; a bad URL surfaces when a request is sent.
    pub fn configure(
        &mut self,
        base_url: impl Into<String>,
        retry_max: u32,
        retry_wait_min: Duration,
        retry_wait_max: Duration,
    ) -> &mut Self {
        self.set_base_url(base_url)
            .set_retry_max(retry_max)
            .set_retry_wait(retry_wait_min, retry_wait_max)
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) -> &mut Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Number of retries after the first attempt.
    pub fn set_retry_max(&mut self, retry_max: u32) -> &mut Self {
        self.transport.retry_max = retry_max;
        self
    }

    pub fn set_retry_wait(&mut self, min: Duration, max: Duration) -> &mut Self {
        self.transport.retry_wait_min = min;
        self.transport.retry_wait_max = max;
        self
    }

    pub fn set_backoff(&mut self, backoff: Backoff) -> &mut Self {
        self.transport.backoff = backoff;
        self
    }

    /// Replaces the active auth strategy.
    pub fn set_auth(&mut self, auth: AuthStrategy) -> &mut Self {
        self.auth = auth;
        self
    }

    /// Appends a hook run before every retry, in registration order.
    pub fn add_retry_hook<H: RetryHook + 'static>(&mut self, hook: H) -> &mut Self {
        self.transport.hooks.push(Arc::new(hook));
        self
    }

    /// Appends a condition OR'd with the base retry policy.
    pub fn add_retry_condition<F>(&mut self, condition: F) -> &mut Self
    where
        F: Fn(&RetryCheck<'_>) -> bool + Send + Sync + 'static,
    {
        self.transport.policy.add_condition(condition);
        self
    }

    /// Replaces the base retry policy. Custom conditions are kept.
    pub fn set_base_retry_policy<F>(&mut self, policy: F) -> &mut Self
    where
        F: Fn(&RetryCheck<'_>) -> bool + Send + Sync + 'static,
    {
        self.transport.policy.set_base(policy);
        self
    }

    /// Token inherited by every request created afterwards.
    pub fn set_cancellation_token(&mut self, token: CancellationToken) -> &mut Self {
        self.cancellation = Some(token);
        self
    }

    /// Per-attempt timeout inherited by every request created afterwards.
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn auth(&self) -> &AuthStrategy {
        &self.auth
    }

    pub fn retry_max(&self) -> u32 {
        self.transport.retry_max
    }

    /// `(min, max)` backoff bounds.
    pub fn retry_wait(&self) -> (Duration, Duration) {
        (self.transport.retry_wait_min, self.transport.retry_wait_max)
    }

    pub fn backoff(&self) -> Backoff {
        self.transport.backoff
    }

    pub fn retry_hook_count(&self) -> usize {
        self.transport.hooks.len()
    }

    pub fn retry_condition_count(&self) -> usize {
        self.transport.policy.condition_count()
    }

    /// Creates a request carrying the base URL and Authorization header.
    ///
    /// Performs no I/O.
    pub fn new_request(&self) -> Request {
        let mut request = Request::new(
            self.transport.clone(),
            self.base_url.as_deref(),
            &self.auth,
        );
        if let Some(token) = &self.cancellation {
            request.set_cancellation_token(token.clone());
        }
        if let Some(timeout) = self.timeout {
            request.set_timeout(timeout);
        }
        request
    }
}
