//
//  atlassian-operations
//  api/request.rs
//
//  Created by Ngonidzashe Mangudya on 2026/10/19.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Request Builder
//!
//! A [`Request`] is obtained from [`HttpClient::new_request`](super::HttpClient::new_request),
//! already carrying the client's base URL and `Authorization` header. Every
//! mutator returns the same request so calls can be chained. Mistakes made
//! while building (a malformed header, a body that fails to serialize) are
//! remembered and returned by [`Request::send`] before any I/O happens.
//!
//! ## Sending
//!
//! `send` performs the exchange with retries:
//!
//! 1. Send the attempt (racing the cancellation token, if any).
//! 2. If a response arrived and a success sink or error map applies to its
//!    status, buffer the body and decode it. A decode failure is permanent.
//! 3. Ask the [`RetryPolicy`](super::RetryPolicy). If it declines, return.
//! 4. If `retry_max` retries are used up, give up with the attempt count.
//! 5. Release the failed body, run every hook, sleep the backoff, go to 1.
//!
//! A request is single-use: a second `send` returns
//! [`ClientError::AlreadySent`].

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::client::Transport;
use super::common::{ClientError, ErrorCodeToObjectMap};
use super::response::Response;
use super::retry::{retry_after, RetryAttempt, RetryCheck};
use crate::auth::AuthStrategy;

/// Target for the decoded body of a non-error response.
pub trait BodySink: Send + Sync {
    /// Decodes `body` and stores the result.
    fn decode(&self, body: &[u8]) -> Result<(), serde_json::Error>;
}

/// Shared slot a successful JSON body is decoded into.
///
/// Register a clone with [`Request::set_body_parse_object`], send, then
/// [`take`](Self::take) the value.
///
/// ```rust
/// use atlassian_operations::api::{BodySink, JsonSink};
///
/// let sink = JsonSink::<Vec<u32>>::new();
/// sink.decode(b"[1, 2, 3]").unwrap();
/// assert_eq!(sink.take(), Some(vec![1, 2, 3]));
/// assert_eq!(sink.take(), None);
/// ```
pub struct JsonSink<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> JsonSink<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Removes and returns the decoded value, if any.
    pub fn take(&self) -> Option<T> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    pub fn is_filled(&self) -> bool {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}

impl<T> Clone for JsonSink<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for JsonSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonSink<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSink")
            .field("filled", &self.is_filled())
            .finish()
    }
}

impl<T: DeserializeOwned + Send> BodySink for JsonSink<T> {
    fn decode(&self, body: &[u8]) -> Result<(), serde_json::Error> {
        let value = serde_json::from_slice(body)?;
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
        Ok(())
    }
}

/// A pending HTTP exchange.
pub struct Request {
    transport: Transport,
    method: Method,
    url: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<Bytes>,
    sink: Option<Box<dyn BodySink>>,
    error_map: Option<ErrorCodeToObjectMap>,
    cancellation: Option<CancellationToken>,
    timeout: Option<Duration>,
    build_error: Option<ClientError>,
    sent: bool,
}

/// What one attempt produced.
enum Outcome {
    Received(Response),
    Transport(reqwest::Error),
    Decode {
        status: StatusCode,
        headers: HeaderMap,
        source: serde_json::Error,
    },
}

impl Request {
    pub(crate) fn new(transport: Transport, base_url: Option<&str>, auth: &AuthStrategy) -> Self {
        let mut request = Self {
            transport,
            method: Method::GET,
            url: base_url.unwrap_or_default().to_string(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            sink: None,
            error_map: None,
            cancellation: None,
            timeout: None,
            build_error: None,
            sent: false,
        };
        request.set_auth(auth);
        request
    }

    /// Sets the HTTP method. Defaults to `GET`.
    pub fn method(&mut self, method: Method) -> &mut Self {
        self.method = method;
        self
    }

    /// Replaces the URL, including any base URL from the client.
    pub fn url(&mut self, url: impl Into<String>) -> &mut Self {
        self.url = url.into();
        self
    }

    /// Appends a path segment to the current URL with exactly one `/` between.
    pub fn join_base_url(&mut self, segment: &str) -> &mut Self {
        let segment = segment.trim_start_matches('/');
        if self.url.is_empty() {
            self.url = segment.to_string();
        } else {
            self.url = format!("{}/{}", self.url.trim_end_matches('/'), segment);
        }
        self
    }

    /// Sets a header, replacing any previous value.
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => self.fail(ClientError::InvalidHeader {
                name: name.to_string(),
            }),
        }
        self
    }

    /// Sets a query parameter. An empty value removes the parameter.
    pub fn set_query_param(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        if value.is_empty() {
            self.query.retain(|(k, _)| *k != key);
        } else if let Some(entry) = self.query.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.query.push((key, value));
        }
        self
    }

    /// Applies [`set_query_param`](Self::set_query_param) for every pair.
    pub fn set_query_params<I, K, V>(&mut self, params: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in params {
            self.set_query_param(key, value);
        }
        self
    }

    /// Serializes `body` as the JSON request body.
    ///
    /// A serialization failure is kept and returned by [`send`](Self::send).
    pub fn set_body<T: Serialize + ?Sized>(&mut self, body: &T) -> &mut Self {
        match serde_json::to_vec(body) {
            Ok(bytes) => {
                self.body = Some(Bytes::from(bytes));
                self.headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            Err(e) => self.fail(ClientError::BodyEncode(e)),
        }
        self
    }

    /// Overrides the client's auth with HTTP Basic for this request.
    pub fn set_basic_auth(&mut self, username: &str, password: &str) -> &mut Self {
        self.set_auth(&AuthStrategy::basic(username, password))
    }

    /// Overrides the client's auth with a bearer token for this request.
    pub fn set_bearer_auth(&mut self, token: &str) -> &mut Self {
        self.set_auth(&AuthStrategy::bearer(token))
    }

    /// Overrides the client's auth with an OAuth2 access token for this request.
    pub fn set_oauth2_auth(&mut self, access_token: &str) -> &mut Self {
        self.set_auth(&AuthStrategy::oauth2(access_token))
    }

    /// Overrides the client's auth for this request.
    pub fn set_auth(&mut self, auth: &AuthStrategy) -> &mut Self {
        if auth.is_expired() {
            tracing::warn!(scheme = auth.scheme(), "access token has expired");
        }
        match auth.header_value() {
            Ok(Some(value)) => {
                self.headers.insert(AUTHORIZATION, value);
            }
            Ok(None) => {
                self.headers.remove(AUTHORIZATION);
            }
            Err(_) => self.fail(ClientError::InvalidHeader {
                name: AUTHORIZATION.to_string(),
            }),
        }
        self
    }

    /// Registers where a successful body is decoded to.
    ///
    /// Decoding happens when the response arrives. Empty bodies are skipped.
    pub fn set_body_parse_object<S: BodySink + Clone + 'static>(&mut self, sink: &S) -> &mut Self {
        self.sink = Some(Box::new(sink.clone()));
        self
    }

    /// Registers the status-to-shape table used for error responses.
    pub fn set_error_parse_map(&mut self, map: ErrorCodeToObjectMap) -> &mut Self {
        self.error_map = Some(map);
        self
    }

    /// Cancels the exchange and any backoff sleep when `token` fires.
    pub fn set_cancellation_token(&mut self, token: CancellationToken) -> &mut Self {
        self.cancellation = Some(token);
        self
    }

    /// Bounds each individual attempt.
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn get_method(&self) -> &Method {
        &self.method
    }

    /// The URL without query parameters.
    pub fn get_url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn error_parse_map(&self) -> Option<&ErrorCodeToObjectMap> {
        self.error_map.as_ref()
    }

    /// The first builder mistake wins; later ones would only be noise.
    fn fail(&mut self, err: ClientError) {
        if self.build_error.is_none() {
            self.build_error = Some(err);
        }
    }

    fn resolve_url(&self) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.url).map_err(|source| ClientError::InvalidUrl {
            url: self.url.clone(),
            source,
        })?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(url)
    }

    /// Performs the exchange, retrying as the client's policy allows.
    ///
    /// Returns the response for any status code; check
    /// [`Response::is_error`]. Errors are local failures only.
    pub async fn send(&mut self) -> Result<Response, ClientError> {
        if self.sent {
            return Err(ClientError::AlreadySent);
        }
        self.sent = true;

        if let Some(err) = self.build_error.take() {
            return Err(err);
        }
        let url = self.resolve_url()?;
        let url_text = url.to_string();
        let method = self.method.clone();
        let headers = std::mem::take(&mut self.headers);
        let body = self.body.take();
        let sink = self.sink.take();
        let error_map = self.error_map.take();
        let cancellation = self.cancellation.clone();
        let transport = &self.transport;

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            let mut builder = transport
                .http
                .request(method.clone(), url.clone())
                .headers(headers.clone());
            if let Some(body) = &body {
                builder = builder.body(body.clone());
            }
            if let Some(timeout) = self.timeout {
                builder = builder.timeout(timeout);
            }

            tracing::debug!(%method, url = %url_text, attempt, "sending request");

            let result = match &cancellation {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(ClientError::Cancelled),
                    result = builder.send() => result,
                },
                None => builder.send().await,
            };

            let outcome = match result {
                Ok(response) => {
                    receive(
                        response,
                        attempt,
                        sink.as_deref(),
                        error_map.as_ref(),
                        cancellation.as_ref(),
                    )
                    .await?
                }
                Err(e) => Outcome::Transport(e),
            };

            let (retry, wait) = {
                let check = outcome.check(&method, &url_text, attempt);
                let retry = transport.policy.should_retry(&check);
                let hint = match (check.status, check.headers) {
                    (Some(status), Some(headers)) => retry_after(status, headers),
                    _ => None,
                };
                let wait = transport.backoff.delay(
                    transport.retry_wait_min,
                    transport.retry_wait_max,
                    attempt,
                    hint,
                );
                (retry, wait)
            };

            if !retry {
                return outcome.finish(method, url_text);
            }

            if attempt > transport.retry_max {
                tracing::warn!(%method, url = %url_text, attempts = attempt, "giving up");
                return Err(match outcome {
                    Outcome::Transport(source) => ClientError::RetriesExhausted {
                        method,
                        url: url_text,
                        attempts: attempt,
                        source,
                    },
                    _ => ClientError::GaveUp {
                        method,
                        url: url_text,
                        attempts: attempt,
                    },
                });
            }

            let info = RetryAttempt {
                method: method.clone(),
                url: url_text.clone(),
                attempt,
                status: outcome.status().map(|s| s.as_u16()),
                error: match &outcome {
                    Outcome::Transport(e) => Some(e.to_string()),
                    _ => None,
                },
                wait,
            };
            // Releases the failed attempt's connection before waiting.
            drop(outcome);

            tracing::warn!(
                %method,
                url = %url_text,
                attempt,
                status = ?info.status,
                error = ?info.error,
                wait_ms = wait.as_millis() as u64,
                "retrying request"
            );

            for hook in &transport.hooks {
                hook.before_retry(&info)
                    .await
                    .map_err(|cause| ClientError::Hook { attempt, cause })?;
            }

            match &cancellation {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(ClientError::Cancelled),
                    _ = tokio::time::sleep(wait) => {}
                },
                None => tokio::time::sleep(wait).await,
            }
        }
    }
}

/// Buffers and decodes the body when a sink or error shape applies.
///
/// A fired token abandons the body read with [`ClientError::Cancelled`].
async fn receive(
    response: reqwest::Response,
    attempt: u32,
    sink: Option<&dyn BodySink>,
    error_map: Option<&ErrorCodeToObjectMap>,
    cancellation: Option<&CancellationToken>,
) -> Result<Outcome, ClientError> {
    let status = response.status();
    let is_error = status.as_u16() > 399;

    let shape = if is_error {
        error_map.and_then(|map| map.lookup(status.as_u16()))
    } else {
        None
    };
    let sink = if is_error { None } else { sink };

    if shape.is_none() && sink.is_none() {
        return Ok(Outcome::Received(Response::streaming(response, attempt)));
    }

    let headers = response.headers().clone();
    let read = match cancellation {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => return Err(ClientError::Cancelled),
            read = response.bytes() => read,
        },
        None => response.bytes().await,
    };
    let body = match read {
        Ok(body) => body,
        Err(e) => return Ok(Outcome::Transport(e)),
    };

    // Empty bodies skip both the error shape and the success sink.
    let decoded = match (shape, sink) {
        _ if body.is_empty() => Ok(None),
        (Some(shape), _) => shape.decode(&body).map(Some),
        (None, Some(sink)) => sink.decode(&body).map(|()| None),
        _ => Ok(None),
    };

    match decoded {
        Ok(api_error) => {
            if let Some(err) = &api_error {
                tracing::debug!(status = status.as_u16(), shape = ?err.shape(), "classified error response");
            }
            Ok(Outcome::Received(Response::buffered(
                status, headers, body, api_error, attempt,
            )))
        }
        Err(source) => Ok(Outcome::Decode {
            status,
            headers,
            source,
        }),
    }
}

impl Outcome {
    fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Received(response) => response.status(),
            Self::Transport(e) => e.status(),
            Self::Decode { status, .. } => Some(*status),
        }
    }

    fn check<'a>(&'a self, method: &'a Method, url: &'a str, attempt: u32) -> RetryCheck<'a> {
        let mut check = RetryCheck {
            method,
            url,
            attempt,
            status: None,
            headers: None,
            error: None,
            decode_error: None,
        };
        match self {
            Self::Received(response) => {
                check.status = response.status();
                check.headers = Some(response.headers());
            }
            Self::Transport(e) => check.error = Some(e),
            Self::Decode {
                status,
                headers,
                source,
            } => {
                check.status = Some(*status);
                check.headers = Some(headers);
                check.decode_error = Some(source);
            }
        }
        check
    }

    fn finish(self, method: Method, url: String) -> Result<Response, ClientError> {
        match self {
            Self::Received(response) => Ok(response),
            Self::Transport(source) => Err(ClientError::Transport {
                method,
                url,
                source,
            }),
            Self::Decode { status, source, .. } => Err(ClientError::Decode {
                status: status.as_u16(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ClientError, ErrorCodeToObjectMap, HttpClient};
    use crate::auth::AuthStrategy;
    use mockito::{Matcher, Server};
    use serde::Deserialize;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Alert {
        id: String,
    }

    fn client(base: &str) -> HttpClient {
        let mut client = HttpClient::new().unwrap();
        client
            .set_base_url(base)
            .set_retry_wait(Duration::from_millis(1), Duration::from_millis(5));
        client
    }

    #[test]
    fn test_join_base_url_single_separator() {
        let c = client("https://api.example.com/v1/");
        let mut request = c.new_request();
        request.join_base_url("/alerts");
        assert_eq!(request.get_url(), "https://api.example.com/v1/alerts");

        let mut request = HttpClient::new().unwrap().new_request();
        request.join_base_url("/alerts");
        assert_eq!(request.get_url(), "alerts");
    }

    #[test]
    fn test_query_param_overwrite_and_remove() {
        let mut request = HttpClient::new().unwrap().new_request();
        request
            .set_query_param("a", "1")
            .set_query_param("b", "2")
            .set_query_param("a", "3")
            .set_query_param("b", "");
        assert_eq!(request.query_params(), &[("a".to_string(), "3".to_string())]);
    }

    #[test]
    fn test_client_auth_is_prepopulated_and_overridable() {
        let mut c = HttpClient::new().unwrap();
        c.set_auth(AuthStrategy::basic("user", "pass"));
        let mut request = c.new_request();
        assert_eq!(request.headers()[AUTHORIZATION], "Basic dXNlcjpwYXNz");

        request.set_bearer_auth("tok");
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer tok");
    }

    #[tokio::test]
    async fn test_success_body_decoded_into_sink() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/alerts/a1")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_body(r#"{"id":"a1"}"#)
            .create_async()
            .await;

        let mut c = client(&format!("{}/v1", server.url()));
        c.set_auth(AuthStrategy::bearer("tok"));
        let sink = JsonSink::<Alert>::new();
        let mut request = c.new_request();
        request.join_base_url("alerts/a1").set_body_parse_object(&sink);

        let response = request.send().await.unwrap();
        assert_eq!(response.status_code(), Some(200));
        assert!(!response.is_error());
        assert_eq!(sink.take(), Some(Alert { id: "a1".into() }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_success_body_skips_sink() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("DELETE", "/alerts/a1")
            .with_status(204)
            .create_async()
            .await;

        let sink = JsonSink::<Alert>::new();
        let mut request = client(&server.url()).new_request();
        request
            .method(Method::DELETE)
            .join_base_url("alerts/a1")
            .set_body_parse_object(&sink);

        let response = request.send().await.unwrap();
        assert_eq!(response.status_code(), Some(204));
        assert!(!sink.is_filled());
    }

    #[tokio::test]
    async fn test_server_errors_retried_until_exhausted() {
        for status in [500, 502, 503, 504] {
            let mut server = Server::new_async().await;
            let mock = server
                .mock("GET", "/alerts")
                .with_status(status)
                .expect(3)
                .create_async()
                .await;

            let mut c = client(&server.url());
            c.set_retry_max(2);
            let mut request = c.new_request();
            request.join_base_url("alerts");

            let err = request.send().await.unwrap_err();
            assert!(
                matches!(err, ClientError::GaveUp { attempts: 3, .. }),
                "status {status}: {err}"
            );
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_retry_then_success_reports_attempts() {
        let mut server = Server::new_async().await;
        let _fail = server
            .mock("GET", "/alerts")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;
        let _ok = server
            .mock("GET", "/alerts")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let mut request = client(&server.url()).new_request();
        request.join_base_url("alerts");
        let mut response = request.send().await.unwrap();
        assert_eq!(response.attempts(), 2);
        assert_eq!(response.text().await.unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_client_errors_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/alerts")
            .with_status(429)
            .expect(1)
            .create_async()
            .await;

        let mut request = client(&server.url()).new_request();
        request.join_base_url("alerts");
        let response = request.send().await.unwrap();
        assert_eq!(response.status_code(), Some(429));
        assert!(response.is_error());
        assert!(response.api_error().is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_decode_error_is_never_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/alerts")
            .with_status(500)
            .with_body("<html>oops</html>")
            .expect(2)
            .create_async()
            .await;

        let mut c = client(&server.url());
        c.add_retry_condition(|_| true);
        let map = ErrorCodeToObjectMap::new().with(500, crate::api::ErrorShape::OpsDefault);

        for _ in 0..2 {
            let mut request = c.new_request();
            request.join_base_url("alerts").set_error_parse_map(map.clone());
            let err = request.send().await.unwrap_err();
            assert!(matches!(err, ClientError::Decode { status: 500, .. }), "{err}");
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_hooks_run_once_per_retry() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/alerts")
            .with_status(409)
            .expect(3)
            .create_async()
            .await;

        let calls = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&calls);
        let mut c = client(&server.url());
        c.set_retry_max(2)
            .add_retry_condition(|_| true)
            .add_retry_hook(move |_: &RetryAttempt| -> anyhow::Result<()> {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });

        let mut request = c.new_request();
        request
            .method(Method::POST)
            .join_base_url("alerts")
            .set_body(&serde_json::json!({"message": "disk full"}));

        let err = request.send().await.unwrap_err();
        assert!(err.to_string().ends_with("giving up after 3 attempt(s)"), "{err}");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_always_retry_condition_on_server_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/alerts")
            .with_status(500)
            .expect(3)
            .create_async()
            .await;

        let calls = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&calls);
        let mut c = client(&server.url());
        c.set_retry_max(2)
            .add_retry_condition(|_| true)
            .add_retry_hook(move |_: &RetryAttempt| -> anyhow::Result<()> {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });

        let mut request = c.new_request();
        request.join_base_url("alerts");

        let err = request.send().await.unwrap_err();
        assert!(matches!(err, ClientError::GaveUp { attempts: 3, .. }));
        assert!(err.to_string().ends_with("giving up after 3 attempt(s)"), "{err}");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_transport_errors_retried_until_exhausted() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let calls = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&calls);
        let mut c = client(&format!("http://127.0.0.1:{port}"));
        c.set_retry_max(2)
            .add_retry_hook(move |attempt: &RetryAttempt| -> anyhow::Result<()> {
                assert!(attempt.error.is_some());
                assert_eq!(attempt.status, None);
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });

        let mut request = c.new_request();
        request.join_base_url("x");

        let err = request.send().await.unwrap_err();
        assert!(
            matches!(err, ClientError::RetriesExhausted { attempts: 3, .. }),
            "{err:?}"
        );
        let message = err.to_string();
        assert!(message.starts_with(&format!("GET http://127.0.0.1:{port}/x")), "{message}");
        assert!(message.contains("giving up after 3 attempt(s): "), "{message}");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_hook_error_aborts_retries() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/alerts")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let mut c = client(&server.url());
        c.add_retry_hook(|_: &RetryAttempt| -> anyhow::Result<()> { anyhow::bail!("refresh failed") });
        let mut request = c.new_request();
        request.join_base_url("alerts");

        let err = request.send().await.unwrap_err();
        assert!(matches!(err, ClientError::Hook { attempt: 1, .. }));
        assert!(err.to_string().contains("refresh failed"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_ops_unauthorized_is_typed() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/alerts")
            .with_status(401)
            .with_body(r#"{"code":401,"message":"unauthorized"}"#)
            .create_async()
            .await;

        let mut request = client(&server.url()).new_request();
        request
            .join_base_url("alerts")
            .set_error_parse_map(ErrorCodeToObjectMap::ops());

        let response = request.send().await.unwrap();
        assert!(response.is_error());
        assert_eq!(
            response.api_error().unwrap().to_string(),
            "Code: 401, Message: unauthorized"
        );
        let err = response.error_for_status().await.unwrap_err();
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn test_empty_mapped_error_body_keeps_status() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/alerts/missing")
            .with_status(404)
            .create_async()
            .await;

        let mut request = client(&server.url()).new_request();
        request
            .join_base_url("alerts/missing")
            .set_error_parse_map(ErrorCodeToObjectMap::ops());

        let response = request.send().await.unwrap();
        assert!(response.is_error());
        assert_eq!(response.status_code(), Some(404));
        assert!(response.api_error().is_none());
    }

    #[tokio::test]
    async fn test_user_error_is_typed() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/user")
            .match_query(Matcher::UrlEncoded("accountId".into(), "abc".into()))
            .with_status(400)
            .with_body(r#"{"errorMessages":["bad field"],"errors":{},"status":400}"#)
            .create_async()
            .await;

        let mut request = client(&server.url()).new_request();
        request
            .join_base_url("user")
            .set_query_param("accountId", "abc")
            .set_error_parse_map(ErrorCodeToObjectMap::user());

        let response = request.send().await.unwrap();
        assert!(response.api_error().unwrap().to_string().contains("Error: bad field"));
    }

    #[tokio::test]
    async fn test_query_params_sent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/alerts")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "status: open".into()),
                Matcher::UrlEncoded("limit".into(), "50".into()),
            ]))
            .with_status(200)
            .create_async()
            .await;

        let mut request = client(&server.url()).new_request();
        request
            .join_base_url("alerts")
            .set_query_params([("query", "status: open"), ("limit", "20"), ("offset", "5")])
            .set_query_param("limit", "50")
            .set_query_param("offset", "");

        request.send().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_second_send_is_rejected() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/alerts")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let mut request = client(&server.url()).new_request();
        request.join_base_url("alerts");
        request.send().await.unwrap();
        assert!(matches!(request.send().await, Err(ClientError::AlreadySent)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_build_errors_surface_before_io() {
        struct Unencodable;
        impl Serialize for Unencodable {
            fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("cannot encode"))
            }
        }

        let mut server = Server::new_async().await;
        let mock = server.mock("POST", "/alerts").expect(0).create_async().await;

        let mut request = client(&server.url()).new_request();
        request
            .method(Method::POST)
            .join_base_url("alerts")
            .set_body(&Unencodable);
        assert!(matches!(request.send().await, Err(ClientError::BodyEncode(_))));

        let mut request = client(&server.url()).new_request();
        request.set_header("bad header", "x");
        assert!(matches!(
            request.send().await,
            Err(ClientError::InvalidHeader { ref name }) if name == "bad header"
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let mut request = HttpClient::new().unwrap().new_request();
        request.url("not a url");
        assert!(matches!(request.send().await, Err(ClientError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_cancellation_during_backoff() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/alerts")
            .with_status(503)
            .create_async()
            .await;

        let token = CancellationToken::new();
        let mut c = client(&server.url());
        c.set_retry_wait(Duration::from_secs(30), Duration::from_secs(30));
        let trigger = token.clone();
        c.add_retry_hook(move |_: &RetryAttempt| -> anyhow::Result<()> {
            trigger.cancel();
            Ok(())
        });

        let mut request = c.new_request();
        request.join_base_url("alerts").set_cancellation_token(token);
        let err = request.send().await.unwrap_err();
        assert!(matches!(err, ClientError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancellation_while_reading_body() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n{\"id\"")
                .await
                .unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let sink = JsonSink::<Alert>::new();
        let mut request = client(&format!("http://{addr}")).new_request();
        request
            .join_base_url("alerts/a1")
            .set_body_parse_object(&sink)
            .set_cancellation_token(token);

        let result = tokio::time::timeout(Duration::from_secs(5), request.send())
            .await
            .expect("send ignored the cancellation token while reading the body");
        assert!(matches!(result, Err(ClientError::Cancelled)));
        assert_eq!(sink.take(), None);
        server.abort();
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let token = CancellationToken::new();
        token.cancel();
        let mut request = client("http://127.0.0.1:9").new_request();
        request.set_cancellation_token(token);
        assert!(matches!(request.send().await, Err(ClientError::Cancelled)));
    }
}
