//
//  atlassian-operations
//  api/response.rs
//
//  Created by Ngonidzashe Mangudya on 2026/10/19.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Single-use wrapper around a transport response.
//!
//! The body is owned by whoever holds the [`Response`]. It is released by
//! reading it ([`Response::body`], [`Response::text`], [`Response::json`]),
//! by [`Response::discard`], or by dropping the response.

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::common::{ApiError, ClientError};

#[derive(Debug, Default)]
enum Body {
    /// Not read yet; still on the wire.
    Stream(reqwest::Response),
    /// Read by the client while decoding the success sink or error shape.
    Buffered(Bytes),
    /// Read by the caller, discarded, or never present.
    #[default]
    Drained,
}

/// The result of a successful exchange, whatever its status code.
///
/// # Example
///
/// ```rust,no_run
/// use atlassian_operations::api::{ErrorCodeToObjectMap, HttpClient};
///
/// # async fn example() -> Result<(), atlassian_operations::api::ClientError> {
/// let client = HttpClient::new()?;
/// let mut request = client.new_request();
/// request
///     .url("https://api.atlassian.com/jsm/ops/api/cloud-id/v1/alerts")
///     .set_error_parse_map(ErrorCodeToObjectMap::ops());
///
/// let mut response = request.send().await?;
/// if response.is_error() {
///     if let Some(err) = response.api_error() {
///         eprintln!("{err}");
///     }
///     response.discard();
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Response {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Body,
    api_error: Option<ApiError>,
    attempts: u32,
}

impl Response {
    pub(crate) fn streaming(inner: reqwest::Response, attempts: u32) -> Self {
        Self {
            status: Some(inner.status()),
            headers: inner.headers().clone(),
            body: Body::Stream(inner),
            api_error: None,
            attempts,
        }
    }

    pub(crate) fn buffered(
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
        api_error: Option<ApiError>,
        attempts: u32,
    ) -> Self {
        Self {
            status: Some(status),
            headers,
            body: Body::Buffered(body),
            api_error,
            attempts,
        }
    }

    /// Status code, or `None` once the response has been discarded.
    pub fn status_code(&self) -> Option<u16> {
        self.status.map(|s| s.as_u16())
    }

    /// Typed status, or `None` once the response has been discarded.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Whether the status is 400 or above.
    ///
    /// A response with nothing behind it (discarded or default-constructed)
    /// counts as an error.
    pub fn is_error(&self) -> bool {
        self.status.map_or(true, |s| s.as_u16() > 399)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// How many attempts it took to get this response.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The typed error decoded from the body, when the request registered an
    /// error map covering this status.
    pub fn api_error(&self) -> Option<&ApiError> {
        self.api_error.as_ref()
    }

    /// Reads the whole body and releases the underlying stream.
    ///
    /// The first call returns the body; later calls return an empty buffer.
    /// Returns `Ok(None)` when there is no underlying response.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::BodyRead`] when the stream fails mid-read.
    pub async fn body(&mut self) -> Result<Option<Bytes>, ClientError> {
        if self.status.is_none() {
            return Ok(None);
        }
        match std::mem::take(&mut self.body) {
            Body::Stream(inner) => inner.bytes().await.map(Some).map_err(ClientError::BodyRead),
            Body::Buffered(bytes) => Ok(Some(bytes)),
            Body::Drained => Ok(Some(Bytes::new())),
        }
    }

    /// Reads the body as UTF-8 text, replacing invalid sequences.
    pub async fn text(&mut self) -> Result<String, ClientError> {
        Ok(self
            .body()
            .await?
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default())
    }

    /// Reads the body and decodes it as JSON.
    pub async fn json<T: DeserializeOwned>(&mut self) -> Result<T, ClientError> {
        let status = self.status_code().unwrap_or_default();
        let body = self.body().await?.unwrap_or_default();
        serde_json::from_slice(&body).map_err(|source| ClientError::Decode { status, source })
    }

    /// Releases the body without reading it. Safe to call more than once.
    ///
    /// After this the response reports no status and [`is_error`](Self::is_error)
    /// returns `true`.
    pub fn discard(&mut self) {
        self.body = Body::Drained;
        self.status = None;
        self.headers.clear();
        self.api_error = None;
    }

    /// Turns an error status into a [`ClientError`].
    ///
    /// Successful responses are returned unchanged. An error status becomes
    /// [`ClientError::Api`] when a typed error was decoded, otherwise
    /// [`ClientError::Status`] carrying the raw body.
    pub async fn error_for_status(mut self) -> Result<Self, ClientError> {
        if !self.is_error() {
            return Ok(self);
        }
        let status = self.status_code().unwrap_or_default();
        if let Some(error) = self.api_error.take() {
            self.discard();
            return Err(ClientError::Api { status, error });
        }
        let body = self.text().await?;
        Err(ClientError::Status { status, body })
    }
}
