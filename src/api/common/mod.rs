//
//  atlassian-operations
//  api/common/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/10/19.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Common error types shared by every backend family.
//!
//! # Overview
//!
//! - [`ClientError`] - local failures returned by [`Request::send`](super::Request::send)
//! - [`ApiError`] - typed error bodies decoded from HTTP error responses
//! - [`ErrorCodeToObjectMap`] - per-backend status code to shape tables
//!
//! An HTTP error status is not a [`ClientError`]: `send` returns the response,
//! [`Response::is_error`](super::Response::is_error) reports it, and the typed
//! body (if the backend's map covers the status) is available from
//! [`Response::api_error`](super::Response::api_error).
//!
//! # Example
//!
//! ```rust
//! use atlassian_operations::api::common::{ClientError, ErrorCodeToObjectMap};
//!
//! let api = ErrorCodeToObjectMap::ops()
//!     .classify(401, br#"{"code":401,"message":"unauthorized"}"#)
//!     .unwrap()
//!     .unwrap();
//! let err = ClientError::Api { status: 401, error: api };
//! assert_eq!(err.to_string(), "Code: 401, Message: unauthorized");
//! assert_eq!(err.status(), Some(401));
//! ```

use reqwest::Method;
use thiserror::Error;

mod error_map;
mod shapes;

pub use error_map::*;
pub use shapes::*;

use crate::exit_codes;

/// Failures returned by the HTTP client core.
///
/// | Variant | Raised when | Retried |
/// |---------|-------------|---------|
/// | `Build` | the TLS/connection pool could not be initialised | - |
/// | `AlreadySent` | `send` is called twice on one request | - |
/// | `InvalidUrl` | the final URL cannot be parsed | no |
/// | `InvalidHeader` | a header name/value or auth token is malformed | no |
/// | `BodyEncode` | the JSON body could not be serialized | no |
/// | `Transport` | the exchange failed and the policy declined to retry | - |
/// | `BodyRead` | the body stream failed mid-read | yes, as a transport error |
/// | `Decode` | a body did not match the success sink or error shape | never |
/// | `GaveUp` | attempts ran out with no transport error | - |
/// | `RetriesExhausted` | attempts ran out on a transport error | - |
/// | `Hook` | a retry hook returned an error | - |
/// | `Cancelled` | the request's cancellation token fired | - |
/// | `Api` | `error_for_status` on a response with a typed body | - |
/// | `Status` | `error_for_status` on an unmapped error status | - |
#[derive(Error, Debug)]
pub enum ClientError {
    /// The underlying `reqwest` client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    /// The request was already consumed by an earlier `send`.
    #[error("request has already been sent")]
    AlreadySent,

    /// The request URL is missing or malformed.
    #[error("invalid request URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A header could not be represented on the wire.
    #[error("invalid header '{name}'")]
    InvalidHeader { name: String },

    /// The request body could not be serialized to JSON.
    #[error("failed to encode request body: {0}")]
    BodyEncode(#[source] serde_json::Error),

    /// A transport-level failure the retry policy did not retry.
    #[error("{method} {url} request failed: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body stream failed while being read.
    #[error("failed to read response body: {0}")]
    BodyRead(#[source] reqwest::Error),

    /// A response body did not decode into the requested shape.
    #[error("failed to decode response body (status {status}): {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    /// Every attempt failed the retry policy without a transport error.
    #[error("{method} {url} giving up after {attempts} attempt(s)")]
    GaveUp {
        method: Method,
        url: String,
        attempts: u32,
    },

    /// Every attempt failed and the last one ended in a transport error.
    #[error("{method} {url} giving up after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        method: Method,
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// A retry hook aborted the retry loop.
    #[error("retry hook aborted after attempt {attempt}: {cause:#}")]
    Hook { attempt: u32, cause: anyhow::Error },

    /// The cancellation token fired while sending or backing off.
    #[error("request was cancelled")]
    Cancelled,

    /// An error status with a typed body.
    #[error("{error}")]
    Api {
        status: u16,
        #[source]
        error: ApiError,
    },

    /// An error status the backend's map does not cover.
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },
}

impl ClientError {
    /// HTTP status associated with the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Decode { status, .. } | Self::Api { status, .. } | Self::Status { status, .. } => {
                Some(*status)
            }
            Self::Transport { source, .. }
            | Self::RetriesExhausted { source, .. }
            | Self::BodyRead(source) => {
                source.status().map(|s| s.as_u16())
            }
            _ => None,
        }
    }

    /// Maps the failure onto a process exit code.
    pub fn exit_code(&self) -> i32 {
        if matches!(self, Self::Cancelled) {
            return exit_codes::CANCELLED;
        }
        match self.status() {
            Some(401) | Some(403) => exit_codes::AUTH_ERROR,
            Some(404) => exit_codes::NOT_FOUND,
            Some(429) => exit_codes::RATE_LIMIT,
            _ => exit_codes::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gave_up_message() {
        let err = ClientError::GaveUp {
            method: Method::GET,
            url: "https://api.atlassian.com/jsm/ops/api/x/v1/alerts".to_string(),
            attempts: 3,
        };
        assert_eq!(
            err.to_string(),
            "GET https://api.atlassian.com/jsm/ops/api/x/v1/alerts giving up after 3 attempt(s)"
        );
    }

    #[test]
    fn test_exit_codes() {
        let status = |status| ClientError::Status {
            status,
            body: String::new(),
        };
        assert_eq!(status(401).exit_code(), exit_codes::AUTH_ERROR);
        assert_eq!(status(404).exit_code(), exit_codes::NOT_FOUND);
        assert_eq!(status(429).exit_code(), exit_codes::RATE_LIMIT);
        assert_eq!(status(500).exit_code(), exit_codes::ERROR);
        assert_eq!(ClientError::Cancelled.exit_code(), exit_codes::CANCELLED);
        assert_eq!(ClientError::AlreadySent.exit_code(), exit_codes::ERROR);
    }

    #[test]
    fn test_hook_message_includes_cause() {
        let err = ClientError::Hook {
            attempt: 2,
            cause: anyhow::anyhow!("token refresh failed"),
        };
        assert_eq!(
            err.to_string(),
            "retry hook aborted after attempt 2: token refresh failed"
        );
    }
}
