//
//  atlassian-operations
//  api/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/10/19.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # API Client Layer
//!
//! The HTTP core shared by every Atlassian Operations backend.
//!
//! ## Supported Backends
//!
//! - **Ops**: the alerting API at `api.atlassian.com` (or its staging host)
//! - **Teams**: the public Teams gateway on the site domain
//! - **User**: the Jira-style user directory on the site domain
//!
//! ## Architecture
//!
//! - [`client`]: [`HttpClient`], transport settings and request factory
//! - [`request`]: [`Request`] builder and the retrying `send`
//! - [`response`]: single-use [`Response`] wrapper
//! - [`retry`]: retry policy, hooks and backoff
//! - [`common`]: [`ClientError`], typed error bodies and per-backend error maps
//!
//! ## Usage
//!
//! ```rust,no_run
//! use atlassian_operations::api::{ErrorCodeToObjectMap, HttpClient, JsonSink};
//! use atlassian_operations::auth::AuthStrategy;
//!
//! # async fn example() -> Result<(), atlassian_operations::api::ClientError> {
//! let mut client = HttpClient::new()?;
//! client
//!     .set_base_url("https://api.atlassian.com/jsm/ops/api/cloud-id/")
//!     .set_auth(AuthStrategy::basic("me@example.com", "api-token"));
//!
//! let alert = JsonSink::<serde_json::Value>::new();
//! let mut request = client.new_request();
//! request
//!     .join_base_url("v1/alerts/a1")
//!     .set_body_parse_object(&alert)
//!     .set_error_parse_map(ErrorCodeToObjectMap::ops());
//!
//! let response = request.send().await?;
//! if response.is_error() {
//!     match response.api_error() {
//!         Some(err) => eprintln!("{err}"),
//!         None => eprintln!("status {:?}", response.status_code()),
//!     }
//! } else if let Some(alert) = alert.take() {
//!     println!("{alert}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! `send` returns `Err` only for local failures (see [`ClientError`]). HTTP
//! error statuses come back as a [`Response`] whose `is_error()` is `true`.

/// Transport settings and the request factory.
pub mod client;

/// Errors, typed error bodies and per-backend status maps.
pub mod common;

/// Request builder and the retrying exchange.
pub mod request;

/// Single-use response wrapper.
pub mod response;

/// Retry decisions, hooks and backoff.
pub mod retry;

pub use client::HttpClient;
pub use common::{ApiError, ClientError, ErrorCodeToObjectMap, ErrorShape};
pub use request::{BodySink, JsonSink, Request};
pub use response::Response;
pub use retry::{Backoff, RetryAttempt, RetryCheck, RetryCondition, RetryHook, RetryPolicy};
