//
//  atlassian-operations
//  config/endpoints.rs
//
//  Created by Ngonidzashe Mangudya on 2026/10/19.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Backend Endpoints
//!
//! The three REST families behind the provider and the clients that reach
//! them.
//!
//! | Backend | Base URL |
//! |---------|----------|
//! | Ops | `https://api.atlassian.com/jsm/ops/api/<cloud_id>/` |
//! | Ops (staging) | `https://api.stg.atlassian.com/jsm/ops/api/<cloud_id>/` |
//! | Teams | `https://<domain>/gateway/api/public/teams/v1/` |
//! | User | `https://<domain>/rest/api/3/` |
//!
//! All three authenticate with HTTP Basic using the email address and API
//! token.

use std::fmt;
use std::str::FromStr;

use super::{ConfigError, ProviderConfig};
use crate::api::{ErrorCodeToObjectMap, HttpClient, Request};
use crate::auth::AuthStrategy;

const OPS_HOST: &str = "api.atlassian.com";
const OPS_STAGING_HOST: &str = "api.stg.atlassian.com";

/// One of the REST families the provider talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Backend {
    /// Alerting and on-call API.
    Ops,
    /// Public Teams gateway.
    Teams,
    /// Jira-style user directory.
    User,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Ops, Backend::Teams, Backend::User];

    pub fn name(self) -> &'static str {
        match self {
            Self::Ops => "ops",
            Self::Teams => "teams",
            Self::User => "user",
        }
    }

    /// Status-to-shape table for this backend's error bodies.
    pub fn error_map(self) -> ErrorCodeToObjectMap {
        match self {
            Self::Ops => ErrorCodeToObjectMap::ops(),
            Self::Teams => ErrorCodeToObjectMap::teams(),
            Self::User => ErrorCodeToObjectMap::user(),
        }
    }

    /// Base URL, always ending in `/`.
    pub fn base_url(self, config: &ProviderConfig) -> String {
        match self {
            Self::Ops => {
                let host = if config.product_staging {
                    OPS_STAGING_HOST
                } else {
                    OPS_HOST
                };
                format!("https://{host}/jsm/ops/api/{}/", config.cloud_id.trim())
            }
            Self::Teams => format!(
                "https://{}/gateway/api/public/teams/v1/",
                normalize_domain(&config.domain_name)
            ),
            Self::User => format!("https://{}/rest/api/3/", normalize_domain(&config.domain_name)),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::Invalid {
                key: "backend".to_string(),
                value: s.to_string(),
            })
    }
}

/// Reduces a user-supplied site to a bare host.
///
/// ```rust
/// use atlassian_operations::config::normalize_domain;
///
/// assert_eq!(normalize_domain("https://example.atlassian.net/"), "example.atlassian.net");
/// assert_eq!(normalize_domain(" example.atlassian.net "), "example.atlassian.net");
/// ```
pub fn normalize_domain(domain: &str) -> String {
    let domain = domain.trim();
    let domain = domain
        .strip_prefix("https://")
        .or_else(|| domain.strip_prefix("http://"))
        .unwrap_or(domain);
    domain.trim_end_matches('/').to_string()
}

/// One configured [`HttpClient`] per backend.
#[derive(Debug, Clone)]
pub struct ProviderClients {
    pub ops: HttpClient,
    pub teams: HttpClient,
    pub user: HttpClient,
}

impl ProviderClients {
    pub fn client(&self, backend: Backend) -> &HttpClient {
        match backend {
            Backend::Ops => &self.ops,
            Backend::Teams => &self.teams,
            Backend::User => &self.user,
        }
    }

    pub fn client_mut(&mut self, backend: Backend) -> &mut HttpClient {
        match backend {
            Backend::Ops => &mut self.ops,
            Backend::Teams => &mut self.teams,
            Backend::User => &mut self.user,
        }
    }

    /// A request on `backend` with its error map already registered.
    pub fn request(&self, backend: Backend) -> Request {
        let mut request = self.client(backend).new_request();
        request.set_error_parse_map(backend.error_map());
        request
    }
}

impl ProviderConfig {
    /// Validates the settings and builds the three backend clients.
    ///
    /// The clients share one connection pool.
    pub fn build_clients(&self) -> Result<ProviderClients, ConfigError> {
        self.validate()?;

        let shared = HttpClient::new()?;
        let auth = AuthStrategy::basic(self.email_address.trim(), self.api_token.trim());
        let build = |backend: Backend| {
            let mut client = shared.clone();
            client
                .configure(
                    backend.base_url(self),
                    self.api_retry_count,
                    self.retry_wait_min(),
                    self.retry_wait_max(),
                )
                .set_auth(auth.clone());
            tracing::debug!(%backend, base_url = ?client.base_url(), "configured backend client");
            client
        };

        Ok(ProviderClients {
            ops: build(Backend::Ops),
            teams: build(Backend::Teams),
            user: build(Backend::User),
        })
    }
}
