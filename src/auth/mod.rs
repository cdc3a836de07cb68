//
//  atlassian-operations
//  auth/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/10/19.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Authentication Strategies
//!
//! This module describes how credentials are attached to outgoing requests.
//! An [`AuthStrategy`] is plain data: the [`HttpClient`](crate::api::HttpClient)
//! holds one as its default, and a [`Request`](crate::api::Request) may layer
//! its own override on top for a single call.
//!
//! ## Supported Schemes
//!
//! - **None**: no `Authorization` header is sent.
//! - **Basic**: `Authorization: Basic base64(username:password)`. All three
//!   Atlassian Operations backends use this with an email address and API token.
//! - **Bearer**: `Authorization: Bearer <token>`.
//! - **OAuth2**: an OAuth 2.0 access token, sent as a bearer token.
//!
//! ## Example
//!
//! ```rust
//! use atlassian_operations::auth::AuthStrategy;
//!
//! let auth = AuthStrategy::basic("ops@example.com", "api-token");
//! let header = auth.header_value().unwrap().unwrap();
//! assert!(header.to_str().unwrap().starts_with("Basic "));
//! ```

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderValue, InvalidHeaderValue};

/// Credentials attached to every request built from a client.
///
/// Exactly one scheme is active at a time; setting a new strategy replaces the
/// previous one entirely.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum AuthStrategy {
    /// No credentials.
    #[default]
    None,
    /// HTTP Basic authentication.
    Basic {
        /// The username (for Atlassian, the account email address).
        username: String,
        /// The password (for Atlassian, an API token).
        password: String,
    },
    /// A static bearer token.
    Bearer {
        /// The token sent after `Bearer `.
        token: String,
    },
    /// An OAuth 2.0 access token.
    OAuth2 {
        /// The access token sent after `Bearer `.
        access_token: String,
        /// When the token stops being valid, if known.
        expires_at: Option<DateTime<Utc>>,
    },
}

impl AuthStrategy {
    /// Creates a Basic strategy.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates a Bearer strategy.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// Creates an OAuth2 strategy with no known expiry.
    pub fn oauth2(access_token: impl Into<String>) -> Self {
        Self::OAuth2 {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    /// Short name of the scheme, safe to log.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Basic { .. } => "basic",
            Self::Bearer { .. } => "bearer",
            Self::OAuth2 { .. } => "oauth2",
        }
    }

    /// Renders the `Authorization` header value for this strategy.
    ///
    /// Returns `Ok(None)` for [`AuthStrategy::None`]. The returned value is
    /// marked sensitive so it is redacted from `Debug` output of header maps.
    ///
    /// # Errors
    ///
    /// Fails when a token or credential contains bytes that are not allowed
    /// in an HTTP header (for example a trailing newline pasted from a file).
    pub fn header_value(&self) -> Result<Option<HeaderValue>, InvalidHeaderValue> {
        let raw = match self {
            Self::None => return Ok(None),
            Self::Basic { username, password } => {
                format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
            }
            Self::Bearer { token } => format!("Bearer {token}"),
            Self::OAuth2 { access_token, .. } => format!("Bearer {access_token}"),
        };

        let mut value = HeaderValue::from_str(&raw)?;
        value.set_sensitive(true);
        Ok(Some(value))
    }

    /// Checks whether an OAuth2 token is past its expiry.
    ///
    /// Only OAuth2 strategies with an explicit `expires_at` can expire.
    pub fn is_expired(&self) -> bool {
        match self {
            Self::OAuth2 {
                expires_at: Some(exp),
                ..
            } => *exp < Utc::now(),
            _ => false,
        }
    }
}

// Secrets stay out of logs.
impl fmt::Debug for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
            Self::OAuth2 { expires_at, .. } => f
                .debug_struct("OAuth2")
                .field("access_token", &"***")
                .field("expires_at", expires_at)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_none_has_no_header() {
        assert!(AuthStrategy::None.header_value().unwrap().is_none());
    }

    #[test]
    fn test_basic_header() {
        let header = AuthStrategy::basic("user", "pass")
            .header_value()
            .unwrap()
            .unwrap();
        // base64("user:pass")
        assert_eq!(header.to_str().unwrap(), "Basic dXNlcjpwYXNz");
        assert!(header.is_sensitive());
    }

    #[test]
    fn test_bearer_and_oauth2_headers() {
        let bearer = AuthStrategy::bearer("abc").header_value().unwrap().unwrap();
        assert_eq!(bearer.to_str().unwrap(), "Bearer abc");

        let oauth = AuthStrategy::oauth2("xyz").header_value().unwrap().unwrap();
        assert_eq!(oauth.to_str().unwrap(), "Bearer xyz");
    }

    #[test]
    fn test_invalid_token_is_rejected() {
        assert!(AuthStrategy::bearer("abc\n").header_value().is_err());
    }

    #[test]
    fn test_expiry() {
        let expired = AuthStrategy::OAuth2 {
            access_token: "t".to_string(),
            expires_at: Some(Utc::now() - Duration::hours(1)),
        };
        assert!(expired.is_expired());
        assert!(!AuthStrategy::oauth2("t").is_expired());
        assert!(!AuthStrategy::basic("u", "p").is_expired());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", AuthStrategy::basic("ops@example.com", "s3cret"));
        assert!(rendered.contains("ops@example.com"));
        assert!(!rendered.contains("s3cret"));
    }
}
