//
//  atlassian-operations
//  api/common/shapes.rs
//
//  Created by Ngonidzashe Mangudya on 2026/10/19.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Typed error bodies returned by the Atlassian Operations backends.
//!
//! Each backend family answers a failed request with its own JSON shape:
//!
//! | Shape | Backend | Body |
//! |-------|---------|------|
//! | [`OpsErrorResponse`] | Ops alerting API | `{"errors": [{"title": "...", "code": "..."}]}` |
//! | [`OpsUnauthorizedResponse`] | Ops alerting API (401) | `{"code": 401, "message": "..."}` |
//! | [`TeamErrorResponse`] | Teams gateway | `{"code": "...", "message": "..."}` |
//! | [`UserErrorResponse`] | User directory | `{"errorMessages": [...], "errors": {...}, "status": 400}` |
//!
//! Every shape renders a human-readable message through `Display`; that text is
//! what the provider surfaces as its diagnostic.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A structured error decoded from an error response body.
///
/// The `Display` output is the backend's message rendered for humans, with no
/// prefix added.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Generic Ops API error listing one or more problems.
    #[error("{0}")]
    Ops(OpsErrorResponse),

    /// Ops API authentication failure.
    #[error("{0}")]
    OpsUnauthorized(OpsUnauthorizedResponse),

    /// Teams gateway error.
    #[error("{0}")]
    Team(TeamErrorResponse),

    /// Jira-style user directory error.
    #[error("{0}")]
    User(UserErrorResponse),
}

impl ApiError {
    /// The shape this error was decoded as.
    pub fn shape(&self) -> ErrorShape {
        match self {
            Self::Ops(_) => ErrorShape::OpsDefault,
            Self::OpsUnauthorized(_) => ErrorShape::OpsUnauthorized,
            Self::Team(_) => ErrorShape::TeamDefault,
            Self::User(_) => ErrorShape::UserDefault,
        }
    }
}

/// Constructor tag for an error body shape.
///
/// An [`ErrorCodeToObjectMap`](super::ErrorCodeToObjectMap) maps status codes
/// to these tags; every decode produces a fresh value, so no state is shared
/// between responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorShape {
    /// [`OpsErrorResponse`]
    OpsDefault,
    /// [`OpsUnauthorizedResponse`]
    OpsUnauthorized,
    /// [`TeamErrorResponse`]
    TeamDefault,
    /// [`UserErrorResponse`]
    UserDefault,
}

impl ErrorShape {
    /// Decodes a raw response body into this shape.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the body is not valid JSON for the
    /// shape. Callers treat this as permanent.
    pub fn decode(self, body: &[u8]) -> Result<ApiError, serde_json::Error> {
        match self {
            Self::OpsDefault => serde_json::from_slice(body).map(ApiError::Ops),
            Self::OpsUnauthorized => serde_json::from_slice(body).map(ApiError::OpsUnauthorized),
            Self::TeamDefault => serde_json::from_slice(body).map(ApiError::Team),
            Self::UserDefault => serde_json::from_slice(body).map(ApiError::User),
        }
    }
}

/// Error body of the Ops alerting API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpsErrorResponse {
    /// Individual problems reported by the API.
    #[serde(default)]
    pub errors: Vec<OpsErrorDetail>,
}

/// One entry of [`OpsErrorResponse::errors`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpsErrorDetail {
    /// Human-readable summary.
    #[serde(default)]
    pub title: String,

    /// Machine-readable code. Some endpoints send it as a number.
    #[serde(default, deserialize_with = "string_or_number")]
    pub code: String,
}

impl fmt::Display for OpsErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("Error: {}, Code: {}", e.title, e.code))
            .collect();
        f.write_str(&lines.join("\n"))
    }
}

/// Body of a 401 from the Ops alerting API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpsUnauthorizedResponse {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for OpsUnauthorizedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Code: {}, Message: {}", self.code, self.message)
    }
}

/// Error body of the Teams gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamErrorResponse {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for TeamErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Code: {}, Message: {}", self.code, self.message)
    }
}

/// Error body of the Jira-style user directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserErrorResponse {
    /// Top-level messages.
    #[serde(default, rename = "errorMessages")]
    pub error_messages: Vec<String>,

    /// Field-level errors, passed through verbatim.
    #[serde(default)]
    pub errors: Option<Value>,

    #[serde(default)]
    pub status: i32,
}

impl fmt::Display for UserErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines: Vec<String> = self
            .error_messages
            .iter()
            .map(|m| format!("Error: {m}"))
            .collect();

        if let Some(errors) = self.errors.as_ref().filter(|e| !is_blank(e)) {
            lines.push(format!("Errors: {errors}"));
        }

        f.write_str(&lines.join("\n"))
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
