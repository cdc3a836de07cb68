//
//  atlassian-operations
//  api/common/error_map.rs
//
//  Created by Ngonidzashe Mangudya on 2026/10/19.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Per-backend tables of status code to error body shape.
//!
//! Coverage is deliberately partial: a status that is not listed for a backend
//! produces no typed error, and callers fall back to the status code and raw
//! body.

use super::shapes::{ApiError, ErrorShape};

/// Maps HTTP status codes to the error shape a backend uses for them.
///
/// Lookups are a linear scan in insertion order; tables hold a handful of
/// entries.
///
/// # Example
///
/// ```rust
/// use atlassian_operations::api::{ErrorCodeToObjectMap, ErrorShape};
///
/// let map = ErrorCodeToObjectMap::ops();
/// assert_eq!(map.lookup(401), Some(ErrorShape::OpsUnauthorized));
/// assert_eq!(map.lookup(404), Some(ErrorShape::OpsDefault));
/// assert_eq!(map.lookup(500), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorCodeToObjectMap {
    entries: Vec<(u16, ErrorShape)>,
}

impl ErrorCodeToObjectMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table for the Ops alerting API.
    pub fn ops() -> Self {
        Self::new()
            .with(400, ErrorShape::OpsDefault)
            .with(401, ErrorShape::OpsUnauthorized)
            .with(402, ErrorShape::OpsDefault)
            .with(403, ErrorShape::OpsDefault)
            .with(404, ErrorShape::OpsDefault)
            .with(409, ErrorShape::OpsDefault)
            .with(422, ErrorShape::OpsDefault)
            .with(429, ErrorShape::OpsDefault)
    }

    /// Table for the Teams gateway.
    pub fn teams() -> Self {
        [400, 403, 404, 410, 413, 415, 422]
            .into_iter()
            .fold(Self::new(), |map, status| map.with(status, ErrorShape::TeamDefault))
    }

    /// Table for the Jira-style user directory.
    pub fn user() -> Self {
        [400, 401, 429]
            .into_iter()
            .fold(Self::new(), |map, status| map.with(status, ErrorShape::UserDefault))
    }

    /// Adds or replaces the shape for `status`.
    pub fn with(mut self, status: u16, shape: ErrorShape) -> Self {
        self.insert(status, shape);
        self
    }

    /// Adds or replaces the shape for `status` in place.
    pub fn insert(&mut self, status: u16, shape: ErrorShape) {
        match self.entries.iter_mut().find(|(code, _)| *code == status) {
            Some(entry) => entry.1 = shape,
            None => self.entries.push((status, shape)),
        }
    }

    /// Finds the shape registered for `status`.
    pub fn lookup(&self, status: u16) -> Option<ErrorShape> {
        self.entries
            .iter()
            .find(|(code, _)| *code == status)
            .map(|(_, shape)| *shape)
    }

    /// Decodes `body` with the shape registered for `status`.
    ///
    /// Returns `None` when the status is not covered, otherwise the decode
    /// result.
    pub fn classify(&self, status: u16, body: &[u8]) -> Option<Result<ApiError, serde_json::Error>> {
        self.lookup(status).map(|shape| shape.decode(body))
    }

    /// Status codes covered by this map, in insertion order.
    pub fn codes(&self) -> impl Iterator<Item = u16> + '_ {
        self.entries.iter().map(|(code, _)| *code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
