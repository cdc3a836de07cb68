//
//  atlassian-operations
//  lib.rs
//
//  Created by Ngonidzashe Mangudya on 2026/10/19.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Atlassian Operations Client Library
//!
//! The HTTP core behind the Atlassian Operations provider, plus the `atlops`
//! command-line tool built on it.
//!
//! ## Overview
//!
//! Every resource operation follows the same shape: obtain a [`Request`](api::Request)
//! from the backend's [`HttpClient`](api::HttpClient), set the method, path,
//! query, body and sinks, call `send`, then branch on
//! [`Response::is_error`](api::Response::is_error).
//!
//! ## Features
//!
//! - **Pluggable auth**: none, HTTP Basic, bearer token or OAuth2 access token
//! - **Retries**: bounded attempts, exponential or jittered backoff, hooks,
//!   caller-supplied retry conditions
//! - **Typed errors**: per-backend status maps decode error bodies into
//!   readable messages
//! - **Cancellation**: requests and backoff sleeps stop when a token fires
//!
//! ## Module Structure
//!
//! - [`api`]: client, request builder, response, retry policy, error shapes
//! - [`auth`]: authentication strategies
//! - [`config`]: provider settings, backend endpoints and client construction
//! - [`cli`]: command-line interface definitions using clap
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use atlassian_operations::config::{Backend, ProviderConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let clients = ProviderConfig::load()?.build_clients()?;
//!
//! let mut request = clients.request(Backend::Ops);
//! request.join_base_url("v1/alerts").set_query_param("limit", "10");
//!
//! let mut response = request.send().await?;
//! if response.is_error() {
//!     response.error_for_status().await?;
//! } else {
//!     println!("{}", response.text().await?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Backends
//!
//! | Backend | Host | Error statuses decoded |
//! |---------|------|------------------------|
//! | Ops | `api.atlassian.com` | 400 401 402 403 404 409 422 429 |
//! | Teams | site domain | 400 403 404 410 413 415 422 |
//! | User | site domain | 400 401 429 |

/// Command-line interface definitions.
///
/// Contains the `atlops` commands, arguments, and subcommands defined using the
/// clap derive API.
pub mod cli;

/// HTTP client core.
///
/// Request building, retrying transport, response handling and typed error
/// classification shared by every backend.
pub mod api;

/// Authentication strategies.
///
/// Turns the configured credentials into an `Authorization` header value.
pub mod auth;

/// Configuration management.
///
/// Manages provider settings stored in platform-specific locations:
/// - Linux: `~/.config/atlops/config.toml`
/// - macOS: `~/Library/Application Support/atlops/config.toml`
/// - Windows: `%APPDATA%\atlops\config.toml`
///
/// Settings can be overridden with `ATLASSIAN_OPS_*` environment variables.
pub mod config;

/// Re-export of the main CLI struct for convenient access.
pub use cli::Cli;

/// Re-export of the provider settings.
pub use config::ProviderConfig;

/// Application name constant.
///
/// The name of the CLI binary, used in the User-Agent header and configuration paths.
///
/// # Value
///
/// `"atlops"`
pub const APP_NAME: &str = "atlops";

/// Application version constant.
///
/// The current version of the CLI, automatically derived from Cargo.toml
/// at compile time using the `CARGO_PKG_VERSION` environment variable.
///
/// # Example
///
/// ```rust
/// use atlassian_operations::VERSION;
///
/// println!("atlops version {}", VERSION);
/// ```
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit codes for the CLI.
///
/// Standardized exit codes following Unix conventions, allowing scripts
/// to programmatically detect the outcome of CLI operations.
///
/// # Exit Code Ranges
///
/// - `0`: Success
/// - `1-3`: General errors and usage issues
/// - `4-7`: Authentication-related issues
/// - `8-15`: Resource-related issues
/// - `16-31`: Operation-related issues
/// - `32+`: External service issues
///
/// # Example
///
/// ```rust,no_run
/// use atlassian_operations::exit_codes;
/// use std::process;
///
/// // Exit with authentication error
/// process::exit(exit_codes::AUTH_ERROR);
/// ```
pub mod exit_codes {
    /// Successful execution.
    ///
    /// The command completed without errors.
    ///
    /// # Value
    ///
    /// `0`
    pub const SUCCESS: i32 = 0;

    /// General error.
    ///
    /// An unspecified error occurred during execution.
    /// Check stderr for details.
    ///
    /// # Value
    ///
    /// `1`
    pub const ERROR: i32 = 1;

    /// Invalid usage or arguments.
    ///
    /// The command was invoked with invalid arguments or options.
    /// Use `--help` to see correct usage.
    ///
    /// # Value
    ///
    /// `2`
    pub const USAGE: i32 = 2;

    /// Authentication required or failed.
    ///
    /// The API rejected the email address and API token (401 or 403).
    /// Check them with `atlops config show`.
    ///
    /// # Value
    ///
    /// `4`
    pub const AUTH_ERROR: i32 = 4;

    /// Resource not found.
    ///
    /// The requested alert, team, schedule or user does not exist.
    ///
    /// # Value
    ///
    /// `8`
    pub const NOT_FOUND: i32 = 8;

    /// Operation cancelled by user.
    ///
    /// The request was cancelled, typically by pressing Ctrl+C.
    ///
    /// # Value
    ///
    /// `16`
    pub const CANCELLED: i32 = 16;

    /// API rate limit exceeded.
    ///
    /// The Atlassian API rate limit has been exceeded (429).
    /// Wait before retrying.
    ///
    /// # Value
    ///
    /// `32`
    pub const RATE_LIMIT: i32 = 32;
}
