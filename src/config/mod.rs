//
//  atlassian-operations
//  config/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/10/19.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Configuration Module
//!
//! Provider settings used to build the backend clients.
//!
//! ## Overview
//!
//! Settings come from two layers, the later one winning:
//!
//! 1. A TOML file in the platform config directory
//! 2. `ATLASSIAN_OPS_*` environment variables
//!
//! ## Configuration File Location
//!
//! - **Linux**: `~/.config/atlops/config.toml`
//! - **macOS**: `~/Library/Application Support/atlops/config.toml`
//! - **Windows**: `C:\Users\<User>\AppData\Roaming\atlops\config.toml`
//!
//! ## Example Configuration File
//!
//! ```toml
//! cloud_id = "0f6e3f2c-0000-0000-0000-000000000000"
//! domain_name = "example.atlassian.net"
//! email_address = "me@example.com"
//! api_token = "ATATT..."
//! api_retry_count = 4
//! api_retry_wait = 1
//! api_retry_max_wait = 30
//! product_staging = false
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Key |
//! |----------|-----|
//! | `ATLASSIAN_OPS_CLOUD_ID` | `cloud_id` |
//! | `ATLASSIAN_OPS_DOMAIN_NAME` | `domain_name` |
//! | `ATLASSIAN_OPS_EMAIL_ADDRESS` | `email_address` |
//! | `ATLASSIAN_OPS_API_TOKEN` | `api_token` |
//! | `ATLASSIAN_OPS_API_RETRY_COUNT` | `api_retry_count` |
//! | `ATLASSIAN_OPS_API_RETRY_WAIT` | `api_retry_wait` (seconds) |
//! | `ATLASSIAN_OPS_API_RETRY_MAX_WAIT` | `api_retry_max_wait` (seconds) |
//! | `ATLASSIAN_OPS_PRODUCT_STAGING` | `product_staging` |
//!
//! ## Submodules
//!
//! - [`endpoints`]: backend base URLs and the per-backend clients
//! - `file`: low-level configuration file I/O

pub mod endpoints;
mod file;

pub use endpoints::*;
pub use file::*;

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::ClientError;

/// Keys accepted by [`ProviderConfig::get`] and [`ProviderConfig::set`].
pub const KEYS: [&str; 8] = [
    "cloud_id",
    "domain_name",
    "email_address",
    "api_token",
    "api_retry_count",
    "api_retry_wait",
    "api_retry_max_wait",
    "product_staging",
];

const ENV_PREFIX: &str = "ATLASSIAN_OPS_";

/// Failures while loading, editing or applying the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid value '{value}' for {key}")]
    Invalid { key: String, value: String },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Settings for the Atlassian Operations provider.
///
/// # Default Values
///
/// | Field | Default |
/// |-------|---------|
/// | `api_retry_count` | `4` |
/// | `api_retry_wait` | `1` second |
/// | `api_retry_max_wait` | `30` seconds |
/// | `product_staging` | `false` |
///
/// # Example
///
/// ```rust
/// use atlassian_operations::config::ProviderConfig;
///
/// let mut config = ProviderConfig::default();
/// config.set("cloud_id", "abc").unwrap();
/// assert_eq!(config.get("cloud_id").as_deref(), Some("abc"));
/// assert_eq!(config.get("api_retry_count").as_deref(), Some("4"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Atlassian site (cloud) identifier used in Ops API paths.
    pub cloud_id: String,

    /// Site domain, e.g. `example.atlassian.net`.
    pub domain_name: String,

    /// Account email used for HTTP Basic auth.
    pub email_address: String,

    /// API token paired with the email address.
    pub api_token: String,

    /// Retries after the first attempt.
    pub api_retry_count: u32,

    /// Lower backoff bound, in seconds.
    pub api_retry_wait: u64,

    /// Upper backoff bound, in seconds.
    pub api_retry_max_wait: u64,

    /// Target the staging Ops API host.
    pub product_staging: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            cloud_id: String::new(),
            domain_name: String::new(),
            email_address: String::new(),
            api_token: String::new(),
            api_retry_count: crate::api::client::DEFAULT_RETRY_MAX,
            api_retry_wait: crate::api::client::DEFAULT_RETRY_WAIT_MIN.as_secs(),
            api_retry_max_wait: crate::api::client::DEFAULT_RETRY_WAIT_MAX.as_secs(),
            product_staging: false,
        }
    }
}

impl ProviderConfig {
    /// Loads the file at [`config_path`](Self::config_path), then applies
    /// the environment.
    ///
    /// A missing file is not an error; defaults are used.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Loads the file at `path` without applying the environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !config_exists(path) {
            return Ok(Self::default());
        }
        let content = read_config_file(path)?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Saves to [`config_path`](Self::config_path).
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        write_config_file(path, &content)
    }

    /// Platform-specific location of `config.toml`.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let dirs = ProjectDirs::from("", "", crate::APP_NAME).ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overlays `ATLASSIAN_OPS_*` variables from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Overlays variables obtained through `lookup`.
    ///
    /// Empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in KEYS {
            let var = format!("{ENV_PREFIX}{}", key.to_ascii_uppercase());
            if let Some(value) = lookup(&var).filter(|v| !v.trim().is_empty()) {
                tracing::debug!(variable = %var, "configuration from environment");
                self.set(key, value.trim())?;
            }
        }
        Ok(())
    }

    /// Checks that every credential needed to reach the backends is present.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Missing`] naming every absent key, or
    /// [`ConfigError::Invalid`] when the wait bounds are inverted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing: Vec<&'static str> = [
            ("cloud_id", &self.cloud_id),
            ("domain_name", &self.domain_name),
            ("email_address", &self.email_address),
            ("api_token", &self.api_token),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(key, _)| key)
        .collect();

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }
        if self.api_retry_wait > self.api_retry_max_wait {
            return Err(ConfigError::Invalid {
                key: "api_retry_wait".to_string(),
                value: format!("{} (exceeds api_retry_max_wait)", self.api_retry_wait),
            });
        }
        Ok(())
    }

    pub fn retry_wait_min(&self) -> Duration {
        Duration::from_secs(self.api_retry_wait)
    }

    pub fn retry_wait_max(&self) -> Duration {
        Duration::from_secs(self.api_retry_max_wait)
    }

    /// Returns the value for `key` as displayed to users.
    ///
    /// The API token is never returned in clear; see
    /// [`masked_token`](Self::masked_token).
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "cloud_id" => Some(self.cloud_id.clone()),
            "domain_name" => Some(self.domain_name.clone()),
            "email_address" => Some(self.email_address.clone()),
            "api_token" => Some(self.masked_token()),
            "api_retry_count" => Some(self.api_retry_count.to_string()),
            "api_retry_wait" => Some(self.api_retry_wait.to_string()),
            "api_retry_max_wait" => Some(self.api_retry_max_wait.to_string()),
            "product_staging" => Some(self.product_staging.to_string()),
            _ => None,
        }
    }

    /// Sets `key` from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
        };

        match key {
            "cloud_id" => self.cloud_id = value.to_string(),
            "domain_name" => self.domain_name = normalize_domain(value),
            "email_address" => self.email_address = value.to_string(),
            "api_token" => self.api_token = value.to_string(),
            "api_retry_count" => self.api_retry_count = value.parse().map_err(|_| invalid())?,
            "api_retry_wait" => self.api_retry_wait = value.parse().map_err(|_| invalid())?,
            "api_retry_max_wait" => {
                self.api_retry_max_wait = value.parse().map_err(|_| invalid())?
            }
            "product_staging" => self.product_staging = parse_bool(value).ok_or_else(invalid)?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// `(key, display value)` for every key, token masked.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        KEYS.iter()
            .map(|key| (*key, self.get(key).unwrap_or_default()))
            .collect()
    }

    /// The token with everything but the last four characters hidden.
    pub fn masked_token(&self) -> String {
        let chars: Vec<char> = self.api_token.chars().collect();
        match chars.len() {
            0 => String::new(),
            n if n <= 4 => "*".repeat(n),
            n => format!("{}{}", "*".repeat(n - 4), chars[n - 4..].iter().collect::<String>()),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
