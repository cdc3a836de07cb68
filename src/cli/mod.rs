//
//  atlassian-operations
//  cli/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/10/19.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! CLI command definitions using clap derive macros

mod api;
mod config;

pub use api::ApiCommand;
pub use config::ConfigCommand;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::ProviderConfig;

/// Atlassian Operations from the command line.
#[derive(Parser, Debug)]
#[command(
    name = "atlops",
    version,
    about = "Call Atlassian Operations APIs from the command line",
    long_about = "atlops sends authenticated requests to the Atlassian Operations,\n\
                  Teams and user directory APIs with retries and typed error messages.",
    propagate_version = true,
    after_help = "Use 'atlops <command> --help' for more information about a command."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOptions,
}

/// Options accepted by every command.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Read configuration from this file instead of the default location
    #[arg(long, global = true, env = "ATLOPS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,
}

impl GlobalOptions {
    /// Path of the configuration file in effect.
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Ok(ProviderConfig::config_path()?),
        }
    }

    /// File settings with the environment applied.
    pub fn load_config(&self) -> Result<ProviderConfig> {
        let mut config = ProviderConfig::load_from(&self.config_path()?)?;
        config.apply_env()?;
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Make an authenticated API request
    Api(ApiCommand),

    /// Manage configuration
    Config(ConfigCommand),

    /// Show version information
    Version,
}
