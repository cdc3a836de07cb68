//
//  atlassian-operations
//  cli/config.rs
//
//  Created by Ngonidzashe Mangudya on 2026/10/19.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! CLI configuration commands
//!
//! `show` and `get` report the effective settings (file plus environment).
//! `set` edits the file only, so values coming from the environment are
//! never written to disk.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use console::style;

use crate::config::{ProviderConfig, KEYS};

use super::GlobalOptions;

/// Manage configuration
#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigSubcommand {
    /// Print every setting (the API token is masked)
    #[command(visible_alias = "ls")]
    Show,

    /// Print a single setting
    Get(GetArgs),

    /// Change a setting in the configuration file
    Set(SetArgs),

    /// Print the configuration file path
    Path,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Configuration key
    pub key: String,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Configuration key
    pub key: String,

    /// New value
    pub value: String,
}

impl ConfigCommand {
    pub async fn run(&self, global: &GlobalOptions) -> Result<()> {
        match &self.command {
            ConfigSubcommand::Show => self.show(global),
            ConfigSubcommand::Get(args) => self.get(args, global),
            ConfigSubcommand::Set(args) => self.set(args, global),
            ConfigSubcommand::Path => self.path(global),
        }
    }

    fn show(&self, global: &GlobalOptions) -> Result<()> {
        let config = global.load_config()?;
        let entries = config.entries();

        if global.json {
            let map: serde_json::Map<String, serde_json::Value> = entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), value.into()))
                .collect();
            println!("{}", serde_json::to_string_pretty(&map)?);
            return Ok(());
        }

        for (key, value) in entries {
            let value = if value.is_empty() {
                style("(not set)").dim().to_string()
            } else {
                value
            };
            println!("{} = {}", style(key).cyan(), value);
        }
        Ok(())
    }

    fn get(&self, args: &GetArgs, global: &GlobalOptions) -> Result<()> {
        let config = global.load_config()?;
        let value = config.get(&args.key).with_context(|| {
            format!(
                "Unknown configuration key '{}'. Valid keys: {}",
                args.key,
                KEYS.join(", ")
            )
        })?;

        if global.json {
            let result = serde_json::json!({
                "key": args.key,
                "value": value,
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!("{value}");
        }
        Ok(())
    }

    fn set(&self, args: &SetArgs, global: &GlobalOptions) -> Result<()> {
        let path = global.config_path()?;
        let mut config = ProviderConfig::load_from(&path)?;
        config.set(&args.key, &args.value)?;
        config.save_to(&path)?;

        let shown = config.get(&args.key).unwrap_or_default();
        if global.json {
            let result = serde_json::json!({
                "success": true,
                "key": args.key,
                "value": shown,
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!(
                "{} Set {} = {}",
                style("✓").green(),
                style(&args.key).cyan(),
                shown
            );
        }
        Ok(())
    }

    fn path(&self, global: &GlobalOptions) -> Result<()> {
        println!("{}", global.config_path()?.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(dir: &tempfile::TempDir) -> GlobalOptions {
        GlobalOptions {
            config: Some(dir.path().join("config.toml")),
            json: false,
        }
    }

    #[tokio::test]
    async fn test_set_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let global = global(&dir);
        let command = ConfigCommand {
            command: ConfigSubcommand::Set(SetArgs {
                key: "api_retry_count".into(),
                value: "7".into(),
            }),
        };
        command.run(&global).await.unwrap();

        let saved = ProviderConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(saved.api_retry_count, 7);
    }

    #[tokio::test]
    async fn test_set_rejects_unknown_key() {
        let dir = tempfile::tempdir().unwrap();
        let command = ConfigCommand {
            command: ConfigSubcommand::Set(SetArgs {
                key: "editor".into(),
                value: "vim".into(),
            }),
        };
        let err = command.run(&global(&dir)).await.unwrap_err();
        assert!(err.to_string().contains("unknown configuration key 'editor'"));
        assert!(!dir.path().join("config.toml").exists());
    }
}
