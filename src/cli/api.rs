//
//  atlassian-operations
//  cli/api.rs
//
//  Created by Ngonidzashe Mangudya on 2026/10/19.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Direct API access command
//!
//! Sends one request through the retrying client to any of the three
//! backends. Error responses are reported with the backend's typed message.
//!
//! ## Examples
//!
//! ```bash
//! # List open alerts
//! atlops api v1/alerts -q query=status:open
//!
//! # Create an alert
//! atlops api -X POST v1/alerts -F message="Disk full" -F priority=P2 \
//!     -F responders.0.type=team
//!
//! # Look up a team on the Teams gateway
//! atlops api -b teams org/<org-id>/teams/<team-id>
//!
//! # Find a user in the directory
//! atlops api -b user user -q accountId=5b10a2844c20165700ede21g
//! ```

use std::fs;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use console::style;
use reqwest::Method;
use serde_json::Value;

use crate::api::RetryAttempt;
use crate::config::Backend;

use super::GlobalOptions;

/// Make an authenticated request to an Atlassian Operations API
#[derive(Args, Debug)]
pub struct ApiCommand {
    /// Path relative to the backend's base URL (e.g. v1/alerts)
    pub endpoint: String,

    /// HTTP method
    #[arg(long, short = 'X', default_value = "GET")]
    pub method: String,

    /// Backend the path belongs to
    #[arg(long, short = 'b', value_enum, default_value_t = Backend::Ops)]
    pub backend: Backend,

    /// Add a header (Name: Value)
    #[arg(long, short = 'H', action = clap::ArgAction::Append)]
    pub header: Vec<String>,

    /// Add a typed body field (key=value, dotted keys nest)
    #[arg(long, short = 'F', action = clap::ArgAction::Append)]
    pub field: Vec<String>,

    /// Add a string body field (key=value)
    #[arg(long, action = clap::ArgAction::Append)]
    pub raw_field: Vec<String>,

    /// Add a query parameter (key=value, empty value removes)
    #[arg(long, short = 'q', action = clap::ArgAction::Append)]
    pub query: Vec<String>,

    /// Read the JSON body from a file, or - for stdin
    #[arg(long, short = 'f')]
    pub input: Option<String>,

    /// Print the status line and response headers
    #[arg(long, short = 'i')]
    pub include: bool,

    /// Do not print the response body
    #[arg(long)]
    pub silent: bool,

    /// Per-attempt timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Override the configured retry count
    #[arg(long)]
    pub retries: Option<u32>,
}

impl ApiCommand {
    pub async fn run(&self, global: &GlobalOptions) -> Result<()> {
        let config = global.load_config()?;
        let mut clients = config
            .build_clients()
            .context("Not configured. Run 'atlops config set <key> <value>' or set ATLASSIAN_OPS_* variables")?;

        let client = clients.client_mut(self.backend);
        client.set_timeout(Duration::from_secs(self.timeout));
        if let Some(retries) = self.retries {
            client.set_retry_max(retries);
        }
        client.add_retry_hook(|attempt: &RetryAttempt| -> anyhow::Result<()> {
            eprintln!(
                "{} attempt {} failed ({}), retrying in {:.1}s",
                style("!").yellow(),
                attempt.attempt,
                attempt
                    .status
                    .map(|s| s.to_string())
                    .or_else(|| attempt.error.clone())
                    .unwrap_or_default(),
                attempt.wait.as_secs_f64()
            );
            Ok(())
        });

        let mut request = clients.request(self.backend);
        request
            .method(self.parse_method()?)
            .join_base_url(&self.endpoint);

        for (name, value) in self.build_headers()? {
            request.set_header(&name, &value);
        }
        for param in &self.query {
            let (key, value) = split_pair(param, '=')?;
            request.set_query_param(key, value);
        }
        if let Some(body) = self.build_body()? {
            request.set_body(&body);
        }

        let mut response = request.send().await?;

        if self.include {
            let status = response.status().map(|s| s.to_string()).unwrap_or_default();
            println!("{} {}", style("HTTP").dim(), status);
            for (name, value) in response.headers() {
                println!("{}: {}", name, value.to_str().unwrap_or(""));
            }
            println!();
        }

        if response.is_error() {
            response.error_for_status().await?;
            return Ok(());
        }

        if self.silent {
            response.discard();
            return Ok(());
        }

        let body_text = response.text().await?;
        if body_text.is_empty() {
            return Ok(());
        }
        match serde_json::from_str::<Value>(&body_text) {
            Ok(json) if global.json => println!("{json}"),
            Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
            Err(_) => println!("{body_text}"),
        }

        Ok(())
    }

    fn parse_method(&self) -> Result<Method> {
        match self.method.to_uppercase().as_str() {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "PATCH" => Ok(Method::PATCH),
            "DELETE" => Ok(Method::DELETE),
            "HEAD" => Ok(Method::HEAD),
            "OPTIONS" => Ok(Method::OPTIONS),
            _ => bail!("Unsupported HTTP method: {}", self.method),
        }
    }

    fn build_body(&self) -> Result<Option<Value>> {
        if let Some(input) = &self.input {
            let content = if input == "-" {
                std::io::read_to_string(std::io::stdin())?
            } else {
                fs::read_to_string(input).with_context(|| format!("Failed to read {input}"))?
            };
            let value = serde_json::from_str(&content).context("Input is not valid JSON")?;
            return Ok(Some(value));
        }

        if self.field.is_empty() && self.raw_field.is_empty() {
            return Ok(None);
        }

        let mut body = serde_json::Map::new();
        for field in &self.field {
            let (key, value) = split_pair(field, '=')?;
            set_nested_value(&mut body, key, parse_field_value(value));
        }
        for field in &self.raw_field {
            let (key, value) = split_pair(field, '=')?;
            set_nested_value(&mut body, key, Value::String(value.to_string()));
        }
        Ok(Some(Value::Object(body)))
    }

    fn build_headers(&self) -> Result<Vec<(String, String)>> {
        self.header
            .iter()
            .map(|header| {
                let (name, value) = split_pair(header, ':')?;
                Ok((name.trim().to_string(), value.trim().to_string()))
            })
            .collect()
    }
}

fn split_pair(input: &str, separator: char) -> Result<(&str, &str)> {
    match input.split_once(separator) {
        Some((key, value)) if !key.trim().is_empty() => Ok((key, value)),
        _ => bail!("Invalid format: {input}. Expected key{separator}value"),
    }
}

/// Interprets literals, numbers and inline JSON; anything else is a string.
fn parse_field_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => {
            if let Ok(n) = raw.parse::<i64>() {
                return Value::Number(n.into());
            }
            if let Some(n) = raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                return Value::Number(n);
            }
            if raw.starts_with('[') || raw.starts_with('{') {
                if let Ok(value) = serde_json::from_str(raw) {
                    return value;
                }
            }
            Value::String(raw.to_string())
        }
    }
}

fn set_nested_value(obj: &mut serde_json::Map<String, Value>, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            obj.insert(key.to_string(), value);
        }
        Some((first, rest)) => {
            let entry = obj
                .entry(first.to_string())
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(serde_json::Map::new());
            }
            if let Value::Object(nested) = entry {
                set_nested_value(nested, rest, value);
            }
        }
    }
}
