//! Command-line argument parsing
//!
//! Keeps argument parsing separate from execution logic.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// HybridOps operator CLI
#[derive(Parser, Debug)]
#[command(name = "hybridopsctl")]
#[command(about = "HybridOps - plan and confirm operational actions", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Supervisor API base URL
    #[arg(long, global = true, env = "HYBRIDOPS_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Operator bearer token from `login`
    #[arg(long, global = true, env = "HYBRIDOPS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and print a bearer token
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "HYBRIDOPS_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Turn free text into a plan and confirm token
    Plan {
        /// What you want done, e.g. "List jobs"
        text: String,

        /// Response language (de, bs, en); detected when omitted
        #[arg(long)]
        language: Option<String>,
    },

    /// Run a planned action
    Execute {
        /// Imperative command, e.g. "EXECUTE LIST"
        #[arg(long)]
        command: String,

        /// Token from `plan`
        #[arg(long, default_value = "")]
        confirm_token: String,

        /// Tool name from `plan`, e.g. jobs.list
        #[arg(long)]
        tool: String,

        /// Tool parameter as key=value (repeatable)
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, Value)>,
    },

    /// List tools the tool gate exposes
    Tools,

    /// Check supervisor health
    Status,
}

/// `key=value`; the value is JSON when it parses as JSON, else a string
pub fn parse_param(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow!("empty parameter name in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
