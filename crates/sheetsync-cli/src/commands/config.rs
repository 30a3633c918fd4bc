//! Config command - View and manage SheetSync configuration
//!
//! Provides the `sheetsync config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON), token redacted
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports errors
//! 4. Prints the configuration file path

use anyhow::{Context, Result};
use clap::Subcommand;
use sheetsync_core::config::Config;
use tracing::info;

use super::AppContext;
use crate::output::get_formatter;

/// Placeholder shown instead of the access token
const REDACTED: &str = "<redacted>";

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "sync.debounce_ms")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx),
            ConfigCommand::Set { key, value } => self.execute_set(ctx, key, value),
            ConfigCommand::Validate => self.execute_validate(ctx),
            ConfigCommand::Path => self.execute_path(ctx),
        }
    }

    fn execute_show(&self, ctx: &AppContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        if let Some(error) = &ctx.load_error {
            formatter.warn(&format!("{error}; showing defaults"));
        }

        let config = redacted(&ctx.config);
        info!(config_path = %ctx.config_path.display(), "Showing configuration");

        if ctx.format.is_json() {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
            formatter.info("");
            let yaml = serde_yaml::to_string(&config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }
        Ok(())
    }

    fn execute_set(&self, ctx: &AppContext, key: &str, value: &str) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        if let Some(error) = &ctx.load_error {
            if ctx.config_path.exists() {
                anyhow::bail!("Refusing to overwrite unreadable configuration: {error}");
            }
        }

        let mut config = ctx.config.clone();
        apply_config_value(&mut config, key, value)?;

        let errors = config.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            anyhow::bail!("Invalid value for '{key}': {}", messages.join("; "));
        }

        if let Some(parent) = ctx.config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
        }
        let yaml = serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
        std::fs::write(&ctx.config_path, yaml).context("Failed to write configuration file")?;

        info!(key, config_path = %ctx.config_path.display(), "Configuration value set");

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "config_path": ctx.config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {key}"));
            formatter.info(&format!("Saved to {}", ctx.config_path.display()));
        }
        Ok(())
    }

    fn execute_validate(&self, ctx: &AppContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let path = ctx.config_path.display().to_string();

        let errors: Vec<String> = match &ctx.load_error {
            Some(error) => vec![error.clone()],
            None => ctx.config.validate().iter().map(ToString::to_string).collect(),
        };

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": path,
                "file_exists": ctx.config_path.exists(),
                "errors": errors,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            if !ctx.config_path.exists() {
                formatter.info(&format!("No file at {path}; using defaults"));
            } else {
                formatter.info(&format!("File: {path}"));
            }
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.info(&format!("File: {path}"));
            for error in &errors {
                formatter.info(&format!("  {error}"));
            }
        }

        if !errors.is_empty() {
            anyhow::bail!("Configuration is invalid");
        }
        Ok(())
    }

    fn execute_path(&self, ctx: &AppContext) -> Result<()> {
        if ctx.format.is_json() {
            get_formatter(ctx.format).print_json(&serde_json::json!({
                "config_path": ctx.config_path.display().to_string(),
                "exists": ctx.config_path.exists(),
            }));
        } else {
            println!("{}", ctx.config_path.display());
        }
        Ok(())
    }
}

/// Copy of `config` safe to print
fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    if config.remote.access_token.is_some() {
        config.remote.access_token = Some(REDACTED.to_string());
    }
    config
}

fn parse_u64(key: &str, value: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .with_context(|| format!("Expected a non-negative integer for {key}"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    value
        .parse::<bool>()
        .with_context(|| format!("Expected true or false for {key}"))
}

/// Apply a dot-notation key/value pair to a Config struct
///
/// `sync.sheets` takes a comma-separated list. An empty
/// `remote.access_token` removes the token.
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- sync ---
        "sync.debounce_ms" => config.sync.debounce_ms = parse_u64(key, value)?,
        "sync.janitor_interval_secs" => config.sync.janitor_interval_secs = parse_u64(key, value)?,
        "sync.transient_retry_ms" => config.sync.transient_retry_ms = parse_u64(key, value)?,
        "sync.import_on_startup" => config.sync.import_on_startup = parse_bool(key, value)?,
        "sync.poll_interval_secs" => config.sync.poll_interval_secs = parse_u64(key, value)?,
        "sync.include_header" => config.sync.include_header = parse_bool(key, value)?,
        "sync.sheets" => {
            config.sync.sheets = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        // --- backoff ---
        "backoff.initial_secs" => config.backoff.initial_secs = parse_u64(key, value)?,
        "backoff.ceiling_secs" => config.backoff.ceiling_secs = parse_u64(key, value)?,

        // --- remote ---
        "remote.base_url" => config.remote.base_url = value.to_string(),
        "remote.spreadsheet_id" => config.remote.spreadsheet_id = value.to_string(),
        "remote.access_token" => {
            config.remote.access_token = (!value.is_empty()).then(|| value.to_string());
        }
        "remote.timeout_secs" => config.remote.timeout_secs = parse_u64(key, value)?,

        // --- logging ---
        "logging.level" => config.logging.level = value.to_string(),

        _ => anyhow::bail!("Unknown configuration key: {key}"),
    }
    Ok(())
}
