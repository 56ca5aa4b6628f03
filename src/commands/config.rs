//! Configuration commands.
//!
//! - `config show`: Display current configuration
//! - `config get`: Print one value
//! - `config set`: Set and save one value

use owo_colors::OwoColorize;
use serde_json::json;

use super::CommandOutput;
use crate::cli::OutputOptions;
use crate::config::{BASE_URL_ENV, CONFIG_KEYS, Config, TOKEN_ENV};
use crate::error::{BackofficeError, Result};

fn display_value(value: Option<&str>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "not configured".dimmed().to_string(),
    }
}

/// Show current configuration
pub fn cmd_config_show(output: OutputOptions) -> Result<()> {
    let config = Config::load()?;

    let mut values = serde_json::Map::new();
    let mut text_output = format!("{}\n\n", "Configuration:".cyan().bold());
    for key in CONFIG_KEYS {
        let value = config.get(key)?;
        text_output.push_str(&format!(
            "  {}: {}\n",
            key.cyan(),
            display_value(value.as_deref())
        ));
        values.insert(key.to_string(), json!(value));
    }

    let base_url_from_env = std::env::var(BASE_URL_ENV).is_ok_and(|v| !v.trim().is_empty());
    let token_from_env = Config::env_token().is_some();
    if base_url_from_env || token_from_env {
        text_output.push('\n');
    }
    if base_url_from_env {
        text_output.push_str(&format!("  {BASE_URL_ENV} overrides api.base_url\n").yellow().to_string());
    }
    if token_from_env {
        text_output.push_str(&format!("  {TOKEN_ENV} is set\n").yellow().to_string());
    }

    text_output.push('\n');
    text_output.push_str(
        &format!("Config file: {}", Config::config_path().display())
            .dimmed()
            .to_string(),
    );

    CommandOutput::new(json!({
        "values": values,
        "env": {
            "base_url": base_url_from_env,
            "token": token_from_env,
        },
        "config_file": Config::config_path().to_string_lossy(),
    }))
    .with_text(text_output)
    .print(output)
}

/// Get a specific configuration value
pub fn cmd_config_get(key: &str, output: OutputOptions) -> Result<()> {
    let config = Config::load()?;
    let value = config
        .get(key)?
        .ok_or_else(|| BackofficeError::Config(format!("{key} not set")))?;

    CommandOutput::new(json!({ "key": key, "value": value }))
        .with_text(value)
        .print(output)
}

/// Set a configuration value
pub fn cmd_config_set(key: &str, value: &str, output: OutputOptions) -> Result<()> {
    let mut config = Config::load()?;
    config.set(key, value)?;
    config.save()?;

    CommandOutput::new(json!({
        "action": "config_set",
        "key": key,
        "value": value,
        "success": true,
    }))
    .with_text(format!("Set {} to {}", key.cyan(), value))
    .print(output)
}
