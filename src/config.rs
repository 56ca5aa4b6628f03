//! Application configuration.
//!
//! Configuration is stored in `.backoffice/config.yaml` and includes:
//! - API base URL and request timeout
//! - List defaults (page size, search debounce)
//! - Session file location and autofill endpoints
//!
//! `BACKOFFICE_BASE_URL` and `BACKOFFICE_TOKEN` override the file.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::autofill::{DEFAULT_GEOCODER, DEFAULT_POSTAL_API};
use crate::error::{BackofficeError, Result};

pub const BASE_URL_ENV: &str = "BACKOFFICE_BASE_URL";
pub const TOKEN_ENV: &str = "BACKOFFICE_TOKEN";
pub const ROOT_ENV: &str = "BACKOFFICE_ROOT";

/// Keys accepted by `config get` / `config set`.
pub const CONFIG_KEYS: &[&str] = &[
    "api.base_url",
    "api.timeout_secs",
    "list.per_page",
    "list.search_debounce_ms",
    "auth.session_file",
    "autofill.postal_api",
    "autofill.geocoder",
];

/// Returns the configuration directory.
///
/// `BACKOFFICE_ROOT` if set, otherwise `.backoffice` in the working directory.
pub fn backoffice_root() -> PathBuf {
    match env::var(ROOT_ENV) {
        Ok(root) if !root.is_empty() => PathBuf::from(root),
        _ => PathBuf::from(".backoffice"),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub list: ListConfig,

    #[serde(default, skip_serializing_if = "AuthConfig::is_default")]
    pub auth: AuthConfig,

    #[serde(default, skip_serializing_if = "AutofillConfig::is_default")]
    pub autofill: AutofillConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Transport timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListConfig {
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
}

fn default_per_page() -> u32 {
    10
}

fn default_search_debounce_ms() -> u64 {
    400
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            search_debounce_ms: default_search_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Where the session token is kept. Defaults to the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_file: Option<PathBuf>,
}

impl AuthConfig {
    pub fn is_default(&self) -> bool {
        self.session_file.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutofillConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_api: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geocoder: Option<String>,
}

impl AutofillConfig {
    pub fn is_default(&self) -> bool {
        self.postal_api.is_none() && self.geocoder.is_none()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_number<N: std::str::FromStr>(key: &str, value: &str) -> Result<N> {
    value.trim().parse().map_err(|_| {
        BackofficeError::Config(format!(
            "invalid value '{value}' for {key}. Expected a whole number"
        ))
    })
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> PathBuf {
        backoffice_root().join("config.yaml")
    }

    /// Load configuration from file, or return default if not found
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            BackofficeError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config at {}: {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml_ng::to_string(self)?;
        fs::write(&path, content).map_err(|e| {
            BackofficeError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write config at {}: {}", path.display(), e),
            ))
        })?;

        // Owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Base URL, with `BACKOFFICE_BASE_URL` taking precedence over the file.
    pub fn base_url(&self) -> Option<String> {
        self.base_url_with(|key| env::var(key).ok())
    }

    pub fn base_url_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        non_empty(lookup(BASE_URL_ENV)).or_else(|| non_empty(self.api.base_url.clone()))
    }

    /// Token supplied through `BACKOFFICE_TOKEN`, if any.
    pub fn env_token() -> Option<String> {
        non_empty(env::var(TOKEN_ENV).ok())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs.max(1))
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.list.search_debounce_ms)
    }

    pub fn per_page(&self) -> u32 {
        self.list.per_page.max(1)
    }

    pub fn postal_api(&self) -> &str {
        self.autofill.postal_api.as_deref().unwrap_or(DEFAULT_POSTAL_API)
    }

    pub fn geocoder(&self) -> &str {
        self.autofill.geocoder.as_deref().unwrap_or(DEFAULT_GEOCODER)
    }

    /// Read a value by dot-notation key. Unset optional values are `None`.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = match key {
            "api.base_url" => self.api.base_url.clone(),
            "api.timeout_secs" => Some(self.api.timeout_secs.to_string()),
            "list.per_page" => Some(self.list.per_page.to_string()),
            "list.search_debounce_ms" => Some(self.list.search_debounce_ms.to_string()),
            "auth.session_file" => self
                .auth
                .session_file
                .as_ref()
                .map(|p| p.display().to_string()),
            "autofill.postal_api" => self.autofill.postal_api.clone(),
            "autofill.geocoder" => self.autofill.geocoder.clone(),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Set a value by dot-notation key, validating it first.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api.base_url" => {
                url::Url::parse(value.trim())?;
                self.api.base_url = Some(value.trim().to_string());
            }
            "api.timeout_secs" => {
                let secs: u64 = parse_number(key, value)?;
                if secs == 0 {
                    return Err(BackofficeError::Config(
                        "api.timeout_secs must be greater than 0".to_string(),
                    ));
                }
                self.api.timeout_secs = secs;
            }
            "list.per_page" => {
                let per_page: u32 = parse_number(key, value)?;
                if per_page == 0 {
                    return Err(BackofficeError::Config(
                        "list.per_page must be greater than 0".to_string(),
                    ));
                }
                self.list.per_page = per_page;
            }
            "list.search_debounce_ms" => {
                self.list.search_debounce_ms = parse_number(key, value)?;
            }
            "auth.session_file" => {
                self.auth.session_file = non_empty(Some(value.to_string())).map(PathBuf::from);
            }
            "autofill.postal_api" => {
                url::Url::parse(value.trim())?;
                self.autofill.postal_api = Some(value.trim().to_string());
            }
            "autofill.geocoder" => {
                url::Url::parse(value.trim())?;
                self.autofill.geocoder = Some(value.trim().to_string());
            }
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }
}

fn unknown_key(key: &str) -> BackofficeError {
    BackofficeError::Config(format!(
        "unknown config key '{key}'. Valid keys: {}",
        CONFIG_KEYS.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.api.base_url.is_none());
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.list.per_page, 10);
        assert_eq!(config.search_debounce(), Duration::from_millis(400));
    }

    #[test]
    fn test_config_partial_yaml_uses_defaults() {
        let yaml = "api:\n  base_url: https://api.example.com\nlist:\n  per_page: 25\n";
        let config: Config = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.api.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.list.per_page, 25);
        assert_eq!(config.list.search_debounce_ms, 400);
    }

    #[test]
    fn test_config_serialization_skips_defaults() {
        let yaml = serde_yaml_ng::to_string(&Config::default()).unwrap();
        assert!(!yaml.contains("auth"));
        assert!(!yaml.contains("autofill"));
        assert!(!yaml.contains("base_url"));
    }

    #[test]
    fn test_base_url_env_override() {
        let mut config = Config::default();
        config.api.base_url = Some("https://file.example.com".into());

        let none = |_: &str| None;
        assert_eq!(
            config.base_url_with(none).as_deref(),
            Some("https://file.example.com")
        );

        let env = |key: &str| (key == BASE_URL_ENV).then(|| "https://env.example.com".to_string());
        assert_eq!(
            config.base_url_with(env).as_deref(),
            Some("https://env.example.com")
        );

        let blank = |_: &str| Some("  ".to_string());
        assert_eq!(
            config.base_url_with(blank).as_deref(),
            Some("https://file.example.com")
        );
    }

    #[test]
    fn test_set_and_get() {
        let mut config = Config::default();
        config.set("list.per_page", "25").unwrap();
        config.set("api.base_url", "https://api.example.com/v1").unwrap();
        assert_eq!(config.get("list.per_page").unwrap().as_deref(), Some("25"));
        assert_eq!(
            config.get("api.base_url").unwrap().as_deref(),
            Some("https://api.example.com/v1")
        );
        assert_eq!(config.get("autofill.geocoder").unwrap(), None);
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.set("list.per_page", "0").is_err());
        assert!(config.set("list.per_page", "ten").is_err());
        assert!(config.set("api.timeout_secs", "0").is_err());
        assert!(config.set("api.base_url", "not a url").is_err());
        let err = config.set("nope", "1").unwrap_err();
        assert!(err.to_string().contains("unknown config key"));
    }
}
