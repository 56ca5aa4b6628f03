//! Command implementations behind the `backoffice` binary.
//!
//! Each `cmd_*` function builds what it needs from a [`Context`], does its
//! work through the library controllers, and prints a [`CommandOutput`].

mod autofill;
mod config;
mod records;
mod session;
mod stock;

pub use autofill::{cmd_autofill_geo, cmd_autofill_pincode};
pub use config::{cmd_config_get, cmd_config_set, cmd_config_show};
pub use records::{cmd_collections, cmd_create, cmd_ls, cmd_rm, cmd_show, cmd_update};
pub use session::{cmd_login, cmd_logout, cmd_token};
pub use stock::{cmd_stock_add, cmd_stock_ls};

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::auth::{AuthSession, FileTokenStore, MemoryTokenStore, TokenStore};
use crate::backend::InMemoryBackend;
use crate::cli::OutputOptions;
use crate::config::Config;
use crate::error::{BackofficeError, Result};
use crate::http::{FilePart, HttpClient, Transport};
use crate::schema::{Collection, FieldKind};

/// Result of a command: a JSON value and an optional human rendering.
pub struct CommandOutput {
    json: Value,
    text: Option<String>,
}

impl CommandOutput {
    pub fn new(json: Value) -> Self {
        Self { json, text: None }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn print(self, output: OutputOptions) -> Result<()> {
        match (output.json, self.text) {
            (false, Some(text)) => {
                println!("{}", text.trim_end());
                Ok(())
            }
            _ => print_json(&self.json),
        }
    }
}

pub fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Everything a command needs to talk to the back office.
pub struct Context {
    pub config: Config,
    pub session: Arc<AuthSession>,
    pub transport: Arc<dyn Transport>,
    pub offline: bool,
}

/// Token storage for this process: `BACKOFFICE_TOKEN` if set, else the
/// configured or default session file.
pub fn token_store(config: &Config) -> Result<Box<dyn TokenStore>> {
    if let Some(token) = Config::env_token() {
        return Ok(Box::new(MemoryTokenStore::with_token(&token)));
    }
    match &config.auth.session_file {
        Some(path) => Ok(Box::new(FileTokenStore::new(path))),
        None => Ok(Box::new(FileTokenStore::default_location()?)),
    }
}

impl Context {
    pub fn new(offline: bool) -> Result<Self> {
        let config = Config::load()?;

        if offline {
            return Ok(Self {
                config,
                session: Arc::new(AuthSession::in_memory()),
                transport: Arc::new(InMemoryBackend::seeded()),
                offline,
            });
        }

        let session = Arc::new(AuthSession::new(token_store(&config)?)?);
        if !session.is_signed_in() {
            return Err(BackofficeError::NotLoggedIn);
        }
        let base_url = config.base_url().ok_or_else(|| {
            BackofficeError::Config(
                "no API base URL configured. Run: backoffice config set api.base_url <url>"
                    .to_string(),
            )
        })?;
        let client = HttpClient::new(&base_url, config.timeout(), Arc::clone(&session))?;

        Ok(Self {
            config,
            session,
            transport: Arc::new(client),
            offline,
        })
    }
}

/// Convert a command-line value to the JSON type the field expects.
pub fn field_value(kind: FieldKind, raw: &str) -> Value {
    let raw = raw.trim();
    match kind {
        FieldKind::Decimal | FieldKind::Latitude | FieldKind::Longitude => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        FieldKind::Integer => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        FieldKind::Boolean => match raw.to_lowercase().as_str() {
            "true" | "yes" | "1" => Value::Bool(true),
            "false" | "no" | "0" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
        _ if raw.is_empty() => Value::Null,
        _ => Value::String(raw.to_string()),
    }
}

fn split_assignment(arg: &str) -> Result<(&str, &str)> {
    arg.split_once('=')
        .map(|(k, v)| (k.trim(), v))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| {
            BackofficeError::InvalidInput(format!("expected NAME=VALUE, got '{arg}'"))
        })
}

/// Parse `name=value` arguments against a collection schema.
pub fn parse_assignments(collection: &Collection, args: &[String]) -> Result<Map<String, Value>> {
    let mut fields = Map::new();
    for arg in args {
        let (name, raw) = split_assignment(arg)?;
        let spec = collection.field(name).ok_or_else(|| {
            BackofficeError::InvalidInput(format!(
                "{} has no field '{name}'. Run: backoffice collections {}",
                collection.name, collection.name
            ))
        })?;
        fields.insert(name.to_string(), field_value(spec.kind, raw));
    }
    Ok(fields)
}

/// Read `name=path` upload arguments.
pub async fn read_file_parts(args: &[String]) -> Result<Vec<FilePart>> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        let (field, path) = split_assignment(arg)?;
        let path = std::path::Path::new(path.trim());
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            BackofficeError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read {}: {}", path.display(), e),
            ))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        parts.push(FilePart {
            field: field.to_string(),
            content_type: FilePart::guess_content_type(&file_name).map(String::from),
            file_name,
            bytes,
        });
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PRODUCTS, SHOPS};
    use serde_json::json;

    #[test]
    fn test_field_value_conversions() {
        assert_eq!(field_value(FieldKind::Decimal, "12.5"), json!(12.5));
        assert_eq!(field_value(FieldKind::Integer, "7"), json!(7));
        assert_eq!(field_value(FieldKind::Integer, "seven"), json!("seven"));
        assert_eq!(field_value(FieldKind::Boolean, "yes"), json!(true));
        assert_eq!(field_value(FieldKind::Phone, " 9876543210 "), json!("9876543210"));
        assert_eq!(field_value(FieldKind::Email, ""), Value::Null);
    }

    #[test]
    fn test_parse_assignments() {
        let fields = parse_assignments(
            &PRODUCTS,
            &["name=Green tea".to_string(), "price=120".to_string()],
        )
        .unwrap();
        assert_eq!(fields["name"], json!("Green tea"));
        assert_eq!(fields["price"], json!(120.0));

        assert!(parse_assignments(&SHOPS, &["colour=red".to_string()]).is_err());
        assert!(parse_assignments(&SHOPS, &["name".to_string()]).is_err());
        assert!(parse_assignments(&SHOPS, &["=x".to_string()]).is_err());
    }

    #[test]
    fn test_value_with_equals_sign() {
        let fields = parse_assignments(&SHOPS, &["address=Plot 4=B".to_string()]).unwrap();
        assert_eq!(fields["address"], json!("Plot 4=B"));
    }

    #[tokio::test]
    async fn test_read_file_parts() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logo.png");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let parts = read_file_parts(&[format!("logo={}", path.display())])
            .await
            .unwrap();
        assert_eq!(parts[0].field, "logo");
        assert_eq!(parts[0].file_name, "logo.png");
        assert_eq!(parts[0].content_type.as_deref(), Some("image/png"));
        assert_eq!(parts[0].bytes, vec![1, 2, 3]);

        assert!(read_file_parts(&["logo=/no/such/file.png".to_string()]).await.is_err());
    }
}
