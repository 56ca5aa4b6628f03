use std::io::{self, BufRead, IsTerminal};

use owo_colors::OwoColorize;
use serde_json::json;

use super::{CommandOutput, token_store};
use crate::auth::AuthSession;
use crate::cli::OutputOptions;
use crate::config::{Config, TOKEN_ENV};
use crate::error::{BackofficeError, Result};

fn read_token_from_stdin() -> Result<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        eprintln!("Paste the session token and press Enter:");
    }
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Store a session token
pub fn cmd_login(token: Option<&str>, output: OutputOptions) -> Result<()> {
    if Config::env_token().is_some() {
        return Err(BackofficeError::Config(format!(
            "{TOKEN_ENV} is set and takes precedence over a stored session. Unset it to log in"
        )));
    }
    let token = match token {
        Some(t) => t.to_string(),
        None => read_token_from_stdin()?,
    };

    let config = Config::load()?;
    let session = AuthSession::new(token_store(&config)?)?;
    session.set(&token)?;

    CommandOutput::new(json!({ "action": "login", "success": true }))
        .with_text(format!("{}", "Logged in".green()))
        .print(output)
}

/// Forget the stored session token
pub fn cmd_logout(output: OutputOptions) -> Result<()> {
    let config = Config::load()?;
    let session = AuthSession::new(token_store(&config)?)?;
    let was_signed_in = session.is_signed_in();
    session.clear()?;

    let text = if was_signed_in {
        "Logged out".to_string()
    } else {
        "Not logged in".dimmed().to_string()
    };
    CommandOutput::new(json!({ "action": "logout", "was_logged_in": was_signed_in }))
        .with_text(text)
        .print(output)
}

/// Report whether a token is available, without printing it
pub fn cmd_token(output: OutputOptions) -> Result<()> {
    let config = Config::load()?;
    let from_env = Config::env_token().is_some();
    let session = AuthSession::new(token_store(&config)?)?;
    let signed_in = session.is_signed_in();

    let source = if from_env { "environment" } else { "session file" };
    let text = if signed_in {
        format!("{} (from {source})", "Token present".green())
    } else {
        format!("{}", "No token. Run: backoffice login".yellow())
    };
    CommandOutput::new(json!({
        "logged_in": signed_in,
        "source": signed_in.then_some(source),
    }))
    .with_text(text)
    .print(output)
}
