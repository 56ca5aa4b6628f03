//! Process-wide authentication session.
//!
//! The bearer token lives in one [`AuthSession`]. The HTTP client reads it
//! for every request and calls [`AuthSession::expire`] on a 401, which clears
//! the stored token and broadcasts [`SessionEvent::SignedOut`] so any
//! interested component can react (return to the login prompt, stop polling).

use std::fmt;
use std::fs;
use std::path::PathBuf;

use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::{BackofficeError, Result};

const EVENT_CAPACITY: usize = 16;
const SESSION_FILE: &str = "session.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    /// The user logged out
    Manual,
    /// The backend answered 401
    Unauthorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    SignedOut { reason: SignOutReason },
}

/// Persistent storage for the session token.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Keeps the token only for the lifetime of the process.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: RwLock::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.token.read().clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.token.write() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.write() = None;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct StoredSession {
    token: String,
}

/// Stores the token in a YAML file, by default in the platform data directory.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the user's data directory, e.g.
    /// `~/.local/share/backoffice/session.yaml` on Linux.
    pub fn default_location() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "backoffice").ok_or_else(|| {
            BackofficeError::Config("could not determine a home directory".to_string())
        })?;
        Ok(Self::new(dirs.data_dir().join(SESSION_FILE)))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let stored: StoredSession = serde_yaml_ng::from_str(&content)?;
        Ok(Some(stored.token).filter(|t| !t.is_empty()))
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_yaml_ng::to_string(&StoredSession {
            token: token.to_string(),
        })?;
        fs::write(&self.path, content)?;

        // Owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct AuthSession {
    token: RwLock<Option<SecretBox<String>>>,
    store: Box<dyn TokenStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &self.token.read().as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl AuthSession {
    /// Create a session, restoring any token the store already holds.
    pub fn new(store: Box<dyn TokenStore>) -> Result<Self> {
        let token = store.load()?.map(|t| SecretBox::new(Box::new(t)));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            token: RwLock::new(token),
            store,
            events,
        })
    }

    /// Session that only lives in memory, starting signed out.
    pub fn in_memory() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            token: RwLock::new(None),
            store: Box::new(MemoryTokenStore::new()),
            events,
        }
    }

    pub fn get(&self) -> Option<String> {
        self.token
            .read()
            .as_ref()
            .map(|t| t.expose_secret().clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.read().is_some()
    }

    pub fn set(&self, token: &str) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(BackofficeError::InvalidInput(
                "token cannot be empty".to_string(),
            ));
        }
        self.store.save(token)?;
        *self.token.write() = Some(SecretBox::new(Box::new(token.to_string())));
        let _ = self.events.send(SessionEvent::SignedIn);
        Ok(())
    }

    /// Log out on the user's request.
    pub fn clear(&self) -> Result<()> {
        self.sign_out(SignOutReason::Manual)
    }

    /// Log out because the backend rejected the token.
    pub fn expire(&self) {
        if let Err(e) = self.sign_out(SignOutReason::Unauthorized) {
            tracing::warn!("Failed to clear stored session token: {e}");
        }
    }

    fn sign_out(&self, reason: SignOutReason) -> Result<()> {
        let was_signed_in = self.token.write().take().is_some();
        let stored = self.store.clear();
        if was_signed_in {
            tracing::debug!(?reason, "session signed out");
            let _ = self.events.send(SessionEvent::SignedOut { reason });
        }
        stored
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}
