use thiserror::Error;

use crate::validation::ValidationErrors;

/// Error taxonomy as seen by callers of the controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Client-side field validation, never sent to the server
    Validation,
    /// The backend answered with a failure
    Request,
    /// No response was received
    Network,
    /// The backend rejected the session (HTTP 401)
    Auth,
    /// Local problems: configuration, files, bad input
    Local,
}

#[derive(Error, Debug)]
pub enum BackofficeError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("{message}")]
    Request {
        /// HTTP status, absent when a 2xx body carried `status: false`
        status: Option<u16>,
        message: String,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("session expired or invalid, please log in again")]
    Auth,

    #[error("page {requested} is out of range (last page is {last_page})")]
    PageOutOfRange { requested: u32, last_page: u32 },

    #[error("invalid list parameters: {0}")]
    InvalidParams(String),

    #[error("unexpected response shape: {0}")]
    UnexpectedResponse(String),

    #[error("unknown collection '{0}'")]
    UnknownCollection(String),

    #[error("record '{0}' not found")]
    RecordNotFound(String),

    #[error("no form is open")]
    FormNotOpen,

    #[error("a submission is already in progress")]
    SubmitInProgress,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not logged in. Run: backoffice login")]
    NotLoggedIn,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BackofficeError {
    /// Shorthand for a request failure with the generic message.
    pub fn request_failed(status: Option<u16>) -> Self {
        BackofficeError::Request {
            status,
            message: "request failed".to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BackofficeError::Validation(_) => ErrorKind::Validation,
            BackofficeError::Request { .. } | BackofficeError::UnexpectedResponse(_) => {
                ErrorKind::Request
            }
            BackofficeError::Network(_) => ErrorKind::Network,
            BackofficeError::Auth => ErrorKind::Auth,
            _ => ErrorKind::Local,
        }
    }
}

pub type Result<T> = std::result::Result<T, BackofficeError>;
