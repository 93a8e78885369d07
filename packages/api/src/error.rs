//! Error types for the backend client.

use thiserror::Error;

/// Credential and session failures.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The auth service answered with an error status
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An operation needed a signed-in user
    #[error("Not signed in")]
    NoSession,

    /// The auth service answered with something we could not read
    #[error("Invalid auth response: {0}")]
    InvalidResponse(String),
}

/// Table read/write failures.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No row matched; callers treat this as "no profile yet"
    #[error("Row not found")]
    NotFound,

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid table response: {0}")]
    InvalidResponse(String),
    /// The session could not be refreshed before the call
    #[error("Session expired: {0}")]
    Auth(#[from] AuthError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

/// Upload and URL generation failures.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid storage response: {0}")]
    InvalidResponse(String),
    #[error("Session expired: {0}")]
    Auth(#[from] AuthError),
}

/// Transport failure of a plain fetch (the avatar probe).
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unreachable: {0}")]
    Unreachable(String),
}

/// Missing or malformed backend configuration.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

/// Pull a human-readable message out of an error body.
///
/// The hosted services disagree on the field name (`msg`, `message`,
/// `error_description`, `error`), so take the first one present and fall back
/// to the raw body.
pub(crate) fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|value| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}
