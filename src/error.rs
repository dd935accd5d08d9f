//! Error types for the proverbs client

use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ProverbError>;

/// Client error types
#[derive(Error, Debug)]
pub enum ProverbError {
    /// An operation needs a signed-in user and there is none
    #[error("No user is signed in")]
    NotSignedIn,

    /// Identity provider rejected or cancelled the request
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Malformed database path or conflicting multi-path update
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Snapshot could not be converted to or from JSON
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Optimistic transaction kept conflicting
    #[error("Transaction on {path} aborted after {attempts} attempts")]
    TransactionAborted { path: String, attempts: u32 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ProverbError {
    fn from(err: serde_json::Error) -> Self {
        ProverbError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ProverbError {
    fn from(err: toml::de::Error) -> Self {
        ProverbError::Config(err.to_string())
    }
}

impl From<std::io::Error> for ProverbError {
    fn from(err: std::io::Error) -> Self {
        ProverbError::Config(err.to_string())
    }
}
