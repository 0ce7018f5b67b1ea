use std::path::PathBuf;

use thiserror::Error;

/// Failures reading or updating the credential store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No access token found for item ID `{0}`. Try re-linking your account with `plaid-cli link`")]
    UnknownItem(String),
    #[error("Invalid alias `{0}`: valid characters are [0-9A-Za-z_]")]
    InvalidAlias(String),
    #[error("Could not parse {path}: {message}")]
    Corrupt { path: PathBuf, message: String },
    #[error("Could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
