//! Error types for plaid-cli.

use thiserror::Error;

use crate::config::ConfigError;
use crate::link::LinkError;
use crate::provider::ProviderError;
use crate::store::StoreError;

/// Primary error type for CLI operations.
#[derive(Error, Debug)]
pub enum PlaidCliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, PlaidCliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_convert_transparently() {
        let err: PlaidCliError = StoreError::InvalidAlias("a-b".into()).into();
        assert!(err.to_string().contains("a-b"));
    }

    #[test]
    fn link_provider_errors_keep_their_message() {
        let err: PlaidCliError = LinkError::from(ProviderError::Network("reset".into())).into();
        assert_eq!(err.to_string(), "Network error: reset");
    }
}
