use thiserror::Error;

use crate::provider::ProviderError;

/// Ways a link or relink flow can end without success.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The callback payload was missing or malformed.
    #[error("Unexpected callback from Plaid Link: {0}")]
    Protocol(String),

    /// The Link widget exited and reported an error.
    #[error("Plaid Link reported an error: {0}")]
    Widget(String),

    #[error("Could not start callback server on port {port}: {message}")]
    Listener { port: u16, message: String },

    #[error("Callback server failed: {0}")]
    Server(String),

    #[error("Timed out after {0}ms waiting for Plaid Link to finish")]
    Timeout(u64),

    #[error("No access token found for item ID `{0}`. Try re-linking your account with `plaid-cli link`")]
    UnknownItem(String),
}
