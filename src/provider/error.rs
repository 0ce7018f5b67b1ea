use serde::Deserialize;
use strum::{AsRefStr, EnumString};
use thiserror::Error;

/// Typed classification of Plaid `error_code` values.
///
/// Only the codes the CLI reacts to get their own variant; everything else is
/// carried through as [`ProviderErrorKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderErrorKind {
    /// The item's credentials expired; the user must go through Link in update mode.
    ItemLoginRequired,
    InvalidAccessToken,
    InvalidPublicToken,
    InvalidLinkToken,
    InvalidApiKeys,
    RateLimitExceeded,
    ProductNotReady,
    InstitutionDown,
    #[strum(default)]
    Other(String),
}

impl ProviderErrorKind {
    pub fn from_code(code: &str) -> Self {
        // `#[strum(default)]` makes parsing infallible.
        code.parse().unwrap_or_else(|_| Self::Other(code.to_string()))
    }

    pub fn as_code(&self) -> &str {
        match self {
            Self::Other(code) => code,
            known => known.as_ref(),
        }
    }
}

/// Errors returned by a [`PlaidApi`](super::PlaidApi) implementation.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Plaid API error {code} ({error_type}): {message}")]
    Api {
        status: u16,
        kind: ProviderErrorKind,
        code: String,
        error_type: String,
        message: String,
        display_message: Option<String>,
        request_id: Option<String>,
    },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Error kind reported by the API, if the failure came from the API at all.
    pub fn kind(&self) -> Option<&ProviderErrorKind> {
        match self {
            Self::Api { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Whether the item needs to be relinked before the request can succeed.
    pub fn is_credential_expired(&self) -> bool {
        matches!(self.kind(), Some(ProviderErrorKind::ItemLoginRequired))
    }

    /// Build an API error from a non-success response body.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<PlaidErrorBody>(body) {
            Ok(parsed) => Self::Api {
                status,
                kind: ProviderErrorKind::from_code(&parsed.error_code),
                code: parsed.error_code,
                error_type: parsed.error_type,
                message: parsed.error_message,
                display_message: parsed.display_message,
                request_id: parsed.request_id,
            },
            Err(_) => Self::InvalidResponse(format!(
                "request failed with status {status}: {}",
                body.trim()
            )),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::InvalidResponse(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlaidErrorBody {
    error_type: String,
    error_code: String,
    #[serde(default)]
    error_message: String,
    display_message: Option<String>,
    request_id: Option<String>,
}
