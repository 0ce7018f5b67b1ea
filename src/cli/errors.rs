//! CLI-specific error formatting for user-facing messages.

use crate::config::ConfigError;
use crate::error::PlaidCliError;
use crate::link::LinkError;
use crate::provider::{ProviderError, ProviderErrorKind};

/// Map a [`PlaidCliError`] to a user-facing message with actionable guidance.
pub fn format_error_help(err: &PlaidCliError) -> String {
    match err {
        PlaidCliError::Config(ConfigError::MissingCredential { key, env }) => format!(
            "{env} is not set. Export it, add it to .env, or set `{key}` in ~/.plaid-cli/config.toml"
        ),
        PlaidCliError::Link(LinkError::Listener { port, message }) => format!(
            "Could not listen on port {port} ({message}). Pick another with: plaid-cli link --port <PORT>"
        ),
        PlaidCliError::Link(LinkError::Timeout(_)) => {
            format!("{err}. Run the command again, or raise the limit with --timeout <SECS>")
        }
        PlaidCliError::Provider(provider) | PlaidCliError::Link(LinkError::Provider(provider)) => {
            format_provider_help(provider)
        }
        other => format!("{other}"),
    }
}

fn format_provider_help(err: &ProviderError) -> String {
    let message = match err {
        ProviderError::Api {
            display_message: Some(display),
            ..
        } => format!("{err} ({display})"),
        _ => err.to_string(),
    };
    match err.kind() {
        Some(ProviderErrorKind::ItemLoginRequired) => {
            format!("{message}. Run: plaid-cli link <ITEM-ID-OR-ALIAS>")
        }
        Some(ProviderErrorKind::InvalidApiKeys) => {
            format!("{message}. Check PLAID_CLIENT_ID, PLAID_SECRET and PLAID_ENVIRONMENT")
        }
        _ => message,
    }
}
