//! plaid-cli: link bank accounts through Plaid and pull their data from the
//! command line.
//!
//! The interesting part is [`link`]: a short-lived local HTTP server hosts
//! the Plaid Link widget, and the waiting command is woken through channels
//! when the browser posts back. [`store`] keeps the resulting access tokens
//! and aliases on disk; [`provider`] talks to the Plaid API.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use plaid_cli::link::{LinkSettings, Linker};
//! use plaid_cli::provider::{PlaidClient, PlaidEnvironment};
//! use plaid_cli::store::CredentialStore;
//!
//! # async fn example() -> plaid_cli::error::Result<()> {
//! let mut store = CredentialStore::load("/tmp/plaid-cli")?;
//! let api = Arc::new(PlaidClient::new("client-id", "secret", PlaidEnvironment::Sandbox));
//! let linker = Linker::new(api, LinkSettings::new("en", vec!["US".into()]));
//!
//! let pair = linker.link(8080).await?;
//! store.insert_token(pair);
//! store.save()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod link;
pub mod output;
pub mod provider;
pub mod store;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
