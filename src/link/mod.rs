//! Browser-based linking: the coordinator that drives Plaid Link through a
//! short-lived local callback server.
//!
//! A flow requests a link token, serves the widget page on
//! `http://<host>:<port>/<flow>`, opens the browser and then waits for the
//! first completion signal from the page. The server is shut down as soon as
//! the flow resolves.
//!
//! ```no_run
//! use std::sync::Arc;
//! use plaid_cli::link::{LinkSettings, Linker};
//! use plaid_cli::provider::{PlaidClient, PlaidEnvironment};
//!
//! # async fn example() -> Result<(), plaid_cli::link::LinkError> {
//! let api = Arc::new(PlaidClient::new("id", "secret", PlaidEnvironment::Sandbox));
//! let linker = Linker::new(api, LinkSettings::new("en", vec!["US".into()]));
//! let pair = linker.link(8080).await?;
//! println!("{}", pair.item_id);
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod error;
pub mod page;
mod recovery;
mod server;

pub use browser::{BrowserOpener, SystemBrowser};
pub use error::LinkError;

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::provider::{LinkToken, LinkTokenRequest, PlaidApi, Product, PublicToken, TokenPair};
use crate::store::CredentialStore;
use crate::util::host::hostname;
use crate::util::timeout::with_timeout;
use server::{CallbackServer, Receivers};

/// Which widget flow a callback server is hosting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    /// New connection; completes with a public token.
    Link,
    /// Update mode for an existing item; completes with no payload.
    Relink,
}

impl FlowKind {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Link => "/link",
            Self::Relink => "/relink",
        }
    }
}

/// Parameters shared by every link token the coordinator requests.
#[derive(Debug, Clone)]
pub struct LinkSettings {
    pub client_name: String,
    pub language: String,
    pub country_codes: Vec<String>,
    pub products: Vec<Product>,
    pub client_user_id: String,
    /// Interface the callback server binds to.
    pub host: IpAddr,
    /// Deadline for the browser step. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl LinkSettings {
    pub fn new(language: impl Into<String>, country_codes: Vec<String>) -> Self {
        Self {
            client_name: "plaid-cli".to_string(),
            language: language.into(),
            country_codes,
            products: vec![Product::Transactions, Product::Auth],
            client_user_id: hostname(),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_client_user_id(mut self, id: impl Into<String>) -> Self {
        self.client_user_id = id.into();
        self
    }

    fn token_request(&self, access_token: Option<String>) -> LinkTokenRequest {
        LinkTokenRequest {
            client_name: self.client_name.clone(),
            language: self.language.clone(),
            country_codes: self.country_codes.clone(),
            client_user_id: self.client_user_id.clone(),
            products: self.products.clone(),
            access_token,
        }
    }
}

/// Runs link and relink flows against a [`PlaidApi`].
pub struct Linker {
    api: Arc<dyn PlaidApi>,
    settings: LinkSettings,
    browser: Arc<dyn BrowserOpener>,
}

impl Linker {
    pub fn new(api: Arc<dyn PlaidApi>, settings: LinkSettings) -> Self {
        Self {
            api,
            settings,
            browser: Arc::new(SystemBrowser),
        }
    }

    pub fn with_browser(mut self, browser: Arc<dyn BrowserOpener>) -> Self {
        self.browser = browser;
        self
    }

    /// The client this linker requests link tokens from.
    pub fn api(&self) -> Arc<dyn PlaidApi> {
        Arc::clone(&self.api)
    }

    /// Link a new institution and return its credentials.
    ///
    /// The caller is responsible for persisting the returned pair.
    pub async fn link(&self, port: u16) -> Result<TokenPair, LinkError> {
        let token = self
            .api
            .create_link_token(&self.settings.token_request(None))
            .await?;

        let mut session = self.start(FlowKind::Link, token, port).await?;
        let outcome = with_timeout(self.settings.timeout, session.wait_for_public_token()).await;
        session.close().await;

        let public_token = outcome?;
        Ok(self.api.exchange_public_token(&public_token).await?)
    }

    /// Refresh the login for `item_id` using Link update mode.
    ///
    /// The stored access token stays valid and is not modified.
    pub async fn relink(
        &self,
        store: &CredentialStore,
        item_id: &str,
        port: u16,
    ) -> Result<(), LinkError> {
        let access_token = store
            .access_token(item_id)
            .ok_or_else(|| LinkError::UnknownItem(item_id.to_string()))?;
        let token = self
            .api
            .create_link_token(&self.settings.token_request(Some(access_token.to_string())))
            .await?;

        let mut session = self.start(FlowKind::Relink, token, port).await?;
        let outcome = with_timeout(self.settings.timeout, session.wait_for_relink()).await;
        session.close().await;
        outcome
    }

    async fn start(
        &self,
        flow: FlowKind,
        token: LinkToken,
        port: u16,
    ) -> Result<Session, LinkError> {
        let listener = server::bind(self.settings.host, port).await?;
        let (senders, receivers) = server::channels();
        let errors = senders.errors.clone();
        let router = server::router(flow, token, senders);
        let server = CallbackServer::spawn(listener, router, errors)?;

        let addr = server.local_addr();
        let url = format!("http://{addr}{}", flow.path());
        info!(port = addr.port(), "Starting Plaid Link on port {}...", addr.port());

        match self.browser.open(&url) {
            Ok(()) => info!(
                url = %url,
                "Your browser should open automatically. If it doesn't, please visit {url} to continue linking!"
            ),
            Err(err) => warn!(
                error = %err,
                url = %url,
                "Could not open browser automatically. Please visit {url} to continue linking!"
            ),
        }

        Ok(Session { server, receivers })
    }
}

/// One in-progress flow: the running server plus the coordinator's receivers.
struct Session {
    server: CallbackServer,
    receivers: Receivers,
}

impl Session {
    async fn wait_for_public_token(&mut self) -> Result<PublicToken, LinkError> {
        let Receivers {
            results, errors, ..
        } = &mut self.receivers;
        tokio::select! {
            biased;
            Some(err) = errors.recv() => Err(err),
            Some(token) = results.recv() => Ok(token),
            else => Err(LinkError::Server(
                "callback server stopped before Plaid Link finished".to_string(),
            )),
        }
    }

    async fn wait_for_relink(&mut self) -> Result<(), LinkError> {
        let Receivers {
            relinked, errors, ..
        } = &mut self.receivers;
        tokio::select! {
            biased;
            Some(err) = errors.recv() => Err(err),
            Some(_) = relinked.recv() => Ok(()),
            else => Err(LinkError::Server(
                "callback server stopped before Plaid Link finished".to_string(),
            )),
        }
    }

    /// Drop the receivers so late callbacks fail fast, then stop the server.
    async fn close(self) {
        let Session { server, receivers } = self;
        drop(receivers);
        server.shutdown().await;
    }
}
