#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use plaid_cli::link::BrowserOpener;
use plaid_cli::provider::{
    Account, InstitutionRequest, Item, LinkToken, LinkTokenRequest, PlaidApi, ProviderError,
    PublicToken, TokenPair, Transaction, TransactionsPage, TransactionsRequest,
};
use serde_json::json;
use tokio::task::JoinHandle;

pub const LINK_TOKEN: &str = "link-sandbox-9f1c2a";
pub const ITEM_ID: &str = "item_123";
pub const ACCESS_TOKEN: &str = "tok_abc";

/// In-memory [`PlaidApi`] that records what the linker asked for.
pub struct StubPlaid {
    link_requests: Mutex<Vec<LinkTokenRequest>>,
    exchanged: Mutex<Vec<String>>,
    link_token_error: Mutex<Option<ProviderError>>,
    accounts: Mutex<VecDeque<Result<Vec<Account>, ProviderError>>>,
    account_calls: Mutex<usize>,
    transactions: Vec<Transaction>,
}

impl Default for StubPlaid {
    fn default() -> Self {
        Self {
            link_requests: Mutex::new(Vec::new()),
            exchanged: Mutex::new(Vec::new()),
            link_token_error: Mutex::new(None),
            accounts: Mutex::new(VecDeque::new()),
            account_calls: Mutex::new(0),
            transactions: Vec::new(),
        }
    }
}

impl StubPlaid {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_transactions(transactions: Vec<Transaction>) -> Arc<Self> {
        Arc::new(Self {
            transactions,
            ..Self::default()
        })
    }

    pub fn fail_link_token(&self, err: ProviderError) {
        *self.link_token_error.lock().expect("stub lock poisoned") = Some(err);
    }

    pub fn push_accounts(&self, result: Result<Vec<Account>, ProviderError>) {
        self.accounts
            .lock()
            .expect("stub lock poisoned")
            .push_back(result);
    }

    pub fn link_requests(&self) -> Vec<LinkTokenRequest> {
        self.link_requests.lock().expect("stub lock poisoned").clone()
    }

    pub fn exchanged(&self) -> Vec<String> {
        self.exchanged.lock().expect("stub lock poisoned").clone()
    }

    pub fn account_calls(&self) -> usize {
        *self.account_calls.lock().expect("stub lock poisoned")
    }
}

#[async_trait]
impl PlaidApi for StubPlaid {
    async fn create_link_token(
        &self,
        request: &LinkTokenRequest,
    ) -> Result<LinkToken, ProviderError> {
        let failure = self
            .link_token_error
            .lock()
            .expect("stub lock poisoned")
            .take();
        if let Some(err) = failure {
            return Err(err);
        }
        self.link_requests
            .lock()
            .expect("stub lock poisoned")
            .push(request.clone());
        Ok(LinkToken::new(LINK_TOKEN))
    }

    async fn exchange_public_token(&self, token: &PublicToken) -> Result<TokenPair, ProviderError> {
        self.exchanged
            .lock()
            .expect("stub lock poisoned")
            .push(token.as_str().to_string());
        Ok(TokenPair {
            item_id: ITEM_ID.to_string(),
            access_token: format!("access-for-{}", token.as_str()),
        })
    }

    async fn get_accounts(&self, _access_token: &str) -> Result<Vec<Account>, ProviderError> {
        *self.account_calls.lock().expect("stub lock poisoned") += 1;
        self.accounts
            .lock()
            .expect("stub lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn get_transactions(
        &self,
        request: &TransactionsRequest,
    ) -> Result<TransactionsPage, ProviderError> {
        let page = self
            .transactions
            .iter()
            .skip(request.offset as usize)
            .take(request.count as usize)
            .cloned()
            .collect();
        Ok(TransactionsPage {
            transactions: page,
            total_transactions: self.transactions.len() as u32,
        })
    }

    async fn get_item(&self, _access_token: &str) -> Result<Item, ProviderError> {
        Ok(serde_json::from_value(json!({
            "item_id": ITEM_ID,
            "institution_id": "ins_3",
        }))
        .expect("item json"))
    }

    async fn get_institution(
        &self,
        request: &InstitutionRequest,
    ) -> Result<serde_json::Value, ProviderError> {
        Ok(json!({
            "institution_id": request.institution_id,
            "name": "Chase",
            "country_codes": request.country_codes,
        }))
    }
}

pub fn login_required() -> ProviderError {
    ProviderError::from_response(
        400,
        r#"{"error_type":"ITEM_ERROR","error_code":"ITEM_LOGIN_REQUIRED","error_message":"the login details of this item have changed","display_message":null,"request_id":"req-1"}"#,
    )
}

pub fn transaction(id: &str, date: &str, amount: f64, name: &str) -> Transaction {
    serde_json::from_value(json!({
        "transaction_id": id,
        "account_id": "acc_1",
        "amount": amount,
        "iso_currency_code": "USD",
        "date": date,
        "name": name,
        "merchant_name": null,
        "pending": false,
    }))
    .expect("transaction json")
}

/// One thing the scripted browser does against the callback server.
#[derive(Debug, Clone)]
pub enum Step {
    Get,
    Post(Vec<(&'static str, &'static str)>),
    Send(reqwest::Method),
}

/// What the callback server answered. Status 0 means the request failed.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

/// A [`BrowserOpener`] that drives the page over HTTP instead of rendering it.
pub struct ScriptedBrowser {
    steps: Vec<Step>,
    opened: Mutex<Vec<String>>,
    task: Mutex<Option<JoinHandle<Vec<Reply>>>>,
}

impl ScriptedBrowser {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps,
            opened: Mutex::new(Vec::new()),
            task: Mutex::new(None),
        })
    }

    /// A browser that never reaches the page.
    pub fn idle() -> Arc<Self> {
        Self::new(Vec::new())
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().expect("browser lock poisoned").clone()
    }

    /// Wait for the script to finish and return every reply in order.
    pub async fn replies(&self) -> Vec<Reply> {
        let task = self.task.lock().expect("browser lock poisoned").take();
        match task {
            Some(task) => task.await.expect("browser task panicked"),
            None => Vec::new(),
        }
    }
}

impl BrowserOpener for ScriptedBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        self.opened
            .lock()
            .expect("browser lock poisoned")
            .push(url.to_string());

        let url = url.to_string();
        let steps = self.steps.clone();
        let task = tokio::spawn(async move {
            let client = reqwest::Client::new();
            let mut replies = Vec::new();
            for step in steps {
                let request = match step {
                    Step::Get => client.get(&url),
                    Step::Post(fields) => client.post(&url).form(&fields),
                    Step::Send(method) => client.request(method, &url),
                };
                let reply = match request.send().await {
                    Ok(resp) => {
                        let status = resp.status().as_u16();
                        Reply {
                            status,
                            body: resp.text().await.unwrap_or_default(),
                        }
                    }
                    Err(err) => Reply {
                        status: 0,
                        body: err.to_string(),
                    },
                };
                replies.push(reply);
            }
            replies
        });
        *self.task.lock().expect("browser lock poisoned") = Some(task);
        Ok(())
    }
}

/// A browser that cannot be launched.
pub struct BrokenBrowser;

impl BrowserOpener for BrokenBrowser {
    fn open(&self, _url: &str) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::NotFound, "no browser installed"))
    }
}
