use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Short-lived token that configures one Link widget session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkToken(String);

impl LinkToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Token posted back by the Link widget; exchanged exactly once for an access token.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicToken(String);

impl PublicToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PublicToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PublicToken(..)")
    }
}

/// Durable credentials for one linked institution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub item_id: String,
    pub access_token: String,
}

/// Plaid products requested when creating a link token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Product {
    Transactions,
    Auth,
}

/// Parameters for `/link/token/create`.
///
/// `access_token` switches Link into update mode for an existing item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTokenRequest {
    pub client_name: String,
    pub language: String,
    pub country_codes: Vec<String>,
    pub client_user_id: String,
    pub products: Vec<Product>,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balances {
    pub available: Option<f64>,
    pub current: Option<f64>,
    pub limit: Option<f64>,
    pub iso_currency_code: Option<String>,
    pub unofficial_currency_code: Option<String>,
}

/// An account held at a linked institution.
///
/// Fields the CLI does not interpret are kept in `extra` so they survive
/// when the account is printed back out as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub name: String,
    pub official_name: Option<String>,
    pub mask: Option<String>,
    #[serde(rename = "type")]
    pub account_type: String,
    pub subtype: Option<String>,
    pub balances: Balances,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub account_id: String,
    pub amount: f64,
    pub iso_currency_code: Option<String>,
    pub date: String,
    pub name: String,
    pub merchant_name: Option<String>,
    #[serde(default)]
    pub pending: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Parameters for `/transactions/get`. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionsRequest {
    pub access_token: String,
    pub start_date: String,
    pub end_date: String,
    pub account_ids: Vec<String>,
    pub count: u32,
    pub offset: u32,
}

impl TransactionsRequest {
    pub const PAGE_SIZE: u32 = 100;

    pub fn new(
        access_token: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
            account_ids: Vec::new(),
            count: Self::PAGE_SIZE,
            offset: 0,
        }
    }
}

/// One page of `/transactions/get`.
#[derive(Debug, Clone)]
pub struct TransactionsPage {
    pub transactions: Vec<Transaction>,
    pub total_transactions: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub item_id: String,
    pub institution_id: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Parameters for `/institutions/get_by_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstitutionRequest {
    pub institution_id: String,
    pub country_codes: Vec<String>,
    pub include_optional_metadata: bool,
    pub include_status: bool,
}
