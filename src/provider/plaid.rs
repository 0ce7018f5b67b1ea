use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use strum::{AsRefStr, Display, EnumString};

use super::error::ProviderError;
use super::types::{
    Account, InstitutionRequest, Item, LinkToken, LinkTokenRequest, PublicToken, TokenPair,
    TransactionsPage, TransactionsRequest,
};
use super::PlaidApi;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Plaid deployment to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PlaidEnvironment {
    #[default]
    Sandbox,
    Development,
    Production,
}

impl PlaidEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://sandbox.plaid.com",
            Self::Development => "https://development.plaid.com",
            Self::Production => "https://production.plaid.com",
        }
    }
}

/// JSON-over-HTTPS Plaid client.
///
/// # Example
/// ```no_run
/// use plaid_cli::provider::{PlaidClient, PlaidEnvironment};
///
/// let client = PlaidClient::new("client-id", "secret", PlaidEnvironment::Sandbox);
/// ```
pub struct PlaidClient {
    client: reqwest::Client,
    client_id: String,
    secret: String,
    base_url: String,
}

impl PlaidClient {
    pub fn new(
        client_id: impl Into<String>,
        secret: impl Into<String>,
        environment: PlaidEnvironment,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            client_id: client_id.into(),
            secret: secret.into(),
            base_url: environment.base_url().to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{endpoint}", self.base_url);
        tracing::debug!(%url, "Plaid request");
        let resp = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .header("PLAID-CLIENT-ID", &self.client_id)
            .header("PLAID-SECRET", &self.secret)
            .json(body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_response(status.as_u16(), &text));
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl PlaidApi for PlaidClient {
    async fn create_link_token(
        &self,
        request: &LinkTokenRequest,
    ) -> Result<LinkToken, ProviderError> {
        let mut body = json!({
            "client_name": request.client_name,
            "language": request.language,
            "country_codes": request.country_codes,
            "user": { "client_user_id": request.client_user_id },
            "products": request.products,
        });
        if let Some(access_token) = &request.access_token {
            body["access_token"] = json!(access_token);
        }
        let resp: LinkTokenCreateResponse = self.post("/link/token/create", &body).await?;
        Ok(LinkToken::new(resp.link_token))
    }

    async fn exchange_public_token(&self, token: &PublicToken) -> Result<TokenPair, ProviderError> {
        let body = json!({ "public_token": token.as_str() });
        let resp: PublicTokenExchangeResponse =
            self.post("/item/public_token/exchange", &body).await?;
        Ok(TokenPair {
            item_id: resp.item_id,
            access_token: resp.access_token,
        })
    }

    async fn get_accounts(&self, access_token: &str) -> Result<Vec<Account>, ProviderError> {
        let body = json!({ "access_token": access_token });
        let resp: AccountsGetResponse = self.post("/accounts/get", &body).await?;
        Ok(resp.accounts)
    }

    async fn get_transactions(
        &self,
        request: &TransactionsRequest,
    ) -> Result<TransactionsPage, ProviderError> {
        let mut options = json!({
            "count": request.count,
            "offset": request.offset,
        });
        if !request.account_ids.is_empty() {
            options["account_ids"] = json!(request.account_ids);
        }
        let body = json!({
            "access_token": request.access_token,
            "start_date": request.start_date,
            "end_date": request.end_date,
            "options": options,
        });
        let resp: TransactionsGetResponse = self.post("/transactions/get", &body).await?;
        Ok(TransactionsPage {
            transactions: resp.transactions,
            total_transactions: resp.total_transactions,
        })
    }

    async fn get_item(&self, access_token: &str) -> Result<Item, ProviderError> {
        let body = json!({ "access_token": access_token });
        let resp: ItemGetResponse = self.post("/item/get", &body).await?;
        Ok(resp.item)
    }

    async fn get_institution(
        &self,
        request: &InstitutionRequest,
    ) -> Result<serde_json::Value, ProviderError> {
        let body = json!({
            "institution_id": request.institution_id,
            "country_codes": request.country_codes,
            "options": {
                "include_optional_metadata": request.include_optional_metadata,
                "include_status": request.include_status,
            },
        });
        let resp: InstitutionGetResponse = self.post("/institutions/get_by_id", &body).await?;
        Ok(resp.institution)
    }
}

#[derive(Debug, Deserialize)]
struct LinkTokenCreateResponse {
    link_token: String,
}

#[derive(Debug, Deserialize)]
struct PublicTokenExchangeResponse {
    access_token: String,
    item_id: String,
}

#[derive(Debug, Deserialize)]
struct AccountsGetResponse {
    accounts: Vec<Account>,
}

#[derive(Debug, Deserialize)]
struct TransactionsGetResponse {
    transactions: Vec<super::types::Transaction>,
    total_transactions: u32,
}

#[derive(Debug, Deserialize)]
struct ItemGetResponse {
    item: Item,
}

#[derive(Debug, Deserialize)]
struct InstitutionGetResponse {
    institution: serde_json::Value,
}
