//! Plaid API abstraction and its HTTP implementation.

pub mod error;
pub mod plaid;
pub mod types;

pub use error::{ProviderError, ProviderErrorKind};
pub use plaid::{PlaidClient, PlaidEnvironment};
pub use types::{
    Account, InstitutionRequest, Item, LinkToken, LinkTokenRequest, Product, PublicToken,
    TokenPair, Transaction, TransactionsPage, TransactionsRequest,
};

use async_trait::async_trait;

/// Operations the CLI needs from Plaid.
///
/// The linking flow only uses [`create_link_token`](PlaidApi::create_link_token)
/// and [`exchange_public_token`](PlaidApi::exchange_public_token); the data
/// commands use the rest.
#[async_trait]
pub trait PlaidApi: Send + Sync {
    async fn create_link_token(&self, request: &LinkTokenRequest)
        -> Result<LinkToken, ProviderError>;

    async fn exchange_public_token(&self, token: &PublicToken) -> Result<TokenPair, ProviderError>;

    async fn get_accounts(&self, access_token: &str) -> Result<Vec<Account>, ProviderError>;

    async fn get_transactions(
        &self,
        request: &TransactionsRequest,
    ) -> Result<TransactionsPage, ProviderError>;

    async fn get_item(&self, access_token: &str) -> Result<Item, ProviderError>;

    async fn get_institution(
        &self,
        request: &InstitutionRequest,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Fetch every page of transactions, starting from `request.offset`.
    async fn all_transactions(
        &self,
        request: &TransactionsRequest,
    ) -> Result<Vec<Transaction>, ProviderError> {
        let mut request = request.clone();
        let first = self.get_transactions(&request).await?;
        let total = first.total_transactions as usize;
        let mut transactions = first.transactions;

        while transactions.len() < total {
            request.offset += request.count;
            let page = self.get_transactions(&request).await?;
            if page.transactions.is_empty() {
                tracing::warn!(
                    fetched = transactions.len(),
                    total,
                    "Plaid returned an empty page before all transactions were fetched"
                );
                break;
            }
            transactions.extend(page.transactions);
        }

        Ok(transactions)
    }
}
