//! Relink-and-retry for API calls that fail because the item's login expired.

use std::future::Future;

use tracing::info;

use super::{LinkError, Linker};
use crate::provider::ProviderError;
use crate::store::CredentialStore;

impl Linker {
    /// Run `action`; if Plaid reports the item's login has expired, relink
    /// `item_id` and run `action` exactly once more.
    ///
    /// The second attempt's result is returned as-is, expired or not.
    pub async fn with_relink_on_expiry<T, F, Fut>(
        &self,
        store: &CredentialStore,
        item_id: &str,
        port: u16,
        mut action: F,
    ) -> Result<T, LinkError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        match action().await {
            Err(err) if err.is_credential_expired() => {
                info!(item_id, "Login expired. Relinking...");
                self.relink(store, item_id, port).await?;
                info!(item_id, "Re-running action...");
                Ok(action().await?)
            }
            result => Ok(result?),
        }
    }
}
