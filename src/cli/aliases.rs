//! Handlers for `tokens`, `alias` and `aliases`.

use std::io::Write;

use crate::error::Result;
use crate::output::write_json;
use crate::store::CredentialStore;

/// Handle `plaid-cli tokens`.
pub fn handle_tokens(store: &CredentialStore, out: &mut impl Write) -> Result<()> {
    write_json(out, &store.tokens_by_name())
}

/// Handle `plaid-cli alias <ITEM-ID> <NAME>`.
pub fn handle_alias(
    store: &mut CredentialStore,
    item_id: &str,
    alias: &str,
    out: &mut impl Write,
) -> Result<()> {
    store.set_alias(item_id, alias)?;
    store.save_aliases()?;
    writeln!(out, "Aliased {item_id} to {alias}.")?;
    Ok(())
}

/// Handle `plaid-cli aliases`.
pub fn handle_aliases(store: &CredentialStore, out: &mut impl Write) -> Result<()> {
    write_json(out, store.aliases())
}
