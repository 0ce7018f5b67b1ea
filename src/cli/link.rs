//! Handler for `plaid-cli link`.

use std::io::{self, BufRead, IsTerminal, Write};

use tracing::info;

use super::Context;
use crate::error::Result;
use crate::link::Linker;
use crate::store::{validate_alias, CredentialStore};

/// Handle `plaid-cli link [ITEM-ID-OR-ALIAS]`.
///
/// With an item, refreshes its login. Without one, links a new institution,
/// saves its token and offers to alias it.
pub async fn handle_link(
    linker: &Linker,
    ctx: &mut Context,
    item: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    let port = ctx.config.link_port;

    if let Some(item_id) = item.and_then(|item| ctx.store.resolve(item)) {
        linker.relink(&ctx.store, item_id, port).await?;
        info!(item_id, "Institution relinked!");
        return Ok(());
    }

    let pair = linker.link(port).await?;
    let item_id = pair.item_id.clone();
    ctx.store.insert_token(pair);
    ctx.store.save_tokens()?;

    info!("Institution linked!");
    writeln!(out, "Item ID: {item_id}")?;

    if let Some(alias) = ctx.store.alias_for(&item_id) {
        writeln!(out, "Alias: {alias}")?;
        return Ok(());
    }

    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return Ok(());
    }
    info!("You can give the institution a friendly alias and use that instead of the item ID in most commands.");
    if let Some(alias) = prompt_alias(&mut stdin.lock(), &mut io::stderr())? {
        set_alias(&mut ctx.store, &item_id, &alias)?;
    }
    Ok(())
}

fn set_alias(store: &mut CredentialStore, item_id: &str, alias: &str) -> Result<()> {
    store.set_alias(item_id, alias)?;
    store.save_aliases()?;
    Ok(())
}

/// Ask for an alias until the answer is valid. Empty input means no alias.
pub(crate) fn prompt_alias(
    input: &mut impl BufRead,
    prompt: &mut impl Write,
) -> Result<Option<String>> {
    loop {
        write!(prompt, "Alias (default: none): ")?;
        prompt.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let alias = line.trim();
        if alias.is_empty() {
            return Ok(None);
        }
        match validate_alias(alias) {
            Ok(()) => return Ok(Some(alias.to_string())),
            Err(err) => writeln!(prompt, "{err}")?,
        }
    }
}
