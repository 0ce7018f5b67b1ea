//! Handlers for commands that read data from a linked institution.

use std::io::Write;
use std::sync::Arc;

use chrono::NaiveDate;

use super::{Context, InstitutionArgs, TransactionsArgs};
use crate::error::{PlaidCliError, Result};
use crate::link::Linker;
use crate::output::{write_json, write_transactions, OutputFormat};
use crate::provider::{InstitutionRequest, PlaidApi, ProviderError, TransactionsRequest};
use crate::store::StoreError;

/// Resolve an item or alias to `(item_id, access_token)`.
fn credentials<'a>(ctx: &'a Context, item_or_alias: &'a str) -> Result<(&'a str, String)> {
    let item_id = ctx
        .store
        .resolve(item_or_alias)
        .ok_or_else(|| PlaidCliError::InvalidArgument("an item ID or alias is required".into()))?;
    let token = ctx
        .store
        .access_token(item_id)
        .ok_or_else(|| StoreError::UnknownItem(item_id.to_string()))?;
    Ok((item_id, token.to_string()))
}

fn parse_date(flag: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        PlaidCliError::InvalidArgument(format!(
            "--{flag} must be a date in YYYY-MM-DD format, got `{value}`"
        ))
    })
}

/// Handle `plaid-cli accounts <ITEM-ID-OR-ALIAS>`.
pub async fn handle_accounts(
    linker: &Linker,
    ctx: &Context,
    item_or_alias: &str,
    out: &mut impl Write,
) -> Result<()> {
    let (item_id, token) = credentials(ctx, item_or_alias)?;
    let api = linker.api();

    let accounts = linker
        .with_relink_on_expiry(&ctx.store, item_id, ctx.config.link_port, || {
            let api = Arc::clone(&api);
            let token = token.clone();
            async move { api.get_accounts(&token).await }
        })
        .await?;

    write_json(out, &accounts)
}

/// Handle `plaid-cli transactions <ITEM-ID-OR-ALIAS> -f FROM -t TO`.
pub async fn handle_transactions(
    linker: &Linker,
    ctx: &Context,
    args: &TransactionsArgs,
    out: &mut impl Write,
) -> Result<()> {
    let from = parse_date("from", &args.from)?;
    let to = parse_date("to", &args.to)?;
    if from > to {
        return Err(PlaidCliError::InvalidArgument(format!(
            "--from ({from}) must not be after --to ({to})"
        )));
    }
    let format = OutputFormat::parse(&args.output_format)?;
    let (item_id, token) = credentials(ctx, &args.item)?;

    let mut request = TransactionsRequest::new(token, from.to_string(), to.to_string());
    if let Some(account_id) = args.account_id.as_deref().filter(|id| !id.is_empty()) {
        request.account_ids = vec![account_id.to_string()];
    }
    let api = linker.api();

    let transactions = linker
        .with_relink_on_expiry(&ctx.store, item_id, ctx.config.link_port, || {
            let api = Arc::clone(&api);
            let request = request.clone();
            async move { api.all_transactions(&request).await }
        })
        .await?;

    write_transactions(out, format, &transactions)
}

/// Handle `plaid-cli institution <ITEM-ID-OR-ALIAS>`.
pub async fn handle_institution(
    linker: &Linker,
    ctx: &Context,
    args: &InstitutionArgs,
    out: &mut impl Write,
) -> Result<()> {
    let (item_id, token) = credentials(ctx, &args.item)?;
    let api = linker.api();
    let countries = ctx.config.countries.clone();
    let (include_status, include_optional_metadata) = (args.status, args.optional_metadata);

    let institution = linker
        .with_relink_on_expiry(&ctx.store, item_id, ctx.config.link_port, || {
            let api = Arc::clone(&api);
            let token = token.clone();
            let country_codes = countries.clone();
            async move {
                let item = api.get_item(&token).await?;
                let institution_id = item.institution_id.ok_or_else(|| {
                    ProviderError::InvalidResponse(format!(
                        "item {} has no institution ID",
                        item.item_id
                    ))
                })?;
                api.get_institution(&InstitutionRequest {
                    institution_id,
                    country_codes,
                    include_optional_metadata,
                    include_status,
                })
                .await
            }
        })
        .await?;

    write_json(out, &institution)
}
