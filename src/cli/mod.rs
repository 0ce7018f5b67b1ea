//! Command-line interface for plaid-cli.

pub mod aliases;
pub mod data;
pub mod errors;
pub mod link;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::CliConfig;
use crate::error::Result;
use crate::link::{LinkSettings, Linker};
use crate::provider::{PlaidApi, PlaidClient};
use crate::store::CredentialStore;

/// Link bank accounts and get transactions from the command line.
#[derive(Parser, Debug)]
#[command(name = "plaid-cli", version, about)]
pub struct Cli {
    /// Directory holding config.toml and linked credentials (default: ~/.plaid-cli)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Link an institution so plaid-cli can pull transactions.
    ///
    /// An item ID or alias can be passed to initiate a relink.
    Link(LinkArgs),
    /// List access tokens
    Tokens,
    /// Give a linked institution a friendly name
    Alias(AliasArgs),
    /// List aliases
    Aliases,
    /// List accounts for a given institution
    Accounts(ItemArgs),
    /// List transactions for a given institution
    Transactions(TransactionsArgs),
    /// Get information about an institution
    Institution(InstitutionArgs),
}

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Item ID or alias of an institution to relink
    #[arg(value_name = "ITEM-ID-OR-ALIAS")]
    pub item: Option<String>,

    /// Port on which to serve Plaid Link
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Give up waiting for the browser after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct AliasArgs {
    #[arg(value_name = "ITEM-ID")]
    pub item_id: String,
    #[arg(value_name = "NAME")]
    pub name: String,
}

#[derive(Args, Debug)]
pub struct ItemArgs {
    #[arg(value_name = "ITEM-ID-OR-ALIAS")]
    pub item: String,
}

#[derive(Args, Debug)]
pub struct TransactionsArgs {
    #[arg(value_name = "ITEM-ID-OR-ALIAS")]
    pub item: String,

    /// Date of first transaction (YYYY-MM-DD)
    #[arg(short, long)]
    pub from: String,

    /// Date of last transaction (YYYY-MM-DD)
    #[arg(short, long)]
    pub to: String,

    /// Output format (json or csv)
    #[arg(short = 'o', long = "output-format", default_value = "json")]
    pub output_format: String,

    /// Fetch transactions for this account ID only
    #[arg(short, long = "account-id")]
    pub account_id: Option<String>,
}

#[derive(Args, Debug)]
pub struct InstitutionArgs {
    #[arg(value_name = "ITEM-ID-OR-ALIAS")]
    pub item: String,

    /// Fetch institution status
    #[arg(short, long)]
    pub status: bool,

    /// Fetch optional metadata like logo and URL
    #[arg(short = 'm', long = "optional-metadata")]
    pub optional_metadata: bool,
}

/// Everything a command handler needs.
pub struct Context {
    pub config: CliConfig,
    pub store: CredentialStore,
}

impl Context {
    pub fn load(data_dir: Option<PathBuf>) -> Result<Self> {
        let config = CliConfig::load(data_dir)?;
        tracing::debug!(?config, "Loaded configuration");
        let store = CredentialStore::load(&config.data_dir)?;
        Ok(Self { config, store })
    }

    /// Plaid client for commands that call the API.
    pub fn api(&self) -> Result<Arc<dyn PlaidApi>> {
        let (client_id, secret) = self.config.api_credentials()?;
        Ok(Arc::new(PlaidClient::new(
            client_id,
            secret,
            self.config.environment,
        )))
    }

    pub fn linker(&self, api: Arc<dyn PlaidApi>) -> Linker {
        let settings = LinkSettings::new(
            self.config.language.clone(),
            self.config.countries.clone(),
        )
        .with_timeout(self.config.link_timeout);
        Linker::new(api, settings)
    }
}

/// Parse-independent entry point used by the binary.
pub async fn run(cli: Cli) -> Result<()> {
    let mut ctx = Context::load(cli.data_dir)?;
    let mut stdout = io::stdout();

    match cli.command {
        Commands::Link(args) => {
            if let Some(port) = args.port {
                ctx.config.link_port = port;
            }
            if let Some(secs) = args.timeout {
                ctx.config.link_timeout = (secs > 0).then(|| Duration::from_secs(secs));
            }
            let linker = ctx.linker(ctx.api()?);
            link::handle_link(&linker, &mut ctx, args.item.as_deref(), &mut stdout).await
        }
        Commands::Tokens => aliases::handle_tokens(&ctx.store, &mut stdout),
        Commands::Alias(args) => {
            aliases::handle_alias(&mut ctx.store, &args.item_id, &args.name, &mut stdout)
        }
        Commands::Aliases => aliases::handle_aliases(&ctx.store, &mut stdout),
        Commands::Accounts(args) => {
            let linker = ctx.linker(ctx.api()?);
            data::handle_accounts(&linker, &ctx, &args.item, &mut stdout).await
        }
        Commands::Transactions(args) => {
            let linker = ctx.linker(ctx.api()?);
            data::handle_transactions(&linker, &ctx, &args, &mut stdout).await
        }
        Commands::Institution(args) => {
            let linker = ctx.linker(ctx.api()?);
            data::handle_institution(&linker, &ctx, &args, &mut stdout).await
        }
    }
}
