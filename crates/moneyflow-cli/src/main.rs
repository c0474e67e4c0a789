//! moneyflow - command line client for the moneyflow personal finance backend.

mod commands;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

use moneyflow_core::auth::{AuthState, Session};
use moneyflow_core::rpc::RpcError;
use moneyflow_core::{ApiClient, Config};

#[derive(Parser)]
#[command(name = "moneyflow", about = "Command line client for moneyflow", version)]
struct Cli {
    /// Backend endpoint (overrides MONEYFLOW_API_URL and the config file)
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// Filters shared by `transactions` and `export`
#[derive(clap::Args)]
pub struct FilterArgs {
    /// Earliest transaction date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,

    /// Latest transaction date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    to: Option<String>,

    /// Restrict to these account ids
    #[arg(long = "account", value_name = "ID")]
    accounts: Vec<i32>,

    /// Free-text search over title, notes and reference number
    #[arg(long, short = 'q')]
    query: Option<String>,
}

#[derive(clap::Subcommand)]
pub enum Command {
    /// Log in and store the session token
    Login {
        #[arg(long, short = 'u')]
        username: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// List tags
    Tags,

    /// Create a tag
    TagCreate { name: String },

    /// List categories
    Categories,

    /// List currencies and rates
    Currencies,

    /// Show the server configuration
    Config,

    /// List accounts
    Accounts,

    /// Accounts usable for a transaction type (income, expense, transfer, adjustment)
    ApplicableAccounts {
        #[arg(default_value = "expense")]
        transaction_type: String,
    },

    /// Create an account
    AccountCreate {
        name: String,
        currency: String,

        /// asset, liability, expense, income or adjustment
        #[arg(long = "type", default_value = "asset")]
        account_type: String,
    },

    /// List transactions
    Transactions {
        #[command(flatten)]
        filter: FilterArgs,

        #[arg(long, default_value_t = 50)]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        skip: u32,
    },

    /// Export every matching transaction as JSON
    Export {
        #[command(flatten)]
        filter: FilterArgs,

        /// Write to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// List rules
    Rules,

    /// Evaluate a rule script against a transaction without saving
    RuleDryRun {
        /// File containing the Lua script
        script: PathBuf,

        /// Transaction to test against; the server picks one when omitted
        #[arg(long = "transaction", value_name = "ID")]
        transaction_id: Option<i64>,
    },

    /// Show script completions for a prefix
    RuleComplete {
        #[arg(default_value = "")]
        prefix: String,
    },

    /// List scheduled rules
    ScheduledRules,

    /// List service tokens
    Tokens,

    /// Create a service token; the secret is shown once
    TokenCreate {
        name: String,

        #[arg(long)]
        ttl_days: Option<u32>,
    },

    /// Revoke a service token
    TokenRevoke { id: String },

    /// List saved snippets
    Snippets,

    /// Save transactions from a JSON file as a snippet
    SnippetSave {
        title: String,

        /// JSON array of transactions (the format `export` writes)
        file: PathBuf,
    },

    /// Rename a snippet
    SnippetRename { id: u64, title: String },

    /// Create the snippet's transactions dated today
    SnippetReplay { id: u64 },

    /// Delete a snippet
    SnippetDelete { id: u64 },
}

/// Everything a command needs to talk to the backend and local storage.
pub struct AppContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub client: ApiClient,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::load()?;
    logging::init(&config.log_dir()?)?;

    let api_url = cli.api_url.clone().unwrap_or_else(|| config.api_url());
    let data_dir = config.data_dir()?;
    let session = Arc::new(Session::new(data_dir.clone()));
    if session.load()? {
        debug!(user = ?session.username(), "Loaded saved session");
    }

    info!(api_url = %api_url, "moneyflow starting");
    let ctx = AppContext {
        client: ApiClient::new(api_url, session.clone())?,
        config,
        data_dir,
    };

    let result = commands::run(cli.command, &ctx).await;
    if let Err(e) = &result {
        let unauthenticated = e
            .chain()
            .filter_map(|cause| cause.downcast_ref::<RpcError>())
            .any(RpcError::is_unauthenticated);
        if unauthenticated || session.state() == AuthState::LoginRequired {
            eprintln!("Session is missing or expired. Run `moneyflow login` first.");
        }
    }
    result
}
