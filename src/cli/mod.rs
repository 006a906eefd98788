//! Command-line interface definitions.

pub mod balance;
pub mod check;
pub mod output;
pub mod submit;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::infrastructure::config::Config;

/// Switchyard - resilient dispatch core for RPC providers and an external
/// execution engine.
#[derive(Parser, Debug)]
#[command(name = "switchyard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),

    /// Read the balance of an address
    Balance(BalanceArgs),

    /// Submit a transaction
    Submit(SubmitArgs),
}

/// Subcommands for `switchyard check`
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate configuration file
    Config(ConfigPathArg),
    /// Probe every configured endpoint
    Endpoints(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for the `balance` subcommand.
#[derive(Parser, Debug)]
pub struct BalanceArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Address to query
    pub address: String,
}

/// Arguments for the `submit` subcommand.
#[derive(Parser, Debug)]
pub struct SubmitArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Source asset
    #[arg(long)]
    pub source: String,

    /// Destination asset
    #[arg(long)]
    pub destination: String,

    /// Amount of the source asset
    #[arg(long)]
    pub amount: Decimal,

    /// Maximum slippage as a fraction (0.005 = 0.5%)
    #[arg(long, default_value = "0.005")]
    pub slippage: Decimal,

    /// Wallet that owns the transaction
    #[arg(long)]
    pub wallet: String,

    /// Simulate instead of sending (overrides the configured flag)
    #[arg(long, conflicts_with = "live")]
    pub simulate: bool,

    /// Send for real even if the configuration says simulate
    #[arg(long)]
    pub live: bool,

    /// Transaction id (generated when omitted)
    #[arg(long)]
    pub id: Option<String>,
}

impl SubmitArgs {
    /// Per-submission simulation override, if any.
    pub const fn simulation(&self) -> Option<bool> {
        match (self.simulate, self.live) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// Run the parsed command.
///
/// # Errors
///
/// Returns the first error from loading configuration or executing the
/// command.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Check(CheckCommand::Config(args)) => check::execute_config(&args.config),
        Commands::Check(CheckCommand::Endpoints(args)) => {
            check::execute_endpoints(&args.config).await
        }
        Commands::Balance(args) => balance::execute(&args).await,
        Commands::Submit(args) => submit::execute(&args).await,
    }
}

/// Load the configuration and install logging.
pub(crate) fn load_config(path: &std::path::Path) -> Result<Config> {
    let config = Config::load(path)?;
    config.init_logging();
    Ok(config)
}
