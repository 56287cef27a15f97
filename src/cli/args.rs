use crate::core::{ReconcilerConfig, TOPUP_CATEGORY};
use crate::gateway::HttpGatewayConfig;
use crate::strategy::BatchConfig;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Wallet funding, ledger replay and reconciliation
#[derive(Parser, Debug)]
#[command(name = "wallet-engine")]
#[command(about = "Quote fees, fund wallets and replay wallet ledgers", long_about = None)]
pub struct CliArgs {
    /// Log verbosity; logging is off when omitted
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<tracing::Level>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Quote the fee for an amount from a charge rule file
    Quote(QuoteArgs),
    /// Replay a ledger entry file and print wallet balances as CSV
    Replay(ReplayArgs),
    /// Replay a ledger entry file and print statistics as JSON
    Stats(StatsArgs),
    /// Start a funding attempt with the payment provider
    Fund(FundArgs),
    /// Verify stored funding attempts with the payment provider
    Reconcile(ReconcileArgs),
}

/// Available processing strategies for ledger replay
#[derive(Clone, Debug, PartialEq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

#[derive(Args, Debug)]
pub struct QuoteArgs {
    /// Charge rule CSV file
    #[arg(long = "rules", value_name = "FILE")]
    pub rules_file: PathBuf,

    #[arg(long, value_name = "CATEGORY", default_value = TOPUP_CATEGORY)]
    pub category: String,

    /// Amount to quote, in major units
    #[arg(long, value_name = "AMOUNT")]
    pub amount: String,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Input CSV file path containing ledger entries
    #[arg(value_name = "INPUT", help = "Path to the ledger entry CSV file")]
    pub input_file: PathBuf,

    #[command(flatten)]
    pub processing: ProcessingArgs,
}

#[derive(Args, Debug)]
pub struct ProcessingArgs {
    /// Replay strategy to use
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Replay strategy: 'sync' for synchronous or 'async' for owner-partitioned batches"
    )]
    pub strategy: StrategyType,

    /// Number of records per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of records per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Number of runtime worker threads (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Number of worker threads replaying owners concurrently (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    #[arg(value_name = "INPUT", help = "Path to the ledger entry CSV file")]
    pub input_file: PathBuf,

    /// Only count entries of this owner
    #[arg(long, value_name = "OWNER")]
    pub owner: Option<String>,

    /// Report twelve monthly buckets for this year instead of the full range
    #[arg(long, value_name = "YEAR")]
    pub year: Option<i32>,
}

/// Payment provider connection settings
#[derive(Args, Debug)]
pub struct GatewayArgs {
    #[arg(long = "gateway-url", value_name = "URL", env = "WALLET_GATEWAY_URL")]
    pub gateway_url: Option<String>,

    #[arg(
        long = "secret-key",
        value_name = "KEY",
        env = "WALLET_GATEWAY_SECRET",
        hide_env_values = true
    )]
    pub secret_key: String,

    #[arg(long = "callback-url", value_name = "URL", env = "WALLET_CALLBACK_URL")]
    pub callback_url: Option<String>,

    /// Timeout for each provider call in milliseconds
    #[arg(long = "timeout-ms", value_name = "MS", default_value_t = 15_000)]
    pub timeout_ms: u64,

    /// Directory holding pending funding attempts
    #[arg(long = "store", value_name = "DIR", default_value = ".wallet-pending")]
    pub store_dir: PathBuf,

    /// Ledger entry file; replayed first, and every pending, credited or
    /// failed funding entry is appended to it
    #[arg(long = "ledger", value_name = "FILE")]
    pub ledger_file: PathBuf,
}

#[derive(Args, Debug)]
pub struct FundArgs {
    #[arg(long, value_name = "OWNER")]
    pub owner: String,

    /// Amount to credit, in major units
    #[arg(long, value_name = "AMOUNT")]
    pub amount: String,

    /// Charge rule CSV file; without it the fee is zero
    #[arg(long = "rules", value_name = "FILE")]
    pub rules_file: Option<PathBuf>,

    #[command(flatten)]
    pub gateway: GatewayArgs,
}

#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Reference returned by the provider redirect, verified along with the
    /// stored attempts
    #[arg(long, value_name = "REFERENCE")]
    pub reference: Option<String>,

    #[command(flatten)]
    pub gateway: GatewayArgs,
}

impl ProcessingArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values fall back to the defaults; zero values are rejected
    /// by [`BatchConfig::new`] with a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }
}

impl GatewayArgs {
    pub fn to_gateway_config(&self) -> HttpGatewayConfig {
        HttpGatewayConfig::new(
            self.gateway_url.clone(),
            self.secret_key.clone(),
            self.timeout_ms,
        )
    }

    /// Provider calls are bounded by the same timeout on both sides
    pub fn to_reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig::new(self.timeout_ms, self.timeout_ms, self.callback_url.clone())
    }
}
