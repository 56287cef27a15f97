//! Subcommand execution
//!
//! Each command writes its result to the given output; logs go through
//! `tracing` and never mix with it.

use crate::cli::args::{
    CliArgs, Command, FundArgs, GatewayArgs, QuoteArgs, ReconcileArgs, ReplayArgs, StatsArgs,
    StrategyType,
};
use crate::core::{
    compute_stats, monthly_trend_for_year, parse_amount, ChargeRuleStore, FilePendingStore,
    GatewayReconciler, Ledger, TOPUP_CATEGORY,
};
use crate::gateway::HttpGateway;
use crate::io::{read_charge_rules, CsvEntryJournal};
use crate::strategy::{self, ProcessingStrategy, SyncProcessingStrategy};
use crate::types::{AttemptState, EntryFilter, OwnerId, Reference, Transaction, WalletError};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Execute the parsed command
pub fn run(args: CliArgs, output: &mut dyn Write) -> Result<(), WalletError> {
    match args.command {
        Command::Quote(quote) => run_quote(&quote, output),
        Command::Replay(replay) => run_replay(&replay, output),
        Command::Stats(stats) => run_stats(&stats, output),
        Command::Fund(fund) => run_fund(&fund, output),
        Command::Reconcile(reconcile) => run_reconcile(&reconcile, output),
    }
}

fn run_quote(args: &QuoteArgs, output: &mut dyn Write) -> Result<(), WalletError> {
    let rules = load_rules(&args.rules_file)?;
    let quote = rules.quote_str(&args.category, &args.amount)?;
    write_json(output, &quote)
}

fn run_replay(args: &ReplayArgs, output: &mut dyn Write) -> Result<(), WalletError> {
    let config = match args.processing.strategy {
        StrategyType::Async => Some(args.processing.to_batch_config()),
        StrategyType::Sync => None,
    };
    let strategy = strategy::create_strategy(args.processing.strategy.clone(), config);
    strategy.process(&args.input_file, output)
}

fn run_stats(args: &StatsArgs, output: &mut dyn Write) -> Result<(), WalletError> {
    let ledger = SyncProcessingStrategy.replay(&args.input_file)?;

    let entries: Vec<Transaction> = match &args.owner {
        Some(owner) => ledger.list_entries(&OwnerId::new(owner.as_str()), &EntryFilter::all()),
        None => ledger
            .wallets()
            .iter()
            .flat_map(|wallet| ledger.list_entries(&wallet.owner_id, &EntryFilter::all()))
            .collect(),
    };

    let mut stats = compute_stats(&entries)?;
    if let Some(year) = args.year {
        stats.monthly_trend = monthly_trend_for_year(&entries, year)?;
    }
    write_json(output, &stats)
}

fn run_fund(args: &FundArgs, output: &mut dyn Write) -> Result<(), WalletError> {
    let amount = parse_amount(&args.amount)?;
    let rules = match &args.rules_file {
        Some(path) => load_rules(path)?,
        None => ChargeRuleStore::default(),
    };
    let quote = rules.quote(TOPUP_CATEGORY, amount)?;

    let reconciler = build_reconciler(&args.gateway)?;
    let attempt = runtime()?.block_on(
        reconciler.initiate_quote(&OwnerId::new(args.owner.as_str()), &quote),
    )?;

    write_json(output, &attempt)
}

/// Result line for one verified reference
#[derive(Debug, Serialize)]
struct ReconcileReport {
    reference: Reference,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<AttemptState>,
    /// Ledger entry as settled, with the wallet balance after it
    #[serde(skip_serializing_if = "Option::is_none")]
    entry: Option<Transaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    retryable: bool,
}

fn run_reconcile(args: &ReconcileArgs, output: &mut dyn Write) -> Result<(), WalletError> {
    let reconciler = build_reconciler(&args.gateway)?;
    let external = args.reference.as_deref().map(Reference::from);

    let outcomes = runtime()?.block_on(reconciler.resume(external.as_ref()))?;
    info!(count = outcomes.len(), "reconciliation finished");

    for outcome in outcomes {
        let report = match outcome.result {
            Ok(state) => ReconcileReport {
                entry: reconciler.ledger().find_by_reference(&outcome.reference),
                reference: outcome.reference,
                state: Some(state),
                error: None,
                retryable: false,
            },
            Err(err) => ReconcileReport {
                reference: outcome.reference,
                state: None,
                entry: None,
                retryable: err.is_retryable(),
                error: Some(err.to_string()),
            },
        };
        serde_json::to_writer(&mut *output, &report).map_err(output_error)?;
        writeln!(output)?;
    }
    Ok(())
}

/// Reconciler over the ledger rebuilt from `--ledger`, journaling back to it
fn build_reconciler(
    args: &GatewayArgs,
) -> Result<GatewayReconciler<HttpGateway, FilePendingStore>, WalletError> {
    let ledger = if args.ledger_file.exists() {
        SyncProcessingStrategy.replay(&args.ledger_file)?
    } else {
        Arc::new(Ledger::new())
    };
    let gateway = HttpGateway::new(&args.to_gateway_config())?;
    let store = FilePendingStore::open(&args.store_dir)?;
    Ok(GatewayReconciler::new(
        gateway,
        store,
        ledger,
        args.to_reconciler_config(),
    )
    .with_journal(Arc::new(CsvEntryJournal::new(&args.ledger_file))))
}

fn load_rules(path: &Path) -> Result<ChargeRuleStore, WalletError> {
    let file = File::open(path).map_err(|e| WalletError::IoError {
        message: format!("Failed to open file '{}': {}", path.display(), e),
    })?;
    Ok(ChargeRuleStore::new(read_charge_rules(file)?))
}

fn runtime() -> Result<tokio::runtime::Runtime, WalletError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| WalletError::IoError {
            message: format!("Failed to create tokio runtime: {}", e),
        })
}

fn write_json<T: Serialize>(output: &mut dyn Write, value: &T) -> Result<(), WalletError> {
    serde_json::to_writer_pretty(&mut *output, value).map_err(output_error)?;
    writeln!(output)?;
    Ok(())
}

fn output_error(error: serde_json::Error) -> WalletError {
    WalletError::IoError {
        message: format!("Failed to write output: {}", error),
    }
}
