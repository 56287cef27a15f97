//! Core business logic module
//!
//! This module contains the funding engine components:
//! - `traits` - Seams for the backend, payment provider, attempt store and entry journal
//! - `fee` - Charge computation
//! - `charge_rules` - Rule lookup and fee quotes
//! - `ledger` - Append-only entry log and wallet balances
//! - `stats` - Totals, monthly trend and spending breakdown
//! - `pending_store` - Durable pending funding attempts
//! - `events` - Wallet lifecycle notifications
//! - `reconciler` - Gateway handoff and verification
//! - `batch_processor` - Owner-partitioned concurrent replay

pub mod batch_processor;
pub mod charge_rules;
pub mod events;
pub mod fee;
pub mod ledger;
pub mod pending_store;
pub mod reconciler;
pub mod stats;
pub mod traits;

pub use batch_processor::{BatchProcessor, ReplayResult};
pub use charge_rules::{parse_amount, ChargeRuleStore, FeeQuote, TOPUP_CATEGORY};
pub use events::{EventBus, WalletEvent};
pub use fee::compute_fee;
pub use ledger::Ledger;
pub use pending_store::{FilePendingStore, InMemoryPendingStore};
pub use reconciler::{GatewayReconciler, ReconcilerConfig, ResumeOutcome, FUNDING_DESCRIPTION};
pub use stats::{
    category_breakdown, compute_stats, monthly_trend, monthly_trend_for_year, CategoryShare,
    MonthlyBucket, Stats,
};
pub use traits::{
    BalanceSource, ChargeRuleSource, EntryJournal, PaymentGateway, PendingFundingAttemptStore,
    TransactionFeed,
};
