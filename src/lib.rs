//! Wallet Funding Engine Library
//!
//! # Overview
//!
//! This library keeps a wallet ledger for account holders, quotes the fee for
//! a top-up, drives a funding attempt through an external payment provider and
//! reconciles the provider's answer into the ledger exactly once.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Wallet, Transaction, ChargeRule, etc.)
//! - [`core`] - Business logic components:
//!   - [`core::fee`] and [`core::charge_rules`] - Fee computation and quotes
//!   - [`core::ledger`] - Append-only entry log and wallet balances
//!   - [`core::reconciler`] - Payment provider handoff and verification
//!   - [`core::stats`] - Totals, monthly trend and spending breakdown
//! - [`gateway`] - HTTP adapters for the provider and the wallet backend
//! - [`io`] - CSV ledger files and charge rule files
//! - [`strategy`] - Sync and async ledger replay
//! - [`cli`] - CLI arguments and subcommands
//!
//! # Funding Lifecycle
//!
//! ```text
//! quote ─► initiate ─► (user pays on provider page) ─► verify ─┬─► credited
//!                                                              ├─► failed
//!                                                              └─► still pending
//! ```
//!
//! - **initiate**: stores the attempt durably and records a pending credit
//! - **verify**: applies the credit once, whatever the number of calls
//! - **resume**: verifies every stored attempt, e.g. after a restart
//!
//! # Wallet Balance
//!
//! The balance is the sum of successful credits minus successful debits.
//! Pending and failed entries never move it, and it never goes below zero.

pub mod cli;
pub mod core;
pub mod gateway;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{ChargeRuleStore, GatewayReconciler, Ledger, Stats};
pub use io::write_wallets_csv;
pub use types::{
    Category, ChargeRule, OwnerId, PendingFundingAttempt, Reference, Transaction,
    TransactionStatus, Wallet, WalletError,
};
