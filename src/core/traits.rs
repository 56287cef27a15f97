//! Core traits for the external collaborators of the funding engine
//!
//! These abstractions let the reconciler and aggregator run against the real
//! backend and payment provider (see [`crate::gateway`]) or against in-memory
//! doubles in tests.

use crate::types::{
    ChargeRule, GatewayAuthorization, GatewayStatus, InitiateRequest, OwnerId,
    PendingFundingAttempt, Reference, Transaction, WalletError,
};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Source of charge rules (`GetActiveChargeRules`)
#[async_trait]
pub trait ChargeRuleSource: Send + Sync {
    /// Return the active rules for a charge category
    async fn active_charge_rules(&self, category: &str) -> Result<Vec<ChargeRule>, WalletError>;
}

/// Source of truth for wallet balances (`GetWalletBalance`)
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn wallet_balance(&self, owner: &OwnerId) -> Result<Decimal, WalletError>;
}

/// Bulk transaction feed (`GetUserTransactions`)
#[async_trait]
pub trait TransactionFeed: Send + Sync {
    async fn user_transactions(&self, owner: &OwnerId) -> Result<Vec<Transaction>, WalletError>;
}

/// Payment provider (`InitiateGatewayPayment` / `VerifyGatewayPayment`)
///
/// Implementations must report an unreachable provider as
/// [`WalletError::GatewayUnavailable`] so the reconciler can keep the attempt
/// for a later retry.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Ask the provider for an authorization handle for `request.total`
    async fn initiate(&self, request: &InitiateRequest)
        -> Result<GatewayAuthorization, WalletError>;

    /// Ask the provider for the current status of a payment
    async fn verify(&self, reference: &Reference) -> Result<GatewayStatus, WalletError>;
}

/// Durable store for pending funding attempts
///
/// `put` must be durable when it returns: the caller redirects the user right
/// after.
pub trait PendingFundingAttemptStore: Send + Sync {
    /// Insert or overwrite the attempt keyed by its reference
    fn put(&self, attempt: &PendingFundingAttempt) -> Result<(), WalletError>;

    fn get(&self, reference: &Reference) -> Result<Option<PendingFundingAttempt>, WalletError>;

    /// Remove an attempt, returning whether it existed
    fn delete(&self, reference: &Reference) -> Result<bool, WalletError>;

    /// All attempts currently stored, oldest first
    fn list(&self) -> Result<Vec<PendingFundingAttempt>, WalletError>;
}

/// Durable log of ledger entries settled by the reconciler
///
/// The reconciler records an entry here before it clears the attempt that
/// produced it, so a payment is always on file somewhere.
pub trait EntryJournal: Send + Sync {
    fn record(&self, entry: &Transaction) -> Result<(), WalletError>;
}
