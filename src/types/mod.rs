//! Types module
//!
//! Contains core data structures used throughout the engine:
//! - `wallet`: Wallet and owner identifier
//! - `transaction`: Ledger entries, references, categories and filters
//! - `charge_rule`: Fee policies
//! - `funding`: Funding attempts and gateway exchange values
//! - `error`: Error types for the funding engine

pub mod charge_rule;
pub mod error;
pub mod funding;
pub mod transaction;
pub mod wallet;

pub use charge_rule::{ChargeRule, ChargeType, RuleStatus};
pub use error::WalletError;
pub use funding::{
    AttemptState, GatewayAuthorization, GatewayStatus, InitiateRequest, PendingFundingAttempt,
};
pub use transaction::{
    Category, EntryFilter, EntryRecord, EntryRequest, Reference, Transaction, TransactionId,
    TransactionStatus,
};
pub use wallet::{OwnerId, Wallet, DEFAULT_CURRENCY};
