//! Wallet-related types for the funding engine
//!
//! This module defines the Wallet structure and the owner identifier used
//! to key every balance the Ledger maintains.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency assigned to wallets when none is configured
pub const DEFAULT_CURRENCY: &str = "NGN";

/// Identifier of a wallet owner
///
/// Supplied by the external identity collaborator; the engine treats it as an
/// opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        OwnerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(value: &str) -> Self {
        OwnerId(value.to_string())
    }
}

/// Wallet state for one owner
///
/// The balance is never written directly by callers. It only changes when the
/// Ledger applies a successful entry, and always equals the sum of successful
/// credits minus the sum of successful debits for the owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    /// The owner of this wallet
    pub owner_id: OwnerId,

    /// Current spendable balance
    pub balance: Decimal,

    /// ISO currency code (e.g. "NGN")
    pub currency: String,
}

impl Wallet {
    /// Create a new wallet with a zero balance
    ///
    /// # Arguments
    ///
    /// * `owner_id` - The owner this wallet belongs to
    /// * `currency` - Currency code for the balance
    pub fn new(owner_id: OwnerId, currency: impl Into<String>) -> Self {
        Wallet {
            owner_id,
            balance: Decimal::ZERO,
            currency: currency.into(),
        }
    }
}
