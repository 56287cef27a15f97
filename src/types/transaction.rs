//! Transaction-related types for the funding engine
//!
//! This module defines ledger entries, their category and status, the
//! reference token that ties a funding attempt to its entry, and the request
//! and filter types used to write and query the Ledger.

use super::wallet::OwnerId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Transaction identifier
pub type TransactionId = Uuid;

/// Unique token identifying one funding attempt or ledger entry
///
/// A reference crosses the initiate/redirect/verify round trip and is the key
/// every idempotency check is made on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reference(pub String);

impl Reference {
    pub fn new(reference: impl Into<String>) -> Self {
        Reference(reference.into())
    }

    /// Generate a fresh funding reference
    pub fn generate() -> Self {
        Reference(format!("FUND-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Reference {
    fn from(value: &str) -> Self {
        Reference(value.to_string())
    }
}

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Money into the wallet (top-ups)
    Credit,

    /// Money out of the wallet (fee payments, purchases)
    Debit,
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "credit" => Ok(Category::Credit),
            "debit" => Ok(Category::Debit),
            other => Err(format!("Invalid category: '{}'", other)),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Credit => f.write_str("credit"),
            Category::Debit => f.write_str("debit"),
        }
    }
}

/// Lifecycle state of a ledger entry
///
/// ```text
/// Pending ──► Success
///    │
///    └──────► Failed
/// ```
///
/// `Success` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    /// Whether the status will never change again
    pub fn is_terminal(self) -> bool {
        matches!(self, TransactionStatus::Success | TransactionStatus::Failed)
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "success" => Ok(TransactionStatus::Success),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(format!("Invalid status: '{}'", other)),
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => f.write_str("pending"),
            TransactionStatus::Success => f.write_str("success"),
            TransactionStatus::Failed => f.write_str("failed"),
        }
    }
}

/// A ledger entry
///
/// Once `status` is terminal the entry is immutable. Other subsystems (e.g. a
/// dispute ticket) may hold on to `reference` by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub owner_id: OwnerId,
    pub category: Category,
    pub amount: Decimal,
    pub status: TransactionStatus,

    /// Wallet balance before this entry took effect
    ///
    /// For pending and failed entries this equals `balance_after`.
    pub balance_before: Decimal,

    /// Wallet balance after this entry took effect
    pub balance_after: Decimal,

    pub reference: Reference,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Signed effect of this entry on the wallet balance when successful
    pub fn signed_amount(&self) -> Decimal {
        match self.category {
            Category::Credit => self.amount,
            Category::Debit => -self.amount,
        }
    }
}

/// Input for writing one ledger entry
///
/// Mirrors the `apply_entry` arguments, with an optional creation timestamp
/// for replaying historical entries.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryRequest {
    pub owner_id: OwnerId,
    pub category: Category,
    pub amount: Decimal,
    pub reference: Reference,
    pub description: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl EntryRequest {
    pub fn new(
        owner_id: OwnerId,
        category: Category,
        amount: Decimal,
        reference: Reference,
        description: impl Into<String>,
    ) -> Self {
        Self {
            owner_id,
            category,
            amount,
            reference,
            description: description.into(),
            created_at: None,
        }
    }

    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// One ledger entry read from a replay file
///
/// Carries the status the entry had when it was exported; replaying it
/// reproduces that status in the Ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryRecord {
    pub status: TransactionStatus,
    pub request: EntryRequest,
}

impl EntryRecord {
    pub fn owner_id(&self) -> &OwnerId {
        &self.request.owner_id
    }
}

/// Query filter for `Ledger::list_entries`
///
/// Pending entries are only returned when asked for, either through
/// `include_pending` or a `Pending` status filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryFilter {
    pub status: Option<TransactionStatus>,
    pub category: Option<Category>,
    /// Inclusive lower bound on `created_at`
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`
    pub to: Option<DateTime<Utc>>,
    pub include_pending: bool,
}

impl EntryFilter {
    pub fn all() -> Self {
        Self {
            include_pending: true,
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn including_pending(mut self) -> Self {
        self.include_pending = true;
        self
    }

    /// Whether an entry passes this filter
    pub fn matches(&self, entry: &Transaction) -> bool {
        if entry.status == TransactionStatus::Pending
            && !self.include_pending
            && self.status != Some(TransactionStatus::Pending)
        {
            return false;
        }
        if self.status.is_some_and(|status| status != entry.status) {
            return false;
        }
        if self.category.is_some_and(|category| category != entry.category) {
            return false;
        }
        if self.from.is_some_and(|from| entry.created_at < from) {
            return false;
        }
        if self.to.is_some_and(|to| entry.created_at >= to) {
            return false;
        }
        true
    }
}
