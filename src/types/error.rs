//! Error types for the wallet funding engine
//!
//! This module defines all error types that can occur while quoting fees,
//! writing the ledger and reconciling gateway payments.
//!
//! # Error Categories
//!
//! - **Soft conditions**: `RuleNotFound` (callers degrade to a zero fee)
//! - **Input errors**: `InvalidAmount`, rejected before any network call
//! - **Ledger consistency**: `DuplicateReference`, `InsufficientFunds`,
//!   arithmetic overflow, reconciliation mismatches
//! - **Gateway errors**: retryable (`GatewayUnavailable`, `VerificationTimeout`,
//!   `VerificationInProgress`) or terminal (`VerificationFailed`)
//! - **I/O and parsing**: file, CSV, JSON and response-shape errors

use crate::types::{OwnerId, Reference};
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the funding engine
///
/// Each variant carries the context needed to show a meaningful message or
/// decide whether an operation can be retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WalletError {
    /// No active charge rule matches the requested category
    ///
    /// Quotes treat this as a zero fee; it only surfaces as an error from
    /// explicit rule lookups.
    #[error("No active charge rule for category '{category}'")]
    RuleNotFound {
        /// The requested charge category
        category: String,
    },

    /// Amount is zero, negative or not a number
    #[error("Invalid amount '{amount}'")]
    InvalidAmount {
        /// The rejected amount as given
        amount: String,
    },

    /// An entry with this reference already reached a terminal status
    ///
    /// This is the idempotency signal against double-crediting.
    #[error("Duplicate reference '{reference}'")]
    DuplicateReference {
        /// The reference that was already applied
        reference: Reference,
    },

    /// Request for a pending reference disagrees with the pending entry
    #[error("Entry '{reference}' is pending as {pending}, refusing {requested}")]
    ConflictingEntry {
        reference: Reference,
        /// Category and amount of the pending entry
        pending: String,
        /// Category and amount that were requested
        requested: String,
    },

    /// Debit would take the balance below zero
    #[error("Insufficient funds for owner {owner}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        owner: OwnerId,
        balance: Decimal,
        requested: Decimal,
    },

    /// Arithmetic overflow would occur
    #[error("Arithmetic overflow in {operation} for owner {owner}")]
    ArithmeticOverflow { operation: String, owner: OwnerId },

    /// Reference is not known to the ledger or the pending store
    #[error("Unknown reference '{reference}'")]
    UnknownReference { reference: Reference },

    /// Wallet balance disagrees with its source of truth
    #[error("Reconciliation failed for owner {owner}: expected {expected}, actual {actual}")]
    ReconciliationMismatch {
        owner: OwnerId,
        expected: Decimal,
        actual: Decimal,
    },

    /// Payment provider could not be reached
    ///
    /// Retryable; any pending attempt is preserved.
    #[error("Payment gateway unavailable: {message}")]
    GatewayUnavailable { message: String },

    /// Payment provider did not answer a verification in time
    ///
    /// Retryable; the pending attempt is preserved.
    #[error("Verification of '{reference}' timed out after {timeout_ms}ms")]
    VerificationTimeout {
        reference: Reference,
        timeout_ms: u64,
    },

    /// Payment provider reported the payment as failed
    ///
    /// Terminal; the attempt is cleared and the wallet is not credited.
    #[error("Verification of '{reference}' failed: gateway reported '{gateway_status}'")]
    VerificationFailed {
        reference: Reference,
        gateway_status: String,
    },

    /// Another verification of the same reference is running
    #[error("Verification of '{reference}' is already in progress")]
    VerificationInProgress { reference: Reference },

    /// External response did not have the expected shape
    #[error("Malformed response from {endpoint}: {message}")]
    MalformedResponse { endpoint: String, message: String },

    /// Pending attempt store could not be read or written
    #[error("Storage error: {message}")]
    StorageError { message: String },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError { message: String },

    /// CSV parsing error occurred
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        message: String,
    },
}

impl From<std::io::Error> for WalletError {
    fn from(error: std::io::Error) -> Self {
        WalletError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for WalletError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        WalletError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(error: serde_json::Error) -> Self {
        WalletError::StorageError {
            message: error.to_string(),
        }
    }
}

impl WalletError {
    /// Create a RuleNotFound error
    pub fn rule_not_found(category: &str) -> Self {
        WalletError::RuleNotFound {
            category: category.to_string(),
        }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: impl ToString) -> Self {
        WalletError::InvalidAmount {
            amount: amount.to_string(),
        }
    }

    /// Create a DuplicateReference error
    pub fn duplicate_reference(reference: &Reference) -> Self {
        WalletError::DuplicateReference {
            reference: reference.clone(),
        }
    }

    /// Create a ConflictingEntry error
    pub fn conflicting_entry(
        reference: &Reference,
        pending: impl ToString,
        requested: impl ToString,
    ) -> Self {
        WalletError::ConflictingEntry {
            reference: reference.clone(),
            pending: pending.to_string(),
            requested: requested.to_string(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(owner: &OwnerId, balance: Decimal, requested: Decimal) -> Self {
        WalletError::InsufficientFunds {
            owner: owner.clone(),
            balance,
            requested,
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, owner: &OwnerId) -> Self {
        WalletError::ArithmeticOverflow {
            operation: operation.to_string(),
            owner: owner.clone(),
        }
    }

    /// Create an UnknownReference error
    pub fn unknown_reference(reference: &Reference) -> Self {
        WalletError::UnknownReference {
            reference: reference.clone(),
        }
    }

    /// Create a GatewayUnavailable error
    pub fn gateway_unavailable(message: impl ToString) -> Self {
        WalletError::GatewayUnavailable {
            message: message.to_string(),
        }
    }

    /// Create a MalformedResponse error
    pub fn malformed_response(endpoint: &str, message: impl ToString) -> Self {
        WalletError::MalformedResponse {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a StorageError
    pub fn storage(message: impl ToString) -> Self {
        WalletError::StorageError {
            message: message.to_string(),
        }
    }

    /// Whether the caller may try the same operation again later
    ///
    /// A UI uses this to decide between a retry affordance and a final
    /// failure message.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WalletError::GatewayUnavailable { .. }
                | WalletError::VerificationTimeout { .. }
                | WalletError::VerificationInProgress { .. }
                | WalletError::MalformedResponse { .. }
                | WalletError::StorageError { .. }
                | WalletError::IoError { .. }
        )
    }

    /// Whether the funding attempt has reached a final, unsuccessful outcome
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WalletError::VerificationFailed { .. } | WalletError::InvalidAmount { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::rule_not_found(
        WalletError::rule_not_found("topup"),
        "No active charge rule for category 'topup'"
    )]
    #[case::invalid_amount(WalletError::invalid_amount("-5"), "Invalid amount '-5'")]
    #[case::duplicate_reference(
        WalletError::duplicate_reference(&Reference::from("PAY-1")),
        "Duplicate reference 'PAY-1'"
    )]
    #[case::insufficient_funds(
        WalletError::insufficient_funds(&OwnerId::from("p1"), Decimal::new(500, 0), Decimal::new(1000, 0)),
        "Insufficient funds for owner p1: balance 500, requested 1000"
    )]
    #[case::verification_timeout(
        WalletError::VerificationTimeout { reference: Reference::from("R"), timeout_ms: 250 },
        "Verification of 'R' timed out after 250ms"
    )]
    #[case::verification_failed(
        WalletError::VerificationFailed { reference: Reference::from("R"), gateway_status: "failed".to_string() },
        "Verification of 'R' failed: gateway reported 'failed'"
    )]
    #[case::parse_error_with_line(
        WalletError::ParseError { line: Some(42), message: "Invalid field".to_string() },
        "CSV parse error at line 42: Invalid field"
    )]
    #[case::parse_error_without_line(
        WalletError::ParseError { line: None, message: "Invalid field".to_string() },
        "CSV parse error: Invalid field"
    )]
    #[case::malformed_response(
        WalletError::malformed_response("verify", "missing data.status"),
        "Malformed response from verify: missing data.status"
    )]
    #[case::conflicting_entry(
        WalletError::conflicting_entry(&Reference::from("R"), "credit 2000", "debit 2000"),
        "Entry 'R' is pending as credit 2000, refusing debit 2000"
    )]
    fn test_error_display(#[case] error: WalletError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::gateway(WalletError::gateway_unavailable("down"), true, false)]
    #[case::timeout(
        WalletError::VerificationTimeout { reference: Reference::from("R"), timeout_ms: 1 },
        true,
        false
    )]
    #[case::failed(
        WalletError::VerificationFailed { reference: Reference::from("R"), gateway_status: "failed".to_string() },
        false,
        true
    )]
    #[case::duplicate(WalletError::duplicate_reference(&Reference::from("R")), false, false)]
    #[case::conflicting(
        WalletError::conflicting_entry(&Reference::from("R"), "credit 1", "credit 2"),
        false,
        false
    )]
    fn test_retry_classification(
        #[case] error: WalletError,
        #[case] retryable: bool,
        #[case] terminal: bool,
    ) {
        assert_eq!(error.is_retryable(), retryable);
        assert_eq!(error.is_terminal(), terminal);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: WalletError = io_error.into();
        assert!(matches!(error, WalletError::IoError { .. }));
        assert_eq!(error.to_string(), "I/O error: Permission denied");
    }
}
