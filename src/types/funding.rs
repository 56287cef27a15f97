//! Funding attempt types
//!
//! Values exchanged with the payment provider and the durable record that
//! lets a funding attempt survive the redirect round trip.

use super::transaction::Reference;
use super::wallet::OwnerId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Durable token for an in-flight funding attempt
///
/// Written before the user is redirected to the provider and deleted once the
/// attempt is reconciled or abandoned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingFundingAttempt {
    pub reference: Reference,
    pub owner_id: OwnerId,

    /// Amount credited to the wallet on success (fee excluded)
    pub amount: Decimal,

    /// Fee charged on top of `amount` by the provider
    pub fee: Decimal,

    /// Provider page the user was sent to, if any
    pub authorization_url: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl PendingFundingAttempt {
    /// Total charged by the provider
    ///
    /// Initiation rejects attempts whose total overflows; an attempt edited on
    /// disk saturates instead of panicking.
    pub fn total(&self) -> Decimal {
        self.amount.saturating_add(self.fee)
    }
}

/// Request sent to the provider when a funding attempt starts
#[derive(Debug, Clone, PartialEq)]
pub struct InitiateRequest {
    pub owner_id: OwnerId,
    pub reference: Reference,

    /// Amount plus fee
    pub total: Decimal,

    /// Where the provider sends the user back to
    pub callback_url: Option<String>,
}

/// Provider answer to an initiation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayAuthorization {
    /// Page the user completes the payment on
    pub authorization_url: String,

    /// Provider-side handle (e.g. an access code)
    pub access_code: Option<String>,

    /// Reference the provider filed the payment under
    pub reference: Reference,
}

/// Final or interim payment state reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayStatus {
    Success,
    Failed,
    Pending,
}

impl fmt::Display for GatewayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayStatus::Success => f.write_str("success"),
            GatewayStatus::Failed => f.write_str("failed"),
            GatewayStatus::Pending => f.write_str("pending"),
        }
    }
}

/// Stage of a funding attempt
///
/// ```text
/// Created ─► AwaitingRedirect ─► PendingVerification ─┬─► Verified
///                                                      ├─► VerificationFailed
///                                                      └─► Abandoned
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttemptState {
    Created,
    AwaitingRedirect,
    PendingVerification,
    Verified,
    VerificationFailed,
    Abandoned,
}

impl AttemptState {
    pub fn is_final(self) -> bool {
        matches!(
            self,
            AttemptState::Verified | AttemptState::VerificationFailed | AttemptState::Abandoned
        )
    }
}
