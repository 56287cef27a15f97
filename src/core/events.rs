//! Wallet lifecycle notifications
//!
//! The reconciler publishes a [`WalletEvent`] at every visible step of a
//! funding attempt. Front ends subscribe to the channel and decide how to
//! present them; the core keeps no presentation state of its own.

use crate::types::{OwnerId, Reference};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Default capacity of the event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Notification about a funding attempt or a wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WalletEvent {
    /// Provider handed out an authorization page; the user should be redirected
    FundingInitiated {
        owner_id: OwnerId,
        reference: Reference,
        amount: Decimal,
        fee: Decimal,
        authorization_url: String,
    },

    /// Provider has not settled the payment yet
    FundingPending { reference: Reference },

    /// Wallet was credited
    WalletFunded {
        owner_id: OwnerId,
        reference: Reference,
        amount: Decimal,
        balance: Decimal,
    },

    /// Provider reported the payment as failed
    FundingFailed {
        reference: Reference,
        gateway_status: String,
    },

    /// User or operator gave up on the attempt
    FundingAbandoned { reference: Reference },

    /// Verification could not complete and may be retried
    VerificationDeferred { reference: Reference, reason: String },

    /// Ledger balance disagrees with the backend
    BalanceDrift {
        owner_id: OwnerId,
        ledger: Decimal,
        backend: Decimal,
        at: DateTime<Utc>,
    },
}

impl WalletEvent {
    /// Reference the event is about, if any
    pub fn reference(&self) -> Option<&Reference> {
        match self {
            WalletEvent::FundingInitiated { reference, .. }
            | WalletEvent::FundingPending { reference }
            | WalletEvent::WalletFunded { reference, .. }
            | WalletEvent::FundingFailed { reference, .. }
            | WalletEvent::FundingAbandoned { reference }
            | WalletEvent::VerificationDeferred { reference, .. } => Some(reference),
            WalletEvent::BalanceDrift { .. } => None,
        }
    }
}

/// Publishing side of the event channel
///
/// Publishing never fails: events sent while nobody listens are dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<WalletEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: WalletEvent) {
        if self.sender.send(event).is_err() {
            trace!("no subscribers for wallet event");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
