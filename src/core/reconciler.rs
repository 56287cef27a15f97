//! Gateway reconciliation for wallet funding
//!
//! This module provides the `GatewayReconciler`, which drives one funding
//! attempt from initiation, through the redirect to the payment provider,
//! to a verified credit in the [`Ledger`].
//!
//! # Design
//!
//! ```text
//! initiate ─► provider authorization ─► store.put ─► ledger.record_pending
//!                                         │
//!          (user completes payment on the provider page, app may restart)
//!                                         │
//! resume / verify ─► provider status ─┬─ success ─► ledger.apply_entry ─► store.delete
//!                                     ├─ failed  ─► ledger.mark_failed ─► store.delete
//!                                     └─ pending ─► attempt kept
//! ```
//!
//! The pending attempt is written before the caller redirects, so a restart
//! in the middle of the round trip never loses a payment: [`GatewayReconciler::resume`]
//! picks up every stored attempt.
//!
//! # Exactly Once
//!
//! - Verifications of one reference never overlap. A claim is taken before
//!   the provider is asked and released when the call finishes or its future
//!   is dropped.
//! - The credit is keyed by the reference, and the Ledger rejects a second
//!   terminal entry for it. A `DuplicateReference` on a successful entry
//!   therefore means "already reconciled", not a failure.
//! - Nothing is written to the Ledger before the provider answers, so a
//!   timed-out or cancelled verification leaves no trace.
//! - With an [`EntryJournal`] attached, every pending, credited or failed
//!   entry is journaled before the stored attempt is deleted. If the journal
//!   write fails the attempt stays and the next verification writes it again.

use crate::core::charge_rules::FeeQuote;
use crate::core::events::{EventBus, WalletEvent, DEFAULT_EVENT_CAPACITY};
use crate::core::ledger::Ledger;
use crate::core::traits::{
    BalanceSource, EntryJournal, PaymentGateway, PendingFundingAttemptStore,
};
use crate::types::{
    AttemptState, Category, EntryRequest, GatewayStatus, InitiateRequest, OwnerId,
    PendingFundingAttempt, Reference, Transaction, TransactionStatus, WalletError,
};
use chrono::Utc;
use dashmap::DashMap;
use futures::future::join_all;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Description written on funding credits
pub const FUNDING_DESCRIPTION: &str = "Wallet funding";

/// Configuration for the gateway reconciler
#[derive(Clone, Debug, PartialEq)]
pub struct ReconcilerConfig {
    /// Upper bound for one provider verification call
    pub verify_timeout: Duration,
    /// Upper bound for one provider initiation call
    pub initiate_timeout: Duration,
    /// Where the provider should send the user back to
    pub callback_url: Option<String>,
    /// Capacity of the wallet event channel
    pub event_capacity: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            verify_timeout: Duration::from_secs(15),
            initiate_timeout: Duration::from_secs(15),
            callback_url: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ReconcilerConfig {
    /// Create a new ReconcilerConfig with custom values
    ///
    /// Zero timeouts fall back to the defaults with a warning.
    pub fn new(verify_timeout_ms: u64, initiate_timeout_ms: u64, callback_url: Option<String>) -> Self {
        let default = Self::default();

        let verify_timeout = if verify_timeout_ms == 0 {
            warn!(
                "Invalid verify_timeout ({}ms), using default ({}ms)",
                verify_timeout_ms,
                default.verify_timeout.as_millis()
            );
            default.verify_timeout
        } else {
            Duration::from_millis(verify_timeout_ms)
        };

        let initiate_timeout = if initiate_timeout_ms == 0 {
            warn!(
                "Invalid initiate_timeout ({}ms), using default ({}ms)",
                initiate_timeout_ms,
                default.initiate_timeout.as_millis()
            );
            default.initiate_timeout
        } else {
            Duration::from_millis(initiate_timeout_ms)
        };

        Self {
            verify_timeout,
            initiate_timeout,
            callback_url: callback_url.filter(|url| !url.trim().is_empty()),
            event_capacity: default.event_capacity,
        }
    }
}

/// Outcome of verifying one reference during [`GatewayReconciler::resume`]
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeOutcome {
    pub reference: Reference,
    pub result: Result<AttemptState, WalletError>,
}

/// Claim on a reference, released on drop
struct VerificationClaim<'a> {
    in_flight: &'a DashMap<Reference, ()>,
    reference: Reference,
}

impl Drop for VerificationClaim<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.reference);
    }
}

/// Drives funding attempts through the payment provider into the Ledger
///
/// `GatewayReconciler` is `Send + Sync`; wrap it in an `Arc` to share it
/// between tasks.
pub struct GatewayReconciler<G, S> {
    gateway: G,
    store: S,
    ledger: Arc<Ledger>,
    journal: Option<Arc<dyn EntryJournal>>,
    config: ReconcilerConfig,
    events: EventBus,
    /// References with a verification or abandon in progress
    in_flight: DashMap<Reference, ()>,
    /// Last known state per reference, for this process only
    states: DashMap<Reference, AttemptState>,
}

impl<G, S> GatewayReconciler<G, S>
where
    G: PaymentGateway,
    S: PendingFundingAttemptStore,
{
    /// Create a new GatewayReconciler
    ///
    /// # Arguments
    ///
    /// * `gateway` - Payment provider adapter
    /// * `store` - Durable store for pending attempts
    /// * `ledger` - Ledger credited on successful payments
    /// * `config` - Timeouts and callback settings
    pub fn new(gateway: G, store: S, ledger: Arc<Ledger>, config: ReconcilerConfig) -> Self {
        let events = EventBus::new(config.event_capacity);
        Self {
            gateway,
            store,
            ledger,
            journal: None,
            config,
            events,
            in_flight: DashMap::new(),
            states: DashMap::new(),
        }
    }

    /// Journal every entry this reconciler writes before clearing its attempt
    pub fn with_journal(mut self, journal: Arc<dyn EntryJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Subscribe to wallet lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }

    /// Start a funding attempt
    ///
    /// Asks the provider for an authorization page for `amount + fee`, stores
    /// the attempt, and records a pending credit of `amount`. The caller
    /// should send the user to `authorization_url` once this returns.
    ///
    /// # Returns
    ///
    /// * `Ok(attempt)` - Attempt stored, state `AwaitingRedirect`
    /// * `Err(WalletError::InvalidAmount)` - `amount` not positive or `fee`
    ///   negative; nothing was sent to the provider
    /// * `Err(WalletError::GatewayUnavailable)` - Provider unreachable or too
    ///   slow; nothing was stored
    pub async fn initiate(
        &self,
        owner_id: &OwnerId,
        amount: Decimal,
        fee: Decimal,
    ) -> Result<PendingFundingAttempt, WalletError> {
        if amount <= Decimal::ZERO {
            return Err(WalletError::invalid_amount(amount));
        }
        if fee < Decimal::ZERO {
            return Err(WalletError::invalid_amount(fee));
        }
        let total = amount
            .checked_add(fee)
            .ok_or_else(|| WalletError::arithmetic_overflow("initiate", owner_id))?;

        let reference = Reference::generate();
        self.states.insert(reference.clone(), AttemptState::Created);

        let request = InitiateRequest {
            owner_id: owner_id.clone(),
            reference: reference.clone(),
            total,
            callback_url: self.config.callback_url.clone(),
        };

        let authorization = match self
            .bounded(self.config.initiate_timeout, self.gateway.initiate(&request))
            .await
        {
            Some(Ok(authorization)) => authorization,
            Some(Err(err)) => {
                self.states.remove(&reference);
                warn!(%reference, error = %err, "funding initiation failed");
                return Err(err);
            }
            None => {
                self.states.remove(&reference);
                warn!(%reference, "funding initiation timed out");
                return Err(WalletError::gateway_unavailable(format!(
                    "initiation timed out after {}ms",
                    self.config.initiate_timeout.as_millis()
                )));
            }
        };

        if authorization.reference != reference {
            self.states.remove(&reference);
            return Err(WalletError::malformed_response(
                "initiate",
                format!(
                    "provider filed payment under '{}' instead of '{}'",
                    authorization.reference, reference
                ),
            ));
        }

        let attempt = PendingFundingAttempt {
            reference: reference.clone(),
            owner_id: owner_id.clone(),
            amount,
            fee,
            authorization_url: Some(authorization.authorization_url.clone()),
            created_at: Utc::now(),
        };

        if let Err(err) = self.store.put(&attempt) {
            self.states.remove(&reference);
            return Err(err);
        }

        let pending = EntryRequest::new(
            owner_id.clone(),
            Category::Credit,
            amount,
            reference.clone(),
            FUNDING_DESCRIPTION,
        )
        .at(attempt.created_at);
        let pending = match self.ledger.record_pending(pending) {
            Ok(pending) => pending,
            Err(err) => {
                self.states.remove(&reference);
                self.store.delete(&reference)?;
                return Err(err);
            }
        };
        if let Err(err) = self.journal(&pending) {
            self.states.remove(&reference);
            self.ledger.mark_failed(&reference)?;
            self.store.delete(&reference)?;
            return Err(err);
        }

        self.states
            .insert(reference.clone(), AttemptState::AwaitingRedirect);
        info!(owner = %owner_id, %reference, %amount, %fee, "funding initiated");
        self.events.publish(WalletEvent::FundingInitiated {
            owner_id: owner_id.clone(),
            reference,
            amount,
            fee,
            authorization_url: authorization.authorization_url,
        });

        Ok(attempt)
    }

    /// Start a funding attempt for a fee quote
    ///
    /// See [`GatewayReconciler::initiate`].
    pub async fn initiate_quote(
        &self,
        owner_id: &OwnerId,
        quote: &FeeQuote,
    ) -> Result<PendingFundingAttempt, WalletError> {
        self.initiate(owner_id, quote.amount, quote.fee).await
    }

    /// Verify a payment with the provider and settle it in the Ledger
    ///
    /// # Returns
    ///
    /// * `Ok(AttemptState::Verified)` - Wallet credited, now or earlier
    /// * `Ok(AttemptState::PendingVerification)` - Provider has not settled
    ///   yet; the attempt is kept
    /// * `Err(WalletError::VerificationFailed)` - Provider reported failure;
    ///   the attempt is cleared and the wallet untouched
    /// * `Err(WalletError::VerificationTimeout | GatewayUnavailable)` -
    ///   Retryable; the attempt is kept
    /// * `Err(WalletError::VerificationInProgress)` - Another verification of
    ///   the same reference is running
    /// * `Err(WalletError::UnknownReference)` - No attempt or entry for it
    pub async fn verify(&self, reference: &Reference) -> Result<AttemptState, WalletError> {
        let _claim = self.claim(reference)?;
        self.verify_claimed(reference).await
    }

    /// Verify every stored attempt plus an optional external reference
    ///
    /// This is the entry point after the provider redirects back, or after a
    /// restart. Each reference is verified once; references already being
    /// verified elsewhere report `VerificationInProgress`.
    pub async fn resume(
        &self,
        external: Option<&Reference>,
    ) -> Result<Vec<ResumeOutcome>, WalletError> {
        let mut seen = HashSet::new();
        let mut references: Vec<Reference> = self
            .store
            .list()?
            .into_iter()
            .map(|attempt| attempt.reference)
            .filter(|reference| seen.insert(reference.clone()))
            .collect();

        if let Some(reference) = external {
            if seen.insert(reference.clone()) {
                references.push(reference.clone());
            }
        }

        debug!(count = references.len(), "resuming funding attempts");

        let results = join_all(references.iter().map(|reference| self.verify(reference))).await;

        Ok(references
            .into_iter()
            .zip(results)
            .map(|(reference, result)| ResumeOutcome { reference, result })
            .collect())
    }

    /// Give up on a funding attempt
    ///
    /// Clears the stored attempt and finalizes the pending entry as failed.
    /// Abandoning a payment that was already credited fails with
    /// `DuplicateReference`.
    pub fn abandon(&self, reference: &Reference) -> Result<AttemptState, WalletError> {
        let _claim = self.claim(reference)?;

        let attempt = self.store.get(reference)?;
        let entry = self.ledger.find_by_reference(reference);
        if attempt.is_none() && entry.is_none() {
            return Err(WalletError::unknown_reference(reference));
        }

        let failed = match entry {
            Some(_) => Some(self.ledger.mark_failed(reference)?),
            None => None,
        };
        self.finish(reference, failed.as_ref())?;

        self.states.insert(reference.clone(), AttemptState::Abandoned);
        info!(%reference, "funding abandoned");
        self.events.publish(WalletEvent::FundingAbandoned {
            reference: reference.clone(),
        });
        Ok(AttemptState::Abandoned)
    }

    /// Current state of a funding attempt
    ///
    /// Falls back to the stored attempt and the Ledger for references this
    /// process has not handled yet.
    pub fn state(&self, reference: &Reference) -> Option<AttemptState> {
        if let Some(state) = self.states.get(reference) {
            return Some(*state);
        }

        match self.ledger.find_by_reference(reference).map(|entry| entry.status) {
            Some(TransactionStatus::Success) => return Some(AttemptState::Verified),
            Some(TransactionStatus::Failed) => return Some(AttemptState::VerificationFailed),
            Some(TransactionStatus::Pending) | None => {}
        }

        match self.store.get(reference) {
            Ok(Some(_)) => Some(AttemptState::AwaitingRedirect),
            _ => None,
        }
    }

    /// Compare the Ledger balance of an owner with the backend's
    ///
    /// # Returns
    ///
    /// * `Ok(balance)` - Both sides agree
    /// * `Err(WalletError::ReconciliationMismatch)` - They differ; `expected`
    ///   is the backend balance, `actual` the Ledger's
    pub async fn check_balance(
        &self,
        owner_id: &OwnerId,
        source: &dyn BalanceSource,
    ) -> Result<Decimal, WalletError> {
        let backend = self
            .bounded(self.config.verify_timeout, source.wallet_balance(owner_id))
            .await
            .ok_or_else(|| WalletError::gateway_unavailable("balance lookup timed out"))??;
        let ledger = self.ledger.get_balance(owner_id);

        if backend != ledger {
            warn!(owner = %owner_id, %backend, %ledger, "wallet balance drift");
            self.events.publish(WalletEvent::BalanceDrift {
                owner_id: owner_id.clone(),
                ledger,
                backend,
                at: Utc::now(),
            });
            return Err(WalletError::ReconciliationMismatch {
                owner: owner_id.clone(),
                expected: backend,
                actual: ledger,
            });
        }
        Ok(ledger)
    }

    fn claim(&self, reference: &Reference) -> Result<VerificationClaim<'_>, WalletError> {
        if self.in_flight.insert(reference.clone(), ()).is_some() {
            debug!(%reference, "verification already in progress");
            return Err(WalletError::VerificationInProgress {
                reference: reference.clone(),
            });
        }
        Ok(VerificationClaim {
            in_flight: &self.in_flight,
            reference: reference.clone(),
        })
    }

    async fn bounded<T>(&self, limit: Duration, call: impl Future<Output = T>) -> Option<T> {
        timeout(limit, call).await.ok()
    }

    async fn verify_claimed(&self, reference: &Reference) -> Result<AttemptState, WalletError> {
        let attempt = self.store.get(reference)?;
        let entry = self.ledger.find_by_reference(reference);

        let (owner_id, amount) = match (&attempt, &entry) {
            (Some(attempt), _) => (attempt.owner_id.clone(), attempt.amount),
            (None, Some(entry)) => (entry.owner_id.clone(), entry.amount),
            (None, None) => return Err(WalletError::unknown_reference(reference)),
        };

        // Settled earlier, possibly before a restart. A still stored attempt
        // means the journal may not have the outcome yet.
        let unfinished = attempt.as_ref().and(entry.as_ref());
        match entry.as_ref().map(|entry| entry.status) {
            Some(TransactionStatus::Success) => {
                self.finish(reference, unfinished)?;
                self.states.insert(reference.clone(), AttemptState::Verified);
                return Ok(AttemptState::Verified);
            }
            Some(TransactionStatus::Failed) => {
                self.finish(reference, unfinished)?;
                self.states
                    .insert(reference.clone(), AttemptState::VerificationFailed);
                return Err(WalletError::VerificationFailed {
                    reference: reference.clone(),
                    gateway_status: GatewayStatus::Failed.to_string(),
                });
            }
            Some(TransactionStatus::Pending) | None => {}
        }

        self.states
            .insert(reference.clone(), AttemptState::PendingVerification);

        let status = match self
            .bounded(self.config.verify_timeout, self.gateway.verify(reference))
            .await
        {
            Some(Ok(status)) => status,
            Some(Err(err)) => {
                warn!(%reference, error = %err, "verification deferred");
                self.defer(reference, err.to_string());
                return Err(err);
            }
            None => {
                let timeout_ms = whole_millis(self.config.verify_timeout);
                warn!(%reference, timeout_ms, "verification timed out");
                self.defer(reference, format!("timed out after {}ms", timeout_ms));
                return Err(WalletError::VerificationTimeout {
                    reference: reference.clone(),
                    timeout_ms,
                });
            }
        };

        match status {
            GatewayStatus::Success => self.settle_success(reference, &owner_id, amount),
            GatewayStatus::Failed => self.settle_failure(reference, entry.is_some(), status),
            GatewayStatus::Pending => {
                debug!(%reference, "payment still pending at provider");
                self.events.publish(WalletEvent::FundingPending {
                    reference: reference.clone(),
                });
                Ok(AttemptState::PendingVerification)
            }
        }
    }

    fn settle_success(
        &self,
        reference: &Reference,
        owner_id: &OwnerId,
        amount: Decimal,
    ) -> Result<AttemptState, WalletError> {
        let (entry, newly_credited) = match self.ledger.apply_entry(
            owner_id,
            Category::Credit,
            amount,
            reference,
            FUNDING_DESCRIPTION,
        ) {
            Ok(entry) => (entry, true),
            Err(WalletError::DuplicateReference { .. }) => {
                match self.ledger.find_by_reference(reference) {
                    Some(existing) if existing.status == TransactionStatus::Success => {
                        debug!(%reference, "payment already reconciled");
                        (existing, false)
                    }
                    _ => return Err(WalletError::duplicate_reference(reference)),
                }
            }
            Err(err) => return Err(err),
        };

        self.finish(reference, Some(&entry))?;
        self.states.insert(reference.clone(), AttemptState::Verified);

        if newly_credited {
            info!(owner = %owner_id, %reference, %amount, balance = %entry.balance_after, "wallet funded");
            self.events.publish(WalletEvent::WalletFunded {
                owner_id: owner_id.clone(),
                reference: reference.clone(),
                amount,
                balance: entry.balance_after,
            });
        }
        Ok(AttemptState::Verified)
    }

    fn settle_failure(
        &self,
        reference: &Reference,
        has_entry: bool,
        status: GatewayStatus,
    ) -> Result<AttemptState, WalletError> {
        let failed = if has_entry {
            Some(self.ledger.mark_failed(reference)?)
        } else {
            None
        };
        self.finish(reference, failed.as_ref())?;
        self.states
            .insert(reference.clone(), AttemptState::VerificationFailed);

        info!(%reference, %status, "funding failed at provider");
        self.events.publish(WalletEvent::FundingFailed {
            reference: reference.clone(),
            gateway_status: status.to_string(),
        });
        Err(WalletError::VerificationFailed {
            reference: reference.clone(),
            gateway_status: status.to_string(),
        })
    }

    fn journal(&self, entry: &Transaction) -> Result<(), WalletError> {
        match &self.journal {
            Some(journal) => journal.record(entry),
            None => Ok(()),
        }
    }

    /// Journal the settled entry, then clear the stored attempt
    fn finish(
        &self,
        reference: &Reference,
        settled: Option<&Transaction>,
    ) -> Result<(), WalletError> {
        if let Some(entry) = settled {
            if let Err(err) = self.journal(entry) {
                warn!(%reference, error = %err, "journal write failed, keeping attempt");
                return Err(err);
            }
        }
        self.store.delete(reference)?;
        Ok(())
    }

    fn defer(&self, reference: &Reference, reason: String) {
        self.events.publish(WalletEvent::VerificationDeferred {
            reference: reference.clone(),
            reason,
        });
    }
}

/// Milliseconds in `duration`, saturating at `u64::MAX`
fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
