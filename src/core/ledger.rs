//! Append-only ledger of wallet transactions
//!
//! This module provides the `Ledger` struct, which records credit and debit
//! entries per owner and derives each owner's wallet balance from them.
//!
//! # Design
//!
//! Every owner has a book holding the wallet and its entries. Books live in a
//! `DashMap`, so writes for one owner are serialized by the map's entry lock
//! while different owners proceed in parallel. The entry append and the
//! wallet update happen inside the same locked section, which means no reader
//! ever observes one without the other.
//!
//! A second map indexes references to owners. It enforces reference
//! uniqueness across owners and lets `mark_failed` / `find_by_reference` find
//! the right book.
//!
//! # Lock Ordering
//!
//! A book lock may be held while the reference index is touched, never the
//! other way round.
//!
//! # Idempotency
//!
//! - Applying an entry whose reference already reached a terminal status fails
//!   with [`WalletError::DuplicateReference`] and leaves the wallet untouched.
//! - Applying an entry whose reference is pending promotes the pending entry
//!   to `success`, provided category and amount agree with it; otherwise the
//!   request fails with [`WalletError::ConflictingEntry`].

use crate::types::{
    Category, EntryFilter, EntryRecord, EntryRequest, OwnerId, Reference, Transaction, TransactionStatus,
    Wallet, WalletError, DEFAULT_CURRENCY,
};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// One owner's wallet and entry log
#[derive(Debug)]
struct OwnerBook {
    wallet: Wallet,
    entries: Vec<Transaction>,
    /// Position of each reference in `entries`
    by_reference: HashMap<Reference, usize>,
}

impl OwnerBook {
    fn new(owner_id: OwnerId, currency: &str) -> Self {
        Self {
            wallet: Wallet::new(owner_id, currency),
            entries: Vec::new(),
            by_reference: HashMap::new(),
        }
    }

    fn next_balance(
        &self,
        category: Category,
        amount: Decimal,
    ) -> Result<Decimal, WalletError> {
        let owner = &self.wallet.owner_id;
        let balance = self.wallet.balance;

        match category {
            Category::Credit => balance
                .checked_add(amount)
                .ok_or_else(|| WalletError::arithmetic_overflow("credit", owner)),
            Category::Debit => {
                if balance < amount {
                    return Err(WalletError::insufficient_funds(owner, balance, amount));
                }
                balance
                    .checked_sub(amount)
                    .ok_or_else(|| WalletError::arithmetic_overflow("debit", owner))
            }
        }
    }

    fn derived_balance(&self) -> Decimal {
        self.entries
            .iter()
            .filter(|entry| entry.status == TransactionStatus::Success)
            .map(Transaction::signed_amount)
            .sum()
    }
}

/// Ledger of credit/debit entries and the wallets derived from them
///
/// # Thread Safety
///
/// All methods take `&self` and are safe to call from many threads. Writes for
/// the same owner are linearized; reads see either all or none of a write.
#[derive(Debug)]
pub struct Ledger {
    books: DashMap<OwnerId, OwnerBook>,
    references: DashMap<Reference, OwnerId>,
    currency: String,
}

impl Ledger {
    /// Create an empty ledger using the default currency
    pub fn new() -> Self {
        Self::with_currency(DEFAULT_CURRENCY)
    }

    /// Create an empty ledger whose wallets use `currency`
    pub fn with_currency(currency: impl Into<String>) -> Self {
        Self {
            books: DashMap::new(),
            references: DashMap::new(),
            currency: currency.into(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Apply a successful entry and update the wallet
    ///
    /// # Errors
    ///
    /// - [`WalletError::InvalidAmount`] - amount is zero or negative
    /// - [`WalletError::DuplicateReference`] - reference already terminal, or
    ///   owned by another wallet
    /// - [`WalletError::ConflictingEntry`] - reference is pending with another
    ///   category or amount
    /// - [`WalletError::InsufficientFunds`] - debit larger than the balance
    /// - [`WalletError::ArithmeticOverflow`] - balance would overflow
    pub fn apply_entry(
        &self,
        owner_id: &OwnerId,
        category: Category,
        amount: Decimal,
        reference: &Reference,
        description: &str,
    ) -> Result<Transaction, WalletError> {
        self.apply(EntryRequest::new(
            owner_id.clone(),
            category,
            amount,
            reference.clone(),
            description,
        ))
    }

    /// Apply a successful entry described by a request
    ///
    /// See [`Ledger::apply_entry`].
    pub fn apply(&self, request: EntryRequest) -> Result<Transaction, WalletError> {
        validate_amount(request.amount)?;

        let mut book = self
            .books
            .entry(request.owner_id.clone())
            .or_insert_with(|| OwnerBook::new(request.owner_id.clone(), &self.currency));

        if let Some(&index) = book.by_reference.get(&request.reference) {
            let existing = &book.entries[index];
            if existing.status.is_terminal() {
                debug!(reference = %request.reference, "entry already terminal");
                return Err(WalletError::duplicate_reference(&request.reference));
            }
            if existing.category != request.category || existing.amount != request.amount {
                warn!(reference = %request.reference, "request conflicts with pending entry");
                return Err(WalletError::conflicting_entry(
                    &request.reference,
                    format!("{} {}", existing.category, existing.amount),
                    format!("{} {}", request.category, request.amount),
                ));
            }

            // Promote the pending entry.
            let balance_before = book.wallet.balance;
            let balance_after = book.next_balance(existing.category, existing.amount)?;

            let entry = &mut book.entries[index];
            entry.status = TransactionStatus::Success;
            entry.balance_before = balance_before;
            entry.balance_after = balance_after;
            let promoted = entry.clone();

            book.wallet.balance = balance_after;
            debug!(reference = %promoted.reference, balance = %balance_after, "pending entry applied");
            return Ok(promoted);
        }

        let balance_before = book.wallet.balance;
        let balance_after = book.next_balance(request.category, request.amount)?;
        self.claim_reference(&request.reference, &request.owner_id)?;

        let entry = Transaction {
            id: Uuid::new_v4(),
            owner_id: request.owner_id,
            category: request.category,
            amount: request.amount,
            status: TransactionStatus::Success,
            balance_before,
            balance_after,
            reference: request.reference,
            description: request.description,
            created_at: request.created_at.unwrap_or_else(Utc::now),
        };

        let index = book.entries.len();
        book.by_reference.insert(entry.reference.clone(), index);
        book.entries.push(entry.clone());
        book.wallet.balance = balance_after;

        debug!(
            owner = %entry.owner_id,
            reference = %entry.reference,
            category = %entry.category,
            amount = %entry.amount,
            balance = %balance_after,
            "entry applied"
        );
        Ok(entry)
    }

    /// Record a pending entry with no balance effect
    ///
    /// # Errors
    ///
    /// [`WalletError::DuplicateReference`] if the reference is already known,
    /// plus the amount validation of [`Ledger::apply_entry`].
    pub fn record_pending(&self, request: EntryRequest) -> Result<Transaction, WalletError> {
        validate_amount(request.amount)?;

        let mut book = self
            .books
            .entry(request.owner_id.clone())
            .or_insert_with(|| OwnerBook::new(request.owner_id.clone(), &self.currency));

        if book.by_reference.contains_key(&request.reference) {
            return Err(WalletError::duplicate_reference(&request.reference));
        }
        self.claim_reference(&request.reference, &request.owner_id)?;

        let balance = book.wallet.balance;
        let entry = Transaction {
            id: Uuid::new_v4(),
            owner_id: request.owner_id,
            category: request.category,
            amount: request.amount,
            status: TransactionStatus::Pending,
            balance_before: balance,
            balance_after: balance,
            reference: request.reference,
            description: request.description,
            created_at: request.created_at.unwrap_or_else(Utc::now),
        };

        let index = book.entries.len();
        book.by_reference.insert(entry.reference.clone(), index);
        book.entries.push(entry.clone());
        Ok(entry)
    }

    /// Finalize a pending entry as failed
    ///
    /// Calling this again for an entry that already failed returns it
    /// unchanged.
    ///
    /// # Errors
    ///
    /// - [`WalletError::UnknownReference`] - no entry carries the reference
    /// - [`WalletError::DuplicateReference`] - the entry already succeeded
    pub fn mark_failed(&self, reference: &Reference) -> Result<Transaction, WalletError> {
        let owner = self
            .owner_of(reference)
            .ok_or_else(|| WalletError::unknown_reference(reference))?;

        let mut book = self
            .books
            .get_mut(&owner)
            .ok_or_else(|| WalletError::unknown_reference(reference))?;
        let index = *book
            .by_reference
            .get(reference)
            .ok_or_else(|| WalletError::unknown_reference(reference))?;

        let entry = &mut book.entries[index];
        match entry.status {
            TransactionStatus::Pending => {
                entry.status = TransactionStatus::Failed;
                debug!(reference = %reference, "pending entry failed");
                Ok(entry.clone())
            }
            TransactionStatus::Failed => Ok(entry.clone()),
            TransactionStatus::Success => Err(WalletError::duplicate_reference(reference)),
        }
    }

    /// Reproduce an exported entry with the status it was exported with
    ///
    /// A `success` or `failed` record for a reference that is still pending
    /// finalizes the pending entry, so a file that logs a funding attempt
    /// twice (once when started, once when settled) replays to one entry.
    pub fn replay(&self, record: EntryRecord) -> Result<Transaction, WalletError> {
        match record.status {
            TransactionStatus::Success => self.apply(record.request),
            TransactionStatus::Pending => self.record_pending(record.request),
            TransactionStatus::Failed => {
                let request = record.request;
                match self.find_by_reference(&request.reference) {
                    Some(existing)
                        if existing.status == TransactionStatus::Pending
                            && existing.owner_id == request.owner_id =>
                    {
                        if existing.category != request.category || existing.amount != request.amount {
                            return Err(WalletError::conflicting_entry(
                                &request.reference,
                                format!("{} {}", existing.category, existing.amount),
                                format!("{} {}", request.category, request.amount),
                            ));
                        }
                        self.mark_failed(&request.reference)
                    }
                    _ => {
                        let reference = request.reference.clone();
                        self.record_pending(request)?;
                        self.mark_failed(&reference)
                    }
                }
            }
        }
    }

    /// Current balance of an owner
    ///
    /// Owners without a wallet have a zero balance.
    pub fn get_balance(&self, owner_id: &OwnerId) -> Decimal {
        self.books
            .get(owner_id)
            .map(|book| book.wallet.balance)
            .unwrap_or(Decimal::ZERO)
    }

    /// Snapshot of an owner's wallet, if one exists
    pub fn wallet(&self, owner_id: &OwnerId) -> Option<Wallet> {
        self.books.get(owner_id).map(|book| book.wallet.clone())
    }

    /// Snapshots of all wallets, sorted by owner
    pub fn wallets(&self) -> Vec<Wallet> {
        let mut wallets: Vec<Wallet> = self
            .books
            .iter()
            .map(|book| book.wallet.clone())
            .collect();
        wallets.sort_by(|a, b| a.owner_id.cmp(&b.owner_id));
        wallets
    }

    /// Entries of an owner matching `filter`, in the order they were written
    pub fn list_entries(&self, owner_id: &OwnerId, filter: &EntryFilter) -> Vec<Transaction> {
        self.books
            .get(owner_id)
            .map(|book| {
                book.entries
                    .iter()
                    .filter(|entry| filter.matches(entry))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Look up an entry by reference
    pub fn find_by_reference(&self, reference: &Reference) -> Option<Transaction> {
        let owner = self.owner_of(reference)?;
        let book = self.books.get(&owner)?;
        let index = *book.by_reference.get(reference)?;
        Some(book.entries[index].clone())
    }

    /// Recompute an owner's balance from the entry log and compare it with
    /// the wallet
    ///
    /// # Errors
    ///
    /// [`WalletError::ReconciliationMismatch`] when they disagree.
    pub fn audit(&self, owner_id: &OwnerId) -> Result<(), WalletError> {
        let Some(book) = self.books.get(owner_id) else {
            return Ok(());
        };

        let expected = book.derived_balance();
        if expected != book.wallet.balance {
            warn!(owner = %owner_id, %expected, actual = %book.wallet.balance, "ledger drift");
            return Err(WalletError::ReconciliationMismatch {
                owner: owner_id.clone(),
                expected,
                actual: book.wallet.balance,
            });
        }
        Ok(())
    }

    fn owner_of(&self, reference: &Reference) -> Option<OwnerId> {
        self.references.get(reference).map(|owner| owner.clone())
    }

    /// Reserve a reference for an owner whose book lock is held
    fn claim_reference(&self, reference: &Reference, owner: &OwnerId) -> Result<(), WalletError> {
        match self.references.entry(reference.clone()) {
            Entry::Occupied(_) => Err(WalletError::duplicate_reference(reference)),
            Entry::Vacant(slot) => {
                slot.insert(owner.clone());
                Ok(())
            }
        }
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_amount(amount: Decimal) -> Result<(), WalletError> {
    if amount <= Decimal::ZERO {
        return Err(WalletError::invalid_amount(amount));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn owner() -> OwnerId {
        OwnerId::from("parent-1")
    }

    fn credit(ledger: &Ledger, reference: &str, amount: Decimal) -> Result<Transaction, WalletError> {
        ledger.apply_entry(
            &owner(),
            Category::Credit,
            amount,
            &Reference::from(reference),
            "Wallet top-up",
        )
    }

    fn debit(ledger: &Ledger, reference: &str, amount: Decimal) -> Result<Transaction, WalletError> {
        ledger.apply_entry(
            &owner(),
            Category::Debit,
            amount,
            &Reference::from(reference),
            "School fees",
        )
    }

    #[test]
    fn test_new_ledger_reports_zero_balance() {
        let ledger = Ledger::new();
        assert_eq!(ledger.get_balance(&owner()), Decimal::ZERO);
        assert!(ledger.wallet(&owner()).is_none());
        assert!(ledger.wallets().is_empty());
    }

    #[test]
    fn test_credit_creates_wallet_and_records_balances() {
        let ledger = Ledger::new();
        let entry = credit(&ledger, "PAY-1", dec!(5000)).unwrap();

        assert_eq!(entry.status, TransactionStatus::Success);
        assert_eq!(entry.balance_before, Decimal::ZERO);
        assert_eq!(entry.balance_after, dec!(5000));
        assert_eq!(ledger.get_balance(&owner()), dec!(5000));
        assert_eq!(ledger.wallet(&owner()).unwrap().currency, "NGN");
    }

    #[test]
    fn test_debit_reduces_balance() {
        let ledger = Ledger::new();
        credit(&ledger, "PAY-1", dec!(5000)).unwrap();
        let entry = debit(&ledger, "FEE-1", dec!(1200)).unwrap();

        assert_eq!(entry.balance_before, dec!(5000));
        assert_eq!(entry.balance_after, dec!(3800));
        assert_eq!(ledger.get_balance(&owner()), dec!(3800));
    }

    #[test]
    fn test_duplicate_reference_leaves_balance_unchanged() {
        let ledger = Ledger::new();
        credit(&ledger, "PAY-1", dec!(5000)).unwrap();

        let result = credit(&ledger, "PAY-1", dec!(5000));
        assert_eq!(
            result.unwrap_err(),
            WalletError::duplicate_reference(&Reference::from("PAY-1"))
        );
        assert_eq!(ledger.get_balance(&owner()), dec!(5000));
        assert_eq!(ledger.list_entries(&owner(), &EntryFilter::all()).len(), 1);
    }

    #[test]
    fn test_reference_is_unique_across_owners() {
        let ledger = Ledger::new();
        credit(&ledger, "PAY-1", dec!(5000)).unwrap();

        let result = ledger.apply_entry(
            &OwnerId::from("someone-else"),
            Category::Credit,
            dec!(10),
            &Reference::from("PAY-1"),
            "",
        );
        assert!(matches!(result, Err(WalletError::DuplicateReference { .. })));
        assert_eq!(ledger.get_balance(&OwnerId::from("someone-else")), Decimal::ZERO);
    }

    #[test]
    fn test_insufficient_funds_leaves_ledger_unchanged() {
        let ledger = Ledger::new();
        credit(&ledger, "PAY-1", dec!(100)).unwrap();

        let result = debit(&ledger, "FEE-1", dec!(100.01));
        assert_eq!(
            result.unwrap_err(),
            WalletError::insufficient_funds(&owner(), dec!(100), dec!(100.01))
        );
        assert_eq!(ledger.get_balance(&owner()), dec!(100));
        assert_eq!(ledger.list_entries(&owner(), &EntryFilter::all()).len(), 1);
        assert!(ledger.find_by_reference(&Reference::from("FEE-1")).is_none());

        // The rejected reference can still be used later.
        credit(&ledger, "PAY-2", dec!(1)).unwrap();
        debit(&ledger, "FEE-1", dec!(100.01)).unwrap();
        assert_eq!(ledger.get_balance(&owner()), dec!(0.99));
    }

    #[test]
    fn test_non_positive_amounts_are_rejected() {
        let ledger = Ledger::new();
        assert!(matches!(
            credit(&ledger, "PAY-1", Decimal::ZERO),
            Err(WalletError::InvalidAmount { .. })
        ));
        assert!(matches!(
            debit(&ledger, "PAY-2", dec!(-5)),
            Err(WalletError::InvalidAmount { .. })
        ));
        assert!(ledger.wallet(&owner()).is_none());
    }

    #[test]
    fn test_pending_entry_has_no_balance_effect_until_applied() {
        let ledger = Ledger::new();
        let request = EntryRequest::new(
            owner(),
            Category::Credit,
            dec!(2000),
            Reference::from("FUND-1"),
            "Wallet top-up",
        );
        let pending = ledger.record_pending(request).unwrap();
        assert_eq!(pending.status, TransactionStatus::Pending);
        assert_eq!(ledger.get_balance(&owner()), Decimal::ZERO);

        let applied = credit(&ledger, "FUND-1", dec!(2000)).unwrap();
        assert_eq!(applied.id, pending.id);
        assert_eq!(applied.status, TransactionStatus::Success);
        assert_eq!(applied.balance_after, dec!(2000));
        assert_eq!(ledger.get_balance(&owner()), dec!(2000));
        assert_eq!(ledger.list_entries(&owner(), &EntryFilter::all()).len(), 1);

        // Second application is a duplicate.
        assert!(matches!(
            credit(&ledger, "FUND-1", dec!(2000)),
            Err(WalletError::DuplicateReference { .. })
        ));
        assert_eq!(ledger.get_balance(&owner()), dec!(2000));
    }

    #[rstest]
    #[case::other_category(Category::Debit, dec!(2000))]
    #[case::other_amount(Category::Credit, dec!(100))]
    fn test_promotion_must_match_pending_entry(#[case] category: Category, #[case] amount: Decimal) {
        let ledger = Ledger::new();
        ledger
            .record_pending(EntryRequest::new(
                owner(),
                Category::Credit,
                dec!(2000),
                Reference::from("FUND-1"),
                "Wallet top-up",
            ))
            .unwrap();

        let err = ledger
            .apply_entry(&owner(), category, amount, &Reference::from("FUND-1"), "")
            .unwrap_err();

        assert!(matches!(err, WalletError::ConflictingEntry { .. }));
        assert_eq!(ledger.get_balance(&owner()), Decimal::ZERO);
        let entry = ledger.find_by_reference(&Reference::from("FUND-1")).unwrap();
        assert_eq!(entry.status, TransactionStatus::Pending);
        assert_eq!(entry.amount, dec!(2000));

        // The matching request still promotes it.
        assert!(credit(&ledger, "FUND-1", dec!(2000.00)).is_ok());
        assert_eq!(ledger.get_balance(&owner()), dec!(2000));
    }

    #[test]
    fn test_mark_failed_is_idempotent() {
        let ledger = Ledger::new();
        let request = EntryRequest::new(
            owner(),
            Category::Credit,
            dec!(2000),
            Reference::from("FUND-1"),
            "Wallet top-up",
        );
        ledger.record_pending(request).unwrap();

        let failed = ledger.mark_failed(&Reference::from("FUND-1")).unwrap();
        assert_eq!(failed.status, TransactionStatus::Failed);
        let again = ledger.mark_failed(&Reference::from("FUND-1")).unwrap();
        assert_eq!(again, failed);

        // A failed reference cannot be credited afterwards.
        assert!(matches!(
            credit(&ledger, "FUND-1", dec!(2000)),
            Err(WalletError::DuplicateReference { .. })
        ));
        assert_eq!(ledger.get_balance(&owner()), Decimal::ZERO);
    }

    #[test]
    fn test_mark_failed_rejects_successful_and_unknown_entries() {
        let ledger = Ledger::new();
        credit(&ledger, "PAY-1", dec!(10)).unwrap();

        assert!(matches!(
            ledger.mark_failed(&Reference::from("PAY-1")),
            Err(WalletError::DuplicateReference { .. })
        ));
        assert!(matches!(
            ledger.mark_failed(&Reference::from("NOPE")),
            Err(WalletError::UnknownReference { .. })
        ));
    }

    #[test]
    fn test_list_entries_filters() {
        let ledger = Ledger::new();
        let january = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let february = Utc.with_ymd_and_hms(2024, 2, 15, 9, 0, 0).unwrap();

        ledger
            .apply(
                EntryRequest::new(owner(), Category::Credit, dec!(1000), "A".into(), "top-up")
                    .at(january),
            )
            .unwrap();
        ledger
            .apply(
                EntryRequest::new(owner(), Category::Debit, dec!(300), "B".into(), "fees")
                    .at(february),
            )
            .unwrap();
        ledger
            .record_pending(EntryRequest::new(
                owner(),
                Category::Credit,
                dec!(50),
                "C".into(),
                "top-up",
            ))
            .unwrap();

        assert_eq!(ledger.list_entries(&owner(), &EntryFilter::default()).len(), 2);
        assert_eq!(ledger.list_entries(&owner(), &EntryFilter::all()).len(), 3);

        let debits = ledger.list_entries(
            &owner(),
            &EntryFilter::default().with_category(Category::Debit),
        );
        assert_eq!(debits.len(), 1);
        assert_eq!(debits[0].reference, Reference::from("B"));

        let pending = ledger.list_entries(
            &owner(),
            &EntryFilter::default().with_status(TransactionStatus::Pending),
        );
        assert_eq!(pending.len(), 1);

        let in_january = ledger.list_entries(
            &owner(),
            &EntryFilter::default().between(january, february),
        );
        assert_eq!(in_january.len(), 1);
        assert_eq!(in_january[0].created_at, january);
    }

    #[test]
    fn test_audit_passes_for_consistent_book() {
        let ledger = Ledger::new();
        credit(&ledger, "PAY-1", dec!(5000)).unwrap();
        debit(&ledger, "FEE-1", dec!(2000)).unwrap();
        assert!(ledger.audit(&owner()).is_ok());
        assert!(ledger.audit(&OwnerId::from("nobody")).is_ok());
    }

    #[test]
    fn test_audit_detects_drift() {
        let ledger = Ledger::new();
        credit(&ledger, "PAY-1", dec!(5000)).unwrap();
        ledger.books.get_mut(&owner()).unwrap().wallet.balance = dec!(1);

        assert_eq!(
            ledger.audit(&owner()).unwrap_err(),
            WalletError::ReconciliationMismatch {
                owner: owner(),
                expected: dec!(5000),
                actual: dec!(1),
            }
        );
    }

    #[test]
    fn test_replay_reproduces_recorded_status() {
        let ledger = Ledger::new();
        let record = |status, reference: &str, amount| EntryRecord {
            status,
            request: EntryRequest::new(owner(), Category::Credit, amount, reference.into(), ""),
        };

        ledger
            .replay(record(TransactionStatus::Pending, "A", dec!(100)))
            .unwrap();
        let failed = ledger
            .replay(record(TransactionStatus::Failed, "B", dec!(50)))
            .unwrap();
        assert_eq!(failed.status, TransactionStatus::Failed);
        assert_eq!(ledger.get_balance(&owner()), Decimal::ZERO);

        let promoted = ledger
            .replay(record(TransactionStatus::Success, "A", dec!(100)))
            .unwrap();
        assert_eq!(promoted.status, TransactionStatus::Success);
        assert_eq!(ledger.get_balance(&owner()), dec!(100));
        assert_eq!(ledger.list_entries(&owner(), &EntryFilter::all()).len(), 2);

        // A failed record settles a pending one in place.
        ledger
            .replay(record(TransactionStatus::Pending, "C", dec!(70)))
            .unwrap();
        let settled = ledger
            .replay(record(TransactionStatus::Failed, "C", dec!(70)))
            .unwrap();
        assert_eq!(settled.status, TransactionStatus::Failed);
        assert_eq!(ledger.list_entries(&owner(), &EntryFilter::all()).len(), 3);
        assert_eq!(ledger.get_balance(&owner()), dec!(100));
    }

    #[test]
    fn test_wallets_sorted_by_owner() {
        let ledger = Ledger::with_currency("USD");
        for (owner, reference) in [("c", "1"), ("a", "2"), ("b", "3")] {
            ledger
                .apply_entry(
                    &OwnerId::from(owner),
                    Category::Credit,
                    dec!(1),
                    &Reference::from(reference),
                    "",
                )
                .unwrap();
        }

        let owners: Vec<String> = ledger
            .wallets()
            .into_iter()
            .map(|wallet| wallet.owner_id.0)
            .collect();
        assert_eq!(owners, vec!["a", "b", "c"]);
        assert_eq!(ledger.currency(), "USD");
    }
}
