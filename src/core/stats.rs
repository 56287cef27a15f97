//! Transaction statistics
//!
//! Totals, monthly trend buckets and a spending breakdown derived from a list
//! of ledger entries. Everything here is a pure function of its input and is
//! recomputed in full on every call.

use crate::types::{Category, Transaction, TransactionStatus, WalletError};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Label for debits without a description
pub const OTHER_LABEL: &str = "Other";

/// Credit and debit volume of one calendar month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBucket {
    pub year: i32,
    /// 1-based month number
    pub month: u32,
    /// Successful credits (wallet fundings)
    pub payment: Decimal,
    /// Successful debits (spending)
    pub transaction: Decimal,
}

impl MonthlyBucket {
    fn empty(year: i32, month: u32) -> Self {
        Self {
            year,
            month,
            payment: Decimal::ZERO,
            transaction: Decimal::ZERO,
        }
    }

    /// Short month name, e.g. "Jan"
    pub fn label(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|date| date.format("%b").to_string())
            .unwrap_or_default()
    }
}

/// Spending under one description
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub amount: Decimal,
    /// Share of all successful debits, between 0 and 1
    pub share: Decimal,
}

/// Aggregate view over a set of ledger entries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    /// Number of entries, whatever their status
    pub total_count: usize,
    pub total_credit_success: Decimal,
    pub total_credit_pending: Decimal,
    pub total_debit_success: Decimal,
    pub total_debit_pending: Decimal,
    pub monthly_trend: Vec<MonthlyBucket>,
    pub category_breakdown: BTreeMap<String, CategoryShare>,
}

/// Compute statistics over `entries`
///
/// Failed entries count towards `total_count` only. The monthly trend runs
/// from the earliest to the latest month holding a successful entry, with
/// empty months reported as zero.
///
/// # Errors
///
/// [`WalletError::ArithmeticOverflow`] when a total no longer fits a decimal.
pub fn compute_stats(entries: &[Transaction]) -> Result<Stats, WalletError> {
    let mut stats = Stats {
        total_count: entries.len(),
        total_credit_success: Decimal::ZERO,
        total_credit_pending: Decimal::ZERO,
        total_debit_success: Decimal::ZERO,
        total_debit_pending: Decimal::ZERO,
        monthly_trend: Vec::new(),
        category_breakdown: BTreeMap::new(),
    };

    for entry in entries {
        let total = match (entry.category, entry.status) {
            (Category::Credit, TransactionStatus::Success) => &mut stats.total_credit_success,
            (Category::Credit, TransactionStatus::Pending) => &mut stats.total_credit_pending,
            (Category::Debit, TransactionStatus::Success) => &mut stats.total_debit_success,
            (Category::Debit, TransactionStatus::Pending) => &mut stats.total_debit_pending,
            (_, TransactionStatus::Failed) => continue,
        };
        accumulate(total, entry, "stats total")?;
    }

    stats.monthly_trend = monthly_trend(entries)?;
    stats.category_breakdown = category_breakdown(entries)?;
    Ok(stats)
}

/// Monthly trend over the contiguous range of months with activity
pub fn monthly_trend(entries: &[Transaction]) -> Result<Vec<MonthlyBucket>, WalletError> {
    let buckets = bucket_by_month(entries)?;
    let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return Ok(Vec::new());
    };

    let mut trend = Vec::new();
    let (mut year, mut month) = first;
    while (year, month) <= last {
        trend.push(
            buckets
                .get(&(year, month))
                .cloned()
                .unwrap_or_else(|| MonthlyBucket::empty(year, month)),
        );
        (year, month) = next_month(year, month);
    }
    Ok(trend)
}

/// Twelve monthly buckets for `year`, January first
pub fn monthly_trend_for_year(
    entries: &[Transaction],
    year: i32,
) -> Result<Vec<MonthlyBucket>, WalletError> {
    let buckets = bucket_by_month(entries)?;
    Ok((1..=12)
        .map(|month| {
            buckets
                .get(&(year, month))
                .cloned()
                .unwrap_or_else(|| MonthlyBucket::empty(year, month))
        })
        .collect())
}

/// Successful debits grouped by description, with their share of the total
pub fn category_breakdown(
    entries: &[Transaction],
) -> Result<BTreeMap<String, CategoryShare>, WalletError> {
    let mut amounts: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut total = Decimal::ZERO;
    for entry in entries.iter().filter(|entry| is_successful(entry, Category::Debit)) {
        let label = match entry.description.trim() {
            "" => OTHER_LABEL.to_string(),
            description => description.to_string(),
        };
        accumulate(amounts.entry(label).or_insert(Decimal::ZERO), entry, "spending breakdown")?;
        accumulate(&mut total, entry, "spending breakdown")?;
    }

    Ok(amounts
        .into_iter()
        .map(|(label, amount)| {
            let share = if total.is_zero() {
                Decimal::ZERO
            } else {
                amount / total
            };
            (label, CategoryShare { amount, share })
        })
        .collect())
}

fn accumulate(total: &mut Decimal, entry: &Transaction, operation: &str) -> Result<(), WalletError> {
    *total = total
        .checked_add(entry.amount)
        .ok_or_else(|| WalletError::arithmetic_overflow(operation, &entry.owner_id))?;
    Ok(())
}

fn is_successful(entry: &Transaction, category: Category) -> bool {
    entry.status == TransactionStatus::Success && entry.category == category
}

fn bucket_by_month(
    entries: &[Transaction],
) -> Result<BTreeMap<(i32, u32), MonthlyBucket>, WalletError> {
    let mut buckets: BTreeMap<(i32, u32), MonthlyBucket> = BTreeMap::new();
    for entry in entries
        .iter()
        .filter(|entry| entry.status == TransactionStatus::Success)
    {
        let (year, month) = (entry.created_at.year(), entry.created_at.month());
        let bucket = buckets
            .entry((year, month))
            .or_insert_with(|| MonthlyBucket::empty(year, month));
        match entry.category {
            Category::Credit => accumulate(&mut bucket.payment, entry, "monthly trend")?,
            Category::Debit => accumulate(&mut bucket.transaction, entry, "monthly trend")?,
        }
    }
    Ok(buckets)
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OwnerId, Reference};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn entry(
        category: Category,
        status: TransactionStatus,
        amount: Decimal,
        description: &str,
        (year, month): (i32, u32),
    ) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            owner_id: OwnerId::from("parent-1"),
            category,
            amount,
            status,
            balance_before: Decimal::ZERO,
            balance_after: Decimal::ZERO,
            reference: Reference::generate(),
            description: description.to_string(),
            created_at: Utc.with_ymd_and_hms(year, month, 10, 8, 30, 0).unwrap(),
        }
    }

    fn fixture() -> Vec<Transaction> {
        use Category::*;
        use TransactionStatus::*;
        vec![
            entry(Credit, Success, dec!(50000), "Wallet top-up", (2024, 1)),
            entry(Debit, Success, dec!(30000), "School fees", (2024, 1)),
            entry(Debit, Success, dec!(10000), "", (2024, 3)),
            entry(Credit, Pending, dec!(20000), "Wallet top-up", (2024, 3)),
            entry(Debit, Pending, dec!(500), "Canteen", (2024, 3)),
            entry(Credit, Failed, dec!(99999), "Wallet top-up", (2024, 4)),
        ]
    }

    #[test]
    fn test_totals_exclude_failed_entries() {
        let stats = compute_stats(&fixture()).unwrap();

        assert_eq!(stats.total_count, 6);
        assert_eq!(stats.total_credit_success, dec!(50000));
        assert_eq!(stats.total_credit_pending, dec!(20000));
        assert_eq!(stats.total_debit_success, dec!(40000));
        assert_eq!(stats.total_debit_pending, dec!(500));
    }

    #[test]
    fn test_monthly_trend_fills_gaps() {
        let trend = compute_stats(&fixture()).unwrap().monthly_trend;

        let months: Vec<(i32, u32)> = trend.iter().map(|b| (b.year, b.month)).collect();
        assert_eq!(months, vec![(2024, 1), (2024, 2), (2024, 3)]);
        assert_eq!(trend[0].payment, dec!(50000));
        assert_eq!(trend[0].transaction, dec!(30000));
        assert_eq!(trend[1], MonthlyBucket::empty(2024, 2));
        assert_eq!(trend[2].transaction, dec!(10000));
        assert_eq!(trend[0].label(), "Jan");
    }

    #[test]
    fn test_monthly_trend_crosses_year_boundary() {
        let entries = vec![
            entry(Category::Credit, TransactionStatus::Success, dec!(1), "", (2023, 11)),
            entry(Category::Credit, TransactionStatus::Success, dec!(1), "", (2024, 2)),
        ];
        let months: Vec<(i32, u32)> = monthly_trend(&entries)
            .unwrap()
            .iter()
            .map(|b| (b.year, b.month))
            .collect();
        assert_eq!(months, vec![(2023, 11), (2023, 12), (2024, 1), (2024, 2)]);
    }

    #[rstest]
    #[case::with_activity(2024, dec!(50000))]
    #[case::without_activity(2025, Decimal::ZERO)]
    fn test_monthly_trend_for_year_has_twelve_months(
        #[case] year: i32,
        #[case] january_payment: Decimal,
    ) {
        let trend = monthly_trend_for_year(&fixture(), year).unwrap();
        assert_eq!(trend.len(), 12);
        assert_eq!(trend[0].month, 1);
        assert_eq!(trend[11].month, 12);
        assert_eq!(trend[0].payment, january_payment);
    }

    #[test]
    fn test_category_breakdown_shares() {
        let breakdown = compute_stats(&fixture()).unwrap().category_breakdown;

        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown["School fees"].amount, dec!(30000));
        assert_eq!(breakdown["School fees"].share, dec!(0.75));
        assert_eq!(breakdown[OTHER_LABEL].amount, dec!(10000));
        assert_eq!(breakdown[OTHER_LABEL].share, dec!(0.25));
    }

    #[test]
    fn test_empty_input() {
        let stats = compute_stats(&[]).unwrap();
        assert_eq!(stats.total_count, 0);
        assert!(stats.monthly_trend.is_empty());
        assert!(stats.category_breakdown.is_empty());
    }

    #[rstest]
    #[case::credits(Category::Credit)]
    #[case::debits(Category::Debit)]
    fn test_totals_too_large_are_an_error(#[case] category: Category) {
        let entries = vec![
            entry(category, TransactionStatus::Success, Decimal::MAX, "Bulk", (2024, 1)),
            entry(category, TransactionStatus::Success, Decimal::MAX, "Bulk", (2024, 1)),
        ];

        let err = compute_stats(&entries).unwrap_err();
        assert!(matches!(err, WalletError::ArithmeticOverflow { .. }));
        assert!(monthly_trend_for_year(&entries, 2024).is_err());
    }
}
