//! CSV format handling for ledger entries, charge rules and wallet output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for ledger entry deserialization
//! - ChargeRuleCsvRecord structure for charge rule deserialization
//! - Conversion from CSV records to domain types
//! - Wallet output serialization
//!
//! Ledger entry files use the columns
//! `owner,category,status,amount,reference,description,created_at`;
//! `description` and `created_at` may be empty.

use crate::types::charge_rule::{DEFAULT_CAP, DEFAULT_TIER_BOUNDARY_1, DEFAULT_TIER_BOUNDARY_2};
use crate::types::{
    Category, ChargeRule, ChargeType, EntryRecord, EntryRequest, OwnerId, Reference, RuleStatus,
    TransactionStatus, Wallet, WalletError, DEFAULT_CURRENCY,
};
use chrono::{DateTime, NaiveDate, Utc};
use csv::{ReaderBuilder, Trim};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use std::io::{Read, Write};
use std::str::FromStr;
use tracing::warn;

/// CSV record structure for ledger entry deserialization
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRecord {
    pub owner: String,
    pub category: String,
    pub status: String,
    pub amount: String,
    pub reference: String,
    pub description: Option<String>,
    pub created_at: Option<String>,
}

/// CSV record structure for charge rule deserialization
///
/// Boundaries and cap fall back to the standard schedule when empty.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ChargeRuleCsvRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub charge_type: String,
    pub flat_amount: Option<String>,
    pub tier_rate_1: Option<String>,
    pub tier_rate_2: Option<String>,
    pub tier_rate_3: Option<String>,
    pub tier_boundary_1: Option<String>,
    pub tier_boundary_2: Option<String>,
    pub cap: Option<String>,
    pub status: Option<String>,
}

/// Convert a CsvRecord to an EntryRecord
///
/// # Arguments
///
/// * `csv_record` - The deserialized CSV record
///
/// # Returns
///
/// * `Ok(EntryRecord)` - Successfully converted record
/// * `Err(WalletError::ParseError)` - A field could not be parsed
/// * `Err(WalletError::InvalidAmount)` - The amount is not positive
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<EntryRecord, WalletError> {
    let reference = csv_record.reference.trim();
    if reference.is_empty() {
        return Err(parse_error("missing reference"));
    }

    let owner = csv_record.owner.trim();
    if owner.is_empty() {
        return Err(parse_error(format!("missing owner for '{}'", reference)));
    }

    let category = Category::from_str(&csv_record.category).map_err(parse_error)?;
    let status = TransactionStatus::from_str(&csv_record.status).map_err(parse_error)?;

    let amount = Decimal::from_str(csv_record.amount.trim()).map_err(|_| {
        parse_error(format!(
            "Invalid amount '{}' for '{}'",
            csv_record.amount, reference
        ))
    })?;
    if amount <= Decimal::ZERO {
        return Err(WalletError::invalid_amount(amount));
    }

    let mut request = EntryRequest::new(
        OwnerId::from(owner),
        category,
        amount,
        Reference::from(reference),
        csv_record.description.unwrap_or_default().trim(),
    );
    if let Some(created_at) = non_empty(csv_record.created_at.as_deref()) {
        request = request.at(parse_timestamp(created_at)?);
    }

    Ok(EntryRecord { status, request })
}

/// Convert a ChargeRuleCsvRecord to a ChargeRule
pub fn convert_charge_rule_record(record: ChargeRuleCsvRecord) -> Result<ChargeRule, WalletError> {
    let charge_type = ChargeType::from_str(&record.charge_type).map_err(parse_error)?;
    let status = match non_empty(record.status.as_deref()) {
        Some(status) => RuleStatus::from_str(status).map_err(parse_error)?,
        None => RuleStatus::Active,
    };

    let decimal = |field: &str, value: Option<&str>| -> Result<Option<Decimal>, WalletError> {
        non_empty(value)
            .map(|raw| {
                Decimal::from_str(raw).map_err(|_| {
                    parse_error(format!(
                        "Invalid {} '{}' for rule '{}'",
                        field, raw, record.id
                    ))
                })
            })
            .transpose()
    };

    let flat_amount = decimal("flat_amount", record.flat_amount.as_deref())?;
    let rate = |field: &str, value: &Option<String>| {
        decimal(field, value.as_deref()).map(|rate| rate.unwrap_or(Decimal::ZERO))
    };

    Ok(ChargeRule {
        id: record.id.trim().to_string(),
        name: record.name.trim().to_string(),
        charge_type,
        flat_amount,
        tier_rate_1: rate("tier_rate_1", &record.tier_rate_1)?,
        tier_rate_2: rate("tier_rate_2", &record.tier_rate_2)?,
        tier_rate_3: rate("tier_rate_3", &record.tier_rate_3)?,
        tier_boundary_1: decimal("tier_boundary_1", record.tier_boundary_1.as_deref())?
            .unwrap_or(DEFAULT_TIER_BOUNDARY_1),
        tier_boundary_2: decimal("tier_boundary_2", record.tier_boundary_2.as_deref())?
            .unwrap_or(DEFAULT_TIER_BOUNDARY_2),
        cap: decimal("cap", record.cap.as_deref())?.unwrap_or(DEFAULT_CAP),
        status,
    })
}

/// Read every charge rule from CSV input
///
/// Rows that cannot be converted are logged and skipped.
pub fn read_charge_rules<R: Read>(input: R) -> Result<Vec<ChargeRule>, WalletError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(input);

    let mut rules = Vec::new();
    for row in reader.deserialize::<ChargeRuleCsvRecord>() {
        match row.map_err(WalletError::from).and_then(convert_charge_rule_record) {
            Ok(rule) => rules.push(rule),
            Err(e) => warn!(error = %e, "skipping charge rule"),
        }
    }
    Ok(rules)
}

/// Write wallet states to CSV format
///
/// Writes wallets with columns: owner, balance, currency. Balances are
/// rounded to two decimal places and wallets are sorted by owner for
/// deterministic output.
pub fn write_wallets_csv(wallets: &[Wallet], output: &mut dyn Write) -> Result<(), WalletError> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(["owner", "balance", "currency"])?;

    let mut sorted_wallets = wallets.to_vec();
    sorted_wallets.sort_by(|a, b| a.owner_id.cmp(&b.owner_id));

    for wallet in sorted_wallets {
        let balance = wallet
            .balance
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let currency = if wallet.currency.is_empty() {
            DEFAULT_CURRENCY
        } else {
            wallet.currency.as_str()
        };
        writer.write_record([
            wallet.owner_id.as_str(),
            format!("{:.2}", balance).as_str(),
            currency,
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, WalletError> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| parse_error(format!("Invalid timestamp '{}'", raw)))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_error(message: impl ToString) -> WalletError {
    WalletError::ParseError {
        line: None,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn record(category: &str, status: &str, amount: &str) -> CsvRecord {
        CsvRecord {
            owner: "parent-1".to_string(),
            category: category.to_string(),
            status: status.to_string(),
            amount: amount.to_string(),
            reference: "PAY-1".to_string(),
            description: Some(" School fees ".to_string()),
            created_at: None,
        }
    }

    #[rstest]
    #[case("credit", "success", Category::Credit, TransactionStatus::Success)]
    #[case("DEBIT", "pending", Category::Debit, TransactionStatus::Pending)]
    #[case("credit", "Failed", Category::Credit, TransactionStatus::Failed)]
    fn test_convert_csv_record_valid(
        #[case] category: &str,
        #[case] status: &str,
        #[case] expected_category: Category,
        #[case] expected_status: TransactionStatus,
    ) {
        let converted = convert_csv_record(record(category, status, "100.50")).unwrap();

        assert_eq!(converted.status, expected_status);
        assert_eq!(converted.request.category, expected_category);
        assert_eq!(converted.request.amount, dec!(100.50));
        assert_eq!(converted.request.description, "School fees");
        assert_eq!(converted.owner_id(), &OwnerId::from("parent-1"));
        assert_eq!(converted.request.created_at, None);
    }

    #[rstest]
    #[case::invalid_category("refund", "success", "10", "Invalid category")]
    #[case::invalid_status("credit", "done", "10", "Invalid status")]
    #[case::invalid_amount("credit", "success", "ten", "Invalid amount")]
    fn test_convert_csv_record_parse_errors(
        #[case] category: &str,
        #[case] status: &str,
        #[case] amount: &str,
        #[case] expected_error: &str,
    ) {
        let err = convert_csv_record(record(category, status, amount)).unwrap_err();
        assert!(matches!(err, WalletError::ParseError { .. }));
        assert!(err.to_string().contains(expected_error));
    }

    #[rstest]
    #[case::zero("0")]
    #[case::negative("-5")]
    fn test_convert_csv_record_rejects_non_positive_amounts(#[case] amount: &str) {
        let err = convert_csv_record(record("credit", "success", amount)).unwrap_err();
        assert!(matches!(err, WalletError::InvalidAmount { .. }));
    }

    #[test]
    fn test_convert_csv_record_requires_reference() {
        let mut missing = record("credit", "success", "10");
        missing.reference = "  ".to_string();
        assert!(convert_csv_record(missing).is_err());
    }

    #[rstest]
    #[case::rfc3339("2024-02-10T08:30:00Z", Utc.with_ymd_and_hms(2024, 2, 10, 8, 30, 0).unwrap())]
    #[case::with_offset("2024-02-10T09:30:00+01:00", Utc.with_ymd_and_hms(2024, 2, 10, 8, 30, 0).unwrap())]
    #[case::date_only("2024-02-10", Utc.with_ymd_and_hms(2024, 2, 10, 0, 0, 0).unwrap())]
    fn test_convert_csv_record_timestamps(#[case] raw: &str, #[case] expected: DateTime<Utc>) {
        let mut dated = record("credit", "success", "10");
        dated.created_at = Some(raw.to_string());

        let converted = convert_csv_record(dated).unwrap();
        assert_eq!(converted.request.created_at, Some(expected));
    }

    #[test]
    fn test_convert_csv_record_rejects_bad_timestamp() {
        let mut dated = record("credit", "success", "10");
        dated.created_at = Some("yesterday".to_string());
        assert!(convert_csv_record(dated)
            .unwrap_err()
            .to_string()
            .contains("Invalid timestamp"));
    }

    #[test]
    fn test_read_charge_rules() {
        let csv = "id,name,type,flat_amount,tier_rate_1,tier_rate_2,tier_rate_3,tier_boundary_1,tier_boundary_2,cap,status\n\
                   topup,Topup,percentage,,1.5,1,2,,,,active\n\
                   withdraw,Withdrawal,flat,50,,,,,,,\n\
                   broken,Broken,weird,,,,,,,,\n\
                   old,Legacy Topup,percentage,,3,3,3,10000,20000,500,inactive\n";

        let rules = read_charge_rules(csv.as_bytes()).unwrap();
        assert_eq!(rules.len(), 3);

        assert_eq!(
            rules[0],
            ChargeRule::percentage("topup", "Topup", (dec!(1.5), dec!(1), dec!(2)))
        );
        assert_eq!(rules[1], ChargeRule::flat("withdraw", "Withdrawal", dec!(50)));
        assert_eq!(rules[2].tier_boundary_1, dec!(10000));
        assert_eq!(rules[2].cap, dec!(500));
        assert!(!rules[2].is_active());
    }

    #[rstest]
    #[case::single_wallet(
        vec![Wallet { owner_id: OwnerId::from("a"), balance: dec!(100), currency: "NGN".to_string() }],
        "owner,balance,currency\na,100.00,NGN\n"
    )]
    #[case::sorted_by_owner(
        vec![
            Wallet { owner_id: OwnerId::from("b"), balance: dec!(1.5), currency: "NGN".to_string() },
            Wallet { owner_id: OwnerId::from("a"), balance: dec!(0), currency: "USD".to_string() },
        ],
        "owner,balance,currency\na,0.00,USD\nb,1.50,NGN\n"
    )]
    #[case::rounds_to_two_places(
        vec![Wallet { owner_id: OwnerId::from("a"), balance: dec!(1000.005), currency: String::new() }],
        "owner,balance,currency\na,1000.01,NGN\n"
    )]
    #[case::empty(vec![], "owner,balance,currency\n")]
    fn test_write_wallets_csv(#[case] wallets: Vec<Wallet>, #[case] expected_output: &str) {
        let mut output = Vec::new();
        write_wallets_csv(&wallets, &mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), expected_output);
    }
}
