//! Response normalization for external calls
//!
//! Each external call has exactly one parser here. A parser accepts the one
//! envelope its endpoint returns and yields a typed value, or
//! [`WalletError::MalformedResponse`] naming the endpoint. Nothing outside
//! this module looks at raw JSON.
//!
//! | Endpoint                     | Envelope                                   |
//! |------------------------------|--------------------------------------------|
//! | `initialize`                 | `{status, message, data: {authorization_url, access_code, reference}}` |
//! | `verify`                     | `{status, message, data: {status, reference}}` |
//! | `charges`                    | `{data: [rule, ..]}`                       |
//! | `balance`                    | `{data: {balance, currency}}`              |
//! | `transactions`               | `{data: {data: [transaction, ..]}}` (one page) |

use crate::types::charge_rule::{DEFAULT_CAP, DEFAULT_TIER_BOUNDARY_1, DEFAULT_TIER_BOUNDARY_2};
use crate::types::{
    Category, ChargeRule, ChargeType, GatewayAuthorization, GatewayStatus, OwnerId, Reference,
    RuleStatus, Transaction, TransactionStatus, WalletError,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::str::FromStr;
use uuid::Uuid;

pub const INITIALIZE_ENDPOINT: &str = "initialize";
pub const VERIFY_ENDPOINT: &str = "verify";
pub const CHARGES_ENDPOINT: &str = "charges";
pub const BALANCE_ENDPOINT: &str = "balance";
pub const TRANSACTIONS_ENDPOINT: &str = "transactions";

#[derive(Debug, Deserialize)]
struct ProviderEnvelope<T> {
    status: bool,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    access_code: Option<String>,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    reference: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChargeRuleData {
    id: String,
    name: String,
    #[serde(rename = "type")]
    charge_type: String,
    flat_amount: Option<Decimal>,
    tier_rate_1: Option<Decimal>,
    tier_rate_2: Option<Decimal>,
    tier_rate_3: Option<Decimal>,
    tier_boundary_1: Option<Decimal>,
    tier_boundary_2: Option<Decimal>,
    cap: Option<Decimal>,
    status: String,
}

#[derive(Debug, Deserialize)]
struct BalanceData {
    balance: Decimal,
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    id: Uuid,
    owner_id: String,
    category: String,
    amount: Decimal,
    status: String,
    balance_before: Decimal,
    balance_after: Decimal,
    reference: String,
    #[serde(default)]
    description: Option<String>,
    created_at: DateTime<Utc>,
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: &[u8]) -> Result<T, WalletError> {
    serde_json::from_slice(body).map_err(|e| WalletError::malformed_response(endpoint, e))
}

fn provider_data<T: DeserializeOwned>(endpoint: &str, body: &[u8]) -> Result<T, WalletError> {
    let envelope: ProviderEnvelope<T> = decode(endpoint, body)?;
    if !envelope.status {
        return Err(WalletError::malformed_response(
            endpoint,
            envelope
                .message
                .unwrap_or_else(|| "request rejected".to_string()),
        ));
    }
    envelope
        .data
        .ok_or_else(|| WalletError::malformed_response(endpoint, "missing data"))
}

/// Parse the provider's answer to a payment initialization
pub fn parse_initialize(body: &[u8]) -> Result<GatewayAuthorization, WalletError> {
    let data: InitializeData = provider_data(INITIALIZE_ENDPOINT, body)?;
    if data.authorization_url.trim().is_empty() {
        return Err(WalletError::malformed_response(
            INITIALIZE_ENDPOINT,
            "empty authorization_url",
        ));
    }

    Ok(GatewayAuthorization {
        authorization_url: data.authorization_url,
        access_code: data.access_code,
        reference: Reference::new(data.reference),
    })
}

/// Parse the provider's answer to a verification
///
/// Provider statuses collapse onto three outcomes: `success`; `failed`,
/// `abandoned` and `reversed` are failures; `pending`, `ongoing`,
/// `processing` and `queued` are still pending.
pub fn parse_verify(reference: &Reference, body: &[u8]) -> Result<GatewayStatus, WalletError> {
    let data: VerifyData = provider_data(VERIFY_ENDPOINT, body)?;

    if let Some(reported) = data.reference.as_deref() {
        if reported != reference.as_str() {
            return Err(WalletError::malformed_response(
                VERIFY_ENDPOINT,
                format!("expected reference '{}', got '{}'", reference, reported),
            ));
        }
    }

    match data.status.trim().to_lowercase().as_str() {
        "success" => Ok(GatewayStatus::Success),
        "failed" | "abandoned" | "reversed" => Ok(GatewayStatus::Failed),
        "pending" | "ongoing" | "processing" | "queued" => Ok(GatewayStatus::Pending),
        other => Err(WalletError::malformed_response(
            VERIFY_ENDPOINT,
            format!("unknown payment status '{}'", other),
        )),
    }
}

/// Parse the backend's list of charge rules
pub fn parse_charge_rules(body: &[u8]) -> Result<Vec<ChargeRule>, WalletError> {
    let envelope: DataEnvelope<Vec<ChargeRuleData>> = decode(CHARGES_ENDPOINT, body)?;

    envelope
        .data
        .into_iter()
        .map(|rule| -> Result<ChargeRule, WalletError> {
            let malformed = |e: String| WalletError::malformed_response(CHARGES_ENDPOINT, e);
            Ok(ChargeRule {
                charge_type: ChargeType::from_str(&rule.charge_type).map_err(malformed)?,
                status: RuleStatus::from_str(&rule.status).map_err(malformed)?,
                id: rule.id,
                name: rule.name,
                flat_amount: rule.flat_amount,
                tier_rate_1: rule.tier_rate_1.unwrap_or(Decimal::ZERO),
                tier_rate_2: rule.tier_rate_2.unwrap_or(Decimal::ZERO),
                tier_rate_3: rule.tier_rate_3.unwrap_or(Decimal::ZERO),
                tier_boundary_1: rule.tier_boundary_1.unwrap_or(DEFAULT_TIER_BOUNDARY_1),
                tier_boundary_2: rule.tier_boundary_2.unwrap_or(DEFAULT_TIER_BOUNDARY_2),
                cap: rule.cap.unwrap_or(DEFAULT_CAP),
            })
        })
        .collect()
}

/// Parse the backend's wallet balance
pub fn parse_wallet_balance(body: &[u8]) -> Result<Decimal, WalletError> {
    let envelope: DataEnvelope<BalanceData> = decode(BALANCE_ENDPOINT, body)?;
    Ok(envelope.data.balance)
}

/// Parse one page of the backend's transaction feed
pub fn parse_transactions(body: &[u8]) -> Result<Vec<Transaction>, WalletError> {
    let envelope: DataEnvelope<DataEnvelope<Vec<TransactionData>>> =
        decode(TRANSACTIONS_ENDPOINT, body)?;

    envelope
        .data
        .data
        .into_iter()
        .map(|entry| -> Result<Transaction, WalletError> {
            let malformed = |e: String| WalletError::malformed_response(TRANSACTIONS_ENDPOINT, e);
            Ok(Transaction {
                id: entry.id,
                owner_id: OwnerId::new(entry.owner_id),
                category: Category::from_str(&entry.category).map_err(malformed)?,
                amount: entry.amount,
                status: TransactionStatus::from_str(&entry.status).map_err(malformed)?,
                balance_before: entry.balance_before,
                balance_after: entry.balance_after,
                reference: Reference::new(entry.reference),
                description: entry.description.unwrap_or_default(),
                created_at: entry.created_at,
            })
        })
        .collect()
}
