//! Charge rule store and fee quoting
//!
//! The `ChargeRuleStore` holds the named fee rules fetched from the backend
//! and answers fee quotes for a charge category. It never mutates the rules
//! it was given.
//!
//! # Rule Selection
//!
//! Only active rules are eligible. A rule whose name equals the category
//! (ignoring case) wins; otherwise the first active rule whose name contains
//! the category's words as whole words is used, so "Wallet Topup" serves the
//! "topup" category but not "top". A blank category matches nothing.
//!
//! # Missing Rules
//!
//! A quote for a category without an eligible rule is a zero fee, not an
//! error. [`ChargeRuleStore::require_rule`] exposes the hard error for callers
//! that want it.

use crate::core::fee::compute_fee;
use crate::core::traits::ChargeRuleSource;
use crate::types::{ChargeRule, WalletError};
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use tracing::debug;

/// Well-known category for wallet top-ups
pub const TOPUP_CATEGORY: &str = "topup";

/// Fee quote for an amount in one charge category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeQuote {
    pub category: String,
    pub amount: Decimal,
    pub fee: Decimal,

    /// `amount + fee`
    pub total: Decimal,

    /// Rule the fee came from, `None` when no active rule matched
    pub rule_id: Option<String>,
}

impl FeeQuote {
    /// Whether the quote fell back to a zero fee for lack of a rule
    pub fn rule_not_found(&self) -> bool {
        self.rule_id.is_none()
    }
}

/// Read-only collection of charge rules
#[derive(Debug, Clone, Default)]
pub struct ChargeRuleStore {
    rules: Vec<ChargeRule>,
}

impl ChargeRuleStore {
    /// Create a store over the given rules
    pub fn new(rules: Vec<ChargeRule>) -> Self {
        Self { rules }
    }

    /// Fetch the rules for a category from an external source
    pub async fn load(
        source: &dyn ChargeRuleSource,
        category: &str,
    ) -> Result<Self, WalletError> {
        let rules = source.active_charge_rules(category).await?;
        debug!(category, count = rules.len(), "loaded charge rules");
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[ChargeRule] {
        &self.rules
    }

    /// Find the active rule serving a category
    pub fn find_active(&self, category: &str) -> Option<&ChargeRule> {
        let wanted = words(category);
        if wanted.is_empty() {
            return None;
        }
        let mut active = self.rules.iter().filter(|rule| rule.is_active());

        let exact = active.clone().find(|rule| words(&rule.name) == wanted);

        exact.or_else(|| {
            active.find(|rule| {
                words(&rule.name)
                    .windows(wanted.len())
                    .any(|window| window == wanted.as_slice())
            })
        })
    }

    /// Find the active rule serving a category, failing if there is none
    pub fn require_rule(&self, category: &str) -> Result<&ChargeRule, WalletError> {
        self.find_active(category)
            .ok_or_else(|| WalletError::rule_not_found(category))
    }

    /// Quote the fee for `amount` in `category`
    ///
    /// Falls back to a zero fee when no active rule matches.
    ///
    /// # Errors
    ///
    /// [`WalletError::InvalidAmount`] when the amount is too large to price.
    pub fn quote(&self, category: &str, amount: Decimal) -> Result<FeeQuote, WalletError> {
        let rule = self.find_active(category);
        let fee = match rule {
            Some(rule) => compute_fee(amount, rule)?,
            None => {
                debug!(category, "no active charge rule, quoting zero fee");
                Decimal::ZERO
            }
        };
        let total = amount
            .checked_add(fee)
            .ok_or_else(|| WalletError::invalid_amount(amount))?;

        Ok(FeeQuote {
            category: category.to_string(),
            amount,
            fee,
            total,
            rule_id: rule.map(|rule| rule.id.clone()),
        })
    }

    /// Quote from raw user input
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::InvalidAmount`] when the input is not a number,
    /// is not positive or is too large to price.
    pub fn quote_str(&self, category: &str, amount: &str) -> Result<FeeQuote, WalletError> {
        let amount = parse_amount(amount)?;
        self.quote(category, amount)
    }
}

/// Lowercased alphanumeric words of a rule name or category
fn words(name: &str) -> Vec<String> {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Parse a strictly positive money amount
pub fn parse_amount(input: &str) -> Result<Decimal, WalletError> {
    let amount =
        Decimal::from_str(input.trim()).map_err(|_| WalletError::invalid_amount(input))?;
    if amount <= Decimal::ZERO {
        return Err(WalletError::invalid_amount(input));
    }
    Ok(amount)
}
