//! Charge rule types
//!
//! A charge rule is a named fee policy, either a flat amount or a
//! three-tier percentage schedule with a cap.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Upper bound (inclusive) of the first percentage tier
pub const DEFAULT_TIER_BOUNDARY_1: Decimal = Decimal::from_parts(50_000, 0, 0, false, 0);

/// Upper bound (inclusive) of the second percentage tier
pub const DEFAULT_TIER_BOUNDARY_2: Decimal = Decimal::from_parts(150_000, 0, 0, false, 0);

/// Largest fee a percentage rule may produce
pub const DEFAULT_CAP: Decimal = Decimal::from_parts(2_500, 0, 0, false, 0);

/// How a rule computes its fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeType {
    Flat,
    Percentage,
}

impl FromStr for ChargeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flat" => Ok(ChargeType::Flat),
            "percentage" | "percent" => Ok(ChargeType::Percentage),
            other => Err(format!("Invalid charge type: '{}'", other)),
        }
    }
}

/// Whether a rule may be selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    Active,
    Inactive,
}

impl FromStr for RuleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(RuleStatus::Active),
            "inactive" => Ok(RuleStatus::Inactive),
            other => Err(format!("Invalid rule status: '{}'", other)),
        }
    }
}

/// A named fee policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeRule {
    pub id: String,
    pub name: String,
    pub charge_type: ChargeType,

    /// Fee charged by a flat rule
    pub flat_amount: Option<Decimal>,

    /// Percentage rates for the three tiers (e.g. `1.5` means 1.5%)
    pub tier_rate_1: Decimal,
    pub tier_rate_2: Decimal,
    pub tier_rate_3: Decimal,

    pub tier_boundary_1: Decimal,
    pub tier_boundary_2: Decimal,
    pub cap: Decimal,
    pub status: RuleStatus,
}

impl ChargeRule {
    /// Create an active percentage rule with the default boundaries and cap
    pub fn percentage(
        id: impl Into<String>,
        name: impl Into<String>,
        rates: (Decimal, Decimal, Decimal),
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            charge_type: ChargeType::Percentage,
            flat_amount: None,
            tier_rate_1: rates.0,
            tier_rate_2: rates.1,
            tier_rate_3: rates.2,
            tier_boundary_1: DEFAULT_TIER_BOUNDARY_1,
            tier_boundary_2: DEFAULT_TIER_BOUNDARY_2,
            cap: DEFAULT_CAP,
            status: RuleStatus::Active,
        }
    }

    /// Create an active flat rule
    pub fn flat(id: impl Into<String>, name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            charge_type: ChargeType::Flat,
            flat_amount: Some(amount),
            tier_rate_1: Decimal::ZERO,
            tier_rate_2: Decimal::ZERO,
            tier_rate_3: Decimal::ZERO,
            tier_boundary_1: DEFAULT_TIER_BOUNDARY_1,
            tier_boundary_2: DEFAULT_TIER_BOUNDARY_2,
            cap: DEFAULT_CAP,
            status: RuleStatus::Active,
        }
    }

    pub fn with_cap(mut self, cap: Decimal) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_boundaries(mut self, boundary_1: Decimal, boundary_2: Decimal) -> Self {
        self.tier_boundary_1 = boundary_1;
        self.tier_boundary_2 = boundary_2;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.status = RuleStatus::Inactive;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == RuleStatus::Active
    }
}
