use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::database::models::WaterfallTier;

pub const TIER_NUMBER_RANGE: &str = "Tier number must be between 1 and 4";
pub const SHARES_SUM: &str = "LP share and GP share must sum to 100%";
pub const LP_SHARE_RANGE: &str = "LP share must be between 0 and 100";
pub const GP_SHARE_RANGE: &str = "GP share must be between 0 and 100";
pub const THRESHOLD_IRR_RANGE: &str = "Threshold IRR must be between 0 and 100";
pub const THRESHOLD_AMOUNT_NEGATIVE: &str = "Threshold amount must be positive";

const MIN_TIER: Decimal = dec!(1);
const MAX_TIER: Decimal = dec!(4);
const FULL_SHARE: Decimal = dec!(100);

/// Tier-like input as it arrives from a client. `tier_number` is kept as a
/// decimal so fractional values can be reported instead of rejected by parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierDraft {
    pub tier_number: Decimal,
    pub tier_name: Option<String>,
    pub lp_share_percent: Decimal,
    pub gp_share_percent: Decimal,
    pub threshold_irr: Option<Decimal>,
    pub threshold_amount: Option<Decimal>,
    pub is_active: Option<bool>,
}

impl From<&WaterfallTier> for TierDraft {
    fn from(tier: &WaterfallTier) -> Self {
        Self {
            tier_number: Decimal::from(tier.tier_number),
            tier_name: tier.tier_name.clone(),
            lp_share_percent: tier.lp_share_percent,
            gp_share_percent: tier.gp_share_percent,
            threshold_irr: tier.threshold_irr,
            threshold_amount: tier.threshold_amount,
            is_active: Some(tier.is_active),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

fn percent_in_range(value: Decimal) -> bool {
    (Decimal::ZERO..=FULL_SHARE).contains(&value)
}

/// Check a single tier's numeric invariants. Every rule is evaluated; errors accumulate.
pub fn validate_tier(tier: &TierDraft) -> TierValidation {
    let mut errors = Vec::new();

    let n = tier.tier_number;
    if !n.fract().is_zero() || n < MIN_TIER || n > MAX_TIER {
        errors.push(TIER_NUMBER_RANGE.to_string());
    }

    // Overflowing shares cannot sum to 100
    if tier.lp_share_percent.checked_add(tier.gp_share_percent) != Some(FULL_SHARE) {
        errors.push(SHARES_SUM.to_string());
    }

    if !percent_in_range(tier.lp_share_percent) {
        errors.push(LP_SHARE_RANGE.to_string());
    }

    if !percent_in_range(tier.gp_share_percent) {
        errors.push(GP_SHARE_RANGE.to_string());
    }

    if let Some(irr) = tier.threshold_irr {
        if !percent_in_range(irr) {
            errors.push(THRESHOLD_IRR_RANGE.to_string());
        }
    }

    if let Some(amount) = tier.threshold_amount {
        if amount < Decimal::ZERO {
            errors.push(THRESHOLD_AMOUNT_NEGATIVE.to_string());
        }
    }

    TierValidation {
        is_valid: errors.is_empty(),
        errors,
    }
}
