use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One row of `waterfall_tiers`. Columns are snake_case, the API shape is camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WaterfallTier {
    pub id: Uuid,
    pub structure_id: Uuid,
    pub tier_number: i32,
    pub tier_name: Option<String>,
    pub lp_share_percent: Decimal,
    pub gp_share_percent: Decimal,
    pub threshold_irr: Option<Decimal>,
    pub threshold_amount: Option<Decimal>,
    pub is_active: bool,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload; `id` and timestamps are assigned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTier {
    pub structure_id: Uuid,
    pub tier_number: i32,
    pub tier_name: Option<String>,
    pub lp_share_percent: Decimal,
    pub gp_share_percent: Decimal,
    pub threshold_irr: Option<Decimal>,
    pub threshold_amount: Option<Decimal>,
    pub is_active: bool,
    pub user_id: Uuid,
}

/// Targeted field edit. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierPatch {
    pub tier_number: Option<i32>,
    pub tier_name: Option<String>,
    pub lp_share_percent: Option<Decimal>,
    pub gp_share_percent: Option<Decimal>,
    pub threshold_irr: Option<Decimal>,
    pub threshold_amount: Option<Decimal>,
    pub is_active: Option<bool>,
}

impl TierPatch {
    pub fn is_empty(&self) -> bool {
        self == &TierPatch::default()
    }

    /// Overlay the supplied fields onto an existing tier
    pub fn apply_to(&self, tier: &mut WaterfallTier) {
        if let Some(n) = self.tier_number {
            tier.tier_number = n;
        }
        if let Some(name) = &self.tier_name {
            tier.tier_name = Some(name.clone());
        }
        if let Some(lp) = self.lp_share_percent {
            tier.lp_share_percent = lp;
        }
        if let Some(gp) = self.gp_share_percent {
            tier.gp_share_percent = gp;
        }
        if let Some(irr) = self.threshold_irr {
            tier.threshold_irr = Some(irr);
        }
        if let Some(amount) = self.threshold_amount {
            tier.threshold_amount = Some(amount);
        }
        if let Some(active) = self.is_active {
            tier.is_active = active;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn tier() -> WaterfallTier {
        let now = Utc::now();
        WaterfallTier {
            id: Uuid::new_v4(),
            structure_id: Uuid::new_v4(),
            tier_number: 2,
            tier_name: Some("Preferred Return".to_string()),
            lp_share_percent: dec!(100),
            gp_share_percent: dec!(0),
            threshold_irr: Some(dec!(8)),
            threshold_amount: None,
            is_active: true,
            user_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let value = serde_json::to_value(tier()).unwrap();
        assert_eq!(value["tierNumber"], json!(2));
        assert_eq!(value["lpSharePercent"], json!(100.0));
        assert_eq!(value["thresholdIrr"], json!(8.0));
        assert!(value.get("structureId").is_some());
        assert!(value.get("lp_share_percent").is_none());
    }

    #[test]
    fn patch_only_touches_supplied_fields() {
        let mut t = tier();
        let before = t.clone();
        let patch = TierPatch {
            lp_share_percent: Some(dec!(80)),
            gp_share_percent: Some(dec!(20)),
            ..Default::default()
        };
        patch.apply_to(&mut t);
        assert_eq!(t.lp_share_percent, dec!(80));
        assert_eq!(t.gp_share_percent, dec!(20));
        assert_eq!(t.tier_name, before.tier_name);
        assert_eq!(t.threshold_irr, before.threshold_irr);
        assert!(!patch.is_empty());
        assert!(TierPatch::default().is_empty());
    }
}
