use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{NewTier, TierPatch, WaterfallTier};
use crate::database::repository::TierRepository;

/// Process-local tier store for development (`WATERFALL_STORE=memory`) and tests
#[derive(Default)]
pub struct MemoryTierRepository {
    rows: RwLock<HashMap<Uuid, WaterfallTier>>,
}

impl MemoryTierRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

/// The CHECK constraints and the active-tier unique index from
/// `migrations/0001_waterfall_tiers.sql`, applied to a candidate row.
fn check_constraints(rows: &HashMap<Uuid, WaterfallTier>, row: &WaterfallTier) -> Result<(), DatabaseError> {
    let percent = |v: Decimal| (Decimal::ZERO..=dec!(100)).contains(&v);
    let violation = |name: &str| -> Result<(), DatabaseError> {
        Err(DatabaseError::CheckViolation(format!("check constraint \"{}\"", name)))
    };

    if !(1..=4).contains(&row.tier_number) {
        return violation("waterfall_tiers_tier_number_check");
    }
    if !percent(row.lp_share_percent) {
        return violation("waterfall_tiers_lp_share_percent_check");
    }
    if !percent(row.gp_share_percent) {
        return violation("waterfall_tiers_gp_share_percent_check");
    }
    if row.threshold_irr.is_some_and(|irr| !percent(irr)) {
        return violation("waterfall_tiers_threshold_irr_check");
    }
    if row.threshold_amount.is_some_and(|amount| amount < Decimal::ZERO) {
        return violation("waterfall_tiers_threshold_amount_check");
    }
    if row.lp_share_percent.checked_add(row.gp_share_percent) != Some(dec!(100)) {
        return violation("waterfall_tiers_share_sum");
    }

    if row.is_active
        && rows.values().any(|other| {
            other.id != row.id
                && other.is_active
                && other.structure_id == row.structure_id
                && other.tier_number == row.tier_number
        })
    {
        return Err(DatabaseError::UniqueViolation(format!(
            "index \"waterfall_tiers_active_unique\": tier {} of structure {} is already active",
            row.tier_number, row.structure_id
        )));
    }
    Ok(())
}

#[async_trait]
impl TierRepository for MemoryTierRepository {
    async fn insert(&self, tier: NewTier) -> Result<WaterfallTier, DatabaseError> {
        let now = Utc::now();
        let row = WaterfallTier {
            id: Uuid::new_v4(),
            structure_id: tier.structure_id,
            tier_number: tier.tier_number,
            tier_name: tier.tier_name,
            lp_share_percent: tier.lp_share_percent,
            gp_share_percent: tier.gp_share_percent,
            threshold_irr: tier.threshold_irr,
            threshold_amount: tier.threshold_amount,
            is_active: tier.is_active,
            user_id: tier.user_id,
            created_at: now,
            updated_at: now,
        };
        let mut rows = self.rows.write().await;
        check_constraints(&rows, &row)?;
        rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WaterfallTier>, DatabaseError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn find_by_structure(
        &self,
        structure_id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<WaterfallTier>, DatabaseError> {
        let rows = self.rows.read().await;
        let mut tiers: Vec<WaterfallTier> = rows
            .values()
            .filter(|t| t.structure_id == structure_id && (include_inactive || t.is_active))
            .cloned()
            .collect();
        tiers.sort_by(|a, b| {
            a.tier_number
                .cmp(&b.tier_number)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(tiers)
    }

    async fn update(&self, id: Uuid, patch: TierPatch) -> Result<WaterfallTier, DatabaseError> {
        let mut rows = self.rows.write().await;
        let mut row = rows
            .get(&id)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound(format!("waterfall tier {}", id)))?;
        patch.apply_to(&mut row);
        row.updated_at = Utc::now();

        check_constraints(&rows, &row)?;
        rows.insert(id, row.clone());
        Ok(row)
    }

    async fn deactivate_by_structure(&self, structure_id: Uuid) -> Result<u64, DatabaseError> {
        let mut rows = self.rows.write().await;
        let now = Utc::now();
        let mut count = 0;
        for row in rows
            .values_mut()
            .filter(|t| t.structure_id == structure_id && t.is_active)
        {
            row.is_active = false;
            row.updated_at = now;
            count += 1;
        }
        Ok(count)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_tier(structure_id: Uuid, tier_number: i32) -> NewTier {
        NewTier {
            structure_id,
            tier_number,
            tier_name: None,
            lp_share_percent: dec!(100),
            gp_share_percent: dec!(0),
            threshold_irr: None,
            threshold_amount: None,
            is_active: true,
            user_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn lists_by_structure_in_tier_order() {
        let repo = MemoryTierRepository::new();
        let sid = Uuid::new_v4();
        repo.insert(new_tier(sid, 3)).await.unwrap();
        repo.insert(new_tier(sid, 1)).await.unwrap();
        repo.insert(new_tier(Uuid::new_v4(), 2)).await.unwrap();

        let tiers = repo.find_by_structure(sid, false).await.unwrap();
        let numbers: Vec<i32> = tiers.iter().map(|t| t.tier_number).collect();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[tokio::test]
    async fn deactivate_hides_rows_unless_inactive_requested() {
        let repo = MemoryTierRepository::new();
        let sid = Uuid::new_v4();
        repo.insert(new_tier(sid, 1)).await.unwrap();
        repo.insert(new_tier(sid, 2)).await.unwrap();

        assert_eq!(repo.deactivate_by_structure(sid).await.unwrap(), 2);
        assert_eq!(repo.deactivate_by_structure(sid).await.unwrap(), 0);
        assert!(repo.find_by_structure(sid, false).await.unwrap().is_empty());
        assert_eq!(repo.find_by_structure(sid, true).await.unwrap().len(), 2);
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let repo = MemoryTierRepository::new();
        let err = repo.update(Uuid::new_v4(), TierPatch::default()).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }

    #[tokio::test]
    async fn rejects_rows_the_schema_rejects() {
        let repo = MemoryTierRepository::new();
        let sid = Uuid::new_v4();

        let mut out_of_range = new_tier(sid, 9);
        out_of_range.lp_share_percent = dec!(300);
        out_of_range.gp_share_percent = dec!(5);
        assert!(matches!(
            repo.insert(out_of_range).await,
            Err(DatabaseError::CheckViolation(_))
        ));

        let mut bad_sum = new_tier(sid, 2);
        bad_sum.gp_share_percent = dec!(10);
        assert!(matches!(repo.insert(bad_sum).await, Err(DatabaseError::CheckViolation(_))));

        let mut negative = new_tier(sid, 1);
        negative.threshold_amount = Some(dec!(-1));
        assert!(matches!(repo.insert(negative).await, Err(DatabaseError::CheckViolation(_))));

        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn one_active_row_per_tier_number() {
        let repo = MemoryTierRepository::new();
        let sid = Uuid::new_v4();
        repo.insert(new_tier(sid, 1)).await.unwrap();

        assert!(matches!(
            repo.insert(new_tier(sid, 1)).await,
            Err(DatabaseError::UniqueViolation(_))
        ));

        // Inactive duplicates and other structures are fine
        let mut retired = new_tier(sid, 1);
        retired.is_active = false;
        let retired = repo.insert(retired).await.unwrap();
        repo.insert(new_tier(Uuid::new_v4(), 1)).await.unwrap();

        // Reactivating the duplicate collides
        let reactivate = TierPatch {
            is_active: Some(true),
            ..Default::default()
        };
        assert!(matches!(
            repo.update(retired.id, reactivate).await,
            Err(DatabaseError::UniqueViolation(_))
        ));
        assert_eq!(repo.len().await, 3);
    }

    #[tokio::test]
    async fn rejected_update_leaves_row_unchanged() {
        let repo = MemoryTierRepository::new();
        let tier = repo.insert(new_tier(Uuid::new_v4(), 1)).await.unwrap();

        let patch = TierPatch {
            gp_share_percent: Some(dec!(20)),
            ..Default::default()
        };
        assert!(matches!(
            repo.update(tier.id, patch).await,
            Err(DatabaseError::CheckViolation(_))
        ));
        let stored = repo.find_by_id(tier.id).await.unwrap().unwrap();
        assert_eq!(stored.gp_share_percent, dec!(0));
        assert_eq!(stored.updated_at, tier.updated_at);
    }
}
