use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{NewTier, TierPatch, WaterfallTier};

const TIER_COLUMNS: &str = "id, structure_id, tier_number, tier_name, lp_share_percent, gp_share_percent, \
     threshold_irr, threshold_amount, is_active, user_id, created_at, updated_at";

/// Storage seam for `waterfall_tiers`. Injected into the service so the
/// domain logic runs against Postgres or the in-memory store alike.
#[async_trait]
pub trait TierRepository: Send + Sync {
    async fn insert(&self, tier: NewTier) -> Result<WaterfallTier, DatabaseError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WaterfallTier>, DatabaseError>;

    /// Tiers of a structure ordered by tier number
    async fn find_by_structure(
        &self,
        structure_id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<WaterfallTier>, DatabaseError>;

    /// Update one row by id. `NotFound` when the id is unknown.
    async fn update(&self, id: Uuid, patch: TierPatch) -> Result<WaterfallTier, DatabaseError>;

    /// Flip every active tier of the structure to inactive; returns the row count
    async fn deactivate_by_structure(&self, structure_id: Uuid) -> Result<u64, DatabaseError>;

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

pub struct PgTierRepository {
    pool: PgPool,
}

impl PgTierRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TierRepository for PgTierRepository {
    async fn insert(&self, tier: NewTier) -> Result<WaterfallTier, DatabaseError> {
        let sql = format!(
            "INSERT INTO waterfall_tiers \
             (structure_id, tier_number, tier_name, lp_share_percent, gp_share_percent, \
              threshold_irr, threshold_amount, is_active, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {}",
            TIER_COLUMNS
        );

        let row = sqlx::query_as::<_, WaterfallTier>(&sql)
            .bind(tier.structure_id)
            .bind(tier.tier_number)
            .bind(tier.tier_name)
            .bind(tier.lp_share_percent)
            .bind(tier.gp_share_percent)
            .bind(tier.threshold_irr)
            .bind(tier.threshold_amount)
            .bind(tier.is_active)
            .bind(tier.user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WaterfallTier>, DatabaseError> {
        let sql = format!("SELECT {} FROM waterfall_tiers WHERE id = $1", TIER_COLUMNS);
        let row = sqlx::query_as::<_, WaterfallTier>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_structure(
        &self,
        structure_id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<WaterfallTier>, DatabaseError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM waterfall_tiers WHERE structure_id = ",
            TIER_COLUMNS
        ));
        qb.push_bind(structure_id);
        if !include_inactive {
            qb.push(" AND is_active = TRUE");
        }
        qb.push(" ORDER BY tier_number ASC, created_at ASC");

        let rows = qb
            .build_query_as::<WaterfallTier>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update(&self, id: Uuid, patch: TierPatch) -> Result<WaterfallTier, DatabaseError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE waterfall_tiers SET updated_at = now()");

        if let Some(n) = patch.tier_number {
            qb.push(", tier_number = ").push_bind(n);
        }
        if let Some(name) = patch.tier_name {
            qb.push(", tier_name = ").push_bind(name);
        }
        if let Some(lp) = patch.lp_share_percent {
            qb.push(", lp_share_percent = ").push_bind(lp);
        }
        if let Some(gp) = patch.gp_share_percent {
            qb.push(", gp_share_percent = ").push_bind(gp);
        }
        if let Some(irr) = patch.threshold_irr {
            qb.push(", threshold_irr = ").push_bind(irr);
        }
        if let Some(amount) = patch.threshold_amount {
            qb.push(", threshold_amount = ").push_bind(amount);
        }
        if let Some(active) = patch.is_active {
            qb.push(", is_active = ").push_bind(active);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {}", TIER_COLUMNS));

        qb.build_query_as::<WaterfallTier>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("waterfall tier {}", id)))
    }

    async fn deactivate_by_structure(&self, structure_id: Uuid) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "UPDATE waterfall_tiers SET is_active = FALSE, updated_at = now() \
             WHERE structure_id = $1 AND is_active = TRUE",
        )
        .bind(structure_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM waterfall_tiers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
