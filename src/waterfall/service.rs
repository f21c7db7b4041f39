use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{NewTier, TierPatch, WaterfallTier};
use crate::database::repository::TierRepository;

use super::defaults::default_tier_set;
use super::error::{WaterfallError, SHARES_REQUIRED, TIER_NUMBER_REQUIRED};
use super::validator::{validate_tier, TierDraft};

/// One entry of a bulk reconciliation: with `id` it updates, without it inserts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierEdit {
    pub id: Option<Uuid>,
    pub tier_number: Option<i32>,
    pub tier_name: Option<String>,
    pub lp_share_percent: Option<Decimal>,
    pub gp_share_percent: Option<Decimal>,
    pub threshold_irr: Option<Decimal>,
    pub threshold_amount: Option<Decimal>,
    pub is_active: Option<bool>,
}

impl TierEdit {
    fn into_patch(self) -> TierPatch {
        TierPatch {
            tier_number: self.tier_number,
            tier_name: self.tier_name,
            lp_share_percent: self.lp_share_percent,
            gp_share_percent: self.gp_share_percent,
            threshold_irr: self.threshold_irr,
            threshold_amount: self.threshold_amount,
            is_active: self.is_active,
        }
    }

    fn into_new_tier(self, structure_id: Uuid, user_id: Uuid) -> Result<NewTier, WaterfallError> {
        let tier_number = self
            .tier_number
            .ok_or(WaterfallError::MissingField(TIER_NUMBER_REQUIRED))?;
        let (lp, gp) = match (self.lp_share_percent, self.gp_share_percent) {
            (Some(lp), Some(gp)) => (lp, gp),
            _ => return Err(WaterfallError::MissingField(SHARES_REQUIRED)),
        };

        Ok(NewTier {
            structure_id,
            tier_number,
            tier_name: self.tier_name,
            lp_share_percent: lp,
            gp_share_percent: gp,
            threshold_irr: self.threshold_irr,
            threshold_amount: self.threshold_amount,
            is_active: self.is_active.unwrap_or(true),
            user_id,
        })
    }
}

/// Waterfall tier operations over an injected repository
#[derive(Clone)]
pub struct WaterfallService {
    repo: Arc<dyn TierRepository>,
}

impl WaterfallService {
    pub fn new(repo: Arc<dyn TierRepository>) -> Self {
        Self { repo }
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        self.repo.health_check().await
    }

    pub async fn get_tier(&self, id: Uuid) -> Result<WaterfallTier, WaterfallError> {
        debug!("Fetching waterfall tier {}", id);
        self.repo
            .find_by_id(id)
            .await
            .map_err(WaterfallError::store("Error fetching waterfall tier"))?
            .ok_or(WaterfallError::TierNotFound(id))
    }

    pub async fn list_tiers(
        &self,
        structure_id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<WaterfallTier>, WaterfallError> {
        debug!("Listing waterfall tiers for structure {} (include_inactive={})", structure_id, include_inactive);
        self.repo
            .find_by_structure(structure_id, include_inactive)
            .await
            .map_err(WaterfallError::store("Error fetching waterfall tiers"))
    }

    /// Validate and insert a single tier
    pub async fn create_tier(
        &self,
        structure_id: Uuid,
        draft: TierDraft,
        user_id: Uuid,
    ) -> Result<WaterfallTier, WaterfallError> {
        let validation = validate_tier(&draft);
        if !validation.is_valid {
            return Err(WaterfallError::Validation(validation.errors));
        }

        // Validated above, so the tier number is an integer in 1..=4
        let tier_number = draft
            .tier_number
            .to_i32()
            .ok_or_else(|| WaterfallError::InvalidInput(format!("tier number {}", draft.tier_number)))?;

        let tier = self
            .repo
            .insert(NewTier {
                structure_id,
                tier_number,
                tier_name: draft.tier_name,
                lp_share_percent: draft.lp_share_percent,
                gp_share_percent: draft.gp_share_percent,
                threshold_irr: draft.threshold_irr,
                threshold_amount: draft.threshold_amount,
                is_active: draft.is_active.unwrap_or(true),
                user_id,
            })
            .await
            .map_err(WaterfallError::store("Error creating waterfall tier"))?;

        info!("Created waterfall tier {} (#{}) for structure {}", tier.id, tier.tier_number, structure_id);
        Ok(tier)
    }

    /// Apply a targeted edit after checking the merged tier still validates
    pub async fn update_tier(&self, id: Uuid, patch: TierPatch) -> Result<WaterfallTier, WaterfallError> {
        let mut merged = self.get_tier(id).await?;
        if patch.is_empty() {
            return Ok(merged);
        }

        patch.apply_to(&mut merged);
        let validation = validate_tier(&TierDraft::from(&merged));
        if !validation.is_valid {
            return Err(WaterfallError::Validation(validation.errors));
        }

        let tier = self.repo.update(id, patch).await.map_err(|e| match e {
            DatabaseError::NotFound(_) => WaterfallError::TierNotFound(id),
            other => WaterfallError::store("Error updating waterfall tier")(other),
        })?;

        info!("Updated waterfall tier {}", id);
        Ok(tier)
    }

    /// Seed the canonical four tiers for a structure with no active tiers.
    ///
    /// The existence check and the inserts are separate round trips; the
    /// partial unique index on active tiers rejects a concurrent duplicate.
    pub async fn create_default_tiers(
        &self,
        structure_id: Uuid,
        hurdle_rate_percent: Decimal,
        carry_percent: Decimal,
        user_id: Uuid,
    ) -> Result<Vec<WaterfallTier>, WaterfallError> {
        for (label, value) in [("hurdle rate", hurdle_rate_percent), ("carry", carry_percent)] {
            if value < Decimal::ZERO || value > dec!(100) {
                return Err(WaterfallError::InvalidInput(format!(
                    "{} must be between 0 and 100, got {}",
                    label, value
                )));
            }
        }

        let existing = self.list_tiers(structure_id, false).await?;
        if !existing.is_empty() {
            warn!(
                "Refusing to create default tiers: structure {} already has {} active tiers",
                structure_id,
                existing.len()
            );
            return Err(WaterfallError::TiersAlreadyExist(structure_id));
        }

        let mut created = Vec::with_capacity(4);
        for (index, tier) in default_tier_set(structure_id, hurdle_rate_percent, carry_percent, user_id)
            .into_iter()
            .enumerate()
        {
            match self.repo.insert(tier).await {
                Ok(row) => created.push(row),
                Err(e) => {
                    error!(
                        "Default tier creation for structure {} failed at tier {} ({} already inserted): {}",
                        structure_id,
                        index + 1,
                        created.len(),
                        e
                    );
                    return Err(WaterfallError::BatchAborted {
                        index,
                        applied: created,
                        source: Box::new(WaterfallError::store("Error creating waterfall tier")(e)),
                    });
                }
            }
        }

        info!(
            "Created default waterfall for structure {} (hurdle {}%, carry {}%)",
            structure_id, hurdle_rate_percent, carry_percent
        );
        Ok(created)
    }

    /// Apply edits in order. The first failure stops the batch; edits before
    /// it stay applied and are returned inside the error.
    pub async fn bulk_update_tiers(
        &self,
        structure_id: Uuid,
        edits: Vec<TierEdit>,
        user_id: Uuid,
    ) -> Result<Vec<WaterfallTier>, WaterfallError> {
        let mut applied = Vec::with_capacity(edits.len());

        for (index, edit) in edits.into_iter().enumerate() {
            match self.apply_edit(structure_id, edit, user_id).await {
                Ok(tier) => applied.push(tier),
                Err(e) => {
                    warn!(
                        "Bulk tier update for structure {} aborted at edit {} ({} applied): {}",
                        structure_id,
                        index,
                        applied.len(),
                        e
                    );
                    return Err(WaterfallError::BatchAborted {
                        index,
                        applied,
                        source: Box::new(e),
                    });
                }
            }
        }

        info!("Bulk updated {} waterfall tiers for structure {}", applied.len(), structure_id);
        Ok(applied)
    }

    async fn apply_edit(
        &self,
        structure_id: Uuid,
        edit: TierEdit,
        user_id: Uuid,
    ) -> Result<WaterfallTier, WaterfallError> {
        match edit.id {
            Some(id) => {
                // A tier of another structure is invisible here
                let found = self
                    .repo
                    .find_by_id(id)
                    .await
                    .map_err(WaterfallError::store("Error fetching waterfall tier"))?;
                if found.map_or(true, |tier| tier.structure_id != structure_id) {
                    return Err(WaterfallError::TierNotFound(id));
                }
                self.repo.update(id, edit.into_patch()).await.map_err(|e| match e {
                    DatabaseError::NotFound(_) => WaterfallError::TierNotFound(id),
                    other => WaterfallError::store("Error updating waterfall tier")(other),
                })
            }
            None => {
                let tier = edit.into_new_tier(structure_id, user_id)?;
                self.repo
                    .insert(tier)
                    .await
                    .map_err(WaterfallError::store("Error creating waterfall tier"))
            }
        }
    }

    /// Retire the structure's current tier set; rows are kept with `is_active = false`
    pub async fn deactivate_tiers(&self, structure_id: Uuid) -> Result<u64, WaterfallError> {
        let count = self
            .repo
            .deactivate_by_structure(structure_id)
            .await
            .map_err(WaterfallError::store("Error deactivating waterfall tiers"))?;
        info!("Deactivated {} waterfall tiers for structure {}", count, structure_id);
        Ok(count)
    }

    pub async fn delete_tier(&self, id: Uuid) -> Result<(), WaterfallError> {
        let deleted = self
            .repo
            .delete(id)
            .await
            .map_err(WaterfallError::store("Error deleting waterfall tier"))?;
        if !deleted {
            return Err(WaterfallError::TierNotFound(id));
        }
        warn!("Hard-deleted waterfall tier {}", id);
        Ok(())
    }
}
