// handlers/waterfall.rs - /api/structures/:structure_id/waterfall-tiers and /api/waterfall-tiers/:id
//
// Thin HTTP layer: authorize, decode, call WaterfallService, wrap in the success envelope.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::AccessLevel;
use crate::database::models::{TierPatch, WaterfallTier};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::waterfall::{validate_tier, TierDraft, TierEdit, TierValidation};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultTiersRequest {
    pub hurdle_rate_percent: Option<Decimal>,
    pub carry_percent: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub tiers: Vec<TierEdit>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeactivateResponse {
    pub structure_id: Uuid,
    pub deactivated: u64,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub id: Uuid,
    pub deleted: bool,
}

/// POST /api/waterfall/validate
pub async fn validate(
    user: AuthUser,
    payload: Result<Json<TierDraft>, JsonRejection>,
) -> ApiResult<TierValidation> {
    user.require(AccessLevel::Read)?;
    let Json(draft) = payload?;
    Ok(ApiResponse::success(validate_tier(&draft)))
}

/// GET /api/structures/:structure_id/waterfall-tiers
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Path(structure_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<WaterfallTier>> {
    user.require(AccessLevel::Read)?;
    let tiers = state
        .waterfall
        .list_tiers(structure_id, query.include_inactive)
        .await?;
    Ok(ApiResponse::success(tiers))
}

/// POST /api/structures/:structure_id/waterfall-tiers
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Path(structure_id): Path<Uuid>,
    payload: Result<Json<TierDraft>, JsonRejection>,
) -> ApiResult<WaterfallTier> {
    user.require(AccessLevel::Edit)?;
    let Json(draft) = payload?;
    let tier = state
        .waterfall
        .create_tier(structure_id, draft, user.user_id)
        .await?;
    Ok(ApiResponse::created(tier))
}

/// POST /api/structures/:structure_id/waterfall-tiers/defaults
pub async fn create_defaults(
    State(state): State<AppState>,
    user: AuthUser,
    Path(structure_id): Path<Uuid>,
    body: Bytes,
) -> ApiResult<Vec<WaterfallTier>> {
    user.require(AccessLevel::Edit)?;
    let request = parse_default_terms(&body)?;
    let defaults = &state.config.waterfall;

    let tiers = state
        .waterfall
        .create_default_tiers(
            structure_id,
            request.hurdle_rate_percent.unwrap_or(defaults.default_hurdle_rate),
            request.carry_percent.unwrap_or(defaults.default_carry),
            user.user_id,
        )
        .await?;
    Ok(ApiResponse::created(tiers))
}

/// An empty body means "use the configured terms"; anything else must parse
fn parse_default_terms(body: &[u8]) -> Result<DefaultTiersRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(DefaultTiersRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::InvalidJson(format!("Failed to parse the request body as JSON: {}", e)))
}

/// PUT /api/structures/:structure_id/waterfall-tiers/bulk
pub async fn bulk_update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(structure_id): Path<Uuid>,
    payload: Result<Json<BulkRequest>, JsonRejection>,
) -> ApiResult<Vec<WaterfallTier>> {
    user.require(AccessLevel::Edit)?;
    let Json(request) = payload?;
    if request.tiers.is_empty() {
        return Err(ApiError::bad_request("tiers must contain at least one edit"));
    }

    let tiers = state
        .waterfall
        .bulk_update_tiers(structure_id, request.tiers, user.user_id)
        .await?;
    Ok(ApiResponse::success(tiers))
}

/// POST /api/structures/:structure_id/waterfall-tiers/deactivate
pub async fn deactivate(
    State(state): State<AppState>,
    user: AuthUser,
    Path(structure_id): Path<Uuid>,
) -> ApiResult<DeactivateResponse> {
    user.require(AccessLevel::Edit)?;
    let deactivated = state.waterfall.deactivate_tiers(structure_id).await?;
    Ok(ApiResponse::success(DeactivateResponse {
        structure_id,
        deactivated,
    }))
}

/// GET /api/waterfall-tiers/:id
pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<WaterfallTier> {
    user.require(AccessLevel::Read)?;
    Ok(ApiResponse::success(state.waterfall.get_tier(id).await?))
}

/// PATCH /api/waterfall-tiers/:id
pub async fn patch(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<TierPatch>, JsonRejection>,
) -> ApiResult<WaterfallTier> {
    user.require(AccessLevel::Edit)?;
    let Json(patch) = payload?;
    Ok(ApiResponse::success(state.waterfall.update_tier(id, patch).await?))
}

/// DELETE /api/waterfall-tiers/:id - hard delete, root only
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<DeleteResponse> {
    user.require(AccessLevel::Root)?;
    state.waterfall.delete_tier(id).await?;
    Ok(ApiResponse::success(DeleteResponse { id, deleted: true }))
}
