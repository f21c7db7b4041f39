use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET / - service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Waterfall Tier API",
            "version": version,
            "description": "LP/GP distribution waterfall tiers for investment structures",
            "endpoints": {
                "health": "/health (public)",
                "validate": "POST /api/waterfall/validate (read)",
                "structure_tiers": "/api/structures/:structure_id/waterfall-tiers[/defaults|/bulk|/deactivate] (read/edit)",
                "tier": "/api/waterfall-tiers/:id (read/edit, delete requires root)",
            }
        }
    }))
}

/// GET /health - store connectivity
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.waterfall.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            // Unauthenticated route; the cause goes to the log only
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": "degraded"
                    }
                })),
            )
        }
    }
}
