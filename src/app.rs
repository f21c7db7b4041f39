use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, StoreBackend};
use crate::database::{DatabaseError, DatabaseManager, MemoryTierRepository, PgTierRepository, TierRepository};
use crate::handlers::{public, waterfall};
use crate::middleware::jwt_auth_middleware;
use crate::waterfall::WaterfallService;

/// Shared per-router state; cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub waterfall: WaterfallService,
}

impl AppState {
    pub fn new(config: AppConfig, repo: Arc<dyn TierRepository>) -> Self {
        Self {
            config: Arc::new(config),
            waterfall: WaterfallService::new(repo),
        }
    }

    /// Build state with the repository selected by `database.store`
    pub async fn from_config(config: AppConfig) -> Result<Self, DatabaseError> {
        let repo: Arc<dyn TierRepository> = match config.database.store {
            StoreBackend::Postgres => {
                let pool = DatabaseManager::connect(&config.database).await?;
                Arc::new(PgTierRepository::new(pool))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory tier store; data is lost on restart");
                Arc::new(MemoryTierRepository::new())
            }
        };
        Ok(Self::new(config, repo))
    }
}

pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Protected API
        .merge(waterfall_routes(state.clone()));

    if state.config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
                .layer(cors_layer(&state.config)),
        )
        .with_state(state)
}

fn waterfall_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/waterfall/validate", post(waterfall::validate))
        .route(
            "/api/waterfall-tiers/:id",
            get(waterfall::get)
                .patch(waterfall::patch)
                .delete(waterfall::delete),
        )
        .route(
            "/api/structures/:structure_id/waterfall-tiers",
            get(waterfall::list).post(waterfall::create),
        )
        .route(
            "/api/structures/:structure_id/waterfall-tiers/defaults",
            post(waterfall::create_defaults),
        )
        .route(
            "/api/structures/:structure_id/waterfall-tiers/bulk",
            put(waterfall::bulk_update).patch(waterfall::bulk_update),
        )
        .route(
            "/api/structures/:structure_id/waterfall-tiers/deactivate",
            post(waterfall::deactivate),
        )
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
