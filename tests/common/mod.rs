#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use waterfall_api::app::{app, AppState};
use waterfall_api::auth::{generate_jwt, AccessLevel, Claims};
use waterfall_api::config::AppConfig;
use waterfall_api::database::{DatabaseError, MemoryTierRepository, TierRepository};
use waterfall_api::database::models::{NewTier, TierPatch, WaterfallTier};

/// In-process server over the memory store
pub struct TestApp {
    router: Router,
    config: AppConfig,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_repo(Arc::new(MemoryTierRepository::new()))
    }

    pub fn with_repo(repo: Arc<dyn TierRepository>) -> Self {
        let mut config = AppConfig::development();
        config.api.enable_request_logging = false;
        let state = AppState::new(config.clone(), repo);
        Self {
            router: app(state),
            config,
        }
    }

    pub fn token(&self, access: AccessLevel) -> String {
        let claims = Claims::new(Uuid::new_v4(), Some("test@example.com".to_string()), access, 1);
        generate_jwt(&claims, &self.config.security.jwt_secret).expect("failed to sign test token")
    }

    /// Send a request and return status plus parsed JSON body
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        match body {
            Some(json) => {
                let raw = serde_json::to_string(&json)?;
                self.send_raw(method, uri, token, Some("application/json"), &raw).await
            }
            None => self.send_raw(method, uri, token, None, "").await,
        }
    }

    /// Send an arbitrary body, optionally without a content type
    pub async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        content_type: Option<&str>,
        body: &str,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let request = builder.body(Body::from(body.to_string()))?;

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, json))
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }
}

pub fn tiers_uri(structure_id: Uuid) -> String {
    format!("/api/structures/{}/waterfall-tiers", structure_id)
}

/// Store that answers every call with a connection failure
pub struct UnreachableStore;

impl UnreachableStore {
    fn down() -> DatabaseError {
        DatabaseError::ConnectionError("connection refused (host=db.internal port=5432 user=waterfall)".to_string())
    }
}

#[async_trait]
impl TierRepository for UnreachableStore {
    async fn insert(&self, _tier: NewTier) -> Result<WaterfallTier, DatabaseError> {
        Err(Self::down())
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<Option<WaterfallTier>, DatabaseError> {
        Err(Self::down())
    }

    async fn find_by_structure(
        &self,
        _structure_id: Uuid,
        _include_inactive: bool,
    ) -> Result<Vec<WaterfallTier>, DatabaseError> {
        Err(Self::down())
    }

    async fn update(&self, _id: Uuid, _patch: TierPatch) -> Result<WaterfallTier, DatabaseError> {
        Err(Self::down())
    }

    async fn deactivate_by_structure(&self, _structure_id: Uuid) -> Result<u64, DatabaseError> {
        Err(Self::down())
    }

    async fn delete(&self, _id: Uuid) -> Result<bool, DatabaseError> {
        Err(Self::down())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Err(Self::down())
    }
}
