mod common;

use std::sync::Arc;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use common::{tiers_uri, TestApp, UnreachableStore};
use waterfall_api::auth::AccessLevel;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("ok"));
    Ok(())
}

#[tokio::test]
async fn degraded_health_does_not_leak_store_details() -> Result<()> {
    let app = TestApp::with_repo(Arc::new(UnreachableStore));
    let (status, body) = app.send(Method::GET, "/health", None, None).await?;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["data"]["status"], json!("degraded"));
    assert!(body["data"].get("database_error").is_none());
    let text = body.to_string();
    assert!(!text.contains("db.internal"), "{}", text);
    assert!(!text.contains("connection refused"), "{}", text);
    Ok(())
}

#[tokio::test]
async fn root_describes_service_without_auth() -> Result<()> {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/", None, None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert!(body["data"]["endpoints"].is_object());
    Ok(())
}

#[tokio::test]
async fn missing_token_is_unauthorized() -> Result<()> {
    let app = TestApp::new();
    let (status, body) = app
        .send(Method::GET, &tiers_uri(Uuid::new_v4()), None, None)
        .await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], json!("UNAUTHORIZED"));
    assert_eq!(body["success"], json!(false));
    Ok(())
}

#[tokio::test]
async fn garbage_token_is_unauthorized() -> Result<()> {
    let app = TestApp::new();
    let (status, _) = app.get(&tiers_uri(Uuid::new_v4()), "not-a-jwt").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn read_access_cannot_write() -> Result<()> {
    let app = TestApp::new();
    let token = app.token(AccessLevel::Read);
    let structure = Uuid::new_v4();

    let (status, _) = app.get(&tiers_uri(structure), &token).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post(&format!("{}/defaults", tiers_uri(structure)), &token, json!({}))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], json!("FORBIDDEN"));
    Ok(())
}

#[tokio::test]
async fn deny_access_cannot_read() -> Result<()> {
    let app = TestApp::new();
    let token = app.token(AccessLevel::Deny);
    let (status, _) = app.get(&tiers_uri(Uuid::new_v4()), &token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}
