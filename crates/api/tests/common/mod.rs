//! Shared helpers for `ctrack-api` integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use ctrack_api::auth::jwt::{JwtConfig, TokenSubject};
use ctrack_api::config::{LogFormat, ServerConfig};
use ctrack_api::router::build_app_router;
use ctrack_api::state::AppState;
use ctrack_api::ws::ConnectionRegistry;
use ctrack_core::capability::{Capability, CapabilitySet};
use ctrack_core::roles::Role;
use ctrack_core::types::DbId;
use ctrack_events::EventBus;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        database_max_connections: 5,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hs256".to_string(),
            access_token_expiry_mins: 60,
        },
        strict_approval: false,
        log_format: LogFormat::Text,
        bootstrap_admin: None,
    }
}

/// Application state over `pool` with a fresh bus and connection registry.
pub fn test_state(pool: PgPool) -> AppState {
    AppState {
        pool,
        config: Arc::new(test_config()),
        connections: Arc::new(ConnectionRegistry::new()),
        event_bus: Arc::new(EventBus::default()),
    }
}

/// State over a pool that never connects. Only usable for requests that are
/// rejected before any query runs.
pub fn offline_state() -> AppState {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy("postgres://localhost/unused")
        .expect("lazy pool");
    test_state(pool)
}

/// The production router and middleware stack over `state`.
pub fn build_test_app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);
    build_app_router(state, &config)
}

/// Capability set holding exactly `caps`.
pub fn caps(caps: &[Capability]) -> CapabilitySet {
    caps.iter().copied().collect()
}

/// Mint a bearer token the way login does.
pub fn token(user_id: DbId, role: Role, permissions: CapabilitySet) -> String {
    let username = format!("user{user_id}");
    test_config()
        .jwt
        .issue(&TokenSubject {
            user_id,
            username: &username,
            role,
            permissions,
        })
        .expect("token")
        .token
}

/// Send one request through the app and return status plus parsed JSON
/// (`Value::Null` for an empty body).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
