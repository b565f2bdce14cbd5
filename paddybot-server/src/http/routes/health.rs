//! Welcome, liveness and readiness endpoints

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::http::server::AppState;
use crate::lifecycle::ResourceStatus;
use crate::serializers::{ComponentHealth, HealthCheck};

#[derive(Serialize)]
pub struct WelcomeResponse {
    pub message: String,
}

/// Liveness response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /
async fn root(State(state): State<Arc<AppState>>) -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: format!("Welcome to {} API", state.settings.app.name),
    })
}

/// GET /health - process is up, backends not consulted
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

/// GET /health/ready - probe database and cache
async fn ready(State(state): State<Arc<AppState>>) -> Json<HealthCheck> {
    let db_status = state.db.status().await;
    let db_reachable = db_status == ResourceStatus::Ready
        && match state.db.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Database readiness probe failed");
                false
            }
        };
    let database = ComponentHealth::probe(db_status, db_reachable);
    let cache = ComponentHealth::probe(state.cache.status().await, state.cache.ping().await);

    Json(HealthCheck::new(database, cache))
}

/// Health routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/health/ready", get(ready))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::build_router;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use paddybot_core::Settings;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let app = build_router(Arc::new(AppState::new(Settings::default())));
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_returns_healthy() {
        let Json(body) = health().await;
        assert_eq!(body.status, "healthy");
    }

    #[tokio::test]
    async fn root_welcomes_with_app_name() {
        let (status, body) = get_json("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Welcome to PaddyBot API");
    }

    #[tokio::test]
    async fn ready_reports_uninitialized_backends() {
        let (status, body) = get_json("/health/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["database"], "uninitialized");
        assert_eq!(body["cache"], "uninitialized");
        assert!(body["timestamp"].is_string());
    }
}
