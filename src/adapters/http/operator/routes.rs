//! Axum router configuration for operator endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    health, reset_breaker, reset_metrics, status, sync_knowledge, toggle_fallback,
    toggle_remote, OperatorAppState,
};

/// Create the operator router.
///
/// # Routes
///
/// - `GET /health` - Liveness
/// - `GET /status` - Query-service status, metrics, connection count, router stats
/// - `POST /admin/remote/:action` - `enable` or `disable` the remote tier
/// - `POST /admin/fallback/:action` - `enable` or `disable` the local tier
/// - `POST /admin/breaker/reset` - Force the breaker Closed
/// - `POST /admin/metrics/reset` - Zero the query metrics
/// - `POST /admin/knowledge/sync` - Upload local documents to the remote service
pub fn operator_router() -> Router<OperatorAppState> {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/admin/remote/:action", post(toggle_remote))
        .route("/admin/fallback/:action", post(toggle_fallback))
        .route("/admin/breaker/reset", post(reset_breaker))
        .route("/admin/metrics/reset", post(reset_metrics))
        .route("/admin/knowledge/sync", post(sync_knowledge))
}
