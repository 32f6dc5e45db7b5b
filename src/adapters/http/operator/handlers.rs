//! HTTP handlers for operator endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::adapters::websocket::HubHandle;
use crate::application::query::KnowledgeControls;
use crate::application::routing::MessageRouter;
use crate::ports::{KnowledgeError, QueryService};

use super::dto::{
    ActionResponse, ErrorResponse, HealthResponse, StatusResponse, ToggleAction, ToggleResponse,
};

/// Application state for operator endpoints.
#[derive(Clone)]
pub struct OperatorAppState {
    pub query_service: Arc<dyn QueryService>,
    pub controls: KnowledgeControls,
    pub hub: HubHandle,
    pub router: MessageRouter,
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// GET /status
pub async fn status(State(state): State<OperatorAppState>) -> impl IntoResponse {
    let (query_service, connections, router) = tokio::join!(
        state.query_service.status(),
        state.hub.connection_count(),
        state.router.stats(),
    );
    Json(StatusResponse {
        query_service,
        connections,
        router,
    })
}

/// POST /admin/remote/{enable|disable}
pub async fn toggle_remote(
    State(state): State<OperatorAppState>,
    Path(action): Path<ToggleAction>,
) -> impl IntoResponse {
    state.controls.set_remote_enabled(action.enabled());
    Json(ToggleResponse {
        tier: "remote",
        enabled: action.enabled(),
    })
}

/// POST /admin/fallback/{enable|disable}
pub async fn toggle_fallback(
    State(state): State<OperatorAppState>,
    Path(action): Path<ToggleAction>,
) -> impl IntoResponse {
    state.controls.set_fallback_enabled(action.enabled());
    Json(ToggleResponse {
        tier: "fallback",
        enabled: action.enabled(),
    })
}

/// POST /admin/breaker/reset
pub async fn reset_breaker(State(state): State<OperatorAppState>) -> impl IntoResponse {
    state.controls.reset_breaker();
    Json(ActionResponse {
        ok: true,
        action: "breaker_reset",
    })
}

/// POST /admin/metrics/reset
pub async fn reset_metrics(State(state): State<OperatorAppState>) -> impl IntoResponse {
    state.controls.reset_metrics();
    Json(ActionResponse {
        ok: true,
        action: "metrics_reset",
    })
}

/// POST /admin/knowledge/sync
pub async fn sync_knowledge(State(state): State<OperatorAppState>) -> axum::response::Response {
    match state.controls.sync_knowledge().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Knowledge sync rejected");
            let status = match e {
                KnowledgeError::Unavailable(_) | KnowledgeError::Timeout { .. } => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                _ => StatusCode::BAD_GATEWAY,
            };
            (status, Json(ErrorResponse::new("SYNC_FAILED", e.to_string()))).into_response()
        }
    }
}
