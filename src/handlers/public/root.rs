use axum::extract::State;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::schema::{ResourceSummary, RESOURCES};

/// GET / - service information and resource index
pub async fn root() -> ApiResponse<Value> {
    let resources: Vec<ResourceSummary> = RESOURCES.iter().map(|def| ResourceSummary::from(*def)).collect();

    ApiResponse::success(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "token": "/api/token/ (public)",
            "token_refresh": "/api/token/refresh/ (public)",
            "me": "/api/core/users/me/ (protected)",
            "ledger_summary": "/api/financial/ledger/summary/ (protected)",
        },
        "resources": resources,
    }))
}

/// GET /health - store connectivity
pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    let now = chrono::Utc::now();
    match state.service.store().health_check().await {
        Ok(()) => Ok(ApiResponse::success(json!({ "status": "ok", "timestamp": now, "database": "ok" }))),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            Err(ApiError::service_unavailable("Database unavailable"))
        }
    }
}
