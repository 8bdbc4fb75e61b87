use axum::extract::{Query, State};
use axum::Extension;
use std::collections::HashMap;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::LedgerSummary;

/// GET /api/financial/ledger/summary/ - credit, debit and balance over the filtered entries
pub async fn ledger_summary(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<LedgerSummary> {
    let summary = state.service.ledger_summary(&user.tenant, &params).await?;
    Ok(ApiResponse::success(summary))
}
