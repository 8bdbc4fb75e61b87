use axum::extract::State;
use axum::Extension;
use serde_json::Value;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::schema::registry::USERS;

/// GET /api/core/users/me/ - the caller's own user record
pub async fn users_me(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    let me = state.service.retrieve(&user.tenant, &USERS, &user.key()).await?;
    Ok(ApiResponse::success(me))
}
