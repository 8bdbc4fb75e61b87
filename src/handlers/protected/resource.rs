// Generic CRUD handlers shared by every registered resource

use axum::extract::{rejection::JsonRejection, Path, Query, State};
use axum::http::Method;
use axum::{Extension, Json};
use serde_json::Value;
use std::collections::HashMap;

use super::ResourceRef;
use crate::app::AppState;
use crate::database::store::Key;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::schema::ResourceDef;

fn parse_key(def: &ResourceDef, id: &str) -> Result<Key, ApiError> {
    Key::parse(def.key, id).ok_or_else(|| ApiError::not_found("Not found."))
}

fn writable(def: &ResourceDef, method: &Method) -> Result<(), ApiError> {
    if def.read_only {
        return Err(ApiError::method_not_allowed(method));
    }
    Ok(())
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    body.map(|Json(value)| value).map_err(|e| ApiError::invalid_json(e.body_text()))
}

/// GET collection
pub async fn list(
    State(state): State<AppState>,
    Extension(ResourceRef(def)): Extension<ResourceRef>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Vec<Value>> {
    let rows = state.service.list(&user.tenant, def, &params).await?;
    Ok(ApiResponse::success(rows))
}

/// POST collection
pub async fn create(
    State(state): State<AppState>,
    Extension(ResourceRef(def)): Extension<ResourceRef>,
    Extension(user): Extension<AuthUser>,
    method: Method,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    writable(def, &method)?;
    let body = json_body(body)?;
    let created = state.service.create(&user.tenant, Some(user.key()), def, body).await?;
    Ok(ApiResponse::created(created))
}

/// GET member
pub async fn retrieve(
    State(state): State<AppState>,
    Extension(ResourceRef(def)): Extension<ResourceRef>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let key = parse_key(def, &id)?;
    Ok(ApiResponse::success(state.service.retrieve(&user.tenant, def, &key).await?))
}

async fn update(
    state: AppState,
    def: &'static ResourceDef,
    user: AuthUser,
    method: Method,
    id: String,
    body: Result<Json<Value>, JsonRejection>,
    partial: bool,
) -> ApiResult<Value> {
    writable(def, &method)?;
    let key = parse_key(def, &id)?;
    let body = json_body(body)?;
    let updated = state
        .service
        .update(&user.tenant, Some(user.key()), def, &key, body, partial)
        .await?;
    Ok(ApiResponse::success(updated))
}

/// PUT member
pub async fn replace(
    State(state): State<AppState>,
    Extension(ResourceRef(def)): Extension<ResourceRef>,
    Extension(user): Extension<AuthUser>,
    method: Method,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    update(state, def, user, method, id, body, false).await
}

/// PATCH member
pub async fn patch(
    State(state): State<AppState>,
    Extension(ResourceRef(def)): Extension<ResourceRef>,
    Extension(user): Extension<AuthUser>,
    method: Method,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    update(state, def, user, method, id, body, true).await
}

/// DELETE member
pub async fn destroy(
    State(state): State<AppState>,
    Extension(ResourceRef(def)): Extension<ResourceRef>,
    Extension(user): Extension<AuthUser>,
    method: Method,
    Path(id): Path<String>,
) -> ApiResult<()> {
    writable(def, &method)?;
    let key = parse_key(def, &id)?;
    state.service.destroy(&user.tenant, def, &key).await?;
    Ok(ApiResponse::no_content())
}
