use axum::extract::{rejection::JsonRejection, State};
use axum::Json;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::app::AppState;
use crate::auth::{decode_jwt, generate_jwt, issue_pair, TokenPair, TokenType};
use crate::config::config;
use crate::database::store::Key;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// Required string members of a token request body
fn required_fields<'a>(body: &'a Value, names: &[&str]) -> Result<Vec<&'a str>, ApiError> {
    let mut values = Vec::new();
    let mut field_errors = HashMap::new();
    for name in names {
        match body.get(*name).and_then(Value::as_str) {
            Some(value) if !value.is_empty() => values.push(value),
            Some(_) => {
                field_errors.insert(name.to_string(), "This field may not be blank.".to_string());
            }
            None => {
                field_errors.insert(name.to_string(), "This field is required.".to_string());
            }
        }
    }
    if !field_errors.is_empty() {
        return Err(ApiError::validation_error("Validation failed", Some(field_errors)));
    }
    Ok(values)
}

/// POST /api/token/ - exchange credentials for an access/refresh pair
pub async fn token_obtain(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<TokenPair> {
    let Json(body) = body.map_err(|e| ApiError::invalid_json(e.body_text()))?;
    let fields = required_fields(&body, &["username", "password"])?;
    let (username, password) = (fields[0], fields[1]);
    let tenant = body
        .get("tenant")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .unwrap_or(config().tenancy.default_tenant.as_str())
        .to_string();

    let user = state.service.authenticate(&tenant, username, password).await?;
    let Some(Key::Int(user_id)) = Key::of(&user) else {
        return Err(ApiError::internal_server_error("User has no identity"));
    };

    tracing::info!("Issued token pair for {} in tenant {}", username, tenant);
    Ok(ApiResponse::success(issue_pair(user_id, username, &tenant)?))
}

/// POST /api/token/refresh/ - new access token from a refresh token
pub async fn token_refresh(body: Result<Json<Value>, JsonRejection>) -> ApiResult<Value> {
    let Json(body) = body.map_err(|e| ApiError::invalid_json(e.body_text()))?;
    let fields = required_fields(&body, &["refresh"])?;

    let refresh = decode_jwt(fields[0], TokenType::Refresh)?;
    let access = generate_jwt(&refresh.to_access())?;
    Ok(ApiResponse::success(json!({ "access": access })))
}
