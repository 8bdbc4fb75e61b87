// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::TokenError;
use crate::database::manager::DatabaseError;
use crate::database::record::RecordError;
use crate::database::store::StoreError;
use crate::filter::FilterError;
use crate::observer::error::ObserverError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    IntegrityError {
        message: String,
        field_errors: HashMap<String, String>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 404 Not Found
    NotFound(String),

    // 405 Method Not Allowed
    MethodNotAllowed(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::ValidationError { .. } => 400,
            ApiError::IntegrityError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::NotFound(_) => 404,
            ApiError::MethodNotAllowed(_) => 405,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::ValidationError { message, .. } => message,
            ApiError::IntegrityError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::MethodNotAllowed(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::IntegrityError { .. } => "INTEGRITY_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::MethodNotAllowed(_) => "METHOD_NOT_ALLOWED",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    pub fn field_errors(&self) -> Option<&HashMap<String, String>> {
        match self {
            ApiError::ValidationError { field_errors, .. } => field_errors.as_ref(),
            ApiError::IntegrityError { field_errors, .. } => Some(field_errors),
            _ => None,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        });
        if let Some(field_errors) = self.field_errors() {
            response["field_errors"] = json!(field_errors);
        }
        response
    }
}

// Static constructor methods
impl ApiError {
    pub fn validation_error(message: impl Into<String>, field_errors: Option<HashMap<String, String>>) -> Self {
        ApiError::ValidationError { message: message.into(), field_errors }
    }

    /// Validation failure on a single field
    pub fn field_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(field.into(), message.into());
        Self::validation_error("Validation failed", Some(field_errors))
    }

    pub fn integrity_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut field_errors = HashMap::new();
        field_errors.insert(field.into(), message.clone());
        ApiError::IntegrityError { message, field_errors }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn method_not_allowed(method: impl std::fmt::Display) -> Self {
        ApiError::MethodNotAllowed(format!("Method \"{}\" not allowed.", method))
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<RecordError> for ApiError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::InvalidJson(msg) => ApiError::invalid_json(msg),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::InvalidTenantName(name) => ApiError::not_found(format!("Unknown tenant: {}", name)),
            DatabaseError::TenantNotFound(database) => {
                tracing::warn!("Request for unprovisioned tenant database {}", database);
                ApiError::not_found("Unknown tenant")
            }
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database configuration error: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::QueryError(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database query error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                tracing::error!("SQLx error: {}", sqlx_err);
                match sqlx_err {
                    sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                        ApiError::service_unavailable("Database temporarily unavailable")
                    }
                    _ => ApiError::internal_server_error("Database error occurred"),
                }
            }
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::InvalidValue { field, message } => ApiError::field_error(field, message),
            other => ApiError::validation_error(other.to_string(), None),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { table, field } => {
                ApiError::integrity_error(field.clone(), format!("{} with this {} already exists.", table, field))
            }
            StoreError::ForeignKeyViolation(msg) => {
                tracing::warn!("Foreign key violation: {}", msg);
                ApiError::integrity_error("non_field_errors", "Referenced object does not exist.")
            }
            StoreError::Filter(err) => err.into(),
            StoreError::Database(err) => err.into(),
        }
    }
}

impl From<ObserverError> for ApiError {
    fn from(err: ObserverError) -> Self {
        match err {
            ObserverError::ValidationError { message, field_errors } => {
                ApiError::validation_error(message, Some(field_errors))
            }
            ObserverError::IntegrityError { field, message } => ApiError::integrity_error(field, message),
            ObserverError::NotFound(msg) => ApiError::not_found(msg),
            ObserverError::StoreError(msg) | ObserverError::SystemError(msg) => {
                tracing::error!("Observer error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            ObserverError::TimeoutError(msg) => {
                tracing::error!("Observer timeout: {}", msg);
                ApiError::internal_server_error("Request processing timed out")
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidSecret | TokenError::TokenGeneration(_) => {
                tracing::error!("Token error: {}", err);
                ApiError::internal_server_error("Unable to issue token")
            }
            TokenError::Invalid | TokenError::WrongType => ApiError::unauthorized("Given token not valid for any token type"),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_body_carries_field_errors() {
        let body = ApiError::field_error("title", "This field is required.").to_json();
        assert_eq!(body["error"], json!(true));
        assert_eq!(body["code"], json!("VALIDATION_ERROR"));
        assert_eq!(body["field_errors"]["title"], json!("This field is required."));
    }

    #[test]
    fn unique_violations_become_integrity_errors() {
        let err: ApiError = StoreError::UniqueViolation { table: "users".into(), field: "username".into() }.into();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "INTEGRITY_ERROR");
        assert!(err.field_errors().is_some_and(|f| f.contains_key("username")));
    }

    #[test]
    fn method_not_allowed_names_the_verb() {
        let err = ApiError::method_not_allowed("POST");
        assert_eq!(err.status_code(), 405);
        assert_eq!(err.message(), "Method \"POST\" not allowed.");
    }
}
