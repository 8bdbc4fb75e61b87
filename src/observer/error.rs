use std::collections::HashMap;
use thiserror::Error;

use crate::database::store::StoreError;

/// Observer system errors with structured error types
#[derive(Debug, Error, Clone)]
pub enum ObserverError {
    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        field_errors: HashMap<String, String>,
    },

    #[error("Integrity error on {field}: {message}")]
    IntegrityError { field: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("System error: {0}")]
    SystemError(String),
}

impl ObserverError {
    pub fn integrity(field: impl Into<String>, message: impl Into<String>) -> Self {
        ObserverError::IntegrityError { field: field.into(), message: message.into() }
    }
}

impl From<StoreError> for ObserverError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::UniqueViolation { table, field } => {
                ObserverError::integrity(field.clone(), format!("{} with this {} already exists.", table, field))
            }
            other => ObserverError::StoreError(other.to_string()),
        }
    }
}
