//! Storage abstraction shared by the Postgres and in-memory backends.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

use crate::filter::{FilterData, FilterError};
use crate::schema::{KeyKind, LinkDef, ResourceDef};

use super::manager::DatabaseError;

/// A stored row keyed by column name
pub type Row = Map<String, Value>;

/// Many-to-many targets keyed by link name
pub type Links = BTreeMap<&'static str, BTreeSet<Key>>;

/// Identity of a stored row
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl Key {
    /// Parse a path segment according to the resource's key kind
    pub fn parse(kind: KeyKind, raw: &str) -> Option<Key> {
        match kind {
            KeyKind::Serial => raw.parse().ok().map(Key::Int),
            KeyKind::Supplied { .. } if raw.is_empty() => None,
            KeyKind::Supplied { .. } => Some(Key::Str(raw.to_string())),
        }
    }

    pub fn from_value(value: &Value) -> Option<Key> {
        match value {
            Value::Number(n) => n.as_i64().map(Key::Int),
            Value::String(s) => Some(Key::Str(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Key::Int(i) => Value::from(*i),
            Key::Str(s) => Value::String(s.clone()),
        }
    }

    /// Key of a row, read from its `id` column
    pub fn of(row: &Row) -> Option<Key> {
        row.get("id").and_then(Key::from_value)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{}", i),
            Key::Str(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unique constraint violated on {table}.{field}")]
    UniqueViolation { table: String, field: String },

    #[error("Referenced row does not exist: {0}")]
    ForeignKeyViolation(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            match db.code().as_deref() {
                Some("23505") => {
                    let constraint = db.constraint().unwrap_or_default();
                    let (table, field) = split_unique_constraint(constraint);
                    return StoreError::UniqueViolation { table, field };
                }
                Some("23503") => return StoreError::ForeignKeyViolation(db.message().to_string()),
                _ => {}
            }
        }
        StoreError::Database(DatabaseError::Sqlx(err))
    }
}

impl StoreError {
    /// The tenant has no data set to read from
    pub fn is_unknown_tenant(&self) -> bool {
        matches!(
            self,
            StoreError::Database(DatabaseError::TenantNotFound(_) | DatabaseError::InvalidTenantName(_))
        )
    }
}

/// Postgres names unique constraints `<table>_<column>_key`
fn split_unique_constraint(constraint: &str) -> (String, String) {
    let trimmed = constraint.strip_suffix("_key").unwrap_or(constraint);
    for def in crate::schema::RESOURCES {
        if let Some(field) = trimmed.strip_prefix(def.table).and_then(|s| s.strip_prefix('_')) {
            if def.field(field).is_some() {
                return (def.table.to_string(), field.to_string());
            }
        }
    }
    if constraint.ends_with("_pkey") {
        let table = constraint.trim_end_matches("_pkey");
        return (table.to_string(), "id".to_string());
    }
    (String::new(), trimmed.to_string())
}

/// Tenant-scoped persistence for every registered resource.
///
/// Writes that touch a row and its link rows happen atomically. Deleting a row
/// applies the cascade and set-null rules declared on referencing fields.
#[async_trait]
pub trait Store: Send + Sync {
    async fn select(&self, tenant: &str, def: &'static ResourceDef, filter: &FilterData) -> Result<Vec<Row>, StoreError>;

    async fn find(&self, tenant: &str, def: &'static ResourceDef, key: &Key) -> Result<Option<Row>, StoreError>;

    /// Insert a row; serial keys are assigned by the store
    async fn insert(&self, tenant: &str, def: &'static ResourceDef, row: Row, links: &Links) -> Result<Row, StoreError>;

    /// Replace a row's columns; `links` of `None` leaves link rows untouched
    async fn update(
        &self,
        tenant: &str,
        def: &'static ResourceDef,
        key: &Key,
        row: Row,
        links: Option<&Links>,
    ) -> Result<Option<Row>, StoreError>;

    /// Returns `false` when no row had the key
    async fn delete(&self, tenant: &str, def: &'static ResourceDef, key: &Key) -> Result<bool, StoreError>;

    /// Target keys linked to a row, in ascending order
    async fn links(&self, tenant: &str, link: &'static LinkDef, key: &Key) -> Result<Vec<Key>, StoreError>;

    /// Create the tenant's tables if missing
    async fn provision(&self, tenant: &str) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_keys_by_kind() {
        assert_eq!(Key::parse(KeyKind::Serial, "42"), Some(Key::Int(42)));
        assert_eq!(Key::parse(KeyKind::Serial, "abc"), None);
        assert_eq!(Key::parse(KeyKind::Supplied { max: 50 }, "admin"), Some(Key::Str("admin".into())));
    }

    #[test]
    fn reads_key_from_row() {
        let row = json!({"id": 7, "title": "x"});
        assert_eq!(Key::of(row.as_object().unwrap()), Some(Key::Int(7)));
        assert_eq!(Key::Int(7).to_value(), json!(7));
    }

    #[test]
    fn maps_unique_constraint_names() {
        assert_eq!(split_unique_constraint("users_username_key"), ("users".to_string(), "username".to_string()));
        assert_eq!(split_unique_constraint("client_profiles_cnpj_key"), ("client_profiles".to_string(), "cnpj".to_string()));
        assert_eq!(split_unique_constraint("roles_pkey"), ("roles".to_string(), "id".to_string()));
    }
}
