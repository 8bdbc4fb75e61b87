use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::database::store::Key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "$eq")] Eq,
    #[serde(rename = "$in")] In,
    #[serde(rename = "$ilike")] ILike,
    #[serde(rename = "$and")] And,
    #[serde(rename = "$or")] Or,
}

/// Selection criteria in the `{ field: value, "$or": [...] }` shape
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterData {
    pub where_clause: Option<Value>,
}

impl FilterData {
    pub fn matching(where_clause: Value) -> Self {
        Self { where_clause: Some(where_clause) }
    }

    pub fn by_key(key: &Key) -> Self {
        Self::matching(json!({ "id": key.to_value() }))
    }

    /// Rows whose `column` references `key`
    pub fn children_of(column: &str, key: &Key) -> Self {
        Self::matching(json!({ column: key.to_value() }))
    }
}

#[derive(Debug, Clone)]
pub struct FilterWhereInfo {
    pub column: String,
    pub operator: FilterOp,
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

impl FilterOrderInfo {
    pub fn by_id() -> Self {
        Self { column: "id".to_string(), sort: SortDirection::Asc }
    }
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}
