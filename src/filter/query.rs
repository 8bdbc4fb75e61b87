//! Translation of list query parameters into filter conditions.

use serde_json::{json, Map, Value};
use std::collections::HashMap;

use super::error::FilterError;
use crate::schema::{value, ResourceDef, SearchField};

/// Parameter carrying free-text search terms
pub const SEARCH_PARAM: &str = "search";

/// Equality filters and search terms accepted for one list request
#[derive(Debug, Default, Clone)]
pub struct ListQuery {
    pub conditions: Map<String, Value>,
    pub search_terms: Vec<String>,
}

impl ListQuery {
    /// Parameters outside the resource's allow-lists are ignored, as are empty values
    pub fn parse(def: &ResourceDef, params: &HashMap<String, String>) -> Result<Self, FilterError> {
        let mut query = ListQuery::default();

        for (param, raw) in params {
            if raw.trim().is_empty() {
                continue;
            }
            if param == SEARCH_PARAM {
                if !def.search.is_empty() {
                    query.search_terms = search_terms(raw);
                }
                continue;
            }
            let Some(filter) = def.filter(param) else {
                tracing::trace!("Ignoring unsupported filter '{}' on {}", param, def.table);
                continue;
            };
            let field = def
                .field(filter.column)
                .ok_or_else(|| FilterError::InvalidColumn(filter.column.to_string()))?;
            let normalized = value::normalize(field, &Value::String(raw.clone())).map_err(|message| {
                FilterError::InvalidValue { field: param.clone(), message }
            })?;
            query.conditions.insert(filter.column.to_string(), normalized);
        }

        Ok(query)
    }

    /// Where clause over direct columns; related search fields need
    /// `related_matches` with the keys found in the related table per term
    pub fn to_where(&self, def: &ResourceDef, related_matches: &[Vec<(usize, Value)>]) -> Value {
        let mut clauses: Vec<Value> = Vec::new();
        if !self.conditions.is_empty() {
            clauses.push(Value::Object(self.conditions.clone()));
        }

        for (term_index, term) in self.search_terms.iter().enumerate() {
            let pattern = like_pattern(term);
            let mut alternatives = Vec::new();
            for (field_index, field) in def.search.iter().enumerate() {
                match field {
                    SearchField::Column(column) => alternatives.push(json!({ *column: { "$ilike": pattern } })),
                    SearchField::Related { column, .. } => {
                        let keys = related_matches
                            .get(term_index)
                            .and_then(|m| m.iter().find(|(i, _)| *i == field_index))
                            .map(|(_, keys)| keys.clone())
                            .unwrap_or_else(|| json!([]));
                        alternatives.push(json!({ *column: { "$in": keys } }));
                    }
                }
            }
            clauses.push(json!({ "$or": alternatives }));
        }

        match clauses.len() {
            0 => Value::Null,
            1 => clauses.remove(0),
            _ => json!({ "$and": clauses }),
        }
    }
}

/// Terms are separated by whitespace or commas
pub fn search_terms(raw: &str) -> Vec<String> {
    raw.replace('\0', "")
        .replace(',', " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Substring pattern for `$ilike` with LIKE metacharacters escaped
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
