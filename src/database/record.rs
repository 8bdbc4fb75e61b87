use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::schema::{KeyKind, ResourceDef};

use super::store::Row;

/// Errors that can occur during Record operations
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
}

/// Writable input for one resource row, with change tracking against the stored row
#[derive(Debug, Clone)]
pub struct Record {
    def: &'static ResourceDef,
    /// Stored state (None for CREATE operations)
    original: Option<Row>,
    /// Current field values
    fields: Row,
    /// Raw many-to-many input keyed by link name
    links: Map<String, Value>,
    /// Fields supplied by the client or set by observers
    modified_fields: HashSet<String>,
}

impl Record {
    pub fn new(def: &'static ResourceDef) -> Self {
        Self {
            def,
            original: None,
            fields: Map::new(),
            links: Map::new(),
            modified_fields: HashSet::new(),
        }
    }

    /// Create record from API input, keeping only fields the client may write
    pub fn from_input(def: &'static ResourceDef, json: Value) -> Result<Self, RecordError> {
        let map = match json {
            Value::Object(map) => map,
            _ => return Err(RecordError::InvalidJson("Expected JSON object".to_string())),
        };

        let mut record = Self::new(def);
        for (key, value) in map {
            if def.field(&key).is_some_and(|f| f.is_writable()) {
                record.set(key, value);
            } else if def.link(&key).is_some() {
                record.links.insert(key, value);
            } else if key == "id" && matches!(def.key, KeyKind::Supplied { .. }) {
                record.set(key, value);
            } else {
                tracing::debug!("Dropping read-only or unknown field '{}' for {}", key, def.table);
            }
        }
        Ok(record)
    }

    pub fn def(&self) -> &'static ResourceDef {
        self.def
    }

    /// Inject the stored row (for tracking changes)
    pub fn inject(&mut self, original: Row) -> &mut Self {
        self.original = Some(original);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();
        self.modified_fields.insert(key.clone());
        self.fields.insert(key, value.into());
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.modified_fields.remove(key);
        self.fields.remove(key)
    }

    /// Field names in the order they were supplied
    pub fn keys(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    pub fn links(&self) -> &Map<String, Value> {
        &self.links
    }

    pub fn original(&self) -> Option<&Row> {
        self.original.as_ref()
    }

    pub fn get_original(&self, key: &str) -> Option<&Value> {
        self.original.as_ref()?.get(key)
    }

    /// Check if a specific field differs from the stored row
    pub fn changed(&self, key: &str) -> bool {
        match (&self.original, self.fields.get(key)) {
            (Some(original), Some(current)) => original.get(key) != Some(current),
            (None, Some(_)) => true,
            (_, None) => false,
        }
    }

    pub fn is_modified(&self, key: &str) -> bool {
        self.modified_fields.contains(key)
    }

    /// Value after applying this record on top of the stored row
    pub fn effective(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).or_else(|| self.get_original(key))
    }

    /// Stored row with this record's fields applied
    pub fn merged(&self) -> Row {
        let mut row = self.original.clone().unwrap_or_default();
        for (key, value) in &self.fields {
            row.insert(key.clone(), value.clone());
        }
        row
    }

    pub fn into_fields(self) -> Row {
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::registry::{PROJECTS, ROLES};
    use serde_json::json;

    #[test]
    fn rejects_non_object_input() {
        assert!(matches!(
            Record::from_input(&PROJECTS, json!([1, 2])),
            Err(RecordError::InvalidJson(_))
        ));
    }

    #[test]
    fn drops_read_only_and_unknown_fields() {
        let record = Record::from_input(
            &PROJECTS,
            json!({"id": 99, "title": "ERP", "last_update": "2020-01-01T00:00:00Z", "client_name": "x", "bogus": 1}),
        )
        .unwrap();
        assert_eq!(record.keys(), vec!["title".to_string()]);
    }

    #[test]
    fn keeps_supplied_keys_and_links() {
        let record = Record::from_input(&ROLES, json!({"id": "admin", "name": "Admin", "permissions": [1]})).unwrap();
        assert_eq!(record.get("id"), Some(&json!("admin")));
        assert_eq!(record.links().get("permissions"), Some(&json!([1])));
    }

    #[test]
    fn tracks_changes_against_stored_row() {
        let mut record = Record::from_input(&PROJECTS, json!({"title": "New"})).unwrap();
        record.inject(json!({"id": 1, "title": "Old", "status": "Ativo"}).as_object().cloned().unwrap());
        assert!(record.changed("title"));
        assert!(!record.changed("status"));
        assert_eq!(record.effective("status"), Some(&json!("Ativo")));
        assert_eq!(record.merged().get("title"), Some(&json!("New")));
    }
}
