use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::database::record::Record;
use crate::database::store::{Key, Links, Store};
use crate::observer::error::ObserverError;
use crate::observer::traits::{ObserverRing, Operation};
use crate::schema::ResourceDef;

/// State for one write flowing through the observer pipeline
pub struct ObserverContext {
    pub operation: Operation,
    pub def: &'static ResourceDef,
    pub tenant: String,
    /// Authenticated user, absent for CLI writes
    pub caller: Option<Key>,
    pub store: Arc<dyn Store>,

    /// Identity of the row being updated
    pub key: Option<Key>,
    pub record: Record,
    /// Parsed many-to-many input, set during validation
    pub links: Option<Links>,

    /// Per-field messages, reported together as one validation error
    pub field_errors: HashMap<String, String>,

    pub start_time: Instant,
    pub current_ring: Option<ObserverRing>,
    pub errors: Vec<ObserverError>,
}

impl ObserverContext {
    pub fn new(
        operation: Operation,
        tenant: impl Into<String>,
        caller: Option<Key>,
        store: Arc<dyn Store>,
        key: Option<Key>,
        record: Record,
    ) -> Self {
        Self {
            operation,
            def: record.def(),
            tenant: tenant.into(),
            caller,
            store,
            key,
            record,
            links: None,
            field_errors: HashMap::new(),
            start_time: Instant::now(),
            current_ring: None,
            errors: Vec::new(),
        }
    }

    /// Record a field error; the first message per field wins
    pub fn field_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.field_errors.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn has_field_error(&self, field: &str) -> bool {
        self.field_errors.contains_key(field)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn execution_time(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}
