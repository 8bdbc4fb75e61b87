// Ring 1: Input Validation - coerces values and enforces required fields
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;

use crate::database::store::Links;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};
use crate::schema::{find_by_table, value, FieldKind, KeyKind};

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";

#[derive(Default)]
pub struct FieldValidationObserver;

#[async_trait]
impl Observer for FieldValidationObserver {
    fn name(&self) -> &'static str {
        "FieldValidationObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::InputValidation
    }

    fn priority(&self) -> u8 {
        10
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        self.validate_key(ctx);
        self.validate_fields(ctx);
        self.validate_links(ctx);
        Ok(())
    }
}

impl FieldValidationObserver {
    fn validate_key(&self, ctx: &mut ObserverContext) {
        let KeyKind::Supplied { max } = ctx.def.key else {
            return;
        };
        if ctx.operation != Operation::Create {
            return;
        }
        match ctx.record.get("id").cloned() {
            None => ctx.field_error("id", REQUIRED),
            Some(raw) => match value::key(ctx.def.key, &raw) {
                Ok(key) if key.to_string().trim().is_empty() => ctx.field_error("id", BLANK),
                Ok(key) if key.to_string().chars().count() > max => {
                    ctx.field_error("id", format!("Ensure this field has no more than {} characters.", max))
                }
                Ok(key) => {
                    ctx.record.set("id", key.to_value());
                }
                Err(message) => ctx.field_error("id", message),
            },
        }
    }

    fn validate_fields(&self, ctx: &mut ObserverContext) {
        for field in ctx.def.fields.iter().filter(|f| f.is_writable()) {
            let Some(raw) = ctx.record.get(field.name).cloned() else {
                if field.required && ctx.operation != Operation::Patch {
                    ctx.field_error(field.name, REQUIRED);
                }
                continue;
            };

            match value::normalize(field, &raw) {
                Ok(Value::String(text)) if text.is_empty() && matches!(field.kind, FieldKind::Password) => {
                    // Blank password leaves the stored hash alone
                    ctx.record.remove(field.name);
                }
                Ok(Value::String(text)) if text.is_empty() && field.required && field.kind.is_textual() => {
                    ctx.field_error(field.name, BLANK);
                }
                Ok(normalized) => {
                    ctx.record.set(field.name, normalized);
                }
                Err(message) => ctx.field_error(field.name, message),
            }
        }
    }

    fn validate_links(&self, ctx: &mut ObserverContext) {
        let mut links = Links::new();
        let input = ctx.record.links().clone();

        for link in ctx.def.links {
            let Some(raw) = input.get(link.name) else {
                continue;
            };
            let items = match raw {
                Value::Array(items) => items,
                other => {
                    let kind = match other {
                        Value::Null => "NoneType",
                        Value::String(_) => "str",
                        Value::Number(_) => "int",
                        Value::Bool(_) => "bool",
                        _ => "dict",
                    };
                    ctx.field_error(link.name, format!("Expected a list of items but got type \"{}\".", kind));
                    continue;
                }
            };

            let target_kind = find_by_table(link.target).map(|d| d.key).unwrap_or(KeyKind::Serial);
            let mut targets = BTreeSet::new();
            for item in items {
                match value::key(target_kind, item) {
                    Ok(key) => {
                        targets.insert(key);
                    }
                    Err(message) => ctx.field_error(link.name, message),
                }
            }
            links.insert(link.name, targets);
        }

        ctx.links = Some(links);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::record::Record;
    use crate::database::MemoryStore;
    use crate::schema::registry::{ROLES, TICKETS};
    use serde_json::json;
    use std::sync::Arc;

    fn context(op: Operation, record: Record) -> ObserverContext {
        ObserverContext::new(op, "main", None, Arc::new(MemoryStore::new()), None, record)
    }

    #[tokio::test]
    async fn reports_required_and_invalid_fields() {
        let record = Record::from_input(&TICKETS, json!({"title": "", "priority": "Urgentíssima"})).unwrap();
        let mut ctx = context(Operation::Create, record);
        FieldValidationObserver.execute(&mut ctx).await.unwrap();

        assert_eq!(ctx.field_errors.get("title").map(String::as_str), Some(BLANK));
        assert_eq!(
            ctx.field_errors.get("priority").map(String::as_str),
            Some("\"Urgentíssima\" is not a valid choice.")
        );
        assert_eq!(ctx.field_errors.get("description").map(String::as_str), Some(REQUIRED));
        assert!(!ctx.has_field_error("status"));
    }

    #[tokio::test]
    async fn partial_update_skips_required_checks() {
        let record = Record::from_input(&TICKETS, json!({"status": "Resolvido"})).unwrap();
        let mut ctx = context(Operation::Patch, record);
        FieldValidationObserver.execute(&mut ctx).await.unwrap();
        assert!(ctx.field_errors.is_empty());
    }

    #[tokio::test]
    async fn parses_link_sets() {
        let record = Record::from_input(&ROLES, json!({"id": "admin", "name": "Admin", "permissions": [2, "1", 2]})).unwrap();
        let mut ctx = context(Operation::Create, record);
        FieldValidationObserver.execute(&mut ctx).await.unwrap();
        assert!(ctx.field_errors.is_empty());
        let links = ctx.links.unwrap();
        assert_eq!(links.get("permissions").map(|s| s.len()), Some(2));

        let record = Record::from_input(&ROLES, json!({"id": "x", "name": "X", "permissions": "1"})).unwrap();
        let mut ctx = context(Operation::Create, record);
        FieldValidationObserver.execute(&mut ctx).await.unwrap();
        assert!(ctx.has_field_error("permissions"));
    }
}
