// Ring 1: Input Validation - referenced rows must exist
use async_trait::async_trait;

use crate::database::store::Key;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};
use crate::schema::find_by_table;

#[derive(Default)]
pub struct ReferenceValidationObserver;

fn missing(key: &Key) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", key)
}

#[async_trait]
impl Observer for ReferenceValidationObserver {
    fn name(&self) -> &'static str {
        "ReferenceValidationObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::InputValidation
    }

    fn priority(&self) -> u8 {
        20
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        for field in ctx.def.fields {
            let Some(table) = field.foreign_table() else {
                continue;
            };
            if ctx.has_field_error(field.name) || !ctx.record.is_modified(field.name) {
                continue;
            }
            let Some(key) = ctx.record.get(field.name).and_then(Key::from_value) else {
                continue;
            };
            let Some(target) = find_by_table(table) else {
                continue;
            };
            if ctx.store.find(&ctx.tenant, target, &key).await?.is_none() {
                ctx.field_error(field.name, missing(&key));
            }
        }

        let Some(links) = ctx.links.clone() else {
            return Ok(());
        };
        for link in ctx.def.links {
            if ctx.has_field_error(link.name) {
                continue;
            }
            let Some(target) = find_by_table(link.target) else {
                continue;
            };
            for key in links.get(link.name).into_iter().flatten() {
                if ctx.store.find(&ctx.tenant, target, key).await?.is_none() {
                    ctx.field_error(link.name, missing(key));
                    break;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::record::Record;
    use crate::database::MemoryStore;
    use crate::observer::implementations::FieldValidationObserver;
    use crate::observer::traits::Operation;
    use crate::schema::registry::PROJECT_MEETINGS;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn flags_missing_parent() {
        let record = Record::from_input(
            &PROJECT_MEETINGS,
            json!({"project": 42, "title": "Kickoff", "date": "2024-05-01T14:00:00Z"}),
        )
        .unwrap();
        let mut ctx = ObserverContext::new(Operation::Create, "main", None, Arc::new(MemoryStore::new()), None, record);
        FieldValidationObserver.execute(&mut ctx).await.unwrap();
        ReferenceValidationObserver.execute(&mut ctx).await.unwrap();
        assert_eq!(
            ctx.field_errors.get("project").map(String::as_str),
            Some("Invalid pk \"42\" - object does not exist.")
        );
    }
}
