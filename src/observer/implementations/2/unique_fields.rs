// Ring 2: Business - unique columns are checked before the write
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::database::store::Key;
use crate::filter::FilterData;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};

#[derive(Default)]
pub struct UniqueFieldsObserver;

#[async_trait]
impl Observer for UniqueFieldsObserver {
    fn name(&self) -> &'static str {
        "UniqueFieldsObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Business
    }

    fn priority(&self) -> u8 {
        10
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        if ctx.operation == Operation::Create {
            if let Some(key) = ctx.record.get("id").and_then(Key::from_value) {
                if ctx.store.find(&ctx.tenant, ctx.def, &key).await?.is_some() {
                    return Err(ObserverError::integrity("id", format!("{} with this id already exists.", ctx.def.table)));
                }
            }
        }

        for field in ctx.def.fields.iter().filter(|f| f.unique) {
            if !ctx.record.changed(field.name) {
                continue;
            }
            let value = match ctx.record.get(field.name) {
                Some(Value::Null) | None => continue,
                Some(value) => value.clone(),
            };

            let clashes = ctx
                .store
                .select(&ctx.tenant, ctx.def, &FilterData::matching(json!({ field.name: value })))
                .await?;
            let taken = clashes.iter().any(|row| Key::of(row).as_ref() != ctx.key.as_ref());
            if taken {
                return Err(ObserverError::integrity(
                    field.name,
                    format!("{} with this {} already exists.", ctx.def.table, field.name),
                ));
            }
        }
        Ok(())
    }
}
