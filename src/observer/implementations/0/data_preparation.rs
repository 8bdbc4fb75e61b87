// Ring 0: Data Preparation - loads the stored row and applies caller defaults
use async_trait::async_trait;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};
use crate::schema::{FieldDefault, KeyKind};

#[derive(Default)]
pub struct DataPreparationObserver;

#[async_trait]
impl Observer for DataPreparationObserver {
    fn name(&self) -> &'static str {
        "DataPreparationObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::DataPreparation
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        match ctx.operation {
            Operation::Create => {
                self.apply_caller_defaults(ctx);
                Ok(())
            }
            Operation::Update | Operation::Patch => self.load_existing(ctx).await,
        }
    }
}

impl DataPreparationObserver {
    async fn load_existing(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let key = ctx
            .key
            .clone()
            .ok_or_else(|| ObserverError::SystemError("Update requires a record key".to_string()))?;

        let existing = ctx
            .store
            .find(&ctx.tenant, ctx.def, &key)
            .await?
            .ok_or_else(|| ObserverError::NotFound("Not found.".to_string()))?;

        // Identity is fixed once assigned
        if matches!(ctx.def.key, KeyKind::Supplied { .. }) && ctx.record.remove("id").is_some() {
            tracing::debug!("Ignoring id in update of {} {}", ctx.def.table, key);
        }
        ctx.record.inject(existing);
        Ok(())
    }

    fn apply_caller_defaults(&self, ctx: &mut ObserverContext) {
        let Some(caller) = ctx.caller.clone() else {
            return;
        };
        for field in ctx.def.fields {
            if matches!(field.default, FieldDefault::Caller) && !ctx.record.contains(field.name) {
                ctx.record.set(field.name, caller.to_value());
            }
        }
    }
}
