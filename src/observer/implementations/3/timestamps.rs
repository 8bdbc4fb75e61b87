// Ring 3: Enrichment - server-stamped date and datetime fields
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};
use crate::schema::value::format_datetime;
use crate::schema::{Access, FieldKind};

#[derive(Default)]
pub struct TimestampsObserver;

#[async_trait]
impl Observer for TimestampsObserver {
    fn name(&self) -> &'static str {
        "TimestampsObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Enrichment
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let now = Utc::now();
        for field in ctx.def.fields {
            let stamp = match field.access {
                Access::AutoCreate => ctx.operation == Operation::Create,
                Access::AutoUpdate => true,
                Access::ReadWrite | Access::WriteOnly => false,
            };
            if !stamp {
                continue;
            }
            let value = match field.kind {
                FieldKind::Date => now.date_naive().format("%Y-%m-%d").to_string(),
                _ => format_datetime(now),
            };
            ctx.record.set(field.name, Value::String(value));
        }
        Ok(())
    }
}
