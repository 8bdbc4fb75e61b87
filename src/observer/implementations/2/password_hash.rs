// Ring 2: Business - plaintext passwords are replaced by their hash
use async_trait::async_trait;
use serde_json::Value;

use crate::auth::password::hash_password;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};
use crate::schema::{FieldKind, ResourceDef};

#[derive(Default)]
pub struct PasswordHashObserver;

#[async_trait]
impl Observer for PasswordHashObserver {
    fn name(&self) -> &'static str {
        "PasswordHashObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Business
    }

    fn applies_to_resource(&self, def: &ResourceDef) -> bool {
        def.fields.iter().any(|f| matches!(f.kind, FieldKind::Password))
    }

    fn priority(&self) -> u8 {
        90
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        for field in ctx.def.fields.iter().filter(|f| matches!(f.kind, FieldKind::Password)) {
            let Some(Value::String(plain)) = ctx.record.get(field.name).cloned() else {
                continue;
            };
            let hashed = hash_password(&plain).map_err(|e| ObserverError::SystemError(e.to_string()))?;
            ctx.record.set(field.name, hashed);
        }
        Ok(())
    }
}
