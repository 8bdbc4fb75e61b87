// Ring 2: Business - onboarding items cache the linked product's title
use async_trait::async_trait;
use serde_json::Value;

use crate::database::store::Key;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};
use crate::schema::registry::{ONBOARDING_ITEMS, PRODUCTS};
use crate::schema::ResourceDef;

/// Fills an empty `product_name` from the product's title; never overwrites
#[derive(Default)]
pub struct OnboardingProductNameObserver;

#[async_trait]
impl Observer for OnboardingProductNameObserver {
    fn name(&self) -> &'static str {
        "OnboardingProductNameObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Business
    }

    fn applies_to_resource(&self, def: &ResourceDef) -> bool {
        def.table == ONBOARDING_ITEMS.table
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let has_name = matches!(ctx.record.effective("product_name"), Some(Value::String(s)) if !s.is_empty());
        if has_name {
            return Ok(());
        }
        let Some(product) = ctx.record.effective("product").and_then(Key::from_value) else {
            return Ok(());
        };

        let title = ctx
            .store
            .find(&ctx.tenant, &PRODUCTS, &product)
            .await?
            .and_then(|row| row.get("title").cloned());
        if let Some(title) = title {
            tracing::debug!("Caching product title for onboarding item");
            ctx.record.set("product_name", title);
        }
        Ok(())
    }
}
