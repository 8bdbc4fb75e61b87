use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::password::verify_password;
use crate::database::record::Record;
use crate::database::store::{Key, Row, Store};
use crate::error::ApiError;
use crate::filter::query::like_pattern;
use crate::filter::{FilterData, ListQuery};
use crate::observer::{ObserverContext, ObserverPipeline, Operation};
use crate::schema::choices::LedgerType;
use crate::schema::registry::{LEDGER, USERS};
use crate::schema::{find_by_table, value, ResourceDef, SearchField};
use crate::services::representation;

/// Totals over the ledger entries matching a list query
#[derive(Debug, Serialize)]
pub struct LedgerSummary {
    pub total_credit: String,
    pub total_debit: String,
    pub balance: String,
    pub count: usize,
}

/// CRUD over any registered resource; writes pass through the observer pipeline
#[derive(Clone)]
pub struct ResourceService {
    store: Arc<dyn Store>,
    pipeline: Arc<ObserverPipeline>,
}

impl ResourceService {
    pub fn new(store: Arc<dyn Store>, pipeline: Arc<ObserverPipeline>) -> Self {
        Self { store, pipeline }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    async fn render(&self, tenant: &str, def: &'static ResourceDef, row: &Row) -> Result<Value, ApiError> {
        Ok(representation::render(self.store.as_ref(), tenant, def, row, 0).await?)
    }

    /// Where clause for allow-listed filters and search terms
    async fn list_filter(
        &self,
        tenant: &str,
        def: &'static ResourceDef,
        params: &HashMap<String, String>,
    ) -> Result<FilterData, ApiError> {
        let query = ListQuery::parse(def, params)?;

        let mut related = Vec::with_capacity(query.search_terms.len());
        for term in &query.search_terms {
            let mut matches = Vec::new();
            for (index, field) in def.search.iter().enumerate() {
                let SearchField::Related { table, field, .. } = *field else {
                    continue;
                };
                let Some(target) = find_by_table(table) else {
                    continue;
                };
                let rows = self
                    .store
                    .select(tenant, target, &FilterData::matching(json!({ field: { "$ilike": like_pattern(term) } })))
                    .await?;
                let keys: Vec<Value> = rows.iter().filter_map(Key::of).map(|k| k.to_value()).collect();
                matches.push((index, Value::Array(keys)));
            }
            related.push(matches);
        }

        Ok(match query.to_where(def, &related) {
            Value::Null => FilterData::default(),
            where_clause => FilterData::matching(where_clause),
        })
    }

    async fn select_rows(
        &self,
        tenant: &str,
        def: &'static ResourceDef,
        params: &HashMap<String, String>,
    ) -> Result<Vec<Row>, ApiError> {
        let filter = self.list_filter(tenant, def, params).await?;
        Ok(self.store.select(tenant, def, &filter).await?)
    }

    pub async fn list(
        &self,
        tenant: &str,
        def: &'static ResourceDef,
        params: &HashMap<String, String>,
    ) -> Result<Vec<Value>, ApiError> {
        let rows = self.select_rows(tenant, def, params).await?;
        tracing::debug!("Listing {} rows of {}", rows.len(), def.table);

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(self.render(tenant, def, row).await?);
        }
        Ok(out)
    }

    pub async fn retrieve(&self, tenant: &str, def: &'static ResourceDef, key: &Key) -> Result<Value, ApiError> {
        let row = self
            .store
            .find(tenant, def, key)
            .await?
            .ok_or_else(|| ApiError::not_found("Not found."))?;
        self.render(tenant, def, &row).await
    }

    pub async fn create(
        &self,
        tenant: &str,
        caller: Option<Key>,
        def: &'static ResourceDef,
        body: Value,
    ) -> Result<Value, ApiError> {
        let record = Record::from_input(def, body)?;
        let mut ctx = ObserverContext::new(Operation::Create, tenant, caller, self.store.clone(), None, record);
        self.pipeline.execute(&mut ctx).await?;

        let links = ctx.links.take().unwrap_or_default();
        let row = self.store.insert(tenant, def, ctx.record.into_fields(), &links).await?;
        tracing::info!("Created {} {}", def.table, Key::of(&row).map(|k| k.to_string()).unwrap_or_default());
        self.render(tenant, def, &row).await
    }

    /// PUT when `partial` is false, PATCH otherwise
    pub async fn update(
        &self,
        tenant: &str,
        caller: Option<Key>,
        def: &'static ResourceDef,
        key: &Key,
        body: Value,
        partial: bool,
    ) -> Result<Value, ApiError> {
        let operation = if partial { Operation::Patch } else { Operation::Update };
        let record = Record::from_input(def, body)?;
        let mut ctx = ObserverContext::new(operation, tenant, caller, self.store.clone(), Some(key.clone()), record);
        self.pipeline.execute(&mut ctx).await?;

        let links = ctx.links.take();
        let row = self
            .store
            .update(tenant, def, key, ctx.record.into_fields(), links.as_ref())
            .await?
            .ok_or_else(|| ApiError::not_found("Not found."))?;
        tracing::info!("Updated {} {}", def.table, key);
        self.render(tenant, def, &row).await
    }

    pub async fn destroy(&self, tenant: &str, def: &'static ResourceDef, key: &Key) -> Result<(), ApiError> {
        if !self.store.delete(tenant, def, key).await? {
            return Err(ApiError::not_found("Not found."));
        }
        tracing::info!("Deleted {} {}", def.table, key);
        Ok(())
    }

    /// Check credentials and return the stored user row
    pub async fn authenticate(&self, tenant: &str, username: &str, password: &str) -> Result<Row, ApiError> {
        let rejected = || ApiError::unauthorized("No active account found with the given credentials");
        let user = self
            .store
            .select(tenant, &USERS, &FilterData::matching(json!({ "username": username })))
            .await
            .map_err(|err| {
                if err.is_unknown_tenant() {
                    tracing::debug!("Token requested for unknown tenant {}", tenant);
                    rejected()
                } else {
                    ApiError::from(err)
                }
            })?
            .into_iter()
            .next()
            .ok_or_else(rejected)?;

        let hash = user.get("password").and_then(Value::as_str).unwrap_or_default();
        if !verify_password(password, hash) {
            tracing::debug!("Password mismatch for user {}", username);
            return Err(rejected());
        }
        Ok(user)
    }

    pub async fn ledger_summary(&self, tenant: &str, params: &HashMap<String, String>) -> Result<LedgerSummary, ApiError> {
        let rows = self.select_rows(tenant, &LEDGER, params).await?;

        let mut credit = Decimal::ZERO;
        let mut debit = Decimal::ZERO;
        for row in &rows {
            let amount = row
                .get("amount")
                .and_then(|v| value::decimal(v, 28, 2).ok())
                .unwrap_or(Decimal::ZERO);
            match row.get("ledger_type").and_then(Value::as_str).and_then(LedgerType::parse) {
                Some(LedgerType::Credit) => credit += amount,
                Some(LedgerType::Debit) => debit += amount,
                None => {}
            }
        }

        let fixed = |mut d: Decimal| {
            d.rescale(2);
            d.to_string()
        };
        Ok(LedgerSummary {
            total_credit: fixed(credit),
            total_debit: fixed(debit),
            balance: fixed(credit - debit),
            count: rows.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{DatabaseError, Links, MemoryStore, StoreError};
    use crate::schema::LinkDef;
    use crate::schema::registry::{CLIENT_PROFILES, ONBOARDING_ITEMS, PRODUCTS, TICKETS, PROJECTS};

    fn service() -> ResourceService {
        ResourceService::new(Arc::new(MemoryStore::new()), Arc::new(ObserverPipeline::with_default_observers()))
    }

    fn no_params() -> HashMap<String, String> {
        HashMap::new()
    }

    async fn client(service: &ResourceService) -> Value {
        service
            .create(
                "main",
                None,
                &CLIENT_PROFILES,
                json!({"company_name": "Acme", "cnpj": "12.345.678/0001-90", "responsible_name": "Ana", "responsible_phone": "11999990000"}),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn ticket_status_defaults_and_opened_by_is_caller() {
        let service = service();
        let user = service
            .create("main", None, &USERS, json!({"username": "ana", "password": "pw"}))
            .await
            .unwrap();
        assert!(user.get("password").is_none());
        let caller = Key::from_value(&user["id"]);

        let client = client(&service).await;
        let project = service
            .create("main", caller.clone(), &PROJECTS, json!({"title": "ERP", "project_type": "Assessoria", "client": client["id"]}))
            .await
            .unwrap();
        let ticket = service
            .create(
                "main",
                caller,
                &TICKETS,
                json!({"project": project["id"], "title": "Erro", "description": "x", "ticket_type": "Bug", "area": "Financeiro", "priority": "Alta"}),
            )
            .await
            .unwrap();
        assert_eq!(ticket["status"], json!("Aberto"));
        assert_eq!(ticket["opened_by"], user["id"]);
    }

    #[tokio::test]
    async fn backfills_product_name_once() {
        let service = service();
        let client = client(&service).await;
        let product = service
            .create(
                "main",
                None,
                &PRODUCTS,
                json!({"title": "BPO", "price": "100.00", "price_model": "monthly", "description": "d", "category": "Curso", "payment_methods": "pix"}),
            )
            .await
            .unwrap();
        let item = service
            .create(
                "main",
                None,
                &ONBOARDING_ITEMS,
                json!({"client": client["id"], "product": product["id"], "start_date": "2024-02-01"}),
            )
            .await
            .unwrap();
        assert_eq!(item["product_name"], json!("BPO"));

        let product_key = Key::from_value(&product["id"]).unwrap();
        service
            .update("main", None, &PRODUCTS, &product_key, json!({"title": "BPO Plus"}), true)
            .await
            .unwrap();
        let item_key = Key::from_value(&item["id"]).unwrap();
        let item = service
            .update("main", None, &ONBOARDING_ITEMS, &item_key, json!({"stage": "Concluído"}), true)
            .await
            .unwrap();
        assert_eq!(item["product_name"], json!("BPO"));
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let service = service();
        let err = service.retrieve("main", &PROJECTS, &Key::Int(404)).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
        let err = service
            .update("main", None, &PROJECTS, &Key::Int(404), json!({"title": "x"}), true)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(service.destroy("main", &PROJECTS, &Key::Int(404)).await.unwrap_err().status_code(), 404);
        assert!(service.list("main", &PROJECTS, &no_params()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn summarizes_ledger() {
        let service = service();
        for (kind, amount) in [("credit", "1000.00"), ("credit", "250.50"), ("debit", "300")] {
            service
                .create(
                    "main",
                    None,
                    &LEDGER,
                    json!({"ledger_type": kind, "amount": amount, "description": "x", "date": "2024-01-10"}),
                )
                .await
                .unwrap();
        }
        let summary = service.ledger_summary("main", &no_params()).await.unwrap();
        assert_eq!(summary.total_credit, "1250.50");
        assert_eq!(summary.total_debit, "300.00");
        assert_eq!(summary.balance, "950.50");
        assert_eq!(summary.count, 3);
    }

    #[tokio::test]
    async fn authenticates_with_hashed_password() {
        let service = service();
        service
            .create("main", None, &USERS, json!({"username": "ana", "password": "s3cret"}))
            .await
            .unwrap();
        assert!(service.authenticate("main", "ana", "s3cret").await.is_ok());
        assert_eq!(service.authenticate("main", "ana", "nope").await.unwrap_err().status_code(), 401);
        assert_eq!(service.authenticate("main", "bob", "s3cret").await.unwrap_err().status_code(), 401);
    }

    /// A backend where no tenant database has been created
    struct UnprovisionedStore;

    fn missing(tenant: &str) -> StoreError {
        StoreError::Database(DatabaseError::TenantNotFound(format!("tenant_{}", tenant)))
    }

    #[async_trait::async_trait]
    impl Store for UnprovisionedStore {
        async fn select(&self, tenant: &str, _: &'static ResourceDef, _: &FilterData) -> Result<Vec<Row>, StoreError> {
            Err(missing(tenant))
        }

        async fn find(&self, tenant: &str, _: &'static ResourceDef, _: &Key) -> Result<Option<Row>, StoreError> {
            Err(missing(tenant))
        }

        async fn insert(&self, tenant: &str, _: &'static ResourceDef, _: Row, _: &Links) -> Result<Row, StoreError> {
            Err(missing(tenant))
        }

        async fn update(
            &self,
            tenant: &str,
            _: &'static ResourceDef,
            _: &Key,
            _: Row,
            _: Option<&Links>,
        ) -> Result<Option<Row>, StoreError> {
            Err(missing(tenant))
        }

        async fn delete(&self, tenant: &str, _: &'static ResourceDef, _: &Key) -> Result<bool, StoreError> {
            Err(missing(tenant))
        }

        async fn links(&self, tenant: &str, _: &'static LinkDef, _: &Key) -> Result<Vec<Key>, StoreError> {
            Err(missing(tenant))
        }

        async fn provision(&self, tenant: &str) -> Result<(), StoreError> {
            Err(missing(tenant))
        }

        async fn health_check(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn unknown_tenant_is_rejected_like_bad_credentials() {
        let service = ResourceService::new(
            Arc::new(UnprovisionedStore),
            Arc::new(ObserverPipeline::with_default_observers()),
        );
        let err = service.authenticate("ghost", "ana", "s3cret").await.unwrap_err();
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.message(), "No active account found with the given credentials");

        let err = service.retrieve("ghost", &PROJECTS, &Key::Int(1)).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
