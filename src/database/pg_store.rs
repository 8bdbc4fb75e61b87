//! Postgres-backed [`Store`], one database per tenant.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};

use super::manager::DatabaseManager;
use super::store::{Key, Links, Row, Store, StoreError};
use crate::config::config;
use crate::filter::{Filter, FilterData};
use crate::schema::ddl::{self, quote_ident};
use crate::schema::value::scalar_text;
use crate::schema::{KeyKind, LinkDef, ResourceDef};

#[derive(Debug, Default, Clone, Copy)]
pub struct PgStore;

impl PgStore {
    pub fn new() -> Self {
        Self
    }

    async fn pool(&self, tenant: &str) -> Result<PgPool, StoreError> {
        Ok(DatabaseManager::tenant_pool(tenant).await?)
    }

    fn log_query(sql: &str, params: usize) {
        if config().database.enable_query_logging {
            tracing::debug!(params, "SQL: {}", sql);
        }
    }

    /// Run a row-returning statement; every parameter is bound as text and cast in SQL
    async fn fetch_rows<'e, E>(executor: E, sql: &'e str, params: &[Value]) -> Result<Vec<Row>, StoreError>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        Self::log_query(sql, params.len());
        let mut query = sqlx::query_scalar::<_, Value>(sql);
        for param in params {
            query = query.bind(scalar_text(param));
        }
        let rows = query.fetch_all(executor).await?;
        Ok(rows.into_iter().filter_map(|row| row.as_object().cloned()).collect())
    }

    async fn execute<'e, E>(executor: E, sql: &'e str, params: &[Value]) -> Result<u64, StoreError>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        Self::log_query(sql, params.len());
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(scalar_text(param));
        }
        Ok(query.execute(executor).await?.rows_affected())
    }

    fn writable_columns<'a>(def: &'static ResourceDef, row: &'a Row) -> Vec<(&'static str, &'static str, &'a Value)> {
        let mut columns = Vec::new();
        if matches!(def.key, KeyKind::Supplied { .. }) {
            if let Some(id) = row.get("id") {
                columns.push(("id", "text", id));
            }
        }
        for field in def.fields {
            if let Some(value) = row.get(field.name) {
                columns.push((field.name, field.kind.sql_cast(), value));
            }
        }
        columns
    }

    fn key_cast(def: &ResourceDef) -> &'static str {
        def.column_cast("id").unwrap_or("bigint")
    }

    async fn replace_links(
        tx: &mut Transaction<'_, Postgres>,
        def: &'static ResourceDef,
        key: &Key,
        links: &Links,
    ) -> Result<(), StoreError> {
        for link in def.links {
            let Some(targets) = links.get(link.name) else {
                continue;
            };
            let owner_cast = Self::key_cast(def);
            let target_cast = crate::schema::find_by_table(link.target)
                .map(Self::key_cast)
                .unwrap_or("bigint");

            let delete = format!(
                "DELETE FROM {} WHERE {} = $1::{}",
                quote_ident(link.join_table),
                quote_ident(link.owner_column),
                owner_cast
            );
            Self::execute(&mut **tx, &delete, &[key.to_value()]).await?;

            let insert = format!(
                "INSERT INTO {} ({}, {}) VALUES ($1::{}, $2::{})",
                quote_ident(link.join_table),
                quote_ident(link.owner_column),
                quote_ident(link.target_column),
                owner_cast,
                target_cast
            );
            for target in targets {
                Self::execute(&mut **tx, &insert, &[key.to_value(), target.to_value()]).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn select(&self, tenant: &str, def: &'static ResourceDef, filter: &FilterData) -> Result<Vec<Row>, StoreError> {
        let mut builder = Filter::new(def)?;
        builder.assign(filter.clone())?;
        let sql = builder.to_sql()?;
        let pool = self.pool(tenant).await?;
        Self::fetch_rows(&pool, &sql.query, &sql.params).await
    }

    async fn find(&self, tenant: &str, def: &'static ResourceDef, key: &Key) -> Result<Option<Row>, StoreError> {
        Ok(self.select(tenant, def, &FilterData::by_key(key)).await?.into_iter().next())
    }

    async fn insert(&self, tenant: &str, def: &'static ResourceDef, row: Row, links: &Links) -> Result<Row, StoreError> {
        let columns = Self::writable_columns(def, &row);
        let sql = if columns.is_empty() {
            format!("INSERT INTO {} AS t DEFAULT VALUES RETURNING row_to_json(t) AS row", quote_ident(def.table))
        } else {
            let names: Vec<String> = columns.iter().map(|(name, _, _)| quote_ident(name)).collect();
            let placeholders: Vec<String> = columns
                .iter()
                .enumerate()
                .map(|(i, (_, cast, _))| format!("${}::{}", i + 1, cast))
                .collect();
            format!(
                "INSERT INTO {} AS t ({}) VALUES ({}) RETURNING row_to_json(t) AS row",
                quote_ident(def.table),
                names.join(", "),
                placeholders.join(", ")
            )
        };
        let params: Vec<Value> = columns.iter().map(|(_, _, value)| (*value).clone()).collect();

        let pool = self.pool(tenant).await?;
        let mut tx = pool.begin().await?;
        let inserted = Self::fetch_rows(&mut *tx, &sql, &params)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Database(super::DatabaseError::QueryError("INSERT returned no row".into())))?;
        if let Some(key) = Key::of(&inserted) {
            Self::replace_links(&mut tx, def, &key, links).await?;
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn update(
        &self,
        tenant: &str,
        def: &'static ResourceDef,
        key: &Key,
        row: Row,
        links: Option<&Links>,
    ) -> Result<Option<Row>, StoreError> {
        let columns: Vec<_> = Self::writable_columns(def, &row)
            .into_iter()
            .filter(|(name, _, _)| *name != "id")
            .collect();

        let pool = self.pool(tenant).await?;
        let mut tx = pool.begin().await?;

        let updated = if columns.is_empty() {
            let mut builder = Filter::new(def)?;
            builder.assign(FilterData::by_key(key))?;
            let sql = builder.to_sql()?;
            Self::fetch_rows(&mut *tx, &sql.query, &sql.params).await?
        } else {
            let assignments: Vec<String> = columns
                .iter()
                .enumerate()
                .map(|(i, (name, cast, _))| format!("{} = ${}::{}", quote_ident(name), i + 1, cast))
                .collect();
            let sql = format!(
                "UPDATE {} AS t SET {} WHERE \"id\" = ${}::{} RETURNING row_to_json(t) AS row",
                quote_ident(def.table),
                assignments.join(", "),
                columns.len() + 1,
                Self::key_cast(def)
            );
            let mut params: Vec<Value> = columns.iter().map(|(_, _, value)| (*value).clone()).collect();
            params.push(key.to_value());
            Self::fetch_rows(&mut *tx, &sql, &params).await?
        };

        let Some(updated) = updated.into_iter().next() else {
            return Ok(None);
        };
        if let Some(links) = links {
            Self::replace_links(&mut tx, def, key, links).await?;
        }
        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn delete(&self, tenant: &str, def: &'static ResourceDef, key: &Key) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {} WHERE \"id\" = $1::{}", quote_ident(def.table), Self::key_cast(def));
        let pool = self.pool(tenant).await?;
        Ok(Self::execute(&pool, &sql, &[key.to_value()]).await? > 0)
    }

    async fn links(&self, tenant: &str, link: &'static LinkDef, key: &Key) -> Result<Vec<Key>, StoreError> {
        let owner_cast = crate::schema::RESOURCES
            .iter()
            .find(|def| def.links.iter().any(|l| l.join_table == link.join_table))
            .map(|def| Self::key_cast(def))
            .unwrap_or("bigint");
        let sql = format!(
            "SELECT to_json({target}) AS target FROM {join} WHERE {owner} = $1::{cast} ORDER BY {target}",
            target = quote_ident(link.target_column),
            join = quote_ident(link.join_table),
            owner = quote_ident(link.owner_column),
            cast = owner_cast,
        );
        let pool = self.pool(tenant).await?;
        Self::log_query(&sql, 1);
        let targets: Vec<Value> = sqlx::query_scalar(&sql)
            .bind(scalar_text(&key.to_value()))
            .fetch_all(&pool)
            .await?;
        Ok(targets.iter().filter_map(Key::from_value).collect())
    }

    async fn provision(&self, tenant: &str) -> Result<(), StoreError> {
        DatabaseManager::create_tenant_database(tenant).await?;
        let pool = self.pool(tenant).await?;
        for statement in ddl::statements() {
            Self::log_query(&statement, 0);
            sqlx::query(&statement).execute(&pool).await?;
        }
        tracing::info!("Provisioned schema for tenant {}", tenant);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(DatabaseManager::health_check().await?)
    }
}
