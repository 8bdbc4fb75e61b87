//! In-process [`Store`] used by tests and database-less development runs.
//!
//! Mirrors the constraints the Postgres schema enforces: unique columns,
//! foreign key existence, and the cascade and set-null rules on delete.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

use super::store::{Key, Links, Row, Store, StoreError};
use crate::filter::matcher;
use crate::filter::{Filter, FilterData};
use crate::schema::value::format_datetime;
use crate::schema::{Access, FieldKind, KeyKind, LinkDef, OnDelete, ResourceDef, RESOURCES};

#[derive(Debug, Default)]
struct TenantData {
    tables: HashMap<&'static str, BTreeMap<Key, Row>>,
    sequences: HashMap<&'static str, i64>,
    /// (owner, target) pairs per join table
    links: HashMap<&'static str, BTreeSet<(Key, Key)>>,
}

impl TenantData {
    fn table(&self, table: &str) -> Option<&BTreeMap<Key, Row>> {
        self.tables.get(table)
    }

    fn table_mut(&mut self, table: &'static str) -> &mut BTreeMap<Key, Row> {
        self.tables.entry(table).or_default()
    }

    fn contains(&self, table: &str, key: &Key) -> bool {
        self.table(table).is_some_and(|rows| rows.contains_key(key))
    }

    fn next_id(&mut self, table: &'static str) -> i64 {
        let next = self.sequences.entry(table).or_insert(0);
        *next += 1;
        *next
    }

    fn check_references(&self, def: &'static ResourceDef, row: &Row) -> Result<(), StoreError> {
        for field in def.fields {
            let Some(table) = field.foreign_table() else {
                continue;
            };
            let Some(key) = row.get(field.name).and_then(Key::from_value) else {
                continue;
            };
            if !self.contains(table, &key) {
                return Err(StoreError::ForeignKeyViolation(format!(
                    "{}.{} references missing {} {}",
                    def.table, field.name, table, key
                )));
            }
        }
        Ok(())
    }

    fn check_unique(&self, def: &'static ResourceDef, row: &Row, own_key: Option<&Key>) -> Result<(), StoreError> {
        let Some(rows) = self.table(def.table) else {
            return Ok(());
        };
        for field in def.fields.iter().filter(|f| f.unique) {
            let value = match row.get(field.name) {
                Some(Value::Null) | None => continue,
                Some(value) => value,
            };
            let taken = rows
                .iter()
                .any(|(key, other)| Some(key) != own_key && other.get(field.name) == Some(value));
            if taken {
                return Err(StoreError::UniqueViolation {
                    table: def.table.to_string(),
                    field: field.name.to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_link_targets(&self, def: &'static ResourceDef, links: &Links) -> Result<(), StoreError> {
        for link in def.links {
            for target in links.get(link.name).into_iter().flatten() {
                if !self.contains(link.target, target) {
                    return Err(StoreError::ForeignKeyViolation(format!(
                        "{} references missing {} {}",
                        link.join_table, link.target, target
                    )));
                }
            }
        }
        Ok(())
    }

    fn replace_links(&mut self, def: &'static ResourceDef, key: &Key, links: &Links) {
        for link in def.links {
            let Some(targets) = links.get(link.name) else {
                continue;
            };
            let pairs = self.links.entry(link.join_table).or_default();
            pairs.retain(|(owner, _)| owner != key);
            pairs.extend(targets.iter().map(|target| (key.clone(), target.clone())));
        }
    }

    /// Remove a row and apply the delete rules of every reference to it
    fn delete_cascade(&mut self, def: &'static ResourceDef, key: &Key) -> bool {
        if self.table_mut(def.table).remove(key).is_none() {
            return false;
        }

        for owner in RESOURCES {
            for link in owner.links {
                if let Some(pairs) = self.links.get_mut(link.join_table) {
                    if owner.table == def.table {
                        pairs.retain(|(o, _)| o != key);
                    }
                    if link.target == def.table {
                        pairs.retain(|(_, t)| t != key);
                    }
                }
            }
        }

        let target = key.to_value();
        for (child_def, field) in def.referencing_fields() {
            let on_delete = match field.kind {
                FieldKind::ForeignKey { on_delete, .. } => on_delete,
                _ => continue,
            };
            let children: Vec<Key> = self
                .table(child_def.table)
                .map(|rows| {
                    rows.iter()
                        .filter(|(_, row)| row.get(field.name) == Some(&target))
                        .map(|(k, _)| k.clone())
                        .collect()
                })
                .unwrap_or_default();

            for child in children {
                match on_delete {
                    OnDelete::Cascade => {
                        self.delete_cascade(child_def, &child);
                    }
                    OnDelete::SetNull => {
                        if let Some(row) = self.table_mut(child_def.table).get_mut(&child) {
                            row.insert(field.name.to_string(), Value::Null);
                        }
                    }
                }
            }
        }
        true
    }
}

/// Column defaults applied for fields missing from an inserted row
fn fill_defaults(def: &'static ResourceDef, row: &mut Row) {
    let now = Utc::now();
    for field in def.fields {
        if row.contains_key(field.name) {
            continue;
        }
        let value = match field.access {
            Access::AutoCreate | Access::AutoUpdate => match field.kind {
                FieldKind::Date => Value::String(now.date_naive().format("%Y-%m-%d").to_string()),
                _ => Value::String(format_datetime(now)),
            },
            Access::ReadWrite | Access::WriteOnly => match field.default.to_value() {
                Some(value) => value,
                None if field.nullable => Value::Null,
                None if field.kind.is_textual() => Value::String(String::new()),
                None => Value::Null,
            },
        };
        row.insert(field.name.to_string(), value);
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tenants: RwLock<HashMap<String, TenantData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn select(&self, tenant: &str, def: &'static ResourceDef, filter: &FilterData) -> Result<Vec<Row>, StoreError> {
        // Same validation the SQL path applies
        let mut builder = Filter::new(def)?;
        builder.assign(filter.clone())?;
        builder.to_sql()?;

        let tenants = self.tenants.read().await;
        let Some(rows) = tenants.get(tenant).and_then(|data| data.table(def.table)) else {
            return Ok(Vec::new());
        };

        let where_clause = filter.where_clause.clone().unwrap_or(Value::Null);
        let mut selected = Vec::new();
        for row in rows.values() {
            if matcher::matches(&where_clause, row)? {
                selected.push(row.clone());
            }
        }
        let orders = builder.order_infos();
        selected.sort_by(|a, b| matcher::compare_rows(a, b, &orders));
        Ok(selected)
    }

    async fn find(&self, tenant: &str, def: &'static ResourceDef, key: &Key) -> Result<Option<Row>, StoreError> {
        let tenants = self.tenants.read().await;
        Ok(tenants
            .get(tenant)
            .and_then(|data| data.table(def.table))
            .and_then(|rows| rows.get(key))
            .cloned())
    }

    async fn insert(&self, tenant: &str, def: &'static ResourceDef, mut row: Row, links: &Links) -> Result<Row, StoreError> {
        let mut tenants = self.tenants.write().await;
        let data = tenants.entry(tenant.to_string()).or_default();

        fill_defaults(def, &mut row);
        data.check_references(def, &row)?;
        data.check_unique(def, &row, None)?;
        data.check_link_targets(def, links)?;

        let key = match def.key {
            KeyKind::Serial => Key::Int(data.next_id(def.table)),
            KeyKind::Supplied { .. } => {
                let key = Key::of(&row).ok_or_else(|| StoreError::UniqueViolation {
                    table: def.table.to_string(),
                    field: "id".to_string(),
                })?;
                if data.contains(def.table, &key) {
                    return Err(StoreError::UniqueViolation {
                        table: def.table.to_string(),
                        field: "id".to_string(),
                    });
                }
                key
            }
        };
        row.insert("id".to_string(), key.to_value());

        data.table_mut(def.table).insert(key.clone(), row.clone());
        data.replace_links(def, &key, links);
        Ok(row)
    }

    async fn update(
        &self,
        tenant: &str,
        def: &'static ResourceDef,
        key: &Key,
        row: Row,
        links: Option<&Links>,
    ) -> Result<Option<Row>, StoreError> {
        let mut tenants = self.tenants.write().await;
        let data = tenants.entry(tenant.to_string()).or_default();

        let Some(mut updated) = data.table(def.table).and_then(|rows| rows.get(key)).cloned() else {
            return Ok(None);
        };
        for (column, value) in row {
            if column != "id" {
                updated.insert(column, value);
            }
        }

        data.check_references(def, &updated)?;
        data.check_unique(def, &updated, Some(key))?;
        if let Some(links) = links {
            data.check_link_targets(def, links)?;
        }

        data.table_mut(def.table).insert(key.clone(), updated.clone());
        if let Some(links) = links {
            data.replace_links(def, key, links);
        }
        Ok(Some(updated))
    }

    async fn delete(&self, tenant: &str, def: &'static ResourceDef, key: &Key) -> Result<bool, StoreError> {
        let mut tenants = self.tenants.write().await;
        Ok(tenants
            .get_mut(tenant)
            .map(|data| data.delete_cascade(def, key))
            .unwrap_or(false))
    }

    async fn links(&self, tenant: &str, link: &'static LinkDef, key: &Key) -> Result<Vec<Key>, StoreError> {
        let tenants = self.tenants.read().await;
        Ok(tenants
            .get(tenant)
            .and_then(|data| data.links.get(link.join_table))
            .map(|pairs| {
                pairs
                    .iter()
                    .filter(|(owner, _)| owner == key)
                    .map(|(_, target)| target.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn provision(&self, tenant: &str) -> Result<(), StoreError> {
        let mut tenants = self.tenants.write().await;
        let data = tenants.entry(tenant.to_string()).or_default();
        for def in RESOURCES {
            data.table_mut(def.table);
        }
        tracing::debug!("Provisioned in-memory tenant {}", tenant);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::registry::{CLIENT_PROFILES, PERMISSIONS, PROJECTS, PROJECT_NOTES, ROLES, USERS};
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    async fn client(store: &MemoryStore, name: &str) -> Key {
        let inserted = store
            .insert("t", &CLIENT_PROFILES, row(json!({"company_name": name, "cnpj": name})), &Links::new())
            .await
            .unwrap();
        Key::of(&inserted).unwrap()
    }

    #[tokio::test]
    async fn assigns_serial_keys_and_defaults() {
        let store = MemoryStore::new();
        let key = client(&store, "Acme").await;
        assert_eq!(key, Key::Int(1));
        let stored = store.find("t", &CLIENT_PROFILES, &key).await.unwrap().unwrap();
        assert_eq!(stored.get("status"), Some(&json!("Ativo")));
        assert_eq!(client(&store, "Beta").await, Key::Int(2));
    }

    #[tokio::test]
    async fn rejects_missing_references() {
        let store = MemoryStore::new();
        let err = store
            .insert("t", &PROJECTS, row(json!({"title": "x", "project_type": "Assessoria", "client": 9})), &Links::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation(_)));
    }

    #[tokio::test]
    async fn enforces_unique_columns() {
        let store = MemoryStore::new();
        store.insert("t", &USERS, row(json!({"username": "ana"})), &Links::new()).await.unwrap();
        let err = store.insert("t", &USERS, row(json!({"username": "ana"})), &Links::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { ref field, .. } if field == "username"));
    }

    #[tokio::test]
    async fn delete_cascades_and_nulls_references() {
        let store = MemoryStore::new();
        let client = client(&store, "Acme").await;
        let user = store.insert("t", &USERS, row(json!({"username": "ana"})), &Links::new()).await.unwrap();
        let user = Key::of(&user).unwrap();
        let project = store
            .insert(
                "t",
                &PROJECTS,
                row(json!({"title": "ERP", "project_type": "Assessoria", "client": client.to_value(), "manager": user.to_value()})),
                &Links::new(),
            )
            .await
            .unwrap();
        let project = Key::of(&project).unwrap();
        store
            .insert("t", &PROJECT_NOTES, row(json!({"project": project.to_value(), "text": "x", "note_type": "internal"})), &Links::new())
            .await
            .unwrap();

        assert!(store.delete("t", &USERS, &user).await.unwrap());
        let stored = store.find("t", &PROJECTS, &project).await.unwrap().unwrap();
        assert_eq!(stored.get("manager"), Some(&Value::Null));

        assert!(store.delete("t", &CLIENT_PROFILES, &client).await.unwrap());
        assert!(store.find("t", &PROJECTS, &project).await.unwrap().is_none());
        assert!(store.select("t", &PROJECT_NOTES, &FilterData::default()).await.unwrap().is_empty());
        assert!(!store.delete("t", &CLIENT_PROFILES, &client).await.unwrap());
    }

    #[tokio::test]
    async fn replaces_link_rows() {
        let store = MemoryStore::new();
        for codename in ["view_project", "edit_project"] {
            store
                .insert("t", &PERMISSIONS, row(json!({"key": codename, "label": codename, "module": "projects"})), &Links::new())
                .await
                .unwrap();
        }
        let mut links = Links::new();
        links.insert("permissions", [Key::Int(2), Key::Int(1)].into_iter().collect());
        store.insert("t", &ROLES, row(json!({"id": "admin", "name": "Admin"})), &links).await.unwrap();

        let admin = Key::Str("admin".into());
        assert_eq!(store.links("t", &ROLES.links[0], &admin).await.unwrap(), vec![Key::Int(1), Key::Int(2)]);

        store.delete("t", &PERMISSIONS, &Key::Int(1)).await.unwrap();
        assert_eq!(store.links("t", &ROLES.links[0], &admin).await.unwrap(), vec![Key::Int(2)]);
    }

    #[tokio::test]
    async fn selects_with_filters_in_key_order() {
        let store = MemoryStore::new();
        client(&store, "Beta").await;
        client(&store, "Acme").await;
        let rows = store
            .select("t", &CLIENT_PROFILES, &FilterData::matching(json!({"company_name": {"$ilike": "%a%"}})))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("company_name"), Some(&json!("Beta")));
    }
}
