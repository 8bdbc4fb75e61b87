//! Output representation of stored rows, including read-only projections.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};

use crate::database::store::{Key, Row, Store, StoreError};
use crate::filter::FilterData;
use crate::schema::{find_by_table, value, Projection, ResourceDef};

/// Nested representations stop expanding projections past this depth
const MAX_DEPTH: u8 = 2;

/// Rendered representation of `row`: columns, link keys, then projections
pub fn render<'a>(
    store: &'a dyn Store,
    tenant: &'a str,
    def: &'static ResourceDef,
    row: &'a Row,
    depth: u8,
) -> BoxFuture<'a, Result<Value, StoreError>> {
    async move {
        let mut out = Map::new();
        out.insert("id".to_string(), row.get("id").cloned().unwrap_or(Value::Null));
        for field in def.fields.iter().filter(|f| f.is_rendered()) {
            let stored = row.get(field.name).unwrap_or(&Value::Null);
            out.insert(field.name.to_string(), value::render(field, stored));
        }

        let key = Key::of(row);
        if let Some(key) = &key {
            for link in def.links {
                let targets = store.links(tenant, link, key).await?;
                out.insert(link.name.to_string(), targets.iter().map(Key::to_value).collect());
            }
        }

        if depth < MAX_DEPTH {
            for projection in def.projections {
                let (name, projected) = project(store, tenant, def, row, key.as_ref(), projection, depth).await?;
                out.insert(name.to_string(), projected);
            }
        }

        Ok(Value::Object(out))
    }
    .boxed()
}

async fn referenced(
    store: &dyn Store,
    tenant: &str,
    def: &'static ResourceDef,
    row: &Row,
    column: &str,
) -> Result<Option<(&'static ResourceDef, Row)>, StoreError> {
    let Some(target) = def.field(column).and_then(|f| f.foreign_table()).and_then(find_by_table) else {
        return Ok(None);
    };
    let Some(key) = row.get(column).and_then(Key::from_value) else {
        return Ok(None);
    };
    Ok(store.find(tenant, target, &key).await?.map(|found| (target, found)))
}

async fn project(
    store: &dyn Store,
    tenant: &str,
    def: &'static ResourceDef,
    row: &Row,
    key: Option<&Key>,
    projection: &Projection,
    depth: u8,
) -> Result<(&'static str, Value), StoreError> {
    match *projection {
        Projection::Detail { name, column } => {
            let value = match referenced(store, tenant, def, row, column).await? {
                Some((target, found)) => render(store, tenant, target, &found, depth + 1).await?,
                None => Value::Null,
            };
            Ok((name, value))
        }
        Projection::Label { name, column, field } => {
            let value = referenced(store, tenant, def, row, column)
                .await?
                .and_then(|(_, found)| found.get(field).cloned())
                .unwrap_or(Value::Null);
            Ok((name, value))
        }
        Projection::Children { name, table, column } => {
            let (Some(child_def), Some(key)) = (find_by_table(table), key) else {
                return Ok((name, Value::Array(Vec::new())));
            };
            let children = store.select(tenant, child_def, &FilterData::children_of(column, key)).await?;
            let mut rendered = Vec::with_capacity(children.len());
            for child in &children {
                rendered.push(render(store, tenant, child_def, child, depth + 1).await?);
            }
            Ok((name, Value::Array(rendered)))
        }
        Projection::LinkDetails { name, link } => {
            let (Some(link_def), Some(key)) = (def.link(link), key) else {
                return Ok((name, Value::Array(Vec::new())));
            };
            let Some(target) = find_by_table(link_def.target) else {
                return Ok((name, Value::Array(Vec::new())));
            };
            let mut rendered = Vec::new();
            for target_key in store.links(tenant, link_def, key).await? {
                if let Some(found) = store.find(tenant, target, &target_key).await? {
                    rendered.push(render(store, tenant, target, &found, depth + 1).await?);
                }
            }
            Ok((name, Value::Array(rendered)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::store::Links;
    use crate::database::MemoryStore;
    use crate::schema::registry::{USERS, CLIENT_PROFILES, PROJECTS};
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn hides_passwords_and_expands_projections() {
        let store = MemoryStore::new();
        let user = store
            .insert("t", &USERS, row(json!({"username": "ana", "password": "$argon2id$x"})), &Links::new())
            .await
            .unwrap();
        let client = store
            .insert("t", &CLIENT_PROFILES, row(json!({"company_name": "Acme", "cnpj": "1"})), &Links::new())
            .await
            .unwrap();
        let project = store
            .insert(
                "t",
                &PROJECTS,
                row(json!({"title": "ERP", "project_type": "Assessoria", "client": client["id"], "manager": user["id"], "hours_sold": 12.5})),
                &Links::new(),
            )
            .await
            .unwrap();

        let rendered = render(&store, "t", &PROJECTS, &project, 0).await.unwrap();
        assert_eq!(rendered["client_details"]["company_name"], json!("Acme"));
        assert_eq!(rendered["manager_details"]["username"], json!("ana"));
        assert!(rendered["manager_details"].get("password").is_none());
        assert_eq!(rendered["specialist_details"], Value::Null);
        assert_eq!(rendered["meetings"], json!([]));
        assert_eq!(rendered["hours_sold"], json!("12.50"));
    }
}
