//! CREATE TABLE generation from resource descriptors.

use super::{registry, Access, FieldDef, FieldDefault, FieldKind, KeyKind, LinkDef, ResourceDef, RESOURCES};

/// Quote an identifier for Postgres
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn key_type(key: KeyKind) -> String {
    match key {
        KeyKind::Serial => "BIGINT".to_string(),
        KeyKind::Supplied { max } => format!("VARCHAR({})", max),
    }
}

fn column_type(field: &FieldDef) -> String {
    match field.kind {
        FieldKind::Text { max: Some(max) } => format!("VARCHAR({})", max),
        FieldKind::Text { max: None } => "TEXT".to_string(),
        FieldKind::Email => "VARCHAR(254)".to_string(),
        FieldKind::Url { max } => format!("VARCHAR({})", max),
        FieldKind::Integer => "BIGINT".to_string(),
        FieldKind::Decimal { digits, places } => format!("NUMERIC({}, {})", digits, places),
        FieldKind::Bool => "BOOLEAN".to_string(),
        FieldKind::Date => "DATE".to_string(),
        FieldKind::DateTime => "TIMESTAMPTZ".to_string(),
        FieldKind::Choice(_) => "VARCHAR(50)".to_string(),
        FieldKind::Password => "VARCHAR(255)".to_string(),
        FieldKind::ForeignKey { table, .. } => match registry::find_by_table(table) {
            Some(target) => key_type(target.key),
            None => "BIGINT".to_string(),
        },
    }
}

fn column_default(field: &FieldDef) -> Option<String> {
    match field.access {
        Access::AutoCreate | Access::AutoUpdate => {
            return Some(match field.kind {
                FieldKind::Date => "CURRENT_DATE".to_string(),
                _ => "now()".to_string(),
            })
        }
        Access::ReadWrite | Access::WriteOnly => {}
    }
    match field.default {
        FieldDefault::Str(s) | FieldDefault::Decimal(s) => Some(quote_literal(s)),
        FieldDefault::Int(i) => Some(i.to_string()),
        FieldDefault::Bool(b) => Some(b.to_string()),
        FieldDefault::None | FieldDefault::Caller => {
            if !field.nullable && field.kind.is_textual() {
                Some("''".to_string())
            } else {
                None
            }
        }
    }
}

fn column_definition(field: &FieldDef) -> String {
    let mut parts = vec![quote_ident(field.name), column_type(field)];
    if !field.nullable {
        parts.push("NOT NULL".to_string());
    }
    if let Some(default) = column_default(field) {
        parts.push(format!("DEFAULT {}", default));
    }
    if field.unique {
        parts.push("UNIQUE".to_string());
    }
    if let FieldKind::ForeignKey { table, on_delete } = field.kind {
        parts.push(format!("REFERENCES {}(\"id\") ON DELETE {}", quote_ident(table), on_delete.to_sql()));
    }
    parts.join(" ")
}

/// CREATE TABLE statement for one resource
pub fn create_table(def: &ResourceDef) -> String {
    let id_column = match def.key {
        KeyKind::Serial => "\"id\" BIGSERIAL PRIMARY KEY".to_string(),
        KeyKind::Supplied { max } => format!("\"id\" VARCHAR({}) PRIMARY KEY", max),
    };

    let mut columns = vec![id_column];
    columns.extend(def.fields.iter().map(column_definition));

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        quote_ident(def.table),
        columns.join(",\n    ")
    )
}

/// CREATE TABLE statement for a many-to-many join table
pub fn create_link_table(owner: &ResourceDef, link: &LinkDef) -> String {
    let target_key = registry::find_by_table(link.target)
        .map(|t| key_type(t.key))
        .unwrap_or_else(|| "BIGINT".to_string());

    format!(
        "CREATE TABLE IF NOT EXISTS {join} (\n    {owner_col} {owner_type} NOT NULL REFERENCES {owner}(\"id\") ON DELETE CASCADE,\n    {target_col} {target_type} NOT NULL REFERENCES {target}(\"id\") ON DELETE CASCADE,\n    PRIMARY KEY ({owner_col}, {target_col})\n)",
        join = quote_ident(link.join_table),
        owner_col = quote_ident(link.owner_column),
        owner_type = key_type(owner.key),
        owner = quote_ident(owner.table),
        target_col = quote_ident(link.target_column),
        target_type = target_key,
        target = quote_ident(link.target),
    )
}

/// Full schema for one tenant database, in dependency order
pub fn statements() -> Vec<String> {
    let mut out = Vec::new();
    for def in RESOURCES {
        out.push(create_table(def));
    }
    for def in RESOURCES {
        for link in def.links {
            out.push(create_link_table(def, link));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::registry::{ACTIVITIES, PROJECTS, ROLES, TICKETS};

    #[test]
    fn generates_cascade_and_set_null_references() {
        let sql = create_table(&PROJECTS);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"projects\""));
        assert!(sql.contains("\"client\" BIGINT NOT NULL REFERENCES \"client_profiles\"(\"id\") ON DELETE CASCADE"));
        assert!(sql.contains("\"manager\" BIGINT REFERENCES \"users\"(\"id\") ON DELETE SET NULL"));
        assert!(sql.contains("\"code\" VARCHAR(50) UNIQUE"));
        assert!(sql.contains("\"hours_sold\" NUMERIC(10, 2) NOT NULL DEFAULT '0.00'"));
    }

    #[test]
    fn optional_parent_reference_is_nullable() {
        let sql = create_table(&ACTIVITIES);
        assert!(sql.contains("\"deal\" BIGINT REFERENCES \"deals\"(\"id\") ON DELETE CASCADE"));
    }

    #[test]
    fn defaults_and_timestamps() {
        let sql = create_table(&TICKETS);
        assert!(sql.contains("\"status\" VARCHAR(50) NOT NULL DEFAULT 'Aberto'"));
        assert!(sql.contains("\"created_at\" TIMESTAMPTZ NOT NULL DEFAULT now()"));
        assert!(sql.contains("\"sla_deadline\" TIMESTAMPTZ,") || sql.contains("\"sla_deadline\" TIMESTAMPTZ\n"));
    }

    #[test]
    fn role_key_and_join_table() {
        assert!(create_table(&ROLES).contains("\"id\" VARCHAR(50) PRIMARY KEY"));
        let join = create_link_table(&ROLES, &ROLES.links[0]);
        assert!(join.contains("\"role\" VARCHAR(50) NOT NULL REFERENCES \"roles\"(\"id\") ON DELETE CASCADE"));
        assert!(join.contains("\"permission\" BIGINT NOT NULL REFERENCES \"system_permissions\"(\"id\") ON DELETE CASCADE"));
        assert!(join.contains("PRIMARY KEY (\"role\", \"permission\")"));
    }

    #[test]
    fn statements_cover_every_table() {
        let all = statements();
        assert_eq!(all.len(), RESOURCES.len() + 1);
        assert!(all.last().map(|s| s.contains("role_permissions")).unwrap_or(false));
    }
}
