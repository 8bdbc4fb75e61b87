//! Conversion between wire values and the canonical stored form.
//!
//! Stored values: integers and serial keys as JSON numbers, decimals as
//! strings with the field's scale, dates as `YYYY-MM-DD`, datetimes as
//! RFC 3339 in UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use super::{registry, FieldDef, FieldKind, KeyKind};
use crate::database::store::Key;

/// Canonical text of a scalar, used for comparisons and SQL parameters
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

fn as_text(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err("Not a valid string.".to_string()),
    }
}

fn check_length(text: &str, max: usize) -> Result<(), String> {
    if text.chars().count() > max {
        return Err(format!("Ensure this field has no more than {} characters.", max));
    }
    Ok(())
}

fn is_email(text: &str) -> bool {
    let mut parts = text.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !text.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}

fn is_url(text: &str) -> bool {
    match url::Url::parse(text) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https" | "ftp" | "ftps") && parsed.host_str().is_some(),
        Err(_) => false,
    }
}

/// Parse a decimal and fix it to `places`, enforcing the column's precision
pub fn decimal(value: &Value, digits: u32, places: u32) -> Result<Decimal, String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return Err("A valid number is required.".to_string()),
    };
    let mut parsed = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| "A valid number is required.".to_string())?;

    if parsed.normalize().scale() > places {
        return Err(format!("Ensure that there are no more than {} decimal places.", places));
    }
    parsed.rescale(places);
    let whole_digits = parsed.trunc().abs().to_string().trim_start_matches('0').len() as u32;
    if whole_digits > digits - places {
        return Err(format!(
            "Ensure that there are no more than {} digits before the decimal point.",
            digits - places
        ));
    }
    Ok(parsed)
}

fn boolean(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_i64() == Some(1) => Ok(true),
        Value::Number(n) if n.as_i64() == Some(0) => Ok(false),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err("Must be a valid boolean.".to_string()),
        },
        _ => Err("Must be a valid boolean.".to_string()),
    }
}

fn integer(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or_else(|| "A valid integer is required.".to_string()),
        Value::String(s) => s.trim().parse().map_err(|_| "A valid integer is required.".to_string()),
        _ => Err("A valid integer is required.".to_string()),
    }
}

fn date(value: &Value) -> Result<NaiveDate, String> {
    let message = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";
    let text = value.as_str().ok_or_else(|| message.to_string())?.trim();
    // Postgres and clients may send a full timestamp for a date column
    let head = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").map_err(|_| message.to_string())
}

/// Datetimes without an offset are taken as UTC
pub fn datetime(value: &Value) -> Result<DateTime<Utc>, String> {
    let message = "Datetime has wrong format. Use one of these formats instead: YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z].";
    let text = value.as_str().ok_or_else(|| message.to_string())?.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    // Postgres JSON renders offsets as +00:00 but may drop the minutes
    if let Ok(parsed) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%#z") {
        return Ok(parsed.with_timezone(&Utc));
    }
    Err(message.to_string())
}

pub fn format_datetime(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Convert a wire value into a key for a resource with the given key kind
pub fn key(kind: KeyKind, value: &Value) -> Result<Key, String> {
    match (kind, value) {
        (KeyKind::Serial, Value::Number(n)) => n
            .as_i64()
            .map(Key::Int)
            .ok_or_else(|| format!("Incorrect type. Expected pk value, received {}.", type_name(value))),
        (KeyKind::Serial, Value::String(s)) => s
            .trim()
            .parse()
            .map(Key::Int)
            .map_err(|_| "Incorrect type. Expected pk value, received str.".to_string()),
        (KeyKind::Supplied { .. }, Value::String(s)) if !s.is_empty() => Ok(Key::Str(s.clone())),
        (KeyKind::Supplied { .. }, Value::Number(n)) => Ok(Key::Str(n.to_string())),
        _ => Err(format!("Incorrect type. Expected pk value, received {}.", type_name(value))),
    }
}

/// Validate and convert an input value to its stored form
pub fn normalize(field: &FieldDef, value: &Value) -> Result<Value, String> {
    if value.is_null() {
        return if field.nullable {
            Ok(Value::Null)
        } else {
            Err("This field may not be null.".to_string())
        };
    }

    match field.kind {
        FieldKind::Text { max } => {
            let text = as_text(value)?;
            if let Some(max) = max {
                check_length(&text, max)?;
            }
            // Blank on a nullable unique column means "no value"
            if text.is_empty() && field.nullable && field.unique {
                return Ok(Value::Null);
            }
            Ok(Value::String(text))
        }
        FieldKind::Email => {
            let text = as_text(value)?;
            if !text.is_empty() && !is_email(&text) {
                return Err("Enter a valid email address.".to_string());
            }
            check_length(&text, 254)?;
            Ok(Value::String(text))
        }
        FieldKind::Url { max } => {
            let text = as_text(value)?;
            if !text.is_empty() && !is_url(&text) {
                return Err("Enter a valid URL.".to_string());
            }
            check_length(&text, max)?;
            Ok(Value::String(text))
        }
        FieldKind::Password => Ok(Value::String(as_text(value)?)),
        FieldKind::Integer => integer(value).map(Value::from),
        FieldKind::Decimal { digits, places } => decimal(value, digits, places).map(|d| Value::String(d.to_string())),
        FieldKind::Bool => boolean(value).map(Value::Bool),
        FieldKind::Date => date(value).map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        FieldKind::DateTime => datetime(value).map(|dt| Value::String(format_datetime(dt))),
        FieldKind::Choice(values) => {
            let text = as_text(value)?;
            if values.contains(&text.as_str()) {
                Ok(Value::String(text))
            } else {
                Err(format!("\"{}\" is not a valid choice.", text))
            }
        }
        FieldKind::ForeignKey { table, .. } => {
            let kind = registry::find_by_table(table).map(|d| d.key).unwrap_or(KeyKind::Serial);
            key(kind, value).map(|k| k.to_value())
        }
    }
}

/// Canonical output form of a stored value
pub fn render(field: &FieldDef, value: &Value) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    match field.kind {
        FieldKind::Decimal { digits, places } => match decimal(value, digits.max(places + 20), places) {
            Ok(d) => Value::String(d.to_string()),
            Err(_) => value.clone(),
        },
        FieldKind::Date => match date(value) {
            Ok(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            Err(_) => value.clone(),
        },
        FieldKind::DateTime => match datetime(value) {
            Ok(dt) => Value::String(format_datetime(dt)),
            Err(_) => value.clone(),
        },
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::registry::{DEALS, PROJECTS, USERS};
    use serde_json::json;

    fn field(def: &'static crate::schema::ResourceDef, name: &str) -> &'static FieldDef {
        def.field(name).unwrap()
    }

    #[test]
    fn decimals_are_fixed_to_scale() {
        let value = field(&DEALS, "value");
        assert_eq!(normalize(value, &json!(1500)).unwrap(), json!("1500.00"));
        assert_eq!(normalize(value, &json!("99.5")).unwrap(), json!("99.50"));
        assert!(normalize(value, &json!("1.234")).is_err());
        assert!(normalize(value, &json!("12345678901.00")).is_err());
        assert!(normalize(value, &json!("abc")).is_err());
    }

    #[test]
    fn rejects_invalid_choice() {
        let status = field(&PROJECTS, "status");
        assert_eq!(normalize(status, &json!("Pausado")).unwrap(), json!("Pausado"));
        assert_eq!(normalize(status, &json!("Closed")).unwrap_err(), "\"Closed\" is not a valid choice.");
    }

    #[test]
    fn text_is_trimmed_and_bounded() {
        let code = field(&PROJECTS, "code");
        assert_eq!(normalize(code, &json!("  PRJ-1 ")).unwrap(), json!("PRJ-1"));
        assert!(normalize(code, &json!("x".repeat(51))).is_err());
        assert_eq!(normalize(code, &Value::Null).unwrap(), Value::Null);
        assert!(normalize(field(&PROJECTS, "title"), &Value::Null).is_err());
    }

    #[test]
    fn blank_nullable_unique_text_becomes_null() {
        let code = field(&PROJECTS, "code");
        assert_eq!(normalize(code, &json!("")).unwrap(), Value::Null);
        assert_eq!(normalize(code, &json!("   ")).unwrap(), Value::Null);
        assert_eq!(normalize(field(&PROJECTS, "description"), &json!("")).unwrap(), json!(""));
    }

    #[test]
    fn foreign_keys_follow_target_key_kind() {
        assert_eq!(normalize(field(&PROJECTS, "client"), &json!("4")).unwrap(), json!(4));
        assert!(normalize(field(&PROJECTS, "client"), &json!("four")).is_err());
        assert_eq!(normalize(field(&USERS, "role"), &json!("admin")).unwrap(), json!("admin"));
        assert_eq!(normalize(field(&PROJECTS, "manager"), &Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn dates_and_datetimes_are_canonical() {
        assert_eq!(normalize(field(&PROJECTS, "start_date"), &json!("2024-03-01")).unwrap(), json!("2024-03-01"));
        assert!(normalize(field(&PROJECTS, "start_date"), &json!("01/03/2024")).is_err());

        let ts = field(&PROJECTS, "last_update");
        assert_eq!(render(ts, &json!("2024-03-01T10:00:00+00:00")), json!("2024-03-01T10:00:00Z"));
        assert_eq!(render(ts, &json!("2024-03-01T07:00:00-03:00")), json!("2024-03-01T10:00:00Z"));
    }

    #[test]
    fn validates_email_and_url() {
        assert!(normalize(field(&USERS, "email"), &json!("ana@example.com")).is_ok());
        assert!(normalize(field(&USERS, "email"), &json!("ana@")).is_err());
        assert!(normalize(field(&USERS, "email"), &json!("")).is_ok());
        assert!(normalize(field(&USERS, "avatar"), &json!("https://cdn.example.com/a.png")).is_ok());
        assert!(normalize(field(&USERS, "avatar"), &json!("not a url")).is_err());
    }

    #[test]
    fn renders_numeric_decimals_as_strings() {
        assert_eq!(render(field(&DEALS, "value"), &json!(1500.5)), json!("1500.50"));
    }
}
