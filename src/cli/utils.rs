use serde_json::{json, Map, Value};

use crate::cli::OutputFormat;
use crate::error::ApiError;

/// Print a success line, or a `{ "success": true, ... }` document merged with `data`
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut document = Map::new();
            document.insert("success".to_string(), Value::Bool(true));
            document.insert("message".to_string(), Value::String(message.to_string()));
            match data {
                Some(Value::Object(fields)) => document.extend(fields),
                Some(other) => {
                    document.insert("data".to_string(), other);
                }
                None => {}
            }
            println!("{}", serde_json::to_string_pretty(&Value::Object(document))?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
            if let Some(data) = data {
                println!("{}", serde_json::to_string_pretty(&data)?);
            }
        }
    }
    Ok(())
}

/// Print a service error with its per-field messages, then fail the command
pub fn fail_with(output_format: &OutputFormat, err: ApiError) -> anyhow::Result<()> {
    let mut fields: Vec<(String, String)> = err
        .field_errors()
        .map(|f| f.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();
    fields.sort();

    match output_format {
        OutputFormat::Json => {
            let document = json!({
                "success": false,
                "error": err.message(),
                "error_code": err.error_code(),
                "field_errors": fields.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect::<Map<String, Value>>(),
            });
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", err.message());
            for (field, message) in &fields {
                eprintln!("  {}: {}", field, message);
            }
        }
    }
    anyhow::bail!("{}", err.message())
}
