//! In-process evaluation of `FilterData` against stored rows.

use serde_json::Value;
use std::cmp::Ordering;

use super::error::FilterError;
use super::types::{FilterOrderInfo, SortDirection};
use crate::database::store::Row;
use crate::schema::value::scalar_text;

/// True when `row` satisfies every condition of `where_clause`
pub fn matches(where_clause: &Value, row: &Row) -> Result<bool, FilterError> {
    let obj = match where_clause {
        Value::Null => return Ok(true),
        Value::Object(obj) => obj,
        _ => return Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
    };

    for (key, value) in obj {
        let ok = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in logical_operands(key, value)? {
                    if !matches(clause, row)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for clause in logical_operands(key, value)? {
                    if matches(clause, row)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            op if op.starts_with('$') => return Err(FilterError::UnsupportedOperator(op.to_string())),
            column => matches_field(row.get(column).unwrap_or(&Value::Null), value)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn logical_operands<'a>(op: &str, value: &'a Value) -> Result<&'a Vec<Value>, FilterError> {
    value
        .as_array()
        .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))
}

fn matches_field(actual: &Value, condition: &Value) -> Result<bool, FilterError> {
    let ops = match condition {
        Value::Object(ops) => ops,
        expected => return Ok(equals(actual, expected)),
    };
    for (op, data) in ops {
        let ok = match op.as_str() {
            "$eq" => equals(actual, data),
            "$in" => data
                .as_array()
                .ok_or_else(|| FilterError::InvalidOperatorData("$in requires array".to_string()))?
                .iter()
                .any(|candidate| equals(actual, candidate)),
            "$ilike" => match (scalar_text(actual), data.as_str()) {
                (Some(text), Some(pattern)) => like(pattern, &text),
                _ => false,
            },
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn equals(actual: &Value, expected: &Value) -> bool {
    scalar_text(actual) == scalar_text(expected)
}

enum Token {
    Literal(char),
    AnyOne,
    AnyMany,
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '\\' => Token::Literal(chars.next().unwrap_or('\\')),
            '%' => Token::AnyMany,
            '_' => Token::AnyOne,
            other => Token::Literal(other),
        });
    }
    tokens
}

/// Case-insensitive SQL LIKE with backslash escapes
pub fn like(pattern: &str, text: &str) -> bool {
    let tokens = tokenize(&pattern.to_lowercase());
    let text: Vec<char> = text.to_lowercase().chars().collect();

    // reachable[j]: the tokens consumed so far can match text[..j]
    let mut reachable = vec![false; text.len() + 1];
    reachable[0] = true;
    for token in &tokens {
        let mut next = vec![false; text.len() + 1];
        match token {
            Token::AnyMany => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen |= reachable[j];
                    next[j] = seen;
                }
            }
            Token::AnyOne => {
                for j in 0..text.len() {
                    next[j + 1] = reachable[j];
                }
            }
            Token::Literal(c) => {
                for j in 0..text.len() {
                    next[j + 1] = reachable[j] && text[j] == *c;
                }
            }
        }
        reachable = next;
    }
    reachable[text.len()]
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        _ => scalar_text(a).cmp(&scalar_text(b)),
    }
}

/// Row ordering for the given sort columns
pub fn compare_rows(a: &Row, b: &Row, orders: &[FilterOrderInfo]) -> Ordering {
    for order in orders {
        let ordering = compare_values(
            a.get(&order.column).unwrap_or(&Value::Null),
            b.get(&order.column).unwrap_or(&Value::Null),
        );
        let ordering = match order.sort {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn like_handles_wildcards_and_escapes() {
        assert!(like("%vpn%", "VPN fora do ar"));
        assert!(like("a_c", "ABC"));
        assert!(!like("a_c", "abbc"));
        assert!(like("%100\\%%", "desconto 100% aplicado"));
        assert!(!like("%100\\%%", "desconto 1000 aplicado"));
        assert!(like("%", ""));
    }

    #[test]
    fn evaluates_conditions() {
        let r = row(json!({"id": 1, "status": "Aberto", "project": 3, "manager": null, "title": "Erro na nota"}));
        assert!(matches(&json!({"status": "Aberto", "project": 3}), &r).unwrap());
        assert!(!matches(&json!({"status": "Resolvido"}), &r).unwrap());
        assert!(matches(&json!({"manager": null}), &r).unwrap());
        assert!(matches(&json!({"project": {"$in": [2, 3]}}), &r).unwrap());
        assert!(matches(&json!({"$or": [{"title": {"$ilike": "%NOTA%"}}, {"status": "x"}]}), &r).unwrap());
        assert!(!matches(&json!({"$or": []}), &r).unwrap());
    }

    #[test]
    fn orders_rows() {
        let a = row(json!({"id": 2, "date": "2024-01-02"}));
        let b = row(json!({"id": 10, "date": "2024-01-01"}));
        assert_eq!(compare_rows(&a, &b, &[FilterOrderInfo::by_id()]), Ordering::Less);
        let by_date = FilterOrderInfo { column: "date".into(), sort: SortDirection::Desc };
        assert_eq!(compare_rows(&a, &b, &[by_date]), Ordering::Less);
    }
}
