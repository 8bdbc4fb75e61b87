use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo};
use crate::schema::ResourceDef;

/// Builds a parameterized WHERE clause; every parameter is bound as text
/// and cast to its column's type in SQL.
pub struct FilterWhere {
    def: &'static ResourceDef,
    param_values: Vec<Value>,
    param_index: usize,
    conditions: Vec<FilterWhereInfo>,
}

impl FilterWhere {
    pub fn new(def: &'static ResourceDef, starting_param_index: usize) -> Self {
        Self {
            def,
            param_values: vec![],
            param_index: starting_param_index,
            conditions: vec![],
        }
    }

    pub fn generate(
        def: &'static ResourceDef,
        where_data: &Value,
        starting_param_index: usize,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(def, starting_param_index);
        filter_where.build(where_data)
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn build(&mut self, where_data: &Value) -> Result<(String, Vec<Value>), FilterError> {
        self.param_values.clear();
        self.conditions.clear();

        self.parse_where_data(where_data)?;

        let mut sql_conditions = vec![];
        let conditions_snapshot = self.conditions.clone();
        for condition in &conditions_snapshot {
            sql_conditions.push(self.build_sql_condition(condition)?);
        }
        let where_clause = if sql_conditions.is_empty() { "1=1".to_string() } else { sql_conditions.join(" AND ") };
        Ok((where_clause, self.param_values.clone()))
    }

    fn parse_where_data(&mut self, where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null => Ok(()),
            Value::Object(obj) => {
                for (key, value) in obj {
                    if key.starts_with('$') {
                        self.parse_logical_operator(key, value)?;
                    } else {
                        self.parse_field_condition(key, value)?;
                    }
                }
                Ok(())
            }
            _ => Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        }
    }

    fn parse_logical_operator(&mut self, op: &str, value: &Value) -> Result<(), FilterError> {
        let operator = match op {
            "$and" => FilterOp::And,
            "$or" => FilterOp::Or,
            _ => return Err(FilterError::UnsupportedOperator(op.to_string())),
        };
        let arr = value
            .as_array()
            .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;

        let mut sql_parts = Vec::new();
        for v in arr {
            let (sql, params) = Self::generate(self.def, v, self.param_index)?;
            self.param_index += params.len();
            self.param_values.extend(params);
            sql_parts.push(format!("({})", sql));
        }

        let combined = if sql_parts.is_empty() {
            // An empty disjunction matches nothing, an empty conjunction everything
            if operator == FilterOp::Or { "1=0".to_string() } else { "1=1".to_string() }
        } else {
            let joiner = if operator == FilterOp::And { " AND " } else { " OR " };
            format!("({})", sql_parts.join(joiner))
        };
        self.conditions.push(FilterWhereInfo { column: combined, operator, data: Value::Null });
        Ok(())
    }

    fn parse_field_condition(&mut self, field: &str, value: &Value) -> Result<(), FilterError> {
        if self.def.column_cast(field).is_none() {
            return Err(FilterError::InvalidColumn(format!("{}.{}", self.def.table, field)));
        }
        if let Value::Object(obj) = value {
            for (op_key, op_val) in obj {
                let operator = Self::map_operator(op_key)?;
                self.conditions.push(FilterWhereInfo { column: field.to_string(), operator, data: op_val.clone() });
            }
        } else {
            // Implicit equality: { field: value }
            self.conditions.push(FilterWhereInfo { column: field.to_string(), operator: FilterOp::Eq, data: value.clone() });
        }
        Ok(())
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$in" => FilterOp::In,
            "$ilike" => FilterOp::ILike,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        // Logical operators arrive pre-rendered
        if matches!(condition.operator, FilterOp::And | FilterOp::Or) {
            return Ok(condition.column.clone());
        }

        let quoted_column = format!("\"{}\"", condition.column);
        let cast = self.def.column_cast(&condition.column).unwrap_or("text");
        match condition.operator {
            FilterOp::Eq => {
                if condition.data.is_null() {
                    Ok(format!("{} IS NULL", quoted_column))
                } else {
                    Ok(format!("{} = {}::{}", quoted_column, self.param(condition.data.clone()), cast))
                }
            }
            FilterOp::ILike => {
                Ok(format!("{}::text ILIKE {}", quoted_column, self.param(condition.data.clone())))
            }
            FilterOp::In => {
                let values = condition
                    .data
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$in requires array".to_string()))?;
                if values.is_empty() {
                    return Ok("1=0".to_string());
                }
                let params: Vec<String> = values
                    .iter()
                    .map(|v| format!("{}::{}", self.param(v.clone()), cast))
                    .collect();
                Ok(format!("{} IN ({})", quoted_column, params.join(", ")))
            }
            FilterOp::And | FilterOp::Or => Ok(condition.column.clone()),
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::registry::{PROJECTS, TICKETS};
    use serde_json::json;

    #[test]
    fn implicit_equality_casts_to_column_type() {
        let (sql, params) = FilterWhere::generate(&PROJECTS, &json!({"client": 3}), 0).unwrap();
        assert_eq!(sql, "\"client\" = $1::bigint");
        assert_eq!(params, vec![json!(3)]);
    }

    #[test]
    fn null_equality_uses_is_null() {
        let (sql, params) = FilterWhere::generate(&PROJECTS, &json!({"manager": null}), 0).unwrap();
        assert_eq!(sql, "\"manager\" IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn or_of_ilike_keeps_parameter_numbering() {
        let where_data = json!({
            "status": "Aberto",
            "$or": [
                {"title": {"$ilike": "%vpn%"}},
                {"description": {"$ilike": "%vpn%"}}
            ]
        });
        let (sql, params) = FilterWhere::generate(&TICKETS, &where_data, 0).unwrap();
        assert!(sql.contains("\"status\" = $"));
        assert!(sql.contains("\"title\"::text ILIKE $"));
        assert!(sql.contains("\"description\"::text ILIKE $"));
        assert!(sql.contains(" OR "));
        assert_eq!(params.len(), 3);
        for i in 1..=3 {
            assert!(sql.contains(&format!("${}", i)), "missing ${} in {}", i, sql);
        }
    }

    #[test]
    fn in_expands_parameters() {
        let (sql, params) = FilterWhere::generate(&PROJECTS, &json!({"client": {"$in": [1, 2]}}), 0).unwrap();
        assert_eq!(sql, "\"client\" IN ($1::bigint, $2::bigint)");
        assert_eq!(params.len(), 2);

        let (sql, _) = FilterWhere::generate(&PROJECTS, &json!({"client": {"$in": []}}), 0).unwrap();
        assert_eq!(sql, "1=0");
    }

    #[test]
    fn rejects_unknown_columns_and_operators() {
        assert!(matches!(
            FilterWhere::generate(&PROJECTS, &json!({"secret": 1}), 0),
            Err(FilterError::InvalidColumn(_))
        ));
        assert!(matches!(
            FilterWhere::generate(&PROJECTS, &json!({"title": {"$regex": "x"}}), 0),
            Err(FilterError::UnsupportedOperator(_))
        ));
    }
}
