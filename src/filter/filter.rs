use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterData, FilterOrderInfo, SqlResult};
use crate::schema::ResourceDef;

/// SELECT builder for one resource table
pub struct Filter {
    def: &'static ResourceDef,
    where_data: Option<Value>,
}

impl Filter {
    pub fn new(def: &'static ResourceDef) -> Result<Self, FilterError> {
        Self::validate_table_name(def.table)?;
        Ok(Self {
            def,
            where_data: None,
        })
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause {
            self.where_clause(where_clause)?;
        }
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    /// Results always come back in identity order
    pub fn order_infos(&self) -> Vec<FilterOrderInfo> {
        vec![FilterOrderInfo::by_id()]
    }

    /// Rows come back as one JSON object per row in the `row` column
    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = match self.where_data {
            Some(ref where_data) => FilterWhere::generate(self.def, where_data, 0)?,
            None => ("1=1".to_string(), vec![]),
        };
        let order_clause = FilterOrder::generate(&self.order_infos());

        let query = [
            "SELECT row_to_json(t) AS row".to_string(),
            format!("FROM \"{}\" AS t", self.def.table),
            format!("WHERE {}", where_clause),
            order_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params })
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        let valid_start = name.chars().next().map(|c| c.is_ascii_alphabetic() || c == '_').unwrap_or(false);
        if !valid_start || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::registry::LEDGER;
    use serde_json::json;

    #[test]
    fn builds_select_with_default_order() {
        let mut filter = Filter::new(&LEDGER).unwrap();
        filter.assign(FilterData::matching(json!({"ledger_type": "credit"}))).unwrap();
        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT row_to_json(t) AS row FROM \"ledger_entries\" AS t WHERE \"ledger_type\" = $1::text ORDER BY \"id\" ASC"
        );
        assert_eq!(sql.params, vec![json!("credit")]);
    }

    #[test]
    fn rejects_unknown_where_column() {
        let mut filter = Filter::new(&LEDGER).unwrap();
        filter.assign(FilterData::matching(json!({"nope": 1}))).unwrap();
        assert!(matches!(filter.to_sql(), Err(FilterError::InvalidColumn(_))));
    }
}
