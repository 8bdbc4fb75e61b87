use super::types::FilterOrderInfo;

pub struct FilterOrder;

impl FilterOrder {
    /// `ORDER BY` clause; empty when there is nothing to sort by
    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        let parts: Vec<String> = infos
            .iter()
            .map(|info| format!("{} {}", crate::schema::ddl::quote_ident(&info.column), info.sort.to_sql()))
            .collect();
        if parts.is_empty() {
            String::new()
        } else {
            format!("ORDER BY {}", parts.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::SortDirection;

    #[test]
    fn quotes_columns_in_sort_order() {
        let infos = [
            FilterOrderInfo { column: "date".to_string(), sort: SortDirection::Desc },
            FilterOrderInfo::by_id(),
        ];
        assert_eq!(FilterOrder::generate(&infos), "ORDER BY \"date\" DESC, \"id\" ASC");
        assert_eq!(FilterOrder::generate(&[]), "");
    }
}
