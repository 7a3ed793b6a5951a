//! Presto tables and columns from `information_schema`.

use anyhow::Result;
use whale_types::{ColumnMetadata, MetadataRecord, TableKey};

use super::{and_clause, collect_tables, CatalogQuery, ColumnRow};
use crate::client::QueryResult;
use crate::config::Configuration;

pub const SCOPE: &str = "extractor.presto";
pub const CATALOG_KEY: &str = "catalog";
pub const WHERE_CLAUSE_SUFFIX_KEY: &str = "where_clause_suffix";
pub const FULL_EXTRACTION_KEY: &str = "is_full_extraction_enabled";

const DEFAULT_CATALOG: &str = "hive";
const DATABASE: &str = "presto";
const BASE_FILTER: &str = "table_schema <> 'information_schema'";

/// Lists every table of a catalog. With full extraction enabled the columns
/// are read too; otherwise only table names are fetched.
#[derive(Debug, Default)]
pub struct PrestoTableQuery {
    catalog: String,
    where_clause_suffix: Option<String>,
    full_extraction: bool,
}

impl CatalogQuery for PrestoTableQuery {
    fn scope(&self) -> &'static str {
        SCOPE
    }

    fn init(&mut self, conf: &Configuration) -> Result<()> {
        self.catalog = conf
            .get_str(CATALOG_KEY)
            .unwrap_or(DEFAULT_CATALOG)
            .to_string();
        self.where_clause_suffix = conf.get_str(WHERE_CLAUSE_SUFFIX_KEY).map(str::to_string);
        self.full_extraction = conf.get_bool(FULL_EXTRACTION_KEY, true);
        Ok(())
    }

    fn statement(&self) -> String {
        let filter = and_clause(BASE_FILTER, self.where_clause_suffix.as_deref());
        if self.full_extraction {
            format!(
                "SELECT table_catalog, table_schema, table_name, column_name, data_type, \
                 ordinal_position, comment \
                 FROM {catalog}.information_schema.columns \
                 {filter} \
                 ORDER BY table_schema, table_name, ordinal_position",
                catalog = self.catalog
            )
        } else {
            format!(
                "SELECT table_catalog, table_schema, table_name, table_type \
                 FROM {catalog}.information_schema.tables \
                 {filter} \
                 ORDER BY table_schema, table_name",
                catalog = self.catalog
            )
        }
    }

    fn build(&self, result: &QueryResult) -> Result<Vec<MetadataRecord>> {
        result.require_columns("presto", &["table_catalog", "table_schema", "table_name"])?;
        if self.full_extraction {
            result.require_columns("presto", &["column_name", "data_type", "ordinal_position"])?;
        }

        let rows = result.records().map(|row| {
            let key = TableKey::new(
                DATABASE,
                row.text("table_catalog").unwrap_or_default(),
                row.text("table_schema").unwrap_or_default(),
                row.text("table_name").unwrap_or_default(),
            );
            let column = row.text("column_name").map(|name| ColumnMetadata {
                name,
                data_type: row.text("data_type"),
                description: row.text("comment"),
                sort_order: row.u32("ordinal_position").unwrap_or_default(),
            });
            ColumnRow {
                key,
                table_description: None,
                is_view: row
                    .text("table_type")
                    .is_some_and(|t| t.eq_ignore_ascii_case("VIEW")),
                column,
            }
        });

        Ok(collect_tables(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(full_extraction: bool, suffix: Option<&str>) -> PrestoTableQuery {
        let mut conf = Configuration::new();
        conf.put(CATALOG_KEY, "lake");
        conf.put(FULL_EXTRACTION_KEY, full_extraction);
        if let Some(suffix) = suffix {
            conf.put(WHERE_CLAUSE_SUFFIX_KEY, suffix);
        }
        let mut query = PrestoTableQuery::default();
        query.init(&conf).unwrap();
        query
    }

    #[test]
    fn full_extraction_reads_columns() {
        let statement = query(true, Some("table_schema = 'sales'")).statement();
        assert!(statement.contains("FROM lake.information_schema.columns"));
        assert!(statement.contains("AND (table_schema = 'sales')"));
    }

    #[test]
    fn partial_extraction_lists_tables_only() {
        let statement = query(false, None).statement();
        assert!(statement.contains("FROM lake.information_schema.tables"));
        assert!(!statement.contains("column_name"));
    }

    #[test]
    fn catalog_defaults_to_hive() {
        let mut query = PrestoTableQuery::default();
        query.init(&Configuration::new()).unwrap();
        assert!(query.statement().contains("FROM hive.information_schema.columns"));
    }

    #[test]
    fn rows_become_table_records() {
        let result = QueryResult::new(
            ["table_catalog", "table_schema", "table_name", "column_name", "data_type", "ordinal_position", "comment"]
                .map(String::from)
                .to_vec(),
            vec![
                vec![json!("lake"), json!("sales"), json!("orders"), json!("id"), json!("bigint"), json!(1), json!(null)],
                vec![json!("lake"), json!("sales"), json!("orders"), json!("total"), json!("double"), json!(2), json!("gross")],
                vec![json!("lake"), json!("sales"), json!("refunds"), json!("id"), json!("bigint"), json!(1), json!(null)],
            ],
        );
        let records = query(true, None).build(&result).unwrap();
        assert_eq!(records.len(), 2);
        let MetadataRecord::Table(orders) = &records[0] else {
            panic!("expected a table record");
        };
        assert_eq!(orders.key, TableKey::new("presto", "lake", "sales", "orders"));
        assert_eq!(orders.columns[1].description.as_deref(), Some("gross"));
    }

    #[test]
    fn missing_columns_fail_the_build() {
        let result = QueryResult::new(vec!["table_name".into()], vec![]);
        assert!(query(true, None).build(&result).is_err());
    }
}
