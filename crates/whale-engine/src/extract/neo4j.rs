//! Tables and columns stored in an Amundsen-style neo4j graph.

use anyhow::Result;
use whale_types::{ColumnMetadata, MetadataRecord, TableKey};

use super::{collect_tables, CatalogQuery, ColumnRow};
use crate::client::QueryResult;
use crate::config::Configuration;

pub const SCOPE: &str = "extractor.neo4j";
pub const WHERE_CLAUSE_SUFFIX_KEY: &str = "where_clause_suffix";

const MATCH_CLAUSE: &str = "MATCH (db:Database)<-[:CLUSTER_OF]-(cluster:Cluster)\
<-[:SCHEMA_OF]-(schema:Schema)<-[:TABLE_OF]-(table:Table) \
OPTIONAL MATCH (table)-[:DESCRIPTION]->(table_description:Description) \
OPTIONAL MATCH (table)-[:COLUMN]->(column:Column) \
OPTIONAL MATCH (column)-[:DESCRIPTION]->(column_description:Description)";

const RETURN_CLAUSE: &str = "RETURN db.name AS database, cluster.name AS cluster, \
schema.name AS schema, table.name AS table, table.is_view AS is_view, \
table_description.description AS table_description, column.name AS column_name, \
column.type AS column_type, column.sort_order AS sort_order, \
column_description.description AS column_description \
ORDER BY database, cluster, schema, table, sort_order";

#[derive(Debug, Default)]
pub struct Neo4jTableQuery {
    where_clause_suffix: Option<String>,
}

impl CatalogQuery for Neo4jTableQuery {
    fn scope(&self) -> &'static str {
        SCOPE
    }

    fn init(&mut self, conf: &Configuration) -> Result<()> {
        self.where_clause_suffix = conf
            .get_str(WHERE_CLAUSE_SUFFIX_KEY)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Ok(())
    }

    fn statement(&self) -> String {
        match &self.where_clause_suffix {
            Some(suffix) => format!("{MATCH_CLAUSE} WHERE {suffix} {RETURN_CLAUSE}"),
            None => format!("{MATCH_CLAUSE} {RETURN_CLAUSE}"),
        }
    }

    fn build(&self, result: &QueryResult) -> Result<Vec<MetadataRecord>> {
        result.require_columns("neo4j", &["database", "cluster", "schema", "table"])?;

        let rows = result.records().map(|row| ColumnRow {
            key: TableKey::new(
                row.text("database").unwrap_or_default(),
                row.text("cluster").unwrap_or_default(),
                row.text("schema").unwrap_or_default(),
                row.text("table").unwrap_or_default(),
            ),
            table_description: row.text("table_description"),
            is_view: row.flag("is_view"),
            column: row.text("column_name").map(|name| ColumnMetadata {
                name,
                data_type: row.text("column_type"),
                description: row.text("column_description"),
                sort_order: row.u32("sort_order").unwrap_or_default(),
            }),
        });

        Ok(collect_tables(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn suffix_lands_between_match_and_return() {
        let mut query = Neo4jTableQuery::default();
        let mut conf = Configuration::new();
        conf.put(WHERE_CLAUSE_SUFFIX_KEY, "schema.name = 'core'");
        query.init(&conf).unwrap();

        let statement = query.statement();
        let filter = statement.find("WHERE schema.name = 'core'").unwrap();
        assert!(statement.find("OPTIONAL MATCH").unwrap() < filter);
        assert!(filter < statement.find("RETURN").unwrap());
    }

    #[test]
    fn graph_rows_keep_their_own_database_and_cluster() {
        let query = Neo4jTableQuery::default();
        let columns = [
            "database", "cluster", "schema", "table", "is_view", "table_description",
            "column_name", "column_type", "sort_order", "column_description",
        ]
        .map(String::from)
        .to_vec();
        let result = QueryResult::new(
            columns,
            vec![
                vec![
                    json!("hive"), json!("gold"), json!("core"), json!("users"), json!(true),
                    json!("All users"), json!("id"), json!("bigint"), json!(0), json!(null),
                ],
                vec![
                    json!("hive"), json!("gold"), json!("core"), json!("empty"), json!(null),
                    json!(null), json!(null), json!(null), json!(null), json!(null),
                ],
            ],
        );

        let records = query.build(&result).unwrap();
        assert_eq!(records.len(), 2);
        let MetadataRecord::Table(users) = &records[1] else {
            panic!("expected a table record");
        };
        assert_eq!(users.key.file_stem(), "gold.core.users");
        assert!(users.is_view);
        assert_eq!(users.description.as_deref(), Some("All users"));
        assert_eq!(users.columns[0].data_type.as_deref(), Some("bigint"));
        assert_eq!(records[0].key().table, "empty");
    }
}
