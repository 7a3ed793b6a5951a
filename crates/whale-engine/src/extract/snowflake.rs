//! Snowflake tables, columns and clustering keys from `INFORMATION_SCHEMA`.

use std::collections::BTreeMap;

use anyhow::Result;
use whale_types::{ColumnMetadata, IndexMetadata, MetadataRecord, TableIndexes, TableKey};

use super::{and_clause, collect_tables, CatalogQuery, ColumnRow};
use crate::client::{QueryResult, Row};
use crate::config::Configuration;

pub const TABLE_SCOPE: &str = "extractor.snowflake";
pub const CLUSTERING_SCOPE: &str = "extractor.snowflake_clustering";
pub const DATABASE_KEY: &str = "database";
pub const WHERE_CLAUSE_SUFFIX_KEY: &str = "where_clause_suffix";

const DATABASE: &str = "snowflake";
const CATALOG_COLUMNS: &str = "catalog_columns";
const SYSTEM: &str = "snowflake";

#[derive(Debug, Default)]
struct Target {
    database: String,
    where_clause_suffix: Option<String>,
}

impl Target {
    fn init(&mut self, conf: &Configuration) -> Result<()> {
        self.database = conf.require_str(DATABASE_KEY)?.to_string();
        self.where_clause_suffix = conf.get_str(WHERE_CLAUSE_SUFFIX_KEY).map(str::to_string);
        Ok(())
    }

    fn key(&self, row: &Row<'_>) -> TableKey {
        TableKey::new(
            DATABASE,
            row.text("table_catalog").unwrap_or_else(|| self.database.clone()),
            row.text("table_schema").unwrap_or_default(),
            row.text("table_name").unwrap_or_default(),
        )
    }
}

/// Tables with their comments and columns.
#[derive(Debug, Default)]
pub struct SnowflakeTableQuery {
    target: Target,
}

impl CatalogQuery for SnowflakeTableQuery {
    fn scope(&self) -> &'static str {
        TABLE_SCOPE
    }

    fn init(&mut self, conf: &Configuration) -> Result<()> {
        self.target.init(conf)
    }

    /// The join runs in a subselect so that `where_clause_suffix` sees one
    /// unqualified column set, the same one the clustering query exposes.
    fn statement(&self) -> String {
        let filter = and_clause(
            "table_schema <> 'INFORMATION_SCHEMA'",
            self.target.where_clause_suffix.as_deref(),
        );
        format!(
            "SELECT table_catalog, table_schema, table_name, column_name, data_type, \
             ordinal_position, column_comment, table_comment, table_type \
             FROM (\
             SELECT c.table_catalog, c.table_schema, c.table_name, c.column_name, c.data_type, \
             c.ordinal_position, c.comment AS column_comment, \
             t.comment AS table_comment, t.table_type \
             FROM {db}.information_schema.columns c \
             JOIN {db}.information_schema.tables t \
             ON c.table_catalog = t.table_catalog \
             AND c.table_schema = t.table_schema \
             AND c.table_name = t.table_name\
             ) AS {CATALOG_COLUMNS} \
             {filter} \
             ORDER BY table_schema, table_name, ordinal_position",
            db = self.target.database
        )
    }

    fn build(&self, result: &QueryResult) -> Result<Vec<MetadataRecord>> {
        result.require_columns(
            SYSTEM,
            &["table_schema", "table_name", "column_name", "ordinal_position"],
        )?;

        let rows = result.records().map(|row| ColumnRow {
            key: self.target.key(&row),
            table_description: row.text("table_comment"),
            is_view: row
                .text("table_type")
                .is_some_and(|t| t.eq_ignore_ascii_case("VIEW")),
            column: row.text("column_name").map(|name| ColumnMetadata {
                name,
                data_type: row.text("data_type"),
                description: row.text("column_comment"),
                sort_order: row.u32("ordinal_position").unwrap_or_default(),
            }),
        });

        Ok(collect_tables(rows))
    }
}

/// Clustering keys rendered as one `clustering` index per clustered table.
#[derive(Debug, Default)]
pub struct SnowflakeClusteringQuery {
    target: Target,
}

impl CatalogQuery for SnowflakeClusteringQuery {
    fn scope(&self) -> &'static str {
        CLUSTERING_SCOPE
    }

    fn init(&mut self, conf: &Configuration) -> Result<()> {
        self.target.init(conf)
    }

    fn statement(&self) -> String {
        let filter = and_clause(
            "clustering_key IS NOT NULL AND table_schema <> 'INFORMATION_SCHEMA'",
            self.target.where_clause_suffix.as_deref(),
        );
        format!(
            "SELECT table_catalog, table_schema, table_name, clustering_key \
             FROM {db}.information_schema.tables \
             {filter} \
             ORDER BY table_schema, table_name",
            db = self.target.database
        )
    }

    fn build(&self, result: &QueryResult) -> Result<Vec<MetadataRecord>> {
        result.require_columns(SYSTEM, &["table_schema", "table_name", "clustering_key"])?;

        let mut tables: BTreeMap<TableKey, Vec<IndexMetadata>> = BTreeMap::new();
        for row in result.records() {
            let Some(clustering_key) = row.text("clustering_key") else {
                continue;
            };
            let key = self.target.key(&row);
            let (architecture, columns) = parse_clustering_key(&clustering_key);
            let mut index = IndexMetadata::new(
                key.database.clone(),
                key.cluster.clone(),
                key.schema.clone(),
                key.table.clone(),
                "clustering_key",
                columns,
            )
            .with_index_type("clustering");
            if let Some(architecture) = architecture {
                index = index.with_architecture(architecture);
            }
            tables.entry(key).or_default().push(index);
        }

        Ok(tables
            .into_iter()
            .map(|(key, indexes)| MetadataRecord::Indexes(TableIndexes::new(key, indexes)))
            .collect())
    }
}

/// Split a clustering key such as `LINEAR(to_date(ts), id)` into its method
/// (`linear`) and its top-level expressions.
pub fn parse_clustering_key(raw: &str) -> (Option<String>, Vec<String>) {
    let raw = raw.trim();
    let (method, body) = match (raw.find('('), raw.rfind(')')) {
        (Some(open), Some(close)) if open < close && !raw[..open].trim().is_empty() => {
            (Some(raw[..open].trim().to_lowercase()), &raw[open + 1..close])
        }
        _ => (None, raw),
    };

    let mut columns = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in body.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                columns.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        columns.push(current.trim().to_string());
    }
    columns.retain(|c| !c.is_empty());

    (method, columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn conf() -> Configuration {
        let mut conf = Configuration::new();
        conf.put(DATABASE_KEY, "ANALYTICS");
        conf
    }

    #[test]
    fn clustering_key_is_split_at_top_level_commas() {
        assert_eq!(
            parse_clustering_key("LINEAR(to_date(created_at), tenant_id)"),
            (
                Some("linear".to_string()),
                vec!["to_date(created_at)".to_string(), "tenant_id".to_string()]
            )
        );
        assert_eq!(
            parse_clustering_key("a, b"),
            (None, vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(parse_clustering_key("LINEAR()"), (Some("linear".to_string()), vec![]));
    }

    #[test]
    fn table_query_requires_database() {
        let mut query = SnowflakeTableQuery::default();
        assert!(query.init(&Configuration::new()).is_err());
        query.init(&conf()).unwrap();
        assert!(query
            .statement()
            .contains("FROM ANALYTICS.information_schema.columns c"));
    }

    #[test]
    fn one_suffix_fits_both_statements() {
        let mut conf = conf();
        conf.put(WHERE_CLAUSE_SUFFIX_KEY, "table_schema = 'PUBLIC'");
        let mut tables = SnowflakeTableQuery::default();
        let mut clustering = SnowflakeClusteringQuery::default();
        tables.init(&conf).unwrap();
        clustering.init(&conf).unwrap();

        let tables = tables.statement();
        let outer = &tables[tables.find(") AS catalog_columns").unwrap()..];
        assert!(outer.contains(
            "WHERE table_schema <> 'INFORMATION_SCHEMA' AND (table_schema = 'PUBLIC')"
        ));
        assert!(!outer.contains("JOIN"));
        assert!(!outer.contains("c.") && !outer.contains("t."));

        let clustering = clustering.statement();
        assert!(!clustering.contains("JOIN"));
        assert_eq!(clustering.matches("FROM").count(), 1);
        assert!(clustering.contains("AND (table_schema = 'PUBLIC')"));
    }

    #[test]
    fn table_rows_carry_comments() {
        let mut query = SnowflakeTableQuery::default();
        query.init(&conf()).unwrap();
        let result = QueryResult::new(
            ["TABLE_CATALOG", "TABLE_SCHEMA", "TABLE_NAME", "COLUMN_NAME", "DATA_TYPE", "ORDINAL_POSITION", "COLUMN_COMMENT", "TABLE_COMMENT", "TABLE_TYPE"]
                .map(String::from)
                .to_vec(),
            vec![vec![
                json!("ANALYTICS"), json!("PUBLIC"), json!("USERS"), json!("ID"), json!("NUMBER"),
                json!("1"), json!(null), json!("Registered users"), json!("BASE TABLE"),
            ]],
        );
        let records = query.build(&result).unwrap();
        let MetadataRecord::Table(users) = &records[0] else {
            panic!("expected a table record");
        };
        assert_eq!(users.key, TableKey::new("snowflake", "ANALYTICS", "PUBLIC", "USERS"));
        assert_eq!(users.description.as_deref(), Some("Registered users"));
        assert_eq!(users.columns[0].sort_order, 1);
    }

    #[test]
    fn clustering_rows_become_index_records() {
        let mut query = SnowflakeClusteringQuery::default();
        query.init(&conf()).unwrap();
        let result = QueryResult::new(
            ["TABLE_CATALOG", "TABLE_SCHEMA", "TABLE_NAME", "CLUSTERING_KEY"]
                .map(String::from)
                .to_vec(),
            vec![vec![json!("ANALYTICS"), json!("PUBLIC"), json!("EVENTS"), json!("LINEAR(DAY, USER_ID)")]],
        );
        let records = query.build(&result).unwrap();
        let MetadataRecord::Indexes(indexes) = &records[0] else {
            panic!("expected an index record");
        };
        assert_eq!(
            indexes.indexes[0].format_for_markdown(),
            "* [clustering, linear] `clustering_key` [`DAY`, `USER_ID`]"
        );
    }
}
