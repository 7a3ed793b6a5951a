//! BigQuery tables, columns, partitioning and clustering from the region
//! `INFORMATION_SCHEMA`.

use std::collections::BTreeMap;

use anyhow::Result;
use whale_types::{ColumnMetadata, IndexMetadata, MetadataRecord, TableIndexes, TableKey};

use super::{and_clause, collect_tables, CatalogQuery, ColumnRow};
use crate::client::{QueryResult, Row};
use crate::config::Configuration;

pub const TABLE_SCOPE: &str = "extractor.bigquery";
pub const PARTITIONING_SCOPE: &str = "extractor.bigquery_partitioning";
pub const PROJECT_ID_KEY: &str = "project_id";
pub const LOCATION_KEY: &str = "location";
pub const WHERE_CLAUSE_SUFFIX_KEY: &str = "where_clause_suffix";

const DATABASE: &str = "bigquery";
const SYSTEM: &str = "bigquery";
const DEFAULT_LOCATION: &str = "us";

#[derive(Debug, Default)]
struct Target {
    project_id: String,
    location: String,
    where_clause_suffix: Option<String>,
}

impl Target {
    fn init(&mut self, conf: &Configuration) -> Result<()> {
        self.project_id = conf.require_str(PROJECT_ID_KEY)?.to_string();
        self.location = conf
            .get_str(LOCATION_KEY)
            .unwrap_or(DEFAULT_LOCATION)
            .to_lowercase();
        self.where_clause_suffix = conf.get_str(WHERE_CLAUSE_SUFFIX_KEY).map(str::to_string);
        Ok(())
    }

    fn columns_view(&self) -> String {
        format!(
            "`{}`.`region-{}`.INFORMATION_SCHEMA.COLUMNS",
            self.project_id, self.location
        )
    }

    fn key(&self, row: &Row<'_>) -> TableKey {
        TableKey::new(
            DATABASE,
            row.text("table_catalog").unwrap_or_else(|| self.project_id.clone()),
            row.text("table_schema").unwrap_or_default(),
            row.text("table_name").unwrap_or_default(),
        )
    }
}

/// Tables (datasets as schemas) with their columns.
#[derive(Debug, Default)]
pub struct BigQueryTableQuery {
    target: Target,
}

impl CatalogQuery for BigQueryTableQuery {
    fn scope(&self) -> &'static str {
        TABLE_SCOPE
    }

    fn init(&mut self, conf: &Configuration) -> Result<()> {
        self.target.init(conf)
    }

    fn statement(&self) -> String {
        let filter = and_clause("TRUE", self.target.where_clause_suffix.as_deref());
        format!(
            "SELECT table_catalog, table_schema, table_name, column_name, data_type, ordinal_position \
             FROM {view} \
             {filter} \
             ORDER BY table_schema, table_name, ordinal_position",
            view = self.target.columns_view()
        )
    }

    fn build(&self, result: &QueryResult) -> Result<Vec<MetadataRecord>> {
        result.require_columns(
            SYSTEM,
            &["table_schema", "table_name", "column_name", "ordinal_position"],
        )?;

        let rows = result.records().map(|row| ColumnRow {
            key: self.target.key(&row),
            table_description: None,
            is_view: false,
            column: row.text("column_name").map(|name| {
                ColumnMetadata::new(
                    name,
                    row.text("data_type"),
                    row.u32("ordinal_position").unwrap_or_default(),
                )
            }),
        });

        Ok(collect_tables(rows))
    }
}

/// Partitioning and clustering columns, one index record each.
#[derive(Debug, Default)]
pub struct BigQueryPartitioningQuery {
    target: Target,
}

#[derive(Default)]
struct Layout {
    partitioning: Vec<String>,
    clustering: Vec<(u32, String)>,
}

impl CatalogQuery for BigQueryPartitioningQuery {
    fn scope(&self) -> &'static str {
        PARTITIONING_SCOPE
    }

    fn init(&mut self, conf: &Configuration) -> Result<()> {
        self.target.init(conf)
    }

    fn statement(&self) -> String {
        let filter = and_clause(
            "(is_partitioning_column = 'YES' OR clustering_ordinal_position IS NOT NULL)",
            self.target.where_clause_suffix.as_deref(),
        );
        format!(
            "SELECT table_catalog, table_schema, table_name, column_name, \
             is_partitioning_column, clustering_ordinal_position \
             FROM {view} \
             {filter} \
             ORDER BY table_schema, table_name, ordinal_position",
            view = self.target.columns_view()
        )
    }

    fn build(&self, result: &QueryResult) -> Result<Vec<MetadataRecord>> {
        result.require_columns(
            SYSTEM,
            &[
                "table_schema",
                "table_name",
                "column_name",
                "is_partitioning_column",
                "clustering_ordinal_position",
            ],
        )?;

        let mut layouts: BTreeMap<TableKey, Layout> = BTreeMap::new();
        for row in result.records() {
            let Some(column) = row.text("column_name") else {
                continue;
            };
            let layout = layouts.entry(self.target.key(&row)).or_default();
            if row.flag("is_partitioning_column") {
                layout.partitioning.push(column.clone());
            }
            if let Some(position) = row.u32("clustering_ordinal_position") {
                layout.clustering.push((position, column));
            }
        }

        Ok(layouts
            .into_iter()
            .filter_map(|(key, layout)| {
                let indexes = layout_indexes(&key, layout);
                (!indexes.is_empty())
                    .then(|| MetadataRecord::Indexes(TableIndexes::new(key, indexes)))
            })
            .collect())
    }
}

fn layout_indexes(key: &TableKey, mut layout: Layout) -> Vec<IndexMetadata> {
    let index = |name: &str, columns: Vec<String>| {
        IndexMetadata::new(
            key.database.clone(),
            key.cluster.clone(),
            key.schema.clone(),
            key.table.clone(),
            name,
            columns,
        )
        .with_index_type(name)
    };

    let mut indexes = Vec::new();
    if !layout.partitioning.is_empty() {
        indexes.push(index("partitioning", layout.partitioning));
    }
    if !layout.clustering.is_empty() {
        layout.clustering.sort_by_key(|(position, _)| *position);
        let columns = layout.clustering.into_iter().map(|(_, c)| c).collect();
        indexes.push(index("clustering", columns));
    }
    indexes
}
