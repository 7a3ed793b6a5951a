//! Records flowing from extractors to the transformer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::table::{TableIndexes, TableMetadata};

/// Identity of a table across sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableKey {
    pub database: String,
    pub cluster: String,
    pub schema: String,
    pub table: String,
}

impl TableKey {
    pub fn new(
        database: impl Into<String>,
        cluster: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            cluster: cluster.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// File stem used for the table's markdown file: `cluster.schema.table`, or
    /// `schema.table` when the source has no cluster level.
    pub fn file_stem(&self) -> String {
        if self.cluster.is_empty() {
            format!("{}.{}", self.schema, self.table)
        } else {
            format!("{}.{}.{}", self.cluster, self.schema, self.table)
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.database, self.file_stem())
    }
}

/// One unit of extracted metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetadataRecord {
    /// Full description of a table: identity, description and columns.
    Table(TableMetadata),
    /// Index-like structures of a table that was already described.
    Indexes(TableIndexes),
}

impl MetadataRecord {
    pub fn key(&self) -> &TableKey {
        match self {
            Self::Table(table) => &table.key,
            Self::Indexes(indexes) => &indexes.key,
        }
    }
}

impl From<TableMetadata> for MetadataRecord {
    fn from(table: TableMetadata) -> Self {
        Self::Table(table)
    }
}

impl From<TableIndexes> for MetadataRecord {
    fn from(indexes: TableIndexes) -> Self {
        Self::Indexes(indexes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_skips_empty_cluster() {
        assert_eq!(TableKey::new("bq", "", "sales", "orders").file_stem(), "sales.orders");
        assert_eq!(
            TableKey::new("presto", "hive", "sales", "orders").file_stem(),
            "hive.sales.orders"
        );
    }

    #[test]
    fn display_prefixes_database() {
        let key = TableKey::new("warehouse", "hive", "sales", "orders");
        assert_eq!(key.to_string(), "warehouse/hive.sales.orders");
    }
}
