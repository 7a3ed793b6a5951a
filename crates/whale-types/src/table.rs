//! Table and column metadata with their markdown sections.

use serde::{Deserialize, Serialize};

use crate::index::{IndexMetadata, Tag};
use crate::record::TableKey;

pub const COLUMN_DETAILS_HEADER: &str = "## Column details";
pub const INDEXES_HEADER: &str = "## Indexes";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Position of the column within its table, as reported by the source.
    pub sort_order: u32,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, data_type: Option<String>, sort_order: u32) -> Self {
        Self {
            name: name.into(),
            data_type,
            description: None,
            sort_order,
        }
    }

    fn format_for_markdown(&self) -> String {
        let data_type = self.data_type.as_deref().unwrap_or_default();
        match self.description.as_deref().filter(|d| !d.is_empty()) {
            Some(description) => format!("* [{data_type}] `{}` - {description}", self.name),
            None => format!("* [{data_type}] `{}`", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub key: TableKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnMetadata>,
    #[serde(default)]
    pub is_view: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl TableMetadata {
    pub fn new(key: TableKey) -> Self {
        Self {
            key,
            description: None,
            columns: Vec::new(),
            is_view: false,
            tags: Vec::new(),
        }
    }

    /// Render the generated table section.
    ///
    /// Column details are omitted entirely when the source reported no columns,
    /// which is the case for table-list-only extractions.
    pub fn format_for_markdown(&self) -> String {
        let key = &self.key;
        let view = if self.is_view { " [view]" } else { "" };
        let mut lines = vec![format!("# `{}.{}`{view}", key.schema, key.table)];

        if key.cluster.is_empty() {
            lines.push(format!("`{}`", key.database));
        } else {
            lines.push(format!("`{}` | `{}`", key.database, key.cluster));
        }

        if let Some(description) = self.description.as_deref().filter(|d| !d.is_empty()) {
            lines.push(String::new());
            lines.push(description.to_string());
        }

        if !self.tags.is_empty() {
            let tags = self
                .tags
                .iter()
                .map(|tag| format!("`{tag}`"))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(String::new());
            lines.push(format!("Tags: {tags}"));
        }

        if !self.columns.is_empty() {
            let mut columns: Vec<&ColumnMetadata> = self.columns.iter().collect();
            columns.sort_by_key(|c| c.sort_order);

            lines.push(String::new());
            lines.push(COLUMN_DETAILS_HEADER.to_string());
            lines.extend(columns.into_iter().map(ColumnMetadata::format_for_markdown));
        }

        lines.join("\n")
    }
}

/// The indexes of one table, loaded as a separate markdown section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableIndexes {
    pub key: TableKey,
    pub indexes: Vec<IndexMetadata>,
}

impl TableIndexes {
    pub fn new(key: TableKey, indexes: Vec<IndexMetadata>) -> Self {
        Self { key, indexes }
    }

    pub fn format_for_markdown(&self) -> String {
        let mut lines = vec![INDEXES_HEADER.to_string()];
        lines.extend(self.indexes.iter().map(IndexMetadata::format_for_markdown));
        lines.join("\n")
    }
}
