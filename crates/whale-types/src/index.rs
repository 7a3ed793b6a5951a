//! Index metadata and its markdown rendering.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A tag attached to a metadata record.
///
/// Sources hand tags over either as bare labels or as key/value objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tag {
    Label(String),
    KeyValue { key: String, value: String },
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => f.write_str(label),
            Self::KeyValue { key, value } => write!(f, "{key}:{value}"),
        }
    }
}

/// Metadata on one index of a table.
///
/// Fields are fixed at construction; the `with_*` methods are part of building
/// the value, not of mutating a shared one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    database: String,
    cluster: String,
    schema: String,
    table: String,
    name: String,
    columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    /// e.g. primary / secondary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    index_type: Option<String>,
    /// e.g. clustered / non-clustered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    architecture: Option<String>,
    /// e.g. unique
    #[serde(default, skip_serializing_if = "Option::is_none")]
    constraint: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<Tag>,
}

impl IndexMetadata {
    pub fn new(
        database: impl Into<String>,
        cluster: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            database: database.into(),
            cluster: cluster.into(),
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            description: None,
            index_type: None,
            architecture: None,
            constraint: None,
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_index_type(mut self, index_type: impl Into<String>) -> Self {
        self.index_type = Some(index_type.into());
        self
    }

    #[must_use]
    pub fn with_architecture(mut self, architecture: impl Into<String>) -> Self {
        self.architecture = Some(architecture.into());
        self
    }

    #[must_use]
    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn index_type(&self) -> Option<&str> {
        self.index_type.as_deref()
    }

    pub fn architecture(&self) -> Option<&str> {
        self.architecture.as_deref()
    }

    pub fn constraint(&self) -> Option<&str> {
        self.constraint.as_deref()
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Render the index as one markdown bullet:
    /// ``* [{types}] `{name}` [{columns}]``.
    ///
    /// Types appear in the order index type, constraint, architecture; absent or
    /// empty ones are left out, and an empty list still renders as `[]`.
    pub fn format_for_markdown(&self) -> String {
        let type_list = [&self.index_type, &self.constraint, &self.architecture]
            .into_iter()
            .filter_map(|kind| kind.as_deref().filter(|s| !s.is_empty()))
            .collect::<Vec<_>>()
            .join(", ");
        let column_list = self
            .columns
            .iter()
            .map(|column| format!("`{column}`"))
            .collect::<Vec<_>>()
            .join(", ");

        format!("* [{type_list}] `{}` [{column_list}]", self.name)
    }
}
