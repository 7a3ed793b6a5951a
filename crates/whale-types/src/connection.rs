//! Connection descriptors, one per document of the connections file.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a connection's metadata comes from.
///
/// Unrecognised values deserialize to [`MetadataSource::Other`] instead of failing,
/// so the orchestrator gets to decide what an unknown source means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataSource {
    Presto,
    Neo4j,
    Bigquery,
    Snowflake,
    BuildScript,
    #[default]
    #[serde(other)]
    Other,
}

impl fmt::Display for MetadataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Presto => "presto",
            Self::Neo4j => "neo4j",
            Self::Bigquery => "bigquery",
            Self::Snowflake => "snowflake",
            Self::BuildScript => "build_script",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// A configured data source.
///
/// Only `name` and `metadata_source` are interpreted by the orchestrator. The
/// remaining fields are read by the extractor configurator of the matching source;
/// keys it does not know about are kept in `extras`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub name: String,
    pub metadata_source: MetadataSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Snowflake account locator, e.g. `xy12345.us-east-1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// BigQuery dataset location, e.g. `us` or `eu`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Bearer token for sources queried over an OAuth-protected REST API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Base URI of an HTTP endpoint, e.g. `http://localhost:7474` for neo4j.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_https: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub where_clause_suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_script_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venv_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_binary: Option<String>,
    #[serde(flatten)]
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl Connection {
    pub fn new(name: impl Into<String>, metadata_source: MetadataSource) -> Self {
        Self {
            name: name.into(),
            metadata_source,
            ..Self::default()
        }
    }
}
