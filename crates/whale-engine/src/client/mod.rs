//! Catalog clients: run one metadata query against a source and hand back rows.
//!
//! Extractors only depend on [`CatalogClient`]; the HTTP implementations below
//! are picked by [`HttpClientFactory`] from the connection's source type.

pub mod bigquery;
pub mod neo4j;
pub mod presto;
pub mod snowflake;

use std::time::Duration;

use reqwest::blocking::Response;
use serde::de::DeserializeOwned;
use serde_json::Value;
use whale_types::{Connection, MetadataSource};

pub use bigquery::BigQueryClient;
pub use neo4j::Neo4jClient;
pub use presto::PrestoClient;
pub use snowflake::SnowflakeClient;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const ERROR_BODY_PREVIEW: usize = 300;

/// Errors produced while talking to a metadata source.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Transport failure or non-JSON body.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The source answered but refused or failed the statement.
    #[error("{system} rejected query: {message}")]
    Query {
        system: &'static str,
        message: String,
    },

    /// The response did not have the expected shape.
    #[error("unexpected {system} response: {message}")]
    Decode {
        system: &'static str,
        message: String,
    },

    #[error("connection '{connection}' is missing required field '{field}'")]
    MissingField {
        connection: String,
        field: &'static str,
    },

    #[error("no catalog client for {0} connections")]
    Unsupported(MetadataSource),
}

/// Column names plus row values of one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Case-insensitive column lookup; sources disagree on identifier case.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
    }

    /// Fail early when a query did not return a column the caller reads.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Decode`] naming the first missing column.
    pub fn require_columns(&self, system: &'static str, names: &[&str]) -> Result<(), CatalogError> {
        match names.iter().find(|name| self.column_index(name).is_none()) {
            Some(missing) => Err(CatalogError::Decode {
                system,
                message: format!("result has no column '{missing}'"),
            }),
            None => Ok(()),
        }
    }

    pub fn records(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |values| Row {
            result: self,
            values: values.as_slice(),
        })
    }
}

/// One row of a [`QueryResult`], addressed by column name.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    result: &'a QueryResult,
    values: &'a [Value],
}

impl Row<'_> {
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.result
            .column_index(column)
            .and_then(|i| self.values.get(i))
    }

    /// Text form of a cell; `None` for SQL NULL or a missing column.
    pub fn text(&self, column: &str) -> Option<String> {
        match self.value(column)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn u32(&self, column: &str) -> Option<u32> {
        self.text(column).and_then(|s| s.trim().parse().ok())
    }

    /// Booleans arrive as JSON booleans or as `YES`/`true` strings.
    pub fn flag(&self, column: &str) -> bool {
        match self.value(column) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => {
                s.eq_ignore_ascii_case("yes") || s.eq_ignore_ascii_case("true")
            }
            _ => false,
        }
    }
}

/// Runs catalog statements against one source.
pub trait CatalogClient {
    /// Execute `statement` and collect every row.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] on transport, query or decode failure.
    fn query(&mut self, statement: &str) -> Result<QueryResult, CatalogError>;
}

/// Opens a [`CatalogClient`] for a connection.
pub trait ClientFactory {
    /// # Errors
    ///
    /// Returns a [`CatalogError`] when the connection lacks what the client
    /// needs or the source type has no client.
    fn open(&self, connection: &Connection) -> Result<Box<dyn CatalogClient>, CatalogError>;
}

/// Builds the blocking HTTP client matching each source type.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    timeout: Duration,
}

impl HttpClientFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn http(&self) -> Result<reqwest::blocking::Client, CatalogError> {
        Ok(reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?)
    }
}

impl Default for HttpClientFactory {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl ClientFactory for HttpClientFactory {
    fn open(&self, connection: &Connection) -> Result<Box<dyn CatalogClient>, CatalogError> {
        let http = self.http()?;
        let client: Box<dyn CatalogClient> = match connection.metadata_source {
            MetadataSource::Presto => Box::new(PrestoClient::from_connection(http, connection)?),
            MetadataSource::Neo4j => Box::new(Neo4jClient::from_connection(http, connection)?),
            MetadataSource::Snowflake => {
                Box::new(SnowflakeClient::from_connection(http, connection)?)
            }
            MetadataSource::Bigquery => {
                Box::new(BigQueryClient::from_connection(http, connection)?)
            }
            other @ (MetadataSource::BuildScript | MetadataSource::Other) => {
                return Err(CatalogError::Unsupported(other));
            }
        };
        Ok(client)
    }
}

pub(crate) fn required<'a>(
    connection: &'a Connection,
    field: &'static str,
    value: Option<&'a String>,
) -> Result<&'a str, CatalogError> {
    value
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| CatalogError::MissingField {
            connection: connection.name.clone(),
            field,
        })
}

/// Decode a JSON response, turning non-2xx statuses into [`CatalogError::Query`]
/// with whatever message the source put in the body.
pub(crate) fn read_json<T: DeserializeOwned>(
    system: &'static str,
    response: Response,
) -> Result<T, CatalogError> {
    let status = response.status();
    let body = response.text()?;

    if !status.is_success() {
        return Err(CatalogError::Query {
            system,
            message: format!("HTTP {status}: {}", error_message(&body)),
        });
    }

    serde_json::from_str(&body).map_err(|e| CatalogError::Decode {
        system,
        message: e.to_string(),
    })
}

/// Best-effort extraction of an error message from a JSON error body.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let message = value
            .pointer("/error/message")
            .or_else(|| value.get("message"))
            .or_else(|| value.pointer("/errors/0/message"))
            .and_then(Value::as_str);
        if let Some(message) = message {
            return message.to_string();
        }
    }
    body.chars().take(ERROR_BODY_PREVIEW).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> QueryResult {
        QueryResult::new(
            vec!["TABLE_NAME".into(), "ordinal_position".into(), "is_nullable".into()],
            vec![vec![json!("orders"), json!(3), json!("YES")], vec![json!(null), json!("7"), json!(false)]],
        )
    }

    #[test]
    fn column_lookup_ignores_case() {
        let result = sample();
        assert_eq!(result.column_index("table_name"), Some(0));
        assert_eq!(result.column_index("missing"), None);
    }

    #[test]
    fn require_columns_names_the_missing_one() {
        let err = sample()
            .require_columns("presto", &["table_name", "column_name"])
            .unwrap_err();
        assert!(err.to_string().contains("column_name"));
    }

    #[test]
    fn row_accessors_convert_values() {
        let result = sample();
        let rows: Vec<Row<'_>> = result.records().collect();
        assert_eq!(rows[0].text("table_name").as_deref(), Some("orders"));
        assert_eq!(rows[0].u32("ordinal_position"), Some(3));
        assert!(rows[0].flag("is_nullable"));
        assert_eq!(rows[1].text("table_name"), None);
        assert_eq!(rows[1].u32("ordinal_position"), Some(7));
        assert!(!rows[1].flag("is_nullable"));
    }

    #[test]
    fn error_message_prefers_structured_fields() {
        assert_eq!(error_message(r#"{"error": {"message": "quota"}}"#), "quota");
        assert_eq!(error_message(r#"{"message": "bad token", "code": "390303"}"#), "bad token");
        assert_eq!(error_message("plain failure"), "plain failure");
    }

    #[test]
    fn factory_refuses_sources_without_clients() {
        let factory = HttpClientFactory::default();
        let connection = Connection::new("script", MetadataSource::BuildScript);
        assert!(matches!(
            factory.open(&connection),
            Err(CatalogError::Unsupported(MetadataSource::BuildScript))
        ));
    }

    #[test]
    fn factory_reports_missing_fields() {
        let factory = HttpClientFactory::default();
        let connection = Connection::new("warehouse", MetadataSource::Presto);
        let err = factory.open(&connection).err().unwrap();
        assert!(err.to_string().contains("'host'"));
    }
}
