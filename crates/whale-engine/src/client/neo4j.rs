//! Neo4j over the HTTP transactional endpoint.

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use whale_types::Connection;

use super::{read_json, required, CatalogClient, CatalogError, QueryResult};

const SYSTEM: &str = "neo4j";
const DEFAULT_DATABASE: &str = "neo4j";

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<Neo4jError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<RowData>,
}

#[derive(Debug, Deserialize)]
struct RowData {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Neo4jError {
    code: String,
    message: String,
}

/// Runs Cypher in an auto-committed transaction.
pub struct Neo4jClient {
    http: Client,
    endpoint: String,
    username: Option<String>,
    password: Option<String>,
}

impl Neo4jClient {
    /// # Errors
    ///
    /// Returns [`CatalogError::MissingField`] if the connection has no uri.
    pub fn from_connection(http: Client, connection: &Connection) -> Result<Self, CatalogError> {
        let uri = required(connection, "uri", connection.uri.as_ref())?;
        let database = connection.database.as_deref().unwrap_or(DEFAULT_DATABASE);

        Ok(Self {
            http,
            endpoint: format!("{}/db/{database}/tx/commit", uri.trim_end_matches('/')),
            username: connection.username.clone(),
            password: connection.password.clone(),
        })
    }
}

impl CatalogClient for Neo4jClient {
    fn query(&mut self, statement: &str) -> Result<QueryResult, CatalogError> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "statements": [{ "statement": statement }] }));
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }

        let response: CommitResponse = read_json(SYSTEM, request.send()?)?;
        if let Some(error) = response.errors.into_iter().next() {
            return Err(CatalogError::Query {
                system: SYSTEM,
                message: format!("{}: {}", error.code, error.message),
            });
        }

        let statement_result =
            response
                .results
                .into_iter()
                .next()
                .ok_or_else(|| CatalogError::Decode {
                    system: SYSTEM,
                    message: "no statement result".to_string(),
                })?;

        Ok(QueryResult::new(
            statement_result.columns,
            statement_result.data.into_iter().map(|d| d.row).collect(),
        ))
    }
}
