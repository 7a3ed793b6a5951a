//! Presto over its HTTP statement protocol.

use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use whale_types::Connection;

use super::{read_json, required, CatalogClient, CatalogError, QueryResult};

const SYSTEM: &str = "presto";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_USER: &str = "whale";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementPage {
    #[serde(default)]
    columns: Option<Vec<StatementColumn>>,
    #[serde(default)]
    data: Option<Vec<Vec<Value>>>,
    #[serde(default)]
    next_uri: Option<String>,
    #[serde(default)]
    error: Option<StatementError>,
}

#[derive(Debug, Deserialize)]
struct StatementColumn {
    name: String,
}

#[derive(Debug, Deserialize)]
struct StatementError {
    message: String,
}

/// Submits a statement to `/v1/statement` and follows `nextUri` until the
/// coordinator stops returning one.
pub struct PrestoClient {
    http: Client,
    base_url: String,
    user: String,
    password: Option<String>,
    catalog: Option<String>,
}

impl PrestoClient {
    /// # Errors
    ///
    /// Returns [`CatalogError::MissingField`] if the connection has no host.
    pub fn from_connection(http: Client, connection: &Connection) -> Result<Self, CatalogError> {
        let host = required(connection, "host", connection.host.as_ref())?;
        let scheme = if connection.use_https.unwrap_or(false) {
            "https"
        } else {
            "http"
        };
        let port = connection.port.unwrap_or(DEFAULT_PORT);

        Ok(Self {
            http,
            base_url: format!("{scheme}://{host}:{port}"),
            user: connection
                .username
                .clone()
                .unwrap_or_else(|| DEFAULT_USER.to_string()),
            password: connection.password.clone(),
            catalog: connection.catalog.clone(),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("X-Presto-User", &self.user);
        match &self.password {
            Some(password) => request.basic_auth(&self.user, Some(password)),
            None => request,
        }
    }
}

impl CatalogClient for PrestoClient {
    fn query(&mut self, statement: &str) -> Result<QueryResult, CatalogError> {
        let mut request = self
            .http
            .post(format!("{}/v1/statement", self.base_url))
            .body(statement.to_string());
        if let Some(catalog) = &self.catalog {
            request = request.header("X-Presto-Catalog", catalog);
        }

        let mut page: StatementPage = read_json(SYSTEM, self.authorize(request).send()?)?;
        let mut result = QueryResult::default();

        loop {
            if let Some(error) = page.error {
                return Err(CatalogError::Query {
                    system: SYSTEM,
                    message: error.message,
                });
            }
            if result.columns.is_empty() {
                if let Some(columns) = page.columns {
                    result.columns = columns.into_iter().map(|c| c.name).collect();
                }
            }
            if let Some(data) = page.data {
                result.rows.extend(data);
            }

            let Some(next_uri) = page.next_uri else {
                break;
            };
            tracing::trace!(uri = next_uri, "Following presto nextUri");
            page = read_json(SYSTEM, self.authorize(self.http.get(&next_uri)).send()?)?;
        }

        Ok(result)
    }
}
