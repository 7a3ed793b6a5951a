//! Snowflake over the SQL REST API (`/api/v2/statements`).

use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use whale_types::Connection;

use super::{read_json, required, CatalogClient, CatalogError, QueryResult};

const SYSTEM: &str = "snowflake";
const STATEMENT_TIMEOUT_SECS: u64 = 300;
const POLL_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_TOKEN_TYPE: &str = "OAUTH";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    #[serde(default)]
    statement_handle: Option<String>,
    #[serde(default)]
    statement_status_url: Option<String>,
    #[serde(default)]
    result_set_meta_data: Option<ResultSetMetaData>,
    #[serde(default)]
    data: Option<Vec<Vec<Value>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetMetaData {
    #[serde(default)]
    row_type: Vec<RowType>,
    #[serde(default)]
    partition_info: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RowType {
    name: String,
}

/// Submits statements with a bearer token and collects every result partition.
pub struct SnowflakeClient {
    http: Client,
    base_url: String,
    token: String,
    token_type: String,
    database: Option<String>,
    warehouse: Option<String>,
    role: Option<String>,
}

impl SnowflakeClient {
    /// # Errors
    ///
    /// Returns [`CatalogError::MissingField`] if `account` or `access_token`
    /// is missing.
    pub fn from_connection(http: Client, connection: &Connection) -> Result<Self, CatalogError> {
        let account = required(connection, "account", connection.account.as_ref())?;
        let token = required(connection, "access_token", connection.access_token.as_ref())?;
        let token_type = connection
            .extras
            .get("token_type")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_TOKEN_TYPE);

        Ok(Self {
            http,
            base_url: format!("https://{account}.snowflakecomputing.com"),
            token: token.to_string(),
            token_type: token_type.to_string(),
            database: connection.database.clone(),
            warehouse: connection.warehouse.clone(),
            role: connection.role.clone(),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("X-Snowflake-Authorization-Token-Type", &self.token_type)
            .header("Accept", "application/json")
    }

    fn get(&self, path: &str) -> Result<(StatusCode, StatementResponse), CatalogError> {
        let response = self
            .authorize(self.http.get(format!("{}{path}", self.base_url)))
            .send()?;
        let status = response.status();
        Ok((status, read_json(SYSTEM, response)?))
    }
}

impl CatalogClient for SnowflakeClient {
    fn query(&mut self, statement: &str) -> Result<QueryResult, CatalogError> {
        let body = json!({
            "statement": statement,
            "timeout": STATEMENT_TIMEOUT_SECS,
            "database": self.database,
            "warehouse": self.warehouse,
            "role": self.role,
        });
        let response = self
            .authorize(self.http.post(format!("{}/api/v2/statements", self.base_url)))
            .json(&body)
            .send()?;
        let mut status = response.status();
        let mut first: StatementResponse = read_json(SYSTEM, response)?;

        // 202 means the statement is still running.
        while status == StatusCode::ACCEPTED {
            let url = first
                .statement_status_url
                .clone()
                .ok_or_else(|| CatalogError::Decode {
                    system: SYSTEM,
                    message: "statement accepted without statementStatusUrl".to_string(),
                })?;
            thread::sleep(POLL_INTERVAL);
            (status, first) = self.get(&url)?;
        }

        let meta = first.result_set_meta_data.take().unwrap_or_default();
        let mut rows = first.data.take().unwrap_or_default();

        if meta.partition_info.len() > 1 {
            let handle = first.statement_handle.ok_or_else(|| CatalogError::Decode {
                system: SYSTEM,
                message: "partitioned result without statementHandle".to_string(),
            })?;
            for partition in 1..meta.partition_info.len() {
                let (_, page) =
                    self.get(&format!("/api/v2/statements/{handle}?partition={partition}"))?;
                rows.extend(page.data.unwrap_or_default());
            }
        }

        Ok(QueryResult::new(
            meta.row_type.into_iter().map(|r| r.name).collect(),
            rows,
        ))
    }
}
