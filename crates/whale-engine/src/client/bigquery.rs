//! BigQuery over the `jobs.query` / `getQueryResults` REST calls.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use whale_types::Connection;

use super::{read_json, required, CatalogClient, CatalogError, QueryResult};

const SYSTEM: &str = "bigquery";
const API_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";
const QUERY_TIMEOUT_MS: u64 = 60_000;
const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    #[serde(default)]
    job_reference: Option<JobReference>,
    #[serde(default)]
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<TableRow>,
    #[serde(default)]
    page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

#[derive(Debug, Deserialize)]
struct FieldSchema {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    v: Value,
}

/// Runs standard-SQL queries in one project with a bearer token.
pub struct BigQueryClient {
    http: Client,
    project_id: String,
    token: String,
    location: Option<String>,
}

impl BigQueryClient {
    /// # Errors
    ///
    /// Returns [`CatalogError::MissingField`] if `project_id` or
    /// `access_token` is missing.
    pub fn from_connection(http: Client, connection: &Connection) -> Result<Self, CatalogError> {
        let project_id = required(connection, "project_id", connection.project_id.as_ref())?;
        let token = required(connection, "access_token", connection.access_token.as_ref())?;

        Ok(Self {
            http,
            project_id: project_id.to_string(),
            token: token.to_string(),
            location: connection.location.clone(),
        })
    }

    fn results_page(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
    ) -> Result<QueryResponse, CatalogError> {
        let mut request = self
            .http
            .get(format!(
                "{API_BASE}/projects/{}/queries/{}",
                self.project_id, job.job_id
            ))
            .bearer_auth(&self.token)
            .query(&[("timeoutMs", QUERY_TIMEOUT_MS.to_string())]);
        if let Some(location) = &job.location {
            request = request.query(&[("location", location)]);
        }
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }
        read_json(SYSTEM, request.send()?)
    }
}

fn cells(rows: Vec<TableRow>) -> impl Iterator<Item = Vec<Value>> {
    rows.into_iter()
        .map(|row| row.f.into_iter().map(|cell| cell.v).collect())
}

impl CatalogClient for BigQueryClient {
    fn query(&mut self, statement: &str) -> Result<QueryResult, CatalogError> {
        let body = json!({
            "query": statement,
            "useLegacySql": false,
            "timeoutMs": QUERY_TIMEOUT_MS,
            "location": self.location,
        });
        let request = self
            .http
            .post(format!("{API_BASE}/projects/{}/queries", self.project_id))
            .bearer_auth(&self.token)
            .json(&body);
        let mut page: QueryResponse = read_json(SYSTEM, request.send()?)?;
        let job = page.job_reference.clone().ok_or_else(|| CatalogError::Decode {
            system: SYSTEM,
            message: "response has no jobReference".to_string(),
        })?;

        while !page.job_complete {
            thread::sleep(POLL_INTERVAL);
            page = self.results_page(&job, None)?;
        }

        let columns = page
            .schema
            .take()
            .map(|schema| schema.fields.into_iter().map(|f| f.name).collect())
            .unwrap_or_default();
        let mut rows: Vec<Vec<Value>> = cells(std::mem::take(&mut page.rows)).collect();

        while let Some(token) = page.page_token.take() {
            page = self.results_page(&job, Some(&token))?;
            rows.extend(cells(std::mem::take(&mut page.rows)));
        }

        Ok(QueryResult::new(columns, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use whale_types::MetadataSource;

    #[test]
    fn requires_project_and_token() {
        let mut connection = Connection::new("lake", MetadataSource::Bigquery);
        connection.access_token = Some("token".into());
        let err = BigQueryClient::from_connection(Client::new(), &connection)
            .err()
            .unwrap();
        assert!(err.to_string().contains("project_id"));

        connection.project_id = Some("my-project".into());
        assert!(BigQueryClient::from_connection(Client::new(), &connection).is_ok());
    }

    #[test]
    fn query_response_flattens_cells() {
        let page: QueryResponse = serde_json::from_str(
            r#"{"kind": "bigquery#queryResponse", "jobComplete": true,
                "jobReference": {"projectId": "p", "jobId": "job_1", "location": "US"},
                "schema": {"fields": [{"name": "table_name", "type": "STRING"}, {"name": "ordinal_position", "type": "INTEGER"}]},
                "rows": [{"f": [{"v": "orders"}, {"v": "1"}]}],
                "pageToken": "next"}"#,
        )
        .unwrap();
        assert!(page.job_complete);
        assert_eq!(page.job_reference.as_ref().unwrap().job_id, "job_1");
        assert_eq!(page.page_token.as_deref(), Some("next"));
        let rows: Vec<Vec<Value>> = cells(page.rows).collect();
        assert_eq!(rows, vec![vec![Value::from("orders"), Value::from("1")]]);
    }
}
