use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use serde_json::{json, Value};
use whale_engine::client::{CatalogClient, CatalogError, ClientFactory, QueryResult};
use whale_engine::config::parser::parse_connections;
use whale_engine::extract::SourceConfigurator;
use whale_engine::{Orchestrator, RunOptions, WhalePaths};
use whale_types::{Connection, MetadataSource};

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn presto_columns() -> QueryResult {
    QueryResult::new(
        columns(&[
            "table_catalog", "table_schema", "table_name", "column_name",
            "data_type", "ordinal_position", "comment",
        ]),
        vec![
            vec![json!("hive"), json!("core"), json!("users"), json!("name"), json!("varchar"), json!(2), json!(null)],
            vec![json!("hive"), json!("core"), json!("users"), json!("id"), json!("bigint"), json!(1), json!("Primary key")],
        ],
    )
}

fn snowflake_columns() -> QueryResult {
    QueryResult::new(
        columns(&[
            "table_catalog", "table_schema", "table_name", "column_name", "data_type",
            "ordinal_position", "column_comment", "table_comment", "table_type",
        ]),
        vec![vec![
            json!("ANALYTICS"), json!("PUBLIC"), json!("EVENTS"), json!("TS"), json!("TIMESTAMP_NTZ"),
            json!("1"), json!(null), json!("Raw events"), json!("BASE TABLE"),
        ]],
    )
}

fn snowflake_clustering() -> QueryResult {
    QueryResult::new(
        columns(&["table_catalog", "table_schema", "table_name", "clustering_key"]),
        vec![vec![json!("ANALYTICS"), json!("PUBLIC"), json!("EVENTS"), json!("LINEAR(TS)")]],
    )
}

/// Answers catalog queries from canned results, keyed on the statement text.
struct CannedClient {
    source: MetadataSource,
    statements: Rc<RefCell<Vec<String>>>,
}

impl CatalogClient for CannedClient {
    fn query(&mut self, statement: &str) -> Result<QueryResult, CatalogError> {
        self.statements.borrow_mut().push(statement.to_string());
        match self.source {
            MetadataSource::Presto => Ok(presto_columns()),
            MetadataSource::Snowflake if statement.contains("clustering_key IS NOT NULL") => {
                Ok(snowflake_clustering())
            }
            MetadataSource::Snowflake => Ok(snowflake_columns()),
            other => Err(CatalogError::Unsupported(other)),
        }
    }
}

struct CannedFactory {
    statements: Rc<RefCell<Vec<String>>>,
}

impl ClientFactory for CannedFactory {
    fn open(&self, connection: &Connection) -> Result<Box<dyn CatalogClient>, CatalogError> {
        Ok(Box::new(CannedClient {
            source: connection.metadata_source,
            statements: Rc::clone(&self.statements),
        }))
    }
}

fn fixture() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/connections.yaml"))
}

fn orchestrator(base: &Path) -> (Orchestrator, Rc<RefCell<Vec<String>>>) {
    let statements = Rc::new(RefCell::new(Vec::new()));
    let factory = CannedFactory {
        statements: Rc::clone(&statements),
    };
    let paths = WhalePaths::new(base).with_connections_file(fixture());
    let orchestrator = Orchestrator::new(paths)
        .with_configurator(Box::new(SourceConfigurator::new(Box::new(factory))));
    (orchestrator, statements)
}

#[test]
fn fixture_parses_into_two_connections() {
    std::env::set_var("WHALE_TEST_PRESTO_USER", "etl");
    let connections = parse_connections(fixture()).unwrap();
    assert_eq!(connections.len(), 2);
    assert_eq!(connections[0].username.as_deref(), Some("etl"));
    assert_eq!(connections[1].metadata_source, MetadataSource::Snowflake);
}

#[test]
fn run_writes_markdown_and_hands_off_manifest() {
    std::env::set_var("WHALE_TEST_PRESTO_USER", "etl");
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, statements) = orchestrator(dir.path());

    let summary = orchestrator.run(&RunOptions::default()).unwrap();
    assert_eq!(summary.connections_processed, 2);
    assert_eq!(summary.tasks_run, 3);
    assert!(summary.stopped_by.is_none());
    assert_eq!(statements.borrow().len(), 3);

    let users = fs::read_to_string(dir.path().join("metadata/warehouse/hive.core.users.md")).unwrap();
    assert_eq!(
        users,
        "# `core.users`\n\
         `presto` | `hive`\n\
         \n\
         ## Column details\n\
         * [bigint] `id` - Primary key\n\
         * [varchar] `name`\n\
         \n\
         *Do not make edits above this line.*\n"
    );

    let events =
        fs::read_to_string(dir.path().join("metadata/analytics/ANALYTICS.PUBLIC.EVENTS.md")).unwrap();
    assert!(events.starts_with("# `PUBLIC.EVENTS`\n`snowflake` | `ANALYTICS`\n\nRaw events\n"));
    assert!(events.contains("## Indexes\n* [clustering, linear] `clustering_key` [`TS`]\n"));

    let manifest = fs::read_to_string(dir.path().join("manifests/manifest.txt")).unwrap();
    assert_eq!(
        manifest,
        "warehouse/hive.core.users.md\nanalytics/ANALYTICS.PUBLIC.EVENTS.md\n"
    );
    assert!(!dir.path().join("manifests/tmp_manifest.txt").exists());

    let stats: Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("logs/analytics_stats.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(stats["records_loaded"], 1);
}

#[test]
fn user_notes_survive_a_second_run() {
    std::env::set_var("WHALE_TEST_PRESTO_USER", "etl");
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, _) = orchestrator(dir.path());
    orchestrator.run(&RunOptions::default()).unwrap();

    let path = dir.path().join("metadata/warehouse/hive.core.users.md");
    let mut content = fs::read_to_string(&path).unwrap();
    content.push_str("Owned by the data platform team.\n");
    fs::write(&path, &content).unwrap();

    orchestrator.run(&RunOptions::default()).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), content);
}

#[test]
fn tables_only_presto_run_skips_column_details() {
    std::env::set_var("WHALE_TEST_PRESTO_USER", "etl");
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, statements) = orchestrator(dir.path());
    let options = RunOptions {
        full_extraction: false,
        verbose: true,
    };
    orchestrator.run(&options).unwrap();

    assert!(statements.borrow()[0].contains("hive.information_schema.tables"));
}
