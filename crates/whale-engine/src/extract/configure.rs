//! Per-source extractor plans.
//!
//! Each `configure_*` function turns one connection into the ordered list of
//! extractors to run for it plus their configuration. The first extractor of
//! every plan enumerates the full table set; later ones only enrich tables.

use std::path::PathBuf;
use std::process::Command;

use anyhow::{bail, Context, Result};
use whale_types::Connection;

use super::bigquery::{self, BigQueryPartitioningQuery, BigQueryTableQuery};
use super::neo4j::{self, Neo4jTableQuery};
use super::presto::{self, PrestoTableQuery};
use super::snowflake::{self, SnowflakeClusteringQuery, SnowflakeTableQuery};
use super::{CatalogExtractor, Extractor, ExtractorPlan};
use crate::client::{CatalogClient, ClientFactory, HttpClientFactory};
use crate::config::Configuration;

const DEFAULT_PYTHON: &str = "python3";

/// Builds extractor plans and runs build scripts.
pub trait ExtractorConfigurator {
    /// # Errors
    ///
    /// Returns an error when no client can be opened for the connection.
    fn configure_presto(&self, connection: &Connection, full_extraction: bool) -> Result<ExtractorPlan>;

    /// # Errors
    ///
    /// See [`ExtractorConfigurator::configure_presto`].
    fn configure_neo4j(&self, connection: &Connection) -> Result<ExtractorPlan>;

    /// # Errors
    ///
    /// See [`ExtractorConfigurator::configure_presto`].
    fn configure_bigquery(&self, connection: &Connection) -> Result<ExtractorPlan>;

    /// # Errors
    ///
    /// See [`ExtractorConfigurator::configure_presto`].
    fn configure_snowflake(&self, connection: &Connection) -> Result<ExtractorPlan>;

    /// # Errors
    ///
    /// Returns an error when the script cannot be started or exits non-zero.
    fn run_build_script(&self, connection: &Connection) -> Result<()>;
}

/// The production configurator: catalog clients come from a [`ClientFactory`].
pub struct SourceConfigurator {
    clients: Box<dyn ClientFactory>,
}

impl SourceConfigurator {
    pub fn new(clients: Box<dyn ClientFactory>) -> Self {
        Self { clients }
    }
}

impl Default for SourceConfigurator {
    fn default() -> Self {
        Self::new(Box::new(HttpClientFactory::default()))
    }
}

impl ExtractorConfigurator for SourceConfigurator {
    fn configure_presto(&self, connection: &Connection, full_extraction: bool) -> Result<ExtractorPlan> {
        configure_presto_extractors(connection, self.clients.as_ref(), full_extraction)
    }

    fn configure_neo4j(&self, connection: &Connection) -> Result<ExtractorPlan> {
        configure_neo4j_extractors(connection, self.clients.as_ref())
    }

    fn configure_bigquery(&self, connection: &Connection) -> Result<ExtractorPlan> {
        configure_bigquery_extractors(connection, self.clients.as_ref())
    }

    fn configure_snowflake(&self, connection: &Connection) -> Result<ExtractorPlan> {
        configure_snowflake_extractors(connection, self.clients.as_ref())
    }

    fn run_build_script(&self, connection: &Connection) -> Result<()> {
        run_build_script(connection)
    }
}

fn open(clients: &dyn ClientFactory, connection: &Connection) -> Result<Box<dyn CatalogClient>> {
    clients.open(connection).with_context(|| {
        format!(
            "Failed to open {} client for connection '{}'",
            connection.metadata_source, connection.name
        )
    })
}

fn put_opt(conf: &mut Configuration, key: String, value: Option<&String>) {
    if let Some(value) = value {
        conf.put(key, value.as_str());
    }
}

/// # Errors
///
/// Returns an error when no presto client can be opened.
pub fn configure_presto_extractors(
    connection: &Connection,
    clients: &dyn ClientFactory,
    full_extraction: bool,
) -> Result<ExtractorPlan> {
    let mut conf = Configuration::new();
    let scope = presto::SCOPE;
    put_opt(&mut conf, format!("{scope}.{}", presto::CATALOG_KEY), connection.catalog.as_ref());
    put_opt(
        &mut conf,
        format!("{scope}.{}", presto::WHERE_CLAUSE_SUFFIX_KEY),
        connection.where_clause_suffix.as_ref(),
    );
    conf.put(format!("{scope}.{}", presto::FULL_EXTRACTION_KEY), full_extraction);

    let extractors: Vec<Box<dyn Extractor>> = vec![Box::new(CatalogExtractor::new(
        open(clients, connection)?,
        PrestoTableQuery::default(),
    ))];
    Ok(ExtractorPlan::new(extractors, conf))
}

/// # Errors
///
/// Returns an error when no neo4j client can be opened.
pub fn configure_neo4j_extractors(
    connection: &Connection,
    clients: &dyn ClientFactory,
) -> Result<ExtractorPlan> {
    let mut conf = Configuration::new();
    put_opt(
        &mut conf,
        format!("{}.{}", neo4j::SCOPE, neo4j::WHERE_CLAUSE_SUFFIX_KEY),
        connection.where_clause_suffix.as_ref(),
    );

    let extractors: Vec<Box<dyn Extractor>> = vec![Box::new(CatalogExtractor::new(
        open(clients, connection)?,
        Neo4jTableQuery::default(),
    ))];
    Ok(ExtractorPlan::new(extractors, conf))
}

/// Tables first, then partitioning and clustering.
///
/// # Errors
///
/// Returns an error when no bigquery client can be opened.
pub fn configure_bigquery_extractors(
    connection: &Connection,
    clients: &dyn ClientFactory,
) -> Result<ExtractorPlan> {
    let mut conf = Configuration::new();
    for scope in [bigquery::TABLE_SCOPE, bigquery::PARTITIONING_SCOPE] {
        put_opt(&mut conf, format!("{scope}.{}", bigquery::PROJECT_ID_KEY), connection.project_id.as_ref());
        put_opt(&mut conf, format!("{scope}.{}", bigquery::LOCATION_KEY), connection.location.as_ref());
        put_opt(
            &mut conf,
            format!("{scope}.{}", bigquery::WHERE_CLAUSE_SUFFIX_KEY),
            connection.where_clause_suffix.as_ref(),
        );
    }

    let extractors: Vec<Box<dyn Extractor>> = vec![
        Box::new(CatalogExtractor::new(
            open(clients, connection)?,
            BigQueryTableQuery::default(),
        )),
        Box::new(CatalogExtractor::new(
            open(clients, connection)?,
            BigQueryPartitioningQuery::default(),
        )),
    ];
    Ok(ExtractorPlan::new(extractors, conf))
}

/// Tables first, then clustering keys.
///
/// # Errors
///
/// Returns an error when no snowflake client can be opened.
pub fn configure_snowflake_extractors(
    connection: &Connection,
    clients: &dyn ClientFactory,
) -> Result<ExtractorPlan> {
    let mut conf = Configuration::new();
    for scope in [snowflake::TABLE_SCOPE, snowflake::CLUSTERING_SCOPE] {
        put_opt(&mut conf, format!("{scope}.{}", snowflake::DATABASE_KEY), connection.database.as_ref());
        put_opt(
            &mut conf,
            format!("{scope}.{}", snowflake::WHERE_CLAUSE_SUFFIX_KEY),
            connection.where_clause_suffix.as_ref(),
        );
    }

    let extractors: Vec<Box<dyn Extractor>> = vec![
        Box::new(CatalogExtractor::new(
            open(clients, connection)?,
            SnowflakeTableQuery::default(),
        )),
        Box::new(CatalogExtractor::new(
            open(clients, connection)?,
            SnowflakeClusteringQuery::default(),
        )),
    ];
    Ok(ExtractorPlan::new(extractors, conf))
}

fn python_for(connection: &Connection) -> PathBuf {
    match (&connection.venv_path, &connection.python_binary) {
        (Some(venv), _) => PathBuf::from(venv).join("bin").join("python"),
        (None, Some(binary)) => PathBuf::from(binary),
        (None, None) => PathBuf::from(DEFAULT_PYTHON),
    }
}

/// Run a connection's build script to completion.
///
/// # Errors
///
/// Returns an error when the connection has no script, the interpreter cannot
/// be started, or the script exits with a non-zero status.
pub fn run_build_script(connection: &Connection) -> Result<()> {
    let Some(script) = connection.build_script_path.as_deref() else {
        bail!("Connection '{}' has no build_script_path", connection.name);
    };
    let python = python_for(connection);

    tracing::info!(
        connection = %connection.name,
        script,
        interpreter = %python.display(),
        "Running build script"
    );

    let status = Command::new(&python)
        .arg(script)
        .status()
        .with_context(|| format!("Failed to start {} for {script}", python.display()))?;

    if !status.success() {
        bail!("Build script {script} for connection '{}' failed: {status}", connection.name);
    }
    Ok(())
}
