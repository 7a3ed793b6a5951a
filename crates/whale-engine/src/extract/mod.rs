//! Extractors: pull metadata records out of a source, one record per call.
//!
//! Every built-in extractor is a [`CatalogExtractor`]: it runs one catalog
//! query through a [`CatalogClient`] the first time it is asked for a record
//! and then replays the records built from the result.

pub mod bigquery;
pub mod configure;
pub mod neo4j;
pub mod presto;
pub mod snowflake;

use std::collections::{BTreeMap, VecDeque};

use anyhow::{Context, Result};
use whale_types::{ColumnMetadata, MetadataRecord, TableKey, TableMetadata};

use crate::client::{CatalogClient, QueryResult};
use crate::config::Configuration;

pub use configure::{
    configure_bigquery_extractors, configure_neo4j_extractors, configure_presto_extractors,
    configure_snowflake_extractors, run_build_script, ExtractorConfigurator, SourceConfigurator,
};

/// First stage of a task.
pub trait Extractor {
    /// Configuration scope, e.g. `extractor.presto`.
    fn scope(&self) -> &str;

    /// Bind the scoped configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when a required key is missing.
    fn init(&mut self, conf: &Configuration) -> Result<()>;

    /// Next record, or `None` once the extractor is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error when the source cannot be read.
    fn extract(&mut self) -> Result<Option<MetadataRecord>>;
}

/// Extractors of one connection in run order, plus the configuration they
/// (and the task's other stages) are initialised with.
pub struct ExtractorPlan {
    pub extractors: Vec<Box<dyn Extractor>>,
    pub config: Configuration,
}

impl ExtractorPlan {
    pub fn new(extractors: Vec<Box<dyn Extractor>>, config: Configuration) -> Self {
        Self { extractors, config }
    }
}

/// The source-specific half of a [`CatalogExtractor`].
pub trait CatalogQuery {
    fn scope(&self) -> &'static str;

    /// # Errors
    ///
    /// Returns an error when a required key is missing.
    fn init(&mut self, conf: &Configuration) -> Result<()>;

    fn statement(&self) -> String;

    /// # Errors
    ///
    /// Returns an error when the result lacks expected columns.
    fn build(&self, result: &QueryResult) -> Result<Vec<MetadataRecord>>;
}

/// Runs a [`CatalogQuery`] lazily and hands out its records in order.
pub struct CatalogExtractor<Q> {
    client: Box<dyn CatalogClient>,
    query: Q,
    pending: Option<VecDeque<MetadataRecord>>,
}

impl<Q: CatalogQuery> CatalogExtractor<Q> {
    pub fn new(client: Box<dyn CatalogClient>, query: Q) -> Self {
        Self {
            client,
            query,
            pending: None,
        }
    }
}

impl<Q: CatalogQuery> Extractor for CatalogExtractor<Q> {
    fn scope(&self) -> &str {
        self.query.scope()
    }

    fn init(&mut self, conf: &Configuration) -> Result<()> {
        self.pending = None;
        self.query.init(conf)
    }

    fn extract(&mut self) -> Result<Option<MetadataRecord>> {
        if self.pending.is_none() {
            let statement = self.query.statement();
            tracing::debug!(scope = self.query.scope(), statement = %statement, "Running catalog query");
            let result = self
                .client
                .query(&statement)
                .with_context(|| format!("Catalog query for {} failed", self.query.scope()))?;
            let records = self.query.build(&result)?;
            tracing::debug!(
                scope = self.query.scope(),
                rows = result.rows.len(),
                records = records.len(),
                "Catalog query finished"
            );
            self.pending = Some(records.into());
        }

        Ok(self.pending.as_mut().and_then(VecDeque::pop_front))
    }
}

/// One row of a column-level catalog query.
pub(crate) struct ColumnRow {
    pub key: TableKey,
    pub table_description: Option<String>,
    pub is_view: bool,
    /// `None` for tables listed without columns.
    pub column: Option<ColumnMetadata>,
}

/// Fold column rows into one table record per table, ordered by table key.
pub(crate) fn collect_tables(rows: impl IntoIterator<Item = ColumnRow>) -> Vec<MetadataRecord> {
    let mut tables: BTreeMap<TableKey, TableMetadata> = BTreeMap::new();

    for row in rows {
        let table = tables
            .entry(row.key.clone())
            .or_insert_with(|| TableMetadata::new(row.key));
        if table.description.is_none() {
            table.description = row.table_description;
        }
        table.is_view |= row.is_view;
        if let Some(column) = row.column {
            table.columns.push(column);
        }
    }

    tables.into_values().map(MetadataRecord::Table).collect()
}

/// Append a user-supplied filter to a base condition.
pub(crate) fn and_clause(base: &str, suffix: Option<&str>) -> String {
    match suffix.map(str::trim).filter(|s| !s.is_empty()) {
        Some(suffix) => format!("WHERE {base} AND ({suffix})"),
        None => format!("WHERE {base}"),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::client::{CatalogClient, CatalogError, QueryResult};

    /// Client returning a canned result and recording the statements it saw.
    pub(crate) struct CannedClient {
        pub result: QueryResult,
        pub statements: Rc<RefCell<Vec<String>>>,
    }

    impl CannedClient {
        pub(crate) fn new(result: QueryResult) -> (Self, Rc<RefCell<Vec<String>>>) {
            let statements = Rc::new(RefCell::new(Vec::new()));
            (
                Self {
                    result,
                    statements: Rc::clone(&statements),
                },
                statements,
            )
        }
    }

    impl CatalogClient for CannedClient {
        fn query(&mut self, statement: &str) -> Result<QueryResult, CatalogError> {
            self.statements.borrow_mut().push(statement.to_string());
            Ok(self.result.clone())
        }
    }
}
