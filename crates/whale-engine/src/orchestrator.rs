//! Top-level run: every connection in file order, every extractor of a
//! connection in plan order.

use std::time::Instant;

use anyhow::{Context, Result};
use whale_types::{Connection, MetadataSource};

use crate::config::parser::parse_connections;
use crate::config::validator::{validate_connection, validate_connections};
use crate::config::WhalePaths;
use crate::extract::{ExtractorConfigurator, ExtractorPlan, SourceConfigurator};
use crate::load::{Loader, WhaleLoader};
use crate::manifest::{next_tmp_manifest_path, transfer_manifest};
use crate::result::{RunSummary, StopReason};
use crate::task::WhaleTask;
use crate::transform::{MarkdownTransformer, Transformer};

pub const DATABASE_NAME_KEY: &str = "loader.whale.database_name";
pub const TMP_MANIFEST_PATH_KEY: &str = "loader.whale.tmp_manifest_path";

/// Options for [`Orchestrator::run`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Read columns as well as table names where the source supports both.
    pub full_extraction: bool,
    pub verbose: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            full_extraction: true,
            verbose: false,
        }
    }
}

/// Builds the transformer and loader of each task.
pub trait StageFactory {
    fn transformer(&self) -> Box<dyn Transformer>;
    fn loader(&self, paths: &WhalePaths) -> Box<dyn Loader>;
}

/// Markdown rendering into the whale metadata tree.
#[derive(Debug, Default)]
pub struct MarkdownStages;

impl StageFactory for MarkdownStages {
    fn transformer(&self) -> Box<dyn Transformer> {
        Box::new(MarkdownTransformer::default())
    }

    fn loader(&self, paths: &WhalePaths) -> Box<dyn Loader> {
        Box::new(WhaleLoader::new(paths))
    }
}

pub struct Orchestrator {
    paths: WhalePaths,
    configurator: Box<dyn ExtractorConfigurator>,
    stages: Box<dyn StageFactory>,
}

impl Orchestrator {
    pub fn new(paths: WhalePaths) -> Self {
        Self {
            paths,
            configurator: Box::new(SourceConfigurator::default()),
            stages: Box::new(MarkdownStages),
        }
    }

    #[must_use]
    pub fn with_configurator(mut self, configurator: Box<dyn ExtractorConfigurator>) -> Self {
        self.configurator = configurator;
        self
    }

    #[must_use]
    pub fn with_stages(mut self, stages: Box<dyn StageFactory>) -> Self {
        self.stages = stages;
        self
    }

    pub fn paths(&self) -> &WhalePaths {
        &self.paths
    }

    /// Load the connections file, validate it as a whole (names must be
    /// unique) and run every connection in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or validated, or any
    /// connection fails.
    pub fn run(&self, options: &RunOptions) -> Result<RunSummary> {
        let path = self.paths.connections_file();
        let connections = parse_connections(path)?;
        validate_connections(&connections)?;
        tracing::info!(
            path = %path.display(),
            connections = connections.len(),
            full_extraction = options.full_extraction,
            "Starting extraction"
        );
        self.run_connections(&connections, options)
    }

    /// Run `connections` in order. A `build_script` connection, or one whose
    /// source has no extractors, ends the run after it: the connections
    /// following it are not processed.
    ///
    /// # Errors
    ///
    /// The first error from a configurator, task or manifest transfer aborts
    /// the run.
    pub fn run_connections(
        &self,
        connections: &[Connection],
        options: &RunOptions,
    ) -> Result<RunSummary> {
        let start = Instant::now();
        let mut summary = RunSummary::default();

        for connection in connections {
            validate_connection(connection)?;

            let plan = match connection.metadata_source {
                MetadataSource::Presto => self
                    .configurator
                    .configure_presto(connection, options.full_extraction)?,
                MetadataSource::Neo4j => self.configurator.configure_neo4j(connection)?,
                MetadataSource::Bigquery => self.configurator.configure_bigquery(connection)?,
                MetadataSource::Snowflake => self.configurator.configure_snowflake(connection)?,
                MetadataSource::BuildScript => {
                    self.configurator.run_build_script(connection)?;
                    tracing::info!(
                        connection = %connection.name,
                        "Build script finished, skipping remaining connections"
                    );
                    summary.stopped_by = Some(StopReason::BuildScript {
                        connection: connection.name.clone(),
                    });
                    break;
                }
                MetadataSource::Other => {
                    tracing::warn!(
                        connection = %connection.name,
                        "Unsupported metadata source, skipping remaining connections"
                    );
                    summary.stopped_by = Some(StopReason::UnsupportedSource {
                        connection: connection.name.clone(),
                    });
                    break;
                }
            };

            self.run_plan(connection, plan, options, &mut summary)
                .with_context(|| format!("Connection '{}' failed", connection.name))?;
            summary.connections_processed += 1;
        }

        summary.duration_secs = start.elapsed().as_secs_f64();
        Ok(summary)
    }

    fn run_plan(
        &self,
        connection: &Connection,
        plan: ExtractorPlan,
        options: &RunOptions,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let ExtractorPlan {
            extractors,
            mut config,
        } = plan;

        let tmp_manifest = next_tmp_manifest_path(&self.paths)?;
        config.put(DATABASE_NAME_KEY, connection.name.as_str());
        config.put(
            TMP_MANIFEST_PATH_KEY,
            tmp_manifest.to_string_lossy().into_owned(),
        );

        tracing::info!(
            connection = %connection.name,
            source = %connection.metadata_source,
            extractors = extractors.len(),
            tmp_manifest = %tmp_manifest.display(),
            "Extracting connection"
        );

        for (i, extractor) in extractors.into_iter().enumerate() {
            let mut task = WhaleTask::new(
                extractor,
                self.stages.transformer(),
                self.stages.loader(&self.paths),
            )
            .with_verbose(options.verbose);
            task.init(&config)?;
            let stats = task.run()?;
            summary.tasks_run += 1;
            summary.records_loaded += stats.records_loaded;

            // Only the first extractor lists the full table set.
            if i == 0 {
                task.save_stats()?;
                config.pop(TMP_MANIFEST_PATH_KEY);
                transfer_manifest(&tmp_manifest, &self.paths.manifest_path())?;
            }
        }
        Ok(())
    }
}
