//! One extract → transform → load unit.

use std::time::Instant;

use anyhow::{Context, Result};

use crate::config::Configuration;
use crate::extract::Extractor;
use crate::load::Loader;
use crate::result::TaskStats;
use crate::transform::Transformer;

/// Composes one extractor with a transformer and loader. Call `init`, `run`
/// and optionally `save_stats`, once each and in that order.
pub struct WhaleTask {
    extractor: Box<dyn Extractor>,
    transformer: Box<dyn Transformer>,
    loader: Box<dyn Loader>,
    verbose: bool,
}

impl WhaleTask {
    pub fn new(
        extractor: Box<dyn Extractor>,
        transformer: Box<dyn Transformer>,
        loader: Box<dyn Loader>,
    ) -> Self {
        Self {
            extractor,
            transformer,
            loader,
            verbose: false,
        }
    }

    /// Log every loaded record at info level.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Hand each stage the part of `conf` under its own scope.
    ///
    /// # Errors
    ///
    /// Returns the first stage initialisation error.
    pub fn init(&mut self, conf: &Configuration) -> Result<()> {
        let scope = self.extractor.scope().to_string();
        self.extractor
            .init(&conf.scoped(&scope))
            .with_context(|| format!("Failed to initialise {scope}"))?;

        let scope = self.transformer.scope().to_string();
        self.transformer
            .init(&conf.scoped(&scope))
            .with_context(|| format!("Failed to initialise {scope}"))?;

        let scope = self.loader.scope().to_string();
        self.loader
            .init(&conf.scoped(&scope))
            .with_context(|| format!("Failed to initialise {scope}"))?;
        Ok(())
    }

    /// Pump records until the extractor is exhausted. The loader is closed
    /// whether or not pumping succeeded.
    ///
    /// # Errors
    ///
    /// Returns the first stage error, or the loader's close error.
    pub fn run(&mut self) -> Result<TaskStats> {
        let start = Instant::now();
        let mut stats = TaskStats::default();

        let pumped = self.pump(&mut stats);
        let closed = self.loader.close();
        pumped?;
        closed?;

        stats.duration_secs = start.elapsed().as_secs_f64();
        tracing::info!(
            extractor = self.extractor.scope(),
            extracted = stats.records_extracted,
            loaded = stats.records_loaded,
            duration_secs = stats.duration_secs,
            "Task finished"
        );
        Ok(stats)
    }

    fn pump(&mut self, stats: &mut TaskStats) -> Result<()> {
        while let Some(record) = self.extractor.extract()? {
            stats.records_extracted += 1;
            let key = record.key().clone();

            let Some(section) = self.transformer.transform(record)? else {
                tracing::debug!(table = %key, "Record dropped by transformer");
                continue;
            };
            self.loader.load(section)?;
            stats.records_loaded += 1;

            if self.verbose {
                tracing::info!(table = %key, "Loaded");
            } else {
                tracing::trace!(table = %key, "Loaded");
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the loader's error.
    pub fn save_stats(&self) -> Result<()> {
        self.loader.save_stats()
    }
}
