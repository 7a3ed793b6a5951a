//! Extraction orchestration for whale.
//!
//! Reads connection descriptors, builds extractors per source type, runs
//! extract → transform → load tasks, and hands the table manifest off once the
//! first extractor of each connection has finished.

pub mod client;
pub mod config;
pub mod extract;
pub mod load;
pub mod manifest;
pub mod orchestrator;
pub mod result;
pub mod task;
pub mod transform;

// Re-export public API for convenience
pub use config::{Configuration, WhalePaths};
pub use extract::{ExtractorConfigurator, ExtractorPlan, SourceConfigurator};
pub use orchestrator::{MarkdownStages, Orchestrator, RunOptions, StageFactory};
pub use result::{RunSummary, StopReason, TaskStats};
pub use task::WhaleTask;
