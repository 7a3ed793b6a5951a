//! Run summary types.

use std::fmt;

/// Counts for one extract/transform/load task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStats {
    pub records_extracted: u64,
    pub records_loaded: u64,
    pub duration_secs: f64,
}

/// Why a run stopped before reaching the end of the connection list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A build script ran; nothing after it is processed.
    BuildScript { connection: String },
    /// A connection with no extractors for its source; nothing after it is
    /// processed.
    UnsupportedSource { connection: String },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuildScript { connection } => {
                write!(f, "build script of connection '{connection}' ran")
            }
            Self::UnsupportedSource { connection } => {
                write!(f, "connection '{connection}' has an unsupported metadata source")
            }
        }
    }
}

/// Result of [`crate::Orchestrator::run`].
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Connections whose extractors all ran.
    pub connections_processed: usize,
    pub tasks_run: usize,
    pub records_loaded: u64,
    pub stopped_by: Option<StopReason>,
    pub duration_secs: f64,
}
