//! Filesystem layout of a whale installation.

use std::path::{Path, PathBuf};

/// Environment variable that overrides the default base directory.
pub const BASE_DIR_ENV: &str = "WHALE_HOME";

/// Well-known locations below the whale base directory.
///
/// Passed explicitly to the orchestrator and loader so that tests can point a
/// whole run at a temporary directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhalePaths {
    base_dir: PathBuf,
    connections_file: PathBuf,
}

impl WhalePaths {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let connections_file = base_dir.join("config").join("connections.yaml");
        Self {
            base_dir,
            connections_file,
        }
    }

    /// Resolve the base directory: explicit path, then `$WHALE_HOME`, then
    /// `$HOME/.whale`.
    pub fn resolve(explicit: Option<&Path>) -> Self {
        if let Some(dir) = explicit {
            return Self::new(dir);
        }
        if let Ok(dir) = std::env::var(BASE_DIR_ENV) {
            return Self::new(dir);
        }
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        Self::new(PathBuf::from(home).join(".whale"))
    }

    #[must_use]
    pub fn with_connections_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.connections_file = path.into();
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn connections_file(&self) -> &Path {
        &self.connections_file
    }

    pub fn manifests_dir(&self) -> PathBuf {
        self.base_dir.join("manifests")
    }

    /// Canonical manifest that downstream consumers read.
    pub fn manifest_path(&self) -> PathBuf {
        self.manifests_dir().join("manifest.txt")
    }

    /// Default temp manifest written by the first extractor of a connection.
    pub fn tmp_manifest_path(&self) -> PathBuf {
        self.manifests_dir().join("tmp_manifest.txt")
    }

    /// Fallback temp manifest used when another run holds the default one.
    pub fn numbered_tmp_manifest_path(&self, k: u32) -> PathBuf {
        self.manifests_dir().join(format!("tmp_manifest_{k}.txt"))
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.base_dir.join("metadata")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }
}
