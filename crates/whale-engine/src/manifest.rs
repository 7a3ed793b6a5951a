//! Temp-manifest placement and handoff.
//!
//! The probe in [`next_tmp_manifest_path`] only checks for existence; two runs
//! starting at the same moment can still pick the same path.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::WhalePaths;

/// The default temp manifest if it is free, otherwise the numbered one with
/// the smallest free suffix.
///
/// # Errors
///
/// Returns an error when existence cannot be determined.
pub fn next_tmp_manifest_path(paths: &WhalePaths) -> Result<PathBuf> {
    let default = paths.tmp_manifest_path();
    if !exists(&default)? {
        return Ok(default);
    }

    let mut k = 0;
    loop {
        let candidate = paths.numbered_tmp_manifest_path(k);
        if !exists(&candidate)? {
            tracing::debug!(path = %candidate.display(), "Default temp manifest in use");
            return Ok(candidate);
        }
        k += 1;
    }
}

fn exists(path: &Path) -> Result<bool> {
    path.try_exists()
        .with_context(|| format!("Failed to probe {}", path.display()))
}

/// Merge the temp manifest into the canonical one and remove it. Entries
/// already listed keep their place; new ones are appended in temp order. A
/// missing temp manifest means nothing was loaded and is not an error.
///
/// # Errors
///
/// Returns an error when either manifest cannot be read or written.
pub fn transfer_manifest(tmp: &Path, manifest: &Path) -> Result<()> {
    if !exists(tmp)? {
        tracing::debug!(path = %tmp.display(), "No temp manifest to transfer");
        return Ok(());
    }
    if let Some(parent) = manifest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let incoming = read_entries(tmp)?;
    let mut merged = if exists(manifest)? {
        read_entries(manifest)?
    } else {
        Vec::new()
    };
    let mut seen: HashSet<String> = merged.iter().cloned().collect();
    let before = merged.len();
    for entry in incoming {
        if seen.insert(entry.clone()) {
            merged.push(entry);
        }
    }

    let mut content = merged.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    fs::write(manifest, content)
        .with_context(|| format!("Failed to write {}", manifest.display()))?;
    fs::remove_file(tmp).with_context(|| format!("Failed to remove {}", tmp.display()))?;

    tracing::info!(
        from = %tmp.display(),
        to = %manifest.display(),
        added = merged.len() - before,
        "Merged manifest"
    );
    Ok(())
}

fn read_entries(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
