//! Final stage: merge markdown sections into per-table documents.
//!
//! A table document holds the generated sections, then the
//! [`USER_NOTES_MARKER`] line, then free-form notes owned by the user. Loading
//! a section rewrites only that section; the notes are carried over verbatim.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use whale_types::INDEXES_HEADER;

use crate::config::{Configuration, WhalePaths};
use crate::transform::{MarkdownSection, SectionKind};

pub const WHALE_SCOPE: &str = "loader.whale";
pub const DATABASE_NAME_KEY: &str = "database_name";
pub const TMP_MANIFEST_PATH_KEY: &str = "tmp_manifest_path";
pub const USER_NOTES_MARKER: &str = "*Do not make edits above this line.*";

pub trait Loader {
    fn scope(&self) -> &str;

    /// # Errors
    ///
    /// Returns an error when a required key is missing or the manifest cannot
    /// be opened.
    fn init(&mut self, conf: &Configuration) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error on filesystem failures.
    fn load(&mut self, section: MarkdownSection) -> Result<()>;

    /// Flush and release anything held open by [`Loader::load`].
    ///
    /// # Errors
    ///
    /// Returns an error when buffered output cannot be written.
    fn close(&mut self) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error when the statistics file cannot be written.
    fn save_stats(&self) -> Result<()>;
}

/// A table document split into its parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataDocument {
    pub table: Option<String>,
    pub indexes: Option<String>,
    pub notes: String,
}

impl MetadataDocument {
    /// Split existing file content. Content without the marker is all notes.
    pub fn parse(content: &str) -> Self {
        let Some(at) = content.find(USER_NOTES_MARKER) else {
            return Self {
                notes: content.to_string(),
                ..Self::default()
            };
        };

        let generated = content[..at].trim_end();
        let rest = &content[at + USER_NOTES_MARKER.len()..];
        let notes = rest.strip_prefix('\n').unwrap_or(rest).to_string();

        let (table, indexes) = match find_line(generated, INDEXES_HEADER) {
            Some(split) => (&generated[..split], Some(&generated[split..])),
            None => (generated, None),
        };

        Self {
            table: non_empty(table),
            indexes: indexes.and_then(non_empty),
            notes,
        }
    }

    pub fn set(&mut self, kind: SectionKind, body: String) {
        match kind {
            SectionKind::Table => self.table = Some(body),
            SectionKind::Indexes => self.indexes = Some(body),
        }
    }

    pub fn render(&self) -> String {
        let generated: Vec<&str> = [self.table.as_deref(), self.indexes.as_deref()]
            .into_iter()
            .flatten()
            .collect();

        let mut out = generated.join("\n\n");
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(USER_NOTES_MARKER);
        out.push('\n');
        out.push_str(&self.notes);
        out
    }
}

/// Byte offset of the first line equal to `header`.
fn find_line(text: &str, header: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim_end() == header {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

fn non_empty(section: &str) -> Option<String> {
    let section = section.trim();
    (!section.is_empty()).then(|| section.to_string())
}

#[derive(Debug, Serialize)]
struct LoadStats<'a> {
    database_name: &'a str,
    records_loaded: u64,
    files_written: usize,
    manifest_path: Option<&'a Path>,
    finished_at: DateTime<Utc>,
}

/// Writes `{metadata}/{database_name}/{stem}.md` for every section loaded.
pub struct WhaleLoader {
    metadata_dir: PathBuf,
    logs_dir: PathBuf,
    database_name: String,
    manifest_path: Option<PathBuf>,
    manifest: Option<BufWriter<File>>,
    written: BTreeSet<PathBuf>,
    records_loaded: u64,
}

impl WhaleLoader {
    pub fn new(paths: &WhalePaths) -> Self {
        Self {
            metadata_dir: paths.metadata_dir(),
            logs_dir: paths.logs_dir(),
            database_name: String::new(),
            manifest_path: None,
            manifest: None,
            written: BTreeSet::new(),
            records_loaded: 0,
        }
    }

    pub fn records_loaded(&self) -> u64 {
        self.records_loaded
    }

    fn stats_path(&self) -> PathBuf {
        self.logs_dir.join(format!("{}_stats.json", self.database_name))
    }
}

impl Loader for WhaleLoader {
    fn scope(&self) -> &str {
        WHALE_SCOPE
    }

    fn init(&mut self, conf: &Configuration) -> Result<()> {
        self.database_name = conf.require_str(DATABASE_NAME_KEY)?.to_string();
        self.manifest_path = conf.get_str(TMP_MANIFEST_PATH_KEY).map(PathBuf::from);

        if let Some(path) = &self.manifest_path {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create manifest directory: {}", parent.display())
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open manifest: {}", path.display()))?;
            self.manifest = Some(BufWriter::new(file));
        }
        Ok(())
    }

    fn load(&mut self, section: MarkdownSection) -> Result<()> {
        let relative = Path::new(&self.database_name).join(format!("{}.md", section.key.file_stem()));
        let path = self.metadata_dir.join(&relative);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut document = match fs::read_to_string(&path) {
            Ok(content) => MetadataDocument::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => MetadataDocument::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        document.set(section.kind, section.body);
        fs::write(&path, document.render())
            .with_context(|| format!("Failed to write {}", path.display()))?;

        if self.written.insert(relative.clone()) {
            if let Some(manifest) = self.manifest.as_mut() {
                writeln!(manifest, "{}", relative.display())
                    .context("Failed to append to manifest")?;
            }
        }
        self.records_loaded += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut manifest) = self.manifest.take() {
            manifest.flush().context("Failed to flush manifest")?;
        }
        Ok(())
    }

    fn save_stats(&self) -> Result<()> {
        let stats = LoadStats {
            database_name: &self.database_name,
            records_loaded: self.records_loaded,
            files_written: self.written.len(),
            manifest_path: self.manifest_path.as_deref(),
            finished_at: Utc::now(),
        };
        let path = self.stats_path();
        fs::create_dir_all(&self.logs_dir)
            .with_context(|| format!("Failed to create directory: {}", self.logs_dir.display()))?;
        let json = serde_json::to_string_pretty(&stats).context("Failed to serialize stats")?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::debug!(path = %path.display(), records = self.records_loaded, "Saved load stats");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use whale_types::TableKey;

    fn section(kind: SectionKind, body: &str) -> MarkdownSection {
        MarkdownSection {
            key: TableKey::new("presto", "hive", "core", "users"),
            kind,
            body: body.to_string(),
        }
    }

    fn loader(base: &Path, manifest: Option<&Path>) -> WhaleLoader {
        let mut conf = Configuration::new();
        conf.put(DATABASE_NAME_KEY, "warehouse");
        if let Some(manifest) = manifest {
            conf.put(TMP_MANIFEST_PATH_KEY, manifest.display().to_string());
        }
        let mut loader = WhaleLoader::new(&WhalePaths::new(base));
        loader.init(&conf).unwrap();
        loader
    }

    #[test]
    fn document_parse_splits_sections_and_notes() {
        let content = "# `core.users`\n`presto` | `hive`\n\n## Indexes\n* [] `pk` [`id`]\n\n\
                       *Do not make edits above this line.*\nmy notes\n";
        let document = MetadataDocument::parse(content);
        assert_eq!(document.table.as_deref(), Some("# `core.users`\n`presto` | `hive`"));
        assert_eq!(document.indexes.as_deref(), Some("## Indexes\n* [] `pk` [`id`]"));
        assert_eq!(document.notes, "my notes\n");
        assert_eq!(document.render(), content);
    }

    #[test]
    fn content_without_marker_is_kept_as_notes() {
        let mut document = MetadataDocument::parse("hand written\n");
        document.set(SectionKind::Table, "# `a.b`".into());
        assert_eq!(
            document.render(),
            "# `a.b`\n\n*Do not make edits above this line.*\nhand written\n"
        );
    }

    #[test]
    fn init_requires_database_name() {
        let mut loader = WhaleLoader::new(&WhalePaths::new("/nonexistent"));
        let err = loader.init(&Configuration::new()).unwrap_err().to_string();
        assert!(err.contains("database_name"));
    }

    #[test]
    fn reload_replaces_section_and_keeps_notes() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = loader(dir.path(), None);
        loader.load(section(SectionKind::Table, "# old")).unwrap();

        let path = dir.path().join("metadata/warehouse/hive.core.users.md");
        let edited = fs::read_to_string(&path).unwrap() + "keep me\n";
        fs::write(&path, edited).unwrap();

        loader.load(section(SectionKind::Table, "# new")).unwrap();
        loader.load(section(SectionKind::Indexes, "## Indexes\n* [] `pk` [`id`]")).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "# new\n\n## Indexes\n* [] `pk` [`id`]\n\n*Do not make edits above this line.*\nkeep me\n"
        );
        assert_eq!(loader.records_loaded(), 3);
    }

    #[test]
    fn manifest_lists_each_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("manifests/tmp_manifest.txt");
        let mut loader = loader(dir.path(), Some(&manifest));
        loader.load(section(SectionKind::Table, "# t")).unwrap();
        loader.load(section(SectionKind::Indexes, "## Indexes")).unwrap();
        loader.close().unwrap();

        assert_eq!(
            fs::read_to_string(&manifest).unwrap(),
            "warehouse/hive.core.users.md\n"
        );
    }

    #[test]
    fn stats_are_written_per_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = loader(dir.path(), None);
        loader.load(section(SectionKind::Table, "# t")).unwrap();
        loader.save_stats().unwrap();

        let raw = fs::read_to_string(dir.path().join("logs/warehouse_stats.json")).unwrap();
        let stats: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(stats["records_loaded"], 1);
        assert_eq!(stats["files_written"], 1);
        assert!(stats["finished_at"].is_string());
    }
}
