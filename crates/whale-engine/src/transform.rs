//! Second stage: turn metadata records into markdown sections.

use anyhow::Result;
use whale_types::{MetadataRecord, TableKey};

use crate::config::Configuration;

pub const MARKDOWN_SCOPE: &str = "transformer.markdown";
pub const SKIP_EMPTY_INDEXES_KEY: &str = "skip_empty_indexes";

/// Which generated section of a table document a [`MarkdownSection`] replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKind {
    Table,
    Indexes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownSection {
    pub key: TableKey,
    pub kind: SectionKind,
    pub body: String,
}

pub trait Transformer {
    fn scope(&self) -> &str;

    /// # Errors
    ///
    /// Returns an error when the scoped configuration is invalid.
    fn init(&mut self, conf: &Configuration) -> Result<()>;

    /// `None` drops the record.
    ///
    /// # Errors
    ///
    /// Returns an error when the record cannot be rendered.
    fn transform(&mut self, record: MetadataRecord) -> Result<Option<MarkdownSection>>;
}

#[derive(Debug)]
pub struct MarkdownTransformer {
    skip_empty_indexes: bool,
}

impl Default for MarkdownTransformer {
    fn default() -> Self {
        Self {
            skip_empty_indexes: true,
        }
    }
}

impl Transformer for MarkdownTransformer {
    fn scope(&self) -> &str {
        MARKDOWN_SCOPE
    }

    fn init(&mut self, conf: &Configuration) -> Result<()> {
        self.skip_empty_indexes = conf.get_bool(SKIP_EMPTY_INDEXES_KEY, true);
        Ok(())
    }

    fn transform(&mut self, record: MetadataRecord) -> Result<Option<MarkdownSection>> {
        let section = match record {
            MetadataRecord::Table(table) => MarkdownSection {
                body: table.format_for_markdown(),
                key: table.key,
                kind: SectionKind::Table,
            },
            MetadataRecord::Indexes(indexes) => {
                if indexes.indexes.is_empty() && self.skip_empty_indexes {
                    return Ok(None);
                }
                MarkdownSection {
                    body: indexes.format_for_markdown(),
                    key: indexes.key,
                    kind: SectionKind::Indexes,
                }
            }
        };
        Ok(Some(section))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use whale_types::{IndexMetadata, TableIndexes, TableMetadata};

    fn key() -> TableKey {
        TableKey::new("presto", "hive", "core", "users")
    }

    #[test]
    fn table_record_becomes_table_section() {
        let mut transformer = MarkdownTransformer::default();
        let section = transformer
            .transform(TableMetadata::new(key()).into())
            .unwrap()
            .unwrap();
        assert_eq!(section.kind, SectionKind::Table);
        assert!(section.body.starts_with("# `core.users`"));
    }

    #[test]
    fn index_record_becomes_index_section() {
        let mut transformer = MarkdownTransformer::default();
        let index = IndexMetadata::new("presto", "hive", "core", "users", "pk", ["id"])
            .with_index_type("primary");
        let section = transformer
            .transform(TableIndexes::new(key(), vec![index]).into())
            .unwrap()
            .unwrap();
        assert_eq!(section.kind, SectionKind::Indexes);
        assert_eq!(section.body, "## Indexes\n* [primary] `pk` [`id`]");
    }

    #[test]
    fn empty_index_lists_are_skipped_unless_disabled() {
        let mut transformer = MarkdownTransformer::default();
        let empty = || MetadataRecord::from(TableIndexes::new(key(), Vec::new()));
        assert!(transformer.transform(empty()).unwrap().is_none());

        let mut conf = Configuration::new();
        conf.put(SKIP_EMPTY_INDEXES_KEY, false);
        transformer.init(&conf).unwrap();
        assert!(transformer.transform(empty()).unwrap().is_some());
    }
}
