//! Shared whale types: connection descriptors and metadata records.
//!
//! This crate has no I/O. Records render themselves to markdown fragments; the
//! engine decides where those fragments end up on disk.

pub mod connection;
pub mod index;
pub mod record;
pub mod table;

pub use connection::{Connection, MetadataSource};
pub use index::{IndexMetadata, Tag};
pub use record::{MetadataRecord, TableKey};
pub use table::{ColumnMetadata, TableIndexes, TableMetadata, COLUMN_DETAILS_HEADER, INDEXES_HEADER};
