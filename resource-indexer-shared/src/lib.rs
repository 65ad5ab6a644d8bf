//! # Resource Indexer Shared
//!
//! This crate defines the data structures shared across the resource indexer:
//! the dynamic per-resource schema, the header alias map, the document shape
//! written to the search index and the validation report.

pub mod types;

pub use types::alias_map::{column_alias, HeaderAliasMap};
pub use types::document::{
    row_identity, CellValue, GeoFields, GeoPoint, IndexedDocument, ResourceRef,
    MAX_IDENTITY_CELL_CHARS,
};
pub use types::schema::{Field, FieldType, GeoRole, GeoRule, Schema};
pub use types::validation::{DataAvailability, IssueLocation, ValidationIssue, ValidationReport};
