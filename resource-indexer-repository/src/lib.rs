//! # Resource Indexer Repository
//!
//! This crate provides the search-engine seam of the resource indexer: the
//! `SearchIndexProvider` trait, the mapping builder that turns a dynamic
//! schema into an index mapping, and a concrete implementation for OpenSearch.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;
pub mod utils;

pub use config::BulkConfig;
pub use errors::SearchIndexError;
pub use interfaces::SearchIndexProvider;
pub use opensearch::{
    build_mapping, get_index_settings, IndexConfig, IndexMapping, MappingOptions,
    OpenSearchProvider,
};
pub use types::{BatchOperationResult, BatchOperationSummary};
pub use utils::validate_index_name;
