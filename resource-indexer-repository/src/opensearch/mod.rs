//! OpenSearch implementation of the search index provider.
//!
//! This module provides the index settings, the mapping builder and a
//! concrete implementation of `SearchIndexProvider` backed by OpenSearch.

mod index_config;
mod mapping;
mod provider;

pub use index_config::{get_index_settings, IndexConfig, DEFAULT_INDEX_PREFIX};
pub use mapping::{build_mapping, strftime_to_java, IndexMapping, MappingOptions, META_HEADERS_KEY};
pub use provider::OpenSearchProvider;
