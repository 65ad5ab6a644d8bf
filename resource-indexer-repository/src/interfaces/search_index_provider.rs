//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch, etc.).

use async_trait::async_trait;
use resource_indexer_shared::{HeaderAliasMap, IndexedDocument};
use serde_json::Value;

use crate::errors::SearchIndexError;
use crate::types::BatchOperationSummary;

/// Abstracts the underlying search index implementation (OpenSearch, Elasticsearch, etc.).
///
/// Every resource is indexed into its own index, so all methods take the
/// index name explicitly. Implementations are injected into the bulk loader
/// to enable dependency injection and easy testing with mock implementations.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Check whether the index exists.
    async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError>;

    /// Create the index with the given body (`settings` and `mappings`).
    ///
    /// Creating an index that already exists is not an error.
    async fn create_index(&self, index: &str, body: &Value) -> Result<(), SearchIndexError>;

    /// Apply a mapping to an existing index.
    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), SearchIndexError>;

    /// Delete the index.
    ///
    /// Deleting an index that does not exist is considered successful.
    async fn delete_index(&self, index: &str) -> Result<(), SearchIndexError>;

    /// Write documents in one bulk request, replacing documents with the same id.
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Per-document outcome, including partial failures
    /// * `Err(SearchIndexError)` - If the request as a whole failed
    async fn bulk_index(
        &self,
        index: &str,
        documents: &[IndexedDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError>;

    /// Flush the index so written documents are durable and visible.
    async fn flush(&self, index: &str) -> Result<(), SearchIndexError>;

    /// Read the header alias map stored in the index mapping metadata.
    ///
    /// Returns `Ok(None)` if the index does not exist or carries no aliases.
    async fn header_aliases(&self, index: &str)
        -> Result<Option<HeaderAliasMap>, SearchIndexError>;
}
