//! Loader module for the resource indexer ingest.
//!
//! Drives the lifecycle of one resource index and writes documents to it in
//! bulk chunks.

use std::sync::Arc;

use resource_indexer_repository::{
    get_index_settings, BatchOperationSummary, IndexConfig, IndexMapping, SearchIndexProvider,
};
use resource_indexer_shared::IndexedDocument;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::errors::IngestError;

/// Lifecycle state of the index during one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Uninitialized,
    MappingApplied,
    Flushed,
}

/// Outcome of one indexing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Whether the final flush was performed.
    pub flushed: bool,
}

/// Loader that writes the documents of one resource into its index.
///
/// A chunk that fails, in part or as a whole, is counted and the run goes on.
/// The index is flushed at the end only if at least one document was written.
pub struct SearchLoader {
    provider: Arc<dyn SearchIndexProvider>,
    index_name: String,
    settings: Value,
    state: IndexState,
    succeeded: usize,
    failed: usize,
}

impl SearchLoader {
    /// Create a new loader for the named index.
    pub fn new(
        provider: Arc<dyn SearchIndexProvider>,
        index_name: impl Into<String>,
        index_config: &IndexConfig,
    ) -> Self {
        Self {
            provider,
            index_name: index_name.into(),
            settings: get_index_settings(index_config),
            state: IndexState::Uninitialized,
            succeeded: 0,
            failed: 0,
        }
    }

    pub fn state(&self) -> IndexState {
        self.state
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Make the index ready for writes.
    ///
    /// With `force`, the existing index is deleted first. A missing index is
    /// created with the configured settings and the mapping; an existing one
    /// gets the mapping applied.
    #[instrument(skip(self, mapping), fields(index = %self.index_name))]
    pub async fn prepare(
        &mut self,
        force: bool,
        mapping: &IndexMapping,
    ) -> Result<(), IngestError> {
        if force {
            info!("Deleting index before re-indexing");
            self.provider.delete_index(&self.index_name).await?;
            self.state = IndexState::Uninitialized;
        }

        let mappings = mapping.to_json();
        if self.provider.index_exists(&self.index_name).await? {
            debug!("Index exists, applying mapping");
            self.provider.put_mapping(&self.index_name, &mappings).await?;
        } else {
            info!(fields = mapping.fields.len(), "Creating index");
            let body = json!({
                "settings": self.settings,
                "mappings": mappings
            });
            self.provider.create_index(&self.index_name, &body).await?;
        }

        self.state = IndexState::MappingApplied;
        self.succeeded = 0;
        self.failed = 0;
        Ok(())
    }

    /// Write one chunk of documents.
    ///
    /// Documents rejected by the backend, or a chunk whose request failed,
    /// are added to the failure count rather than returned as an error.
    #[instrument(skip(self, documents), fields(index = %self.index_name, count = documents.len()))]
    pub async fn load(
        &mut self,
        documents: &[IndexedDocument],
    ) -> Result<BatchOperationSummary, IngestError> {
        if self.state != IndexState::MappingApplied {
            return Err(IngestError::loader(format!(
                "cannot write to index {} in state {:?}",
                self.index_name, self.state
            )));
        }
        if documents.is_empty() {
            return Ok(BatchOperationSummary::default());
        }

        let summary = match self.provider.bulk_index(&self.index_name, documents).await {
            Ok(summary) => {
                if summary.failed > 0 {
                    warn!(
                        succeeded = summary.succeeded,
                        failed = summary.failed,
                        "Bulk write completed with some failures"
                    );
                    for result in summary.failures() {
                        if let Some(ref err) = result.error {
                            error!(
                                document_id = %result.document_id,
                                error = %err,
                                "Failed to index document"
                            );
                        }
                    }
                } else {
                    debug!(count = summary.succeeded, "Successfully indexed all documents");
                }
                summary
            }
            Err(e) => {
                error!(error = %e, count = documents.len(), "Bulk write failed");
                BatchOperationSummary::all_failed(documents, &e.to_string())
            }
        };

        self.succeeded += summary.succeeded;
        self.failed += summary.failed;
        Ok(summary)
    }

    /// Count documents that never reached the index.
    pub fn record_failures(&mut self, count: usize) {
        self.failed += count;
    }

    /// End the run, flushing the index if anything was written.
    #[instrument(skip(self), fields(index = %self.index_name))]
    pub async fn finish(&mut self) -> Result<LoadSummary, IngestError> {
        let flushed = if self.succeeded > 0 {
            self.provider.flush(&self.index_name).await?;
            self.state = IndexState::Flushed;
            true
        } else {
            warn!(failed = self.failed, "Nothing indexed, index left unflushed");
            false
        };

        let summary = LoadSummary {
            succeeded: self.succeeded,
            failed: self.failed,
            flushed,
        };
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            flushed = summary.flushed,
            "Indexing run finished"
        );
        Ok(summary)
    }
}
