//! Response types for search index operations.

use resource_indexer_shared::IndexedDocument;
use serde::Serialize;

/// Result of a bulk write for a single document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOperationResult {
    /// Id of the document in the index.
    pub document_id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error reported by the backend if the operation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a bulk write containing aggregate statistics and individual results.
///
/// This allows callers to handle partial failures gracefully: a chunk with a
/// few rejected documents still reports every accepted one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOperationSummary {
    /// Total number of documents in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each document.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    /// Build a summary from individual results.
    pub fn from_results(results: Vec<BatchOperationResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// Mark every document of a batch as failed with the same reason.
    pub fn all_failed(documents: &[IndexedDocument], reason: &str) -> Self {
        Self::from_results(
            documents
                .iter()
                .map(|doc| BatchOperationResult {
                    document_id: doc.document_id(),
                    success: false,
                    error: Some(reason.to_string()),
                })
                .collect(),
        )
    }

    pub fn failures(&self) -> impl Iterator<Item = &BatchOperationResult> {
        self.results.iter().filter(|r| !r.success)
    }
}
