//! Error types for the resource indexer ingest.

use resource_indexer_repository::SearchIndexError;
use thiserror::Error;

/// Errors that can occur while reading, validating or indexing a resource.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The file is missing, unreadable or in an unsupported format.
    ///
    /// Raised before any index mutation.
    #[error("File access error: {0}")]
    FileAccessError(String),

    /// The validator reported a non-conforming structure.
    #[error("Schema validation error: {0}")]
    SchemaValidationError(String),

    /// The explicit schema cannot be applied to the source.
    #[error("Schema override error: {0}")]
    SchemaOverrideError(String),

    /// Error from the loader component.
    #[error("Loader error: {0}")]
    LoaderError(String),

    /// Error from the search index provider.
    #[error("Search index error: {0}")]
    SearchError(#[from] SearchIndexError),
}

impl IngestError {
    /// Create a file access error.
    pub fn file_access(msg: impl Into<String>) -> Self {
        Self::FileAccessError(msg.into())
    }

    /// Create a schema validation error.
    pub fn schema_validation(msg: impl Into<String>) -> Self {
        Self::SchemaValidationError(msg.into())
    }

    /// Create a schema override error.
    pub fn schema_override(msg: impl Into<String>) -> Self {
        Self::SchemaOverrideError(msg.into())
    }

    /// Create a loader error.
    pub fn loader(msg: impl Into<String>) -> Self {
        Self::LoaderError(msg.into())
    }
}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        Self::FileAccessError(err.to_string())
    }
}

impl From<csv::Error> for IngestError {
    fn from(err: csv::Error) -> Self {
        Self::FileAccessError(err.to_string())
    }
}
