//! # Resource Indexer
//!
//! Makes the rows of tabular open-data resources searchable. Each resource
//! gets its own index whose mapping is derived from the resource's schema.
//!
//! ## Architecture
//!
//! The indexer follows the Source-Processor-Loader pattern:
//!
//! 1. **Source**: Reads raw rows of a resource file
//! 2. **Schema**: Infers or loads the schema, with header aliases
//! 3. **Processor**: Normalizes rows into documents (missing values, geo, identity)
//! 4. **Loader**: Writes documents into the index in bulk chunks
//! 5. **Orchestrator**: Runs indexing and validation for one resource
//!
//! ## Modules
//!
//! - [`config`]: Configuration and dependency initialization
//! - [`source`]: Tabular source interface and readers
//! - [`missing_values`]: Missing-value policy
//! - [`schema`]: Type inference and the schema store
//! - [`geo`]: Geo resolution and geocoding
//! - [`processor`]: Transforms rows into documents
//! - [`loader`]: Indexes documents into OpenSearch
//! - [`validator`]: Structural and schema checks
//! - [`orchestrator`]: The per-resource index job
//! - [`errors`]: Error types for the indexer

pub mod config;
pub mod errors;
pub mod geo;
pub mod loader;
pub mod missing_values;
pub mod orchestrator;
pub mod processor;
pub mod schema;
pub mod source;
pub mod validator;

pub use config::{Dependencies, IndexerConfig};
pub use errors::IngestError;
pub use orchestrator::{JobConfig, ResourceIndexJob};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
