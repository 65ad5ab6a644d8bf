//! Configuration types for bulk writes.

use std::time::Duration;

/// Default number of documents sent in one bulk request.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Default timeout of a single bulk request.
pub const DEFAULT_BULK_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for bulk writes to the search index.
///
/// Bulk requests are never retried by the indexer; the timeout bounds how
/// long one chunk may block a run.
#[derive(Debug, Clone)]
pub struct BulkConfig {
    /// Number of documents per bulk request.
    pub chunk_size: usize,

    /// Upper bound accepted for `chunk_size`, including per-run overrides.
    ///
    /// Set to `None` to disable the limit (not recommended for production).
    pub max_chunk_size: Option<usize>,

    /// Timeout applied to every bulk request.
    pub request_timeout: Duration,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_chunk_size: Some(5000),
            request_timeout: DEFAULT_BULK_TIMEOUT,
        }
    }
}

impl BulkConfig {
    /// Create a config with a custom chunk size and default limits.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            ..Self::default()
        }
    }

    /// Create a config with no chunk size limit.
    ///
    /// # Warning
    ///
    /// Very large chunks can time out and are then counted as failed in full.
    pub fn unlimited() -> Self {
        Self {
            max_chunk_size: None,
            ..Self::default()
        }
    }

    /// Chunk size to use for a run, clamped to `1..=max_chunk_size`.
    pub fn effective_chunk_size(&self, requested: Option<usize>) -> usize {
        let size = requested.unwrap_or(self.chunk_size).max(1);
        match self.max_chunk_size {
            Some(max) => size.min(max),
            None => size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BulkConfig::default();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.effective_chunk_size(None), 500);
    }

    #[test]
    fn test_effective_chunk_size_is_clamped() {
        let config = BulkConfig::default();
        assert_eq!(config.effective_chunk_size(Some(0)), 1);
        assert_eq!(config.effective_chunk_size(Some(100)), 100);
        assert_eq!(config.effective_chunk_size(Some(1_000_000)), 5000);
        assert_eq!(
            BulkConfig::unlimited().effective_chunk_size(Some(1_000_000)),
            1_000_000
        );
    }
}
