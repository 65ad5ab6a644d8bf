//! OpenSearch index configuration and settings.
//!
//! Each resource gets its own index, named `<prefix>-<resource_id>`.

use serde_json::{json, Value};

use crate::errors::SearchIndexError;
use crate::utils::validate_index_name;

/// The default prefix of resource index names.
pub const DEFAULT_INDEX_PREFIX: &str = "resource";

/// Configuration for resource indices.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Prefix of every resource index name.
    pub prefix: String,
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
    /// Maximum number of mapped fields per index.
    ///
    /// Every column maps to several fields (`repr`, `val` and sub-fields),
    /// so wide spreadsheets need more than the engine default of 1000.
    pub total_fields_limit: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_INDEX_PREFIX.to_string(),
            number_of_shards: 1,
            number_of_replicas: 1,
            total_fields_limit: 4000,
        }
    }
}

impl IndexConfig {
    /// Create a new index configuration with default settings.
    ///
    /// # Arguments
    ///
    /// * `prefix` - The index name prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Get the index name of a resource.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The index name (e.g., "resource-42")
    /// * `Err(SearchIndexError::ValidationError)` - If the name is not a valid index name
    pub fn index_name(&self, resource_id: &str) -> Result<String, SearchIndexError> {
        let name = format!("{}-{}", self.prefix, resource_id).to_lowercase();
        validate_index_name(&name)?;
        Ok(name)
    }
}

/// Get the index settings applied to every resource index.
///
/// # Sharding Configuration
///
/// Shard and replica counts come from the configuration; the defaults are
/// one primary shard and one replica.
pub fn get_index_settings(config: &IndexConfig) -> Value {
    json!({
        "index": {
            "number_of_shards": config.number_of_shards,
            "number_of_replicas": config.number_of_replicas,
            "mapping": {
                "total_fields": {
                    "limit": config.total_fields_limit
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_settings_structure() {
        let settings = get_index_settings(&IndexConfig::default());

        assert_eq!(settings["index"]["number_of_shards"], 1);
        assert_eq!(settings["index"]["number_of_replicas"], 1);
        assert_eq!(settings["index"]["mapping"]["total_fields"]["limit"], 4000);
    }

    #[test]
    fn test_index_name() {
        let config = IndexConfig::default();
        assert_eq!(config.index_name("42").unwrap(), "resource-42");
        assert_eq!(config.index_name("ABC").unwrap(), "resource-abc");
        assert_eq!(IndexConfig::new("data").index_name("7").unwrap(), "data-7");
    }

    #[test]
    fn test_invalid_resource_id() {
        let config = IndexConfig::default();
        assert!(matches!(
            config.index_name("a/b"),
            Err(SearchIndexError::ValidationError(_))
        ));
    }
}
