//! Configuration and dependency initialization.
//!
//! All settings come from environment variables, optionally loaded from a
//! `.env` file by the binary.

mod dependencies;

pub use dependencies::Dependencies;

use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

use resource_indexer_repository::{BulkConfig, IndexConfig, MappingOptions};
use tracing::warn;

use crate::geo::GeocoderConfig;
use crate::missing_values::MissingValuePolicy;
use crate::orchestrator::JobConfig;
use crate::schema::InferenceConfig;
use crate::validator::ValidatorConfig;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Connection mode for OpenSearch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry connection at a fixed interval until successful.
    Retry,
}

impl ConnectionMode {
    /// Parse a connection mode.
    ///
    /// Valid values: "fail-fast" or "retry" (case-insensitive).
    /// Defaults to "retry" if invalid.
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!(value = %value, "Invalid OPENSEARCH_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

/// Complete indexer configuration.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub opensearch_url: String,
    pub connection_mode: ConnectionMode,
    pub retry_interval: Duration,
    pub job: JobConfig,
    pub geocoder: GeocoderConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            opensearch_url: DEFAULT_OPENSEARCH_URL.to_string(),
            connection_mode: ConnectionMode::Retry,
            retry_interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
            job: JobConfig::default(),
            geocoder: GeocoderConfig::default(),
        }
    }
}

impl IndexerConfig {
    /// Read the configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `OPENSEARCH_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `OPENSEARCH_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    /// - `INDEX_PREFIX`: Prefix of index names (default: "resource")
    /// - `INDEX_NUMBER_OF_SHARDS`, `INDEX_NUMBER_OF_REPLICAS` (default: 1, 1)
    /// - `BULK_CHUNK_SIZE`, `BULK_MAX_CHUNK_SIZE` (default: 500, 5000)
    /// - `BULK_TIMEOUT_SECS`: Timeout of one bulk request (default: 30)
    /// - `SCHEMA_SAMPLE_LIMIT`: Rows read for inference (default: 5000)
    /// - `VALIDATION_ERROR_LIMIT`: Issues per report (default: 10)
    /// - `VALIDATION_SKIP_CHECKS`: Comma-separated checks to skip
    /// - `MISSING_VALUES`: Comma-separated default missing-value tokens
    /// - `GEOCODER_URL`: Nominatim-compatible service (default: unset, no geocoding)
    /// - `GEOCODER_TIMEOUT_SECS`: Geocoding request timeout (default: 10)
    /// - `DATE_FORMATS`, `DATETIME_FORMATS`, `TIME_FORMATS`: `||`-separated date patterns
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let job_defaults = defaults.job;

        let index = IndexConfig {
            prefix: lookup("INDEX_PREFIX").unwrap_or(job_defaults.index.prefix),
            number_of_shards: parse_or(
                &lookup,
                "INDEX_NUMBER_OF_SHARDS",
                job_defaults.index.number_of_shards,
            ),
            number_of_replicas: parse_or(
                &lookup,
                "INDEX_NUMBER_OF_REPLICAS",
                job_defaults.index.number_of_replicas,
            ),
            ..job_defaults.index
        };

        let bulk = BulkConfig {
            chunk_size: parse_or(&lookup, "BULK_CHUNK_SIZE", job_defaults.bulk.chunk_size),
            max_chunk_size: lookup("BULK_MAX_CHUNK_SIZE")
                .and_then(|v| v.parse().ok())
                .or(job_defaults.bulk.max_chunk_size),
            request_timeout: lookup("BULK_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(job_defaults.bulk.request_timeout),
        };

        let mapping = MappingOptions {
            date_formats: list_or(&lookup, "DATE_FORMATS", "||", job_defaults.mapping.date_formats),
            datetime_formats: list_or(
                &lookup,
                "DATETIME_FORMATS",
                "||",
                job_defaults.mapping.datetime_formats,
            ),
            time_formats: list_or(&lookup, "TIME_FORMATS", "||", job_defaults.mapping.time_formats),
            ..job_defaults.mapping
        };

        let inference = InferenceConfig {
            sample_limit: parse_or(
                &lookup,
                "SCHEMA_SAMPLE_LIMIT",
                job_defaults.inference.sample_limit,
            ),
        };

        let validator = ValidatorConfig {
            error_limit: parse_or(
                &lookup,
                "VALIDATION_ERROR_LIMIT",
                job_defaults.validator.error_limit,
            ),
            skip_checks: lookup("VALIDATION_SKIP_CHECKS")
                .map(|v| split_list(&v, ",").into_iter().collect::<BTreeSet<_>>())
                .unwrap_or(job_defaults.validator.skip_checks),
        };

        let missing_values = lookup("MISSING_VALUES")
            .map(|v| MissingValuePolicy::new(v.split(',').map(|t| t.to_string()).collect()))
            .unwrap_or(job_defaults.missing_values);

        let geocoder = GeocoderConfig {
            url: lookup("GEOCODER_URL").filter(|url| !url.trim().is_empty()),
            timeout: lookup("GEOCODER_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.geocoder.timeout),
        };

        Self {
            opensearch_url: lookup("OPENSEARCH_URL").unwrap_or(defaults.opensearch_url),
            connection_mode: lookup("OPENSEARCH_CONNECTION_MODE")
                .map(|v| ConnectionMode::parse(&v))
                .unwrap_or(defaults.connection_mode),
            retry_interval: lookup("OPENSEARCH_RETRY_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_interval),
            job: JobConfig {
                index,
                bulk,
                mapping,
                inference,
                validator,
                missing_values,
            },
            geocoder,
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T {
    match lookup(name) {
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!(variable = name, value = %value, "Invalid value, using default");
            default
        }),
        None => default,
    }
}

fn split_list(value: &str, separator: &str) -> Vec<String> {
    value
        .split(separator)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn list_or(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    separator: &str,
    default: Vec<String>,
) -> Vec<String> {
    lookup(name)
        .map(|value| split_list(&value, separator))
        .filter(|list| !list.is_empty())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> IndexerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        IndexerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config.opensearch_url, "http://localhost:9200");
        assert_eq!(config.connection_mode, ConnectionMode::Retry);
        assert_eq!(config.retry_interval, Duration::from_secs(15));
        assert_eq!(config.job.index.prefix, "resource");
        assert_eq!(config.job.bulk.chunk_size, 500);
        assert_eq!(config.job.bulk.request_timeout, Duration::from_secs(30));
        assert_eq!(config.job.inference.sample_limit, 5000);
        assert_eq!(config.job.validator.error_limit, 10);
        assert!(config.job.validator.skip_checks.contains("blank-row"));
        assert!(config.geocoder.url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("OPENSEARCH_CONNECTION_MODE", "FAIL-FAST"),
            ("INDEX_PREFIX", "dane"),
            ("BULK_CHUNK_SIZE", "100"),
            ("BULK_TIMEOUT_SECS", "5"),
            ("VALIDATION_SKIP_CHECKS", "blank-row, zero-rows"),
            ("DATE_FORMATS", "dd-MM-yyyy||yyyy"),
            ("GEOCODER_URL", "http://nominatim:8080"),
        ]);
        assert_eq!(config.connection_mode, ConnectionMode::FailFast);
        assert_eq!(config.job.index.prefix, "dane");
        assert_eq!(config.job.bulk.chunk_size, 100);
        assert_eq!(config.job.bulk.request_timeout, Duration::from_secs(5));
        assert_eq!(
            config.job.validator.skip_checks.iter().collect::<Vec<_>>(),
            vec!["blank-row", "zero-rows"]
        );
        assert_eq!(config.job.mapping.date_formats, vec!["dd-MM-yyyy", "yyyy"]);
        assert_eq!(config.geocoder.url.as_deref(), Some("http://nominatim:8080"));
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = config(&[
            ("BULK_CHUNK_SIZE", "many"),
            ("OPENSEARCH_CONNECTION_MODE", "sometimes"),
        ]);
        assert_eq!(config.job.bulk.chunk_size, 500);
        assert_eq!(config.connection_mode, ConnectionMode::Retry);
    }

    #[test]
    fn test_missing_values_override() {
        let config = config(&[("MISSING_VALUES", ",-,brak")]);
        let set = config.job.missing_values.resolve::<&str>(&[]);
        assert!(set.is_missing("-"));
        assert!(set.is_missing(""));
        assert!(!set.is_missing("NULL"));
    }
}
