//! Dependency initialization and wiring for the resource indexer.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use super::{ConnectionMode, IndexerConfig};
use crate::geo::{Geocoder, HttpGeocoder};
use crate::orchestrator::ResourceIndexJob;
use crate::source::TabularSource;
use crate::IndexingError;
use resource_indexer_repository::{OpenSearchProvider, SearchIndexProvider};
use resource_indexer_shared::ResourceRef;

/// Container for all initialized dependencies.
pub struct Dependencies {
    pub config: IndexerConfig,
    /// Search provider shared by all jobs.
    pub provider: Arc<dyn SearchIndexProvider>,
    pub geocoder: Option<Arc<dyn Geocoder>>,
}

impl Dependencies {
    /// Initialize all dependencies from the configuration.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails (only in fail-fast mode)
    pub async fn new(config: IndexerConfig) -> Result<Self, IndexingError> {
        info!(
            opensearch_url = %config.opensearch_url,
            connection_mode = ?config.connection_mode,
            retry_interval_secs = config.retry_interval.as_secs(),
            index_prefix = %config.job.index.prefix,
            geocoder = config.geocoder.url.is_some(),
            "Initializing dependencies"
        );

        let provider = Self::connect_to_opensearch(
            &config.opensearch_url,
            config.job.bulk.request_timeout,
            config.connection_mode,
            config.retry_interval,
        )
        .await?;

        info!("OpenSearch connection established");

        let geocoder = HttpGeocoder::from_config(&config.geocoder)
            .map_err(|e| IndexingError::config(format!("Failed to create geocoder: {}", e)))?
            .map(|g| Arc::new(g) as Arc<dyn Geocoder>);

        Ok(Self {
            config,
            provider: Arc::new(provider),
            geocoder,
        })
    }

    /// Create the index job of one resource.
    pub fn job(&self, resource: ResourceRef, source: Arc<dyn TabularSource>) -> ResourceIndexJob {
        let job = ResourceIndexJob::new(
            resource,
            source,
            self.provider.clone(),
            self.config.job.clone(),
        );
        match &self.geocoder {
            Some(geocoder) => job.with_geocoder(geocoder.clone()),
            None => job,
        }
    }

    /// Connect to OpenSearch with retry logic based on connection mode.
    async fn connect_to_opensearch(
        url: &str,
        bulk_timeout: Duration,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<OpenSearchProvider, IndexingError> {
        loop {
            match Self::try_connect_opensearch(url, bulk_timeout).await {
                Ok(provider) => return Ok(provider),
                Err(e) => match mode {
                    ConnectionMode::FailFast => {
                        return Err(IndexingError::config(format!(
                            "Failed to connect to OpenSearch: {}",
                            e
                        )));
                    }
                    ConnectionMode::Retry => {
                        warn!(
                            opensearch_url = %url,
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect to OpenSearch, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }

    /// Attempt to connect to OpenSearch.
    async fn try_connect_opensearch(
        url: &str,
        bulk_timeout: Duration,
    ) -> Result<OpenSearchProvider, IndexingError> {
        let provider = OpenSearchProvider::new(url, bulk_timeout)
            .await
            .map_err(|e| {
                IndexingError::config(format!("Failed to create OpenSearch provider: {}", e))
            })?;

        provider
            .ping()
            .await
            .map_err(|e| IndexingError::config(format!("OpenSearch is not reachable: {}", e)))?;

        Ok(provider)
    }
}
