//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate.

use std::time::Duration;

use async_trait::async_trait;
use opensearch::{
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{
        IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesFlushParts,
        IndicesGetMappingParts, IndicesPutMappingParts,
    },
    BulkParts, OpenSearch,
};
use resource_indexer_shared::{HeaderAliasMap, IndexedDocument};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::DEFAULT_BULK_TIMEOUT;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::mapping::META_HEADERS_KEY;
use crate::types::{BatchOperationResult, BatchOperationSummary};
use crate::utils::validate_index_name;

/// OpenSearch provider implementation.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// let provider = OpenSearchProvider::new("http://localhost:9200", Duration::from_secs(30)).await?;
/// provider.bulk_index("resource-42", &documents).await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
    bulk_timeout: Duration,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `bulk_timeout` - Timeout applied to each bulk request
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchIndexError)` - If connection setup fails
    pub async fn new(url: &str, bulk_timeout: Duration) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            bulk_timeout_secs = bulk_timeout.as_secs(),
            "Created OpenSearch provider"
        );

        Ok(Self {
            client,
            bulk_timeout,
        })
    }

    /// Create a provider with the default bulk timeout.
    pub async fn with_default_timeout(url: &str) -> Result<Self, SearchIndexError> {
        Self::new(url, DEFAULT_BULK_TIMEOUT).await
    }

    /// Check that the cluster answers.
    pub async fn ping(&self) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .ping()
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        if !response.status_code().is_success() {
            return Err(SearchIndexError::connection(format!(
                "ping returned status {}",
                response.status_code()
            )));
        }
        Ok(())
    }

    /// Build the newline-delimited bulk body: an `index` action line followed
    /// by the document source, per document.
    fn build_bulk_body(
        documents: &[IndexedDocument],
    ) -> Result<Vec<JsonBody<Value>>, SearchIndexError> {
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(documents.len() * 2);
        for doc in documents {
            let source = serde_json::to_value(doc)
                .map_err(|e| SearchIndexError::serialization(e.to_string()))?;
            body.push(json!({"index": {"_id": doc.document_id()}}).into());
            body.push(source.into());
        }
        Ok(body)
    }

    /// Turn a bulk response body into per-document results.
    ///
    /// Items are matched to documents by position, which the bulk API preserves.
    fn parse_bulk_response(
        response: &Value,
        documents: &[IndexedDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let items = response
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| SearchIndexError::parse("Bulk response has no items"))?;

        if items.len() != documents.len() {
            return Err(SearchIndexError::parse(format!(
                "Bulk response has {} items for {} documents",
                items.len(),
                documents.len()
            )));
        }

        let results = items
            .iter()
            .zip(documents)
            .map(|(item, doc)| {
                let outcome = item.get("index").unwrap_or(item);
                let status = outcome.get("status").and_then(Value::as_u64).unwrap_or(0);
                let error = outcome.get("error").map(describe_item_error);
                let success = (200..300).contains(&status) && error.is_none();
                BatchOperationResult {
                    document_id: doc.document_id(),
                    success,
                    error: if success {
                        None
                    } else {
                        Some(error.unwrap_or_else(|| format!("status {}", status)))
                    },
                }
            })
            .collect();

        Ok(BatchOperationSummary::from_results(results))
    }

    /// Extract the header alias map from a get-mapping response.
    fn aliases_from_mapping(response: &Value) -> Option<HeaderAliasMap> {
        response
            .as_object()?
            .values()
            .find_map(|index| index.pointer(&format!("/mappings/_meta/{}", META_HEADERS_KEY)))
            .and_then(|headers| serde_json::from_value(headers.clone()).ok())
    }
}

fn describe_item_error(error: &Value) -> String {
    match (
        error.get("type").and_then(Value::as_str),
        error.get("reason").and_then(Value::as_str),
    ) {
        (Some(kind), Some(reason)) => format!("{}: {}", kind, reason),
        (Some(kind), None) => kind.to_string(),
        _ => error.to_string(),
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(SearchIndexError::unknown(format!(
                "Index exists check for {} returned status {}",
                index, status
            ))),
        }
    }

    async fn create_index(&self, index: &str, body: &Value) -> Result<(), SearchIndexError> {
        validate_index_name(index)?;

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(body.clone())
            .send()
            .await
            .map_err(|e| SearchIndexError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            // Another run may have created it in the meantime
            if error_body.contains("resource_already_exists_exception") {
                debug!(index = %index, "Index already exists");
                return Ok(());
            }
            error!(status = %status, body = %error_body, "Create index request failed");
            return Err(SearchIndexError::index_creation(format!(
                "Create index failed with status {}: {}",
                status, error_body
            )));
        }

        info!(index = %index, "Index created");
        Ok(())
    }

    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index]))
            .body(mapping.clone())
            .send()
            .await
            .map_err(|e| SearchIndexError::mapping(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Put mapping request failed");
            return Err(SearchIndexError::mapping(format!(
                "Put mapping failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(index = %index, "Mapping applied");
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::delete(e.to_string()))?;

        let status = response.status_code();

        // 404 is acceptable - index may not exist
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Delete index request failed");
            return Err(SearchIndexError::delete(format!(
                "Delete index failed with status {}: {}",
                status, error_body
            )));
        }

        info!(index = %index, "Index deleted");
        Ok(())
    }

    async fn bulk_index(
        &self,
        index: &str,
        documents: &[IndexedDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if documents.is_empty() {
            return Ok(BatchOperationSummary::default());
        }

        let body = Self::build_bulk_body(documents)?;

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .request_timeout(self.bulk_timeout)
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::bulk_index(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchIndexError::bulk_index(format!(
                "Bulk request failed with status {}: {}",
                status, error_body
            )));
        }

        let response_body = response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        let summary = Self::parse_bulk_response(&response_body, documents)?;
        if summary.failed > 0 {
            warn!(
                index = %index,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "Bulk request completed with item failures"
            );
        } else {
            debug!(index = %index, count = summary.succeeded, "Bulk request completed");
        }
        Ok(summary)
    }

    async fn flush(&self, index: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .flush(IndicesFlushParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::flush(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Flush request failed");
            return Err(SearchIndexError::flush(format!(
                "Flush failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(index = %index, "Index flushed");
        Ok(())
    }

    async fn header_aliases(
        &self,
        index: &str,
    ) -> Result<Option<HeaderAliasMap>, SearchIndexError> {
        let response = self
            .client
            .indices()
            .get_mapping(IndicesGetMappingParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::mapping(e.to_string()))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchIndexError::mapping(format!(
                "Get mapping failed with status {}: {}",
                status, error_body
            )));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;
        Ok(Self::aliases_from_mapping(&body))
    }
}
