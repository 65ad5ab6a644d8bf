//! Orchestrator module for the resource indexer ingest.
//!
//! Coordinates the schema store, processor, and loader for one resource.

use std::collections::HashSet;
use std::sync::Arc;

use resource_indexer_repository::{
    build_mapping, BulkConfig, IndexConfig, MappingOptions, SearchIndexProvider,
};
use resource_indexer_shared::{DataAvailability, ResourceRef, Schema, ValidationReport};
use tracing::{debug, info, instrument, warn};

use crate::errors::IngestError;
use crate::geo::{GeoResolver, Geocoder};
use crate::loader::{LoadSummary, SearchLoader};
use crate::missing_values::{MissingValuePolicy, MissingValueSet};
use crate::processor::RowNormalizer;
use crate::schema::{InferenceConfig, SchemaStore, TypeInferencer};
use crate::source::TabularSource;
use crate::validator::{ensure_passed, Validator, ValidatorConfig};

/// Configuration shared by index jobs.
#[derive(Debug, Clone, Default)]
pub struct JobConfig {
    pub index: IndexConfig,
    pub bulk: BulkConfig,
    pub mapping: MappingOptions,
    pub inference: InferenceConfig,
    pub validator: ValidatorConfig,
    pub missing_values: MissingValuePolicy,
}

/// Indexing and validation of one resource.
///
/// Each job owns its index; jobs for different resources share nothing but
/// the search provider.
pub struct ResourceIndexJob {
    resource: ResourceRef,
    source: Arc<dyn TabularSource>,
    provider: Arc<dyn SearchIndexProvider>,
    geocoder: Option<Arc<dyn Geocoder>>,
    config: JobConfig,
    missing_values: MissingValueSet,
    schema_store: SchemaStore,
    validator: Validator,
    last_report: Option<ValidationReport>,
    last_run_flushed: bool,
}

impl ResourceIndexJob {
    /// Create a job with the default missing values and an inferred schema.
    pub fn new(
        resource: ResourceRef,
        source: Arc<dyn TabularSource>,
        provider: Arc<dyn SearchIndexProvider>,
        config: JobConfig,
    ) -> Self {
        let missing_values = config.missing_values.resolve::<&str>(&[]);
        let schema_store = SchemaStore::new(
            source.clone(),
            TypeInferencer::new(config.inference.clone()),
            missing_values.clone(),
        );
        let validator = Validator::new(config.validator.clone());
        Self {
            resource,
            source,
            provider,
            geocoder: None,
            config,
            missing_values,
            schema_store,
            validator,
            last_report: None,
            last_run_flushed: false,
        }
    }

    /// Add the resource's special signs to the missing values.
    pub fn with_special_signs<S: AsRef<str>>(mut self, special_signs: &[S]) -> Self {
        self.missing_values = self.config.missing_values.resolve(special_signs);
        self.rebuild_store(None)
    }

    /// Use an explicit schema instead of inference.
    pub fn with_schema(self, schema: Schema) -> Self {
        self.rebuild_store(Some(schema))
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    fn rebuild_store(mut self, schema: Option<Schema>) -> Self {
        let schema = schema.or_else(|| self.schema_store.override_schema().cloned());
        let store = SchemaStore::new(
            self.source.clone(),
            TypeInferencer::new(self.config.inference.clone()),
            self.missing_values.clone(),
        );
        self.schema_store = match schema {
            Some(schema) => store.with_override(schema),
            None => store,
        };
        self
    }

    pub fn resource(&self) -> &ResourceRef {
        &self.resource
    }

    /// Name of the resource's index.
    pub fn index_name(&self) -> Result<String, IngestError> {
        Ok(self.config.index.index_name(&self.resource.id)?)
    }

    /// Schema of the resource; see [`SchemaStore::get_schema`].
    pub fn schema(&mut self, use_aliases: bool, revalidate: bool) -> Result<Schema, IngestError> {
        self.schema_store.get_schema(use_aliases, revalidate)
    }

    /// Forget cached schema state after the file changed.
    pub fn invalidate(&mut self) {
        self.schema_store.invalidate();
    }

    /// Index every row of the resource.
    ///
    /// The schema is resolved before the index is touched, so unreadable
    /// files leave no index behind. With `force` the index is dropped and
    /// rebuilt. `chunk_size` overrides the configured bulk chunk size.
    ///
    /// # Returns
    ///
    /// * `Ok(LoadSummary)` - Success and failure counts; failed chunks do not abort the run
    /// * `Err(IngestError)` - If the file, the schema or the index lifecycle failed
    #[instrument(skip(self), fields(resource_id = %self.resource.id))]
    pub async fn index(
        &mut self,
        force: bool,
        chunk_size: Option<usize>,
    ) -> Result<LoadSummary, IngestError> {
        let index_name = self.index_name()?;
        let schema = self.schema_store.get_schema(true, false)?;
        let mapping = build_mapping(&schema, &self.config.mapping);
        let chunk_size = self.config.bulk.effective_chunk_size(chunk_size);

        let source = self.source.clone();
        let rows = source.rows()?;

        info!(
            index = %index_name,
            columns = schema.len(),
            geo = schema.complete_geo().is_some(),
            chunk_size,
            force,
            "Indexing resource"
        );

        self.last_run_flushed = false;
        let mut loader = SearchLoader::new(self.provider.clone(), index_name, &self.config.index);
        loader.prepare(force, &mapping).await?;

        let mut normalizer = RowNormalizer::new(
            schema,
            self.missing_values.clone(),
            self.resource.clone(),
            GeoResolver::new(self.geocoder.clone()),
        );

        let mut seen = HashSet::new();
        let mut chunk = Vec::with_capacity(chunk_size);
        for (index, row) in rows.enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!(row = index + 1, error = %e, "Failed to read row");
                    loader.record_failures(1);
                    continue;
                }
            };
            let Some(document) = normalizer.normalize(&row).await else {
                continue;
            };
            if !seen.insert(document.id) {
                debug!(row_no = document.row_no, "Row duplicates an earlier row");
                continue;
            }
            chunk.push(document);
            if chunk.len() >= chunk_size {
                loader.load(&chunk).await?;
                chunk.clear();
            }
        }
        loader.load(&chunk).await?;

        let summary = loader.finish().await?;
        self.last_run_flushed = summary.flushed;
        Ok(summary)
    }

    /// Validate the resource file; see [`Validator::validate_resource`].
    #[instrument(skip(self), fields(resource_id = %self.resource.id))]
    pub fn validate(&mut self) -> Result<ValidationReport, IngestError> {
        let report = self.validator.validate_resource(
            &mut self.schema_store,
            self.source.as_ref(),
            &self.missing_values,
        )?;
        self.last_report = Some(report.clone());
        Ok(report)
    }

    /// Validate and turn a failed report into an error.
    pub fn ensure_valid(&mut self) -> Result<ValidationReport, IngestError> {
        let report = self.validate()?;
        ensure_passed(&report)?;
        Ok(report)
    }

    pub fn last_report(&self) -> Option<&ValidationReport> {
        self.last_report.as_ref()
    }

    /// Whether the resource's rows can be served from its index.
    pub async fn availability(&self) -> Result<DataAvailability, IngestError> {
        let index_exists = self.provider.index_exists(&self.index_name()?).await?;
        Ok(DataAvailability {
            index_exists,
            last_validation_passed: self.last_report.as_ref().is_some_and(|r| r.passed()),
            last_run_flushed: self.last_run_flushed,
        })
    }
}
