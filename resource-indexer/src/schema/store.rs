//! Authoritative schema of one resource.

use std::sync::Arc;

use resource_indexer_shared::{HeaderAliasMap, Schema};
use tracing::{debug, info};

use super::TypeInferencer;
use crate::errors::IngestError;
use crate::missing_values::MissingValueSet;
use crate::source::TabularSource;

/// Holds the explicit or inferred schema of a resource and its alias map.
///
/// Inference runs at most once until [`SchemaStore::invalidate`] is called,
/// which the owner does whenever the underlying file changes.
pub struct SchemaStore {
    source: Arc<dyn TabularSource>,
    inferencer: TypeInferencer,
    missing_values: MissingValueSet,
    override_schema: Option<Schema>,
    inferred: Option<Schema>,
    aliases: Option<HeaderAliasMap>,
}

impl SchemaStore {
    pub fn new(
        source: Arc<dyn TabularSource>,
        inferencer: TypeInferencer,
        missing_values: MissingValueSet,
    ) -> Self {
        Self {
            source,
            inferencer,
            missing_values,
            override_schema: None,
            inferred: None,
            aliases: None,
        }
    }

    /// Use an explicit schema instead of inference.
    pub fn with_override(mut self, schema: Schema) -> Self {
        self.override_schema = Some(schema);
        self
    }

    pub fn override_schema(&self) -> Option<&Schema> {
        self.override_schema.as_ref()
    }

    /// Get the schema of the resource.
    ///
    /// An explicit schema is returned as declared unless `revalidate` is set,
    /// in which case the source is inferred again. With `use_aliases`, field
    /// names are rewritten from `col<N>` to the source headers and `any` is
    /// reported as `string`.
    ///
    /// # Errors
    ///
    /// * `FileAccessError` - If the source cannot be read
    /// * `SchemaOverrideError` - If the explicit schema does not fit the source
    pub fn get_schema(
        &mut self,
        use_aliases: bool,
        revalidate: bool,
    ) -> Result<Schema, IngestError> {
        let schema = match (&self.override_schema, revalidate) {
            (Some(explicit), false) => {
                self.check_override(explicit)?;
                explicit.clone()
            }
            _ => self.inferred(revalidate)?,
        };

        if use_aliases {
            self.externalize(schema)
        } else {
            Ok(schema)
        }
    }

    /// Map between `col<N>` aliases and the source headers.
    pub fn alias_map(&mut self) -> Result<HeaderAliasMap, IngestError> {
        if let Some(aliases) = &self.aliases {
            return Ok(aliases.clone());
        }
        let aliases = HeaderAliasMap::from_headers(&self.source.headers()?);
        self.aliases = Some(aliases.clone());
        Ok(aliases)
    }

    /// Drop cached derived state.
    pub fn invalidate(&mut self) {
        debug!("Schema cache invalidated");
        self.inferred = None;
        self.aliases = None;
    }

    fn inferred(&mut self, refresh: bool) -> Result<Schema, IngestError> {
        if !refresh {
            if let Some(schema) = &self.inferred {
                return Ok(schema.clone());
            }
        }
        let schema = self
            .inferencer
            .infer(self.source.as_ref(), &self.missing_values)?;
        info!(
            columns = schema.len(),
            sample_limit = self.inferencer.sample_limit(),
            "Schema inferred"
        );
        self.inferred = Some(schema.clone());
        Ok(schema)
    }

    fn check_override(&self, explicit: &Schema) -> Result<(), IngestError> {
        if explicit.is_empty() {
            return Err(IngestError::schema_override("explicit schema has no fields"));
        }
        let width = self.source.headers()?.len();
        if width != explicit.len() {
            return Err(IngestError::schema_override(format!(
                "explicit schema has {} fields but the source has {} columns",
                explicit.len(),
                width
            )));
        }
        Ok(())
    }

    fn externalize(&mut self, mut schema: Schema) -> Result<Schema, IngestError> {
        let aliases = self.alias_map()?;
        for field in schema.fields.iter_mut() {
            if let Some(header) = aliases.header_for(&field.name) {
                field.name = header.to_string();
            }
            field.field_type = field.field_type.external();
        }
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemorySource, RowIter, SourceFormat};
    use resource_indexer_shared::{Field, FieldType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source that counts how often it is read.
    struct CountingSource {
        inner: MemorySource,
        reads: AtomicUsize,
    }

    impl TabularSource for CountingSource {
        fn format(&self) -> SourceFormat {
            self.inner.format()
        }

        fn headers(&self) -> Result<Vec<String>, IngestError> {
            self.inner.headers()
        }

        fn rows(&self) -> Result<RowIter<'_>, IngestError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.rows()
        }
    }

    fn counting_source() -> Arc<CountingSource> {
        Arc::new(CountingSource {
            inner: MemorySource::from_text(&["Miasto", "", "Miasto"], &[["Warszawa", "1", "x"]]),
            reads: AtomicUsize::new(0),
        })
    }

    fn store(source: Arc<CountingSource>) -> SchemaStore {
        SchemaStore::new(source, TypeInferencer::default(), MissingValueSet::default())
    }

    #[test]
    fn test_inferred_schema_is_cached_until_invalidated() {
        let source = counting_source();
        let mut store = store(source.clone());

        let first = store.get_schema(false, false).unwrap();
        let second = store.get_schema(false, false).unwrap();
        assert_eq!(first, second);
        assert_eq!(source.reads.load(Ordering::SeqCst), 1);

        store.invalidate();
        store.get_schema(false, false).unwrap();
        assert_eq!(source.reads.load(Ordering::SeqCst), 2);

        store.get_schema(false, true).unwrap();
        assert_eq!(source.reads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_aliases_are_rewritten_to_headers() {
        let mut store = store(counting_source());

        let internal = store.get_schema(false, false).unwrap();
        let names: Vec<&str> = internal.field_names().collect();
        assert_eq!(names, vec!["col1", "col2", "col3"]);

        let external = store.get_schema(true, false).unwrap();
        let names: Vec<&str> = external.field_names().collect();
        assert_eq!(names, vec!["Miasto", "col2", "Miasto_3"]);
        assert_eq!(external.fields[1].field_type, FieldType::Integer);
    }

    #[test]
    fn test_override_is_returned_verbatim() {
        let source = counting_source();
        let explicit = Schema::new(vec![
            Field::new("Miasto", FieldType::String),
            Field::new("Kod", FieldType::Any),
            Field::new("Inne", FieldType::Integer),
        ]);
        let mut store = store(source.clone()).with_override(explicit.clone());

        assert_eq!(store.get_schema(false, false).unwrap(), explicit);
        assert_eq!(source.reads.load(Ordering::SeqCst), 0);

        let external = store.get_schema(true, false).unwrap();
        assert_eq!(external.fields[1].field_type, FieldType::String);

        let revalidated = store.get_schema(false, true).unwrap();
        assert_eq!(revalidated.fields[0].name, "col1");
        assert_eq!(source.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_override_width_mismatch() {
        let explicit = Schema::new(vec![Field::new("Miasto", FieldType::String)]);
        let mut store = store(counting_source()).with_override(explicit);
        assert!(matches!(
            store.get_schema(false, false),
            Err(IngestError::SchemaOverrideError(_))
        ));

        let mut empty = self::store(counting_source()).with_override(Schema::default());
        assert!(matches!(
            empty.get_schema(false, false),
            Err(IngestError::SchemaOverrideError(_))
        ));
    }
}
