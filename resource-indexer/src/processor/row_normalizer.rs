use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use resource_indexer_shared::{
    column_alias, row_identity, CellValue, Field, GeoFields, IndexedDocument, ResourceRef,
    Schema,
};
use tracing::trace;

use crate::geo::GeoResolver;
use crate::missing_values::MissingValueSet;
use crate::schema::typed_value;
use crate::source::RawValue;

/// Converts raw rows of one resource into indexed documents.
///
/// Row numbers count only the rows that produced a document candidate, so
/// blank rows do not consume a number.
pub struct RowNormalizer {
    schema: Schema,
    missing_values: MissingValueSet,
    resource: ResourceRef,
    updated_at: DateTime<Utc>,
    resolver: GeoResolver,
    next_row_no: u64,
}

impl RowNormalizer {
    pub fn new(
        schema: Schema,
        missing_values: MissingValueSet,
        resource: ResourceRef,
        resolver: GeoResolver,
    ) -> Self {
        Self {
            schema,
            missing_values,
            resource,
            updated_at: Utc::now(),
            resolver,
            next_row_no: 1,
        }
    }

    /// Use a fixed timestamp instead of the creation time.
    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Normalize one row; `None` for rows with no non-blank cell.
    pub async fn normalize(&mut self, row: &[RawValue]) -> Option<IndexedDocument> {
        if row.iter().all(RawValue::is_blank) {
            trace!(next_row_no = self.next_row_no, "Skipping blank row");
            return None;
        }

        let width = self.schema.len();
        let id = row_identity((0..width).map(|i| {
            row.get(i).map(RawValue::raw_text).unwrap_or_default()
        }));

        let columns: BTreeMap<String, CellValue> = self
            .schema
            .fields
            .iter()
            .enumerate()
            .map(|(i, field)| (column_alias(i + 1), self.cell_value(field, row.get(i))))
            .collect();

        let geo = match self.schema.complete_geo().cloned() {
            Some(role) => {
                let label = role
                    .label
                    .as_deref()
                    .and_then(|name| self.schema.position(name))
                    .and_then(|position| row.get(position))
                    .and_then(RawValue::repr);
                self.resolver
                    .resolve(row, &self.schema, &role)
                    .await
                    .map(|point| GeoFields::from_point(point, label))
            }
            None => None,
        };

        let row_no = self.next_row_no;
        self.next_row_no += 1;

        Some(IndexedDocument {
            id,
            columns,
            resource: self.resource.clone(),
            updated_at: self.updated_at,
            row_no,
            geo,
        })
    }

    fn cell_value(&self, field: &Field, value: Option<&RawValue>) -> CellValue {
        let Some(value) = value else {
            return CellValue::default();
        };
        match value.repr() {
            Some(text) if !self.missing_values.is_missing(&text) => {
                match typed_value(field, value) {
                    Some(val) => CellValue::typed(text, val),
                    None => {
                        trace!(
                            field = %field.name,
                            repr = %text,
                            "Value does not fit the field type"
                        );
                        CellValue::missing(Some(text))
                    }
                }
            }
            repr => CellValue::missing(repr),
        }
    }
}
