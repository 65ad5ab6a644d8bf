//! Document types for the search index.
//!
//! Every row of a resource becomes one `IndexedDocument`. Column values are
//! stored as `{repr, val}` pairs under their internal `col<N>` key.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Longest cell prefix, in characters, that takes part in row identity.
pub const MAX_IDENTITY_CELL_CHARS: usize = 10_000;

/// Deterministic document id for a row.
///
/// The id is a name-based UUID over the pipe-joined raw cell texts, each
/// capped at [`MAX_IDENTITY_CELL_CHARS`] characters. Rows with the same
/// content get the same id.
pub fn row_identity<I, S>(values: I) -> Uuid
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = values
        .into_iter()
        .map(|v| v.as_ref().chars().take(MAX_IDENTITY_CELL_CHARS).collect::<String>())
        .collect::<Vec<_>>()
        .join("|");
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, joined.as_bytes())
}

/// A single column value with its original text and its searchable value.
///
/// `val` holds the value typed for the column's index field: a JSON boolean
/// or number for boolean and numeric columns, text otherwise. It is `None`
/// when the cell is missing or matched a missing-value token; `repr` still
/// carries what the file contained.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CellValue {
    pub repr: Option<String>,
    pub val: Option<Value>,
}

impl CellValue {
    pub fn new(repr: Option<String>, val: Option<Value>) -> Self {
        Self { repr, val }
    }

    /// A cell whose value is withheld but whose text is kept.
    pub fn missing(repr: Option<String>) -> Self {
        Self { repr, val: None }
    }

    /// A text cell; `val` repeats the text.
    pub fn present(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            repr: Some(text.clone()),
            val: Some(Value::String(text)),
        }
    }

    /// A cell whose text was converted to a typed value.
    pub fn typed(repr: impl Into<String>, val: Value) -> Self {
        Self {
            repr: Some(repr.into()),
            val: Some(val).filter(|v| !v.is_null()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CellWire {
    Pair {
        #[serde(default)]
        repr: Option<Value>,
        #[serde(default)]
        val: Option<Value>,
    },
    Scalar(Value),
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl<'de> Deserialize<'de> for CellValue {
    /// Accepts both the pair form and a bare scalar, which is promoted to
    /// `{repr: text of v, val: v}`.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match CellWire::deserialize(deserializer)? {
            CellWire::Pair { repr, val } => CellValue {
                repr: repr.as_ref().and_then(scalar_text),
                val: val.filter(|v| !v.is_null()),
            },
            CellWire::Scalar(value) => CellValue {
                repr: scalar_text(&value),
                val: Some(value).filter(|v| !v.is_null()),
            },
        })
    }
}

/// The resource a row belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
    pub title: String,
}

impl ResourceRef {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Geographic fields attached to documents of geo-enabled resources.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoFields {
    /// GeoJSON point.
    pub shape: Value,
    /// `[lon, lat]`.
    pub point: [f64; 2],
    pub label: Option<String>,
    pub shape_type: u8,
}

impl GeoFields {
    pub const POINT_SHAPE_TYPE: u8 = 1;

    pub fn from_point(point: GeoPoint, label: Option<String>) -> Self {
        Self {
            shape: serde_json::json!({
                "type": "Point",
                "coordinates": [point.lon, point.lat]
            }),
            point: [point.lon, point.lat],
            label,
            shape_type: Self::POINT_SHAPE_TYPE,
        }
    }
}

/// One row of a resource as stored in the search index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedDocument {
    /// Document id in the index; not part of the source body.
    #[serde(skip)]
    pub id: Uuid,
    #[serde(flatten)]
    pub columns: BTreeMap<String, CellValue>,
    pub resource: ResourceRef,
    pub updated_at: DateTime<Utc>,
    pub row_no: u64,
    #[serde(flatten)]
    pub geo: Option<GeoFields>,
}

impl IndexedDocument {
    pub fn document_id(&self) -> String {
        self.id.to_string()
    }

    /// Read the column values of a stored document source.
    ///
    /// Only `col<N>` keys are considered. Bare scalars written by older
    /// indexers are promoted to the pair form.
    pub fn columns_from_source(source: &Map<String, Value>) -> BTreeMap<String, CellValue> {
        source
            .iter()
            .filter(|(key, _)| is_column_key(key))
            .filter_map(|(key, value)| {
                serde_json::from_value::<CellValue>(value.clone())
                    .ok()
                    .map(|cell| (key.clone(), cell))
            })
            .collect()
    }
}

fn is_column_key(key: &str) -> bool {
    key.strip_prefix("col")
        .map(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}
