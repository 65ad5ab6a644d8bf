//! Schema types for tabular resources.
//!
//! A schema is an ordered list of fields. The position of a field decides the
//! internal column key (`col<N>`) it is stored under in the search index.

use serde::{Deserialize, Serialize};

/// Value type of a single column.
///
/// `Any` is kept internally to mark columns whose type is uncertain. It is
/// reported as `String` to external consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    Date,
    DateTime,
    Time,
    Any,
}

impl FieldType {
    /// The lowercase name used in serialized schemas.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Time => "time",
            FieldType::Any => "any",
        }
    }

    /// Returns true for date, datetime and time columns.
    pub fn is_temporal(&self) -> bool {
        matches!(self, FieldType::Date | FieldType::DateTime | FieldType::Time)
    }

    /// The type shown to consumers outside the indexer.
    pub fn external(self) -> Self {
        match self {
            FieldType::Any => FieldType::String,
            other => other,
        }
    }
}

impl From<String> for FieldType {
    /// Unknown type names fall back to `Any`.
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "string" => FieldType::String,
            "integer" => FieldType::Integer,
            "number" => FieldType::Number,
            "boolean" => FieldType::Boolean,
            "date" => FieldType::Date,
            "datetime" => FieldType::DateTime,
            "time" => FieldType::Time,
            _ => FieldType::Any,
        }
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_format() -> String {
    "default".to_string()
}

/// A single column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default = "default_format")]
    pub format: String,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            format: default_format(),
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }
}

/// Assignment of schema columns to geographic roles.
///
/// Only one rule is used per row, in this order: `b`/`l` pair, `uaddress`,
/// then `place` + `postal_code` (with optional `street` and `house_number`).
/// `label` names the column whose value labels the resulting point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoRole {
    /// Latitude column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<String>,
    /// Longitude column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uaddress: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// The resolution rule a geo role selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoRule<'a> {
    Coordinates {
        lat: &'a str,
        lon: &'a str,
    },
    UniversalAddress(&'a str),
    Place {
        place: &'a str,
        postal_code: &'a str,
        street: Option<&'a str>,
        house_number: Option<&'a str>,
    },
}

impl GeoRole {
    /// First applicable rule, or `None` when no rule has all its columns.
    pub fn rule(&self) -> Option<GeoRule<'_>> {
        if let (Some(lat), Some(lon)) = (self.b.as_deref(), self.l.as_deref()) {
            return Some(GeoRule::Coordinates { lat, lon });
        }
        if let Some(uaddress) = self.uaddress.as_deref() {
            return Some(GeoRule::UniversalAddress(uaddress));
        }
        if let (Some(place), Some(postal_code)) =
            (self.place.as_deref(), self.postal_code.as_deref())
        {
            return Some(GeoRule::Place {
                place,
                postal_code,
                street: self.street.as_deref(),
                house_number: self.house_number.as_deref(),
            });
        }
        None
    }

    /// A role is complete when it has a label column and one usable rule.
    pub fn is_complete(&self) -> bool {
        self.label.is_some() && self.rule().is_some()
    }
}

/// Ordered column definitions for one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoRole>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields, geo: None }
    }

    pub fn with_geo(mut self, geo: GeoRole) -> Self {
        self.geo = Some(geo);
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Position of the named field, 0-based.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// The geo role, only if it is complete.
    pub fn complete_geo(&self) -> Option<&GeoRole> {
        self.geo.as_ref().filter(|g| g.is_complete())
    }
}
