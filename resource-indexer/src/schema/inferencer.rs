//! Type inference over a bounded sample of rows.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use lazy_static::lazy_static;
use regex::Regex;
use resource_indexer_shared::{column_alias, Field, FieldType, Schema};
use serde_json::{Number, Value};
use tracing::{debug, instrument};

use crate::errors::IngestError;
use crate::missing_values::MissingValueSet;
use crate::source::{
    RawValue, TabularSource, ISO_DATETIME_FORMAT, ISO_DATE_FORMAT, ISO_TIME_FORMAT,
};

/// Default number of rows read for inference.
pub const DEFAULT_SAMPLE_LIMIT: usize = 5000;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];
const RFC3339_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

const TRUE_WORDS: &[&str] = &["true", "yes", "tak"];
const FALSE_WORDS: &[&str] = &["false", "no", "nie"];

lazy_static! {
    static ref INTEGER_REGEXP: Regex = Regex::new(r"^[+-]?\d+$").unwrap();
    static ref DECIMAL_REGEXP: Regex =
        Regex::new(r"^[+-]?(\d+([.,]\d+)?|[.,]\d+)([eE][+-]?\d+)?$").unwrap();
    static ref GEOPOINT_REGEXP: Regex =
        Regex::new(r"^[+-]?\d{1,3}\.\d+\s*,\s*[+-]?\d{1,3}\.\d+$").unwrap();
}

/// Configuration of the type inferencer.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Maximum number of data rows read.
    pub sample_limit: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }
}

/// What a single cell, or a whole column so far, looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Evidence {
    Unknown,
    Boolean,
    Integer,
    Number,
    Date(&'static str),
    DateTime(&'static str),
    Time(&'static str),
    GeoPoint,
    Text,
}

impl Evidence {
    /// Smallest type covering both observations.
    fn merge(self, other: Evidence) -> Evidence {
        match (self, other) {
            (Evidence::Unknown, e) | (e, Evidence::Unknown) => e,
            (a, b) if a == b => a,
            (Evidence::Integer, Evidence::Number) | (Evidence::Number, Evidence::Integer) => {
                Evidence::Number
            }
            _ => Evidence::Text,
        }
    }

    /// Field for a finished column; undetermined and pseudo types become strings.
    fn into_field(self, name: String) -> Field {
        match self {
            Evidence::Boolean => Field::new(name, FieldType::Boolean),
            Evidence::Integer => Field::new(name, FieldType::Integer),
            Evidence::Number => Field::new(name, FieldType::Number),
            Evidence::Date(format) => Field::new(name, FieldType::Date).with_format(format),
            Evidence::DateTime(format) => {
                Field::new(name, FieldType::DateTime).with_format(format)
            }
            Evidence::Time(format) => Field::new(name, FieldType::Time).with_format(format),
            Evidence::Unknown | Evidence::GeoPoint | Evidence::Text => {
                Field::new(name, FieldType::String)
            }
        }
    }
}

/// Classify one non-missing cell.
pub(crate) fn classify(value: &RawValue) -> Evidence {
    match value {
        RawValue::Empty => Evidence::Unknown,
        RawValue::Integer(_) => Evidence::Integer,
        RawValue::Number(_) => Evidence::Number,
        RawValue::Boolean(_) => Evidence::Boolean,
        RawValue::Date(_) => Evidence::Date(ISO_DATE_FORMAT),
        RawValue::DateTime(_) => Evidence::DateTime(ISO_DATETIME_FORMAT),
        RawValue::Time(_) => Evidence::Time(ISO_TIME_FORMAT),
        RawValue::Text(text) => classify_text(text.trim()),
    }
}

fn classify_text(text: &str) -> Evidence {
    if text.is_empty() {
        return Evidence::Unknown;
    }
    let lower = text.to_lowercase();
    if TRUE_WORDS.contains(&lower.as_str()) || FALSE_WORDS.contains(&lower.as_str()) {
        return Evidence::Boolean;
    }
    if INTEGER_REGEXP.is_match(text) {
        return if text.parse::<i64>().is_ok() {
            Evidence::Integer
        } else {
            Evidence::Number
        };
    }
    if GEOPOINT_REGEXP.is_match(text) {
        return Evidence::GeoPoint;
    }
    if DECIMAL_REGEXP.is_match(text) {
        return Evidence::Number;
    }
    if let Some(format) = DATE_FORMATS
        .iter()
        .copied()
        .find(|f| NaiveDate::parse_from_str(text, f).is_ok())
    {
        return Evidence::Date(format);
    }
    if DateTime::parse_from_rfc3339(text).is_ok() {
        return Evidence::DateTime(RFC3339_FORMAT);
    }
    if let Some(format) = DATETIME_FORMATS
        .iter()
        .copied()
        .find(|f| NaiveDateTime::parse_from_str(text, f).is_ok())
    {
        return Evidence::DateTime(format);
    }
    if let Some(format) = TIME_FORMATS
        .iter()
        .copied()
        .find(|f| NaiveTime::parse_from_str(text, f).is_ok())
    {
        return Evidence::Time(format);
    }
    Evidence::Text
}

/// Whether a non-missing cell can be read as the field's type.
pub(crate) fn conforms(field: &Field, value: &RawValue) -> bool {
    let evidence = classify(value);
    match field.field_type {
        FieldType::String | FieldType::Any => true,
        FieldType::Integer => evidence == Evidence::Integer,
        FieldType::Number => matches!(evidence, Evidence::Integer | Evidence::Number),
        FieldType::Boolean => evidence == Evidence::Boolean,
        FieldType::Date | FieldType::DateTime | FieldType::Time => {
            let kind_matches = matches!(
                (field.field_type, evidence),
                (FieldType::Date, Evidence::Date(_))
                    | (FieldType::DateTime, Evidence::DateTime(_))
                    | (FieldType::Time, Evidence::Time(_))
            );
            match value {
                RawValue::Text(text) if has_explicit_format(&field.format) => {
                    parses_with(field.field_type, text.trim(), &field.format)
                }
                _ => kind_matches,
            }
        }
    }
}

fn has_explicit_format(format: &str) -> bool {
    format.contains('%')
}

fn parses_with(field_type: FieldType, text: &str, format: &str) -> bool {
    match field_type {
        FieldType::Date => NaiveDate::parse_from_str(text, format).is_ok(),
        FieldType::DateTime => {
            NaiveDateTime::parse_from_str(text, format).is_ok()
                || DateTime::parse_from_str(text, format).is_ok()
        }
        FieldType::Time => NaiveTime::parse_from_str(text, format).is_ok(),
        _ => false,
    }
}

/// Value of a non-missing cell as stored in the field's `val`.
///
/// Boolean and numeric cells become JSON booleans and numbers, with a decimal
/// comma read as a point; everything else keeps its text. `None` when the
/// cell cannot be read as the field's type.
pub(crate) fn typed_value(field: &Field, value: &RawValue) -> Option<Value> {
    match field.field_type {
        FieldType::Boolean => match value {
            RawValue::Boolean(b) => Some(Value::Bool(*b)),
            RawValue::Text(text) => {
                let lower = text.trim().to_lowercase();
                if TRUE_WORDS.contains(&lower.as_str()) {
                    Some(Value::Bool(true))
                } else if FALSE_WORDS.contains(&lower.as_str()) {
                    Some(Value::Bool(false))
                } else {
                    None
                }
            }
            _ => None,
        },
        FieldType::Integer => match value {
            RawValue::Integer(i) => Some(Value::from(*i)),
            RawValue::Number(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Some(Value::from(*f as i64))
            }
            RawValue::Text(text) => text.trim().parse::<i64>().ok().map(Value::from),
            _ => None,
        },
        FieldType::Number => match value {
            RawValue::Integer(i) => Some(Value::from(*i)),
            RawValue::Number(f) => Number::from_f64(*f).map(Value::Number),
            RawValue::Text(text) => parse_number(text.trim()),
            _ => None,
        },
        _ => value.repr().map(Value::String),
    }
}

fn parse_number(text: &str) -> Option<Value> {
    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::from(i));
    }
    if !DECIMAL_REGEXP.is_match(text) && !INTEGER_REGEXP.is_match(text) {
        return None;
    }
    text.replace(',', ".")
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

/// Infers column types from a bounded sample of rows.
#[derive(Debug, Clone, Default)]
pub struct TypeInferencer {
    config: InferenceConfig,
}

impl TypeInferencer {
    pub fn new(config: InferenceConfig) -> Self {
        Self { config }
    }

    pub fn sample_limit(&self) -> usize {
        self.config.sample_limit
    }

    /// Infer the schema of a source.
    ///
    /// Fields are named by their alias (`col1`, `col2`, ...).
    #[instrument(skip_all, fields(format = %source.format()))]
    pub fn infer(
        &self,
        source: &dyn TabularSource,
        missing_values: &MissingValueSet,
    ) -> Result<Schema, IngestError> {
        let width = source.headers()?.len();
        self.infer_rows(width, source.rows()?, missing_values)
    }

    /// Infer the schema of `width` columns from at most `sample_limit` rows.
    ///
    /// Cells matching `missing_values` are not used as evidence.
    pub fn infer_rows<I>(
        &self,
        width: usize,
        rows: I,
        missing_values: &MissingValueSet,
    ) -> Result<Schema, IngestError>
    where
        I: Iterator<Item = Result<Vec<RawValue>, IngestError>>,
    {
        if width == 0 {
            return Err(IngestError::file_access("no tabular structure"));
        }

        let mut columns = vec![Evidence::Unknown; width];
        let mut sampled = 0usize;
        for row in rows.take(self.config.sample_limit) {
            let row = row?;
            sampled += 1;
            for (column, value) in columns.iter_mut().zip(row.iter()) {
                let missing = match value.repr() {
                    Some(text) => missing_values.is_missing(&text),
                    None => true,
                };
                if !missing {
                    *column = column.merge(classify(value));
                }
            }
        }

        debug!(sampled, width, "Inferred column types");

        Ok(Schema::new(
            columns
                .into_iter()
                .enumerate()
                .map(|(i, evidence)| evidence.into_field(column_alias(i + 1)))
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::missing_values::MissingValuePolicy;

    fn text_rows(rows: &[&[&str]]) -> Vec<Result<Vec<RawValue>, IngestError>> {
        rows.iter()
            .map(|row| Ok(row.iter().map(|c| RawValue::from_text(*c)).collect()))
            .collect()
    }

    fn infer(rows: &[&[&str]]) -> Schema {
        let width = rows[0].len();
        TypeInferencer::default()
            .infer_rows(width, text_rows(rows).into_iter(), &MissingValueSet::default())
            .unwrap()
    }

    fn types(schema: &Schema) -> Vec<FieldType> {
        schema.fields.iter().map(|f| f.field_type).collect()
    }

    #[test]
    fn test_classify_text() {
        assert_eq!(classify_text("42"), Evidence::Integer);
        assert_eq!(classify_text("-3.5"), Evidence::Number);
        assert_eq!(classify_text("21,5"), Evidence::Number);
        assert_eq!(classify_text("Tak"), Evidence::Boolean);
        assert_eq!(classify_text("2024-01-31"), Evidence::Date("%Y-%m-%d"));
        assert_eq!(classify_text("31.01.2024"), Evidence::Date("%d.%m.%Y"));
        assert_eq!(
            classify_text("2024-01-31 10:00:00"),
            Evidence::DateTime("%Y-%m-%d %H:%M:%S")
        );
        assert_eq!(
            classify_text("2024-01-31T10:00:00+01:00"),
            Evidence::DateTime(RFC3339_FORMAT)
        );
        assert_eq!(classify_text("10:15"), Evidence::Time("%H:%M"));
        assert_eq!(classify_text("21.0,52.2"), Evidence::GeoPoint);
        assert_eq!(classify_text("Warszawa"), Evidence::Text);
        assert_eq!(classify_text("NaN"), Evidence::Text);
    }

    #[test]
    fn test_types_are_narrowed_across_rows() {
        let schema = infer(&[
            &["1", "1", "2024-01-01", "x"],
            &["2", "2.5", "2024-01-02", "3"],
        ]);
        assert_eq!(
            types(&schema),
            vec![
                FieldType::Integer,
                FieldType::Number,
                FieldType::Date,
                FieldType::String
            ]
        );
        assert_eq!(schema.fields[2].format, "%Y-%m-%d");
        assert_eq!(schema.fields[0].name, "col1");
    }

    #[test]
    fn test_mixed_date_formats_fall_back_to_string() {
        let schema = infer(&[&["2024-01-01"], &["02.01.2024"]]);
        assert_eq!(types(&schema), vec![FieldType::String]);
    }

    #[test]
    fn test_missing_values_are_not_evidence() {
        let missing = MissingValuePolicy::default().resolve(&["NULL", "brak"]);
        let rows = text_rows(&[
            &["", "Warszawa"],
            &["NULL", "Kraków"],
            &["brak", "x"],
            &["12", "y"],
        ]);
        let schema = TypeInferencer::default()
            .infer_rows(2, rows.into_iter(), &missing)
            .unwrap();
        assert_eq!(types(&schema), vec![FieldType::Integer, FieldType::String]);
    }

    #[test]
    fn test_undetermined_and_geopoint_become_string() {
        let schema = infer(&[&["", "21.0,52.2"], &["", "19.9,50.0"]]);
        assert_eq!(types(&schema), vec![FieldType::String, FieldType::String]);
    }

    #[test]
    fn test_sample_limit_bounds_reading() {
        let rows = text_rows(&[&["1"], &["2"], &["tekst"]]);
        let inferencer = TypeInferencer::new(InferenceConfig { sample_limit: 2 });
        let schema = inferencer
            .infer_rows(1, rows.into_iter(), &MissingValueSet::default())
            .unwrap();
        assert_eq!(types(&schema), vec![FieldType::Integer]);
    }

    #[test]
    fn test_native_values() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let rows = vec![Ok(vec![
            RawValue::Integer(1),
            RawValue::Date(date),
            RawValue::Boolean(true),
        ])];
        let schema = TypeInferencer::default()
            .infer_rows(3, rows.into_iter(), &MissingValueSet::default())
            .unwrap();
        assert_eq!(
            types(&schema),
            vec![FieldType::Integer, FieldType::Date, FieldType::Boolean]
        );
    }

    #[test]
    fn test_zero_width_is_file_access_error() {
        let result = TypeInferencer::default().infer_rows(
            0,
            std::iter::empty(),
            &MissingValueSet::default(),
        );
        assert!(matches!(result, Err(IngestError::FileAccessError(_))));
    }

    #[test]
    fn test_conforms() {
        let integer = Field::new("n", FieldType::Integer);
        assert!(conforms(&integer, &RawValue::from_text("12")));
        assert!(!conforms(&integer, &RawValue::from_text("1.5")));

        let number = Field::new("x", FieldType::Number);
        assert!(conforms(&number, &RawValue::from_text("12")));
        assert!(conforms(&number, &RawValue::Number(0.5)));

        let date = Field::new("d", FieldType::Date).with_format("%d.%m.%Y");
        assert!(conforms(&date, &RawValue::from_text("31.01.2024")));
        assert!(!conforms(&date, &RawValue::from_text("2024-01-31")));

        let any_date = Field::new("d", FieldType::Date);
        assert!(conforms(&any_date, &RawValue::from_text("2024-01-31")));
        assert!(conforms(&Field::new("s", FieldType::Any), &RawValue::from_text("?")));
    }

    #[test]
    fn test_typed_values_match_field_types() {
        let boolean = Field::new("b", FieldType::Boolean);
        assert_eq!(typed_value(&boolean, &RawValue::from_text("Tak")), Some(json!(true)));
        assert_eq!(typed_value(&boolean, &RawValue::from_text("nie")), Some(json!(false)));
        assert_eq!(typed_value(&boolean, &RawValue::Boolean(true)), Some(json!(true)));
        assert_eq!(typed_value(&boolean, &RawValue::from_text("maybe")), None);

        let number = Field::new("x", FieldType::Number);
        assert_eq!(typed_value(&number, &RawValue::from_text("21,5")), Some(json!(21.5)));
        assert_eq!(typed_value(&number, &RawValue::from_text(" 3.75 ")), Some(json!(3.75)));
        assert_eq!(typed_value(&number, &RawValue::from_text("12")), Some(json!(12)));
        assert_eq!(typed_value(&number, &RawValue::from_text("1,2,3")), None);

        let integer = Field::new("n", FieldType::Integer);
        assert_eq!(typed_value(&integer, &RawValue::from_text("-7")), Some(json!(-7)));
        assert_eq!(typed_value(&integer, &RawValue::Number(4.0)), Some(json!(4)));
        assert_eq!(typed_value(&integer, &RawValue::from_text("dwa")), None);

        let date = Field::new("d", FieldType::Date).with_format("%d.%m.%Y");
        assert_eq!(
            typed_value(&date, &RawValue::from_text("31.01.2024")),
            Some(json!("31.01.2024"))
        );
        let text = Field::new("s", FieldType::String);
        assert_eq!(typed_value(&text, &RawValue::from_text("tak")), Some(json!("tak")));
    }
}
