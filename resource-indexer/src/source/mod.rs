//! Tabular source interface.
//!
//! File readers for the supported containers live outside the indexer; they
//! hand rows to the pipeline through [`TabularSource`]. A CSV reader and an
//! in-memory source are provided.

mod csv_source;
mod memory;

pub use csv_source::CsvSource;
pub use memory::MemorySource;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::errors::IngestError;

/// Iterator over the data rows of a source, header excluded.
pub type RowIter<'a> = Box<dyn Iterator<Item = Result<Vec<RawValue>, IngestError>> + Send + 'a>;

/// Container format of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Tsv,
    Memory,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Memory => "memory",
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cell as delivered by a reader.
///
/// Spreadsheet readers may produce native values; text readers only produce
/// `Empty` and `Text`.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Empty,
    Text(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
pub const ISO_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
pub const ISO_TIME_FORMAT: &str = "%H:%M:%S";

impl RawValue {
    /// Convert a text cell, mapping the empty string to `Empty`.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            Self::Empty
        } else {
            Self::Text(text)
        }
    }

    /// Textual form of the value; temporal values use ISO-like formats.
    pub fn repr(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(text) => Some(text.clone()),
            Self::Integer(value) => Some(value.to_string()),
            Self::Number(value) => Some(value.to_string()),
            Self::Boolean(value) => Some(value.to_string()),
            Self::Date(value) => Some(value.format(ISO_DATE_FORMAT).to_string()),
            Self::DateTime(value) => Some(value.format(ISO_DATETIME_FORMAT).to_string()),
            Self::Time(value) => Some(value.format(ISO_TIME_FORMAT).to_string()),
        }
    }

    /// Text used for row identity; empty cells contribute an empty string.
    pub fn raw_text(&self) -> String {
        self.repr().unwrap_or_default()
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }
}

/// A readable tabular resource.
pub trait TabularSource: Send + Sync {
    fn format(&self) -> SourceFormat;

    /// Header row, in column order.
    fn headers(&self) -> Result<Vec<String>, IngestError>;

    /// Data rows, opened afresh on every call.
    fn rows(&self) -> Result<RowIter<'_>, IngestError>;

    /// Delimiter of delimited formats.
    fn delimiter(&self) -> Option<u8> {
        None
    }

    /// Re-open the source with a forced delimiter.
    ///
    /// Returns `None` for formats without a delimiter.
    fn with_delimiter(&self, _delimiter: u8) -> Option<Box<dyn TabularSource>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repr_of_native_values() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(RawValue::Date(date).repr().as_deref(), Some("2024-03-09"));
        assert_eq!(
            RawValue::DateTime(date.and_hms_opt(8, 5, 0).unwrap())
                .repr()
                .as_deref(),
            Some("2024-03-09T08:05:00")
        );
        assert_eq!(
            RawValue::Time(NaiveTime::from_hms_opt(7, 0, 1).unwrap())
                .repr()
                .as_deref(),
            Some("07:00:01")
        );
        assert_eq!(RawValue::Number(1.5).repr().as_deref(), Some("1.5"));
        assert_eq!(RawValue::Empty.repr(), None);
    }

    #[test]
    fn test_blank_values() {
        assert!(RawValue::Empty.is_blank());
        assert!(RawValue::from_text("  ").is_blank());
        assert!(!RawValue::Integer(0).is_blank());
        assert_eq!(RawValue::from_text(""), RawValue::Empty);
    }
}
