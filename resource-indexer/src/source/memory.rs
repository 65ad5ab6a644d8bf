//! In-memory tabular source.

use super::{RawValue, RowIter, SourceFormat, TabularSource};
use crate::errors::IngestError;

/// Rows held in memory, for embedding callers and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    headers: Vec<String>,
    rows: Vec<Vec<RawValue>>,
}

impl MemorySource {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<RawValue>>) -> Self {
        Self { headers, rows }
    }

    /// Build a source from text cells; empty strings become `Empty`.
    pub fn from_text<H, R, C>(headers: &[H], rows: &[R]) -> Self
    where
        H: AsRef<str>,
        R: AsRef<[C]>,
        C: AsRef<str>,
    {
        Self {
            headers: headers.iter().map(|h| h.as_ref().to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| {
                    row.as_ref()
                        .iter()
                        .map(|cell| RawValue::from_text(cell.as_ref()))
                        .collect()
                })
                .collect(),
        }
    }
}

impl TabularSource for MemorySource {
    fn format(&self) -> SourceFormat {
        SourceFormat::Memory
    }

    fn headers(&self) -> Result<Vec<String>, IngestError> {
        if self.headers.is_empty() {
            return Err(IngestError::file_access("no tabular structure"));
        }
        Ok(self.headers.clone())
    }

    fn rows(&self) -> Result<RowIter<'_>, IngestError> {
        Ok(Box::new(self.rows.iter().cloned().map(Ok)))
    }
}
