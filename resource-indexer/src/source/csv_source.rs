//! Delimited text reader built on the `csv` crate.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use super::{RawValue, RowIter, SourceFormat, TabularSource};
use crate::errors::IngestError;

/// Delimiters tried when sniffing the first line, in order of preference.
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

const UTF8_BOM: char = '\u{feff}';

/// A CSV, TSV or delimited TXT file.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    format: SourceFormat,
    delimiter: u8,
}

impl CsvSource {
    /// Open a delimited file.
    ///
    /// `.tsv` files are read tab-delimited; for `.csv` and `.txt` the
    /// delimiter is sniffed from the header line.
    ///
    /// # Errors
    ///
    /// `FileAccessError` if the file is missing, not UTF-8, or has an
    /// unsupported extension.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref().to_path_buf();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let format = match extension.as_str() {
            "csv" | "txt" => SourceFormat::Csv,
            "tsv" => SourceFormat::Tsv,
            other => {
                return Err(IngestError::file_access(format!(
                    "unsupported format '{}' of {}",
                    other,
                    path.display()
                )))
            }
        };

        let mut first_line = String::new();
        BufReader::new(File::open(&path)?).read_line(&mut first_line)?;

        let delimiter = match format {
            SourceFormat::Tsv => b'\t',
            _ => sniff_delimiter(&first_line),
        };

        debug!(
            path = %path.display(),
            format = %format,
            delimiter = %(delimiter as char).escape_default(),
            "Opened delimited source"
        );

        Ok(Self {
            path,
            format,
            delimiter,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reader(&self) -> Result<csv::Reader<File>, IngestError> {
        Ok(ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?)
    }
}

/// Pick the candidate delimiter occurring most often in `line`.
pub(crate) fn sniff_delimiter(line: &str) -> u8 {
    let mut best = CANDIDATE_DELIMITERS[0];
    let mut best_count = 0;
    for candidate in CANDIDATE_DELIMITERS {
        let count = line.bytes().filter(|b| *b == candidate).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

fn to_row(record: &StringRecord) -> Vec<RawValue> {
    record.iter().map(RawValue::from_text).collect()
}

/// Records of a delimited file, one per physical row.
///
/// The `csv` reader skips empty lines; they are yielded here as empty rows
/// so that row numbers keep following the file.
struct CsvRows {
    reader: csv::Reader<File>,
    record: StringRecord,
    /// Reader line after the previous record.
    line: u64,
    blank_lines: u64,
    pending: Option<Vec<RawValue>>,
}

impl CsvRows {
    fn new(mut reader: csv::Reader<File>) -> Result<Self, IngestError> {
        reader.headers()?;
        let line = reader.position().line();
        Ok(Self {
            reader,
            record: StringRecord::new(),
            line,
            blank_lines: 0,
            pending: None,
        })
    }

    /// Empty lines consumed before the record just read.
    fn skipped_lines(&mut self) -> u64 {
        let line = self.reader.position().line();
        let consumed = line.saturating_sub(self.line);
        self.line = line;
        let embedded: u64 = self
            .record
            .iter()
            .map(|field| field.matches('\n').count() as u64)
            .sum();
        consumed.saturating_sub(1 + embedded)
    }
}

impl Iterator for CsvRows {
    type Item = Result<Vec<RawValue>, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.blank_lines > 0 {
            self.blank_lines -= 1;
            return Some(Ok(Vec::new()));
        }
        if let Some(row) = self.pending.take() {
            return Some(Ok(row));
        }

        match self.reader.read_record(&mut self.record) {
            Ok(false) => None,
            Ok(true) => {
                let row = to_row(&self.record);
                match self.skipped_lines() {
                    0 => Some(Ok(row)),
                    skipped => {
                        self.blank_lines = skipped - 1;
                        self.pending = Some(row);
                        Some(Ok(Vec::new()))
                    }
                }
            }
            Err(e) => {
                self.line = self.reader.position().line();
                Some(Err(e.into()))
            }
        }
    }
}

impl TabularSource for CsvSource {
    fn format(&self) -> SourceFormat {
        self.format
    }

    fn headers(&self) -> Result<Vec<String>, IngestError> {
        let mut reader = self.reader()?;
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                if i == 0 {
                    h.trim_start_matches(UTF8_BOM).to_string()
                } else {
                    h.to_string()
                }
            })
            .collect();

        if headers.is_empty() || (headers.len() == 1 && headers[0].trim().is_empty()) {
            return Err(IngestError::file_access(format!(
                "no tabular structure in {}",
                self.path.display()
            )));
        }
        Ok(headers)
    }

    fn rows(&self) -> Result<RowIter<'_>, IngestError> {
        Ok(Box::new(CsvRows::new(self.reader()?)?))
    }

    fn delimiter(&self) -> Option<u8> {
        Some(self.delimiter)
    }

    fn with_delimiter(&self, delimiter: u8) -> Option<Box<dyn TabularSource>> {
        Some(Box::new(Self {
            delimiter,
            ..self.clone()
        }))
    }
}
