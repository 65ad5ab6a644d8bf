//! Validation of resource files, independent of indexing.

mod checks;

pub use checks::{
    BLANK_HEADER, BLANK_ROW, DUPLICATE_HEADER, DUPLICATE_ROW, EXTRA_CELL, EXTRA_HEADER,
    MISSING_CELL, MISSING_HEADER, TYPE_ERROR, ZERO_ROWS,
};

use std::collections::BTreeSet;

use resource_indexer_shared::{IssueLocation, Schema, ValidationReport};
use tracing::{debug, info, instrument};

use crate::errors::IngestError;
use crate::missing_values::MissingValueSet;
use crate::schema::SchemaStore;
use crate::source::TabularSource;
use checks::{check_headers, check_schema_headers, IssueCollector, RowChecker};

/// Default maximum number of issues in a report.
pub const DEFAULT_ERROR_LIMIT: usize = 10;

/// Structural checks skipped unless configured otherwise.
pub const DEFAULT_SKIP_CHECKS: &[&str] = &[
    BLANK_ROW,
    DUPLICATE_ROW,
    BLANK_HEADER,
    EXTRA_HEADER,
    DUPLICATE_HEADER,
];

/// Delimiter tried when a single column header contains it.
const FALLBACK_DELIMITER: u8 = b';';

/// Configuration of the validator.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub error_limit: usize,
    pub skip_checks: BTreeSet<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            error_limit: DEFAULT_ERROR_LIMIT,
            skip_checks: DEFAULT_SKIP_CHECKS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Runs structural, schema and zero-rows checks over a source.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Validate a source, against `schema` when one is declared.
    ///
    /// # Errors
    ///
    /// `FileAccessError` if the source cannot be read at all. Everything
    /// else ends up in the report.
    #[instrument(skip_all, fields(format = %source.format(), with_schema = schema.is_some()))]
    pub fn validate(
        &self,
        source: &dyn TabularSource,
        schema: Option<&Schema>,
        missing_values: &MissingValueSet,
    ) -> Result<ValidationReport, IngestError> {
        let mut collector = IssueCollector::new(self.config.error_limit, &self.config.skip_checks);

        let headers = source.headers()?;
        check_headers(&headers, &mut collector);
        if let Some(schema) = schema {
            check_schema_headers(&headers, schema, &mut collector);
        }

        let mut rows = RowChecker::new(headers.len(), schema, missing_values);
        for (index, row) in source.rows()?.enumerate() {
            rows.check(index as u64 + 2, &row?, &mut collector);
            if collector.is_truncated() {
                debug!("Issue limit reached, stopping");
                break;
            }
        }

        if rows.data_rows() == 0 && !collector.is_truncated() {
            collector.report(ZERO_ROWS, IssueLocation::file(), "file has no data rows");
        }

        let (issues, truncated) = collector.into_parts();
        let report = ValidationReport::from_issues(issues, truncated);
        info!(
            valid = report.valid,
            issues = report.issues.len(),
            truncated = report.truncated,
            "Validation finished"
        );
        Ok(report)
    }

    /// Validate the file behind a schema store.
    ///
    /// Schema conformance is checked only against an explicit schema. When
    /// the schema consists of one column whose header contains `;`, the file
    /// is re-read with `;` as delimiter and validated structurally.
    pub fn validate_resource(
        &self,
        store: &mut SchemaStore,
        source: &dyn TabularSource,
        missing_values: &MissingValueSet,
    ) -> Result<ValidationReport, IngestError> {
        let explicit = store.override_schema().cloned();
        let schema = match store.get_schema(true, false) {
            Ok(schema) => Some(schema),
            Err(IngestError::SchemaOverrideError(e)) => {
                debug!(error = %e, "Explicit schema does not fit the file");
                None
            }
            Err(e) => return Err(e),
        };

        match schema.and_then(|schema| redetect_delimiter(source, &schema)) {
            Some(redetected) => self.validate(redetected.as_ref(), None, missing_values),
            None => self.validate(source, explicit.as_ref(), missing_values),
        }
    }
}

/// Turn a failed report into a `SchemaValidationError`.
pub fn ensure_passed(report: &ValidationReport) -> Result<(), IngestError> {
    if report.passed() {
        return Ok(());
    }
    let first = report
        .issues
        .first()
        .map(|issue| format!("{} at {}: {}", issue.check, issue.location, issue.message))
        .unwrap_or_default();
    Err(IngestError::schema_validation(format!(
        "{} issue(s), first: {}",
        report.issues.len(),
        first
    )))
}

/// Re-open a source whose only column header contains `;`.
///
/// Such files were read with the wrong delimiter; the reopened source is
/// read with `;`. Returns `None` when the case does not apply.
pub fn redetect_delimiter(
    source: &dyn TabularSource,
    schema: &Schema,
) -> Option<Box<dyn TabularSource>> {
    let delimiter = FALLBACK_DELIMITER as char;
    match schema.fields.as_slice() {
        [only]
            if only.name.contains(delimiter)
                && source.delimiter() != Some(FALLBACK_DELIMITER) =>
        {
            info!(
                header = %only.name,
                "Single column header contains ';', re-detecting delimiter"
            );
            source.with_delimiter(FALLBACK_DELIMITER)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{CsvSource, MemorySource, RawValue};
    use resource_indexer_shared::{Field, FieldType};
    use std::io::Write;

    fn strict() -> Validator {
        Validator::new(ValidatorConfig {
            error_limit: DEFAULT_ERROR_LIMIT,
            skip_checks: BTreeSet::new(),
        })
    }

    fn checks(report: &ValidationReport) -> Vec<&str> {
        report.checks().collect()
    }

    #[test]
    fn test_clean_file_passes() {
        let source = MemorySource::from_text(&["a", "b"], &[["1", "x"], ["2", "y"]]);
        let report = strict()
            .validate(&source, None, &MissingValueSet::default())
            .unwrap();
        assert!(report.passed());
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_structural_issues() {
        let source = MemorySource::new(
            vec!["a".to_string(), "".to_string(), "a".to_string()],
            vec![
                vec![RawValue::from_text("1"), RawValue::from_text("2"), RawValue::from_text("3")],
                vec![RawValue::Empty, RawValue::Empty, RawValue::Empty],
                vec![RawValue::from_text("1"), RawValue::from_text("2"), RawValue::from_text("3")],
                vec![RawValue::from_text("1")],
                vec![
                    RawValue::from_text("1"),
                    RawValue::from_text("2"),
                    RawValue::from_text("3"),
                    RawValue::from_text("4"),
                ],
            ],
        );
        let report = strict()
            .validate(&source, None, &MissingValueSet::default())
            .unwrap();

        assert!(!report.passed());
        assert_eq!(
            checks(&report),
            vec![BLANK_HEADER, DUPLICATE_HEADER, BLANK_ROW, DUPLICATE_ROW, MISSING_CELL, EXTRA_CELL]
        );
        assert_eq!(report.issues[2].location, IssueLocation::row(3));
        assert_eq!(report.issues[3].message, "row is a duplicate of row 2");
    }

    #[test]
    fn test_default_skip_list_tolerates_blank_and_duplicate_rows() {
        let source = MemorySource::from_text(&["a", "a"], &[["1", "1"], ["", ""], ["1", "1"]]);
        let report = Validator::default()
            .validate(&source, None, &MissingValueSet::default())
            .unwrap();
        assert!(report.passed());
    }

    #[test]
    fn test_schema_conformance() {
        let schema = Schema::new(vec![
            Field::new("kwota", FieldType::Integer),
            Field::new("data", FieldType::Date).with_format("%d.%m.%Y"),
        ]);
        let source = MemorySource::from_text(
            &["kwota", "dzien"],
            &[["12", "01.02.2024"], ["NULL", "2024-02-01"], ["abc", ""]],
        );
        let report = strict()
            .validate(&source, Some(&schema), &MissingValueSet::default())
            .unwrap();

        assert_eq!(
            checks(&report),
            vec![MISSING_HEADER, EXTRA_HEADER, TYPE_ERROR, TYPE_ERROR]
        );
        assert_eq!(report.issues[2].location, IssueLocation::cell(3, 2));
        assert_eq!(report.issues[3].location, IssueLocation::cell(4, 1));
    }

    #[test]
    fn test_zero_rows() {
        let source = MemorySource::from_text::<&str, [&str; 1], &str>(&["a"], &[]);
        let report = Validator::default()
            .validate(&source, None, &MissingValueSet::default())
            .unwrap();
        assert_eq!(checks(&report), vec![ZERO_ROWS]);

        let blank_only = MemorySource::from_text(&["a"], &[[""]]);
        let report = Validator::default()
            .validate(&blank_only, None, &MissingValueSet::default())
            .unwrap();
        assert_eq!(checks(&report), vec![ZERO_ROWS]);
    }

    #[test]
    fn test_error_limit() {
        let rows: Vec<[&str; 1]> = (0..30).map(|_| ["x"]).collect();
        let source = MemorySource::from_text(&["n"], &rows);
        let schema = Schema::new(vec![Field::new("n", FieldType::Integer)]);
        let report = Validator::default()
            .validate(&source, Some(&schema), &MissingValueSet::default())
            .unwrap();

        assert_eq!(report.issues.len(), DEFAULT_ERROR_LIMIT);
        assert!(report.truncated);
        assert!(!report.passed());
    }

    #[test]
    fn test_validate_resource_redetects_semicolon() {
        let mut file = tempfile::Builder::new().suffix(".tsv").tempfile().unwrap();
        file.write_all(b"miasto;kod\nWarszawa;00-001\nKrak\xc3\xb3w;30-001;x\n").unwrap();
        let source: std::sync::Arc<dyn TabularSource> =
            std::sync::Arc::new(CsvSource::open(file.path()).unwrap());
        let mut store = SchemaStore::new(
            source.clone(),
            crate::schema::TypeInferencer::default(),
            MissingValueSet::default(),
        );

        let report = strict()
            .validate_resource(&mut store, source.as_ref(), &MissingValueSet::default())
            .unwrap();
        assert_eq!(checks(&report), vec![EXTRA_CELL]);
        assert_eq!(report.issues[0].location, IssueLocation::cell(3, 3));
    }

    #[test]
    fn test_ensure_passed() {
        let source = MemorySource::from_text::<&str, [&str; 1], &str>(&["a"], &[]);
        let report = Validator::default()
            .validate(&source, None, &MissingValueSet::default())
            .unwrap();
        assert!(matches!(
            ensure_passed(&report),
            Err(IngestError::SchemaValidationError(msg)) if msg.contains("zero-rows")
        ));
    }

    #[test]
    fn test_redetect_delimiter() {
        let mut file = tempfile::Builder::new().suffix(".tsv").tempfile().unwrap();
        file.write_all(b"miasto;kod\nWarszawa;00-001\n").unwrap();
        let source = CsvSource::open(file.path()).unwrap();

        let single = Schema::new(vec![Field::new("miasto;kod", FieldType::String)]);
        let reopened = redetect_delimiter(&source, &single).unwrap();
        assert_eq!(reopened.headers().unwrap(), vec!["miasto", "kod"]);

        let plain = Schema::new(vec![Field::new("miasto", FieldType::String)]);
        assert!(redetect_delimiter(&source, &plain).is_none());

        let memory = MemorySource::from_text(&["a;b"], &[["1;2"]]);
        assert!(redetect_delimiter(&memory, &single).is_none());
    }

    #[test]
    fn test_empty_lines_keep_file_row_numbers() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(b"n\n1\n\nx\n").unwrap();
        let source = CsvSource::open(file.path()).unwrap();
        let schema = Schema::new(vec![Field::new("n", FieldType::Integer)]);

        let report = strict()
            .validate(&source, Some(&schema), &MissingValueSet::default())
            .unwrap();
        assert_eq!(checks(&report), vec![BLANK_ROW, TYPE_ERROR]);
        assert_eq!(report.issues[0].location, IssueLocation::row(3));
        assert_eq!(report.issues[1].location, IssueLocation::cell(4, 1));
    }
}
