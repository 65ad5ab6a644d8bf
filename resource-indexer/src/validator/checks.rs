//! Individual validation checks.

use std::collections::{BTreeSet, HashMap, HashSet};

use resource_indexer_shared::{row_identity, IssueLocation, Schema, ValidationIssue};
use uuid::Uuid;

use crate::missing_values::MissingValueSet;
use crate::schema::conforms;
use crate::source::RawValue;

pub const BLANK_HEADER: &str = "blank-header";
pub const DUPLICATE_HEADER: &str = "duplicate-header";
pub const MISSING_HEADER: &str = "missing-header";
pub const EXTRA_HEADER: &str = "extra-header";
pub const BLANK_ROW: &str = "blank-row";
pub const DUPLICATE_ROW: &str = "duplicate-row";
pub const EXTRA_CELL: &str = "extra-cell";
pub const MISSING_CELL: &str = "missing-cell";
pub const TYPE_ERROR: &str = "type-error";
pub const ZERO_ROWS: &str = "zero-rows";

/// Collects issues up to a limit, dropping skipped checks.
pub(crate) struct IssueCollector<'a> {
    limit: usize,
    skip: &'a BTreeSet<String>,
    issues: Vec<ValidationIssue>,
    truncated: bool,
}

impl<'a> IssueCollector<'a> {
    pub(crate) fn new(limit: usize, skip: &'a BTreeSet<String>) -> Self {
        Self {
            limit,
            skip,
            issues: Vec::new(),
            truncated: false,
        }
    }

    pub(crate) fn report(
        &mut self,
        check: &str,
        location: IssueLocation,
        message: impl Into<String>,
    ) {
        if self.skip.contains(check) {
            return;
        }
        if self.issues.len() >= self.limit {
            self.truncated = true;
            return;
        }
        self.issues.push(ValidationIssue::new(check, location, message));
    }

    pub(crate) fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub(crate) fn into_parts(self) -> (Vec<ValidationIssue>, bool) {
        (self.issues, self.truncated)
    }
}

/// Header row checks.
pub(crate) fn check_headers(headers: &[String], collector: &mut IssueCollector<'_>) {
    let mut seen = HashSet::new();
    for (index, header) in headers.iter().enumerate() {
        let header = header.trim();
        if header.is_empty() {
            collector.report(BLANK_HEADER, IssueLocation::header(index + 1), "header is blank");
        } else if !seen.insert(header) {
            collector.report(
                DUPLICATE_HEADER,
                IssueLocation::header(index + 1),
                format!("header '{}' is repeated", header),
            );
        }
    }
}

/// Headers against the names of an explicit schema.
pub(crate) fn check_schema_headers(
    headers: &[String],
    schema: &Schema,
    collector: &mut IssueCollector<'_>,
) {
    let present: HashSet<&str> = headers.iter().map(|h| h.trim()).collect();
    let declared: HashSet<&str> = schema.field_names().collect();

    for (index, field) in schema.fields.iter().enumerate() {
        if !present.contains(field.name.as_str()) {
            collector.report(
                MISSING_HEADER,
                IssueLocation::header(index + 1),
                format!("field '{}' has no column in the file", field.name),
            );
        }
    }
    for (index, header) in headers.iter().enumerate() {
        if !declared.contains(header.trim()) {
            collector.report(
                EXTRA_HEADER,
                IssueLocation::header(index + 1),
                format!("column '{}' is not in the schema", header.trim()),
            );
        }
    }
}

/// Stateful checks over the data rows.
pub(crate) struct RowChecker<'a> {
    width: usize,
    schema: Option<&'a Schema>,
    missing_values: &'a MissingValueSet,
    seen: HashMap<Uuid, u64>,
    data_rows: u64,
}

impl<'a> RowChecker<'a> {
    pub(crate) fn new(
        width: usize,
        schema: Option<&'a Schema>,
        missing_values: &'a MissingValueSet,
    ) -> Self {
        Self {
            width,
            schema,
            missing_values,
            seen: HashMap::new(),
            data_rows: 0,
        }
    }

    /// Check one row; `row_number` counts the header as row 1.
    pub(crate) fn check(
        &mut self,
        row_number: u64,
        row: &[RawValue],
        collector: &mut IssueCollector<'_>,
    ) {
        if row.iter().all(RawValue::is_blank) {
            collector.report(BLANK_ROW, IssueLocation::row(row_number), "row is blank");
            return;
        }
        self.data_rows += 1;

        let id = row_identity(row.iter().map(RawValue::raw_text));
        if let Some(first) = self.seen.get(&id) {
            collector.report(
                DUPLICATE_ROW,
                IssueLocation::row(row_number),
                format!("row is a duplicate of row {}", first),
            );
        } else {
            self.seen.insert(id, row_number);
        }

        if row.len() > self.width {
            collector.report(
                EXTRA_CELL,
                IssueLocation::cell(row_number, self.width + 1),
                format!("row has {} cells, expected {}", row.len(), self.width),
            );
        } else if row.len() < self.width {
            collector.report(
                MISSING_CELL,
                IssueLocation::cell(row_number, row.len() + 1),
                format!("row has {} cells, expected {}", row.len(), self.width),
            );
        }

        if let Some(schema) = self.schema {
            for (index, (field, value)) in schema.fields.iter().zip(row.iter()).enumerate() {
                let Some(text) = value.repr() else { continue };
                if self.missing_values.is_missing(&text) || conforms(field, value) {
                    continue;
                }
                collector.report(
                    TYPE_ERROR,
                    IssueLocation::cell(row_number, index + 1),
                    format!("value '{}' is not a valid {}", text, field.field_type),
                );
            }
        }
    }

    /// Non-blank rows seen so far.
    pub(crate) fn data_rows(&self) -> u64 {
        self.data_rows
    }
}
