//! Validation report types.

use serde::{Deserialize, Serialize};

/// Where in the file an issue was found. Rows and columns are 1-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl IssueLocation {
    pub fn file() -> Self {
        Self::default()
    }

    pub fn row(row: u64) -> Self {
        Self {
            row: Some(row),
            column: None,
        }
    }

    pub fn header(column: usize) -> Self {
        Self {
            row: None,
            column: Some(column),
        }
    }

    pub fn cell(row: u64, column: usize) -> Self {
        Self {
            row: Some(row),
            column: Some(column),
        }
    }
}

impl std::fmt::Display for IssueLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.row, self.column) {
            (Some(row), Some(column)) => write!(f, "row {}, column {}", row, column),
            (Some(row), None) => write!(f, "row {}", row),
            (None, Some(column)) => write!(f, "header, column {}", column),
            (None, None) => f.write_str("file"),
        }
    }
}

/// A single failed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Check name, e.g. `type-error` or `zero-rows`.
    pub check: String,
    pub location: IssueLocation,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        check: impl Into<String>,
        location: IssueLocation,
        message: impl Into<String>,
    ) -> Self {
        Self {
            check: check.into(),
            location,
            message: message.into(),
        }
    }
}

/// Outcome of validating one resource file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
    /// Set when checking stopped at the error limit.
    #[serde(default)]
    pub truncated: bool,
}

impl ValidationReport {
    pub fn from_issues(issues: Vec<ValidationIssue>, truncated: bool) -> Self {
        Self {
            valid: issues.is_empty(),
            issues,
            truncated,
        }
    }

    pub fn passed(&self) -> bool {
        self.valid
    }

    pub fn checks(&self) -> impl Iterator<Item = &str> {
        self.issues.iter().map(|i| i.check.as_str())
    }
}

/// Whether a resource's rows may be served from the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataAvailability {
    pub index_exists: bool,
    pub last_validation_passed: bool,
    pub last_run_flushed: bool,
}

impl DataAvailability {
    pub fn is_available(&self) -> bool {
        self.index_exists && self.last_validation_passed && self.last_run_flushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_validity_follows_issues() {
        assert!(ValidationReport::from_issues(vec![], false).passed());

        let report = ValidationReport::from_issues(
            vec![ValidationIssue::new(
                "zero-rows",
                IssueLocation::file(),
                "no data rows",
            )],
            false,
        );
        assert!(!report.passed());
        assert_eq!(report.checks().collect::<Vec<_>>(), vec!["zero-rows"]);
    }

    #[test]
    fn test_location_display() {
        assert_eq!(IssueLocation::cell(3, 2).to_string(), "row 3, column 2");
        assert_eq!(IssueLocation::header(1).to_string(), "header, column 1");
        assert_eq!(IssueLocation::file().to_string(), "file");
    }

    #[test]
    fn test_availability_requires_all_conditions() {
        let mut availability = DataAvailability {
            index_exists: true,
            last_validation_passed: true,
            last_run_flushed: true,
        };
        assert!(availability.is_available());

        availability.last_validation_passed = false;
        assert!(!availability.is_available());

        availability.last_validation_passed = true;
        availability.index_exists = false;
        assert!(!availability.is_available());
    }
}
