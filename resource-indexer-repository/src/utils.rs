//! Utility functions for the resource indexer repository.

use crate::errors::SearchIndexError;

const INVALID_INDEX_CHARS: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ',', '#', ' ', ':'];

/// Validate an index name against the search engine's naming rules.
///
/// Names must be lowercase, at most 255 bytes, must not be `.` or `..`, must
/// not start with `-`, `_` or `+`, and must not contain any of
/// `\ / * ? " < > | , # :` or spaces.
///
/// # Example
///
/// ```
/// use resource_indexer_repository::validate_index_name;
///
/// assert!(validate_index_name("resource-42").is_ok());
/// assert!(validate_index_name("Resource-42").is_err());
/// ```
pub fn validate_index_name(name: &str) -> Result<(), SearchIndexError> {
    if name.is_empty() {
        return Err(SearchIndexError::validation("Index name is required"));
    }
    if name.len() > 255 {
        return Err(SearchIndexError::validation(format!(
            "Index name '{}' is longer than 255 bytes",
            name
        )));
    }
    if name == "." || name == ".." {
        return Err(SearchIndexError::validation(format!(
            "Index name '{}' is reserved",
            name
        )));
    }
    if name.starts_with(['-', '_', '+']) {
        return Err(SearchIndexError::validation(format!(
            "Index name '{}' must not start with '-', '_' or '+'",
            name
        )));
    }
    if name.chars().any(|c| c.is_uppercase()) {
        return Err(SearchIndexError::validation(format!(
            "Index name '{}' must be lowercase",
            name
        )));
    }
    if let Some(c) = name.chars().find(|c| INVALID_INDEX_CHARS.contains(c)) {
        return Err(SearchIndexError::validation(format!(
            "Index name '{}' contains invalid character '{}'",
            name, c
        )));
    }
    Ok(())
}
