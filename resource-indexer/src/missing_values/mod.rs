//! Missing-value policy.
//!
//! A cell whose canonical text matches a token of the resource's
//! [`MissingValueSet`] keeps its `repr` but gets no `val`.

use std::collections::BTreeSet;

/// Tokens treated as "no value" for every resource.
pub const DEFAULT_MISSING_VALUES: &[&str] = &["", "NULL", "null", "N/A", "n/a", "NaN"];

/// Canonical comparable form of a cell text.
pub fn canonical(text: &str) -> &str {
    text.trim()
}

/// Resolved set of missing-value tokens for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingValueSet {
    tokens: BTreeSet<String>,
}

impl MissingValueSet {
    pub fn is_missing(&self, text: &str) -> bool {
        self.tokens.contains(canonical(text))
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Default for MissingValueSet {
    fn default() -> Self {
        MissingValuePolicy::default().resolve::<&str>(&[])
    }
}

/// Base tokens shared by all resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingValuePolicy {
    defaults: Vec<String>,
}

impl Default for MissingValuePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MISSING_VALUES.iter().map(|t| t.to_string()).collect())
    }
}

impl MissingValuePolicy {
    pub fn new(defaults: Vec<String>) -> Self {
        Self { defaults }
    }

    /// Union of the default tokens and the resource's special signs.
    ///
    /// Special signs are stored in canonical form so that surrounding
    /// whitespace in the configuration does not matter.
    pub fn resolve<S: AsRef<str>>(&self, special_signs: &[S]) -> MissingValueSet {
        let tokens = self
            .defaults
            .iter()
            .map(String::as_str)
            .chain(special_signs.iter().map(|s| s.as_ref()))
            .map(|token| canonical(token).to_string())
            .collect();
        MissingValueSet { tokens }
    }
}
