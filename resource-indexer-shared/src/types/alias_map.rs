//! Bidirectional map between internal column keys and human headers.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// Internal key of the column at the given 1-based position.
pub fn column_alias(position: usize) -> String {
    format!("col{}", position)
}

/// Maps `col<N>` keys to the headers found in the source file.
///
/// Serialized as a flat `{"col1": "Header", ...}` object, which is the form
/// stored in the index mapping metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct HeaderAliasMap {
    by_alias: BTreeMap<String, String>,
    by_header: BTreeMap<String, String>,
}

impl HeaderAliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the map from source headers in column order.
    ///
    /// Blank headers are replaced by their alias and repeated headers get a
    /// `_<N>` suffix so that every header maps back to exactly one column.
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        let mut map = Self::new();
        let mut seen = HashSet::new();
        for (index, header) in headers.iter().enumerate() {
            let alias = column_alias(index + 1);
            let trimmed = header.as_ref().trim();
            let mut name = if trimmed.is_empty() {
                alias.clone()
            } else {
                trimmed.to_string()
            };
            if seen.contains(&name) {
                name = format!("{}_{}", name, index + 1);
            }
            seen.insert(name.clone());
            map.insert(alias, name);
        }
        map
    }

    pub fn insert(&mut self, alias: impl Into<String>, header: impl Into<String>) {
        let alias = alias.into();
        let header = header.into();
        if let Some(previous) = self.by_alias.insert(alias.clone(), header.clone()) {
            self.by_header.remove(&previous);
        }
        self.by_header.insert(header, alias);
    }

    pub fn header_for(&self, alias: &str) -> Option<&str> {
        self.by_alias.get(alias).map(String::as_str)
    }

    pub fn alias_for(&self, header: &str) -> Option<&str> {
        self.by_header.get(header).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_alias.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_alias.is_empty()
    }

    /// Pairs of `(alias, header)`, ordered by alias key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_alias
            .iter()
            .map(|(alias, header)| (alias.as_str(), header.as_str()))
    }
}

impl From<BTreeMap<String, String>> for HeaderAliasMap {
    fn from(value: BTreeMap<String, String>) -> Self {
        let mut map = Self::new();
        for (alias, header) in value {
            map.insert(alias, header);
        }
        map
    }
}

impl From<HeaderAliasMap> for BTreeMap<String, String> {
    fn from(value: HeaderAliasMap) -> Self {
        value.by_alias
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_alias_is_one_based() {
        assert_eq!(column_alias(1), "col1");
        assert_eq!(column_alias(12), "col12");
    }

    #[test]
    fn test_from_headers() {
        let map = HeaderAliasMap::from_headers(&["Miasto", "Kod pocztowy"]);
        assert_eq!(map.header_for("col1"), Some("Miasto"));
        assert_eq!(map.alias_for("Kod pocztowy"), Some("col2"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_blank_and_duplicate_headers() {
        let map = HeaderAliasMap::from_headers(&["name", " ", "name"]);
        assert_eq!(map.header_for("col2"), Some("col2"));
        assert_eq!(map.header_for("col3"), Some("name_3"));
        assert_eq!(map.alias_for("name"), Some("col1"));
    }

    #[test]
    fn test_serializes_as_flat_object() {
        let map = HeaderAliasMap::from_headers(&["a", "b"]);
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json, serde_json::json!({"col1": "a", "col2": "b"}));

        let back: HeaderAliasMap = serde_json::from_value(json).unwrap();
        assert_eq!(back.alias_for("b"), Some("col2"));
    }
}
