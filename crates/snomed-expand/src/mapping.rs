//! Read-only table from external terminology codes to local identifiers.

use std::collections::HashMap;

use crate::types::MappedId;

/// Preloaded map from external code to local internal identifier.
///
/// Built once per uploaded document by a collaborator and treated as
/// read-only input by the reducer.
///
/// # Example
///
/// ```rust
/// use snomed_expand::{CodeMappingTable, MappedId};
///
/// let table: CodeMappingTable = [("46635009", "DM1")].into_iter().collect();
/// assert_eq!(table.resolve("46635009"), MappedId::Mapped("DM1".to_string()));
/// assert_eq!(table.resolve("44054006"), MappedId::Absent);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeMappingTable {
    entries: HashMap<String, String>,
}

impl CodeMappingTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a mapping.
    pub fn insert(&mut self, code: impl Into<String>, local_id: impl Into<String>) {
        self.entries.insert(code.into(), local_id.into());
    }

    /// Returns the local identifier for `code`, if mapped.
    pub fn get(&self, code: &str) -> Option<&str> {
        self.entries.get(code).map(String::as_str)
    }

    /// Resolves `code` to a [`MappedId`].
    pub fn resolve(&self, code: &str) -> MappedId {
        match self.get(code) {
            Some(local_id) => MappedId::Mapped(local_id.to_string()),
            None => MappedId::Absent,
        }
    }

    /// Returns true if `code` is mapped.
    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    /// Number of mapped codes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for CodeMappingTable
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(code, local_id)| (code.into(), local_id.into()))
                .collect(),
        }
    }
}

impl<K, V> Extend<(K, V)> for CodeMappingTable
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (code, local_id) in iter {
            self.insert(code, local_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table() {
        let table = CodeMappingTable::new();
        assert!(table.is_empty());
        assert_eq!(table.resolve("73211009"), MappedId::Absent);
    }

    #[test]
    fn test_insert_and_resolve() {
        let mut table = CodeMappingTable::new();
        table.insert("73211009", "C10..");
        assert!(table.contains("73211009"));
        assert_eq!(table.get("73211009"), Some("C10.."));
        assert_eq!(
            table.resolve("73211009"),
            MappedId::Mapped("C10..".to_string())
        );
    }

    #[test]
    fn test_insert_replaces() {
        let mut table = CodeMappingTable::new();
        table.insert("1", "a");
        table.insert("1", "b");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("1"), Some("b"));
    }

    #[test]
    fn test_extend() {
        let mut table: CodeMappingTable = [("1", "a")].into_iter().collect();
        table.extend([("2".to_string(), "b".to_string())]);
        assert_eq!(table.len(), 2);
    }
}
