//! # Package List
//!
//! The user's chosen import paths. Drives which descriptor sets are fetched
//! and which packages entry points may import on demand.

use crate::error::{GoBlocksError, Result};
use crate::storage::KeyValueStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageList {
    paths: Vec<String>,
}

impl PackageList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the persisted comma-joined form. Empty entries and duplicates
    /// are dropped.
    pub fn parse(saved: &str) -> Self {
        let mut list = Self::new();
        for path in saved.split(',') {
            let path = path.trim();
            if !path.is_empty() && !list.contains(path) {
                list.paths.push(path.to_string());
            }
        }
        list
    }

    pub fn to_persisted(&self) -> String {
        self.paths.join(",")
    }

    pub fn load(store: &dyn KeyValueStore, key: &str) -> Result<Self> {
        Ok(store.get(key)?.map(|saved| Self::parse(&saved)).unwrap_or_default())
    }

    pub fn save(&self, store: &mut dyn KeyValueStore, key: &str) -> Result<()> {
        store.set(key, &self.to_persisted())
    }

    /// Append a path. Returns false when it is already listed.
    pub fn add(&mut self, path: &str) -> Result<bool> {
        let path = path.trim();
        if !is_valid_import_path(path) {
            return Err(GoBlocksError::InvalidPackagePath(path.to_string()));
        }
        if self.contains(path) {
            return Ok(false);
        }
        self.paths.push(path.to_string());
        Ok(true)
    }

    /// Returns false when the path was not listed
    pub fn remove(&mut self, path: &str) -> bool {
        let path = path.trim();
        match self.paths.iter().position(|p| p == path) {
            Some(index) => {
                self.paths.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.paths.iter()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl<'a> IntoIterator for &'a PackageList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

/// Go import paths: non-empty, no whitespace, quotes or commas, no empty
/// segments.
pub fn is_valid_import_path(path: &str) -> bool {
    !path.is_empty()
        && !path
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ',' | '"' | '\'' | '`' | '\\'))
        && path.split('/').all(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_parse_drops_empty_and_duplicate_entries() {
        let list = PackageList::parse("fmt,,net/http, fmt,");
        assert_eq!(list.paths(), &["fmt".to_string(), "net/http".to_string()]);
        assert_eq!(list.to_persisted(), "fmt,net/http");
        assert!(PackageList::parse("").is_empty());
    }

    #[test]
    fn test_add_and_remove() {
        let mut list = PackageList::new();
        assert!(list.add("github.com/gorilla/mux").unwrap());
        assert!(!list.add("github.com/gorilla/mux").unwrap());
        assert!(list.add("fmt").unwrap());

        assert!(!list.remove("os"));
        assert_eq!(list.len(), 2);
        assert!(list.remove("github.com/gorilla/mux"));
        assert_eq!(list.paths(), &["fmt".to_string()]);
    }

    #[test]
    fn test_invalid_paths_rejected() {
        let mut list = PackageList::new();
        for bad in ["", "a,b", "net//http", "/abs", "has space"] {
            assert!(
                matches!(list.add(bad), Err(GoBlocksError::InvalidPackagePath(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_persist_round_trip() {
        let mut store = MemoryStore::new();
        let mut list = PackageList::new();
        list.add("fmt").unwrap();
        list.add("net/http").unwrap();
        list.save(&mut store, "pkgs").unwrap();

        assert_eq!(store.get("pkgs").unwrap().as_deref(), Some("fmt,net/http"));
        assert_eq!(PackageList::load(&store, "pkgs").unwrap(), list);
        assert!(PackageList::load(&store, "other").unwrap().is_empty());
    }
}
