//! Collaborator interfaces consumed by resources and tools.
//!
//! The server core never touches CMS storage directly. Resources and
//! tools reach pages, templates, log files and configuration through the
//! narrow traits defined here, injected at construction time. Handlers
//! that perform their own I/O against a backing store own their
//! transaction discipline; the server guarantees message-level isolation
//! only.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::StoreError;

/// A single result row, preserving column order.
pub type Row = IndexMap<String, Value>;

/// Read access to the relational store behind the CMS.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Runs a named query with positional parameters and returns the
    /// matching rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the relation is unknown or the query fails.
    async fn fetch(&self, query: &str, params: &[Value]) -> Result<Vec<Row>, StoreError>;
}

/// Read access to the CMS file tree (templates, components, logs).
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Returns whether a path exists.
    async fn exists(&self, path: &str) -> bool;

    /// Reads a file's contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not exist or cannot be read.
    async fn read(&self, path: &str) -> Result<String, StoreError>;

    /// Lists paths matching a `prefix*suffix` style pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    async fn glob(&self, pattern: &str) -> Result<Vec<String>, StoreError>;
}

/// Read access to environment/configuration values.
pub trait EnvStore: Send + Sync {
    /// Returns the value for a key, if set.
    fn get(&self, key: &str) -> Option<String>;
}

/// Invalidation access to the CMS render cache.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Drops every cached entry under a key prefix and returns how many
    /// entries were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the purge fails.
    async fn purge(&self, prefix: &str) -> Result<usize, StoreError>;
}

/// In-memory store used for default wiring and tests.
///
/// Holds named tables of rows, a flat path-to-contents file map and a
/// key-value environment. Interior mutability keeps the mutation helpers
/// usable through the shared references handlers hold.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<BTreeMap<String, Vec<Row>>>,
    files: Mutex<BTreeMap<String, String>>,
    env: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the rows of a table.
    pub fn insert_table(&self, name: impl Into<String>, rows: Vec<Row>) {
        self.tables
            .lock()
            .expect("table map poisoned")
            .insert(name.into(), rows);
    }

    /// Sets a file's contents.
    pub fn insert_file(&self, path: impl Into<String>, contents: impl Into<String>) {
        self.files
            .lock()
            .expect("file map poisoned")
            .insert(path.into(), contents.into());
    }

    /// Sets an environment value.
    pub fn insert_env(&self, key: impl Into<String>, value: impl Into<String>) {
        self.env
            .lock()
            .expect("env map poisoned")
            .insert(key.into(), value.into());
    }

    /// Removes every file whose path starts with `prefix`, returning how
    /// many were removed. Backs the cache-clearing tool.
    pub fn remove_files_with_prefix(&self, prefix: &str) -> usize {
        let mut files = self.files.lock().expect("file map poisoned");
        let doomed: Vec<String> = files
            .keys()
            .filter(|path| path.starts_with(prefix))
            .cloned()
            .collect();
        for path in &doomed {
            files.remove(path);
        }
        doomed.len()
    }
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn fetch(&self, query: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        let tables = self.tables.lock().expect("table map poisoned");
        let rows = tables.get(query).ok_or_else(|| StoreError::UnknownTable {
            table: query.to_string(),
        })?;

        // Positional params filter on column equality, matched in column
        // order: param 0 against the first column, and so on.
        let matched = rows
            .iter()
            .filter(|row| {
                params
                    .iter()
                    .enumerate()
                    .all(|(i, param)| row.get_index(i).is_some_and(|(_, v)| v == param))
            })
            .cloned()
            .collect();
        Ok(matched)
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn exists(&self, path: &str) -> bool {
        self.files
            .lock()
            .expect("file map poisoned")
            .contains_key(path)
    }

    async fn read(&self, path: &str) -> Result<String, StoreError> {
        self.files
            .lock()
            .expect("file map poisoned")
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::FileNotFound {
                path: path.to_string(),
            })
    }

    async fn glob(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let files = self.files.lock().expect("file map poisoned");
        let (prefix, suffix) = match pattern.split_once('*') {
            Some((p, s)) => (p, s),
            None => (pattern, ""),
        };
        Ok(files
            .keys()
            .filter(|path| path.starts_with(prefix) && path.ends_with(suffix))
            .cloned()
            .collect())
    }
}

impl EnvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.env.lock().expect("env map poisoned").get(key).cloned()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn purge(&self, prefix: &str) -> Result<usize, StoreError> {
        Ok(self.remove_files_with_prefix(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn fetch_unknown_table_fails() {
        let store = MemoryStore::new();
        let err = store.fetch("missing", &[]).await.unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[tokio::test]
    async fn fetch_filters_on_positional_params() {
        let store = MemoryStore::new();
        store.insert_table(
            "sites",
            vec![
                row(&[("slug", json!("main")), ("name", json!("Main Site"))]),
                row(&[("slug", json!("blog")), ("name", json!("Blog"))]),
            ],
        );

        let all = store.fetch("sites", &[]).await.unwrap();
        assert_eq!(all.len(), 2);

        let filtered = store.fetch("sites", &[json!("blog")]).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].get("name"), Some(&json!("Blog")));
    }

    #[tokio::test]
    async fn glob_matches_prefix_and_suffix() {
        let store = MemoryStore::new();
        store.insert_file("templates/home.html", "<html/>");
        store.insert_file("templates/about.html", "<html/>");
        store.insert_file("logs/app.log", "line");

        let mut hits = store.glob("templates/*.html").await.unwrap();
        hits.sort();
        assert_eq!(
            hits,
            vec!["templates/about.html", "templates/home.html"]
        );
    }

    #[tokio::test]
    async fn remove_files_with_prefix_counts() {
        let store = MemoryStore::new();
        store.insert_file("cache/a", "x");
        store.insert_file("cache/b", "y");
        store.insert_file("logs/app.log", "z");

        assert_eq!(store.remove_files_with_prefix("cache/"), 2);
        assert!(!store.exists("cache/a").await);
        assert!(store.exists("logs/app.log").await);
    }

    #[test]
    fn env_round_trip() {
        let store = MemoryStore::new();
        store.insert_env("cms.version", "4.2.0");
        assert_eq!(store.get("cms.version"), Some("4.2.0".to_string()));
        assert_eq!(store.get("missing"), None);
    }
}
