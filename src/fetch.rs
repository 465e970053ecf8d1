//! Fetch seam for pluggable resource sources.
//!
//! The pipeline never talks to an external service directly; it goes
//! through the [`Fetch`] trait. Implementations own all transport
//! concerns. No retry or backoff happens on this side of the seam:
//! whatever an implementation returns propagates unmodified.

use crate::error::{Error, Result};
use crate::record::Item;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Resolves resource identifiers into normalized items.
///
/// Synchronous by design: the pipeline is strictly sequential and any
/// latency is absorbed inside the call.
pub trait Fetch {
    /// Fetches a single resource by identifier.
    ///
    /// # Errors
    ///
    /// Returns whatever error the underlying source raises for the
    /// identifier; the caller applies no recovery.
    fn fetch(&self, id: &str) -> Result<Item>;

    /// Expands a container identifier (e.g. a playlist) into its member
    /// items, in the container's own order.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is unknown or any member fails
    /// to resolve.
    fn expand(&self, container_id: &str) -> Result<Vec<Item>>;

    /// Returns the fetcher name for logging.
    fn name(&self) -> &str {
        "unknown"
    }
}

/// On-disk catalog format consumed by [`StaticFetcher::from_file`].
#[derive(Debug, Deserialize)]
struct Catalog {
    #[serde(default)]
    items: Vec<Item>,
    #[serde(default)]
    containers: HashMap<String, Vec<String>>,
}

/// A [`Fetch`] implementation backed by a preloaded catalog.
///
/// Used by the CLI (items staged ahead of time in a JSON file) and as a
/// deterministic source in tests.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    items: HashMap<String, Item>,
    containers: HashMap<String, Vec<String>>,
}

impl StaticFetcher {
    /// Creates an empty fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a catalog from a JSON file.
    ///
    /// The file holds an `items` array and an optional `containers` map
    /// from container id to member resource ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let catalog: Catalog = serde_json::from_str(&raw)?;

        let mut fetcher = Self::new();
        for item in catalog.items {
            fetcher.items.insert(item.id.clone(), item);
        }
        fetcher.containers = catalog.containers;

        Ok(fetcher)
    }

    /// Registers a single item.
    pub fn insert(&mut self, item: Item) {
        self.items.insert(item.id.clone(), item);
    }

    /// Registers a container and its member resource ids.
    pub fn insert_container<I, S>(&mut self, container_id: impl Into<String>, member_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.containers.insert(
            container_id.into(),
            member_ids.into_iter().map(Into::into).collect(),
        );
    }

    /// Returns the number of registered items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no items are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Fetch for StaticFetcher {
    fn fetch(&self, id: &str) -> Result<Item> {
        self.items
            .get(id)
            .cloned()
            .ok_or_else(|| Error::fetch(id, "resource not found in catalog"))
    }

    fn expand(&self, container_id: &str) -> Result<Vec<Item>> {
        let member_ids = self
            .containers
            .get(container_id)
            .ok_or_else(|| Error::fetch(container_id, "container not found in catalog"))?;

        member_ids.iter().map(|id| self.fetch(id)).collect()
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SourceKind;
    use assert_fs::prelude::*;

    fn sample_fetcher() -> StaticFetcher {
        let mut fetcher = StaticFetcher::new();
        fetcher.insert(Item::new("v1", "first", SourceKind::Video));
        fetcher.insert(Item::new("v2", "second", SourceKind::Video));
        fetcher.insert_container("pl1", ["v1", "v2"]);
        fetcher
    }

    #[test]
    fn test_fetch_known_id() {
        let fetcher = sample_fetcher();
        let item = fetcher.fetch("v1").unwrap();
        assert_eq!(item.content, "first");
    }

    #[test]
    fn test_fetch_unknown_id() {
        let fetcher = sample_fetcher();
        let err = fetcher.fetch("missing").unwrap_err();
        assert!(err.is_fetch());
    }

    #[test]
    fn test_expand_preserves_member_order() {
        let fetcher = sample_fetcher();
        let items = fetcher.expand("pl1").unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "v1");
        assert_eq!(items[1].id, "v2");
    }

    #[test]
    fn test_expand_unknown_container() {
        let fetcher = sample_fetcher();
        assert!(fetcher.expand("nope").unwrap_err().is_fetch());
    }

    #[test]
    fn test_expand_fails_on_missing_member() {
        let mut fetcher = sample_fetcher();
        fetcher.insert_container("broken", ["v1", "ghost"]);

        assert!(fetcher.expand("broken").unwrap_err().is_fetch());
    }

    #[test]
    fn test_from_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let catalog = temp.child("catalog.json");
        catalog
            .write_str(
                r#"{
                    "items": [
                        {"id": "v1", "title": "One", "content": "first", "source": "video"},
                        {"id": "v2", "content": "second", "source": "video"}
                    ],
                    "containers": {"pl1": ["v2", "v1"]}
                }"#,
            )
            .unwrap();

        let fetcher = StaticFetcher::from_file(catalog.path()).unwrap();
        assert_eq!(fetcher.len(), 2);

        let items = fetcher.expand("pl1").unwrap();
        assert_eq!(items[0].id, "v2");
        assert_eq!(items[1].id, "v1");
    }

    #[test]
    fn test_from_file_missing() {
        let err = StaticFetcher::from_file("/nonexistent/catalog.json").unwrap_err();
        assert!(err.is_io());
    }
}
