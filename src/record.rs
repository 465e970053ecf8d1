use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where a fetched item originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A single video resource
    Video,
    /// A member of an expanded playlist
    Playlist,
    /// A forum post or thread
    Forum,
    /// Any other source
    Other,
}

impl SourceKind {
    /// Returns a stable tag string for stream naming and logging.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Playlist => "playlist",
            Self::Forum => "forum",
            Self::Other => "other",
        }
    }
}

/// A normalized record representing one fetched resource.
///
/// Created once per fetch and never mutated afterwards; ownership passes
/// to the streaming sink on emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Resource identifier the item was fetched under
    pub id: String,

    /// Human-readable title if the source provides one
    pub title: Option<String>,

    /// Main textual content of the resource
    pub content: String,

    /// Source the item came from
    pub source: SourceKind,

    /// Publication timestamp if the source provides one
    pub published_at: Option<DateTime<Utc>>,

    /// Source-specific metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Item {
    /// Creates a new item with minimal fields.
    #[must_use]
    pub fn new(id: impl Into<String>, content: impl Into<String>, source: SourceKind) -> Self {
        Self {
            id: id.into(),
            title: None,
            content: content.into(),
            source,
            published_at: None,
            metadata: HashMap::new(),
        }
    }

    /// Sets the item title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the publication timestamp.
    #[must_use]
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    /// Adds a metadata key-value pair.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns the content length in bytes.
    #[must_use]
    pub fn content_bytes(&self) -> usize {
        self.content.len()
    }

    /// Returns true if the item carries non-whitespace content.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// A generic unit of text plus auxiliary key-value attributes.
///
/// Documents are produced by upstream collection and mutated in place by
/// the loader stage (metadata pruning) before batching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// The document's textual content
    pub page_content: String,

    /// Auxiliary attributes keyed by name
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Document {
    /// Creates a new document from content.
    #[must_use]
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Adds a metadata key-value pair.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Removes the given metadata keys in place.
    ///
    /// Removing an absent key is a no-op, so pruning is idempotent.
    pub fn prune_metadata(&mut self, keys: &[String]) {
        for key in keys {
            self.metadata.remove(key);
        }
    }

    /// Returns the content length in bytes.
    #[must_use]
    pub fn content_bytes(&self) -> usize {
        self.page_content.len()
    }
}

impl From<Item> for Document {
    fn from(item: Item) -> Self {
        let mut doc = Document::new(item.content);
        doc.metadata
            .insert("id".to_string(), serde_json::Value::String(item.id));
        doc.metadata.insert(
            "source".to_string(),
            serde_json::Value::String(item.source.tag().to_string()),
        );
        if let Some(title) = item.title {
            doc.metadata
                .insert("title".to_string(), serde_json::Value::String(title));
        }
        if let Some(published_at) = item.published_at {
            doc.metadata.insert(
                "published_at".to_string(),
                serde_json::Value::String(published_at.to_rfc3339()),
            );
        }
        for (key, value) in item.metadata {
            doc.metadata.insert(key, serde_json::Value::String(value));
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_builder() {
        let item = Item::new("v1", "transcript text", SourceKind::Video)
            .with_title("Intro")
            .with_metadata("channel", "rustlang");

        assert_eq!(item.id, "v1");
        assert_eq!(item.title, Some("Intro".to_string()));
        assert_eq!(item.metadata.get("channel"), Some(&"rustlang".to_string()));
        assert!(item.has_content());
        assert_eq!(item.content_bytes(), "transcript text".len());
    }

    #[test]
    fn test_empty_content_detection() {
        let item = Item::new("v1", "   ", SourceKind::Video);
        assert!(!item.has_content());
    }

    #[test]
    fn test_source_kind_tags() {
        assert_eq!(SourceKind::Video.tag(), "video");
        assert_eq!(SourceKind::Playlist.tag(), "playlist");
        assert_eq!(SourceKind::Forum.tag(), "forum");
    }

    #[test]
    fn test_item_serde_roundtrip() {
        let item = Item::new("v1", "text", SourceKind::Playlist).with_title("t");
        let json = serde_json::to_string(&item).unwrap();
        let back: Item = serde_json::from_str(&json).unwrap();

        assert_eq!(back.id, "v1");
        assert_eq!(back.source, SourceKind::Playlist);
    }

    #[test]
    fn test_prune_metadata_removes_keys() {
        let mut doc = Document::new("content")
            .with_metadata("category", json!("howto"))
            .with_metadata("tags", json!(["a", "b"]))
            .with_metadata("title", json!("keep me"));

        doc.prune_metadata(&["category".to_string(), "tags".to_string()]);

        assert!(!doc.metadata.contains_key("category"));
        assert!(!doc.metadata.contains_key("tags"));
        assert_eq!(doc.metadata.get("title"), Some(&json!("keep me")));
    }

    #[test]
    fn test_prune_metadata_is_idempotent() {
        let mut doc = Document::new("content").with_metadata("category", json!("howto"));
        let keys = vec!["category".to_string(), "absent".to_string()];

        doc.prune_metadata(&keys);
        let after_first = doc.metadata.clone();
        doc.prune_metadata(&keys);

        assert_eq!(doc.metadata, after_first);
    }

    #[test]
    fn test_item_to_document() {
        let item = Item::new("v1", "body", SourceKind::Video)
            .with_title("Title")
            .with_metadata("channel", "rustlang");
        let doc = Document::from(item);

        assert_eq!(doc.page_content, "body");
        assert_eq!(doc.metadata.get("id"), Some(&json!("v1")));
        assert_eq!(doc.metadata.get("source"), Some(&json!("video")));
        assert_eq!(doc.metadata.get("title"), Some(&json!("Title")));
        assert_eq!(doc.metadata.get("channel"), Some(&json!("rustlang")));
    }
}
