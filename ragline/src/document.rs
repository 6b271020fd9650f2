//! Data types for stored documents and embeddings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata key holding a document's original text.
pub const CONTENT_KEY: &str = "content";

/// A dense vector produced by an embedding provider.
pub type Embedding = Vec<f32>;

/// Opaque document identifier, a UUID v4 string when generated by `insert`.
pub type DocumentId = String;

/// A stored document: its id plus free-form metadata.
///
/// The original text lives under the [`CONTENT_KEY`] metadata entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: DocumentId,
    /// Key-value metadata. Always carries `content` for ingested documents.
    pub metadata: HashMap<String, Value>,
    /// Distance from the query embedding, set only on query results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

impl Document {
    /// Create a document holding `text` under the `content` key.
    pub fn new(id: impl Into<DocumentId>, text: impl Into<String>) -> Self {
        Self { id: id.into(), metadata: content_metadata(text), distance: None }
    }

    /// The original text, if the `content` entry is present and a string.
    pub fn content(&self) -> Option<&str> {
        self.metadata.get(CONTENT_KEY).and_then(Value::as_str)
    }
}

/// Build the metadata map `{content: text}` used for every ingested document.
pub fn content_metadata(text: impl Into<String>) -> HashMap<String, Value> {
    HashMap::from([(CONTENT_KEY.to_string(), Value::String(text.into()))])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_reads_metadata_entry() {
        let doc = Document::new("d1", "hello");
        assert_eq!(doc.content(), Some("hello"));
    }

    #[test]
    fn content_is_none_for_non_string_values() {
        let doc = Document {
            id: "d1".into(),
            metadata: HashMap::from([(CONTENT_KEY.to_string(), Value::from(42))]),
            distance: None,
        };
        assert_eq!(doc.content(), None);
    }

    #[test]
    fn distance_is_omitted_when_unset() {
        let json = serde_json::to_value(Document::new("d1", "x")).unwrap();
        assert!(json.get("distance").is_none());
    }
}
