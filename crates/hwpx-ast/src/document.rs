//! Document root and metadata.
//!
//! The metadata map is sourced from YAML frontmatter if present, else
//! derived by the front end from the document's first `Header{level: 1}`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::block::Block;

/// A complete document: resolved metadata plus the block sequence the
/// emitter walks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub metadata: DocumentMeta,
    pub blocks: Vec<Block>,
}

/// Document metadata (title, authors, arbitrary frontmatter attributes).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub attributes: HashMap<String, String>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            metadata: DocumentMeta::default(),
            blocks: Vec::new(),
        }
    }

    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            metadata: DocumentMeta {
                title: Some(title.into()),
                ..Default::default()
            },
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentMeta {
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn add_author(&mut self, author: impl Into<String>) {
        self.authors.push(author.into());
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn get_attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inline::Inline;

    #[test]
    fn empty_document() {
        let doc = Document::new();
        assert!(doc.is_empty());
        assert_eq!(doc.len(), 0);
    }

    #[test]
    fn document_with_title() {
        let doc = Document::with_title("My Document");
        assert_eq!(doc.metadata.title, Some("My Document".to_string()));
    }

    #[test]
    fn document_push_block() {
        let mut doc = Document::new();
        doc.push(Block::Paragraph {
            inlines: vec![Inline::Str("Hello".to_string())],
        });
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn metadata_attributes() {
        let mut meta = DocumentMeta::default();
        meta.set_attribute("lang", "en");
        assert_eq!(meta.get_attribute("lang"), Some("en"));
    }

    #[test]
    fn metadata_authors() {
        let mut meta = DocumentMeta::default();
        meta.add_author("Alice");
        meta.add_author("Bob");
        assert_eq!(meta.authors.len(), 2);
    }
}
