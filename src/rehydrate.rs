//! Rehydration of re-fetched content
//!
//! The store may be queried again after detection, handing back the raw text with the
//! live fence markup. The cache keeps the protected text per stable identifier and puts
//! it back into whatever the store returned.

use crate::store::{Comment, ContentId, Document};
use std::collections::HashMap;

/// Protected text keyed by stable identifier
#[derive(Debug, Default, Clone)]
pub struct ProtectedDocumentCache {
    entries: HashMap<ContentId, String>,
}

impl ProtectedDocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ContentId, protected: String) {
        self.entries.insert(id, protected);
    }

    pub fn get(&self, id: ContentId) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace the content of every cached comment with its protected text.
    /// Returns how many comments were replaced.
    pub fn rehydrate_comments(&self, comments: &mut [Comment]) -> usize {
        let mut replaced = 0;
        for comment in comments.iter_mut() {
            if let Some(protected) = self.get(ContentId::Comment(comment.id)) {
                comment.content = protected.to_string();
                replaced += 1;
            }
        }
        if replaced > 0 {
            log::debug!("Rehydrated {replaced} of {} re-fetched comments", comments.len());
        }
        replaced
    }

    /// Replace the content and excerpt of every cached document with their protected text.
    /// Returns how many documents were touched.
    pub fn rehydrate_documents(&self, documents: &mut [Document]) -> usize {
        let mut replaced = 0;
        for document in documents.iter_mut() {
            let mut touched = false;
            if let Some(protected) = self.get(ContentId::Document(document.id)) {
                document.content = protected.to_string();
                touched = true;
            }
            if let Some(protected) = self.get(ContentId::Excerpt(document.id)) {
                document.excerpt = Some(protected.to_string());
                touched = true;
            }
            replaced += usize::from(touched);
        }
        if replaced > 0 {
            log::debug!("Rehydrated {replaced} of {} re-fetched documents", documents.len());
        }
        replaced
    }
}
