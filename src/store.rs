//! Document store interface
//!
//! The store hands out documents and their approved comments. It has no memory of what
//! a run did to the content it handed out: querying comments a second time returns the
//! original text again, which is why protected comments are rehydrated from
//! [`crate::rehydrate::ProtectedDocumentCache`].

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// Stable identifier of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct DocumentId(pub u64);

/// Stable identifier of a comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct CommentId(pub u64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of any protected piece of content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentId {
    Document(DocumentId),
    Excerpt(DocumentId),
    Comment(CommentId),
}

/// A document with mutable text content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    #[serde(default)]
    pub title: String,
    pub content: String,
    /// Hand-written excerpt, if the document has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

impl Document {
    pub fn new(id: u64, content: impl Into<String>) -> Self {
        Self {
            id: DocumentId(id),
            title: String::new(),
            content: content.into(),
            excerpt: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// A comment attached to a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    #[serde(default)]
    pub author: String,
    pub content: String,
    /// Unapproved comments are never handed out by the store
    #[serde(default = "default_true")]
    pub approved: bool,
}

impl Comment {
    pub fn new(id: u64, content: impl Into<String>) -> Self {
        Self {
            id: CommentId(id),
            author: String::new(),
            content: content.into(),
            approved: true,
        }
    }
}

/// Errors that can occur when reading from a document store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested document does not exist
    #[error("Document {0} not found")]
    DocumentNotFound(DocumentId),

    /// Failed to read the site data file
    #[error("Failed to read site data at {path}: {source}")]
    IoError { source: io::Error, path: String },

    /// The site data is not valid JSON for a site dump
    #[error("Failed to parse site data: {0}")]
    ParseError(String),
}

/// Source of documents and their approved comments.
///
/// Both queries may be issued more than once per run.
pub trait DocumentStore {
    /// All documents of the current request, in display order
    fn documents(&self) -> Result<Vec<Document>, StoreError>;

    /// Approved comments of `document`, in display order
    fn approved_comments(&self, document: DocumentId) -> Result<Vec<Comment>, StoreError>;
}

/// A document together with all of its comments, as stored in a site dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDocument {
    #[serde(flatten)]
    pub document: Document,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// JSON layout read by [`MemoryStore::from_json`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDump {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub documents: Vec<SiteDocument>,
}

/// In-memory store handing out fresh copies on every query
#[derive(Debug, Default)]
pub struct MemoryStore {
    title: String,
    documents: Vec<Document>,
    comments: BTreeMap<DocumentId, Vec<Comment>>,
    comment_queries: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dump(dump: SiteDump) -> Self {
        let mut store = Self {
            title: dump.title,
            ..Self::default()
        };
        for site_document in dump.documents {
            store.comments.insert(site_document.document.id, site_document.comments);
            store.documents.push(site_document.document);
        }
        store
    }

    pub fn from_json(content: &str) -> Result<Self, StoreError> {
        let dump: SiteDump = serde_json::from_str(content).map_err(|e| StoreError::ParseError(e.to_string()))?;
        Ok(Self::from_dump(dump))
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path).map_err(|source| StoreError::IoError {
            source,
            path: path.display().to_string(),
        })?;
        Self::from_json(&content)
    }

    pub fn add_document(&mut self, document: Document) {
        self.comments.entry(document.id).or_default();
        self.documents.push(document);
    }

    pub fn add_comment(&mut self, document: DocumentId, comment: Comment) {
        self.comments.entry(document).or_default().push(comment);
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// How many times comments were queried so far
    pub fn comment_queries(&self) -> usize {
        self.comment_queries.get()
    }
}

impl DocumentStore for MemoryStore {
    fn documents(&self) -> Result<Vec<Document>, StoreError> {
        Ok(self.documents.clone())
    }

    fn approved_comments(&self, document: DocumentId) -> Result<Vec<Comment>, StoreError> {
        self.comment_queries.set(self.comment_queries.get() + 1);
        let comments = self
            .comments
            .get(&document)
            .ok_or(StoreError::DocumentNotFound(document))?;
        Ok(comments.iter().filter(|c| c.approved).cloned().collect())
    }
}
