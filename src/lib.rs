//! Protects fenced code snippets from the rest of a render pipeline.
//!
//! A run finds every fence in the documents of a request and their comments, swaps each
//! for a placeholder, highlights the snippets in one batch and reinserts the markup as the
//! very last fragment filter. See [`run::Run`] for the entry point.

pub mod config;
pub mod engine;
pub mod exit_codes;
pub mod grammar;
pub mod highlight;
pub mod hooks;
pub mod rehydrate;
pub mod reinsert;
pub mod run;
pub mod store;
pub mod style;
pub mod vault;

pub use crate::config::{Config, ConfigError};
pub use crate::grammar::{FenceGrammar, StyleTarget};
pub use crate::highlight::{HighlightError, Highlighter, SyntectHighlighter};
pub use crate::hooks::{FragmentKind, RenderHooks};
pub use crate::run::{RenderedRun, Run, RunSettings, prepare};
pub use crate::store::{Comment, Document, DocumentStore, MemoryStore, StoreError};
pub use crate::vault::{MatchIndex, RunToken};
