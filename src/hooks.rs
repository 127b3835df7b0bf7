//! Render pipeline model
//!
//! Hosts register filters on the fragments of a page, on the list of comments handed out by
//! the store, and actions that contribute to the document head. Lower priorities run first;
//! equal priorities run in registration order.

use crate::store::{Comment, Document};
use std::collections::HashMap;

pub type Priority = i32;

/// Runs before every filter registered with a default priority
pub const PRIORITY_EARLY: Priority = 1;

pub const PRIORITY_DEFAULT: Priority = 10;

/// Runs after every other filter
pub const PRIORITY_LAST: Priority = Priority::MAX;

/// Rendered fragments of a page that filters can rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    Content,
    Excerpt,
    CommentText,
}

impl FragmentKind {
    pub const ALL: [FragmentKind; 3] = [FragmentKind::Content, FragmentKind::Excerpt, FragmentKind::CommentText];
}

type FragmentFilter<'h> = Box<dyn Fn(&str) -> String + 'h>;
type DocumentsFilter<'h> = Box<dyn Fn(&mut Vec<Document>) + 'h>;
type CommentsFilter<'h> = Box<dyn Fn(&mut Vec<Comment>) + 'h>;
type HeadAction<'h> = Box<dyn Fn() -> String + 'h>;

struct Prioritized<T> {
    priority: Priority,
    callback: T,
}

fn insert_sorted<T>(list: &mut Vec<Prioritized<T>>, priority: Priority, callback: T) {
    // After every entry of the same priority, so ties keep registration order
    let position = list.partition_point(|entry| entry.priority <= priority);
    list.insert(position, Prioritized { priority, callback });
}

/// Hook registry of one render pipeline
#[derive(Default)]
pub struct RenderHooks<'h> {
    fragment_filters: HashMap<FragmentKind, Vec<Prioritized<FragmentFilter<'h>>>>,
    documents_filters: Vec<Prioritized<DocumentsFilter<'h>>>,
    comments_filters: Vec<Prioritized<CommentsFilter<'h>>>,
    head_actions: Vec<Prioritized<HeadAction<'h>>>,
}

impl<'h> RenderHooks<'h> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_filter(&mut self, kind: FragmentKind, priority: Priority, filter: impl Fn(&str) -> String + 'h) {
        let filter: FragmentFilter<'h> = Box::new(filter);
        insert_sorted(self.fragment_filters.entry(kind).or_default(), priority, filter);
    }

    pub fn add_documents_filter(&mut self, priority: Priority, filter: impl Fn(&mut Vec<Document>) + 'h) {
        let filter: DocumentsFilter<'h> = Box::new(filter);
        insert_sorted(&mut self.documents_filters, priority, filter);
    }

    pub fn add_comments_filter(&mut self, priority: Priority, filter: impl Fn(&mut Vec<Comment>) + 'h) {
        let filter: CommentsFilter<'h> = Box::new(filter);
        insert_sorted(&mut self.comments_filters, priority, filter);
    }

    pub fn add_head_action(&mut self, priority: Priority, action: impl Fn() -> String + 'h) {
        let action: HeadAction<'h> = Box::new(action);
        insert_sorted(&mut self.head_actions, priority, action);
    }

    /// Pass `text` through every filter registered for `kind`
    pub fn apply_filters(&self, kind: FragmentKind, text: &str) -> String {
        let Some(filters) = self.fragment_filters.get(&kind) else {
            return text.to_string();
        };
        filters
            .iter()
            .fold(text.to_string(), |text, entry| (entry.callback)(&text))
    }

    /// Pass documents fetched from the store through every documents filter
    pub fn apply_documents_filters(&self, documents: &mut Vec<Document>) {
        for entry in &self.documents_filters {
            (entry.callback)(documents);
        }
    }

    /// Pass comments fetched from the store through every comments filter
    pub fn apply_comments_filters(&self, comments: &mut Vec<Comment>) {
        for entry in &self.comments_filters {
            (entry.callback)(comments);
        }
    }

    /// Concatenated output of every head action
    pub fn render_head(&self) -> String {
        self.head_actions.iter().map(|entry| (entry.callback)()).collect()
    }
}
