//! Per-run context
//!
//! A [`Run`] owns everything the detection pass produces: the token vault and the cache of
//! protected texts. [`Run::finish`] hands the pending snippets to the engine and yields a
//! [`RenderedRun`], the read-only state the render hooks work from. Dropping either value
//! ends the run; nothing outlives it.

use crate::config::Config;
use crate::engine::{BatchOutput, CssAssetRequestList, EngineSettings, LanguageStyleSet, RenderedSnippets, process_batch};
use crate::grammar::FenceGrammar;
use crate::highlight::Highlighter;
use crate::hooks::{FragmentKind, PRIORITY_DEFAULT, PRIORITY_EARLY, PRIORITY_LAST, RenderHooks};
use crate::rehydrate::ProtectedDocumentCache;
use crate::reinsert::Reinserter;
use crate::store::{Comment, ContentId, Document, DocumentStore, StoreError};
use crate::style::{AssetResolver, head_markup};
use crate::vault::{RunToken, TokenVault};
use std::borrow::Cow;
use std::rc::Rc;

/// Settings of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSettings {
    pub grammar: FenceGrammar,
    pub engine: EngineSettings,
    /// Asset linked before the requested ones
    pub default_stylesheet: Option<String>,
}

impl From<&Config> for RunSettings {
    fn from(config: &Config) -> Self {
        let default_stylesheet = config.assets.default_stylesheet.trim();
        Self {
            grammar: config.grammar(),
            engine: config.engine_settings(),
            default_stylesheet: (!default_stylesheet.is_empty()).then(|| default_stylesheet.to_string()),
        }
    }
}

/// What the detection pass found
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectionSummary {
    pub documents: usize,
    pub comments: usize,
    pub snippets: usize,
}

/// Detection state of a run
#[derive(Debug)]
pub struct Run {
    vault: TokenVault,
    cache: ProtectedDocumentCache,
    settings: RunSettings,
}

impl Run {
    /// Start a run with a fresh token
    pub fn begin(settings: RunSettings) -> Self {
        Self::with_vault(TokenVault::begin(settings.grammar.clone()), settings)
    }

    pub fn with_token(token: RunToken, settings: RunSettings) -> Self {
        Self::with_vault(TokenVault::with_token(token, settings.grammar.clone()), settings)
    }

    fn with_vault(vault: TokenVault, settings: RunSettings) -> Self {
        Self {
            vault,
            cache: ProtectedDocumentCache::new(),
            settings,
        }
    }

    pub fn token(&self) -> &RunToken {
        self.vault.token()
    }

    pub fn snippet_count(&self) -> usize {
        self.vault.len()
    }

    pub fn cache(&self) -> &ProtectedDocumentCache {
        &self.cache
    }

    /// Protect the content and excerpt of `document` in place.
    /// Returns the number of snippets found.
    pub fn protect_document(&mut self, document: &mut Document) -> usize {
        let mut found = replace_protected(&mut self.vault, &mut document.content);
        self.cache
            .insert(ContentId::Document(document.id), document.content.clone());
        if let Some(excerpt) = document.excerpt.as_mut() {
            found += replace_protected(&mut self.vault, excerpt);
            self.cache.insert(ContentId::Excerpt(document.id), excerpt.clone());
        }
        found
    }

    /// Protect a comment fetched from the store.
    ///
    /// The comment itself is not needed afterwards: its protected text is cached and put
    /// back when the store hands the comment out again.
    pub fn protect_comment(&mut self, comment: &Comment) -> usize {
        let (protected, found) = self.vault.extract_and_protect(&comment.content);
        let protected = protected.into_owned();
        self.cache.insert(ContentId::Comment(comment.id), protected);
        found
    }

    /// Detection pass over the documents of a request and their approved comments
    pub fn detect(&mut self, documents: &mut [Document], store: &dyn DocumentStore) -> Result<DetectionSummary, StoreError> {
        let mut summary = DetectionSummary::default();

        for document in documents.iter_mut() {
            summary.snippets += self.protect_document(document);
            summary.documents += 1;

            for comment in store.approved_comments(document.id)? {
                summary.snippets += self.protect_comment(&comment);
                summary.comments += 1;
            }
        }

        log::debug!(
            "Detection found {} snippets in {} documents and {} comments",
            summary.snippets,
            summary.documents,
            summary.comments
        );
        Ok(summary)
    }

    /// Highlight the snippets of this run.
    ///
    /// Returns `None` when no snippet was found: nothing needs to be reinserted and no
    /// stylesheet is needed.
    pub fn finish(self, highlighter: &dyn Highlighter) -> Option<RenderedRun> {
        if self.vault.is_empty() {
            log::debug!("No snippets found, nothing to render");
            return None;
        }

        let (token, batch) = self.vault.into_parts();
        let output = process_batch(batch, highlighter, &self.settings.engine);
        log::info!(
            "Rendered {} snippets in {} languages",
            output.snippets.len(),
            output.languages.len()
        );

        Some(RenderedRun {
            token,
            output,
            cache: self.cache,
            default_stylesheet: self.settings.default_stylesheet,
        })
    }
}

fn replace_protected(vault: &mut TokenVault, text: &mut String) -> usize {
    let (protected, found) = vault.extract_and_protect(text);
    if let Cow::Owned(protected) = protected {
        *text = protected;
    }
    found
}

/// Render state of a run after highlighting, read-only
#[derive(Debug)]
pub struct RenderedRun {
    token: RunToken,
    output: BatchOutput,
    cache: ProtectedDocumentCache,
    default_stylesheet: Option<String>,
}

impl RenderedRun {
    pub fn token(&self) -> &RunToken {
        &self.token
    }

    pub fn snippets(&self) -> &RenderedSnippets {
        &self.output.snippets
    }

    pub fn stylesheet(&self) -> &str {
        &self.output.stylesheet
    }

    pub fn css_requests(&self) -> &CssAssetRequestList {
        &self.output.css_requests
    }

    pub fn languages(&self) -> &LanguageStyleSet {
        &self.output.languages
    }

    /// Swap this run's placeholders in `text` for the rendered snippets
    pub fn reinsert<'a>(&self, text: &'a str) -> Cow<'a, str> {
        Reinserter::new(&self.token, &self.output.snippets).reinsert(text)
    }

    /// Put the protected text back into comments fetched again from the store
    pub fn rehydrate_comments(&self, comments: &mut [Comment]) -> usize {
        self.cache.rehydrate_comments(comments)
    }

    /// Put the protected content and excerpts back into documents fetched again from the store
    pub fn rehydrate_documents(&self, documents: &mut [Document]) -> usize {
        self.cache.rehydrate_documents(documents)
    }

    pub fn head_markup(&self, resolver: &AssetResolver) -> String {
        head_markup(
            self.default_stylesheet.as_deref(),
            &self.output.css_requests,
            &self.output.stylesheet,
            resolver,
        )
    }

    /// Register the stages of this run on a render pipeline.
    ///
    /// Rehydration runs before every other comments filter, reinsertion after every other
    /// fragment filter.
    pub fn install(run: &Rc<RenderedRun>, hooks: &mut RenderHooks<'_>, resolver: AssetResolver) {
        let rehydrate = Rc::clone(run);
        hooks.add_documents_filter(PRIORITY_EARLY, move |documents: &mut Vec<Document>| {
            rehydrate.rehydrate_documents(documents);
        });

        let rehydrate = Rc::clone(run);
        hooks.add_comments_filter(PRIORITY_EARLY, move |comments: &mut Vec<Comment>| {
            rehydrate.rehydrate_comments(comments);
        });

        for kind in FragmentKind::ALL {
            let reinsert = Rc::clone(run);
            hooks.add_filter(kind, PRIORITY_LAST, move |text: &str| reinsert.reinsert(text).into_owned());
        }

        let head = Rc::clone(run);
        hooks.add_head_action(PRIORITY_DEFAULT, move || head.head_markup(&resolver));
    }
}

/// Detect and highlight the snippets of `documents` and their comments in one go
pub fn prepare(
    documents: &mut [Document],
    store: &dyn DocumentStore,
    highlighter: &dyn Highlighter,
    settings: RunSettings,
) -> Result<Option<RenderedRun>, StoreError> {
    let mut run = Run::begin(settings);
    run.detect(documents, store)?;
    Ok(run.finish(highlighter))
}
