mod common;

use common::RecordingHighlighter;
use fenceguard_lib::grammar::FenceGrammar;
use fenceguard_lib::run::{Run, RunSettings};
use fenceguard_lib::store::{Comment, Document, DocumentId, DocumentStore, MemoryStore};
use fenceguard_lib::vault::{self, MatchIndex, RunToken};
use proptest::prelude::*;

const LANGUAGES: &[&str] = &["python", "rust", "c", "sh", ""];

/// Prose between fences never contains markup
fn prose() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,\n]{0,40}"
}

fn code() -> impl Strategy<Value = String> {
    "[a-z0-9 =+(){};\n]{1,40}"
}

fn fence() -> impl Strategy<Value = (usize, String)> {
    (0..LANGUAGES.len(), code())
}

fn render_document(parts: &[(String, (usize, String))], tail: &str) -> String {
    let mut text = String::new();
    for (prose, (language, code)) in parts {
        text.push_str(prose);
        match LANGUAGES[*language] {
            "" => text.push_str(&format!("<pre>{code}</pre>")),
            language => text.push_str(&format!("<pre lang=\"{language}\">{code}</pre>")),
        }
    }
    text.push_str(tail);
    text
}

proptest! {
    #[test]
    fn prop_text_without_fences_is_unchanged(text in "[a-zA-Z0-9 .,<>/\n]{0,200}") {
        let token = RunToken::generate();
        let extraction = vault::protect(&text, &token, &FenceGrammar::default(), MatchIndex::default());
        if extraction.matches.is_empty() {
            prop_assert_eq!(&*extraction.text, text.as_str());
        }
    }

    #[test]
    fn prop_full_pipeline_leaves_no_placeholder(
        parts in prop::collection::vec((prose(), fence()), 0..6),
        tail in prose(),
        comment_parts in prop::collection::vec((prose(), fence()), 0..3),
    ) {
        let content = render_document(&parts, &tail);
        let comment = render_document(&comment_parts, "");

        let mut store = MemoryStore::new();
        store.add_document(Document::new(1, content.clone()));
        store.add_comment(DocumentId(1), Comment::new(2, comment));

        let mut documents = store.documents().unwrap();
        let mut run = Run::begin(RunSettings::default());
        let summary = run.detect(&mut documents, &store).unwrap();
        let expected = parts.len() + comment_parts.len();
        prop_assert_eq!(summary.snippets, expected);

        let token = run.token().as_str().to_string();
        let Some(rendered) = run.finish(&RecordingHighlighter::new()) else {
            prop_assert_eq!(expected, 0);
            prop_assert_eq!(&documents[0].content, &content);
            return Ok(());
        };

        let indices: Vec<usize> = rendered.snippets().iter().map(|(index, _)| index.get()).collect();
        prop_assert_eq!(indices, (0..expected).collect::<Vec<_>>());

        let output = rendered.reinsert(&documents[0].content);
        prop_assert!(!output.contains(&token));
        prop_assert_eq!(output.matches("<code data-lang=").count(), parts.len());

        let mut comments = store.approved_comments(DocumentId(1)).unwrap();
        rendered.rehydrate_comments(&mut comments);
        let comment_output = rendered.reinsert(&comments[0].content);
        prop_assert!(!comment_output.contains(&token));
        prop_assert_eq!(comment_output.matches("<code data-lang=").count(), comment_parts.len());
    }
}
