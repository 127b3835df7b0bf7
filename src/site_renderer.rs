//! Minimal page renderer driving a [`RenderHooks`] pipeline
//!
//! Mirrors the order a blog engine renders a request in: the head first, then every
//! document with its excerpt and content, then its comments. Documents and comments are
//! queried from the store again at that point.

use fenceguard_lib::highlight::escape_html;
use fenceguard_lib::hooks::{FragmentKind, RenderHooks};
use fenceguard_lib::store::{Document, DocumentStore, StoreError};

/// Render a complete HTML page
pub fn render_site(title: &str, store: &dyn DocumentStore, hooks: &RenderHooks<'_>) -> Result<String, StoreError> {
    let mut documents = store.documents()?;
    hooks.apply_documents_filters(&mut documents);

    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\" />\n");
    page.push_str(&format!("<title>{}</title>\n", escape_html(title)));
    page.push_str(&hooks.render_head());
    page.push_str("</head>\n<body>\n");

    for document in &documents {
        page.push_str(&render_document(document, store, hooks)?);
    }

    page.push_str("</body>\n</html>\n");
    Ok(page)
}

fn render_document(document: &Document, store: &dyn DocumentStore, hooks: &RenderHooks<'_>) -> Result<String, StoreError> {
    let mut html = String::new();
    html.push_str(&format!("<article id=\"document-{}\">\n", document.id));
    if !document.title.is_empty() {
        html.push_str(&format!("<h1>{}</h1>\n", escape_html(&document.title)));
    }
    if let Some(excerpt) = &document.excerpt {
        html.push_str(&format!(
            "<div class=\"excerpt\">{}</div>\n",
            hooks.apply_filters(FragmentKind::Excerpt, excerpt)
        ));
    }
    html.push_str(&format!(
        "<div class=\"content\">{}</div>\n",
        hooks.apply_filters(FragmentKind::Content, &document.content)
    ));

    let mut comments = store.approved_comments(document.id)?;
    hooks.apply_comments_filters(&mut comments);
    if !comments.is_empty() {
        html.push_str("<section class=\"comments\">\n");
        for comment in &comments {
            html.push_str(&format!(
                "<div class=\"comment\" id=\"comment-{}\"><p class=\"author\">{}</p>{}</div>\n",
                comment.id,
                escape_html(&comment.author),
                hooks.apply_filters(FragmentKind::CommentText, &comment.content)
            ));
        }
        html.push_str("</section>\n");
    }

    html.push_str("</article>\n");
    Ok(html)
}

/// Render a single fragment, optionally preceded by the head markup
pub fn render_fragment(content: &str, hooks: &RenderHooks<'_>, with_head: bool) -> String {
    let body = hooks.apply_filters(FragmentKind::Content, content);
    if with_head {
        format!("{}{body}", hooks.render_head())
    } else {
        body
    }
}
