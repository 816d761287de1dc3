//! Markdown rendering for post bodies.
//!
//! # Responsibility
//! - Define the pure `MarkdownEngine` collaborator and its pulldown-cmark
//!   implementation.
//! - Provide `RenderScope`, the per-request memoizing renderer that every
//!   rendering operation receives explicitly.
//!
//! # Invariants
//! - Engines are pure: the same source always yields the same HTML.
//! - A `RenderScope` belongs to one request and is only used through `&mut`.

pub mod excerpt;

use crate::model::post::Post;
use pulldown_cmark::{html, Options, Parser};
use std::collections::HashMap;

/// Pure markup-to-HTML transform.
pub trait MarkdownEngine {
    fn to_html(&self, source: &str) -> String;
}

/// CommonMark engine backed by `pulldown-cmark`.
#[derive(Debug, Clone, Copy)]
pub struct CmarkEngine {
    options: Options,
}

impl CmarkEngine {
    pub fn with_options(options: Options) -> Self {
        Self { options }
    }
}

impl Default for CmarkEngine {
    fn default() -> Self {
        Self::with_options(
            Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_FOOTNOTES,
        )
    }
}

impl MarkdownEngine for CmarkEngine {
    fn to_html(&self, source: &str) -> String {
        let parser = Parser::new_ext(source, self.options);
        let mut output = String::with_capacity(source.len() + source.len() / 2);
        html::push_html(&mut output, parser);
        output
    }
}

/// Request-scoped renderer memoizing HTML by source text.
///
/// Create one per incoming request and drop it with the request.
pub struct RenderScope<'e> {
    engine: &'e dyn MarkdownEngine,
    memo: HashMap<String, String>,
}

impl<'e> RenderScope<'e> {
    pub fn new(engine: &'e dyn MarkdownEngine) -> Self {
        Self {
            engine,
            memo: HashMap::new(),
        }
    }

    /// Renders markup, reusing the result for identical sources.
    pub fn render(&mut self, source: &str) -> String {
        if let Some(rendered) = self.memo.get(source) {
            return rendered.clone();
        }
        let rendered = self.engine.to_html(source);
        self.memo.insert(source.to_string(), rendered.clone());
        rendered
    }

    /// Replaces the post's raw content with its HTML rendering.
    pub fn render_post(&mut self, mut post: Post) -> Post {
        post.content = self.render(&post.content);
        post
    }

    /// Number of distinct sources rendered in this scope.
    pub fn rendered_count(&self) -> usize {
        self.memo.len()
    }
}
