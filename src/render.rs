//! Markdown rendering collaborator.
//!
//! The coordinator treats rendering as a pure function: Markdown bytes in,
//! HTML bytes out, or an error. [`CmarkRenderer`] renders locally with
//! `pulldown-cmark`; anything else (a remote rendering API, for instance)
//! plugs in through the [`Renderer`] trait.

use pulldown_cmark::{Options, Parser, html as md_html};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Markdown is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("Renderer rejected the document: {0}")]
    Rejected(String),
}

/// Converts a page's working Markdown into its rendered body.
pub trait Renderer: Sync {
    fn render(&self, markdown: &[u8]) -> Result<Vec<u8>, RenderError>;
}

/// Local CommonMark renderer with GitHub-style extensions
/// (tables, strikethrough, task lists, footnotes).
#[derive(Debug, Default, Clone, Copy)]
pub struct CmarkRenderer;

impl CmarkRenderer {
    pub fn new() -> Self {
        Self
    }

    fn options() -> Options {
        Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_FOOTNOTES
    }
}

impl Renderer for CmarkRenderer {
    fn render(&self, markdown: &[u8]) -> Result<Vec<u8>, RenderError> {
        let text = std::str::from_utf8(markdown)?;
        let parser = Parser::new_ext(text, Self::options());
        let mut html = String::with_capacity(text.len() * 3 / 2);
        md_html::push_html(&mut html, parser);
        Ok(html.into_bytes())
    }
}
