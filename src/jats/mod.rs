//! Streaming JATS/NLM XML parsing and HTML rendering.
//!
//! The parser consumes raw XML in a single left-to-right pass over
//! `quick-xml` events and reconstructs the article structure without ever
//! building a DOM. [`JatsParser::parse`] yields an [`Article`] model;
//! [`JatsParser::render_html`] goes one step further and renders the same
//! content to a flat HTML string for display.
//!
//! [`Article`]: crate::models::Article

mod parser;
mod render;

pub use parser::JatsParser;
pub use render::render_article;

/// Errors that can occur while parsing a JATS document
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The input could not be tokenized as XML. Fatal for this document
    /// only; missing or empty fields inside a well-formed document never
    /// produce this.
    #[error("malformed document: {0}")]
    MalformedDocument(String),
}
