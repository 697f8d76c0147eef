//! Content parsers
//!
//! A content parser receives the body of a fetched link and reports the
//! references, anchors and metadata it finds through a `LinkContext`.

mod css;
mod html;

pub use css::{css_references, parse_css, CssParser};
pub use html::HtmlParser;

use crate::crawler::context::LinkContext;

/// Extracts links and metadata from content of particular mimetypes
pub trait ContentParser: Send + Sync {
    /// Lowercase mimetypes handled by this parser
    fn mimetypes(&self) -> &[&'static str];

    /// Parses the content of the link in `ctx`
    ///
    /// Whatever was extracted before an error is kept. An error is recorded
    /// as a page problem by the caller.
    fn parse(&self, content: &[u8], ctx: &mut LinkContext<'_>) -> crate::Result<()>;
}
