//! Stylesheet parser
//!
//! Only looks for references: `@import` rules and `url(...)` values. Both
//! are recorded as embeds of the page the stylesheet belongs to.

use crate::crawler::context::LinkContext;
use crate::crawler::parsers::ContentParser;
use crate::storage::StorageResult;
use regex::Regex;

const COMMENT_PATTERN: &str = r"(?s)/\*.*?\*/";
const IMPORT_PATTERN: &str = r#"(?is)@import\s+["']([^"']*)["']"#;
const URL_PATTERN: &str = r#"(?i)url\(\s*["']?([^"')]*?)["']?\s*\)"#;

/// Parser for `text/css` content
#[derive(Debug, Default)]
pub struct CssParser;

impl ContentParser for CssParser {
    fn mimetypes(&self) -> &[&'static str] {
        &["text/css"]
    }

    fn parse(&self, content: &[u8], ctx: &mut LinkContext<'_>) -> crate::Result<()> {
        let css = String::from_utf8_lossy(content);
        let base = ctx.url().to_string();
        parse_css(&css, &base, ctx)?;
        Ok(())
    }
}

/// Extracts the references from a piece of CSS
///
/// Used for stylesheets as well as `<style>` blocks and `style`
/// attributes in HTML.
///
/// # Arguments
///
/// * `css` - The CSS text
/// * `base` - URL relative references are resolved against
/// * `ctx` - The link the CSS belongs to
pub fn parse_css(css: &str, base: &str, ctx: &mut LinkContext<'_>) -> StorageResult<()> {
    for reference in css_references(css) {
        let url = ctx.resolve(base, &reference);
        ctx.add_embed(&url)?;
    }
    Ok(())
}

/// Lists the URLs referenced by a piece of CSS, in order of appearance
pub fn css_references(css: &str) -> Vec<String> {
    let (Ok(comment), Ok(import), Ok(url)) = (
        Regex::new(COMMENT_PATTERN),
        Regex::new(IMPORT_PATTERN),
        Regex::new(URL_PATTERN),
    ) else {
        return Vec::new();
    };

    let css = comment.replace_all(css, "");
    let mut references = Vec::new();
    for pattern in [&import, &url] {
        for captures in pattern.captures_iter(&css) {
            if let Some(m) = captures.get(1) {
                let reference = m.as_str().trim();
                if !reference.is_empty() && !reference.starts_with("data:") {
                    references.push(reference.to_string());
                }
            }
        }
    }
    references
}
