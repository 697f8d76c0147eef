//! HTML parser for extracting links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Navigational links (`<a>`, `<area>`, meta refresh) as children
//! - Images, stylesheets, frames, scripts and plugins as embeds
//! - Anchors defined with `name` and `id` attributes
//! - Page title, author and character encoding

use crate::crawler::context::LinkContext;
use crate::crawler::parsers::css::parse_css;
use crate::crawler::parsers::ContentParser;
use crate::storage::StorageResult;
use encoding_rs::{Encoding, UTF_8};
use html5ever::driver::{self, ParseOpts};
use html5ever::tendril::TendrilSink;
use html5ever::tokenizer::TokenizerOpts;
use html5ever::tree_builder::TreeBuilderOpts;
use regex::{Regex, RegexBuilder};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Markup errors reported per page before the rest is summarized
pub const MAX_MARKUP_ERRORS: usize = 5;

/// Number of leading bytes searched for a `<meta>` charset declaration
const CHARSET_SNIFF_LIMIT: usize = 2048;

/// `<link rel>` values that embed a resource
const EMBEDDING_RELS: &[&str] = &["stylesheet", "alternate stylesheet", "icon", "shortcut icon"];

/// Parser for HTML content
#[derive(Debug, Default)]
pub struct HtmlParser;

impl ContentParser for HtmlParser {
    fn mimetypes(&self) -> &[&'static str] {
        &["text/html", "application/xhtml+xml", "text/x-server-parsed-html"]
    }

    fn parse(&self, content: &[u8], ctx: &mut LinkContext<'_>) -> crate::Result<()> {
        if let Some(declared) = sniff_charset(content) {
            ctx.set_encoding(&declared)?;
        }
        let encoding = ctx
            .link()
            .encoding
            .as_deref()
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);
        let (text, used, _) = encoding.decode(content);
        ctx.set_encoding(used.name())?;

        let document = parse_document(&text);
        report_markup_errors(&document, ctx)?;
        extract(&document, ctx)?;

        ctx.mark_page();
        Ok(())
    }
}

/// Finds a charset declared in a `<meta>` element near the start of the page
pub fn sniff_charset(content: &[u8]) -> Option<String> {
    let head = &content[..content.len().min(CHARSET_SNIFF_LIMIT)];
    let head = String::from_utf8_lossy(head);
    let pattern = RegexBuilder::new(r#"<meta[^>]+charset\s*=\s*["']?([a-z0-9_:.\-]+)"#)
        .case_insensitive(true)
        .build()
        .ok()?;
    pattern
        .captures(&head)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parses a page, keeping detailed error messages
fn parse_document(text: &str) -> Html {
    let opts = ParseOpts {
        tokenizer: TokenizerOpts {
            exact_errors: true,
            ..Default::default()
        },
        tree_builder: TreeBuilderOpts {
            exact_errors: true,
            ..Default::default()
        },
    };
    driver::parse_document(Html::new_document(), opts).one(text)
}

/// Records the parser's markup errors as page problems, up to a budget
///
/// A missing DOCTYPE is reported once in plain words instead of as the
/// unexpected first token it shows up as.
fn report_markup_errors(document: &Html, ctx: &mut LinkContext<'_>) -> StorageResult<()> {
    let mut messages: Vec<String> = Vec::new();
    let has_doctype = document
        .tree
        .root()
        .children()
        .any(|node| node.value().is_doctype());
    if !has_doctype {
        messages.push("missing DOCTYPE declaration".to_string());
    }
    for error in &document.errors {
        if !has_doctype && error.ends_with("in insertion mode Initial") {
            continue;
        }
        messages.push(format!("markup error: {}", error));
    }

    for (reported, message) in messages.iter().enumerate() {
        if reported == MAX_MARKUP_ERRORS {
            ctx.add_pageproblem(&format!(
                "too many markup errors ({}), only the first {} are listed",
                messages.len(),
                MAX_MARKUP_ERRORS
            ))?;
            break;
        }
        ctx.add_pageproblem(message)?;
    }
    Ok(())
}

/// Iterates over the elements matching a CSS selector
fn select<'a>(document: &'a Html, selector: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(selector) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Gets a trimmed, non-empty attribute value
fn attr<'a>(element: &ElementRef<'a>, name: &str) -> Option<&'a str> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn extract(document: &Html, ctx: &mut LinkContext<'_>) -> StorageResult<()> {
    // <title>TITLE</title>
    if let Some(title) = select(document, "title").first() {
        ctx.set_title(&title.text().collect::<String>());
    }

    // <base href="URL">
    let page_url = ctx.url().to_string();
    let base = select(document, "base[href]")
        .first()
        .and_then(|e| attr(e, "href"))
        .map(|href| ctx.resolve(&page_url, href))
        .unwrap_or(page_url);

    let mut children: Vec<&str> = Vec::new();
    let mut embeds: Vec<&str> = Vec::new();

    // <link rel="TYPE" href="URL">
    for element in select(document, "link[rel][href]") {
        let rel = attr(&element, "rel").unwrap_or("").to_ascii_lowercase();
        if EMBEDDING_RELS.contains(&rel.as_str()) {
            embeds.extend(attr(&element, "href"));
        }
    }

    // <meta name="author" content="AUTHOR">
    if let Some(author) = select(document, "meta[name][content]")
        .into_iter()
        .find(|e| attr(e, "name").map_or(false, |n| n.eq_ignore_ascii_case("author")))
    {
        ctx.set_author(attr(&author, "content").unwrap_or(""));
    }

    // <meta http-equiv="refresh" content="0;url=URL">
    let refresh_pattern = Regex::new(r"(?i)^\s*[0-9]+\s*;\s*url\s*=\s*(.*)$").ok();
    for element in select(document, "meta[http-equiv][content]") {
        let is_refresh = attr(&element, "http-equiv")
            .map_or(false, |v| v.eq_ignore_ascii_case("refresh"));
        if !is_refresh {
            continue;
        }
        let target = attr(&element, "content").and_then(|content| {
            refresh_pattern
                .as_ref()?
                .captures(content)?
                .get(1)
                .map(|m| m.as_str().trim_matches(|c| c == '"' || c == '\'' || c == ' '))
        });
        if let Some(target) = target.filter(|t| !t.is_empty()) {
            children.push(target);
        }
    }

    // <img src="URL">
    for element in select(document, "img[src]") {
        embeds.extend(attr(&element, "src"));
    }

    // <a href="URL"> and <map><area href="URL"></map>
    for element in select(document, "a[href], area[href]") {
        children.extend(attr(&element, "href"));
    }

    // <frame src="URL">, <iframe src="URL">, <embed src="URL">, <script src="URL">
    for element in select(document, "frame[src], iframe[src], embed[src], script[src]") {
        embeds.extend(attr(&element, "src"));
    }

    // <object data="URL">
    for element in select(document, "object[data]") {
        embeds.extend(attr(&element, "data"));
    }

    // <param name="movie" value="URL">
    for element in select(document, "param[name][value]") {
        if attr(&element, "name").map_or(false, |n| n.eq_ignore_ascii_case("movie")) {
            embeds.extend(attr(&element, "value"));
        }
    }

    // <applet code="URL" [archive="URL"]>
    for element in select(document, "applet[code]") {
        embeds.extend(attr(&element, "archive").or_else(|| attr(&element, "code")));
    }

    // <body|table|td background="URL">
    for element in select(document, "body[background], table[background], td[background]") {
        embeds.extend(attr(&element, "background"));
    }

    for child in children {
        let url = ctx.resolve(&base, child);
        ctx.add_child(&url)?;
    }
    for embed in embeds {
        let url = ctx.resolve(&base, embed);
        ctx.add_embed(&url)?;
    }

    extract_anchors(document, ctx)?;

    // <style>CSS</style> and <ANY style="CSS">
    for element in select(document, "style") {
        parse_css(&element.text().collect::<String>(), &base, ctx)?;
    }
    for element in select(document, "[style]") {
        if let Some(style) = attr(&element, "style") {
            parse_css(style, &base, ctx)?;
        }
    }

    debug!("Parsed {} as HTML", ctx.url());
    Ok(())
}

fn extract_anchors(document: &Html, ctx: &mut LinkContext<'_>) -> StorageResult<()> {
    // <a name="NAME">
    for element in select(document, "a[name]") {
        let Some(name) = attr(&element, "name") else {
            continue;
        };
        if let Some(id) = attr(&element, "id") {
            if id != name {
                ctx.add_pageproblem("anchors defined in name and id attributes do not match")?;
                ctx.add_anchor(id)?;
            }
        }
        ctx.add_anchor(name)?;
    }

    // <ANY id="ID">, skipping named anchors handled above
    for element in select(document, "[id]") {
        if element.value().name() == "a" && attr(&element, "name").is_some() {
            continue;
        }
        if let Some(id) = attr(&element, "id") {
            ctx.add_anchor(id)?;
        }
    }

    Ok(())
}
