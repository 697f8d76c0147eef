//! URL handling module for webcheck
//!
//! This module provides URL normalization, fragment handling, relative
//! reference resolution, network location extraction and regex pattern
//! sets used for link classification.

mod domain;
mod matcher;
mod normalize;

// Re-export main functions
pub use domain::{extract_netloc, extract_scheme, site_location};
pub use matcher::PatternSet;
pub use normalize::normalize_url;

use crate::{UrlError, UrlResult};
use url::Url;

/// Splits a URL into its normalized form and its fragment
///
/// The fragment is taken from the raw URL before normalization removes
/// it. An empty fragment (`page#`) is reported as `None`.
///
/// # Examples
///
/// ```
/// use webcheck::url::split_fragment;
///
/// let (url, fragment) = split_fragment("http://Example.com/x#Frag");
/// assert_eq!(url, "http://example.com/x");
/// assert_eq!(fragment.as_deref(), Some("Frag"));
/// ```
pub fn split_fragment(raw: &str) -> (String, Option<String>) {
    let fragment = raw
        .split_once('#')
        .map(|(_, fragment)| fragment.to_string())
        .filter(|fragment| !fragment.is_empty());
    (normalize_url(raw), fragment)
}

/// Normalizes a URL and removes its fragment
///
/// This is the identity used for every link in the graph.
pub fn clean_url(raw: &str) -> String {
    normalize_url(raw)
}

/// Resolves a (possibly relative) reference against a base URL
///
/// References that cannot be resolved are returned unchanged so that
/// they still end up in the link graph (and get reported).
pub fn resolve_url(base: &str, reference: &str) -> String {
    let reference = reference.trim();
    match Url::parse(base).and_then(|base| base.join(reference)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => reference.to_string(),
    }
}

/// Parses a URL, mapping failures to a `UrlError`
pub fn parse_url(url: &str) -> UrlResult<Url> {
    Url::parse(url).map_err(|e| UrlError::Parse(format!("{}: {}", url, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_fragment() {
        let (url, fragment) = split_fragment("http://example.com/x#frag");
        assert_eq!(url, "http://example.com/x");
        assert_eq!(fragment, Some("frag".to_string()));
    }

    #[test]
    fn test_split_without_fragment() {
        let (url, fragment) = split_fragment("http://example.com/x");
        assert_eq!(url, "http://example.com/x");
        assert_eq!(fragment, None);
    }

    #[test]
    fn test_split_empty_fragment() {
        let (_, fragment) = split_fragment("http://example.com/x#");
        assert_eq!(fragment, None);
    }

    #[test]
    fn test_clean_url_identity() {
        assert_eq!(
            clean_url("HTTP://Example.COM:80#top"),
            clean_url("http://example.com/")
        );
        assert_ne!(
            clean_url("http://example.com/a"),
            clean_url("http://example.com/b")
        );
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(
            resolve_url("http://example.com/dir/page.html", "other.html"),
            "http://example.com/dir/other.html"
        );
        assert_eq!(
            resolve_url("http://example.com/dir/page.html", "/x#frag"),
            "http://example.com/x#frag"
        );
    }

    #[test]
    fn test_resolve_absolute() {
        assert_eq!(
            resolve_url("http://example.com/", "https://other.org/a"),
            "https://other.org/a"
        );
        assert_eq!(
            resolve_url("http://example.com/", "mailto:someone@example.com"),
            "mailto:someone@example.com"
        );
    }

    #[test]
    fn test_resolve_with_unparseable_base() {
        assert_eq!(resolve_url("not a base", "page.html"), "page.html");
    }

    #[test]
    fn test_parse_url_error() {
        assert!(matches!(parse_url("::nope"), Err(UrlError::Parse(_))));
        assert!(parse_url("http://example.com/").is_ok());
    }
}
