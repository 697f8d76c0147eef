//! Scheme fetchers
//!
//! A scheme fetcher retrieves a URL for one or more URL schemes and reports
//! what it found as a `FetchResponse` value. Applying the response to the
//! link graph is left to the dispatcher.

mod file;
mod ftp;
mod http;

pub use file::FileFetcher;
pub use ftp::FtpFetcher;
pub use http::{build_http_client, HttpFetcher};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// What to fetch
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    /// URL of the first page that linked here, sent as `Referer`
    pub referer: Option<String>,
}

/// How a fetch ended
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The body, returned because its mimetype was accepted
    Content(Vec<u8>),
    /// Retrieved fine but there is nothing to parse
    NoContent,
    /// A directory listing; every entry becomes a child
    Listing(Vec<String>),
    /// The resource moved to another (possibly relative) URL
    Redirect(String),
    /// The resource could not be retrieved
    Failed(String),
}

/// Metadata and outcome of a fetch
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: Option<String>,
    pub mimetype: Option<String>,
    pub encoding: Option<String>,
    pub size: Option<u64>,
    pub mtime: Option<DateTime<Utc>>,
    /// Link problems to record besides a failure (e.g. a permanent redirect)
    pub problems: Vec<String>,
    pub outcome: FetchOutcome,
}

impl FetchResponse {
    pub fn new(outcome: FetchOutcome) -> Self {
        Self {
            status: None,
            mimetype: None,
            encoding: None,
            size: None,
            mtime: None,
            problems: Vec::new(),
            outcome,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(FetchOutcome::Failed(message.into()))
    }
}

/// Retrieves URLs of particular schemes
#[async_trait]
pub trait SchemeFetcher: Send + Sync {
    /// Lowercase schemes handled by this fetcher
    fn schemes(&self) -> &[&'static str];

    /// Fetches a URL
    ///
    /// Failures are reported through `FetchOutcome::Failed`, never as a
    /// panic or error, so that one bad link does not stop the crawl.
    ///
    /// # Arguments
    ///
    /// * `request` - The URL and request context
    /// * `accepted_mimetypes` - Body is only returned for these mimetypes
    async fn fetch(&self, request: &FetchRequest, accepted_mimetypes: &[String]) -> FetchResponse;
}

/// Strips parameters from a Content-Type value and lowercases it
///
/// Returns the mimetype and the charset parameter if there is one.
pub fn parse_content_type(value: &str) -> (Option<String>, Option<String>) {
    let mut parts = value.split(';');
    let mimetype = parts
        .next()
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty());
    let charset = parts.find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"').to_string())
        } else {
            None
        }
    });
    (mimetype, charset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_type() {
        assert_eq!(
            parse_content_type("text/HTML; charset=\"ISO-8859-1\""),
            (Some("text/html".to_string()), Some("ISO-8859-1".to_string()))
        );
        assert_eq!(
            parse_content_type("image/png"),
            (Some("image/png".to_string()), None)
        );
        assert_eq!(parse_content_type(""), (None, None));
    }

    #[test]
    fn test_failed_response() {
        let response = FetchResponse::failed("404: Not Found");
        assert_eq!(
            response.outcome,
            FetchOutcome::Failed("404: Not Found".to_string())
        );
        assert!(response.problems.is_empty());
    }
}
