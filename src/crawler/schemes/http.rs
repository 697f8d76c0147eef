//! HTTP and HTTPS fetcher
//!
//! Redirects are never followed by the client: every hop is a link of its
//! own in the graph so redirect chains can be checked.

use crate::config::Config;
use crate::crawler::schemes::{
    parse_content_type, FetchOutcome, FetchRequest, FetchResponse, SchemeFetcher,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{
    HeaderMap, HeaderValue, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED,
    LOCATION, PRAGMA, REFERER,
};
use reqwest::{redirect::Policy, Client, Response};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The effective configuration (user agent, timeout, caching)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    if config.crawler.bypass_http_cache {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    }

    Client::builder()
        .user_agent(config.user_agent_string())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.crawler.timeout))
        .connect_timeout(Duration::from_secs(config.crawler.timeout))
        .redirect(Policy::none()) // Handle redirects manually
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches `http` and `https` URLs
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn send(&self, request: &FetchRequest) -> Result<Response, reqwest::Error> {
        let mut url = match Url::parse(&request.url) {
            Ok(url) => url,
            // let the client report the malformed URL
            Err(_) => return self.client.get(request.url.as_str()).send().await,
        };

        let credentials = take_credentials(&mut url);
        let mut builder = self.client.get(url);
        if let Some((username, password)) = credentials {
            builder = builder.basic_auth(username, password);
        }
        if let Some(referer) = &request.referer {
            builder = builder.header(REFERER, referer.as_str());
        }
        builder.send().await
    }
}

/// Moves credentials out of the URL so they can go into a basic
/// authentication header
fn take_credentials(url: &mut Url) -> Option<(String, Option<String>)> {
    if url.username().is_empty() && url.password().is_none() {
        return None;
    }
    let username = url.username().to_string();
    let password = url.password().map(String::from);
    // only URLs without a host reject this, and those carry no credentials
    if url.set_username("").is_err() || url.set_password(None).is_err() {
        debug!("Cannot remove credentials from {}", url);
        return None;
    }
    Some((username, password))
}

fn header_str<'a>(response: &'a Response, name: reqwest::header::HeaderName) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Parses an HTTP date such as `Sun, 06 Nov 1994 08:49:37 GMT`
fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[async_trait]
impl SchemeFetcher for HttpFetcher {
    fn schemes(&self) -> &[&'static str] {
        &["http", "https"]
    }

    async fn fetch(&self, request: &FetchRequest, accepted_mimetypes: &[String]) -> FetchResponse {
        let response = match self.send(request).await {
            Ok(response) => response,
            Err(e) => return FetchResponse::failed(format!("error reading HTTP response: {}", e)),
        };

        let status = response.status();
        debug!("HTTP response for {}: {}", request.url, status);

        let mut result = FetchResponse::new(FetchOutcome::NoContent);
        result.status = Some(status.as_u16().to_string());
        if let Some(content_type) = header_str(&response, CONTENT_TYPE) {
            let (mimetype, charset) = parse_content_type(content_type);
            result.mimetype = mimetype;
            result.encoding = charset;
        }
        result.size = header_str(&response, CONTENT_LENGTH).and_then(|v| v.trim().parse().ok());
        result.mtime = header_str(&response, LAST_MODIFIED).and_then(parse_http_date);

        let reason = status.canonical_reason().unwrap_or("");
        match status.as_u16() {
            301 | 302 | 303 | 307 | 308 => {
                // a permanent redirect means the referring page is outdated
                if status.as_u16() == 301 {
                    result.problems.push(format!("{}: {}", status.as_u16(), reason));
                }
                let location = header_str(&response, LOCATION).unwrap_or("").to_string();
                result.outcome = FetchOutcome::Redirect(location);
            }
            _ if status.is_success() => {
                let accepted = result
                    .mimetype
                    .as_ref()
                    .map_or(false, |m| accepted_mimetypes.contains(m));
                if accepted {
                    match response.bytes().await {
                        Ok(body) => {
                            result.size.get_or_insert(body.len() as u64);
                            result.outcome = FetchOutcome::Content(body.to_vec());
                        }
                        Err(e) => {
                            result.outcome = FetchOutcome::Failed(format!(
                                "error reading HTTP response: {}",
                                e
                            ))
                        }
                    }
                }
            }
            code => {
                result.outcome = FetchOutcome::Failed(format!("{}: {}", code, reason));
            }
        }

        result
    }
}
