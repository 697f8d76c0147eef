//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching
//! robots.txt files. Only internal http(s) links are checked against them.

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::ParsedRobots;

use crate::WebcheckError;
use reqwest::Client;

/// Fetches robots.txt for a site
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `site` - The site location, e.g. `https://example.com:8443`
///
/// # Returns
///
/// * `Ok(ParsedRobots)` - The site's rules, or allow-all when the server
///   does not answer with a success status
/// * `Err(WebcheckError)` - The request itself failed
pub async fn fetch_robots(client: &Client, site: &str) -> Result<ParsedRobots, WebcheckError> {
    let url = format!("{}/robots.txt", site.trim_end_matches('/'));
    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        return Ok(ParsedRobots::allow_all());
    }

    let body = response.text().await?;
    Ok(ParsedRobots::from_content(&body))
}
