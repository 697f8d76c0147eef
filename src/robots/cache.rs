//! Per-crawl robots.txt cache
//!
//! Each site (scheme and network location) has its robots.txt retrieved at
//! most once per crawl. The cache is owned by the classifier of one crawl,
//! there is no process-wide state.

use crate::robots::{fetch_robots, ParsedRobots};
use crate::url::site_location;
use reqwest::Client;
use std::collections::HashMap;
use tracing::debug;

/// Robots.txt documents keyed by site location (`scheme://netloc`)
pub struct RobotsCache {
    client: Client,
    user_agent: String,
    entries: HashMap<String, ParsedRobots>,
}

impl RobotsCache {
    /// Creates an empty cache
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used to retrieve robots.txt files
    /// * `user_agent` - Product token matched against `User-agent` lines
    pub fn new(client: Client, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            entries: HashMap::new(),
        }
    }

    /// Checks whether robots.txt of the URL's site allows fetching it
    ///
    /// The first check for a site retrieves its robots.txt. A missing or
    /// unreachable robots.txt allows everything.
    pub async fn is_allowed(&mut self, url: &str) -> bool {
        let Some(site) = site_location(url) else {
            return true;
        };

        if !self.entries.contains_key(&site) {
            let robots = match fetch_robots(&self.client, &site).await {
                Ok(robots) => robots,
                Err(e) => {
                    debug!("Could not retrieve robots.txt for {}: {}", site, e);
                    ParsedRobots::allow_all()
                }
            };
            self.entries.insert(site.clone(), robots);
        }

        self.entries
            .get(&site)
            .map_or(true, |robots| robots.is_allowed(url, &self.user_agent))
    }

    /// Inserts a document for a site, replacing any cached one
    pub fn insert(&mut self, site: impl Into<String>, robots: ParsedRobots) {
        self.entries.insert(site.into(), robots);
    }

    /// Number of sites with a cached document
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
