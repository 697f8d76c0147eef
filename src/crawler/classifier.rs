//! Link classification
//!
//! Decides for a URL whether it belongs to the checked site and whether it
//! may be fetched at all.

use crate::config::Config;
use crate::robots::RobotsCache;
use crate::state::YankReason;
use crate::url::{clean_url, extract_netloc, extract_scheme, PatternSet};
use crate::ConfigError;
use reqwest::Client;
use tracing::debug;

/// Outcome of classifying a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_internal: bool,
    pub yanked: Option<YankReason>,
}

/// Classifies URLs as internal, external or yanked
pub struct Classifier {
    base_urls: Vec<String>,
    base_netlocs: Vec<String>,
    base_urls_only: bool,
    avoid_external: bool,
    internal: PatternSet,
    external: PatternSet,
    yank: PatternSet,
    robots: Option<RobotsCache>,
}

impl Classifier {
    /// Creates a classifier from the configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The effective configuration (patterns and crawler flags)
    /// * `client` - Client used for robots.txt; robots checking is disabled
    ///   when this is `None` or `use-robots` is off
    ///
    /// # Returns
    ///
    /// * `Ok(Classifier)` - All patterns compiled
    /// * `Err(ConfigError::InvalidPattern)` - A pattern failed to compile
    pub fn new(config: &Config, client: Option<Client>) -> Result<Self, ConfigError> {
        let robots = match client {
            Some(client) if config.crawler.use_robots => Some(RobotsCache::new(
                client,
                config.user_agent.crawler_name.clone(),
            )),
            _ => None,
        };

        let mut classifier = Self {
            base_urls: Vec::new(),
            base_netlocs: Vec::new(),
            base_urls_only: config.crawler.base_urls_only,
            avoid_external: config.crawler.avoid_external,
            internal: PatternSet::new(&config.patterns.internal)?,
            external: PatternSet::new(&config.patterns.external)?,
            yank: PatternSet::new(&config.patterns.yank)?,
            robots,
        };

        for url in &config.base {
            classifier.add_base(url);
        }

        Ok(classifier)
    }

    /// Adds a base URL that defines what is internal
    pub fn add_base(&mut self, url: &str) {
        let url = clean_url(url);
        if self.base_urls.contains(&url) {
            return;
        }
        if let Some(netloc) = site_key(&url) {
            if !self.base_netlocs.contains(&netloc) {
                self.base_netlocs.push(netloc);
            }
        }
        self.base_urls.push(url);
    }

    pub fn base_urls(&self) -> &[String] {
        &self.base_urls
    }

    /// Returns true if the URL belongs to the checked site
    ///
    /// An internal pattern match always wins. Otherwise the URL must start
    /// with a base URL (in base-urls-only mode) or share a network location
    /// with one, and must not match an external pattern.
    pub fn is_internal(&self, url: &str) -> bool {
        if self.internal.matches(url) {
            return true;
        }

        let internal = if self.base_urls_only {
            self.base_urls.iter().any(|base| url.starts_with(base.as_str()))
        } else {
            site_key(url).map_or(false, |netloc| self.base_netlocs.contains(&netloc))
        };

        internal && !self.external.matches(url)
    }

    /// Classifies a URL
    ///
    /// The yank reasons are checked in order: yank pattern, avoided
    /// external link, then robots.txt for internal http(s) links.
    pub async fn classify(&mut self, url: &str) -> Classification {
        let is_internal = self.is_internal(url);

        let yanked = if self.yank.matches(url) {
            Some(YankReason::Yanked)
        } else if !is_internal && self.avoid_external {
            Some(YankReason::ExternalAvoided)
        } else if is_internal && self.robot_restricted(url).await {
            Some(YankReason::RobotRestricted)
        } else {
            None
        };

        debug!(
            "Classified {}: internal={}, yanked={:?}",
            url, is_internal, yanked
        );

        Classification {
            is_internal,
            yanked,
        }
    }

    async fn robot_restricted(&mut self, url: &str) -> bool {
        let Some(robots) = self.robots.as_mut() else {
            return false;
        };
        match extract_scheme(url).as_deref() {
            Some("http") | Some("https") => !robots.is_allowed(url).await,
            _ => false,
        }
    }
}

/// Network location that identifies the site of a URL; all local files
/// form one site
fn site_key(url: &str) -> Option<String> {
    match extract_scheme(url).as_deref() {
        Some("file") => Some("file://".to_string()),
        _ => extract_netloc(url),
    }
}
