//! Robots.txt rule matching
//!
//! Rules are matched with the robotstxt crate, a port of Google's reference
//! matcher.

use robotstxt::DefaultMatcher;

/// A robots.txt document for one site
///
/// A site without a usable robots.txt is represented by `allow_all()`.
#[derive(Debug, Clone, Default)]
pub struct ParsedRobots {
    /// Raw robots.txt body, `None` when everything is allowed
    body: Option<String>,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    ///
    /// # Arguments
    ///
    /// * `content` - The raw robots.txt file content
    pub fn from_content(content: &str) -> Self {
        if content.trim().is_empty() {
            return Self::allow_all();
        }
        Self {
            body: Some(content.to_string()),
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// This is used when robots.txt cannot be fetched.
    pub fn allow_all() -> Self {
        Self { body: None }
    }

    /// Returns true if this document places no restrictions at all
    pub fn allows_everything(&self) -> bool {
        self.body.is_none()
    }

    /// Checks if a URL may be fetched by the given agent
    ///
    /// # Arguments
    ///
    /// * `url` - The absolute URL (or bare path) to check
    /// * `user_agent` - The product token of the crawler, e.g. `webcheck`
    ///
    /// # Returns
    ///
    /// * `true` - If the URL is allowed
    /// * `false` - If the URL is disallowed
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        match &self.body {
            None => true,
            Some(body) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(body, user_agent, url)
            }
        }
    }
}
