use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for webcheck
///
/// Every section is optional in the TOML file; missing values fall back to
/// the defaults documented on each field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Base URLs the crawl starts from
    #[serde(default)]
    pub base: Vec<String>,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub patterns: PatternConfig,

    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

impl Config {
    /// Path of the link graph database inside the output directory
    pub fn database_path(&self) -> PathBuf {
        self.output.directory.join(&self.output.database_name)
    }

    /// The User-Agent header value sent with every request
    pub fn user_agent_string(&self) -> String {
        format!(
            "{}/{}",
            self.user_agent.crawler_name, self.user_agent.crawler_version
        )
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Only URLs below one of the base URLs are internal
    #[serde(rename = "base-urls-only")]
    pub base_urls_only: bool,

    /// Do not fetch external links
    #[serde(rename = "avoid-external")]
    pub avoid_external: bool,

    /// Honor robots.txt for internal http(s) links
    #[serde(rename = "use-robots")]
    pub use_robots: bool,

    /// Maximum number of redirect hops before a chain is cut off
    #[serde(rename = "redirect-depth")]
    pub redirect_depth: u32,

    /// Maximum number of hops from a base link to fetch
    #[serde(rename = "max-depth", skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,

    /// Seconds to wait between two fetches
    pub wait: f64,

    /// Network timeout in seconds
    pub timeout: u64,

    /// Number of unfetched links pulled from the store at a time
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Resume the previous crawl instead of starting fresh
    #[serde(rename = "continue")]
    pub resume: bool,

    /// Ask proxies and caches for fresh copies
    #[serde(rename = "bypass-http-cache")]
    pub bypass_http_cache: bool,

    /// Files that are served in place of a directory listing
    #[serde(rename = "file-indexes")]
    pub file_indexes: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_urls_only: false,
            avoid_external: false,
            use_robots: true,
            redirect_depth: 5,
            max_depth: None,
            wait: 0.0,
            timeout: 10,
            batch_size: 100,
            resume: false,
            bypass_http_cache: false,
            file_indexes: vec!["index.html".to_string(), "index.htm".to_string()],
        }
    }
}

/// Regular expressions used for link classification
///
/// Patterns are matched case-insensitively anywhere in the URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// URLs matching any of these are always internal
    pub internal: Vec<String>,

    /// URLs matching any of these are external unless matched by `internal`
    pub external: Vec<String>,

    /// URLs matching any of these are never fetched
    pub yank: Vec<String>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "webcheck".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the database and the generated reports
    pub directory: PathBuf,

    /// Overwrite report files instead of keeping a `~` backup
    pub overwrite: bool,

    /// File name of the link graph database
    #[serde(rename = "database-name")]
    pub database_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            overwrite: false,
            database_name: "webcheck.sqlite".to_string(),
        }
    }
}

/// Report generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Report plugins in the order they appear in the navigation bar
    pub plugins: Vec<String>,

    /// How deep the sitemap is rendered
    #[serde(rename = "sitemap-level")]
    pub sitemap_level: u32,

    /// Pages older than this many days are listed as old
    #[serde(rename = "whatsold-age")]
    pub whatsold_age: u32,

    /// Pages younger than this many days are listed as new
    #[serde(rename = "whatsnew-age")]
    pub whatsnew_age: u32,

    /// Pages bigger than this many KiB (embeds included) are listed as slow
    #[serde(rename = "slow-url-size")]
    pub slow_url_size: u64,

    /// Open links to the checked site in a new browser window
    #[serde(rename = "links-in-new-window")]
    pub links_in_new_window: bool,

    /// Maximum number of parents listed for a link before collapsing
    #[serde(rename = "parent-list-length")]
    pub parent_list_length: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            plugins: crate::output::REPORT_NAMES
                .iter()
                .map(|name| name.to_string())
                .collect(),
            sitemap_level: 8,
            whatsold_age: 700,
            whatsnew_age: 7,
            slow_url_size: 76,
            links_in_new_window: false,
            parent_list_length: 10,
        }
    }
}
