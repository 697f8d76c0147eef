//! Configuration module for webcheck
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use webcheck::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("webcheck.toml")).unwrap();
//! println!("Crawler will follow {} redirects", config.crawler.redirect_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, PatternConfig, ReportConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, parse_config};
pub use validation::validate;
