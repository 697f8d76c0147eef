//! Output module for reports on the crawled site
//!
//! This module handles:
//! - Running the report plugins over the finished link graph
//! - Writing the HTML report pages and their stylesheet
//! - Printing link statistics from an existing store

mod registry;
pub mod reports;
pub mod stats;
mod traits;
mod writer;

pub use registry::ReportRegistry;
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
pub use traits::{Report, ReportError, ReportResult, Site};
pub use writer::{format_size, link_info, link_title, NavEntry, ReportWriter, STYLESHEET_FILE};

/// Names of the report plugins run by default, in order
pub const REPORT_NAMES: &[&str] = &[
    "anchors", "sitemap", "urllist", "images", "external", "notchkd", "badlinks", "old", "new",
    "size", "notitles", "problems", "about",
];

/// Report plugins that only run when configured
pub const OPTIONAL_REPORT_NAMES: &[&str] = &["csvfile"];
