//! Crawler module for checking a site
//!
//! This module contains the core crawling logic, including:
//! - Classifying links as internal, external or yanked
//! - Fetching links per URL scheme and parsing their content
//! - Tracking redirect chains
//! - Computing breadth-first depths over the finished graph
//! - Overall crawl coordination

mod classifier;
mod context;
mod coordinator;
mod dispatcher;
pub mod parsers;
mod postprocess;
mod redirect;
pub mod schemes;

pub use classifier::{Classification, Classifier};
pub use context::LinkContext;
pub use coordinator::Crawler;
pub use dispatcher::FetchDispatcher;
pub use postprocess::{assign_depths, find_bases, LinkGraph};
pub use redirect::{follow_link, redirect};
pub use schemes::build_http_client;
