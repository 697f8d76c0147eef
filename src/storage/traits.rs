//! Storage traits and error types
//!
//! This module defines the trait interface for link graph storage backends
//! and associated error types.

use crate::storage::{Edge, Link, RequestedAnchor, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Link not found: {0}")]
    LinkNotFound(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for link graph storage backends
///
/// This trait defines all database operations needed by the crawler, the
/// postprocessor and the report plugins. Every URL passed in is normalized
/// by the implementation before it is used as an identity.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the effective configuration
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    // ===== Transactions =====

    /// Starts a transaction grouping the changes for one link
    fn begin(&mut self) -> StorageResult<()>;

    /// Commits the current transaction
    fn commit(&mut self) -> StorageResult<()>;

    /// Discards the current transaction
    fn rollback(&mut self) -> StorageResult<()>;

    // ===== Base URLs =====

    /// Remembers a base URL so a resumed crawl can start without one
    fn add_base_url(&mut self, url: &str) -> StorageResult<()>;

    /// Gets the remembered base URLs in the order they were added
    fn base_urls(&self) -> StorageResult<Vec<String>>;

    // ===== Link Management =====

    /// Finds the link for a URL or creates it
    ///
    /// The URL is normalized first, so two URLs that normalize to the same
    /// string always yield the same link.
    fn get_or_create(&mut self, url: &str) -> StorageResult<Link>;

    /// Gets a link by ID
    fn get_link(&self, link_id: i64) -> StorageResult<Link>;

    /// Gets a link by URL (normalized before lookup)
    fn find_link(&self, url: &str) -> StorageResult<Option<Link>>;

    /// Writes the classification, fetch and content fields of a link
    ///
    /// `depth` and `crawl_depth` are maintained by their own operations and
    /// are not written here.
    fn save_link(&mut self, link: &Link) -> StorageResult<()>;

    /// Gets all links ordered by URL
    fn all_links(&self) -> StorageResult<Vec<Link>>;

    /// Gets links that are neither fetched nor yanked, in discovery order
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of links to return
    /// * `max_depth` - When set, only links discovered within this many hops
    ///   from a base link are returned
    fn unfetched_links(&self, limit: usize, max_depth: Option<u32>) -> StorageResult<Vec<Link>>;

    /// Counts links that are neither fetched nor yanked
    fn count_unfetched(&self, max_depth: Option<u32>) -> StorageResult<u64>;

    /// Deletes every link and all derived records
    ///
    /// Run history is kept.
    fn truncate(&mut self) -> StorageResult<()>;

    // ===== Graph Edges =====

    /// Registers `url` as a child of `parent`
    ///
    /// Does nothing (and returns None) if the parent is not internal. A
    /// fragment on the URL is recorded as a requested anchor on the child.
    fn add_child(&mut self, parent: &Link, url: &str) -> StorageResult<Option<Link>>;

    /// Registers `url` as embedded in `parent`
    ///
    /// Same rules as `add_child`.
    fn add_embed(&mut self, parent: &Link, url: &str) -> StorageResult<Option<Link>>;

    /// Gets the children of a link in insertion order
    fn children(&self, link_id: i64) -> StorageResult<Vec<Link>>;

    /// Gets the links embedded in a link in insertion order
    fn embedded(&self, link_id: i64) -> StorageResult<Vec<Link>>;

    /// Gets the distinct links that have a child or embed edge to this link
    fn parents(&self, link_id: i64) -> StorageResult<Vec<Link>>;

    /// Counts distinct parents over both edge kinds
    fn count_parents(&self, link_id: i64) -> StorageResult<u64>;

    /// Gets every edge in the graph, children before embeds, each in
    /// insertion order
    fn edges(&self) -> StorageResult<Vec<Edge>>;

    // ===== Anchors =====

    /// Registers an anchor defined on a page
    ///
    /// Anchors are lowercased. A second definition records a page problem
    /// instead of a second anchor.
    fn add_anchor(&mut self, link: &Link, anchor: &str) -> StorageResult<()>;

    /// Records that `parent` references `#anchor` on `link`
    ///
    /// Idempotent per (parent, anchor) pair.
    fn add_reqanchor(&mut self, link: &Link, parent: &Link, anchor: &str) -> StorageResult<()>;

    /// Gets the anchors defined on a page
    fn anchors(&self, link_id: i64) -> StorageResult<Vec<String>>;

    /// Gets all requested anchors on fetched links
    fn requested_anchors(&self) -> StorageResult<Vec<RequestedAnchor>>;

    // ===== Problems =====

    /// Records a problem retrieving a link
    fn add_linkproblem(&mut self, link_id: i64, message: &str) -> StorageResult<()>;

    /// Records a problem in the content of a page
    ///
    /// Ignored for links that are not internal.
    fn add_pageproblem(&mut self, link: &Link, message: &str) -> StorageResult<()>;

    /// Gets the link problems in the order they were recorded
    fn linkproblems(&self, link_id: i64) -> StorageResult<Vec<String>>;

    /// Gets the page problems in the order they were recorded
    fn pageproblems(&self, link_id: i64) -> StorageResult<Vec<String>>;

    /// Gets links with at least one link problem, ordered by URL
    fn links_with_linkproblems(&self) -> StorageResult<Vec<Link>>;

    /// Gets internal links with at least one page problem, ordered by URL
    fn links_with_pageproblems(&self) -> StorageResult<Vec<Link>>;

    // ===== Depth =====

    /// Clears the breadth-first depth of every link
    fn reset_depths(&mut self) -> StorageResult<()>;

    /// Sets the breadth-first depth of a link
    fn set_depth(&mut self, link_id: i64, depth: u32) -> StorageResult<()>;

    // ===== Statistics =====

    /// Gets total link count
    fn count_links(&self) -> StorageResult<u64>;

    /// Counts internal links
    fn count_internal(&self) -> StorageResult<u64>;

    /// Counts fetched links
    fn count_fetched(&self) -> StorageResult<u64>;

    /// Counts yanked links
    fn count_yanked(&self) -> StorageResult<u64>;

    /// Counts edges of both kinds
    fn count_edges(&self) -> StorageResult<u64>;
}
