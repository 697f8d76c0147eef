//! Storage module for the persistent link graph
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Link records with their classification, fetch and content metadata
//! - Child and embed edges between links
//! - Anchors, requested anchors and problem annotations
//! - Run tracking and resumption support

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::{LinkState, YankReason};
use crate::url::extract_scheme;
use crate::WebcheckError;
use chrono::{DateTime, Utc};

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(WebcheckError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, WebcheckError> {
    Ok(SqliteStorage::new(path)?)
}

/// A link in the graph, one per distinct normalized URL
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: i64,
    pub url: String,

    // classification
    pub is_internal: Option<bool>,
    pub yanked: Option<YankReason>,

    // fetch state
    pub fetched: Option<DateTime<Utc>>,
    pub status: Option<String>,

    // content metadata
    pub mimetype: Option<String>,
    pub encoding: Option<String>,
    pub size: Option<u64>,
    pub mtime: Option<DateTime<Utc>>,
    pub is_page: bool,
    pub title: Option<String>,
    pub author: Option<String>,

    /// Position of this link in a redirect chain (0 = not a redirect)
    pub redirectdepth: u32,
    /// URLs visited by the redirect chain up to and including this link
    pub redirect_chain: Vec<String>,

    /// Breadth-first depth from a base link, assigned after crawling
    pub depth: Option<u32>,
    /// Hop count from a base link at discovery time, bounds the crawl
    pub crawl_depth: u32,
}

impl Link {
    /// Creates an unclassified, unfetched link record
    pub fn new(id: i64, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            is_internal: None,
            yanked: None,
            fetched: None,
            status: None,
            mimetype: None,
            encoding: None,
            size: None,
            mtime: None,
            is_page: false,
            title: None,
            author: None,
            redirectdepth: 0,
            redirect_chain: Vec::new(),
            depth: None,
            crawl_depth: 0,
        }
    }

    /// Returns the derived crawl state of the link
    pub fn state(&self) -> LinkState {
        LinkState::derive(self.fetched.is_some(), self.yanked.is_some())
    }

    /// Returns true only if the link is known to be internal
    pub fn is_internal(&self) -> bool {
        self.is_internal == Some(true)
    }

    pub fn is_redirect(&self) -> bool {
        self.redirectdepth > 0
    }

    /// Returns the lowercase scheme of the URL
    pub fn scheme(&self) -> Option<String> {
        extract_scheme(&self.url)
    }
}

/// An anchor referenced on `link_id` by the page `parent_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedAnchor {
    pub link_id: i64,
    pub parent_id: i64,
    pub anchor: String,
}

/// Kind of directed edge between two links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Child,
    Embed,
}

/// A directed edge from a page to a link it references
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub parent_id: i64,
    pub child_id: i64,
    pub kind: EdgeKind,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
