//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the webcheck link graph.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Base URLs the crawl was started from (for resuming)
CREATE TABLE IF NOT EXISTS base_urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE
);

-- One row per distinct normalized URL
CREATE TABLE IF NOT EXISTS links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    is_internal INTEGER,
    yanked TEXT,
    fetched TEXT,
    status TEXT,
    mimetype TEXT,
    encoding TEXT,
    size INTEGER,
    mtime TEXT,
    is_page INTEGER NOT NULL DEFAULT 0,
    title TEXT,
    author TEXT,
    redirectdepth INTEGER NOT NULL DEFAULT 0,
    redirect_chain TEXT NOT NULL DEFAULT '',
    depth INTEGER,
    crawl_depth INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_links_is_internal ON links(is_internal);
CREATE INDEX IF NOT EXISTS idx_links_yanked ON links(yanked);
CREATE INDEX IF NOT EXISTS idx_links_fetched ON links(fetched);
CREATE INDEX IF NOT EXISTS idx_links_depth ON links(depth);

-- Navigational links between pages
CREATE TABLE IF NOT EXISTS children (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    parent_id INTEGER NOT NULL REFERENCES links(id) ON DELETE CASCADE,
    child_id INTEGER NOT NULL REFERENCES links(id) ON DELETE CASCADE,
    UNIQUE(parent_id, child_id)
);

CREATE INDEX IF NOT EXISTS idx_children_parent ON children(parent_id);
CREATE INDEX IF NOT EXISTS idx_children_child ON children(child_id);

-- Resources embedded in pages (images, stylesheets, frames, ...)
CREATE TABLE IF NOT EXISTS embedded (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    parent_id INTEGER NOT NULL REFERENCES links(id) ON DELETE CASCADE,
    child_id INTEGER NOT NULL REFERENCES links(id) ON DELETE CASCADE,
    UNIQUE(parent_id, child_id)
);

CREATE INDEX IF NOT EXISTS idx_embedded_parent ON embedded(parent_id);
CREATE INDEX IF NOT EXISTS idx_embedded_child ON embedded(child_id);

-- Problems retrieving a link
CREATE TABLE IF NOT EXISTS linkproblems (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    link_id INTEGER NOT NULL REFERENCES links(id) ON DELETE CASCADE,
    message TEXT NOT NULL,
    UNIQUE(link_id, message)
);

CREATE INDEX IF NOT EXISTS idx_linkproblems_link ON linkproblems(link_id);

-- Problems found in the content of a page
CREATE TABLE IF NOT EXISTS pageproblems (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    link_id INTEGER NOT NULL REFERENCES links(id) ON DELETE CASCADE,
    message TEXT NOT NULL,
    UNIQUE(link_id, message)
);

CREATE INDEX IF NOT EXISTS idx_pageproblems_link ON pageproblems(link_id);

-- Anchors defined on a page
CREATE TABLE IF NOT EXISTS anchors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    link_id INTEGER NOT NULL REFERENCES links(id) ON DELETE CASCADE,
    anchor TEXT NOT NULL,
    UNIQUE(link_id, anchor)
);

-- Anchors referenced by other pages
CREATE TABLE IF NOT EXISTS reqanchors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    link_id INTEGER NOT NULL REFERENCES links(id) ON DELETE CASCADE,
    parent_id INTEGER NOT NULL REFERENCES links(id) ON DELETE CASCADE,
    anchor TEXT NOT NULL,
    UNIQUE(link_id, parent_id, anchor)
);

CREATE INDEX IF NOT EXISTS idx_reqanchors_link ON reqanchors(link_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
