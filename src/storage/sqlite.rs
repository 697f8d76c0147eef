//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::YankReason;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{Edge, EdgeKind, Link, RequestedAnchor, RunRecord, RunStatus};
use crate::url::{clean_url, split_fragment};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// Columns of the links table, in the order `row_to_link` expects them
const LINK_FIELDS: &[&str] = &[
    "id",
    "url",
    "is_internal",
    "yanked",
    "fetched",
    "status",
    "mimetype",
    "encoding",
    "size",
    "mtime",
    "is_page",
    "title",
    "author",
    "redirectdepth",
    "redirect_chain",
    "depth",
    "crawl_depth",
];

/// Builds the select list for link rows, optionally qualified by a table alias
fn link_columns(alias: &str) -> String {
    LINK_FIELDS
        .iter()
        .map(|field| {
            if alias.is_empty() {
                field.to_string()
            } else {
                format!("{}.{}", alias, field)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|t| t.with_timezone(&Utc))
}

fn row_to_link(row: &Row<'_>) -> rusqlite::Result<Link> {
    let yanked: Option<String> = row.get(3)?;
    let size: Option<i64> = row.get(8)?;
    let chain: String = row.get(14)?;
    Ok(Link {
        id: row.get(0)?,
        url: row.get(1)?,
        is_internal: row.get(2)?,
        yanked: yanked.map(|s| YankReason::from_db_string(&s).unwrap_or(YankReason::Yanked)),
        fetched: parse_timestamp(row.get(4)?),
        status: row.get(5)?,
        mimetype: row.get(6)?,
        encoding: row.get(7)?,
        size: size.map(|s| s.max(0) as u64),
        mtime: parse_timestamp(row.get(9)?),
        is_page: row.get(10)?,
        title: row.get(11)?,
        author: row.get(12)?,
        redirectdepth: row.get(13)?,
        redirect_chain: chain
            .lines()
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect(),
        depth: row.get(15)?,
        crawl_depth: row.get(16)?,
    })
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
    })
}

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing and dry runs)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Inserts a link if it does not exist yet and lowers its discovery
    /// depth to `crawl_depth` when that is shorter
    fn insert_at_depth(&mut self, url: &str, crawl_depth: u32) -> StorageResult<Link> {
        self.conn.execute(
            "INSERT OR IGNORE INTO links (url, crawl_depth) VALUES (?1, ?2)",
            params![url, crawl_depth],
        )?;
        self.conn.execute(
            "UPDATE links SET crawl_depth = MIN(crawl_depth, ?2) WHERE url = ?1",
            params![url, crawl_depth],
        )?;
        self.find_link(url)?
            .ok_or_else(|| StorageError::LinkNotFound(url.to_string()))
    }

    fn add_edge(&mut self, kind: EdgeKind, parent: &Link, url: &str) -> StorageResult<Option<Link>> {
        // the crawl graph stops expanding at the external boundary
        if !parent.is_internal() {
            return Ok(None);
        }

        let (url, fragment) = split_fragment(url);
        let child = self.insert_at_depth(&url, parent.crawl_depth.saturating_add(1))?;

        let sql = match kind {
            EdgeKind::Child => "INSERT OR IGNORE INTO children (parent_id, child_id) VALUES (?1, ?2)",
            EdgeKind::Embed => "INSERT OR IGNORE INTO embedded (parent_id, child_id) VALUES (?1, ?2)",
        };
        self.conn.execute(sql, params![parent.id, child.id])?;

        if let Some(fragment) = fragment {
            self.add_reqanchor(&child, parent, &fragment)?;
        }

        Ok(Some(child))
    }

    fn query_links<P: rusqlite::Params>(&self, sql: &str, params: P) -> StorageResult<Vec<Link>> {
        let mut stmt = self.conn.prepare(sql)?;
        let links = stmt
            .query_map(params, row_to_link)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(links)
    }

    fn query_strings<P: rusqlite::Params>(&self, sql: &str, params: P) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let values = stmt
            .query_map(params, |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(values)
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                row_to_run,
            )
            .optional()?;
        Ok(run)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), Utc::now().to_rfc3339(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        self.update_run_status(run_id, RunStatus::Completed)
    }

    // ===== Transactions =====

    fn begin(&mut self) -> StorageResult<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    // ===== Base URLs =====

    fn add_base_url(&mut self, url: &str) -> StorageResult<()> {
        let url = clean_url(url);
        self.conn
            .execute("INSERT OR IGNORE INTO base_urls (url) VALUES (?1)", params![url])?;
        self.insert_at_depth(&url, 0)?;
        Ok(())
    }

    fn base_urls(&self) -> StorageResult<Vec<String>> {
        self.query_strings("SELECT url FROM base_urls ORDER BY id", [])
    }

    // ===== Link Management =====

    fn get_or_create(&mut self, url: &str) -> StorageResult<Link> {
        let url = clean_url(url);
        self.conn
            .execute("INSERT OR IGNORE INTO links (url) VALUES (?1)", params![url])?;
        self.find_link(&url)?
            .ok_or(StorageError::LinkNotFound(url))
    }

    fn get_link(&self, link_id: i64) -> StorageResult<Link> {
        let sql = format!("SELECT {} FROM links WHERE id = ?1", link_columns(""));
        self.conn
            .query_row(&sql, params![link_id], row_to_link)
            .optional()?
            .ok_or_else(|| StorageError::LinkNotFound(format!("Link ID {}", link_id)))
    }

    fn find_link(&self, url: &str) -> StorageResult<Option<Link>> {
        let sql = format!("SELECT {} FROM links WHERE url = ?1", link_columns(""));
        let link = self
            .conn
            .query_row(&sql, params![clean_url(url)], row_to_link)
            .optional()?;
        Ok(link)
    }

    fn save_link(&mut self, link: &Link) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE links SET is_internal = ?1, yanked = ?2, fetched = ?3, status = ?4,
             mimetype = ?5, encoding = ?6, size = ?7, mtime = ?8, is_page = ?9, title = ?10,
             author = ?11, redirectdepth = ?12, redirect_chain = ?13
             WHERE id = ?14",
            params![
                link.is_internal,
                link.yanked.as_ref().map(|y| y.to_db_string()),
                link.fetched.map(|t| t.to_rfc3339()),
                link.status,
                link.mimetype,
                link.encoding,
                link.size.map(|s| s as i64),
                link.mtime.map(|t| t.to_rfc3339()),
                link.is_page,
                link.title,
                link.author,
                link.redirectdepth,
                link.redirect_chain.join("\n"),
                link.id,
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::LinkNotFound(link.url.clone()));
        }
        Ok(())
    }

    fn all_links(&self) -> StorageResult<Vec<Link>> {
        let sql = format!("SELECT {} FROM links ORDER BY url", link_columns(""));
        self.query_links(&sql, [])
    }

    fn unfetched_links(&self, limit: usize, max_depth: Option<u32>) -> StorageResult<Vec<Link>> {
        let sql = format!(
            "SELECT {} FROM links
             WHERE fetched IS NULL AND yanked IS NULL
               AND (?1 IS NULL OR crawl_depth <= ?1)
             ORDER BY id LIMIT ?2",
            link_columns("")
        );
        self.query_links(&sql, params![max_depth, limit as i64])
    }

    fn count_unfetched(&self, max_depth: Option<u32>) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM links
             WHERE fetched IS NULL AND yanked IS NULL
               AND (?1 IS NULL OR crawl_depth <= ?1)",
            params![max_depth],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn truncate(&mut self) -> StorageResult<()> {
        self.conn.execute_batch(
            "
            DELETE FROM linkproblems;
            DELETE FROM pageproblems;
            DELETE FROM anchors;
            DELETE FROM reqanchors;
            DELETE FROM children;
            DELETE FROM embedded;
            DELETE FROM links;
            DELETE FROM base_urls;
        ",
        )?;
        Ok(())
    }

    // ===== Graph Edges =====

    fn add_child(&mut self, parent: &Link, url: &str) -> StorageResult<Option<Link>> {
        self.add_edge(EdgeKind::Child, parent, url)
    }

    fn add_embed(&mut self, parent: &Link, url: &str) -> StorageResult<Option<Link>> {
        self.add_edge(EdgeKind::Embed, parent, url)
    }

    fn children(&self, link_id: i64) -> StorageResult<Vec<Link>> {
        let sql = format!(
            "SELECT {} FROM children c JOIN links l ON l.id = c.child_id
             WHERE c.parent_id = ?1 ORDER BY c.id",
            link_columns("l")
        );
        self.query_links(&sql, params![link_id])
    }

    fn embedded(&self, link_id: i64) -> StorageResult<Vec<Link>> {
        let sql = format!(
            "SELECT {} FROM embedded e JOIN links l ON l.id = e.child_id
             WHERE e.parent_id = ?1 ORDER BY e.id",
            link_columns("l")
        );
        self.query_links(&sql, params![link_id])
    }

    fn parents(&self, link_id: i64) -> StorageResult<Vec<Link>> {
        let sql = format!(
            "SELECT {} FROM links WHERE id IN (
                SELECT parent_id FROM children WHERE child_id = ?1
                UNION
                SELECT parent_id FROM embedded WHERE child_id = ?1
             ) ORDER BY id",
            link_columns("")
        );
        self.query_links(&sql, params![link_id])
    }

    fn count_parents(&self, link_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM (
                SELECT parent_id FROM children WHERE child_id = ?1
                UNION
                SELECT parent_id FROM embedded WHERE child_id = ?1
             )",
            params![link_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn edges(&self) -> StorageResult<Vec<Edge>> {
        let mut edges = Vec::new();
        for (table, kind) in [("children", EdgeKind::Child), ("embedded", EdgeKind::Embed)] {
            let mut stmt = self
                .conn
                .prepare(&format!("SELECT parent_id, child_id FROM {} ORDER BY id", table))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(Edge {
                        parent_id: row.get(0)?,
                        child_id: row.get(1)?,
                        kind,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            edges.extend(rows);
        }
        Ok(edges)
    }

    // ===== Anchors =====

    fn add_anchor(&mut self, link: &Link, anchor: &str) -> StorageResult<()> {
        let anchor = anchor.to_lowercase();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO anchors (link_id, anchor) VALUES (?1, ?2)",
            params![link.id, anchor],
        )?;
        if inserted == 0 {
            self.add_pageproblem(
                link,
                &format!("anchor/id \"{}\" defined multiple times", anchor),
            )?;
        }
        Ok(())
    }

    fn add_reqanchor(&mut self, link: &Link, parent: &Link, anchor: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO reqanchors (link_id, parent_id, anchor) VALUES (?1, ?2, ?3)",
            params![link.id, parent.id, anchor.to_lowercase()],
        )?;
        Ok(())
    }

    fn anchors(&self, link_id: i64) -> StorageResult<Vec<String>> {
        self.query_strings(
            "SELECT anchor FROM anchors WHERE link_id = ?1 ORDER BY id",
            params![link_id],
        )
    }

    fn requested_anchors(&self) -> StorageResult<Vec<RequestedAnchor>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.link_id, r.parent_id, r.anchor FROM reqanchors r
             JOIN links l ON l.id = r.link_id
             WHERE l.fetched IS NOT NULL
             ORDER BY r.id",
        )?;
        let anchors = stmt
            .query_map([], |row| {
                Ok(RequestedAnchor {
                    link_id: row.get(0)?,
                    parent_id: row.get(1)?,
                    anchor: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(anchors)
    }

    // ===== Problems =====

    fn add_linkproblem(&mut self, link_id: i64, message: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO linkproblems (link_id, message) VALUES (?1, ?2)",
            params![link_id, message],
        )?;
        Ok(())
    }

    fn add_pageproblem(&mut self, link: &Link, message: &str) -> StorageResult<()> {
        // only think about problems on internal pages
        if !link.is_internal() {
            return Ok(());
        }
        self.conn.execute(
            "INSERT OR IGNORE INTO pageproblems (link_id, message) VALUES (?1, ?2)",
            params![link.id, message],
        )?;
        Ok(())
    }

    fn linkproblems(&self, link_id: i64) -> StorageResult<Vec<String>> {
        self.query_strings(
            "SELECT message FROM linkproblems WHERE link_id = ?1 ORDER BY id",
            params![link_id],
        )
    }

    fn pageproblems(&self, link_id: i64) -> StorageResult<Vec<String>> {
        self.query_strings(
            "SELECT message FROM pageproblems WHERE link_id = ?1 ORDER BY id",
            params![link_id],
        )
    }

    fn links_with_linkproblems(&self) -> StorageResult<Vec<Link>> {
        let sql = format!(
            "SELECT {} FROM links WHERE id IN (SELECT link_id FROM linkproblems) ORDER BY url",
            link_columns("")
        );
        self.query_links(&sql, [])
    }

    fn links_with_pageproblems(&self) -> StorageResult<Vec<Link>> {
        let sql = format!(
            "SELECT {} FROM links
             WHERE is_internal = 1 AND id IN (SELECT link_id FROM pageproblems)
             ORDER BY url",
            link_columns("")
        );
        self.query_links(&sql, [])
    }

    // ===== Depth =====

    fn reset_depths(&mut self) -> StorageResult<()> {
        self.conn.execute("UPDATE links SET depth = NULL", [])?;
        Ok(())
    }

    fn set_depth(&mut self, link_id: i64, depth: u32) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE links SET depth = ?1 WHERE id = ?2",
            params![depth, link_id],
        )?;
        Ok(())
    }

    // ===== Statistics =====

    fn count_links(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM links")
    }

    fn count_internal(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM links WHERE is_internal = 1")
    }

    fn count_fetched(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM links WHERE fetched IS NOT NULL")
    }

    fn count_yanked(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM links WHERE yanked IS NOT NULL")
    }

    fn count_edges(&self) -> StorageResult<u64> {
        self.count("SELECT (SELECT COUNT(*) FROM children) + (SELECT COUNT(*) FROM embedded)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn internal_link(storage: &mut SqliteStorage, url: &str) -> Link {
        let mut link = storage.get_or_create(url).unwrap();
        link.is_internal = Some(true);
        storage.save_link(&link).unwrap();
        link
    }

    #[test]
    fn test_create_in_memory() {
        let storage = SqliteStorage::new_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_create_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash").unwrap();
        assert!(run_id > 0);

        let latest = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(latest.id, run_id);
        assert_eq!(latest.status, RunStatus::Running);

        storage.complete_run(run_id).unwrap();
        let latest = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(latest.status, RunStatus::Completed);
        assert!(latest.finished_at.is_some());
    }

    #[test]
    fn test_get_or_create_normalizes() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let a = storage.get_or_create("http://EXAMPLE.com:80").unwrap();
        let b = storage.get_or_create("http://example.com/#top").unwrap();
        let c = storage.get_or_create("http://example.com/other").unwrap();

        assert_eq!(a.id, b.id);
        assert_eq!(a.url, "http://example.com/");
        assert_ne!(a.id, c.id);
        assert_eq!(storage.count_links().unwrap(), 2);
    }

    #[test]
    fn test_new_link_fields_are_empty() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let link = storage.get_or_create("http://example.com/").unwrap();
        assert_eq!(link.is_internal, None);
        assert_eq!(link.yanked, None);
        assert_eq!(link.fetched, None);
        assert_eq!(link.depth, None);
        assert!(!link.is_page);
    }

    #[test]
    fn test_save_link_roundtrip() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut link = storage.get_or_create("http://example.com/page").unwrap();
        link.is_internal = Some(true);
        link.fetched = Some(Utc::now());
        link.status = Some("200".to_string());
        link.mimetype = Some("text/html".to_string());
        link.size = Some(1234);
        link.is_page = true;
        link.title = Some("A page".to_string());
        link.redirectdepth = 2;
        link.redirect_chain = vec!["http://a/".to_string(), "http://b/".to_string()];
        storage.save_link(&link).unwrap();

        let loaded = storage.get_link(link.id).unwrap();
        assert_eq!(loaded.is_internal, Some(true));
        assert!(loaded.fetched.is_some());
        assert_eq!(loaded.status.as_deref(), Some("200"));
        assert_eq!(loaded.size, Some(1234));
        assert!(loaded.is_page);
        assert_eq!(loaded.title.as_deref(), Some("A page"));
        assert_eq!(loaded.redirectdepth, 2);
        assert_eq!(loaded.redirect_chain, link.redirect_chain);
    }

    #[test]
    fn test_yanked_reason_persisted() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut link = storage.get_or_create("ftp://example.com/file").unwrap();
        link.yanked = Some(YankReason::UnsupportedScheme("ftp".to_string()));
        storage.save_link(&link).unwrap();

        let loaded = storage.get_link(link.id).unwrap();
        assert_eq!(
            loaded.yanked,
            Some(YankReason::UnsupportedScheme("ftp".to_string()))
        );
    }

    #[test]
    fn test_add_child_records_edge_and_reqanchor() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let parent = internal_link(&mut storage, "http://example.com/");

        let child = storage
            .add_child(&parent, "http://example.com/x#Frag")
            .unwrap()
            .unwrap();

        assert_eq!(child.url, "http://example.com/x");
        assert_eq!(child.crawl_depth, 1);
        assert_eq!(storage.children(parent.id).unwrap(), vec![child.clone()]);
        assert_eq!(storage.parents(child.id).unwrap()[0].id, parent.id);

        // the referenced anchor only shows up once the child is fetched
        assert!(storage.requested_anchors().unwrap().is_empty());
        let mut fetched = child.clone();
        fetched.fetched = Some(Utc::now());
        storage.save_link(&fetched).unwrap();

        let requested = storage.requested_anchors().unwrap();
        assert_eq!(
            requested,
            vec![RequestedAnchor {
                link_id: child.id,
                parent_id: parent.id,
                anchor: "frag".to_string(),
            }]
        );
    }

    #[test]
    fn test_add_child_ignored_for_external_parent() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut parent = storage.get_or_create("http://other.org/").unwrap();
        parent.is_internal = Some(false);
        storage.save_link(&parent).unwrap();

        let child = storage.add_child(&parent, "http://other.org/x").unwrap();
        assert!(child.is_none());
        assert_eq!(storage.count_links().unwrap(), 1);
        assert_eq!(storage.count_edges().unwrap(), 0);
    }

    #[test]
    fn test_edges_are_sets() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let parent = internal_link(&mut storage, "http://example.com/");
        storage.add_child(&parent, "http://example.com/a").unwrap();
        storage.add_child(&parent, "http://example.com/a#b").unwrap();
        storage.add_child(&parent, "http://example.com/b").unwrap();
        storage.add_embed(&parent, "http://example.com/img.png").unwrap();
        storage.add_embed(&parent, "http://example.com/img.png").unwrap();

        assert_eq!(storage.children(parent.id).unwrap().len(), 2);
        assert_eq!(storage.embedded(parent.id).unwrap().len(), 1);
        assert_eq!(storage.count_edges().unwrap(), 3);

        let edges = storage.edges().unwrap();
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[0].kind, EdgeKind::Child);
        assert_eq!(edges[2].kind, EdgeKind::Embed);
    }

    #[test]
    fn test_count_parents_is_distinct() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let a = internal_link(&mut storage, "http://example.com/a");
        let b = internal_link(&mut storage, "http://example.com/b");
        let target = storage.add_child(&a, "http://example.com/t").unwrap().unwrap();
        storage.add_embed(&a, "http://example.com/t").unwrap();
        storage.add_child(&b, "http://example.com/t").unwrap();

        assert_eq!(storage.count_parents(target.id).unwrap(), 2);
        assert_eq!(storage.parents(target.id).unwrap().len(), 2);
    }

    #[test]
    fn test_crawl_depth_keeps_minimum() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let root = internal_link(&mut storage, "http://example.com/");
        let deep = storage.add_child(&root, "http://example.com/1").unwrap().unwrap();
        let mut deep = storage.get_link(deep.id).unwrap();
        deep.is_internal = Some(true);
        let far = storage.add_child(&deep, "http://example.com/2").unwrap().unwrap();
        assert_eq!(far.crawl_depth, 2);

        let near = storage.add_child(&root, "http://example.com/2").unwrap().unwrap();
        assert_eq!(near.id, far.id);
        assert_eq!(near.crawl_depth, 1);
    }

    #[test]
    fn test_add_anchor_duplicate_records_problem() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let page = internal_link(&mut storage, "http://example.com/");
        storage.add_anchor(&page, "Top").unwrap();
        storage.add_anchor(&page, "top").unwrap();
        storage.add_anchor(&page, "TOP").unwrap();

        assert_eq!(storage.anchors(page.id).unwrap(), vec!["top".to_string()]);
        assert_eq!(
            storage.pageproblems(page.id).unwrap(),
            vec!["anchor/id \"top\" defined multiple times".to_string()]
        );
    }

    #[test]
    fn test_add_reqanchor_idempotent() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let page = internal_link(&mut storage, "http://example.com/");
        let mut target = storage.get_or_create("http://example.com/t").unwrap();
        target.fetched = Some(Utc::now());
        storage.save_link(&target).unwrap();

        storage.add_reqanchor(&target, &page, "Sec").unwrap();
        storage.add_reqanchor(&target, &page, "sec").unwrap();
        assert_eq!(storage.requested_anchors().unwrap().len(), 1);
    }

    #[test]
    fn test_pageproblems_only_for_internal() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let internal = internal_link(&mut storage, "http://example.com/");
        let external = storage.get_or_create("http://other.org/").unwrap();

        storage.add_pageproblem(&internal, "missing title").unwrap();
        storage.add_pageproblem(&external, "missing title").unwrap();

        assert_eq!(storage.pageproblems(internal.id).unwrap().len(), 1);
        assert!(storage.pageproblems(external.id).unwrap().is_empty());
        assert_eq!(storage.links_with_pageproblems().unwrap().len(), 1);
    }

    #[test]
    fn test_linkproblems_deduplicated() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let link = storage.get_or_create("http://example.com/missing").unwrap();
        storage.add_linkproblem(link.id, "404: Not Found").unwrap();
        storage.add_linkproblem(link.id, "404: Not Found").unwrap();

        assert_eq!(storage.linkproblems(link.id).unwrap().len(), 1);
        assert_eq!(storage.links_with_linkproblems().unwrap()[0].id, link.id);
    }

    #[test]
    fn test_unfetched_links() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let root = internal_link(&mut storage, "http://example.com/");
        storage.add_child(&root, "http://example.com/a").unwrap();
        let b = storage.add_child(&root, "http://example.com/b").unwrap().unwrap();

        let mut yanked = storage.get_link(b.id).unwrap();
        yanked.yanked = Some(YankReason::Yanked);
        storage.save_link(&yanked).unwrap();

        let mut fetched = root.clone();
        fetched.fetched = Some(Utc::now());
        storage.save_link(&fetched).unwrap();

        let pending = storage.unfetched_links(100, None).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].url, "http://example.com/a");
        assert_eq!(storage.count_unfetched(None).unwrap(), 1);

        // discovery depth bound
        assert!(storage.unfetched_links(100, Some(0)).unwrap().is_empty());
        assert_eq!(storage.unfetched_links(100, Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_unfetched_links_limit_and_order() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        for i in 0..5 {
            storage
                .get_or_create(&format!("http://example.com/{}", 4 - i))
                .unwrap();
        }
        let batch = storage.unfetched_links(2, None).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].url, "http://example.com/4");
        assert_eq!(batch[1].url, "http://example.com/3");
    }

    #[test]
    fn test_truncate() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.create_run("hash").unwrap();
        storage.add_base_url("http://example.com/").unwrap();
        let root = internal_link(&mut storage, "http://example.com/");
        storage.add_child(&root, "http://example.com/a#x").unwrap();
        storage.add_anchor(&root, "x").unwrap();
        storage.add_linkproblem(root.id, "oops").unwrap();

        storage.truncate().unwrap();

        assert_eq!(storage.count_links().unwrap(), 0);
        assert_eq!(storage.count_edges().unwrap(), 0);
        assert!(storage.base_urls().unwrap().is_empty());
        assert!(storage.get_latest_run().unwrap().is_some());
    }

    #[test]
    fn test_base_urls() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.add_base_url("http://Example.com").unwrap();
        storage.add_base_url("http://example.com/").unwrap();
        storage.add_base_url("http://example.com/docs/").unwrap();

        assert_eq!(
            storage.base_urls().unwrap(),
            vec![
                "http://example.com/".to_string(),
                "http://example.com/docs/".to_string()
            ]
        );
        assert!(storage.find_link("http://example.com/docs/").unwrap().is_some());
    }

    #[test]
    fn test_rollback_discards_changes() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.begin().unwrap();
        storage.get_or_create("http://example.com/kept").unwrap();
        storage.commit().unwrap();

        storage.begin().unwrap();
        storage.get_or_create("http://example.com/discarded").unwrap();
        storage.rollback().unwrap();

        assert_eq!(storage.count_links().unwrap(), 1);
        // nothing to roll back or commit outside a transaction
        assert!(storage.rollback().is_ok());
        assert!(storage.commit().is_ok());
    }

    #[test]
    fn test_depths() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let link = storage.get_or_create("http://example.com/").unwrap();
        storage.set_depth(link.id, 3).unwrap();
        assert_eq!(storage.get_link(link.id).unwrap().depth, Some(3));

        storage.reset_depths().unwrap();
        assert_eq!(storage.get_link(link.id).unwrap().depth, None);
    }

    #[test]
    fn test_get_link_missing() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.get_link(42),
            Err(StorageError::LinkNotFound(_))
        ));
        assert!(storage.find_link("http://nowhere/").unwrap().is_none());
    }
}
