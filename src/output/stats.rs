//! Statistics generation from the link graph
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::state::LinkState;
use crate::storage::{Storage, StorageResult};
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Total number of links in the graph
    pub total_links: u64,

    /// Links that belong to the checked site
    pub internal_links: u64,

    /// Count of links by state
    pub links_by_state: HashMap<LinkState, u64>,

    /// Number of child and embed edges
    pub total_edges: u64,

    /// Links with problems retrieving them
    pub links_with_problems: u64,

    /// Internal pages with problems in their content
    pub pages_with_problems: u64,
}

impl CrawlStatistics {
    /// Links that are not internal
    pub fn external_links(&self) -> u64 {
        self.total_links.saturating_sub(self.internal_links)
    }

    pub fn count(&self, state: LinkState) -> u64 {
        self.links_by_state.get(&state).copied().unwrap_or(0)
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<CrawlStatistics> {
    let total_links = storage.count_links()?;
    let fetched = storage.count_fetched()?;
    let yanked = storage.count_yanked()?;

    let mut links_by_state = HashMap::new();
    for (state, count) in [
        (LinkState::Fetched, fetched),
        (LinkState::Yanked, yanked),
        (
            LinkState::Pending,
            total_links.saturating_sub(fetched + yanked),
        ),
    ] {
        if count > 0 {
            links_by_state.insert(state, count);
        }
    }

    Ok(CrawlStatistics {
        total_links,
        internal_links: storage.count_internal()?,
        links_by_state,
        total_edges: storage.count_edges()?,
        links_with_problems: storage.links_with_linkproblems()?.len() as u64,
        pages_with_problems: storage.links_with_pageproblems()?.len() as u64,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Total links: {}", stats.total_links);
    println!("  Internal links: {}", stats.internal_links);
    println!("  External links: {}", stats.external_links());
    println!("  Edges between links: {}", stats.total_edges);
    println!();

    println!("Links by State:");
    for state in LinkState::all_states() {
        let count = stats.count(state);
        if count == 0 {
            continue;
        }
        let percentage = if stats.total_links > 0 {
            (count as f64 / stats.total_links as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }
    println!();

    println!("Problems:");
    println!("  Links with retrieval problems: {}", stats.links_with_problems);
    println!("  Pages with content problems: {}", stats.pages_with_problems);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::YankReason;
    use crate::storage::SqliteStorage;

    #[test]
    fn test_load_statistics() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut home = storage.get_or_create("http://example.com/").unwrap();
        home.is_internal = Some(true);
        home.fetched = Some(chrono::Utc::now());
        storage.save_link(&home).unwrap();
        storage.add_child(&home, "http://example.com/next").unwrap();
        let mut other = storage.add_child(&home, "http://other.org/").unwrap().unwrap();
        other.is_internal = Some(false);
        other.yanked = Some(YankReason::ExternalAvoided);
        storage.save_link(&other).unwrap();
        storage.add_linkproblem(other.id, "never checked").unwrap();

        let stats = load_statistics(&storage).unwrap();

        assert_eq!(stats.total_links, 3);
        assert_eq!(stats.internal_links, 1);
        assert_eq!(stats.external_links(), 2);
        assert_eq!(stats.total_edges, 2);
        assert_eq!(stats.count(LinkState::Fetched), 1);
        assert_eq!(stats.count(LinkState::Yanked), 1);
        assert_eq!(stats.count(LinkState::Pending), 1);
        assert_eq!(stats.links_with_problems, 1);
        assert_eq!(stats.pages_with_problems, 0);
    }
}
