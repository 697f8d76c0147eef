//! Postprocessing of the crawled link graph
//!
//! Determines the base links of the site and assigns every reachable link
//! its breadth-first depth. The traversal runs over an in-memory copy of
//! the edges so that ties between equally shallow links are broken by the
//! order in which edges were discovered.

use crate::crawler::redirect::follow_link;
use crate::storage::{EdgeKind, Link, Storage, StorageResult};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

/// Read-only in-memory view of the link graph
pub struct LinkGraph {
    links: HashMap<i64, Link>,
    children: HashMap<i64, Vec<i64>>,
    embedded: HashMap<i64, Vec<i64>>,
}

impl LinkGraph {
    /// Loads all links and edges from the store
    pub fn load(storage: &dyn Storage) -> StorageResult<Self> {
        let links = storage
            .all_links()?
            .into_iter()
            .map(|link| (link.id, link))
            .collect();

        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        let mut embedded: HashMap<i64, Vec<i64>> = HashMap::new();
        for edge in storage.edges()? {
            let target = match edge.kind {
                EdgeKind::Child => &mut children,
                EdgeKind::Embed => &mut embedded,
            };
            target.entry(edge.parent_id).or_default().push(edge.child_id);
        }

        Ok(Self {
            links,
            children,
            embedded,
        })
    }

    pub fn link(&self, id: i64) -> Option<&Link> {
        self.links.get(&id)
    }

    pub fn children(&self, id: i64) -> &[i64] {
        self.children.get(&id).map_or(&[], Vec::as_slice)
    }

    pub fn embedded(&self, id: i64) -> &[i64] {
        self.embedded.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Follows a redirect chain to its terminal link
    ///
    /// Returns `None` when the chain loops or ends at a redirect whose
    /// target is unknown.
    pub fn follow(&self, id: i64) -> Option<i64> {
        let mut visited = HashSet::new();
        let mut current = id;
        loop {
            let link = self.links.get(&current)?;
            if !link.is_redirect() {
                return Some(current);
            }
            if !visited.insert(current) {
                return None;
            }
            current = *self.children(current).first()?;
        }
    }

    /// Links reachable in one hop from a page
    ///
    /// These are the children (and where they redirect to) and the embedded
    /// links. Embedded pages such as frames are flattened into the embedding
    /// page, so their own children are included as well.
    pub fn page_children(&self, id: i64) -> Vec<i64> {
        let mut result = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut flattened = HashSet::from([id]);
        self.collect_page_children(id, &mut result, &mut seen, &mut flattened);
        result
    }

    fn collect_page_children(
        &self,
        id: i64,
        result: &mut Vec<i64>,
        seen: &mut HashSet<i64>,
        flattened: &mut HashSet<i64>,
    ) {
        for &child in self.children(id) {
            if seen.insert(child) {
                result.push(child);
            }
            if let Some(target) = self.follow(child) {
                if seen.insert(target) {
                    result.push(target);
                }
            }
        }
        for &embed in self.embedded(id) {
            if seen.insert(embed) {
                result.push(embed);
            }
            let is_page = self.links.get(&embed).map_or(false, |l| l.is_page);
            if is_page && flattened.insert(embed) {
                self.collect_page_children(embed, result, seen, flattened);
            }
        }
    }

    /// Computes the breadth-first depth of every link reachable from `bases`
    pub fn depths(&self, bases: &[i64]) -> HashMap<i64, u32> {
        let mut depths = HashMap::new();
        let mut queue = VecDeque::new();
        for &base in bases {
            if depths.insert(base, 0).is_none() {
                queue.push_back(base);
            }
        }

        while let Some(id) = queue.pop_front() {
            let depth = depths[&id];
            for child in self.page_children(id) {
                if !depths.contains_key(&child) {
                    depths.insert(child, depth + 1);
                    queue.push_back(child);
                }
            }
        }
        depths
    }
}

/// Resolves the base URLs to the links the site starts at
///
/// Each base URL is followed through its redirects. When none of them
/// resolve, the first internal link is used so that there is always a
/// starting point for the reports.
pub fn find_bases(storage: &dyn Storage, base_urls: &[String]) -> StorageResult<Vec<Link>> {
    let mut bases: Vec<Link> = Vec::new();
    for url in base_urls {
        let Some(link) = storage.find_link(url)? else {
            warn!("base link {} was never recorded", url);
            continue;
        };
        match follow_link(storage, &link)? {
            Some(base) => {
                if !bases.iter().any(|b| b.id == base.id) {
                    bases.push(base);
                }
            }
            None => warn!("base link {} redirects to nowhere", url),
        }
    }

    if bases.is_empty() {
        let fallback = storage
            .all_links()?
            .into_iter()
            .find(|l| l.is_internal() && !l.is_redirect());
        if let Some(fallback) = fallback {
            warn!("no usable base link, using {}", fallback.url);
            bases.push(fallback);
        }
    }
    Ok(bases)
}

/// Assigns breadth-first depths to the stored links
///
/// All previous depths are cleared first; links that cannot be reached
/// from a base keep no depth.
///
/// # Returns
///
/// The number of links that received a depth
pub fn assign_depths(storage: &mut dyn Storage, bases: &[Link]) -> StorageResult<usize> {
    let graph = LinkGraph::load(storage)?;
    let base_ids: Vec<i64> = bases.iter().map(|b| b.id).collect();
    let depths = graph.depths(&base_ids);

    storage.begin()?;
    match write_depths(storage, &depths) {
        Ok(()) => storage.commit()?,
        Err(e) => {
            storage.rollback()?;
            return Err(e);
        }
    }

    debug!("Assigned depths to {} links", depths.len());
    Ok(depths.len())
}

fn write_depths(storage: &mut dyn Storage, depths: &HashMap<i64, u32>) -> StorageResult<()> {
    storage.reset_depths()?;
    for (&id, &depth) in depths {
        storage.set_depth(id, depth)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::redirect::redirect;
    use crate::storage::SqliteStorage;

    fn page(storage: &mut SqliteStorage, url: &str) -> Link {
        let mut link = storage.get_or_create(url).unwrap();
        link.is_internal = Some(true);
        link.is_page = true;
        link.fetched = Some(chrono::Utc::now());
        storage.save_link(&link).unwrap();
        link
    }

    fn depth_of(storage: &SqliteStorage, url: &str) -> Option<u32> {
        storage.find_link(url).unwrap().unwrap().depth
    }

    #[test]
    fn test_equal_distance_children() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let x = page(&mut storage, "http://example.com/");
        storage.add_child(&x, "http://example.com/y").unwrap();
        storage.add_child(&x, "http://example.com/z").unwrap();

        assign_depths(&mut storage, &[x]).unwrap();

        assert_eq!(depth_of(&storage, "http://example.com/"), Some(0));
        assert_eq!(depth_of(&storage, "http://example.com/y"), Some(1));
        assert_eq!(depth_of(&storage, "http://example.com/z"), Some(1));
    }

    #[test]
    fn test_shortest_path_wins_and_unreachable_stays_empty() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let a = page(&mut storage, "http://example.com/a");
        let b = page(&mut storage, "http://example.com/b");
        let c = page(&mut storage, "http://example.com/c");
        page(&mut storage, "http://example.com/orphan");
        storage.add_child(&a, &b.url).unwrap();
        storage.add_child(&b, &c.url).unwrap();
        storage.add_child(&a, &c.url).unwrap();

        assign_depths(&mut storage, &[a]).unwrap();

        assert_eq!(depth_of(&storage, "http://example.com/c"), Some(1));
        assert_eq!(depth_of(&storage, "http://example.com/orphan"), None);
    }

    #[test]
    fn test_depths_are_reset() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let a = page(&mut storage, "http://example.com/a");
        let stale = page(&mut storage, "http://example.com/stale");
        storage.set_depth(stale.id, 3).unwrap();

        assign_depths(&mut storage, &[a]).unwrap();

        assert_eq!(depth_of(&storage, "http://example.com/stale"), None);
    }

    #[test]
    fn test_redirect_target_reachable() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let home = page(&mut storage, "http://example.com/");
        storage.add_child(&home, "http://example.com/old").unwrap();
        let mut old = storage.find_link("http://example.com/old").unwrap().unwrap();
        old.is_internal = Some(true);
        redirect(&mut storage, &mut old, "/new", 5).unwrap();
        storage.save_link(&old).unwrap();

        assign_depths(&mut storage, &[home]).unwrap();

        assert_eq!(depth_of(&storage, "http://example.com/old"), Some(1));
        assert_eq!(depth_of(&storage, "http://example.com/new"), Some(1));
    }

    #[test]
    fn test_embedded_frame_children_flattened() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let home = page(&mut storage, "http://example.com/");
        storage.add_embed(&home, "http://example.com/frame.html").unwrap();
        let frame = page(&mut storage, "http://example.com/frame.html");
        storage.add_child(&frame, "http://example.com/inside").unwrap();

        assign_depths(&mut storage, &[home]).unwrap();

        assert_eq!(depth_of(&storage, "http://example.com/frame.html"), Some(1));
        assert_eq!(depth_of(&storage, "http://example.com/inside"), Some(1));
    }

    #[test]
    fn test_embed_cycle_terminates() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let a = page(&mut storage, "http://example.com/a");
        let b = page(&mut storage, "http://example.com/b");
        storage.add_embed(&a, &b.url).unwrap();
        storage.add_embed(&b, &a.url).unwrap();

        let graph = LinkGraph::load(&storage).unwrap();
        assert_eq!(graph.page_children(a.id), vec![b.id]);
    }

    #[test]
    fn test_find_bases_follows_redirects() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.add_base_url("http://example.com/start").unwrap();
        let mut start = storage.find_link("http://example.com/start").unwrap().unwrap();
        start.is_internal = Some(true);
        redirect(&mut storage, &mut start, "/home", 5).unwrap();
        storage.save_link(&start).unwrap();

        let bases = find_bases(&storage, &storage.base_urls().unwrap()).unwrap();

        assert_eq!(bases.len(), 1);
        assert_eq!(bases[0].url, "http://example.com/home");
    }

    #[test]
    fn test_find_bases_fallback() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.add_base_url("http://example.com/loop").unwrap();
        let mut looping = storage.find_link("http://example.com/loop").unwrap().unwrap();
        looping.is_internal = Some(true);
        looping.redirectdepth = 1;
        storage.save_link(&looping).unwrap();
        page(&mut storage, "http://example.com/page");

        let bases = find_bases(&storage, &storage.base_urls().unwrap()).unwrap();

        assert_eq!(bases.len(), 1);
        assert_eq!(bases[0].url, "http://example.com/page");
    }
}
