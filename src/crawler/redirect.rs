//! Redirect chain tracking
//!
//! A redirecting link gets exactly one child, its target. The chain of URLs
//! leading to a link is stored with it so loops can be recognised without
//! walking the graph.

use crate::storage::{Link, Storage, StorageResult};
use crate::url::{clean_url, resolve_url};
use std::collections::HashSet;
use tracing::{debug, info};

/// Records that `link` redirects to `target`
///
/// The redirect depth of the link becomes one more than the deepest of its
/// parents. The chain is cut off (no child is added) when the depth reaches
/// `max_redirects` or the target is the link itself. A target that already
/// occurs in the chain is flagged as a loop on every link of the cycle but
/// is still added as a child.
///
/// # Arguments
///
/// * `storage` - The link graph
/// * `link` - The redirecting link, updated in place (caller saves it)
/// * `target` - The redirect target, possibly relative to the link
/// * `max_redirects` - Configured maximum redirect depth
pub fn redirect(
    storage: &mut dyn Storage,
    link: &mut Link,
    target: &str,
    max_redirects: u32,
) -> StorageResult<()> {
    let parents = storage.parents(link.id)?;

    link.redirectdepth = 1 + parents.iter().map(|p| p.redirectdepth).max().unwrap_or(0);

    // inherit the chain of the parent that redirected here last
    let mut chain = parents
        .iter()
        .filter(|p| p.is_redirect())
        .max_by_key(|p| p.redirectdepth)
        .map(|p| p.redirect_chain.clone())
        .unwrap_or_default();
    chain.push(link.url.clone());
    link.redirect_chain = chain;

    if link.redirectdepth >= max_redirects {
        info!("{}: too many redirects", link.url);
        return storage.add_linkproblem(
            link.id,
            &format!("too many redirects ({})", link.redirectdepth),
        );
    }

    let target = resolve_url(&link.url, target);
    let target_url = clean_url(&target);

    if target_url == link.url {
        return storage.add_linkproblem(
            link.id,
            &format!("redirect same as source: {}", target_url),
        );
    }

    if let Some(start) = link.redirect_chain.iter().position(|u| *u == target_url) {
        let cycle = &link.redirect_chain[start..];
        let message = format!("redirect loop: {} -> {}", cycle.join(" -> "), target_url);
        debug!("{}", message);
        for url in cycle {
            if *url == link.url {
                storage.add_linkproblem(link.id, &message)?;
            } else if let Some(member) = storage.find_link(url)? {
                storage.add_linkproblem(member.id, &message)?;
            }
        }
    }

    storage.add_child(link, &target)?;
    Ok(())
}

/// Follows a redirect chain to the link it ends at
///
/// # Returns
///
/// * `Ok(Some(link))` - The first link in the chain that is not a redirect
/// * `Ok(None)` - The chain ends at an unknown target or loops
pub fn follow_link(storage: &dyn Storage, link: &Link) -> StorageResult<Option<Link>> {
    let mut visited = HashSet::new();
    let mut current = link.clone();

    loop {
        if !current.is_redirect() {
            return Ok(Some(current));
        }
        if !visited.insert(current.url.clone()) {
            return Ok(None);
        }
        match storage.children(current.id)?.into_iter().next() {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
}
