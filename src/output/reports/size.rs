//! Report on pages that are slow to download

use crate::crawler::LinkGraph;
use crate::output::traits::{Report, ReportResult, Site};
use crate::output::writer::{format_size, ReportWriter};
use crate::storage::{Link, Storage};
use std::collections::HashSet;

/// Size of a link plus everything it embeds, each link counted once
pub fn total_size(graph: &LinkGraph, id: i64) -> u64 {
    let mut done = HashSet::new();
    let mut stack = vec![id];
    let mut total = 0;
    while let Some(current) = stack.pop() {
        if !done.insert(current) {
            continue;
        }
        total += graph.link(current).and_then(|l| l.size).unwrap_or(0);
        stack.extend(graph.embedded(current).iter().copied());
    }
    total
}

/// Lists internal pages whose total size exceeds the configured limit
pub struct SizeReport;

impl SizeReport {
    fn big_pages(storage: &dyn Storage, site: &Site) -> ReportResult<Vec<(Link, u64)>> {
        let limit = site.config.report.slow_url_size * 1024;
        let graph = LinkGraph::load(storage)?;
        let mut pages: Vec<(Link, u64)> = storage
            .all_links()?
            .into_iter()
            .filter(|l| l.is_internal() && l.is_page)
            .map(|l| {
                let size = total_size(&graph, l.id);
                (l, size)
            })
            .filter(|(_, size)| *size >= limit)
            .collect();
        // biggest first
        pages.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.url.cmp(&b.0.url)));
        Ok(pages)
    }
}

impl Report for SizeReport {
    fn name(&self) -> &'static str {
        "size"
    }

    fn title(&self) -> &'static str {
        "what's big"
    }

    fn description(&self) -> &'static str {
        "These pages are probably too big which could be slow to download."
    }

    fn output_file(&self) -> Option<&'static str> {
        Some("size.html")
    }

    fn postprocess(&self, storage: &mut dyn Storage, site: &Site) -> ReportResult<()> {
        for (link, size) in Self::big_pages(storage, site)? {
            storage.add_pageproblem(
                &link,
                &format!("this page and its components is {}", format_size(size)),
            )?;
        }
        Ok(())
    }

    fn generate(
        &self,
        storage: &dyn Storage,
        site: &Site,
        out: &mut ReportWriter,
    ) -> ReportResult<()> {
        let limit = site.config.report.slow_url_size;
        let pages = Self::big_pages(storage, site)?;
        if pages.is_empty() {
            out.description(&format!("No pages over {}K were found.", limit));
            return Ok(());
        }
        out.description(&format!(
            "These pages are probably too big (over {}K) which could be slow to download.",
            limit
        ));
        out.write("   <ul>\n");
        for (link, size) in &pages {
            let item = format!(
                "    <li>\n     {}\n     <ul class=\"problem\">\n      <li>size: {}</li>\n     </ul>\n    </li>\n",
                out.make_link(storage, link, None)?,
                format_size(*size)
            );
            out.write(&item);
        }
        out.write("   </ul>\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::SqliteStorage;

    fn sized(storage: &mut SqliteStorage, url: &str, size: u64, is_page: bool) -> Link {
        let mut link = storage.get_or_create(url).unwrap();
        link.is_internal = Some(true);
        link.is_page = is_page;
        link.size = Some(size);
        storage.save_link(&link).unwrap();
        link
    }

    #[test]
    fn test_total_size_counts_embeds_once() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let page = sized(&mut storage, "http://example.com/", 1000, true);
        let frame = sized(&mut storage, "http://example.com/frame.html", 500, true);
        sized(&mut storage, "http://example.com/logo.png", 200, false);
        storage.add_embed(&page, &frame.url).unwrap();
        storage.add_embed(&page, "http://example.com/logo.png").unwrap();
        storage.add_embed(&frame, "http://example.com/logo.png").unwrap();

        let graph = LinkGraph::load(&storage).unwrap();
        assert_eq!(total_size(&graph, page.id), 1700);
    }

    #[test]
    fn test_big_page_problem() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let big = sized(&mut storage, "http://example.com/big", 100 * 1024, true);
        let small = sized(&mut storage, "http://example.com/small", 10, true);
        let site = Site::new(Vec::new(), Config::default());

        SizeReport.postprocess(&mut storage, &site).unwrap();

        assert_eq!(
            storage.pageproblems(big.id).unwrap(),
            vec!["this page and its components is 100K".to_string()]
        );
        assert!(storage.pageproblems(small.id).unwrap().is_empty());
    }
}
