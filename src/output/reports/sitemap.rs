//! Site map of the checked site

use crate::crawler::LinkGraph;
use crate::output::traits::{Report, ReportResult, Site};
use crate::output::writer::ReportWriter;
use crate::storage::{Link, Storage};
use std::collections::HashSet;

/// Presents the site as a tree following the breadth-first depths
pub struct SitemapReport;

struct Explorer<'a> {
    storage: &'a dyn Storage,
    graph: &'a LinkGraph,
    out: &'a ReportWriter,
    max_level: u32,
    explored: HashSet<i64>,
    html: String,
}

impl Explorer<'_> {
    fn explore(&mut self, link: &Link, depth: u32, indent: &str) -> ReportResult<()> {
        self.html.push_str(&format!(
            "{indent}<li>\n{indent} {}\n",
            self.out.make_link(self.storage, link, None)?,
            indent = indent
        ));

        if depth < self.max_level {
            // only descend into pages first reached through this link
            let graph = self.graph;
            let mut children: Vec<&Link> = Vec::new();
            for id in graph.page_children(link.id) {
                let Some(child) = graph.link(id) else {
                    continue;
                };
                if child.depth != Some(depth + 1) || !child.is_internal() {
                    continue;
                }
                if self.explored.insert(id) {
                    children.push(child);
                }
            }
            if !children.is_empty() {
                children.sort_by(|a, b| a.url.cmp(&b.url));
                self.html.push_str(&format!("{} <ul>\n", indent));
                let nested = format!("{}  ", indent);
                for child in children {
                    self.explore(child, depth + 1, &nested)?;
                }
                self.html.push_str(&format!("{} </ul>\n", indent));
            }
        }

        self.html.push_str(&format!("{}</li>\n", indent));
        Ok(())
    }
}

impl Report for SitemapReport {
    fn name(&self) -> &'static str {
        "sitemap"
    }

    fn title(&self) -> &'static str {
        "site map"
    }

    fn description(&self) -> &'static str {
        "This an overview of the crawled site."
    }

    fn output_file(&self) -> Option<&'static str> {
        Some("index.html")
    }

    fn generate(
        &self,
        storage: &dyn Storage,
        site: &Site,
        out: &mut ReportWriter,
    ) -> ReportResult<()> {
        let graph = LinkGraph::load(storage)?;
        let html = {
            let mut explorer = Explorer {
                storage,
                graph: &graph,
                out: &*out,
                max_level: site.config.report.sitemap_level,
                explored: site.bases.iter().map(|b| b.id).collect(),
                html: String::new(),
            };
            for base in &site.bases {
                // use the postprocessed record, which carries the depth
                let base = graph.link(base.id).unwrap_or(base);
                explorer.explore(base, 0, "    ")?;
            }
            explorer.html
        };

        out.description(self.description());
        out.write("   <ul>\n");
        out.write(&html);
        out.write("   </ul>\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::crawler::assign_depths;
    use crate::storage::SqliteStorage;
    use tempfile::TempDir;

    #[test]
    fn test_sitemap_tree() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut home = storage.get_or_create("http://example.com/").unwrap();
        home.is_internal = Some(true);
        home.is_page = true;
        storage.save_link(&home).unwrap();
        let mut about = storage.add_child(&home, "http://example.com/about").unwrap().unwrap();
        about.is_internal = Some(true);
        about.is_page = true;
        storage.save_link(&about).unwrap();
        storage.add_child(&about, "http://example.com/team").unwrap();
        // a back link must not nest the home page again
        storage.add_child(&about, "http://example.com/").unwrap();
        let mut team = storage.find_link("http://example.com/team").unwrap().unwrap();
        team.is_internal = Some(true);
        storage.save_link(&team).unwrap();
        assign_depths(&mut storage, &[home.clone()]).unwrap();

        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output.directory = dir.path().to_path_buf();
        let site = Site::new(vec![home], config.clone());
        let mut out = ReportWriter::new(&config, "Home", "http://example.com/", Vec::new());

        out.begin("site map", "index.html");
        SitemapReport.generate(&storage, &site, &mut out).unwrap();
        let html = std::fs::read_to_string(out.finish().unwrap()).unwrap();

        assert_eq!(html.matches("href=\"http://example.com/\"").count(), 2);
        let about_at = html.find("http://example.com/about\"").unwrap();
        let team_at = html.find("http://example.com/team\"").unwrap();
        assert!(about_at < team_at);
        assert_eq!(html.matches("<ul>").count(), 3);
    }
}
