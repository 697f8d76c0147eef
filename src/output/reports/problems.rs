//! Reports about problems found on the site

use crate::output::traits::{Report, ReportResult, Site};
use crate::output::writer::ReportWriter;
use crate::storage::{Link, Storage};
use html_escape::encode_text;
use std::collections::{BTreeMap, HashMap};

/// Finds references to anchors that are not defined on the target page
///
/// Produces no page of its own; the problems show up in the problems
/// report.
pub struct AnchorsReport;

impl Report for AnchorsReport {
    fn name(&self) -> &'static str {
        "anchors"
    }

    fn title(&self) -> &'static str {
        "missing anchors"
    }

    fn description(&self) -> &'static str {
        "Finds references to anchors that do not exist."
    }

    fn postprocess(&self, storage: &mut dyn Storage, _site: &Site) -> ReportResult<()> {
        let mut defined: HashMap<i64, Vec<String>> = HashMap::new();
        for requested in storage.requested_anchors()? {
            let link = storage.get_link(requested.link_id)?;
            // only parsed pages define anchors
            if !link.is_page {
                continue;
            }
            if !defined.contains_key(&link.id) {
                defined.insert(link.id, storage.anchors(link.id)?);
            }
            let known = defined
                .get(&link.id)
                .map_or(false, |anchors| anchors.contains(&requested.anchor));
            if known {
                continue;
            }
            let parent = storage.get_link(requested.parent_id)?;
            storage.add_pageproblem(
                &parent,
                &format!("bad link: {}#{}: unknown anchor", link.url, requested.anchor),
            )?;
        }
        Ok(())
    }
}

/// Lists links that could not be retrieved
pub struct BadLinksReport;

impl Report for BadLinksReport {
    fn name(&self) -> &'static str {
        "badlinks"
    }

    fn title(&self) -> &'static str {
        "bad links"
    }

    fn description(&self) -> &'static str {
        "These links had problems with retrieval during the crawling of the website."
    }

    fn output_file(&self) -> Option<&'static str> {
        Some("badlinks.html")
    }

    fn postprocess(&self, storage: &mut dyn Storage, _site: &Site) -> ReportResult<()> {
        for link in storage.links_with_linkproblems()? {
            let problems = storage.linkproblems(link.id)?.join("; ");
            for parent in storage.parents(link.id)? {
                storage.add_pageproblem(&parent, &format!("bad link: {}: {}", link.url, problems))?;
            }
        }
        Ok(())
    }

    fn generate(
        &self,
        storage: &dyn Storage,
        _site: &Site,
        out: &mut ReportWriter,
    ) -> ReportResult<()> {
        let links = storage.links_with_linkproblems()?;
        if links.is_empty() {
            out.description("There were no problems retrieving links from the website.");
            return Ok(());
        }

        out.description(self.description());
        out.write("   <ol>\n");
        for link in &links {
            let item = format!(
                "    <li>\n     {}\n",
                out.make_link(storage, link, Some(&link.url))?
            );
            out.write(&item);
            write_problems(out, &storage.linkproblems(link.id)?);
            out.print_parents(storage, link, "     ")?;
            out.write("    </li>\n");
        }
        out.write("   </ol>\n");
        Ok(())
    }
}

/// Lists internal pages without a title
pub struct NoTitlesReport;

impl NoTitlesReport {
    fn untitled(storage: &dyn Storage) -> ReportResult<Vec<Link>> {
        Ok(storage
            .all_links()?
            .into_iter()
            .filter(|l| l.is_internal() && l.is_page && l.title.is_none())
            .collect())
    }
}

impl Report for NoTitlesReport {
    fn name(&self) -> &'static str {
        "notitles"
    }

    fn title(&self) -> &'static str {
        "missing titles"
    }

    fn description(&self) -> &'static str {
        "This is the list of all (internal) pages without a proper title specified."
    }

    fn output_file(&self) -> Option<&'static str> {
        Some("notitles.html")
    }

    fn postprocess(&self, storage: &mut dyn Storage, _site: &Site) -> ReportResult<()> {
        for link in Self::untitled(storage)? {
            storage.add_pageproblem(&link, "missing title")?;
        }
        Ok(())
    }

    fn generate(
        &self,
        storage: &dyn Storage,
        _site: &Site,
        out: &mut ReportWriter,
    ) -> ReportResult<()> {
        let links = Self::untitled(storage)?;
        if links.is_empty() {
            out.description("All pages had a title specified.");
            return Ok(());
        }

        out.description(self.description());
        out.write("   <ol>\n");
        for link in &links {
            let item = format!("    <li>{}</li>\n", out.make_link(storage, link, Some(&link.url))?);
            out.write(&item);
        }
        out.write("   </ol>\n");
        Ok(())
    }
}

/// Lists the page problems of the site grouped by page author
pub struct ProblemsReport;

impl Report for ProblemsReport {
    fn name(&self) -> &'static str {
        "problems"
    }

    fn title(&self) -> &'static str {
        "problems by author"
    }

    fn description(&self) -> &'static str {
        "This is an overview of all the problems on the site, grouped by author."
    }

    fn output_file(&self) -> Option<&'static str> {
        Some("problems.html")
    }

    fn generate(
        &self,
        storage: &dyn Storage,
        _site: &Site,
        out: &mut ReportWriter,
    ) -> ReportResult<()> {
        let mut by_author: BTreeMap<String, Vec<Link>> = BTreeMap::new();
        for link in storage.links_with_pageproblems()? {
            let author = link.author.clone().unwrap_or_else(|| "Unknown".to_string());
            by_author.entry(author).or_default().push(link);
        }

        if by_author.is_empty() {
            out.description("No problems were found on this site, hurray.");
            return Ok(());
        }

        out.description(self.description());
        if by_author.len() > 1 {
            out.write("   <ul class=\"authorlist\">\n");
            for author in by_author.keys() {
                out.write(&format!(
                    "    <li><a href=\"#{}\">Author: {}</a></li>\n",
                    author_ref(author),
                    encode_text(author)
                ));
            }
            out.write("   </ul>\n");
        }

        out.write("   <ul>\n");
        for (author, links) in &mut by_author {
            out.write(&format!(
                "    <li id=\"{}\">\n     Author: {}\n     <ul>\n",
                author_ref(author),
                encode_text(author)
            ));
            links.sort_by(|a, b| a.url.cmp(&b.url));
            for link in links.iter() {
                let item = format!("      <li>\n       {}\n", out.make_link(storage, link, None)?);
                out.write(&item);
                let mut problems = storage.pageproblems(link.id)?;
                problems.sort();
                write_problems(out, &problems);
                out.write("      </li>\n");
            }
            out.write("     </ul>\n    </li>\n");
        }
        out.write("   </ul>\n");
        Ok(())
    }
}

fn write_problems(out: &mut ReportWriter, problems: &[String]) {
    out.write("     <ul class=\"problems\">\n");
    for problem in problems {
        out.write(&format!("      <li>{}</li>\n", encode_text(problem)));
    }
    out.write("     </ul>\n");
}

/// Fragment identifier for an author section
fn author_ref(author: &str) -> String {
    url::form_urlencoded::byte_serialize(author.as_bytes()).collect()
}
