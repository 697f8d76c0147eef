//! Reports on page modification times

use crate::output::traits::{Report, ReportResult, Site};
use crate::output::writer::ReportWriter;
use crate::storage::{Link, Storage};
use chrono::{DateTime, Utc};

/// Internal pages with a known modification time and their age in days
fn aged_pages(storage: &dyn Storage, now: DateTime<Utc>) -> ReportResult<Vec<(Link, i64)>> {
    Ok(storage
        .all_links()?
        .into_iter()
        .filter(|l| l.is_internal() && l.is_page)
        .filter_map(|l| {
            let age = (now - l.mtime?).num_days();
            Some((l, age))
        })
        .collect())
}

fn write_aged(
    storage: &dyn Storage,
    out: &mut ReportWriter,
    pages: &[(Link, i64)],
) -> ReportResult<()> {
    out.write("   <ul>\n");
    for (link, age) in pages {
        let item = format!(
            "    <li>\n     {}\n     <div class=\"status\">age: {} days</div>\n    </li>\n",
            out.make_link(storage, link, None)?,
            age
        );
        out.write(&item);
    }
    out.write("   </ul>\n");
    Ok(())
}

/// Lists pages that have not been modified for a long time
pub struct OldReport;

impl OldReport {
    fn old_pages(storage: &dyn Storage, site: &Site) -> ReportResult<Vec<(Link, i64)>> {
        let threshold = i64::from(site.config.report.whatsold_age);
        let mut pages: Vec<(Link, i64)> = aged_pages(storage, Utc::now())?
            .into_iter()
            .filter(|(_, age)| *age >= threshold)
            .collect();
        // oldest first
        pages.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.url.cmp(&b.0.url)));
        Ok(pages)
    }
}

impl Report for OldReport {
    fn name(&self) -> &'static str {
        "old"
    }

    fn title(&self) -> &'static str {
        "what's old"
    }

    fn description(&self) -> &'static str {
        "These pages have been modified a long time ago and may be outdated."
    }

    fn output_file(&self) -> Option<&'static str> {
        Some("old.html")
    }

    fn postprocess(&self, storage: &mut dyn Storage, site: &Site) -> ReportResult<()> {
        for (link, age) in Self::old_pages(storage, site)? {
            storage.add_pageproblem(&link, &format!("this page is {} days old", age))?;
        }
        Ok(())
    }

    fn generate(
        &self,
        storage: &dyn Storage,
        site: &Site,
        out: &mut ReportWriter,
    ) -> ReportResult<()> {
        let pages = Self::old_pages(storage, site)?;
        if pages.is_empty() {
            out.description(&format!(
                "No pages were found that were older than {} days old.",
                site.config.report.whatsold_age
            ));
            return Ok(());
        }
        out.description(&format!(
            "These pages have been modified a long time ago (older than {} days) and may \
             be outdated.",
            site.config.report.whatsold_age
        ));
        write_aged(storage, out, &pages)
    }
}

/// Lists pages that were modified recently
pub struct NewReport;

impl Report for NewReport {
    fn name(&self) -> &'static str {
        "new"
    }

    fn title(&self) -> &'static str {
        "what's new"
    }

    fn description(&self) -> &'static str {
        "These pages have been recently modified."
    }

    fn output_file(&self) -> Option<&'static str> {
        Some("new.html")
    }

    fn generate(
        &self,
        storage: &dyn Storage,
        site: &Site,
        out: &mut ReportWriter,
    ) -> ReportResult<()> {
        let threshold = i64::from(site.config.report.whatsnew_age);
        let mut pages: Vec<(Link, i64)> = aged_pages(storage, Utc::now())?
            .into_iter()
            .filter(|(_, age)| *age <= threshold)
            .collect();
        if pages.is_empty() {
            out.description(&format!(
                "No pages were found that were modified within the last {} days.",
                threshold
            ));
            return Ok(());
        }
        // newest first
        pages.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.url.cmp(&b.0.url)));
        out.description(&format!(
            "These pages have been recently modified (within {} days).",
            threshold
        ));
        write_aged(storage, out, &pages)
    }
}
