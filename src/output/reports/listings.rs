//! Plain link listings

use crate::output::traits::{Report, ReportResult, Site};
use crate::output::writer::ReportWriter;
use crate::storage::{Link, Storage};
use html_escape::encode_text;

/// Writes an ordered list of links, optionally with their parents
fn write_list(
    storage: &dyn Storage,
    out: &mut ReportWriter,
    links: &[Link],
    with_parents: bool,
) -> ReportResult<()> {
    out.write("   <ol>\n");
    for link in links {
        let anchor = out.make_link(storage, link, Some(&link.url))?;
        if !with_parents {
            out.write(&format!("    <li>{}</li>\n", anchor));
            continue;
        }
        out.write(&format!("    <li>\n     {}\n", anchor));
        if let Some(reason) = &link.yanked {
            out.write(&format!(
                "     <div class=\"status\">{}</div>\n",
                encode_text(&reason.to_string())
            ));
        }
        out.print_parents(storage, link, "     ")?;
        out.write("    </li>\n");
    }
    out.write("   </ol>\n");
    Ok(())
}

/// Lists every URL encountered
pub struct UrlListReport;

impl Report for UrlListReport {
    fn name(&self) -> &'static str {
        "urllist"
    }

    fn title(&self) -> &'static str {
        "url list"
    }

    fn description(&self) -> &'static str {
        "This is the list of all urls encountered during the examination of the website. \
         It lists internal as well as external and non-examined urls."
    }

    fn output_file(&self) -> Option<&'static str> {
        Some("urllist.html")
    }

    fn generate(
        &self,
        storage: &dyn Storage,
        _site: &Site,
        out: &mut ReportWriter,
    ) -> ReportResult<()> {
        out.description(self.description());
        write_list(storage, out, &storage.all_links()?, false)
    }
}

/// Lists the images found on the site
pub struct ImagesReport;

impl Report for ImagesReport {
    fn name(&self) -> &'static str {
        "images"
    }

    fn title(&self) -> &'static str {
        "images"
    }

    fn description(&self) -> &'static str {
        "This is the list of all images found linked on the website."
    }

    fn output_file(&self) -> Option<&'static str> {
        Some("images.html")
    }

    fn generate(
        &self,
        storage: &dyn Storage,
        _site: &Site,
        out: &mut ReportWriter,
    ) -> ReportResult<()> {
        let images: Vec<Link> = storage
            .all_links()?
            .into_iter()
            .filter(|l| {
                !l.is_page
                    && l.mimetype
                        .as_deref()
                        .map_or(false, |m| m.starts_with("image/"))
            })
            .collect();
        if images.is_empty() {
            out.description("No images were linked on the website.");
            return Ok(());
        }
        out.description(self.description());
        write_list(storage, out, &images, false)
    }
}

/// Lists links that point outside the site
pub struct ExternalReport;

impl Report for ExternalReport {
    fn name(&self) -> &'static str {
        "external"
    }

    fn title(&self) -> &'static str {
        "external links"
    }

    fn description(&self) -> &'static str {
        "This is the list of all external urls encountered during the examination of \
         the website."
    }

    fn output_file(&self) -> Option<&'static str> {
        Some("external.html")
    }

    fn generate(
        &self,
        storage: &dyn Storage,
        _site: &Site,
        out: &mut ReportWriter,
    ) -> ReportResult<()> {
        let external: Vec<Link> = storage
            .all_links()?
            .into_iter()
            .filter(|l| l.is_internal == Some(false))
            .collect();
        if external.is_empty() {
            out.description("No external links were found on the website.");
            return Ok(());
        }
        out.description(self.description());
        write_list(storage, out, &external, true)
    }
}

/// Lists links that were not checked at all
pub struct NotCheckedReport;

impl Report for NotCheckedReport {
    fn name(&self) -> &'static str {
        "notchkd"
    }

    fn title(&self) -> &'static str {
        "not checked"
    }

    fn description(&self) -> &'static str {
        "This is the list of all urls that were encountered but not checked at all \
         during the examination of the website."
    }

    fn output_file(&self) -> Option<&'static str> {
        Some("notchkd.html")
    }

    fn generate(
        &self,
        storage: &dyn Storage,
        _site: &Site,
        out: &mut ReportWriter,
    ) -> ReportResult<()> {
        let yanked: Vec<Link> = storage
            .all_links()?
            .into_iter()
            .filter(|l| l.yanked.is_some())
            .collect();
        if yanked.is_empty() {
            out.description("All links have been checked.");
            return Ok(());
        }
        out.description(self.description());
        write_list(storage, out, &yanked, true)
    }
}
