//! The report plugins
//!
//! Each plugin is a unit struct implementing [`Report`]. The set is
//! static; [`create_report`] maps configuration names to instances.

mod about;
mod age;
mod csvfile;
mod listings;
mod problems;
mod sitemap;
mod size;

pub use about::AboutReport;
pub use age::{NewReport, OldReport};
pub use csvfile::CsvReport;
pub use listings::{ExternalReport, ImagesReport, NotCheckedReport, UrlListReport};
pub use problems::{AnchorsReport, BadLinksReport, NoTitlesReport, ProblemsReport};
pub use sitemap::SitemapReport;
pub use size::{total_size, SizeReport};

use crate::output::traits::Report;

/// Creates the report registered under `name`
pub fn create_report(name: &str) -> Option<Box<dyn Report>> {
    let report: Box<dyn Report> = match name {
        "anchors" => Box::new(AnchorsReport),
        "sitemap" => Box::new(SitemapReport),
        "urllist" => Box::new(UrlListReport),
        "images" => Box::new(ImagesReport),
        "external" => Box::new(ExternalReport),
        "notchkd" => Box::new(NotCheckedReport),
        "badlinks" => Box::new(BadLinksReport),
        "old" => Box::new(OldReport),
        "new" => Box::new(NewReport),
        "size" => Box::new(SizeReport),
        "notitles" => Box::new(NoTitlesReport),
        "problems" => Box::new(ProblemsReport),
        "about" => Box::new(AboutReport),
        "csvfile" => Box::new(CsvReport),
        _ => return None,
    };
    Some(report)
}
