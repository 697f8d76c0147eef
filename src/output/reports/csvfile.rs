//! Machine readable list of every link

use crate::output::traits::{Report, ReportResult, Site};
use crate::output::writer::ReportWriter;
use crate::storage::{Link, Storage};
use std::path::PathBuf;

const HEADER: [&str; 7] = ["URL", "Title", "Depth", "Internal", "Fetched", "Status", "Size"];

/// Writes all links with their main properties as comma separated values
pub struct CsvReport;

fn record(link: &Link) -> [String; 7] {
    let fetched = match (&link.fetched, &link.yanked) {
        (Some(fetched), _) => fetched.to_rfc3339(),
        (None, Some(reason)) => reason.to_string(),
        (None, None) => String::new(),
    };
    [
        link.url.clone(),
        link.title.clone().unwrap_or_default(),
        link.depth.map(|d| d.to_string()).unwrap_or_default(),
        if link.is_internal() { "internal" } else { "external" }.to_string(),
        fetched,
        link.status.clone().unwrap_or_default(),
        link.size.map(|s| s.to_string()).unwrap_or_default(),
    ]
}

impl Report for CsvReport {
    fn name(&self) -> &'static str {
        "csvfile"
    }

    fn title(&self) -> &'static str {
        "CSV file"
    }

    fn description(&self) -> &'static str {
        "This is a list of all urls with their properties in CSV format."
    }

    fn output_file(&self) -> Option<&'static str> {
        Some("urls.csv")
    }

    fn render(
        &self,
        storage: &dyn Storage,
        _site: &Site,
        out: &mut ReportWriter,
        file: &'static str,
    ) -> ReportResult<PathBuf> {
        let mut content = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut content);
            writer.write_record(HEADER)?;
            for link in storage.all_links()? {
                writer.write_record(record(&link))?;
            }
            writer.flush()?;
        }
        out.write_file(file, &content)
    }
}
