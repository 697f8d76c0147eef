//! Summary of the run and the reports that were generated

use crate::output::stats::load_statistics;
use crate::output::traits::{Report, ReportResult, Site};
use crate::output::writer::ReportWriter;
use crate::state::LinkState;
use crate::storage::Storage;
use html_escape::encode_text;

/// Describes the run that produced the report
pub struct AboutReport;

impl Report for AboutReport {
    fn name(&self) -> &'static str {
        "about"
    }

    fn title(&self) -> &'static str {
        "about webcheck"
    }

    fn description(&self) -> &'static str {
        "This is information about the run that generated this report."
    }

    fn output_file(&self) -> Option<&'static str> {
        Some("about.html")
    }

    fn generate(
        &self,
        storage: &dyn Storage,
        site: &Site,
        out: &mut ReportWriter,
    ) -> ReportResult<()> {
        let mut html = format!(
            "   <p>\n    This is a link checking report generated by webcheck {}.\n   </p>\n",
            env!("CARGO_PKG_VERSION")
        );

        if let Some(run) = &site.run {
            html.push_str("   <h3>Run</h3>\n   <ul>\n");
            html.push_str(&format!(
                "    <li>started: {}</li>\n",
                encode_text(&run.started_at)
            ));
            if let Some(finished) = &run.finished_at {
                html.push_str(&format!("    <li>finished: {}</li>\n", encode_text(finished)));
            }
            html.push_str(&format!(
                "    <li>status: {}</li>\n    <li>configuration: <code>{}</code></li>\n   </ul>\n",
                run.status.to_db_string(),
                encode_text(&run.config_hash)
            ));
        }

        let stats = load_statistics(storage)?;
        html.push_str(&format!(
            "   <h3>Links</h3>\n   <p>\n    \
             {} links were found: {} internal and {} external. \
             {} were checked and {} were not.\n   </p>\n",
            stats.total_links,
            stats.internal_links,
            stats.external_links(),
            stats.count(LinkState::Fetched),
            stats.count(LinkState::Yanked) + stats.count(LinkState::Pending),
        ));

        html.push_str("   <h3>Reports</h3>\n   <ul>\n");
        for entry in out.reports() {
            html.push_str(&format!(
                "    <li>\n     <strong>{}</strong><br>\n     {}\n    </li>\n",
                encode_text(entry.title),
                encode_text(entry.description)
            ));
        }
        html.push_str("   </ul>\n");

        out.write(&html);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::output::writer::NavEntry;
    use crate::storage::SqliteStorage;
    use tempfile::TempDir;

    #[test]
    fn test_about_lists_run_and_reports() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("abc123").unwrap();
        storage.complete_run(run_id).unwrap();
        let mut home = storage.get_or_create("http://example.com/").unwrap();
        home.is_internal = Some(true);
        storage.save_link(&home).unwrap();

        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output.directory = dir.path().to_path_buf();
        let mut site = Site::new(vec![home], config.clone());
        site.run = storage.get_latest_run().unwrap();
        let nav = vec![NavEntry {
            name: "about",
            title: "about webcheck",
            description: "run details",
            file: Some("about.html"),
        }];
        let mut out = ReportWriter::new(&config, "Home", "http://example.com/", nav);

        out.begin("about webcheck", "about.html");
        AboutReport.generate(&storage, &site, &mut out).unwrap();
        let html = std::fs::read_to_string(out.finish().unwrap()).unwrap();

        assert!(html.contains("abc123"));
        assert!(html.contains("status: completed"));
        assert!(html.contains("1 links were found"));
        assert!(html.contains("run details"));
    }
}
