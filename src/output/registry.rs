//! The ordered set of configured reports

use crate::output::reports::create_report;
use crate::output::traits::{Report, ReportResult, Site};
use crate::output::writer::{link_title, NavEntry, ReportWriter};
use crate::storage::Storage;
use crate::{ConfigError, ConfigResult};
use std::path::PathBuf;
use tracing::{debug, info};

/// Reports in the order they were configured
pub struct ReportRegistry {
    reports: Vec<Box<dyn Report>>,
}

impl ReportRegistry {
    /// Builds the registry from configured plugin names
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` for a name no report is registered
    /// under.
    pub fn from_names(names: &[String]) -> ConfigResult<Self> {
        let reports = names
            .iter()
            .map(|name| {
                create_report(name).ok_or_else(|| {
                    ConfigError::Validation(format!("Unknown report plugin '{}'", name))
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?;
        Ok(Self { reports })
    }

    pub fn reports(&self) -> &[Box<dyn Report>] {
        &self.reports
    }

    /// Navigation bar entries for all reports
    pub fn nav_entries(&self) -> Vec<NavEntry> {
        self.reports
            .iter()
            .map(|r| NavEntry {
                name: r.name(),
                title: r.title(),
                description: r.description(),
                file: r.output_file(),
            })
            .collect()
    }

    /// Runs the postprocess hook of every report
    pub fn postprocess(&self, storage: &mut dyn Storage, site: &Site) -> ReportResult<()> {
        for report in &self.reports {
            debug!("postprocessing {}", report.name());
            report.postprocess(storage, site)?;
        }
        Ok(())
    }

    /// Writes the page of every report that has an output file
    ///
    /// # Returns
    ///
    /// The paths of the written files, in registry order
    pub fn generate(&self, storage: &dyn Storage, site: &Site) -> ReportResult<Vec<PathBuf>> {
        let (site_title, site_url) = match site.main_link() {
            Some(link) => (link_title(link).to_string(), link.url.clone()),
            None => (String::new(), String::new()),
        };
        let mut out = ReportWriter::new(&site.config, site_title, site_url, self.nav_entries());
        out.prepare()?;

        let mut written = Vec::new();
        for report in &self.reports {
            let Some(file) = report.output_file() else {
                continue;
            };
            info!("generating {}", report.name());
            written.push(report.render(storage, site, &mut out, file)?);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::SqliteStorage;
    use tempfile::TempDir;

    #[test]
    fn test_unknown_plugin_rejected() {
        let names = vec!["sitemap".to_string(), "bogus".to_string()];
        assert!(matches!(
            ReportRegistry::from_names(&names),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_generate_writes_report_files() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut home = storage.get_or_create("http://example.com/").unwrap();
        home.is_internal = Some(true);
        home.is_page = true;
        home.title = Some("Example".to_string());
        storage.save_link(&home).unwrap();

        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output.directory = dir.path().to_path_buf();
        let registry = ReportRegistry::from_names(&config.report.plugins).unwrap();
        let site = Site::new(vec![home], config);

        registry.postprocess(&mut storage, &site).unwrap();
        let written = registry.generate(&storage, &site).unwrap();

        // anchors only postprocesses
        assert_eq!(written.len(), 12);
        assert!(dir.path().join("index.html").exists());
        assert!(dir.path().join("about.html").exists());
        assert!(dir.path().join("webcheck.css").exists());
        let index = std::fs::read_to_string(dir.path().join("index.html")).unwrap();
        assert!(index.contains("Webcheck report for <a href=\"http://example.com/\">Example</a>"));
        assert!(!dir.path().join("urls.csv").exists());
    }

    #[test]
    fn test_csv_report_on_request() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut home = storage.get_or_create("http://example.com/").unwrap();
        home.is_internal = Some(true);
        storage.save_link(&home).unwrap();

        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output.directory = dir.path().to_path_buf();
        config.report.plugins = vec!["sitemap".to_string(), "csvfile".to_string()];
        let registry = ReportRegistry::from_names(&config.report.plugins).unwrap();
        let site = Site::new(vec![home], config);

        let written = registry.generate(&storage, &site).unwrap();

        assert_eq!(written, vec![dir.path().join("index.html"), dir.path().join("urls.csv")]);
        let csv = std::fs::read_to_string(dir.path().join("urls.csv")).unwrap();
        assert!(csv.starts_with("URL,Title,Depth,Internal,Fetched,Status,Size\n"));
        // the navigation bar points at the CSV file
        let index = std::fs::read_to_string(dir.path().join("index.html")).unwrap();
        assert!(index.contains("href=\"urls.csv\""));
    }
}
