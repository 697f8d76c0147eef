//! Report traits and types
//!
//! This module defines the trait interface for report generators and the
//! error type shared by the output layer.

use crate::config::Config;
use crate::output::writer::ReportWriter;
use crate::storage::{Link, RunRecord, Storage, StorageError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while generating reports
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report {file}: {source}")]
    Write {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("No page is being written")]
    NoPage,
}

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;

/// What the reports know about the checked site besides the link graph
#[derive(Debug, Clone)]
pub struct Site {
    /// Terminal links of the base URLs, the roots of the site map
    pub bases: Vec<Link>,

    /// The effective configuration of the crawl
    pub config: Config,

    /// The run that produced the graph, if one was recorded
    pub run: Option<RunRecord>,
}

impl Site {
    pub fn new(bases: Vec<Link>, config: Config) -> Self {
        Self {
            bases,
            config,
            run: None,
        }
    }

    /// The link the site is named after
    pub fn main_link(&self) -> Option<&Link> {
        self.bases.first()
    }
}

/// A report generator
///
/// Reports run in two passes over the finished graph. All `postprocess`
/// hooks run first, so they can annotate pages with problems that other
/// reports then present. `generate` writes the report page.
pub trait Report {
    /// Short identifier used in the configuration
    fn name(&self) -> &'static str;

    /// Human readable title used in the navigation bar
    fn title(&self) -> &'static str;

    /// One sentence about what the report lists
    fn description(&self) -> &'static str;

    /// File the report is written to; `None` for reports that only
    /// postprocess
    fn output_file(&self) -> Option<&'static str> {
        None
    }

    /// Annotates the graph after depths have been assigned
    fn postprocess(&self, _storage: &mut dyn Storage, _site: &Site) -> ReportResult<()> {
        Ok(())
    }

    /// Writes the body of the report page
    fn generate(
        &self,
        _storage: &dyn Storage,
        _site: &Site,
        _out: &mut ReportWriter,
    ) -> ReportResult<()> {
        Ok(())
    }

    /// Writes the output file, by default an HTML page around `generate`
    fn render(
        &self,
        storage: &dyn Storage,
        site: &Site,
        out: &mut ReportWriter,
        file: &'static str,
    ) -> ReportResult<PathBuf> {
        out.begin(self.title(), file);
        self.generate(storage, site, out)?;
        out.finish()
    }
}
