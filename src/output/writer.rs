//! Shared HTML writing for report pages
//!
//! Every report page has the same frame: a header naming the site, a
//! navigation bar linking all reports, the report body and a footer. The
//! `ReportWriter` renders that frame and provides the helpers reports use
//! to present links.

use crate::config::Config;
use crate::output::traits::{ReportError, ReportResult};
use crate::storage::{Link, Storage};
use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the stylesheet installed next to the reports
pub const STYLESHEET_FILE: &str = "webcheck.css";

const STYLESHEET: &str = include_str!("webcheck.css");

/// A report as it appears in the navigation bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub file: Option<&'static str>,
}

/// Writes report pages into the output directory
pub struct ReportWriter {
    directory: PathBuf,
    overwrite: bool,
    links_in_new_window: bool,
    parent_list_length: usize,
    site_title: String,
    site_url: String,
    reports: Vec<NavEntry>,
    generated: DateTime<Utc>,
    current: Option<(&'static str, &'static str)>,
    buffer: String,
}

impl ReportWriter {
    /// Creates a writer
    ///
    /// # Arguments
    ///
    /// * `config` - Supplies the output directory and presentation options
    /// * `site_title` - Title of the main page of the site
    /// * `site_url` - URL of the main page of the site
    /// * `reports` - All configured reports, in navigation order
    pub fn new(
        config: &Config,
        site_title: impl Into<String>,
        site_url: impl Into<String>,
        reports: Vec<NavEntry>,
    ) -> Self {
        Self {
            directory: config.output.directory.clone(),
            overwrite: config.output.overwrite,
            links_in_new_window: config.report.links_in_new_window,
            parent_list_length: config.report.parent_list_length,
            site_title: site_title.into(),
            site_url: site_url.into(),
            reports,
            generated: Utc::now(),
            current: None,
            buffer: String::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// All configured reports, including those without an output file
    pub fn reports(&self) -> &[NavEntry] {
        &self.reports
    }

    /// Creates the output directory and installs the stylesheet
    pub fn prepare(&self) -> ReportResult<()> {
        std::fs::create_dir_all(&self.directory)?;
        self.write_file(STYLESHEET_FILE, STYLESHEET)?;
        Ok(())
    }

    /// Starts a new page and writes its header and navigation bar
    pub fn begin(&mut self, title: &'static str, file: &'static str) {
        self.current = Some((title, file));
        self.buffer.clear();

        let header = format!(
            "<!DOCTYPE html>\n\
             <html>\n \
             <head>\n  \
             <meta charset=\"utf-8\">\n  \
             <title>Webcheck report for {site_title} ({title})</title>\n  \
             <link rel=\"stylesheet\" type=\"text/css\" href=\"{stylesheet}\">\n  \
             <meta name=\"generator\" content=\"webcheck {version}\">\n \
             </head>\n \
             <body>\n  \
             <h1 class=\"basename\">Webcheck report for <a href=\"{site_url}\">{site_title}</a></h1>\n",
            site_title = encode_text(&self.site_title),
            title = encode_text(title),
            stylesheet = STYLESHEET_FILE,
            version = env!("CARGO_PKG_VERSION"),
            site_url = encode_double_quoted_attribute(&self.site_url),
        );
        self.buffer.push_str(&header);

        self.buffer.push_str("  <ul class=\"navbar\">\n");
        for entry in &self.reports {
            let Some(target) = entry.file else {
                continue;
            };
            let selected = if target == file { " class=\"selected\"" } else { "" };
            self.buffer.push_str(&format!(
                "   <li><a href=\"{}\"{} title=\"{}\">{}</a></li>\n",
                target,
                selected,
                encode_double_quoted_attribute(entry.description),
                encode_text(entry.title),
            ));
        }
        self.buffer.push_str("  </ul>\n");

        self.buffer
            .push_str(&format!("  <h2>{}</h2>\n  <div class=\"content\">\n", encode_text(title)));
    }

    /// Appends raw HTML to the current page
    pub fn write(&mut self, html: &str) {
        self.buffer.push_str(html);
    }

    /// Writes a paragraph describing the page
    pub fn description(&mut self, text: &str) {
        self.buffer.push_str(&format!(
            "   <p class=\"description\">\n    {}\n   </p>\n",
            encode_text(text)
        ));
    }

    /// Writes the footer and stores the current page
    ///
    /// # Returns
    ///
    /// The path of the written file
    pub fn finish(&mut self) -> ReportResult<PathBuf> {
        let (_, file) = self.current.take().ok_or(ReportError::NoPage)?;
        self.buffer.push_str(&format!(
            "  </div>\n  \
             <p class=\"footer\">\n   \
             Generated {} by webcheck {}\n  \
             </p>\n \
             </body>\n\
             </html>\n",
            self.generated.format("%Y-%m-%d %H:%M:%S UTC"),
            env!("CARGO_PKG_VERSION"),
        ));
        let content = std::mem::take(&mut self.buffer);
        self.write_file(file, &content)
    }

    /// Writes a file into the output directory
    ///
    /// An existing file is kept as `<name>~` unless overwriting is enabled.
    pub fn write_file(&self, name: &str, content: impl AsRef<[u8]>) -> ReportResult<PathBuf> {
        let path = self.directory.join(name);
        if path.exists() && !self.overwrite {
            let backup = self.directory.join(format!("{}~", name));
            debug!("Keeping previous {} as {}", path.display(), backup.display());
            std::fs::rename(&path, &backup).map_err(|source| ReportError::Write {
                file: name.to_string(),
                source,
            })?;
        }
        std::fs::write(&path, content).map_err(|source| ReportError::Write {
            file: name.to_string(),
            source,
        })?;
        Ok(path)
    }

    /// Renders an HTML link to `link` with an informative tooltip
    ///
    /// # Arguments
    ///
    /// * `storage` - Used to look up parents and redirect targets
    /// * `link` - The link to present
    /// * `title` - Link text; defaults to the page title or the URL
    pub fn make_link(
        &self,
        storage: &dyn Storage,
        link: &Link,
        title: Option<&str>,
    ) -> ReportResult<String> {
        let class = if link.is_internal() { "internal" } else { "external" };
        let target = if self.links_in_new_window {
            "target=\"_blank\" "
        } else {
            ""
        };
        let title = title.unwrap_or_else(|| link_title(link));
        Ok(format!(
            "<a href=\"{}\" {}class=\"{}\" title=\"{}\">{}</a>",
            encode_double_quoted_attribute(&link.url),
            target,
            class,
            encode_double_quoted_attribute(&link_info(storage, link)?),
            encode_text(title),
        ))
    }

    /// Writes the list of pages that reference `link`
    pub fn print_parents(
        &mut self,
        storage: &dyn Storage,
        link: &Link,
        indent: &str,
    ) -> ReportResult<()> {
        let mut parents = storage.parents(link.id)?;
        if parents.is_empty() {
            return Ok(());
        }
        parents.sort_by(|a, b| (&a.title, &a.url).cmp(&(&b.title, &b.url)));

        let mut html = format!(
            "{indent}<div class=\"parents\">\n{indent} referenced from:\n{indent} <ul>\n",
            indent = indent
        );
        for parent in parents.iter().take(self.parent_list_length) {
            html.push_str(&format!(
                "{}  <li>{}</li>\n",
                indent,
                self.make_link(storage, parent, None)?
            ));
        }
        if parents.len() > self.parent_list_length {
            html.push_str(&format!(
                "{}  <li class=\"more\">and {} more</li>\n",
                indent,
                parents.len() - self.parent_list_length
            ));
        }
        html.push_str(&format!("{indent} </ul>\n{indent}</div>\n", indent = indent));
        self.write(&html);
        Ok(())
    }
}

/// Returns the title of a link, or its URL when it has none
pub fn link_title(link: &Link) -> &str {
    match link.title.as_deref() {
        Some(title) if !title.is_empty() => title,
        _ => &link.url,
    }
}

/// Formats a size in bytes for humans (e.g. `512`, `1.5K`, `12M`)
pub fn format_size(bytes: u64) -> String {
    const K: f64 = 1024.0;
    let value = bytes as f64;
    let (scaled, unit) = if value > K * K * 999.0 {
        (value / (K * K * K), "G")
    } else if value > K * 999.0 {
        (value / (K * K), "M")
    } else if value >= K {
        (value / K, "K")
    } else {
        return bytes.to_string();
    };

    // keep the number within three characters
    let mut text = format!("{:.1}", scaled);
    if text.len() > 3 {
        if let Some(dot) = text.find('.') {
            text.truncate(dot);
        }
    }
    format!("{}{}", text, unit)
}

/// Summarizes what is known about a link, one fact per line
pub fn link_info(storage: &dyn Storage, link: &Link) -> ReportResult<String> {
    let mut info = vec![format!("url: {}", link.url)];
    if let Some(status) = &link.status {
        info.push(status.clone());
    }
    if let Some(title) = &link.title {
        info.push(format!("title: {}", title.trim()));
    }
    if let Some(author) = &link.author {
        info.push(format!("author: {}", author.trim()));
    }

    let mut kind = if link.is_internal() {
        "internal link".to_string()
    } else {
        "external link".to_string()
    };
    if let Some(reason) = &link.yanked {
        kind.push_str(&format!(", not checked ({})", reason));
    }
    info.push(kind);

    if link.is_redirect() {
        match storage.children(link.id)?.first() {
            Some(target) => info.push(format!("redirect: {}", target.url)),
            None => info.push("redirect (not followed)".to_string()),
        }
    }
    match storage.count_parents(link.id)? {
        0 => {}
        1 => info.push("linked from 1 page".to_string()),
        n => info.push(format!("linked from {} pages", n)),
    }
    if let Some(mtime) = link.mtime {
        info.push(format!("last modified: {}", mtime.format("%a %b %e %H:%M:%S %Y")));
    }
    if let Some(size) = link.size {
        info.push(format!("size: {}", format_size(size)));
    }
    if let Some(mimetype) = &link.mimetype {
        info.push(format!("mime-type: {}", mimetype));
    }
    if let Some(encoding) = &link.encoding {
        info.push(format!("encoding: {}", encoding));
    }
    for problem in storage.linkproblems(link.id)? {
        info.push(format!("problem: {}", problem));
    }
    Ok(info.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;
    use tempfile::TempDir;

    fn writer_in(dir: &Path, overwrite: bool) -> ReportWriter {
        let mut config = Config::default();
        config.output.directory = dir.to_path_buf();
        config.output.overwrite = overwrite;
        ReportWriter::new(
            &config,
            "Example <site>",
            "http://example.com/",
            vec![
                NavEntry {
                    name: "urllist",
                    title: "url list",
                    description: "all urls",
                    file: Some("urllist.html"),
                },
                NavEntry {
                    name: "anchors",
                    title: "missing anchors",
                    description: "anchor checks",
                    file: None,
                },
            ],
        )
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0");
        assert_eq!(format_size(1023), "1023");
        assert_eq!(format_size(1536), "1.5K");
        assert_eq!(format_size(200 * 1024), "200K");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0M");
    }

    #[test]
    fn test_link_title_falls_back_to_url() {
        let mut link = Link::new(1, "http://example.com/");
        assert_eq!(link_title(&link), "http://example.com/");
        link.title = Some("Home".to_string());
        assert_eq!(link_title(&link), "Home");
    }

    #[test]
    fn test_make_link() {
        let dir = TempDir::new().unwrap();
        let writer = writer_in(dir.path(), true);
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut link = storage.get_or_create("http://example.com/?a=1&b=2").unwrap();
        link.is_internal = Some(true);
        link.title = Some("Fish & Chips".to_string());

        let html = writer.make_link(&storage, &link, None).unwrap();

        assert!(html.starts_with("<a href=\"http://example.com/?a=1&amp;b=2\" class=\"internal\""));
        assert!(html.ends_with(">Fish &amp; Chips</a>"));
        assert!(html.contains("internal link"));
    }

    #[test]
    fn test_page_frame_and_backup() {
        let dir = TempDir::new().unwrap();
        let mut writer = writer_in(dir.path(), false);
        writer.prepare().unwrap();

        writer.begin("url list", "urllist.html");
        writer.write("   <ol></ol>\n");
        let path = writer.finish().unwrap();

        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("Webcheck report for Example &lt;site&gt;"));
        assert!(html.contains("<a href=\"urllist.html\" class=\"selected\""));
        assert!(!html.contains("missing anchors"));
        assert!(html.contains("<ol></ol>"));
        assert!(dir.path().join(STYLESHEET_FILE).exists());

        writer.begin("url list", "urllist.html");
        writer.finish().unwrap();
        assert!(dir.path().join("urllist.html~").exists());
    }

    #[test]
    fn test_finish_without_page() {
        let dir = TempDir::new().unwrap();
        let mut writer = writer_in(dir.path(), true);
        assert!(matches!(writer.finish(), Err(ReportError::NoPage)));
    }
}
