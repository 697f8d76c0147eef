//! Local file fetcher
//!
//! Serves `file:` URLs from the local filesystem. Directories are handled
//! like a web server would: an index file if present, a listing otherwise.

use crate::crawler::schemes::{FetchOutcome, FetchRequest, FetchResponse, SchemeFetcher};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Fetches `file` URLs
pub struct FileFetcher {
    index_files: Vec<String>,
}

impl FileFetcher {
    /// Creates a fetcher
    ///
    /// # Arguments
    ///
    /// * `index_files` - File names served in place of a directory, in order
    pub fn new(index_files: Vec<String>) -> Self {
        Self { index_files }
    }

    async fn fetch_directory(
        &self,
        url: &Url,
        path: &Path,
        accepted_mimetypes: &[String],
    ) -> FetchResponse {
        // mirror what web servers do for directories without a trailing slash
        if !url.path().ends_with('/') {
            debug!("Directory referenced without trailing slash: {}", url);
            let mut target = url.clone();
            target.set_path(&format!("{}/", url.path()));
            return FetchResponse::new(FetchOutcome::Redirect(target.to_string()));
        }

        for index in &self.index_files {
            let candidate = path.join(index);
            if tokio::fs::metadata(&candidate)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false)
            {
                debug!("Using {} for directory {}", index, url);
                return fetch_file(&candidate, accepted_mimetypes).await;
            }
        }

        match list_directory(url, path).await {
            Ok(entries) => FetchResponse::new(FetchOutcome::Listing(entries)),
            Err(e) => FetchResponse::failed(e.to_string()),
        }
    }
}

async fn list_directory(url: &Url, path: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = Vec::new();
    let mut dir = tokio::fs::read_dir(path).await?;
    while let Some(entry) = dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);

        let mut child = url.clone();
        if let Ok(mut segments) = child.path_segments_mut() {
            segments.pop_if_empty().push(&name);
            if is_dir {
                segments.push("");
            }
        }
        entries.push(child.to_string());
    }
    entries.sort();
    Ok(entries)
}

async fn fetch_file(path: &Path, accepted_mimetypes: &[String]) -> FetchResponse {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) => return FetchResponse::failed(e.to_string()),
    };

    let mut response = FetchResponse::new(FetchOutcome::NoContent);
    response.size = Some(metadata.len());
    response.mtime = metadata.modified().ok().map(DateTime::<Utc>::from);
    response.mimetype = guess_mimetype(path).map(String::from);

    let accepted = response
        .mimetype
        .as_ref()
        .map_or(false, |m| accepted_mimetypes.contains(m));
    if accepted {
        response.outcome = match tokio::fs::read(path).await {
            Ok(content) => FetchOutcome::Content(content),
            Err(e) => FetchOutcome::Failed(e.to_string()),
        };
    }
    response
}

/// Guesses a mimetype from the file extension
pub fn guess_mimetype(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let mimetype = match extension.as_str() {
        "html" | "htm" => "text/html",
        "shtml" => "text/x-server-parsed-html",
        "xhtml" => "application/xhtml+xml",
        "css" => "text/css",
        "js" => "application/javascript",
        "txt" => "text/plain",
        "xml" => "application/xml",
        "json" => "application/json",
        "png" => "image/png",
        "gif" => "image/gif",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(mimetype)
}

#[async_trait]
impl SchemeFetcher for FileFetcher {
    fn schemes(&self) -> &[&'static str] {
        &["file"]
    }

    async fn fetch(&self, request: &FetchRequest, accepted_mimetypes: &[String]) -> FetchResponse {
        let url = match Url::parse(&request.url) {
            Ok(url) => url,
            Err(e) => return FetchResponse::failed(format!("invalid file URL: {}", e)),
        };
        let path: PathBuf = match url.to_file_path() {
            Ok(path) => path,
            Err(()) => return FetchResponse::failed(format!("not a local file: {}", url)),
        };

        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => {
                self.fetch_directory(&url, &path, accepted_mimetypes).await
            }
            Ok(_) => fetch_file(&path, accepted_mimetypes).await,
            Err(e) => FetchResponse::failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn html() -> Vec<String> {
        vec!["text/html".to_string()]
    }

    fn fetcher() -> FileFetcher {
        FileFetcher::new(vec!["index.html".to_string()])
    }

    fn request_for(path: &Path, trailing_slash: bool) -> FetchRequest {
        let mut url = Url::from_file_path(path).unwrap().to_string();
        if trailing_slash && !url.ends_with('/') {
            url.push('/');
        }
        FetchRequest { url, referer: None }
    }

    #[test]
    fn test_guess_mimetype() {
        assert_eq!(guess_mimetype(Path::new("a/B.HTML")), Some("text/html"));
        assert_eq!(guess_mimetype(Path::new("style.css")), Some("text/css"));
        assert_eq!(guess_mimetype(Path::new("README")), None);
    }

    #[tokio::test]
    async fn test_fetch_html_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("page.html");
        std::fs::write(&file, "<html><title>x</title></html>").unwrap();

        let response = fetcher().fetch(&request_for(&file, false), &html()).await;

        assert_eq!(response.mimetype.as_deref(), Some("text/html"));
        assert_eq!(response.size, Some(29));
        assert!(response.mtime.is_some());
        assert!(matches!(response.outcome, FetchOutcome::Content(_)));
    }

    #[tokio::test]
    async fn test_unaccepted_file_not_read() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("logo.png");
        std::fs::write(&file, [0u8; 4]).unwrap();

        let response = fetcher().fetch(&request_for(&file, false), &html()).await;

        assert_eq!(response.mimetype.as_deref(), Some("image/png"));
        assert_eq!(response.outcome, FetchOutcome::NoContent);
    }

    #[tokio::test]
    async fn test_directory_without_slash_redirects() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();

        let request = request_for(&sub, false);
        let response = fetcher().fetch(&request, &html()).await;

        assert_eq!(
            response.outcome,
            FetchOutcome::Redirect(format!("{}/", request.url))
        );
    }

    #[tokio::test]
    async fn test_directory_index_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();

        let response = fetcher().fetch(&request_for(dir.path(), true), &html()).await;

        assert_eq!(response.mimetype.as_deref(), Some("text/html"));
        assert!(matches!(response.outcome, FetchOutcome::Content(_)));
    }

    #[tokio::test]
    async fn test_directory_listing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a file.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let request = request_for(dir.path(), true);
        let response = fetcher().fetch(&request, &html()).await;

        assert_eq!(
            response.outcome,
            FetchOutcome::Listing(vec![
                format!("{}a%20file.txt", request.url),
                format!("{}nested/", request.url),
            ])
        );
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let response = fetcher()
            .fetch(&request_for(&dir.path().join("gone.html"), false), &html())
            .await;
        assert!(matches!(response.outcome, FetchOutcome::Failed(_)));
    }
}
