//! Fetch dispatcher
//!
//! Routes a link to the fetcher registered for its scheme and the fetched
//! content to the parser registered for its mimetype, then records the
//! outcome on the link and in the graph.

use crate::config::Config;
use crate::crawler::context::LinkContext;
use crate::crawler::parsers::{ContentParser, CssParser, HtmlParser};
use crate::crawler::schemes::{
    FetchOutcome, FetchRequest, FetchResponse, FileFetcher, FtpFetcher, HttpFetcher,
    SchemeFetcher,
};
use crate::state::YankReason;
use crate::storage::{Link, Storage};
use crate::WebcheckError;
use chrono::Utc;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Registered scheme fetchers and content parsers for one crawl
pub struct FetchDispatcher {
    fetchers: Vec<Box<dyn SchemeFetcher>>,
    parsers: Vec<Box<dyn ContentParser>>,
    max_redirects: u32,
}

impl FetchDispatcher {
    /// Creates a dispatcher without any fetchers or parsers
    pub fn new(max_redirects: u32) -> Self {
        Self {
            fetchers: Vec::new(),
            parsers: Vec::new(),
            max_redirects,
        }
    }

    /// Creates a dispatcher with the built-in fetchers and parsers
    ///
    /// # Arguments
    ///
    /// * `config` - Supplies the redirect limit, timeout and directory index files
    /// * `client` - HTTP client shared with robots.txt retrieval
    pub fn with_defaults(config: &Config, client: Client) -> Self {
        let mut dispatcher = Self::new(config.crawler.redirect_depth);
        dispatcher.register_fetcher(Box::new(HttpFetcher::new(client)));
        dispatcher.register_fetcher(Box::new(FileFetcher::new(
            config.crawler.file_indexes.clone(),
        )));
        dispatcher.register_fetcher(Box::new(FtpFetcher::new(Duration::from_secs(
            config.crawler.timeout,
        ))));
        dispatcher.register_parser(Box::new(HtmlParser));
        dispatcher.register_parser(Box::new(CssParser));
        dispatcher
    }

    /// Adds a fetcher; earlier registrations win for a shared scheme
    pub fn register_fetcher(&mut self, fetcher: Box<dyn SchemeFetcher>) {
        self.fetchers.push(fetcher);
    }

    /// Adds a parser; earlier registrations win for a shared mimetype
    pub fn register_parser(&mut self, parser: Box<dyn ContentParser>) {
        self.parsers.push(parser);
    }

    fn fetcher_for(&self, scheme: &str) -> Option<&dyn SchemeFetcher> {
        self.fetchers
            .iter()
            .find(|f| f.schemes().contains(&scheme))
            .map(|f| f.as_ref())
    }

    fn parser_for(&self, mimetype: &str) -> Option<&dyn ContentParser> {
        self.parsers
            .iter()
            .find(|p| p.mimetypes().contains(&mimetype))
            .map(|p| p.as_ref())
    }

    /// Mimetypes for which a parser is registered
    pub fn accepted_mimetypes(&self) -> Vec<String> {
        let mut mimetypes: Vec<String> = Vec::new();
        for parser in &self.parsers {
            for mimetype in parser.mimetypes() {
                if !mimetypes.iter().any(|m| m == mimetype) {
                    mimetypes.push(mimetype.to_string());
                }
            }
        }
        mimetypes
    }

    /// Fetches a link and records what was found
    ///
    /// The link is marked as fetched and saved before any I/O happens so it
    /// is attempted at most once. Fetch and parse failures end up as link or
    /// page problems; only storage errors are returned.
    ///
    /// # Arguments
    ///
    /// * `storage` - The link graph
    /// * `link` - A classified link that is not yanked; updated in place
    pub async fn fetch(&self, storage: &mut dyn Storage, link: &mut Link) -> crate::Result<()> {
        let scheme = link.scheme().unwrap_or_default();
        let Some(fetcher) = self.fetcher_for(&scheme) else {
            debug!("No fetcher for {}", link.url);
            link.yanked = Some(YankReason::UnsupportedScheme(scheme));
            storage.save_link(link)?;
            return Ok(());
        };

        link.fetched = Some(Utc::now());
        storage.save_link(link)?;

        // content of external links is never looked at
        let accepted = if link.is_internal() {
            self.accepted_mimetypes()
        } else {
            Vec::new()
        };
        let request = FetchRequest {
            url: link.url.clone(),
            referer: storage.parents(link.id)?.into_iter().next().map(|p| p.url),
        };

        info!("{}", link.url);
        let response = fetcher.fetch(&request, &accepted).await;

        self.apply(storage, link, response)?;
        storage.save_link(link)?;
        Ok(())
    }

    /// Applies a fetch response to the link
    fn apply(
        &self,
        storage: &mut dyn Storage,
        link: &mut Link,
        response: FetchResponse,
    ) -> crate::Result<()> {
        link.status = response.status;
        link.mimetype = response.mimetype;
        link.size = response.size;
        link.mtime = response.mtime;

        let parser = link.mimetype.as_deref().and_then(|m| self.parser_for(m));
        let mut ctx = LinkContext::new(storage, link, self.max_redirects);

        if let Some(encoding) = &response.encoding {
            ctx.set_encoding(encoding)?;
        }
        for problem in &response.problems {
            ctx.add_linkproblem(problem)?;
        }

        match response.outcome {
            FetchOutcome::Content(content) => {
                if let Some(parser) = parser {
                    match parser.parse(&content, &mut ctx) {
                        Ok(()) => {}
                        Err(WebcheckError::Storage(e)) => return Err(e.into()),
                        Err(e) => ctx.add_pageproblem(&format!("problem parsing page: {}", e))?,
                    }
                }
            }
            FetchOutcome::NoContent => {}
            FetchOutcome::Listing(entries) => {
                ctx.mark_page();
                for entry in entries {
                    ctx.add_child(&entry)?;
                }
            }
            FetchOutcome::Redirect(target) if target.trim().is_empty() => {
                ctx.add_linkproblem("redirect without a target location")?;
            }
            FetchOutcome::Redirect(target) => ctx.redirect(target.trim())?,
            FetchOutcome::Failed(message) => ctx.add_linkproblem(&message)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::schemes::build_http_client;
    use crate::storage::SqliteStorage;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Rejects everything it is given
    struct BrokenParser;

    impl ContentParser for BrokenParser {
        fn mimetypes(&self) -> &[&'static str] {
            &["text/plain"]
        }

        fn parse(&self, _content: &[u8], ctx: &mut LinkContext<'_>) -> crate::Result<()> {
            Err(WebcheckError::Parse {
                url: ctx.url().to_string(),
                message: "unreadable".to_string(),
            })
        }
    }

    fn dispatcher() -> FetchDispatcher {
        let config = Config::default();
        let client = build_http_client(&config).unwrap();
        FetchDispatcher::with_defaults(&config, client)
    }

    fn internal_link(storage: &mut SqliteStorage, url: &str) -> Link {
        let mut link = storage.get_or_create(url).unwrap();
        link.is_internal = Some(true);
        storage.save_link(&link).unwrap();
        link
    }

    #[test]
    fn test_accepted_mimetypes() {
        let accepted = dispatcher().accepted_mimetypes();
        assert!(accepted.contains(&"text/html".to_string()));
        assert!(accepted.contains(&"text/css".to_string()));
    }

    #[tokio::test]
    async fn test_unsupported_scheme_is_yanked() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut link = internal_link(&mut storage, "gopher://example.com/1/menu");

        dispatcher().fetch(&mut storage, &mut link).await.unwrap();

        let stored = storage.get_link(link.id).unwrap();
        assert_eq!(
            stored.yanked,
            Some(YankReason::UnsupportedScheme("gopher".to_string()))
        );
        assert!(stored.fetched.is_none());
    }

    #[tokio::test]
    async fn test_ftp_link_is_checked() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut link = internal_link(&mut storage, "ftp://127.0.0.1:1/pub/file.txt");

        dispatcher().fetch(&mut storage, &mut link).await.unwrap();

        let stored = storage.get_link(link.id).unwrap();
        assert!(stored.yanked.is_none());
        assert!(stored.fetched.is_some());
        let problems = storage.linkproblems(link.id).unwrap();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].starts_with("FTP error: "));
    }

    #[tokio::test]
    async fn test_not_found_becomes_linkproblem() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut link = internal_link(&mut storage, &format!("{}/missing", server.uri()));

        dispatcher().fetch(&mut storage, &mut link).await.unwrap();

        let stored = storage.get_link(link.id).unwrap();
        assert!(stored.fetched.is_some());
        assert!(!stored.is_page);
        assert_eq!(stored.status.as_deref(), Some("404"));
        assert_eq!(
            storage.linkproblems(link.id).unwrap(),
            vec!["404: Not Found".to_string()]
        );
        assert!(storage.children(link.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_page_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "<!DOCTYPE html><html><head><title>Home</title></head>\
                 <body><a href=\"/about\">about</a><img src=\"/logo.png\"></body></html>",
                "text/html",
            ))
            .mount(&server)
            .await;

        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut link = internal_link(&mut storage, &format!("{}/", server.uri()));

        dispatcher().fetch(&mut storage, &mut link).await.unwrap();

        let stored = storage.get_link(link.id).unwrap();
        assert!(stored.is_page);
        assert_eq!(stored.title.as_deref(), Some("Home"));
        assert_eq!(stored.mimetype.as_deref(), Some("text/html"));
        assert_eq!(
            storage.children(link.id).unwrap()[0].url,
            format!("{}/about", server.uri())
        );
        assert_eq!(
            storage.embedded(link.id).unwrap()[0].url,
            format!("{}/logo.png", server.uri())
        );
    }

    #[tokio::test]
    async fn test_external_content_not_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><a href=\"/x\">x</a></html>", "text/html"),
            )
            .mount(&server)
            .await;

        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut link = storage.get_or_create(&format!("{}/", server.uri())).unwrap();
        link.is_internal = Some(false);
        storage.save_link(&link).unwrap();

        dispatcher().fetch(&mut storage, &mut link).await.unwrap();

        assert!(link.fetched.is_some());
        assert!(!link.is_page);
        assert!(storage.children(link.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_redirect_is_resolved() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/new"))
            .mount(&server)
            .await;

        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut link = internal_link(&mut storage, &format!("{}/old", server.uri()));

        dispatcher().fetch(&mut storage, &mut link).await.unwrap();

        let stored = storage.get_link(link.id).unwrap();
        assert_eq!(stored.redirectdepth, 1);
        assert_eq!(
            storage.children(link.id).unwrap()[0].url,
            format!("{}/new", server.uri())
        );
    }

    #[tokio::test]
    async fn test_parse_error_becomes_pageproblem() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notes.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("notes", "text/plain"))
            .mount(&server)
            .await;

        let mut dispatcher = dispatcher();
        dispatcher.register_parser(Box::new(BrokenParser));

        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut link = internal_link(&mut storage, &format!("{}/notes.txt", server.uri()));

        dispatcher.fetch(&mut storage, &mut link).await.unwrap();

        let problems = storage.pageproblems(link.id).unwrap();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].starts_with("problem parsing page: "));
    }

    #[tokio::test]
    async fn test_directory_listing_children() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();

        let mut url = url::Url::from_directory_path(dir.path()).unwrap().to_string();
        if !url.ends_with('/') {
            url.push('/');
        }
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut link = internal_link(&mut storage, &url);

        dispatcher().fetch(&mut storage, &mut link).await.unwrap();

        assert!(link.is_page);
        let children: Vec<String> = storage
            .children(link.id)
            .unwrap()
            .into_iter()
            .map(|l| l.url)
            .collect();
        assert_eq!(children, vec![format!("{}a.txt", url), format!("{}b.txt", url)]);
    }
}
