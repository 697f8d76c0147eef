//! The view of the link graph handed to scheme fetchers and content parsers
//!
//! A `LinkContext` ties the link being processed to the store so that
//! parsers can report what they find without knowing about persistence.

use crate::crawler::redirect;
use crate::storage::{Link, Storage, StorageResult};
use crate::url::resolve_url;
use encoding_rs::Encoding;
use tracing::debug;

/// Mutable access to one link and the graph it lives in
pub struct LinkContext<'a> {
    storage: &'a mut dyn Storage,
    link: &'a mut Link,
    max_redirects: u32,
}

impl<'a> LinkContext<'a> {
    pub fn new(storage: &'a mut dyn Storage, link: &'a mut Link, max_redirects: u32) -> Self {
        Self {
            storage,
            link,
            max_redirects,
        }
    }

    /// The link being processed
    pub fn link(&self) -> &Link {
        self.link
    }

    pub fn url(&self) -> &str {
        &self.link.url
    }

    /// Resolves a reference found in the content against `base`
    pub fn resolve(&self, base: &str, reference: &str) -> String {
        resolve_url(base, reference)
    }

    /// Registers a navigational link found on this page
    pub fn add_child(&mut self, url: &str) -> StorageResult<()> {
        self.storage.add_child(self.link, url)?;
        Ok(())
    }

    /// Registers a resource embedded in this page
    pub fn add_embed(&mut self, url: &str) -> StorageResult<()> {
        self.storage.add_embed(self.link, url)?;
        Ok(())
    }

    /// Registers an anchor defined on this page
    pub fn add_anchor(&mut self, anchor: &str) -> StorageResult<()> {
        if anchor.is_empty() {
            return Ok(());
        }
        self.storage.add_anchor(self.link, anchor)
    }

    pub fn add_linkproblem(&mut self, message: &str) -> StorageResult<()> {
        self.storage.add_linkproblem(self.link.id, message)
    }

    pub fn add_pageproblem(&mut self, message: &str) -> StorageResult<()> {
        self.storage.add_pageproblem(self.link, message)
    }

    /// Sets the character encoding of the content
    ///
    /// The first known encoding wins. Labels that no decoder knows are
    /// recorded as a page problem.
    pub fn set_encoding(&mut self, label: &str) -> StorageResult<()> {
        let label = label.trim();
        if self.link.encoding.is_some() || label.is_empty() {
            return Ok(());
        }
        if Encoding::for_label(label.as_bytes()).is_some() {
            debug!("Encoding of {} is {}", self.link.url, label);
            self.link.encoding = Some(label.to_lowercase());
            Ok(())
        } else {
            self.add_pageproblem(&format!("unknown encoding: {}", label))
        }
    }

    pub fn set_title(&mut self, title: &str) {
        let title = title.trim();
        if !title.is_empty() {
            self.link.title = Some(title.to_string());
        }
    }

    pub fn set_author(&mut self, author: &str) {
        let author = author.trim();
        if !author.is_empty() {
            self.link.author = Some(author.to_string());
        }
    }

    /// Flags the content as a successfully parsed page
    pub fn mark_page(&mut self) {
        self.link.is_page = true;
    }

    /// Records that this link redirects to `target`
    pub fn redirect(&mut self, target: &str) -> StorageResult<()> {
        redirect::redirect(self.storage, self.link, target, self.max_redirects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;

    fn internal_page(storage: &mut SqliteStorage) -> Link {
        let mut link = storage.get_or_create("http://example.com/").unwrap();
        link.is_internal = Some(true);
        storage.save_link(&link).unwrap();
        link
    }

    #[test]
    fn test_set_encoding_first_wins() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut link = internal_page(&mut storage);
        let mut ctx = LinkContext::new(&mut storage, &mut link, 5);

        ctx.set_encoding("UTF-8").unwrap();
        ctx.set_encoding("iso-8859-1").unwrap();
        assert_eq!(ctx.link().encoding.as_deref(), Some("utf-8"));
    }

    #[test]
    fn test_set_encoding_unknown() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut link = internal_page(&mut storage);
        {
            let mut ctx = LinkContext::new(&mut storage, &mut link, 5);
            ctx.set_encoding("klingon-1").unwrap();
            assert_eq!(ctx.link().encoding, None);
        }
        assert_eq!(
            storage.pageproblems(link.id).unwrap(),
            vec!["unknown encoding: klingon-1".to_string()]
        );
    }

    #[test]
    fn test_add_child_through_context() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut link = internal_page(&mut storage);
        {
            let mut ctx = LinkContext::new(&mut storage, &mut link, 5);
            let target = ctx.resolve("http://example.com/dir/", "../a.html");
            ctx.add_child(&target).unwrap();
            ctx.add_embed("http://example.com/logo.png").unwrap();
            ctx.add_anchor("").unwrap();
            ctx.set_title("  Welcome  ");
            ctx.mark_page();
        }
        assert!(link.is_page);
        assert_eq!(link.title.as_deref(), Some("Welcome"));
        assert_eq!(storage.children(link.id).unwrap()[0].url, "http://example.com/a.html");
        assert_eq!(storage.embedded(link.id).unwrap().len(), 1);
        assert!(storage.anchors(link.id).unwrap().is_empty());
    }
}
