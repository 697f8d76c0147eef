//! Crawl driver - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! checking a site, including:
//! - Preparing the link graph (fresh or resumed) and recording the run
//! - Pulling unfetched links from the store in bounded batches
//! - Classifying and fetching each link inside its own transaction
//! - Handling interrupts so a later run can resume
//! - Postprocessing the finished graph and generating the reports

use crate::config::{compute_config_hash, validate, Config};
use crate::crawler::classifier::Classifier;
use crate::crawler::dispatcher::FetchDispatcher;
use crate::crawler::postprocess::{assign_depths, find_bases};
use crate::crawler::schemes::build_http_client;
use crate::output::{ReportRegistry, Site};
use crate::storage::{open_storage, RunStatus, Storage};
use crate::WebcheckError;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Number of fetched links between two progress messages
const PROGRESS_INTERVAL: usize = 50;

/// Checks one site: owns the link graph and everything needed to grow it
pub struct Crawler {
    config: Config,
    config_hash: String,
    storage: Box<dyn Storage>,
    classifier: Classifier,
    dispatcher: FetchDispatcher,
    registry: ReportRegistry,
}

impl Crawler {
    /// Creates a crawler working on the given store
    ///
    /// # Arguments
    ///
    /// * `config` - The effective configuration
    /// * `storage` - The link graph store
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Configuration is valid and the HTTP client was built
    /// * `Err(WebcheckError)` - Invalid configuration or client setup failure
    pub fn new(config: Config, storage: Box<dyn Storage>) -> crate::Result<Self> {
        validate(&config)?;
        let config_hash = compute_config_hash(&config)?;

        let client = build_http_client(&config)?;
        let classifier = Classifier::new(&config, Some(client.clone()))?;
        let dispatcher = FetchDispatcher::with_defaults(&config, client);
        let registry = ReportRegistry::from_names(&config.report.plugins)?;

        Ok(Self {
            config,
            config_hash,
            storage,
            classifier,
            dispatcher,
            registry,
        })
    }

    /// Creates a crawler on the SQLite store inside the output directory
    pub fn open(config: Config) -> crate::Result<Self> {
        std::fs::create_dir_all(&config.output.directory)?;
        let storage = open_storage(&config.database_path())?;
        Self::new(config, Box::new(storage))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The link graph store
    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Crawls until no unfetched links remain
    pub async fn crawl(&mut self) -> crate::Result<()> {
        self.crawl_until(std::future::pending::<()>()).await
    }

    /// Crawls until no unfetched links remain or `shutdown` completes
    ///
    /// When `shutdown` wins, the changes for the link being processed are
    /// rolled back, the run is marked interrupted and
    /// `WebcheckError::Interrupted` is returned. Everything committed before
    /// stays in the store for a resumed crawl.
    pub async fn crawl_until<F>(&mut self, shutdown: F) -> crate::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let previous = self.storage.get_latest_run()?;
        if self.config.crawler.resume {
            if let Some(run) = previous.filter(|run| run.config_hash != self.config_hash) {
                warn!(
                    "Resuming a crawl started with a different configuration (run {})",
                    run.id
                );
            }
        } else {
            debug!("Starting fresh, clearing the link graph");
            self.storage.truncate()?;
        }

        let run_id = self.storage.create_run(&self.config_hash)?;
        info!("Starting crawl run {}", run_id);

        for url in &self.config.base {
            self.storage.add_base_url(url)?;
        }
        for url in self.storage.base_urls()? {
            self.classifier.add_base(&url);
        }
        if self.classifier.base_urls().is_empty() {
            warn!("No base URLs to crawl");
        }

        let result = self.crawl_loop(shutdown.as_mut()).await;

        let status = match &result {
            Ok(()) => RunStatus::Completed,
            Err(WebcheckError::Interrupted) => RunStatus::Interrupted,
            Err(_) => RunStatus::Failed,
        };
        if let Err(e) = self.storage.update_run_status(run_id, status) {
            warn!("Failed to record the end of run {}: {}", run_id, e);
        }

        result
    }

    async fn crawl_loop<F>(&mut self, mut shutdown: Pin<&mut F>) -> crate::Result<()>
    where
        F: Future<Output = ()>,
    {
        let batch_size = self.config.crawler.batch_size;
        let max_depth = self.config.crawler.max_depth;
        let wait = Duration::from_secs_f64(self.config.crawler.wait);

        let mut links_fetched = 0;
        let start_time = Instant::now();

        loop {
            // re-query so links discovered by the previous batch are seen
            let batch = self.storage.unfetched_links(batch_size, max_depth)?;
            if batch.is_empty() {
                break;
            }

            for link in batch {
                let result = tokio::select! {
                    biased;
                    _ = shutdown.as_mut() => None,
                    result = self.process_link(link.id) => Some(result),
                };

                let fetched = match result {
                    Some(Ok(fetched)) => fetched,
                    Some(Err(e)) => {
                        self.rollback();
                        return Err(e);
                    }
                    None => {
                        info!("Interrupted while processing {}", link.url);
                        self.rollback();
                        return Err(WebcheckError::Interrupted);
                    }
                };
                if !fetched {
                    continue;
                }

                links_fetched += 1;
                if links_fetched % PROGRESS_INTERVAL == 0 {
                    let elapsed = start_time.elapsed();
                    info!(
                        "Progress: {} links fetched, {} waiting, {:.2} links/sec",
                        links_fetched,
                        self.storage.count_unfetched(max_depth)?,
                        links_fetched as f64 / elapsed.as_secs_f64()
                    );
                }

                if !wait.is_zero() {
                    tokio::select! {
                        biased;
                        _ = shutdown.as_mut() => return Err(WebcheckError::Interrupted),
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
            }
        }

        info!(
            "Crawl completed: {} links fetched in {:?}",
            links_fetched,
            start_time.elapsed()
        );
        Ok(())
    }

    /// Classifies and fetches one link in its own transaction
    ///
    /// Returns whether the link was handed to a fetcher.
    async fn process_link(&mut self, link_id: i64) -> crate::Result<bool> {
        self.storage.begin()?;

        let mut link = self.storage.get_link(link_id)?;
        if link.fetched.is_some() || link.yanked.is_some() {
            self.storage.commit()?;
            return Ok(false);
        }

        let classification = self.classifier.classify(&link.url).await;
        link.is_internal = Some(classification.is_internal);
        link.yanked = classification.yanked;
        self.storage.save_link(&link)?;

        if link.yanked.is_none() {
            self.dispatcher
                .fetch(self.storage.as_mut(), &mut link)
                .await?;
        }

        self.storage.commit()?;
        Ok(link.fetched.is_some())
    }

    fn rollback(&mut self) {
        if let Err(e) = self.storage.rollback() {
            warn!("Failed to roll back the current link: {}", e);
        }
    }

    /// Prepares the finished graph for reporting
    ///
    /// Resolves the base links, assigns breadth-first depths and runs the
    /// postprocess hook of every configured report.
    pub fn postprocess(&mut self) -> crate::Result<Site> {
        let base_urls = self.storage.base_urls()?;
        let bases = find_bases(self.storage.as_ref(), &base_urls)?;
        let reachable = assign_depths(self.storage.as_mut(), &bases)?;
        info!(
            "{} links reachable from {} base links",
            reachable,
            bases.len()
        );

        let mut site = Site::new(bases, self.config.clone());
        site.run = self.storage.get_latest_run()?;

        self.storage.begin()?;
        if let Err(e) = self.registry.postprocess(self.storage.as_mut(), &site) {
            self.rollback();
            return Err(e.into());
        }
        self.storage.commit()?;

        Ok(site)
    }

    /// Writes the configured reports into the output directory
    pub fn generate(&self, site: &Site) -> crate::Result<Vec<PathBuf>> {
        Ok(self.registry.generate(self.storage.as_ref(), site)?)
    }

    /// Crawls, postprocesses and writes the reports
    pub async fn run<F>(&mut self, shutdown: F) -> crate::Result<Vec<PathBuf>>
    where
        F: Future<Output = ()>,
    {
        self.crawl_until(shutdown).await?;
        let site = self.postprocess()?;
        self.generate(&site)
    }
}
