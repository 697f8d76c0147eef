//! Webcheck main entry point
//!
//! This is the command-line interface for the webcheck website link checker.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use webcheck::config::{load_config, Config};
use webcheck::output::{load_statistics, print_statistics};
use webcheck::storage::open_storage;
use webcheck::{Crawler, WebcheckError};

/// Webcheck: a website link checker
///
/// Webcheck crawls a website starting from the given URLs, checks every
/// link it finds and writes a set of HTML reports about the site into the
/// output directory.
#[derive(Parser, Debug)]
#[command(name = "webcheck")]
#[command(version)]
#[command(about = "A website link checker", long_about = None)]
struct Cli {
    /// URLs (or local paths) to start checking from
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Consider urls matching PATTERN internal
    #[arg(short, long, value_name = "PATTERN")]
    internal: Vec<String>,

    /// Consider urls matching PATTERN external
    #[arg(short = 'x', long, value_name = "PATTERN")]
    external: Vec<String>,

    /// Do not check urls matching PATTERN
    #[arg(short, long, value_name = "PATTERN")]
    yank: Vec<String>,

    /// Only consider urls below the given urls internal
    #[arg(short, long)]
    base_only: bool,

    /// Do not check external urls
    #[arg(short, long)]
    avoid_external: bool,

    /// Do not retrieve and parse robots.txt files
    #[arg(long)]
    ignore_robots: bool,

    /// Store the generated reports in the specified directory
    #[arg(short, long, value_name = "DIRECTORY")]
    output: Option<PathBuf>,

    /// Try to continue from a previous run
    #[arg(short = 'c', long = "continue")]
    resume: bool,

    /// Overwrite report files without keeping a backup
    #[arg(short, long)]
    force: bool,

    /// The number of redirects webcheck should follow
    #[arg(short, long, value_name = "N")]
    redirects: Option<u32>,

    /// Do not check links more than N levels from the given urls
    #[arg(short = 'l', long = "levels", value_name = "N")]
    levels: Option<u32>,

    /// Wait SECS seconds between retrievals
    #[arg(short, long, value_name = "SECS")]
    wait: Option<f64>,

    /// Network timeout in seconds
    #[arg(short, long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with_all = ["verbose", "debug"])]
    quiet: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Show debugging output
    #[arg(short, long)]
    debug: bool,

    /// Show statistics from an existing link database and exit
    #[arg(long)]
    stats: bool,
}

impl Cli {
    /// Applies the command line on top of the configuration file
    fn apply(&self, config: &mut Config) -> Result<()> {
        for url in &self.urls {
            config.base.push(to_url(url)?);
        }
        config.patterns.internal.extend(self.internal.iter().cloned());
        config.patterns.external.extend(self.external.iter().cloned());
        config.patterns.yank.extend(self.yank.iter().cloned());

        if self.base_only {
            config.crawler.base_urls_only = true;
        }
        if self.avoid_external {
            config.crawler.avoid_external = true;
        }
        if self.ignore_robots {
            config.crawler.use_robots = false;
        }
        if self.resume {
            config.crawler.resume = true;
        }
        if self.force {
            config.output.overwrite = true;
        }
        if let Some(directory) = &self.output {
            config.output.directory = directory.clone();
        }
        if let Some(redirects) = self.redirects {
            config.crawler.redirect_depth = redirects;
        }
        if let Some(levels) = self.levels {
            config.crawler.max_depth = Some(levels);
        }
        if let Some(wait) = self.wait {
            config.crawler.wait = wait;
        }
        if let Some(timeout) = self.timeout {
            config.crawler.timeout = timeout;
        }
        Ok(())
    }
}

/// Turns an argument without a scheme into a `file:` URL
fn to_url(arg: &str) -> Result<String> {
    if url::Url::parse(arg).is_ok() {
        return Ok(arg.to_string());
    }
    let path = Path::new(arg);
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .with_context(|| format!("Cannot resolve path {}", arg))?
            .join(path)
    };
    let url = url::Url::from_file_path(&path)
        .map_err(|()| anyhow::anyhow!("Cannot turn {} into a file URL", path.display()))?;
    Ok(url.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet, cli.debug);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?
        }
        None => Config::default(),
    };
    cli.apply(&mut config)?;

    if cli.stats {
        return handle_stats(&config);
    }

    if config.base.is_empty() && !config.crawler.resume {
        bail!("No URLs to check; give at least one URL or use --continue");
    }

    handle_crawl(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool, debug: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else if debug {
        EnvFilter::new("webcheck=debug,info")
    } else {
        match verbose {
            0 => EnvFilter::new("webcheck=info,warn"),
            1 => EnvFilter::new("webcheck=debug,info"),
            _ => EnvFilter::new("webcheck=trace,debug"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    let path = config.database_path();
    println!("Database: {}\n", path.display());

    if !path.exists() {
        bail!("No link database found at {}", path.display());
    }
    let storage = open_storage(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> Result<()> {
    if config.crawler.resume {
        tracing::info!("Continuing the previous crawl");
    }
    tracing::info!("Base URLs: {}", config.base.join(", "));

    let mut crawler = Crawler::open(config).context("Failed to set up the crawl")?;

    tracing::info!("checking site...");
    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // no signal handler, never interrupt
            std::future::pending::<()>().await;
        }
    };
    match crawler.crawl_until(shutdown).await {
        Ok(()) => {}
        Err(WebcheckError::Interrupted) => {
            tracing::error!("Interrupted; rerun with --continue to resume");
            bail!("Crawl interrupted");
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    }

    tracing::info!("postprocessing...");
    let site = crawler.postprocess()?;

    tracing::info!("generating reports...");
    let written = crawler.generate(&site)?;
    tracing::info!(
        "{} reports written to {}",
        written.len(),
        crawler.config().output.directory.display()
    );

    Ok(())
}
