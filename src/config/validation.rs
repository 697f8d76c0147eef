use crate::config::types::{Config, CrawlerConfig, OutputConfig, PatternConfig, ReportConfig};
use crate::output::{OPTIONAL_REPORT_NAMES, REPORT_NAMES};
use crate::url::PatternSet;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_base_urls(&config.base)?;
    validate_crawler_config(&config.crawler)?;
    validate_patterns(&config.patterns)?;
    validate_user_agent(&config.user_agent.crawler_name)?;
    validate_output_config(&config.output)?;
    validate_report_config(&config.report)?;
    Ok(())
}

/// Validates that every base URL is an absolute URL
fn validate_base_urls(base: &[String]) -> Result<(), ConfigError> {
    for url in base {
        Url::parse(url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base URL '{}': {}", url, e)))?;
    }
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.redirect_depth < 1 {
        return Err(ConfigError::Validation(format!(
            "redirect-depth must be >= 1, got {}",
            config.redirect_depth
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch-size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if !config.wait.is_finite() || config.wait < 0.0 {
        return Err(ConfigError::Validation(format!(
            "wait must be a non-negative number of seconds, got {}",
            config.wait
        )));
    }

    if config.timeout < 1 {
        return Err(ConfigError::Validation(
            "timeout must be at least one second".to_string(),
        ));
    }

    Ok(())
}

/// Validates that every pattern compiles
fn validate_patterns(config: &PatternConfig) -> Result<(), ConfigError> {
    PatternSet::new(&config.internal)?;
    PatternSet::new(&config.external)?;
    PatternSet::new(&config.yank)?;
    Ok(())
}

fn validate_user_agent(crawler_name: &str) -> Result<(), ConfigError> {
    if crawler_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.database_name.is_empty() {
        return Err(ConfigError::Validation(
            "database-name cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates report configuration
fn validate_report_config(config: &ReportConfig) -> Result<(), ConfigError> {
    for name in &config.plugins {
        let name_str = name.as_str();
        if !REPORT_NAMES.contains(&name_str) && !OPTIONAL_REPORT_NAMES.contains(&name_str) {
            return Err(ConfigError::Validation(format!(
                "Unknown report plugin '{}'",
                name
            )));
        }
    }

    if config.sitemap_level < 1 {
        return Err(ConfigError::Validation(
            "sitemap-level must be >= 1".to_string(),
        ));
    }

    Ok(())
}
