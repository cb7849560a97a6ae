use crate::config::types::{Config, CrawlerConfig, SelectorConfig, TargetEntry, UserAgentConfig};
use crate::ConfigError;
use scraper::Selector;
use std::collections::BTreeMap;
use url::Url;

/// Upper bound for either worker pool
const MAX_WORKERS: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;

    if config.output.root.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output root cannot be empty".to_string(),
        ));
    }

    for (name, parser) in &config.parsers {
        validate_parser(name, parser)?;
    }
    validate_targets(&config.targets, &config.parsers)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.unit_workers < 1 || config.unit_workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "unit_workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.unit_workers
        )));
    }

    if config.item_workers < 1 || config.item_workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "item_workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.item_workers
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

/// Checks that every selector of a parser family compiles
fn validate_parser(name: &str, parser: &SelectorConfig) -> Result<(), ConfigError> {
    let required = [
        ("work-title", &parser.work_title),
        ("unit-links", &parser.unit_links),
        ("unit-title", &parser.unit_title),
        ("item-links", &parser.item_links),
    ];
    for (field, selector) in required {
        check_selector(name, field, selector)?;
    }

    match &parser.item_resource {
        Some(selector) => check_selector(name, "item-resource", selector)?,
        None if !parser.items_are_resources => {
            return Err(ConfigError::Validation(format!(
                "parser '{}' needs item-resource unless items-are-resources is set",
                name
            )));
        }
        None => {}
    }

    if let Some(selector) = &parser.next_page {
        check_selector(name, "next-page", selector)?;
    }

    Ok(())
}

fn check_selector(parser: &str, field: &str, selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector).map_err(|e| {
        ConfigError::InvalidSelector(format!(
            "parser '{}' field {} ('{}'): {:?}",
            parser, field, selector, e
        ))
    })?;
    Ok(())
}

/// Validates target entries against the declared parsers
fn validate_targets(
    targets: &[TargetEntry],
    parsers: &BTreeMap<String, SelectorConfig>,
) -> Result<(), ConfigError> {
    for target in targets {
        let url = Url::parse(&target.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid target URL '{}': {}", target.url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Target URL '{}' must use HTTP or HTTPS",
                target.url
            )));
        }

        if !parsers.contains_key(&target.parser) {
            return Err(ConfigError::Validation(format!(
                "Target '{}' uses undefined parser '{}'",
                target.url, target.parser
            )));
        }
    }

    Ok(())
}
