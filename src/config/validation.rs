use crate::config::types::{Config, ContentSelection, HarvestConfig, NetworkConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvest_config(&config.harvest)?;
    validate_selection(config)?;
    validate_discover_years(config.discover.year_from, config.discover.year_to)?;
    validate_network_config(&config.network)?;

    if config.output.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates harvest limits
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.max_concurrency < 1 || config.max_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrency must be between 1 and 100, got {}",
            config.max_concurrency
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.results_wanted < 1 {
        return Err(ConfigError::Validation(format!(
            "results_wanted must be >= 1, got {}",
            config.results_wanted
        )));
    }

    Ok(())
}

/// Rejects selections that leave nothing to collect
fn validate_selection(config: &Config) -> Result<(), ConfigError> {
    if config.harvest.content_type == ContentSelection::Person
        && config.harvest.search_queries.is_empty()
        && config.people.queries.is_empty()
    {
        return Err(ConfigError::Validation(
            "content_type = person requires search_queries or people.queries".to_string(),
        ));
    }
    Ok(())
}

fn validate_discover_years(from: Option<i32>, to: Option<i32>) -> Result<(), ConfigError> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ConfigError::Validation(format!(
                "year_from ({}) must not be after year_to ({})",
                from, to
            )));
        }
    }
    Ok(())
}

/// Validates endpoints and pacing
fn validate_network_config(config: &NetworkConfig) -> Result<(), ConfigError> {
    Url::parse(&config.api_base)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid api_base: {}", e)))?;
    Url::parse(&config.web_base)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid web_base: {}", e)))?;

    if config.max_delay_ms < config.min_delay_ms {
        return Err(ConfigError::Validation(format!(
            "max_delay_ms ({}) must be >= min_delay_ms ({})",
            config.max_delay_ms, config.min_delay_ms
        )));
    }

    Ok(())
}
