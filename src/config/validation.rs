use crate::config::types::{Config, OracleConfig, RetryConfig, ScraperConfig, StoreConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_store_config(&config.store)?;
    validate_scraper_config(&config.scraper)?;
    validate_oracle_config(&config.oracle)?;
    validate_retry_config(&config.retry)?;
    Ok(())
}

fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if base.cannot_be_a_base() || base.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must be an absolute http(s) URL, got '{}'",
            config.base_url
        )));
    }

    if config.rate_limit <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "rate_limit must be positive, got {}",
            config.rate_limit
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_oracle_config(config: &OracleConfig) -> Result<(), ConfigError> {
    if config.model.is_empty() {
        return Err(ConfigError::Validation(
            "oracle model cannot be empty".to_string(),
        ));
    }

    if config.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "oracle max_tokens must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts == 0 {
        return Err(ConfigError::Validation(
            "retry max_attempts must be >= 1".to_string(),
        ));
    }
    Ok(())
}
