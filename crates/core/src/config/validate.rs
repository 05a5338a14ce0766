use reqwest::Url;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - View page size and cache capacity are positive
/// - Sync check interval is positive
/// - Mirror list URL is an http(s) URL
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.view.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "view.page_size must be greater than 0".to_string(),
        ));
    }

    if config.view.cache_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "view.cache_capacity must be greater than 0".to_string(),
        ));
    }

    if config.sync.check_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "sync.check_interval_secs must be greater than 0".to_string(),
        ));
    }

    match Url::parse(&config.sync.mirror_list_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => {
            return Err(ConfigError::ValidationError(format!(
                "sync.mirror_list_url has unsupported scheme '{}'",
                url.scheme()
            )))
        }
        Err(e) => {
            return Err(ConfigError::ValidationError(format!(
                "sync.mirror_list_url is not a valid URL: {}",
                e
            )))
        }
    }

    Ok(())
}
