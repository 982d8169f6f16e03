use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.poll_interval_ms == 0 {
        return Err(ConfigError::Validation {
            message: "poll_interval_ms must be greater than zero".to_string(),
        });
    }

    if config.history_limit == 0 {
        return Err(ConfigError::Validation {
            message: "history_limit must be at least 1".to_string(),
        });
    }

    if config.service.request_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "service.request_timeout_secs must be greater than zero".to_string(),
        });
    }

    let base_url = &config.service.base_url;
    match reqwest::Url::parse(base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => {
            return Err(ConfigError::Validation {
                message: format!("Unsupported service URL scheme '{}'", url.scheme()),
            });
        }
        Err(e) => {
            return Err(ConfigError::Validation {
                message: format!("Invalid service URL '{}': {}", base_url, e),
            });
        }
    }

    Ok(())
}
