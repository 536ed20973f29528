use crate::config::types::{Config, OutputConfig, QueueConfig, ServiceConfig};
use crate::ConfigError;
use url::Url;

/// Largest RDY count nsqd accepts with its default `--max-rdy-count`
const MAX_IN_FLIGHT_LIMIT: u32 = 2500;

/// Longest topic or channel name nsqd accepts
const MAX_NAME_LENGTH: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_queue_config(&config.queue)?;
    validate_service_config(&config.service)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates message queue configuration
fn validate_queue_config(config: &QueueConfig) -> Result<(), ConfigError> {
    if config.host.is_empty() {
        return Err(ConfigError::Validation("queue host cannot be empty".to_string()));
    }

    if config.tcp_port == 0 || config.http_port == 0 {
        return Err(ConfigError::Validation(format!(
            "queue ports must be non-zero, got tcp={} http={}",
            config.tcp_port, config.http_port
        )));
    }

    if config.max_in_flight < 1 || config.max_in_flight > MAX_IN_FLIGHT_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_in_flight must be between 1 and {}, got {}",
            MAX_IN_FLIGHT_LIMIT, config.max_in_flight
        )));
    }

    validate_queue_name("request_topic", &config.request_topic)?;
    validate_queue_name("response_topic", &config.response_topic)?;
    validate_queue_name("channel", &config.channel)?;

    Ok(())
}

/// Validates an nsqd topic or channel name
fn validate_queue_name(field: &str, name: &str) -> Result<(), ConfigError> {
    let base = name.strip_suffix("#ephemeral").unwrap_or(name);

    if base.is_empty() || name.len() > MAX_NAME_LENGTH {
        return Err(ConfigError::Validation(format!(
            "{} must be 1 to {} characters, got '{}'",
            field, MAX_NAME_LENGTH, name
        )));
    }

    if !base
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "{} '{}' contains invalid characters",
            field, name
        )));
    }

    Ok(())
}

/// Validates links service configuration
fn validate_service_config(config: &ServiceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.address)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid service address: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Service address '{}' must use http or https",
            config.address
        )));
    }

    if config.timeout_hint.trim().is_empty() {
        return Err(ConfigError::Validation(
            "timeout_hint cannot be empty".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.results_dir.is_empty() {
        return Err(ConfigError::Validation(
            "results_dir cannot be empty".to_string(),
        ));
    }

    if config.mismatch_path.is_empty() {
        return Err(ConfigError::Validation(
            "mismatch_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
