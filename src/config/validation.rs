use crate::config::types::{AnalyzerConfig, Config, RetryPolicyConfig, SourceConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_analyzer_config(&config.analyzer)?;

    if config.user_agent.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent name cannot be empty".to_string(),
        ));
    }

    validate_policy("upload", &config.retry.upload)?;
    validate_policy("inference", &config.retry.inference)?;
    validate_policy("network", &config.retry.network)?;
    Ok(())
}

fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    validate_http_url("source.base-url", &config.base_url)?;
    validate_http_url("source.permalink-base", &config.permalink_base)?;

    if config.max_rate_limit_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max-rate-limit-retries must be >= 1, got {}",
            config.max_rate_limit_retries
        )));
    }

    if config.rate_limit_pause_ms > config.rate_limit_max_pause_ms {
        return Err(ConfigError::Validation(format!(
            "rate-limit-pause-ms ({}) exceeds rate-limit-max-pause-ms ({})",
            config.rate_limit_pause_ms, config.rate_limit_max_pause_ms
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be > 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_analyzer_config(config: &AnalyzerConfig) -> Result<(), ConfigError> {
    validate_http_url("analyzer.api-base", &config.api_base)?;

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "analyzer model cannot be empty".to_string(),
        ));
    }

    if config.poll_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "poll-interval-ms must be > 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_policy(name: &str, policy: &RetryPolicyConfig) -> Result<(), ConfigError> {
    if policy.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "retry.{}: max-attempts must be >= 1, got {}",
            name, policy.max_attempts
        )));
    }

    if policy.min_ms > policy.max_ms {
        return Err(ConfigError::Validation(format!(
            "retry.{}: min-ms ({}) exceeds max-ms ({})",
            name, policy.min_ms, policy.max_ms
        )));
    }

    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url =
        Url::parse(value).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", field, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field, other
        ))),
    }
}
