//! Configuration validation
//!
//! Checks values that parse but cannot work:
//! - file log without a path
//! - zero sizes and capacities
//! - inverted retry delays
//! - non-http transport endpoints

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::store::LogStoreKind;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_server(config)?;
    validate_log_store(config)?;
    validate_tap(config)?;
    validate_transport(config)?;
    validate_pipeline(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<()> {
    if config.server.max_payload_size == 0 {
        return Err(ConfigError::invalid_value(
            "server",
            "max_payload_size",
            "must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_log_store(config: &Config) -> Result<()> {
    if config.log_store.kind == LogStoreKind::File && config.log_store.path.is_none() {
        return Err(ConfigError::missing_field("log_store", "path"));
    }
    Ok(())
}

fn validate_tap(config: &Config) -> Result<()> {
    if config.tap.max_subscribers == 0 {
        return Err(ConfigError::invalid_value(
            "tap",
            "max_subscribers",
            "must be greater than 0",
        ));
    }
    if config.tap.channel_capacity == 0 {
        return Err(ConfigError::invalid_value(
            "tap",
            "channel_capacity",
            "must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_transport(config: &Config) -> Result<()> {
    let transport = &config.transport;

    if !(transport.endpoint.starts_with("http://") || transport.endpoint.starts_with("https://")) {
        return Err(ConfigError::invalid_value(
            "transport",
            "endpoint",
            format!("'{}' must be an http(s) URL", transport.endpoint),
        ));
    }
    if transport.batch_size == 0 {
        return Err(ConfigError::invalid_value(
            "transport",
            "batch_size",
            "must be greater than 0",
        ));
    }
    if transport.max_retries == 0 {
        return Err(ConfigError::invalid_value(
            "transport",
            "max_retries",
            "must allow at least one attempt",
        ));
    }
    if transport.base_delay > transport.max_delay {
        return Err(ConfigError::invalid_value(
            "transport",
            "base_delay",
            "must not exceed max_delay",
        ));
    }
    Ok(())
}

fn validate_pipeline(config: &Config) -> Result<()> {
    if config.pipeline.anomaly_window == 0 {
        return Err(ConfigError::invalid_value(
            "pipeline",
            "anomaly_window",
            "must be greater than 0",
        ));
    }
    if !config.pipeline.anomaly_threshold.is_finite() {
        return Err(ConfigError::invalid_value(
            "pipeline",
            "anomaly_threshold",
            "must be a finite number",
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "validation_test.rs"]
mod tests;
