//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check that URLs and rewrite selectors are well formed
//! - Check that the secret source names its location
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EdgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{EdgeConfig, SecretSource};
use crate::rewrite::Selector;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem, tagged with the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("{:?} is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_concurrent_requests == 0 {
        errors.push(ValidationError::new(
            "listener.max_concurrent_requests",
            "must be greater than 0",
        ));
    }

    for (field, value) in [
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.upstream_connect_secs", config.timeouts.upstream_connect_secs),
        ("timeouts.upstream_request_secs", config.timeouts.upstream_request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level {:?}", observability.log_level),
        ));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("{:?} is not a socket address", observability.metrics_address),
        ));
    }

    if config.service.pop_name.trim().is_empty() {
        errors.push(ValidationError::new("service.pop_name", "must not be empty"));
    }

    match config.secrets.source {
        SecretSource::File if config.secrets.path.is_none() => {
            errors.push(ValidationError::new(
                "secrets.path",
                "required when source is \"file\"",
            ));
        }
        SecretSource::Env if config.secrets.env_var.as_deref().map_or(true, str::is_empty) => {
            errors.push(ValidationError::new(
                "secrets.env_var",
                "required when source is \"env\"",
            ));
        }
        _ => {}
    }
    if config.secrets.item.is_empty() {
        errors.push(ValidationError::new("secrets.item", "must not be empty"));
    }

    check_url(&mut errors, "weather.base_url", &config.weather.base_url);
    check_url(&mut errors, "esi.origin_url", &config.esi.origin_url);

    let location = &config.weather.default_location;
    if !(-90.0..=90.0).contains(&location.latitude) {
        errors.push(ValidationError::new(
            "weather.default_location.latitude",
            "must be within [-90, 90]",
        ));
    }
    if !(-180.0..=180.0).contains(&location.longitude) {
        errors.push(ValidationError::new(
            "weather.default_location.longitude",
            "must be within [-180, 180]",
        ));
    }

    for (index, rule) in config.esi.rules.iter().enumerate() {
        if let Err(e) = Selector::parse(&rule.selector) {
            errors.push(ValidationError::new(
                format!("esi.rules[{index}].selector"),
                e.to_string(),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme {:?}", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, e.to_string())),
    }
}
