//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (sizes and TTLs > 0, addresses parse)
//! - Detect duplicate or malformed route limits
//! - Keep failure TTLs no longer than success TTLs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem, naming the offending field.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    validate_rate_limits(config, &mut errors);
    validate_cache(config, &mut errors);

    if config.pool.size == 0 {
        errors.push(ValidationError::new("pool.size", "must be at least 1"));
    }
    if config.pool.refresh_interval_secs == 0 {
        errors.push(ValidationError::new("pool.refresh_interval_secs", "must be greater than 0"));
    }

    if config.resolver.executable.trim().is_empty() {
        errors.push(ValidationError::new("resolver.executable", "must not be empty"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_rate_limits(config: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    let rate_limit = &config.rate_limit;

    let max_age = i64::try_from(rate_limit.max_sample_age_secs).unwrap_or(i64::MAX);

    if rate_limit.default.max_requests == 0 || rate_limit.default.window_secs <= 0 {
        errors.push(ValidationError::new(
            "rate_limit.default",
            "max_requests and window_secs must be greater than 0",
        ));
    }
    if rate_limit.default.window_secs > max_age {
        errors.push(ValidationError::new(
            "rate_limit.default",
            "window_secs must not exceed rate_limit.max_sample_age_secs",
        ));
    }

    let mut seen = HashSet::new();
    for (i, route) in rate_limit.routes.iter().enumerate() {
        let field = format!("rate_limit.routes[{}]", i);
        if !route.path.starts_with('/') {
            errors.push(ValidationError::new(&field, format!("path '{}' must start with '/'", route.path)));
        }
        if !seen.insert(route.path.as_str()) {
            errors.push(ValidationError::new(&field, format!("duplicate path '{}'", route.path)));
        }
        if route.max_requests == 0 || route.window_secs <= 0 {
            errors.push(ValidationError::new(
                &field,
                "max_requests and window_secs must be greater than 0",
            ));
        }
        if route.window_secs > max_age {
            errors.push(ValidationError::new(
                &field,
                "window_secs must not exceed rate_limit.max_sample_age_secs",
            ));
        }
    }

    if rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("rate_limit.sweep_interval_secs", "must be greater than 0"));
    }
    if rate_limit.max_sample_age_secs == 0 {
        errors.push(ValidationError::new("rate_limit.max_sample_age_secs", "must be greater than 0"));
    }
}

fn validate_cache(config: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    let cache = &config.cache;

    for (field, value) in [
        ("cache.resolve_ttl_secs", cache.resolve_ttl_secs),
        ("cache.status_ttl_secs", cache.status_ttl_secs),
        ("cache.offline_ttl_secs", cache.offline_ttl_secs),
        ("cache.error_ttl_secs", cache.error_ttl_secs),
        ("cache.sweep_interval_secs", cache.sweep_interval_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }

    let shortest_success = cache.resolve_ttl_secs.min(cache.status_ttl_secs);
    if cache.offline_ttl_secs > shortest_success {
        errors.push(ValidationError::new(
            "cache.offline_ttl_secs",
            "must not exceed the success TTLs",
        ));
    }
    if cache.error_ttl_secs > cache.offline_ttl_secs {
        errors.push(ValidationError::new(
            "cache.error_ttl_secs",
            "must not exceed cache.offline_ttl_secs",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteLimitConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.pool.size = 0;
        config.rate_limit.routes.push(RouteLimitConfig {
            path: "resolve".into(),
            max_requests: 0,
            window_secs: 60,
        });

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"listener.bind_address"));
        assert!(fields.contains(&"pool.size"));
        assert_eq!(fields.iter().filter(|f| **f == "rate_limit.routes[4]").count(), 2);
    }

    #[test]
    fn test_duplicate_routes() {
        let mut config = GatewayConfig::default();
        let first = config.rate_limit.routes[0].clone();
        config.rate_limit.routes.push(first);

        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].reason.starts_with("duplicate path"));
    }

    #[test]
    fn test_windows_must_fit_sample_age() {
        let mut config = GatewayConfig::default();
        config.rate_limit.routes[0].window_secs = 7200;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "rate_limit.routes[0]");

        let mut config = GatewayConfig::default();
        config.rate_limit.max_sample_age_secs = 0;

        let fields: Vec<_> = validate_config(&config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert!(fields.contains(&"rate_limit.max_sample_age_secs".to_string()));
        assert!(fields.contains(&"rate_limit.default".to_string()));
    }

    #[test]
    fn test_failure_ttls_must_be_shorter() {
        let mut config = GatewayConfig::default();
        config.cache.error_ttl_secs = 600;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "cache.error_ttl_secs");
    }
}
