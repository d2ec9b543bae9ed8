//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, then apply environment
/// overrides.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content, |key| std::env::var(key).ok())
}

/// Parse TOML text, apply overrides from `env`, and validate.
pub fn parse_config<E>(content: &str, env: E) -> Result<GatewayConfig, ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    let mut config: GatewayConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, env);

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Defaults plus environment overrides, for running without a config file.
pub fn default_config() -> Result<GatewayConfig, ConfigError> {
    parse_config("", |key| std::env::var(key).ok())
}

/// `TWITCH_OAUTH_TOKEN` and `ALLOWED_ORIGINS` (comma separated) win over the file.
pub fn apply_env_overrides<E>(config: &mut GatewayConfig, env: E)
where
    E: Fn(&str) -> Option<String>,
{
    if let Some(token) = env("TWITCH_OAUTH_TOKEN").filter(|t| !t.is_empty()) {
        config.resolver.twitch_oauth_token = Some(token);
    }
    if let Some(origins) = env("ALLOWED_ORIGINS") {
        let origins: Vec<String> = origins
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if !origins.is_empty() {
            config.listener.allowed_origins = origins;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_env_overrides() {
        let config = parse_config("", |key| match key {
            "TWITCH_OAUTH_TOKEN" => Some("secret".into()),
            "ALLOWED_ORIGINS" => Some("https://a.example, https://b.example".into()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.resolver.twitch_oauth_token.as_deref(), Some("secret"));
        assert_eq!(
            config.listener.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("[pool\nsize = 3", no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_error_lists_all_problems() {
        let err = parse_config("[pool]\nsize = 0\n[cache]\nerror_ttl_secs = 0", no_env).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Validation failed: "));
        assert!(message.contains("pool.size"));
        assert!(message.contains("cache.error_ttl_secs"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/gateway.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
