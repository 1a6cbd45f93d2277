//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("database.limit must be greater than 0")]
    ZeroPoolLimit,

    #[error("cache.timeout_ms must be greater than 0")]
    ZeroCacheTimeout,

    #[error("cache.uri '{0}' must be host:port")]
    InvalidCacheUri(String),

    #[error("observability.log_format '{0}' must be 'pretty' or 'json'")]
    UnknownLogFormat(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);

    let db = &config.database;
    if db.host.is_empty() {
        errors.push(ValidationError::Empty { field: "database.host" });
    }
    if db.name.is_empty() {
        errors.push(ValidationError::Empty { field: "database.name" });
    }
    if db.user.is_empty() {
        errors.push(ValidationError::Empty { field: "database.user" });
    }
    // An idle pool above the limit is clamped when the pool is built.
    if db.limit == 0 {
        errors.push(ValidationError::ZeroPoolLimit);
    }

    if let Some(uri) = &config.cache.uri {
        if !is_cache_uri(uri) {
            errors.push(ValidationError::InvalidCacheUri(uri.clone()));
        }
    }
    if config.cache.timeout_ms == 0 {
        errors.push(ValidationError::ZeroCacheTimeout);
    }

    let obs = &config.observability;
    if obs.log_format != "pretty" && obs.log_format != "json" {
        errors.push(ValidationError::UnknownLogFormat(obs.log_format.clone()));
    }
    if obs.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &obs.metrics_address);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

/// Accepts `host:port` with or without a `tcp://` scheme.
fn is_cache_uri(uri: &str) -> bool {
    let with_scheme = if uri.contains("://") {
        uri.to_string()
    } else {
        format!("tcp://{}", uri)
    };
    match url::Url::parse(&with_scheme) {
        Ok(url) if url.scheme() == "unix" => !url.path().is_empty(),
        Ok(url) => url.host_str().is_some_and(|h| !h.is_empty()) && url.port().is_some(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.database.name = String::new();
        config.cache.timeout_ms = 0;
        config.observability.log_format = "xml".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroCacheTimeout));
        assert!(errors.contains(&ValidationError::Empty { field: "database.name" }));
    }

    #[test]
    fn test_pool_above_limit_is_accepted() {
        let mut config = GatewayConfig::default();
        config.database.pool = 100;
        config.database.limit = 10;
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_zero_limit() {
        let mut config = GatewayConfig::default();
        config.database.limit = 0;
        assert_eq!(validate_config(&config), Err(vec![ValidationError::ZeroPoolLimit]));
    }

    #[test]
    fn test_cache_uri() {
        assert!(is_cache_uri("localhost:11211"));
        assert!(is_cache_uri("tcp://10.0.0.5:11211"));
        assert!(is_cache_uri("unix:///var/run/memcached.sock"));
        assert!(!is_cache_uri("localhost"));
        assert!(!is_cache_uri(""));

        let mut config = GatewayConfig::default();
        config.cache.uri = Some("memcache".into());
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::InvalidCacheUri("memcache".into())])
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = GatewayConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
