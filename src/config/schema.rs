//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Metadata database connection and pool sizes.
    pub database: DatabaseConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum accepted size of a form-encoded request body, in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Metadata database configuration.
#[derive(Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Host name, or a unix socket directory when it starts with '/'.
    pub host: String,

    pub port: u16,

    /// Database name.
    pub name: String,

    pub user: String,

    /// Empty means no password is sent.
    pub password: String,

    /// Idle connections kept open.
    pub pool: u32,

    /// Maximum open connections (concurrent backend calls).
    pub limit: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "/var/run/postgresql".to_string(),
            port: 5432,
            name: "mas".to_string(),
            user: "api".to_string(),
            password: String::new(),
            pool: 8,
            limit: 64,
        }
    }
}

// Hand-written so the password never reaches a log line.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("pool", &self.pool)
            .field("limit", &self.limit)
            .finish()
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Memcached endpoint (`host:port`). `None` disables caching.
    pub uri: Option<String>,

    /// Keep `put_ows_cache` / `get_ows_cache` out of the read-through cache.
    pub bypass_ows_operations: bool,

    /// Deadline for each connect, get or set, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            uri: None,
            bypass_ows_operations: true,
            timeout_ms: 100,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.database.host, "/var/run/postgresql");
        assert_eq!(config.database.pool, 8);
        assert_eq!(config.database.limit, 64);
        assert!(config.cache.uri.is_none());
        assert!(config.cache.bypass_ows_operations);
        assert_eq!(config.cache.timeout_ms, 100);
    }

    #[test]
    fn test_password_is_redacted() {
        let config = DatabaseConfig {
            password: "hunter2".into(),
            ..DatabaseConfig::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("***"));
    }
}
