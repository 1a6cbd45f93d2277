//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! request URI (path + query, as received)
//!     → Fingerprint (md5, hex)
//!     → ResponseCache::lookup → CacheStore::get
//!         hit   → cached payload bytes
//!         miss  → None
//!         error → None (never surfaced)
//!
//! successful payload
//!     → ResponseCache::store → CacheStore::set (errors ignored)
//! ```
//!
//! # Design Decisions
//! - Stores return `Result`; the wrapper is the only place errors are swallowed
//! - No TTL: entries are written with no expiry, eviction belongs to the server
//! - Fingerprints are order-sensitive; `?a&b` and `?b&a` are distinct keys

pub mod memcached;
pub mod memory;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use md5::{Digest, Md5};
use thiserror::Error;

use crate::config::CacheConfig;
use crate::observability::metrics;

pub use memcached::MemcachedStore;
pub use memory::MemoryStore;

/// Errors raised by a cache store.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection failed: {0}")]
    Connection(String),

    #[error("cache backend error: {0}")]
    Backend(String),
}

/// A key → bytes store reachable over the network.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// `Ok(Some(bytes))` on hit, `Ok(None)` on miss.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `value` under `key` with no expiry.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError>;

    fn provider_name(&self) -> &'static str;
}

/// Cache key derived from a request's full path and query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(request_uri: &str) -> Self {
        Self(hex::encode(Md5::digest(request_uri.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Best-effort read-through cache over an optional store.
#[derive(Clone, Default)]
pub struct ResponseCache {
    store: Option<Arc<dyn CacheStore>>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store: Some(store) }
    }

    /// A cache that never hits and never stores.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    /// Memcached when a URI is configured, otherwise disabled.
    pub fn from_config(config: &CacheConfig) -> Self {
        match &config.uri {
            Some(uri) => {
                tracing::info!(uri = %uri, timeout_ms = config.timeout_ms, "Response cache enabled (memcached)");
                Self::new(Arc::new(MemcachedStore::new(
                    uri,
                    Duration::from_millis(config.timeout_ms),
                )))
            }
            None => {
                tracing::info!("Response cache disabled");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Cached payload for `key`; store failures read as a miss.
    pub async fn lookup(&self, key: &Fingerprint) -> Option<Bytes> {
        let store = self.store.as_ref()?;
        match store.get(key.as_str()).await {
            Ok(Some(bytes)) => {
                metrics::record_cache_event("hit");
                Some(Bytes::from(bytes))
            }
            Ok(None) => {
                metrics::record_cache_event("miss");
                None
            }
            Err(e) => {
                tracing::debug!(key = %key, provider = store.provider_name(), error = %e, "Cache lookup failed, treating as miss");
                metrics::record_cache_event("lookup_error");
                None
            }
        }
    }

    /// Store `payload` under `key`; failures are ignored.
    pub async fn store(&self, key: &Fingerprint, payload: &[u8]) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        if let Err(e) = store.set(key.as_str(), payload).await {
            tracing::debug!(key = %key, provider = store.provider_name(), error = %e, "Cache store failed, ignoring");
            metrics::record_cache_event("store_error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingStore;

    #[async_trait]
    impl CacheStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(CacheError::Connection("connection refused".into()))
        }

        async fn set(&self, _key: &str, _value: &[u8]) -> Result<(), CacheError> {
            Err(CacheError::Backend("out of memory".into()))
        }

        fn provider_name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn test_fingerprint_is_md5_hex() {
        let key = Fingerprint::of("/");
        assert_eq!(key.as_str(), "6666cd76f96956469e7be39d750cc7d9");
        assert_eq!(Fingerprint::of("/ns/a?extents").as_str().len(), 32);
    }

    #[test]
    fn test_fingerprint_is_order_sensitive() {
        let a = Fingerprint::of("/x?timestamps&namespace=a");
        let b = Fingerprint::of("/x?namespace=a&timestamps");
        assert_ne!(a, b);
        assert_eq!(a, Fingerprint::of("/x?timestamps&namespace=a"));
    }

    #[tokio::test]
    async fn test_disabled_cache_is_noop() {
        let cache = ResponseCache::disabled();
        let key = Fingerprint::of("/x?extents");
        cache.store(&key, b"{}").await;
        assert!(!cache.is_enabled());
        assert!(cache.lookup(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_hit_after_store() {
        let cache = ResponseCache::new(Arc::new(MemoryStore::new()));
        let key = Fingerprint::of("/x?extents");
        assert!(cache.lookup(&key).await.is_none());

        cache.store(&key, br#"{"a":1}"#).await;
        assert_eq!(cache.lookup(&key).await.unwrap(), Bytes::from_static(br#"{"a":1}"#));
    }

    #[tokio::test]
    async fn test_store_errors_are_suppressed() {
        let cache = ResponseCache::new(Arc::new(FailingStore));
        let key = Fingerprint::of("/x?extents");
        cache.store(&key, b"{}").await;
        assert!(cache.is_enabled());
        assert!(cache.lookup(&key).await.is_none());
    }

    #[test]
    fn test_from_config() {
        assert!(!ResponseCache::from_config(&CacheConfig::default()).is_enabled());

        let config = CacheConfig {
            uri: Some("localhost:11211".into()),
            ..CacheConfig::default()
        };
        assert!(ResponseCache::from_config(&config).is_enabled());
    }

    #[tokio::test]
    async fn test_unresponsive_memcached_reads_as_miss() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = CacheConfig {
            uri: Some(addr),
            timeout_ms: 50,
            ..CacheConfig::default()
        };
        let cache = ResponseCache::from_config(&config);
        let key = Fingerprint::of("/ns?extents");

        let first = tokio::time::timeout(Duration::from_secs(2), cache.lookup(&key)).await;
        assert_eq!(first, Ok(None));
        let (second, ()) = tokio::join!(cache.lookup(&key), cache.store(&key, b"{}"));
        assert!(second.is_none());
    }
}
