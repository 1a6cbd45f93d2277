//! Memcached cache store.
//!
//! Connections are opened on demand and kept in a small idle pool. The pool
//! lock is only held to take or return a client, never across network I/O.
//! Every connect, get and set runs under a deadline; a client whose
//! operation failed or timed out is dropped instead of returned.

use std::future::Future;
use std::time::Duration;

use async_memcached::Client;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::cache::{CacheError, CacheStore};

/// Idle connections kept for reuse.
const MAX_IDLE: usize = 2;

/// Memcached-backed store with pooled, deadline-bound connections.
pub struct MemcachedStore {
    dsn: String,
    timeout: Duration,
    idle: Mutex<Vec<Client>>,
}

impl std::fmt::Debug for MemcachedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemcachedStore")
            .field("dsn", &self.dsn)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl MemcachedStore {
    /// Accepts `host:port` or a full `tcp://host:port` DSN.
    pub fn new(uri: &str, timeout: Duration) -> Self {
        Self {
            dsn: normalize_dsn(uri),
            timeout,
            idle: Mutex::new(Vec::with_capacity(MAX_IDLE)),
        }
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    pub async fn idle_connections(&self) -> usize {
        self.idle.lock().await.len()
    }

    /// An idle client, or a fresh connection.
    async fn checkout(&self) -> Result<Client, CacheError> {
        if let Some(client) = self.idle.lock().await.pop() {
            return Ok(client);
        }

        let client = self
            .with_deadline("connect", Client::new(self.dsn.as_str()))
            .await?
            .map_err(|e| {
                CacheError::Connection(format!("failed to connect to memcached at {}: {}", self.dsn, e))
            })?;
        tracing::debug!(dsn = %self.dsn, "Memcached connected");
        Ok(client)
    }

    /// Return a healthy client to the pool, or drop it when the pool is full.
    async fn checkin(&self, client: Client) {
        let mut idle = self.idle.lock().await;
        if idle.len() < MAX_IDLE {
            idle.push(client);
        }
    }

    async fn with_deadline<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = T>,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.timeout, fut).await.map_err(|_| {
            CacheError::Connection(format!(
                "memcached {} timed out after {}ms",
                op,
                self.timeout.as_millis()
            ))
        })
    }
}

#[async_trait]
impl CacheStore for MemcachedStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut client = self.checkout().await?;

        let value = self
            .with_deadline("GET", client.get(key))
            .await?
            .map_err(|e| CacheError::Backend(format!("memcached GET failed: {}", e)))?;

        self.checkin(client).await;
        Ok(value.map(|v| v.data))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        let mut client = self.checkout().await?;

        self.with_deadline("SET", client.set(key, value, None, None))
            .await?
            .map_err(|e| CacheError::Backend(format!("memcached SET failed: {}", e)))?;

        self.checkin(client).await;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memcached"
    }
}

fn normalize_dsn(uri: &str) -> String {
    if uri.contains("://") {
        uri.to_string()
    } else {
        format!("tcp://{}", uri)
    }
}
