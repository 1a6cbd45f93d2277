//! Request dispatcher.
//!
//! # Responsibilities
//! - Select the operation for a request
//! - Consult the response cache when the cache policy allows it
//! - Coerce parameters and call the backend on a miss
//! - Store successful payloads under the same fingerprint

use std::sync::Arc;

use axum::body::Bytes;

use crate::backend::Backend;
use crate::cache::{Fingerprint, ResponseCache};
use crate::config::CacheConfig;
use crate::dispatch::coerce;
use crate::dispatch::operations::{self, Operation};
use crate::dispatch::request::GatewayRequest;
use crate::error::GatewayError;
use crate::observability::metrics;

/// Which operations may use the read-through cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Skip the cache for operations that write backend state.
    pub bypass_mutating: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            bypass_mutating: true,
        }
    }
}

impl CachePolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            bypass_mutating: config.bypass_ows_operations,
        }
    }

    pub fn applies_to(&self, operation: &Operation) -> bool {
        !(self.bypass_mutating && operation.mutates_state)
    }
}

/// How the cache took part in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
    /// Cache configured but skipped for this request.
    Bypass,
    /// No cache configured.
    Disabled,
}

impl CacheOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Miss => "miss",
            CacheOutcome::Bypass => "bypass",
            CacheOutcome::Disabled => "disabled",
        }
    }
}

/// Successful result of a dispatch.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub operation: &'static Operation,
    pub payload: Bytes,
    pub cache: CacheOutcome,
}

/// Routes requests to backend operations, with a read-through cache.
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn Backend>,
    cache: ResponseCache,
    policy: CachePolicy,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn Backend>, cache: ResponseCache, policy: CachePolicy) -> Self {
        Self {
            backend,
            cache,
            policy,
        }
    }

    /// Operation selected by the request's flags, first in table order.
    pub fn select(&self, request: &GatewayRequest) -> Result<&'static Operation, GatewayError> {
        operations::find(|flag| request.has_flag(flag)).ok_or(GatewayError::UnsupportedOperation)
    }

    /// Select and execute the operation for `request`.
    pub async fn dispatch(&self, request: &GatewayRequest) -> Result<Dispatched, GatewayError> {
        let operation = self.select(request)?;
        self.execute(operation, request).await
    }

    /// Execute an already selected operation.
    pub async fn execute(
        &self,
        operation: &'static Operation,
        request: &GatewayRequest,
    ) -> Result<Dispatched, GatewayError> {
        let cache_key = self.cache_key(operation, request);

        let outcome = match &cache_key {
            Some(key) => {
                if let Some(payload) = self.cache.lookup(key).await {
                    return Ok(Dispatched {
                        operation,
                        payload,
                        cache: CacheOutcome::Hit,
                    });
                }
                CacheOutcome::Miss
            }
            None if self.cache.is_enabled() => {
                metrics::record_cache_event("bypass");
                CacheOutcome::Bypass
            }
            None => CacheOutcome::Disabled,
        };

        let args = coerce::prepare(operation, request)?;

        let payload = self.backend.call(operation, &args).await.map_err(|e| {
            tracing::warn!(
                operation = operation.flag,
                gpath = %request.gpath(),
                error = %e,
                "Backend call failed"
            );
            metrics::record_backend_error(operation.flag);
            GatewayError::BackendCall(e)
        })?;

        if let Some(key) = &cache_key {
            self.cache.store(key, payload.as_bytes()).await;
        }

        Ok(Dispatched {
            operation,
            payload: Bytes::from(payload),
            cache: outcome,
        })
    }

    /// Fingerprint to use, or `None` when the cache does not apply.
    fn cache_key(&self, operation: &Operation, request: &GatewayRequest) -> Option<Fingerprint> {
        // Body values are not part of the URI, so the fingerprint cannot cover them.
        if !self.cache.is_enabled()
            || !self.policy.applies_to(operation)
            || request.has_body_values()
        {
            return None;
        }
        Some(Fingerprint::of(request.uri()))
    }
}
