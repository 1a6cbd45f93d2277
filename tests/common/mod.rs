//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mas_gateway::backend::{Backend, BackendError};
use mas_gateway::cache::{MemoryStore, ResponseCache};
use mas_gateway::config::GatewayConfig;
use mas_gateway::dispatch::{Argument, CachePolicy, Dispatcher, Operation};
use mas_gateway::{HttpServer, Shutdown};

/// One recorded backend invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub function: &'static str,
    pub args: Vec<Argument>,
}

/// Backend that records calls and answers with a JSON echo of them.
#[derive(Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<Call>>,
    fail_with: Option<String>,
}

#[allow(dead_code)]
impl RecordingBackend {
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Call {
        self.calls.lock().unwrap().last().cloned().expect("no backend call recorded")
    }
}

#[async_trait]
impl Backend for RecordingBackend {
    async fn call(&self, operation: &Operation, args: &[Argument]) -> Result<String, BackendError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call {
                function: operation.function,
                args: args.to_vec(),
            });
            calls.len()
        };
        if let Some(message) = &self.fail_with {
            return Err(BackendError::Call(message.clone()));
        }
        Ok(serde_json::json!({ "function": operation.function, "args": args, "call": n }).to_string())
    }
}

/// A gateway running on an ephemeral port.
#[allow(dead_code)]
pub struct TestGateway {
    pub addr: SocketAddr,
    pub backend: Arc<RecordingBackend>,
    pub store: Option<MemoryStore>,
    shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestGateway {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }

    pub fn stop(&self) {
        self.shutdown.trigger();
    }
}

/// Start a gateway with the given backend and optional in-memory cache.
pub async fn start_gateway(
    backend: RecordingBackend,
    store: Option<MemoryStore>,
    policy: CachePolicy,
) -> TestGateway {
    let backend = Arc::new(backend);
    let cache = match &store {
        Some(store) => ResponseCache::new(Arc::new(store.clone())),
        None => ResponseCache::disabled(),
    };
    let dispatcher = Dispatcher::new(backend.clone(), cache, policy);

    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.listener.max_body_size = 4096;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config, dispatcher);
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestGateway {
        addr,
        backend,
        store,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
