//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the gateway handler on every path
//! - Wire up middleware (request ID, tracing)
//! - Bind server to listener
//! - Hand requests to the dispatcher and format the result
//! - Observability (metrics, correlation IDs)

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::dispatch::Dispatcher;
use crate::http::request::{read_gateway_request, request_id, MakeRequestUuid};
use crate::http::response::json_payload;
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub max_body_size: usize,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a new HTTP server around an assembled dispatcher.
    pub fn new(config: GatewayConfig, dispatcher: Dispatcher) -> Self {
        let state = AppState {
            dispatcher,
            max_body_size: config.listener.max_body_size,
        };
        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = %request_id(request.headers()),
                        )
                    }))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Gateway handler: selects the operation and answers with its JSON payload.
async fn gateway_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers()).to_string();

    let request = match read_gateway_request(request, state.max_body_size).await {
        Ok(r) => r,
        Err(response) => {
            metrics::record_request("none", response.status().as_u16(), start_time);
            return response;
        }
    };

    let operation = match state.dispatcher.select(&request) {
        Ok(op) => op,
        Err(e) => {
            tracing::debug!(request_id = %request_id, peer = %peer, uri = %request.uri(), "No operation flag in request");
            metrics::record_request("none", e.status().as_u16(), start_time);
            return e.into_response();
        }
    };

    match state.dispatcher.execute(operation, &request).await {
        Ok(dispatched) => {
            tracing::debug!(
                request_id = %request_id,
                operation = operation.flag,
                gpath = %request.gpath(),
                cache = dispatched.cache.as_str(),
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "Request served"
            );
            metrics::record_request(operation.flag, 200, start_time);
            json_payload(dispatched.payload)
        }
        Err(e) => {
            tracing::debug!(
                request_id = %request_id,
                operation = operation.flag,
                kind = e.kind(),
                error = %e,
                "Request failed"
            );
            metrics::record_request(operation.flag, e.status().as_u16(), start_time);
            e.into_response()
        }
    }
}
