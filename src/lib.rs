//! Metadata API gateway library.
//!
//! Translates URL-encoded query requests into calls to the `mas_*` backend
//! functions, with an optional best-effort memcached response cache.

pub mod backend;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::GatewayConfig;
pub use dispatch::Dispatcher;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
