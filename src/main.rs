//! Metadata API gateway (v1)
//!
//! Stateless HTTP front end for the metadata database.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                    MAS GATEWAY                        │
//!                      │                                                       │
//!   Client Request     │  ┌────────┐    ┌──────────────┐    ┌──────────────┐  │
//!   ───────────────────┼─▶│  http  │───▶│  dispatcher  │───▶│  operations  │  │
//!                      │  │ server │    │              │    │    table     │  │
//!                      │  └────────┘    └──────┬───────┘    └──────────────┘  │
//!                      │                       │                               │
//!                      │           ┌───────────┼────────────┐                  │
//!                      │           ▼           ▼            ▼                  │
//!                      │     ┌─────────┐ ┌──────────┐ ┌──────────┐            │
//!                      │     │  cache  │ │  coerce  │ │ backend  │────────────┼──▶ PostgreSQL
//!                      │     │  (md5)  │ │ (NULLs)  │ │  (sqlx)  │            │    mas_* functions
//!                      │     └────┬────┘ └──────────┘ └──────────┘            │
//!                      │          │                                            │
//!                      └──────────┼────────────────────────────────────────────┘
//!                                 ▼
//!                             memcached
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use mas_gateway::backend::PgBackend;
use mas_gateway::cache::ResponseCache;
use mas_gateway::config::loader::{read_config, validate};
use mas_gateway::config::GatewayConfig;
use mas_gateway::dispatch::{CachePolicy, Dispatcher};
use mas_gateway::lifecycle::{signals, Shutdown};
use mas_gateway::observability::{logging, metrics};
use mas_gateway::HttpServer;

/// Command-line flags; each overrides the matching config file value.
#[derive(Parser, Debug)]
#[command(name = "mas-gateway", version, about = "Metadata API gateway")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, env = "MAS_CONFIG")]
    config: Option<PathBuf>,

    /// Database host or unix socket directory.
    #[arg(long, env = "MAS_DBHOST")]
    dbhost: Option<String>,

    /// Database name.
    #[arg(long, env = "MAS_DATABASE")]
    database: Option<String>,

    /// Database user name.
    #[arg(long, env = "MAS_USER")]
    user: Option<String>,

    /// Database user password.
    #[arg(long, env = "MAS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Idle database connections kept open.
    #[arg(long, env = "MAS_POOL")]
    pool: Option<u32>,

    /// Maximum concurrent database connections.
    #[arg(long, env = "MAS_LIMIT")]
    limit: Option<u32>,

    /// HTTP port (binds all interfaces).
    #[arg(long, env = "MAS_PORT")]
    port: Option<u16>,

    /// Memcached endpoint, host:port.
    #[arg(long, env = "MAS_MEMCACHE")]
    memcache: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "MAS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (pretty, json).
    #[arg(long, env = "MAS_LOG_FORMAT")]
    log_format: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut GatewayConfig) {
        if let Some(host) = self.dbhost {
            config.database.host = host;
        }
        if let Some(name) = self.database {
            config.database.name = name;
        }
        if let Some(user) = self.user {
            config.database.user = user;
        }
        if let Some(password) = self.password {
            config.database.password = password;
        }
        if let Some(pool) = self.pool {
            config.database.pool = pool;
        }
        if let Some(limit) = self.limit {
            config.database.limit = limit;
        }
        if let Some(port) = self.port {
            config.listener.bind_address = SocketAddr::from(([0, 0, 0, 0], port)).to_string();
        }
        if let Some(uri) = self.memcache.filter(|uri| !uri.is_empty()) {
            config.cache.uri = Some(uri);
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut cli = Cli::parse();

    let mut config = match cli.config.take() {
        Some(path) => read_config(&path)?,
        None => GatewayConfig::default(),
    };
    cli.apply(&mut config);
    validate(&config)?;

    logging::init_logging(&config.observability);

    tracing::info!("mas-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        database = ?config.database,
        cache = ?config.cache.uri,
        bypass_ows_operations = config.cache.bypass_ows_operations,
        "Configuration loaded"
    );

    // No backend, no service.
    let backend = match PgBackend::connect(&config.database).await {
        Ok(backend) => backend,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to the metadata database");
            return Err(e.into());
        }
    };

    let cache = ResponseCache::from_config(&config.cache);
    let dispatcher = Dispatcher::new(
        Arc::new(backend.clone()),
        cache,
        CachePolicy::from_config(&config.cache),
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_handler(shutdown);

    let server = HttpServer::new(config, dispatcher);
    server.run(listener, server_shutdown).await?;

    backend.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
