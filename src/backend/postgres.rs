//! PostgreSQL backend.
//!
//! # Responsibilities
//! - Open the bounded connection pool from configuration
//! - Render one call statement per operation
//! - Bind typed nullable arguments and fetch the JSON text result

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;

use crate::backend::{Backend, BackendError};
use crate::config::DatabaseConfig;
use crate::dispatch::coerce::Argument;
use crate::dispatch::operations::{Operation, OPERATIONS};

/// Backend executing `mas_*` SQL functions over a shared pool.
#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
    /// Call statement per operation flag.
    statements: HashMap<&'static str, String>,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        let statements = OPERATIONS
            .iter()
            .map(|op| (op.flag, call_statement(op)))
            .collect();
        Self { pool, statements }
    }

    /// Connect the pool and verify the database answers.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let idle = idle_connections(config);
        let pool = PgPoolOptions::new()
            .max_connections(config.limit)
            .min_connections(idle)
            .connect_with(connect_options(config))
            .await?;

        let backend = Self::new(pool);
        backend.health_check().await?;

        tracing::info!(
            host = %config.host,
            database = %config.name,
            user = %config.user,
            idle,
            max_open = config.limit,
            "Database pool ready"
        );
        Ok(backend)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("select true")
            .fetch_one(&self.pool)
            .await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Backend for PgBackend {
    async fn call(&self, operation: &Operation, args: &[Argument]) -> Result<String, BackendError> {
        let sql = self
            .statements
            .get(operation.flag)
            .ok_or_else(|| BackendError::Call(format!("no statement for {}", operation.function)))?;

        let mut query = sqlx::query_scalar::<_, Option<String>>(sql);
        for arg in args {
            query = match arg {
                Argument::Text(v) => query.bind(v.clone()),
                Argument::Integer(v) => query.bind(*v),
                Argument::Float(v) => query.bind(*v),
                Argument::Timestamp(v) => query.bind(*v),
                Argument::TextList(v) => query.bind(v.clone()),
                Argument::Json(v) => query.bind(v.clone()),
            };
        }

        query
            .fetch_one(&self.pool)
            .await
            .map_err(call_error)?
            .ok_or(BackendError::NullResult {
                function: operation.function,
            })
    }
}

fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    let options = PgConnectOptions::new()
        .port(config.port)
        .database(&config.name)
        .username(&config.user)
        .ssl_mode(PgSslMode::Disable);

    // A leading '/' names a unix socket directory.
    let options = if config.host.starts_with('/') {
        options.socket(&config.host)
    } else {
        options.host(&config.host)
    };

    if config.password.is_empty() {
        options
    } else {
        options.password(&config.password)
    }
}

/// Idle pool size, clamped to the connection limit.
fn idle_connections(config: &DatabaseConfig) -> u32 {
    if config.pool > config.limit {
        tracing::warn!(
            pool = config.pool,
            limit = config.limit,
            "database.pool exceeds database.limit, clamping idle connections to the limit"
        );
        return config.limit;
    }
    config.pool
}

/// Render `select fn($1::t1, $2::t2, ...)::text as json` for an operation.
fn call_statement(operation: &Operation) -> String {
    let placeholders: Vec<String> = operation
        .params
        .iter()
        .enumerate()
        .map(|(i, param)| format!("${}::{}", i + 1, param.ty.sql_type()))
        .collect();
    format!(
        "select {}({})::text as json",
        operation.function,
        placeholders.join(", ")
    )
}

fn call_error(err: sqlx::Error) -> BackendError {
    match err.as_database_error() {
        Some(db_err) => BackendError::Call(db_err.message().to_string()),
        None => BackendError::Call(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::operations::by_flag;

    #[test]
    fn test_statement_without_params() {
        let op = by_flag("list_root_gpath").unwrap();
        assert_eq!(call_statement(op), "select mas_list_root_gpath()::text as json");
    }

    #[test]
    fn test_statement_casts() {
        let op = by_flag("timestamps").unwrap();
        assert_eq!(
            call_statement(op),
            "select mas_timestamps($1::text, $2::timestamptz, $3::timestamptz, $4::text[], $5::text)::text as json"
        );

        let op = by_flag("put_ows_cache").unwrap();
        assert!(call_statement(op).contains("$3::jsonb"));
    }

    #[test]
    fn test_intersects_statement_has_all_placeholders() {
        let op = by_flag("intersects").unwrap();
        let sql = call_statement(op);
        assert!(sql.contains("$11::integer"));
        assert!(sql.contains("$9::float8"));
        assert!(!sql.contains("$12"));
    }

    #[test]
    fn test_error_text_is_verbatim() {
        let err = call_error(sqlx::Error::RowNotFound);
        assert_eq!(err.to_string(), sqlx::Error::RowNotFound.to_string());
    }

    #[test]
    fn test_idle_connections_clamped_to_limit() {
        let config = DatabaseConfig {
            pool: 100,
            limit: 10,
            ..DatabaseConfig::default()
        };
        assert_eq!(idle_connections(&config), 10);

        let config = DatabaseConfig {
            pool: 4,
            limit: 10,
            ..DatabaseConfig::default()
        };
        assert_eq!(idle_connections(&config), 4);
    }
}
