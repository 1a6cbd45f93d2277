//! Metadata backend subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher (operation + coerced arguments)
//!     → Backend::call
//!     → postgres.rs (select mas_*($1::text, ...)::text)
//!     → JSON text payload or BackendError
//! ```
//!
//! # Design Decisions
//! - The backend is a trait object injected at construction time
//! - Calls are never retried
//! - Error text from the database is kept verbatim for the client

pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::dispatch::coerce::Argument;
use crate::dispatch::operations::Operation;

pub use postgres::PgBackend;

/// Errors reported by a backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The call failed; message is the backend's own text.
    #[error("{0}")]
    Call(String),

    /// The function returned SQL NULL instead of a JSON document.
    #[error("{function} returned no result")]
    NullResult { function: &'static str },
}

/// A store able to execute the operations of the operation table.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Invoke `operation` with positional `args`, returning its JSON text.
    async fn call(&self, operation: &Operation, args: &[Argument]) -> Result<String, BackendError>;
}
