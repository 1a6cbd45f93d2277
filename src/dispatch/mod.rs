//! Operation dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! GatewayRequest (path, query flags, form values)
//!     → operations.rs (flag presence → Operation, table order)
//!     → dispatcher.rs (cache lookup when the policy allows)
//!     → coerce.rs (raw strings → typed nullable arguments)
//!     → Backend::call
//!     → dispatcher.rs (cache store on success)
//!     → payload bytes or GatewayError
//! ```
//!
//! # Design Decisions
//! - The operation table is fixed at compile time
//! - Empty values become NULL, never zero values
//! - Backend and cache are injected; nothing here is global

pub mod coerce;
pub mod dispatcher;
pub mod operations;
pub mod request;

pub use coerce::{Argument, CoercionError};
pub use dispatcher::{CacheOutcome, CachePolicy, Dispatched, Dispatcher};
pub use operations::{Operation, ParamSource, ParamSpec, ParamType, OPERATIONS};
pub use request::GatewayRequest;
