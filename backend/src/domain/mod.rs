//! Domain primitives.
//!
//! Purpose: Define the transport-agnostic failure vocabulary and the request
//! correlation identifier shared by the HTTP adapter and the logger.
//!
//! Public surface:
//! - DomainError (alias to `error::DomainError`): expected business failure.
//! - Failure (alias to `failure::Failure`): every category the dispatcher renders.
//! - TraceId (alias to `trace_id::TraceId`): task-local correlation identifier.

pub mod error;
pub mod failure;
pub mod trace_id;

pub use self::error::{DomainError, DomainErrorKind, DomainErrorValidationError};
pub use self::failure::{
    Failure, TransportError, UnclassifiedError, ValidationErrors, ValidationIssue,
};
pub use self::trace_id::TraceId;

/// Response header carrying the request correlation identifier.
pub const TRACE_ID_HEADER: &str = "trace-id";
