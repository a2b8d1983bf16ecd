//! Request middleware.
//!
//! Purpose: Define middleware components for request lifecycle concerns such as
//! correlation identifiers. Failure rendering lives with the HTTP adapter in
//! [`crate::inbound::http::error_handling`].

pub mod trace;

pub use trace::Trace;
