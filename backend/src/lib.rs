//! Geo-analytics API library modules.
//!
//! The crate couples a small analytics HTTP surface with a typed failure
//! taxonomy, a dispatcher rendering every failure as one JSON envelope, and
//! a structured JSON logger correlating records by request.

pub mod config;
pub mod doc;
pub mod domain;
pub mod inbound;
pub mod logging;
pub mod middleware;
pub mod server;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
