//! HTTP inbound adapter exposing REST endpoints and the error pipeline.

pub mod analytics;
pub mod dispatch;
pub mod error_handling;
pub mod error_response;
pub mod health;
pub mod schemas;

pub use dispatch::ErrorDispatcher;
pub use error_handling::ErrorHandling;
