//! Inbound adapters that translate external requests into domain calls while
//! keeping framework details at the edge.
//!
//! HTTP handlers, extractor configuration and failure rendering live under
//! [`http`].

pub mod http;
