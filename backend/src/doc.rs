//! OpenAPI documentation configuration.
//!
//! This module defines the [`ApiDoc`] struct which generates the OpenAPI
//! specification for the REST API. It registers:
//!
//! - **Paths**: the analytics endpoints and the health probes
//! - **Schemas**: request/response bodies plus the error envelope wrappers
//!   ([`ErrorEnvelopeSchema`], [`ErrorBodySchema`], [`ValidationIssueSchema`])
//!   that describe failures without coupling domain types to utoipa
//!
//! The generated specification is used by Swagger UI (debug builds) and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use crate::inbound::http::analytics::{AnalyticsQuery, DatasetSummary, QueryResult, RegionMetric};
use crate::inbound::http::health::{
    CheckStatus, HealthResponse, LivenessResponse, PingResponse, ReadinessResponse,
};
use crate::inbound::http::schemas::{ErrorBodySchema, ErrorEnvelopeSchema, ValidationIssueSchema};
use utoipa::OpenApi;

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Geo-Analytics API",
        description = "Regional analytics queries with a uniform JSON error contract."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::analytics::get_regions,
        crate::inbound::http::analytics::list_datasets,
        crate::inbound::http::analytics::get_dataset,
        crate::inbound::http::analytics::run_query,
        crate::inbound::http::health::health,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
        crate::inbound::http::health::ping,
    ),
    components(schemas(
        RegionMetric,
        DatasetSummary,
        AnalyticsQuery,
        QueryResult,
        HealthResponse,
        CheckStatus,
        ReadinessResponse,
        LivenessResponse,
        PingResponse,
        ErrorEnvelopeSchema,
        ErrorBodySchema,
        ValidationIssueSchema,
    )),
    tags(
        (name = "analytics", description = "Regional metrics and dataset queries"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
