//! OpenAPI schema definitions for the error envelope.
//!
//! The envelope and the domain failure types stay free of utoipa derives.
//! The wrappers below mirror their wire shape so the generated document
//! describes every error response without coupling those types to the
//! OpenAPI framework.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ValidationIssue`].
///
/// One field-level validation problem.
#[derive(ToSchema)]
#[schema(as = ValidationIssue)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ValidationIssueSchema {
    /// Path to the offending input, e.g. `["body", "limit"]`.
    #[schema(example = json!(["body", "limit"]))]
    loc: Vec<String>,
    /// Human-readable explanation.
    #[schema(example = "Input should be between 1 and 1000")]
    msg: String,
    /// Machine-readable issue type.
    #[schema(rename = "type", example = "value_error")]
    kind: String,
}

/// OpenAPI schema for [`super::error_response::ErrorBody`].
#[derive(ToSchema)]
#[schema(as = ErrorBody)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorBodySchema {
    /// Unique identifier of this occurrence.
    #[schema(value_type = String, format = Uuid, example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    id: String,
    /// UTC render time with a trailing `Z`.
    #[schema(example = "2026-03-04T05:06:07.000000Z")]
    timestamp: String,
    /// HTTP status code.
    #[schema(example = 404)]
    status_code: u16,
    /// Stable machine-readable code.
    #[schema(example = "DATASET_NOT_FOUND")]
    error_code: String,
    /// Human-readable message.
    #[schema(example = "Dataset 'abc123' not found")]
    message: String,
    /// Structured details; omitted when empty. Validation failures list
    /// their issues under `validation_errors`.
    #[schema(value_type = Option<Object>)]
    details: Option<serde_json::Value>,
    /// Diagnostic traceback, present only in debug mode.
    traceback: Option<String>,
}

/// OpenAPI schema for [`super::error_response::ErrorEnvelope`].
///
/// Body of every failed response.
#[derive(ToSchema)]
#[schema(as = ErrorEnvelope)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorEnvelopeSchema {
    /// The rendered error.
    error: ErrorBodySchema,
}
