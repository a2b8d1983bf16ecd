//! Failure dispatch: log by category, then render the error envelope.
//!
//! | Category     | Status        | Error code              | Logged at |
//! |--------------|---------------|-------------------------|-----------|
//! | Domain       | error's own   | error's own             | ERROR     |
//! | Validation   | 422           | `VALIDATION_ERROR`      | not logged|
//! | Transport    | failure's own | `HTTP_ERROR`            | not logged|
//! | Unclassified | 500           | `INTERNAL_SERVER_ERROR` | CRITICAL  |
//!
//! Every dispatched failure gets a fresh error id. Tracebacks reach the
//! caller only for unclassified failures and only in debug mode.

use std::io::Write;
use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::http::header::{CACHE_CONTROL, HeaderValue};
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use serde_json::{Map, Value};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use uuid::Uuid;

use super::error_response::ErrorEnvelope;
use crate::domain::{DomainError, Failure, TransportError, UnclassifiedError, ValidationErrors};
use crate::function_name;
use crate::logging::{ExceptionInfo, LoggerAdapter, Severity};

/// Error code for request validation failures.
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
/// Error code for transport-level HTTP failures.
pub const HTTP_ERROR: &str = "HTTP_ERROR";
/// Error code for unclassified failures.
pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";
/// Message rendered for validation failures.
pub const VALIDATION_MESSAGE: &str = "Request validation failed";
/// Message rendered for unclassified failures.
pub const UNCLASSIFIED_MESSAGE: &str =
    "An unexpected error occurred. Please contact support with the error ID.";

/// Request attributes recorded alongside logged failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    path: String,
    method: String,
}

impl RequestContext {
    /// Context from explicit parts.
    pub fn new(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
        }
    }

    /// Context for an actix request: its absolute URL and method.
    ///
    /// The URL is assembled from the connection's scheme and host without
    /// parsing, so client-supplied `Host` or `X-Forwarded-Host` values are
    /// recorded verbatim.
    #[must_use]
    pub fn from_request(request: &HttpRequest) -> Self {
        let path = {
            let info = request.connection_info();
            let target = request
                .uri()
                .path_and_query()
                .map_or_else(|| request.path(), |pq| pq.as_str());
            format!("{}://{}{}", info.scheme(), info.host(), target)
        };
        Self::new(path, request.method().as_str())
    }

    /// Requested URL.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }
}

/// Status and body produced for one failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    status: StatusCode,
    envelope: ErrorEnvelope,
}

impl ErrorResponse {
    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Rendered body.
    #[must_use]
    pub const fn envelope(&self) -> &ErrorEnvelope {
        &self.envelope
    }

    /// Convert into an actix response with a JSON body.
    #[must_use]
    pub fn into_http_response(self) -> HttpResponse {
        HttpResponse::build(self.status)
            .insert_header((CACHE_CONTROL, HeaderValue::from_static("no-store")))
            .json(self.envelope)
    }
}

/// Routes failures to their category handler.
///
/// # Examples
/// ```
/// use geo_analytics_api::domain::{DomainError, Failure};
/// use geo_analytics_api::inbound::http::dispatch::{ErrorDispatcher, RequestContext};
///
/// let dispatcher = ErrorDispatcher::new(false);
/// let failure = Failure::from(DomainError::dataset_not_found("abc123"));
/// let response = dispatcher.dispatch(&failure, &RequestContext::new("/api/datasets/abc123", "GET"));
/// assert_eq!(response.status().as_u16(), 404);
/// assert_eq!(response.envelope().error.error_code, "DATASET_NOT_FOUND");
/// ```
#[derive(Clone)]
pub struct ErrorDispatcher {
    debug: bool,
    logger: LoggerAdapter,
    clock: Arc<dyn Clock>,
    fallback: Arc<BoxMakeWriter>,
}

impl ErrorDispatcher {
    /// Dispatcher logging through the default logger with the system clock.
    ///
    /// Unclassified failures that no subscriber would record are written to
    /// stderr instead.
    #[must_use]
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            logger: LoggerAdapter::default(),
            clock: Arc::new(DefaultClock),
            fallback: Arc::new(BoxMakeWriter::new(std::io::stderr)),
        }
    }

    /// Replace the sink used when logging is unavailable.
    #[must_use]
    pub fn with_fallback_writer<W>(mut self, writer: W) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        self.fallback = Arc::new(BoxMakeWriter::new(writer));
        self
    }

    /// Replace the clock used for envelope timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the logger used for failure records.
    #[must_use]
    pub fn with_logger(mut self, logger: LoggerAdapter) -> Self {
        self.logger = logger;
        self
    }

    /// Whether tracebacks are exposed to callers.
    #[must_use]
    pub const fn debug(&self) -> bool {
        self.debug
    }

    /// Log `failure` as its category requires and render the response.
    pub fn dispatch(&self, failure: &Failure, request: &RequestContext) -> ErrorResponse {
        let error_id = Uuid::new_v4();
        let now = self.clock.utc();
        match failure {
            Failure::Domain(error) => self.handle_domain(error, error_id, request, now),
            Failure::Validation(errors) => render_validation(errors, error_id, now),
            Failure::Transport(error) => render_transport(error, error_id, now),
            Failure::Unclassified(error) => {
                self.handle_unclassified(error, error_id, request, now)
            }
        }
    }

    fn handle_domain(
        &self,
        error: &DomainError,
        error_id: Uuid,
        request: &RequestContext,
        now: DateTime<Utc>,
    ) -> ErrorResponse {
        self.logger
            .error(format!("API Error: {}", error.error_code()))
            .function(function_name!())
            .field("error_id", error_id.to_string())
            .field("error_code", error.error_code())
            .field("message", error.message())
            .field("details", Value::Object(error.details()))
            .field("path", request.path())
            .field("method", request.method())
            .exception(ExceptionInfo::named(error.kind_name(), error))
            .emit();
        render_domain(error, error_id, now)
    }

    fn handle_unclassified(
        &self,
        error: &UnclassifiedError,
        error_id: Uuid,
        request: &RequestContext,
        now: DateTime<Utc>,
    ) -> ErrorResponse {
        if self.logger.is_enabled(Severity::Critical) {
            self.logger
                .critical(format!("Unhandled exception: {}", error.type_name()))
                .function(function_name!())
                .field("error_id", error_id.to_string())
                .field("exception_type", error.type_name())
                .field("exception_message", error.message())
                .field("path", request.path())
                .field("method", request.method())
                .exception(ExceptionInfo::from(error))
                .emit();
        } else {
            let mut sink = self.fallback.make_writer();
            let _ = writeln!(
                sink,
                "CRITICAL ERROR [{error_id}]: {}\n{}",
                error.message(),
                error.traceback()
            );
        }
        render_unclassified(error, error_id, self.debug, now)
    }
}

fn status_from(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn render_domain(error: &DomainError, error_id: Uuid, now: DateTime<Utc>) -> ErrorResponse {
    let status = status_from(error.status_code());
    ErrorResponse {
        status,
        envelope: ErrorEnvelope::builder(
            error_id,
            status.as_u16(),
            error.error_code(),
            error.message(),
        )
        .details(error.details())
        .build_at(now),
    }
}

fn render_validation(
    errors: &ValidationErrors,
    error_id: Uuid,
    now: DateTime<Utc>,
) -> ErrorResponse {
    let issues = serde_json::to_value(errors.issues()).unwrap_or(Value::Array(Vec::new()));
    let mut details = Map::new();
    details.insert("validation_errors".to_owned(), issues);
    let status = StatusCode::UNPROCESSABLE_ENTITY;
    ErrorResponse {
        status,
        envelope: ErrorEnvelope::builder(
            error_id,
            status.as_u16(),
            VALIDATION_ERROR,
            VALIDATION_MESSAGE,
        )
        .details(details)
        .build_at(now),
    }
}

fn render_transport(error: &TransportError, error_id: Uuid, now: DateTime<Utc>) -> ErrorResponse {
    let status = status_from(error.status());
    ErrorResponse {
        status,
        envelope: ErrorEnvelope::builder(error_id, status.as_u16(), HTTP_ERROR, error.detail())
            .build_at(now),
    }
}

fn render_unclassified(
    error: &UnclassifiedError,
    error_id: Uuid,
    debug: bool,
    now: DateTime<Utc>,
) -> ErrorResponse {
    let mut details = Map::new();
    details.insert("error_id".to_owned(), Value::String(error_id.to_string()));
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    ErrorResponse {
        status,
        envelope: ErrorEnvelope::builder(
            error_id,
            status.as_u16(),
            INTERNAL_SERVER_ERROR,
            UNCLASSIFIED_MESSAGE,
        )
        .details(details)
        .traceback(debug, Some(error.traceback().to_owned()))
        .build_at(now),
    }
}

/// Render without logging, with tracebacks hidden.
///
/// Used when a `Failure` escapes outside the error-handling middleware; the
/// middleware replaces this body with a fully dispatched one.
fn render_quietly(failure: &Failure) -> ErrorResponse {
    let error_id = Uuid::new_v4();
    let now = DefaultClock.utc();
    match failure {
        Failure::Domain(error) => render_domain(error, error_id, now),
        Failure::Validation(errors) => render_validation(errors, error_id, now),
        Failure::Transport(error) => render_transport(error, error_id, now),
        Failure::Unclassified(error) => render_unclassified(error, error_id, false, now),
    }
}

impl ResponseError for Failure {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Domain(error) => status_from(error.status_code()),
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Transport(error) => status_from(error.status()),
            Self::Unclassified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        render_quietly(self).into_http_response()
    }
}
