//! Middleware funnelling every request failure into the error dispatcher.
//!
//! Handler errors, extractor errors, unmatched routes and panics all leave
//! the pipeline as the canonical JSON envelope. Extractor configuration in
//! [`configure`] turns body, query and path deserialisation errors into
//! validation failures before they reach the middleware.
//!
//! Register [`ErrorHandling`] inside [`Trace`](crate::middleware::Trace) so
//! failures are logged with the request's correlation identifier.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::error::{InternalError, JsonPayloadError, PathError, QueryPayloadError};
use actix_web::{Error, HttpRequest, HttpResponse, web};
use futures_util::FutureExt;
use futures_util::future::{LocalBoxFuture, Ready, ready};
use serde_json::error::Category;

use super::dispatch::{ErrorDispatcher, RequestContext};
use crate::domain::{Failure, TransportError, UnclassifiedError, ValidationErrors, ValidationIssue};

/// Largest JSON body accepted by extractors, in bytes.
pub const JSON_BODY_LIMIT: usize = 256 * 1024;

/// Classify an actix error into a [`Failure`].
///
/// Attached failures pass through unchanged; remaining client errors become
/// transport failures and server errors become unclassified.
#[must_use]
pub fn classify(error: &Error) -> Failure {
    if let Some(failure) = error.as_error::<Failure>() {
        return failure.clone();
    }
    if let Some(json) = error.as_error::<JsonPayloadError>() {
        return classify_json(json);
    }
    if let Some(query) = error.as_error::<QueryPayloadError>() {
        return classify_query(query);
    }
    if let Some(path) = error.as_error::<PathError>() {
        return classify_path(path);
    }

    let status = error.as_response_error().status_code();
    let detail = error.to_string();
    if status.is_client_error() {
        let detail = if detail.is_empty() {
            status.canonical_reason().unwrap_or("Client Error").to_owned()
        } else {
            detail
        };
        Failure::from(TransportError::new(status.as_u16(), detail))
    } else {
        let type_name = debug_type_name(error);
        let traceback = format!("{type_name}: {detail}");
        Failure::from(UnclassifiedError::new(type_name, detail, traceback))
    }
}

/// Leading identifier of the error's `Debug` output, e.g. `PayloadError`.
fn debug_type_name(error: &Error) -> String {
    let debug = format!("{:?}", error.as_response_error());
    debug
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("Error")
        .to_owned()
}

fn validation(loc: Vec<String>, msg: String, kind: &str) -> Failure {
    Failure::from(ValidationErrors::single(ValidationIssue::new(loc, msg, kind)))
}

/// Map a JSON body error: oversized bodies are transport failures, the
/// rest are validation failures located at `body`.
#[must_use]
pub fn classify_json(error: &JsonPayloadError) -> Failure {
    match error {
        JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
            Failure::from(TransportError::new(413, error.to_string()))
        }
        JsonPayloadError::ContentType => validation(
            vec!["body".to_owned()],
            "Content type must be application/json".to_owned(),
            "content_type",
        ),
        JsonPayloadError::Deserialize(inner) => {
            let message = inner.to_string();
            if let Some(field) = missing_field(&message) {
                return validation(
                    vec!["body".to_owned(), field.to_owned()],
                    "Field required".to_owned(),
                    "missing",
                );
            }
            let kind = match inner.classify() {
                Category::Data => "value_error",
                Category::Syntax | Category::Eof | Category::Io => "json_invalid",
            };
            validation(vec!["body".to_owned()], message, kind)
        }
        other => {
            let status = actix_web::ResponseError::status_code(other);
            Failure::from(TransportError::new(status.as_u16(), other.to_string()))
        }
    }
}

fn missing_field(message: &str) -> Option<&str> {
    message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split('`').next())
}

/// Map a query string error to a validation failure located at `query`.
#[must_use]
pub fn classify_query(error: &QueryPayloadError) -> Failure {
    let message = match error {
        QueryPayloadError::Deserialize(inner) => inner.to_string(),
        other => other.to_string(),
    };
    validation(vec!["query".to_owned()], message, "value_error")
}

/// Map a path segment error to a validation failure located at `path`.
#[must_use]
pub fn classify_path(error: &PathError) -> Failure {
    let message = match error {
        PathError::Deserialize(inner) => inner.to_string(),
        other => other.to_string(),
    };
    validation(vec!["path".to_owned()], message, "value_error")
}

/// Register extractor configuration that reports failures as [`Failure`]s.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_BODY_LIMIT)
            .error_handler(|error, _request: &HttpRequest| classify_json(&error).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|error, _request: &HttpRequest| classify_query(&error).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|error, _request: &HttpRequest| classify_path(&error).into()),
    );
}

/// Fallback for requests that match no route.
pub async fn not_found() -> Result<HttpResponse, Failure> {
    Err(TransportError::not_found().into())
}

/// Middleware rendering every failure through an [`ErrorDispatcher`].
///
/// # Examples
/// ```
/// use actix_web::App;
/// use geo_analytics_api::inbound::http::dispatch::ErrorDispatcher;
/// use geo_analytics_api::inbound::http::error_handling::ErrorHandling;
/// use geo_analytics_api::Trace;
///
/// let app = App::new()
///     .wrap(ErrorHandling::new(ErrorDispatcher::new(false)))
///     .wrap(Trace);
/// ```
#[derive(Clone)]
pub struct ErrorHandling {
    dispatcher: Arc<ErrorDispatcher>,
}

impl ErrorHandling {
    /// Wrap `dispatcher` for use as middleware.
    #[must_use]
    pub fn new(dispatcher: ErrorDispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ErrorHandling
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = ErrorHandlingMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ErrorHandlingMiddleware {
            service,
            dispatcher: Arc::clone(&self.dispatcher),
        }))
    }
}

/// Service wrapper produced by [`ErrorHandling`].
pub struct ErrorHandlingMiddleware<S> {
    service: S,
    dispatcher: Arc<ErrorDispatcher>,
}

impl<S, B> Service<ServiceRequest> for ErrorHandlingMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Owned strings only: routing needs sole ownership of the request.
        let context = RequestContext::from_request(req.request());
        let dispatcher = Arc::clone(&self.dispatcher);
        let fut = match panic::catch_unwind(AssertUnwindSafe(|| self.service.call(req))) {
            Ok(fut) => fut,
            Err(payload) => {
                let failure = Failure::from(UnclassifiedError::from_panic(payload.as_ref()));
                return Box::pin(ready(Err(render(&dispatcher, failure, &context))));
            }
        };
        Box::pin(async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(res)) => {
                    let Some(error) = res.response().error() else {
                        return Ok(res.map_into_left_body());
                    };
                    let failure = classify(error);
                    let response = dispatcher.dispatch(&failure, &context).into_http_response();
                    Ok(res.into_response(response).map_into_right_body())
                }
                Ok(Err(error)) => Err(render(&dispatcher, classify(&error), &context)),
                Err(payload) => {
                    let failure = Failure::from(UnclassifiedError::from_panic(payload.as_ref()));
                    Err(render(&dispatcher, failure, &context))
                }
            }
        })
    }
}

/// Dispatch a failure that left no response behind.
///
/// The rendered envelope travels inside the returned error, so outer
/// middleware and the server write it unchanged.
fn render(dispatcher: &ErrorDispatcher, failure: Failure, context: &RequestContext) -> Error {
    let response = dispatcher.dispatch(&failure, context).into_http_response();
    InternalError::from_response(failure, response).into()
}
