//! Classification of everything that can go wrong while handling a request.
//!
//! [`Failure`] is the closed set of categories the error dispatcher knows how
//! to render: expected domain errors, request validation failures,
//! transport-level HTTP errors raised by the pipeline itself, and anything
//! else. Adapters convert framework errors into one of these before
//! dispatching.

use std::any::Any;
use std::error::Error as StdError;

use serde::{Deserialize, Serialize};

use super::DomainError;

/// Type name reported for failures caught from a panic.
pub const PANIC_TYPE_NAME: &str = "panic";

/// A failure raised while processing a request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Failure {
    /// An expected failure from business logic.
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// The request did not match the expected schema.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    /// The HTTP pipeline rejected the request before a handler ran.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Anything else.
    #[error(transparent)]
    Unclassified(#[from] UnclassifiedError),
}

impl Failure {
    /// Wrap an arbitrary error as an unclassified failure.
    pub fn unclassified<E>(error: &E) -> Self
    where
        E: StdError + ?Sized,
    {
        Self::Unclassified(UnclassifiedError::from_error(error))
    }

    /// Short category label used in diagnostics.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Domain(_) => "domain",
            Self::Validation(_) => "validation",
            Self::Transport(_) => "transport",
            Self::Unclassified(_) => "unclassified",
        }
    }
}

/// One field-level validation problem.
///
/// Serialised as `{"loc": [...], "msg": "...", "type": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Path to the offending value, e.g. `["body", "limit"]`.
    pub loc: Vec<String>,
    /// Human-readable explanation.
    pub msg: String,
    /// Machine-readable problem type, e.g. `value_error`.
    #[serde(rename = "type")]
    pub kind: String,
}

impl ValidationIssue {
    /// Build an issue from its parts.
    pub fn new<I, S>(loc: I, msg: impl Into<String>, kind: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            loc: loc.into_iter().map(Into::into).collect(),
            msg: msg.into(),
            kind: kind.into(),
        }
    }
}

/// Ordered, non-empty list of validation issues.
///
/// # Examples
/// ```
/// use geo_analytics_api::domain::{ValidationErrors, ValidationIssue};
///
/// let errors = ValidationErrors::single(ValidationIssue::new(
///     ["body", "limit"],
///     "limit must be between 1 and 1000",
///     "value_error",
/// ));
/// assert_eq!(errors.issues().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("request validation failed with {} issue(s)", .issues.len())]
pub struct ValidationErrors {
    issues: Vec<ValidationIssue>,
}

impl ValidationErrors {
    /// A single-issue failure.
    #[must_use]
    pub fn single(issue: ValidationIssue) -> Self {
        Self {
            issues: vec![issue],
        }
    }

    /// Collect issues; returns `None` when there are none to report.
    #[must_use]
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Option<Self> {
        if issues.is_empty() {
            None
        } else {
            Some(Self { issues })
        }
    }

    /// Issues in the order they were found.
    #[must_use]
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }
}

/// An HTTP-level error raised by the request pipeline, e.g. an unmatched
/// route.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status}: {detail}")]
pub struct TransportError {
    status: u16,
    detail: String,
}

impl TransportError {
    /// Build a transport error with the given status and detail text.
    pub fn new(status: u16, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    /// `404 Not Found` for requests that match no route.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(404, "Not Found")
    }

    /// HTTP status of the failure.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Detail text shown to the caller.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

/// Failure that fits no other category.
///
/// Captures everything needed for logging up front so the original error
/// value does not have to outlive the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{type_name}: {message}")]
pub struct UnclassifiedError {
    type_name: String,
    message: String,
    traceback: String,
}

impl UnclassifiedError {
    /// Build an unclassified failure from explicit parts.
    pub fn new(
        type_name: impl Into<String>,
        message: impl Into<String>,
        traceback: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            traceback: traceback.into(),
        }
    }

    /// Capture an error, its type name and its source chain.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: StdError + ?Sized,
    {
        let type_name = short_type_name(std::any::type_name::<E>());
        let message = error.to_string();
        let traceback = render_source_chain(type_name, error);
        Self::new(type_name, message, traceback)
    }

    /// Capture the payload of a caught panic.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|message| (*message).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic with a non-string payload".to_owned());
        let traceback = format!("{PANIC_TYPE_NAME}: {message}");
        Self::new(PANIC_TYPE_NAME, message, traceback)
    }

    /// Type name of the original error.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Display text of the original error.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Multi-line diagnostic text: the error followed by its causes.
    #[must_use]
    pub fn traceback(&self) -> &str {
        &self.traceback
    }
}

/// Strip module paths and generic arguments from a type name.
///
/// `std::io::error::Error` becomes `Error`; `alloc::boxed::Box<dyn Error>`
/// becomes `Box`.
pub(crate) fn short_type_name(full: &str) -> &str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

/// Render `Type: message` followed by one `Caused by:` line per source.
pub(crate) fn render_source_chain<E>(type_name: &str, error: &E) -> String
where
    E: StdError + ?Sized,
{
    let mut rendered = format!("{type_name}: {error}");
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str("\nCaused by: ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    //! Tests for failure classification helpers.

    use super::*;
    use rstest::rstest;

    #[derive(Debug, thiserror::Error)]
    #[error("outer failure")]
    struct Outer {
        #[source]
        inner: std::io::Error,
    }

    #[rstest]
    #[case("std::io::error::Error", "Error")]
    #[case("alloc::boxed::Box<dyn core::error::Error>", "Box")]
    #[case("Plain", "Plain")]
    fn short_type_name_strips_paths(#[case] full: &str, #[case] expected: &str) {
        assert_eq!(short_type_name(full), expected);
    }

    #[rstest]
    fn from_error_captures_source_chain() {
        let error = Outer {
            inner: std::io::Error::other("disk unplugged"),
        };
        let captured = UnclassifiedError::from_error(&error);

        assert_eq!(captured.type_name(), "Outer");
        assert_eq!(captured.message(), "outer failure");
        assert_eq!(
            captured.traceback(),
            "Outer: outer failure\nCaused by: disk unplugged"
        );
    }

    #[rstest]
    fn from_panic_reads_string_payloads() {
        let static_payload: Box<dyn Any + Send> = Box::new("static boom");
        let owned_payload: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        let opaque_payload: Box<dyn Any + Send> = Box::new(42_u8);

        assert_eq!(
            UnclassifiedError::from_panic(static_payload.as_ref()).message(),
            "static boom"
        );
        assert_eq!(
            UnclassifiedError::from_panic(owned_payload.as_ref()).message(),
            "owned boom"
        );
        assert_eq!(
            UnclassifiedError::from_panic(opaque_payload.as_ref()).type_name(),
            PANIC_TYPE_NAME
        );
    }

    #[rstest]
    fn validation_errors_reject_empty_lists() {
        assert!(ValidationErrors::from_issues(Vec::new()).is_none());
    }

    #[rstest]
    fn validation_issue_serialises_type_key() {
        let issue = ValidationIssue::new(["query", "limit"], "too big", "value_error");
        let value = serde_json::to_value(&issue).expect("serialise issue");
        assert_eq!(
            value,
            serde_json::json!({"loc": ["query", "limit"], "msg": "too big", "type": "value_error"})
        );
    }

    #[rstest]
    fn categories_are_labelled() {
        let failure = Failure::from(TransportError::not_found());
        assert_eq!(failure.category(), "transport");
        assert_eq!(failure.to_string(), "404: Not Found");
    }
}
