//! Canonical JSON error envelope returned for every failed request.
//!
//! ```json
//! {"error": {"id": "…", "timestamp": "…Z", "status_code": 404,
//!   "error_code": "DATASET_NOT_FOUND", "message": "…", "details": {…}}}
//! ```

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::logging::format_timestamp;

/// Top-level error response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The rendered error.
    pub error: ErrorBody,
}

/// Fields of a rendered error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Unique identifier of this occurrence, quoted to support.
    pub id: Uuid,
    /// When the response was rendered (UTC, trailing `Z`).
    pub timestamp: String,
    /// HTTP status code, repeated from the response line.
    pub status_code: u16,
    /// Stable machine-readable code.
    pub error_code: String,
    /// Human-readable message.
    pub message: String,
    /// Structured details; omitted when empty.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
    /// Diagnostic traceback; only present in debug mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

impl ErrorEnvelope {
    /// Start building an envelope from its required fields.
    ///
    /// # Examples
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use geo_analytics_api::inbound::http::error_response::ErrorEnvelope;
    /// use uuid::Uuid;
    ///
    /// let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    /// let envelope = ErrorEnvelope::builder(Uuid::nil(), 404, "HTTP_ERROR", "Not Found")
    ///     .traceback(false, Some("hidden".to_owned()))
    ///     .build_at(at);
    /// assert_eq!(envelope.error.timestamp, "2026-01-01T00:00:00.000000Z");
    /// assert!(envelope.error.traceback.is_none());
    /// ```
    pub fn builder(
        id: Uuid,
        status_code: u16,
        error_code: impl Into<String>,
        message: impl Into<String>,
    ) -> ErrorEnvelopeBuilder {
        ErrorEnvelopeBuilder {
            id,
            status_code,
            error_code: error_code.into(),
            message: message.into(),
            details: Map::new(),
            traceback: None,
        }
    }
}

/// Builder for [`ErrorEnvelope`].
#[derive(Debug, Clone)]
#[must_use]
pub struct ErrorEnvelopeBuilder {
    id: Uuid,
    status_code: u16,
    error_code: String,
    message: String,
    details: Map<String, Value>,
    traceback: Option<String>,
}

impl ErrorEnvelopeBuilder {
    /// Set the structured details.
    pub fn details(mut self, details: Map<String, Value>) -> Self {
        self.details = details;
        self
    }

    /// Attach `text` only when `include` is set and text is available.
    pub fn traceback(mut self, include: bool, text: Option<String>) -> Self {
        self.traceback = text.filter(|_| include);
        self
    }

    /// Render with an explicit timestamp.
    pub fn build_at(self, now: DateTime<Utc>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorBody {
                id: self.id,
                timestamp: format_timestamp(now),
                status_code: self.status_code,
                error_code: self.error_code,
                message: self.message,
                details: self.details,
                traceback: self.traceback,
            },
        }
    }

    /// Render with the current time from `clock`.
    pub fn build(self, clock: &dyn Clock) -> ErrorEnvelope {
        self.build_at(clock.utc())
    }
}
