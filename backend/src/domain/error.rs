//! Domain-level error taxonomy.
//!
//! These errors are raised by business logic and describe *expected*
//! failures. Each one carries a fixed HTTP status, a stable machine-readable
//! code, a human message and a map of structured details. Inbound adapters
//! read them only through [`DomainError::status_code`],
//! [`DomainError::error_code`], [`DomainError::message`] and
//! [`DomainError::details`]; they never match on the concrete variant.

use serde_json::{Map, Value};

/// Stable error code strings exposed to clients.
pub mod codes {
    /// Fallback code for errors built without an explicit code.
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    /// The requested dataset does not exist.
    pub const DATASET_NOT_FOUND: &str = "DATASET_NOT_FOUND";
    /// Submitted data could not be interpreted.
    pub const INVALID_DATA_FORMAT: &str = "INVALID_DATA_FORMAT";
    /// An analytics computation failed.
    pub const ANALYTICS_PROCESSING_ERROR: &str = "ANALYTICS_PROCESSING_ERROR";
    /// The caller exceeded its request allowance.
    pub const RATE_LIMIT_EXCEEDED: &str = "RATE_LIMIT_EXCEEDED";
}

/// Retry delay suggested when no explicit value is supplied.
pub const DEFAULT_RETRY_AFTER_SECONDS: u64 = 60;

/// Concrete failure described by a [`DomainError`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum DomainErrorKind {
    /// A dataset lookup found nothing.
    #[error("Dataset '{dataset_id}' not found")]
    DatasetNotFound {
        /// Identifier the caller asked for.
        dataset_id: String,
    },
    /// Input data is malformed.
    #[error("Invalid data format: {reason}")]
    InvalidDataFormat {
        /// Why the data was rejected.
        reason: String,
    },
    /// An analytics operation could not complete.
    #[error("Analytics processing failed: {reason}")]
    AnalyticsProcessingFailure {
        /// Name of the failing operation.
        operation: String,
        /// Why it failed.
        reason: String,
    },
    /// The caller is being throttled.
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimitExceeded {
        /// Seconds the caller should wait before retrying.
        retry_after_seconds: u64,
    },
    /// Base form used when none of the specific variants fit.
    #[error("{message}")]
    Custom {
        /// Human-readable message.
        message: String,
        /// HTTP status code.
        status_code: u16,
        /// Stable machine-readable code.
        error_code: String,
    },
}

/// Validation failures raised by [`DomainError::try_with_status`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainErrorValidationError {
    /// The message was blank.
    #[error("error message must not be empty")]
    EmptyMessage,
    /// The error code was blank.
    #[error("error code must not be empty")]
    EmptyErrorCode,
    /// The status is not an HTTP client or server error.
    #[error("status code {0} is not an HTTP error status")]
    NotAnErrorStatus(u16),
}

/// Expected failure raised by business logic.
///
/// ## Invariants
/// - `status_code` and `error_code` are fixed by the constructor and cannot
///   be changed afterwards.
/// - [`DomainError::details`] always contains the constructor arguments;
///   extra detail fields never shadow them.
///
/// # Examples
/// ```
/// use geo_analytics_api::domain::DomainError;
///
/// let err = DomainError::dataset_not_found("abc123");
/// assert_eq!(err.status_code(), 404);
/// assert_eq!(err.error_code(), "DATASET_NOT_FOUND");
/// assert_eq!(err.details()["dataset_id"], "abc123");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DomainError {
    kind: DomainErrorKind,
    extra: Map<String, Value>,
}

impl DomainError {
    fn from_kind(kind: DomainErrorKind) -> Self {
        Self {
            kind,
            extra: Map::new(),
        }
    }

    /// A requested dataset does not exist (404).
    pub fn dataset_not_found(dataset_id: impl Into<String>) -> Self {
        Self::from_kind(DomainErrorKind::DatasetNotFound {
            dataset_id: dataset_id.into(),
        })
    }

    /// Data supplied by the caller is malformed (400).
    pub fn invalid_data_format(reason: impl Into<String>) -> Self {
        Self::from_kind(DomainErrorKind::InvalidDataFormat {
            reason: reason.into(),
        })
    }

    /// An analytics computation failed (500).
    pub fn analytics_processing(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::from_kind(DomainErrorKind::AnalyticsProcessingFailure {
            operation: operation.into(),
            reason: reason.into(),
        })
    }

    /// The caller exceeded its allowance (429) and should retry later.
    pub fn rate_limit_exceeded(retry_after_seconds: u64) -> Self {
        Self::from_kind(DomainErrorKind::RateLimitExceeded {
            retry_after_seconds,
        })
    }

    /// Rate limit error with the default retry delay of 60 seconds.
    pub fn rate_limited() -> Self {
        Self::rate_limit_exceeded(DEFAULT_RETRY_AFTER_SECONDS)
    }

    /// Base error with status 500 and code `INTERNAL_ERROR`.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::from_kind(DomainErrorKind::Custom {
            message: message.into(),
            status_code: 500,
            error_code: codes::INTERNAL_ERROR.to_owned(),
        })
    }

    /// Base error with an explicit status and code.
    ///
    /// # Examples
    /// ```
    /// use geo_analytics_api::domain::DomainError;
    ///
    /// let err = DomainError::try_with_status("quota exhausted", 402, "QUOTA_EXHAUSTED")
    ///     .expect("valid error");
    /// assert_eq!(err.status_code(), 402);
    /// assert!(DomainError::try_with_status("fine", 200, "OK").is_err());
    /// ```
    pub fn try_with_status(
        message: impl Into<String>,
        status_code: u16,
        error_code: impl Into<String>,
    ) -> Result<Self, DomainErrorValidationError> {
        let message = message.into();
        let error_code = error_code.into();
        if message.trim().is_empty() {
            return Err(DomainErrorValidationError::EmptyMessage);
        }
        if error_code.trim().is_empty() {
            return Err(DomainErrorValidationError::EmptyErrorCode);
        }
        if !(400..=599).contains(&status_code) {
            return Err(DomainErrorValidationError::NotAnErrorStatus(status_code));
        }
        Ok(Self::from_kind(DomainErrorKind::Custom {
            message,
            status_code,
            error_code,
        }))
    }

    /// Attach an extra named detail field.
    ///
    /// Fields named after a constructor argument are ignored when the details
    /// map is assembled.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Attach several extra detail fields at once.
    #[must_use]
    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.extra.extend(details);
        self
    }

    /// The concrete failure.
    #[must_use]
    pub const fn kind(&self) -> &DomainErrorKind {
        &self.kind
    }

    /// Stable variant name, used as the exception type in logs.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self.kind {
            DomainErrorKind::DatasetNotFound { .. } => "DatasetNotFound",
            DomainErrorKind::InvalidDataFormat { .. } => "InvalidDataFormat",
            DomainErrorKind::AnalyticsProcessingFailure { .. } => "AnalyticsProcessingFailure",
            DomainErrorKind::RateLimitExceeded { .. } => "RateLimitExceeded",
            DomainErrorKind::Custom { .. } => "DomainError",
        }
    }

    /// HTTP status code reported to clients.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match &self.kind {
            DomainErrorKind::DatasetNotFound { .. } => 404,
            DomainErrorKind::InvalidDataFormat { .. } => 400,
            DomainErrorKind::AnalyticsProcessingFailure { .. } => 500,
            DomainErrorKind::RateLimitExceeded { .. } => 429,
            DomainErrorKind::Custom { status_code, .. } => *status_code,
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn error_code(&self) -> &str {
        match &self.kind {
            DomainErrorKind::DatasetNotFound { .. } => codes::DATASET_NOT_FOUND,
            DomainErrorKind::InvalidDataFormat { .. } => codes::INVALID_DATA_FORMAT,
            DomainErrorKind::AnalyticsProcessingFailure { .. } => {
                codes::ANALYTICS_PROCESSING_ERROR
            }
            DomainErrorKind::RateLimitExceeded { .. } => codes::RATE_LIMIT_EXCEEDED,
            DomainErrorKind::Custom { error_code, .. } => error_code.as_str(),
        }
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    /// Structured details: extra fields first, constructor arguments on top.
    #[must_use]
    pub fn details(&self) -> Map<String, Value> {
        let mut details = self.extra.clone();
        match &self.kind {
            DomainErrorKind::DatasetNotFound { dataset_id } => {
                details.insert("dataset_id".to_owned(), Value::from(dataset_id.as_str()));
            }
            DomainErrorKind::InvalidDataFormat { reason } => {
                details.insert("reason".to_owned(), Value::from(reason.as_str()));
            }
            DomainErrorKind::AnalyticsProcessingFailure { operation, reason } => {
                details.insert("operation".to_owned(), Value::from(operation.as_str()));
                details.insert("reason".to_owned(), Value::from(reason.as_str()));
            }
            DomainErrorKind::RateLimitExceeded {
                retry_after_seconds,
            } => {
                details.insert(
                    "retry_after_seconds".to_owned(),
                    Value::from(*retry_after_seconds),
                );
            }
            DomainErrorKind::Custom { .. } => {}
        }
        details
    }
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for DomainError {}

impl From<DomainErrorKind> for DomainError {
    fn from(kind: DomainErrorKind) -> Self {
        Self::from_kind(kind)
    }
}
