//! Log record shape.
//!
//! One [`LogRecord`] becomes exactly one line of JSON. Fixed keys are written
//! first; the open-ended `extra` map is merged on top so caller and adapter
//! context win over the defaults.

use std::error::Error as StdError;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::UnclassifiedError;
use crate::domain::failure::{render_source_chain, short_type_name};

/// Severity of a log record.
///
/// `Critical` has no `tracing` counterpart; it travels as an `ERROR` event
/// tagged with a severity override and is restored by the JSON layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Verbose diagnostics.
    Debug,
    /// Normal operation.
    Info,
    /// Something unexpected that was handled.
    Warning,
    /// A failed operation.
    Error,
    /// A failure nobody anticipated.
    Critical,
}

impl Severity {
    /// Upper-case level name as written to the log.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    /// Parse a level name case-insensitively; accepts `WARN` for `WARNING`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DEBUG" | "TRACE" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARNING" | "WARN" => Some(Self::Warning),
            "ERROR" => Some(Self::Error),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }

    pub(crate) fn from_tracing(level: tracing::Level) -> Self {
        if level == tracing::Level::ERROR {
            Self::Error
        } else if level == tracing::Level::WARN {
            Self::Warning
        } else if level == tracing::Level::INFO {
            Self::Info
        } else {
            Self::Debug
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured description of an error attached to a log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionInfo {
    /// Short type name of the error.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Display text of the error.
    pub message: String,
    /// The error followed by its chain of causes.
    pub traceback: String,
}

impl ExceptionInfo {
    /// Build exception info from explicit parts.
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

    /// Describe an error using its Rust type name.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: StdError + ?Sized,
    {
        Self::named(short_type_name(std::any::type_name::<E>()), error)
    }

    /// Describe an error under an explicit type name.
    pub fn named<E>(type_name: &str, error: &E) -> Self
    where
        E: StdError + ?Sized,
    {
        Self::new(
            type_name,
            error.to_string(),
            render_source_chain(type_name, error),
        )
    }
}

impl From<&UnclassifiedError> for ExceptionInfo {
    fn from(error: &UnclassifiedError) -> Self {
        Self::new(error.type_name(), error.message(), error.traceback())
    }
}

/// Render a UTC instant as ISO-8601 with microseconds and a trailing `Z`.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use geo_analytics_api::logging::format_timestamp;
///
/// let instant = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
/// assert_eq!(format_timestamp(instant), "2026-01-02T03:04:05.000000Z");
/// ```
#[must_use]
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// One structured log record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    /// When the record was produced.
    pub timestamp: String,
    /// Severity name.
    pub level: Severity,
    /// Logger identity.
    pub logger: String,
    /// Rendered message.
    pub message: String,
    /// Module (source file stem) that issued the call.
    pub module: String,
    /// Function that issued the call, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    /// Source line of the call.
    pub line: u32,
    /// Correlation identifier of the request being handled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Attached error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionInfo>,
    /// Open-ended fields merged over everything above.
    #[serde(skip)]
    pub extra: Map<String, Value>,
}

impl LogRecord {
    /// Flatten into a JSON object with `extra` applied last.
    #[must_use]
    pub fn into_json(self) -> Map<String, Value> {
        let mut object = match serde_json::to_value(&self) {
            Ok(Value::Object(object)) => object,
            _ => Map::new(),
        };
        object.extend(self.extra);
        object
    }

    /// Render as a single line of JSON without a trailing newline.
    #[must_use]
    pub fn to_line(self) -> String {
        Value::Object(self.into_json()).to_string()
    }
}

#[cfg(test)]
mod tests {
    //! Tests for record flattening and severity parsing.

    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn record() -> LogRecord {
        LogRecord {
            timestamp: "2026-01-02T03:04:05.000000Z".to_owned(),
            level: Severity::Info,
            logger: "geo-analytics-api".to_owned(),
            message: "hello".to_owned(),
            module: "routes".to_owned(),
            function: None,
            line: 12,
            request_id: None,
            exception: None,
            extra: Map::new(),
        }
    }

    #[rstest]
    fn optional_fields_are_omitted(record: LogRecord) {
        let object = record.into_json();
        assert!(!object.contains_key("function"));
        assert!(!object.contains_key("request_id"));
        assert!(!object.contains_key("exception"));
        assert_eq!(object["level"], json!("INFO"));
        assert_eq!(object["line"], json!(12));
    }

    #[rstest]
    fn extra_fields_take_precedence(mut record: LogRecord) {
        record.extra.insert("message".to_owned(), json!("overridden"));
        record.extra.insert("region".to_owned(), json!("emea"));

        let object = record.into_json();
        assert_eq!(object["message"], json!("overridden"));
        assert_eq!(object["region"], json!("emea"));
    }

    #[rstest]
    fn lines_are_single_json_objects(mut record: LogRecord) {
        record.message = "multi\nline".to_owned();
        let line = record.to_line();
        assert!(!line.contains('\n'));
        let parsed: Value = serde_json::from_str(&line).expect("valid JSON");
        assert_eq!(parsed["message"], json!("multi\nline"));
    }

    #[rstest]
    #[case("warn", Some(Severity::Warning))]
    #[case("Critical", Some(Severity::Critical))]
    #[case(" info ", Some(Severity::Info))]
    #[case("loud", None)]
    fn severity_parses_level_names(#[case] input: &str, #[case] expected: Option<Severity>) {
        assert_eq!(Severity::parse(input), expected);
    }

    #[rstest]
    fn exception_info_uses_type_name_and_chain() {
        let error = std::io::Error::other("disk full");
        let info = ExceptionInfo::from_error(&error);
        assert_eq!(info.type_name, "Error");
        assert_eq!(info.message, "disk full");
        assert_eq!(info.traceback, "Error: disk full");
        assert_eq!(
            serde_json::to_value(&info).expect("serialise")["type"],
            json!("Error")
        );
    }
}
