//! Logger adapter binding contextual fields to every record it emits.
//!
//! ```
//! use geo_analytics_api::logging::LoggerAdapter;
//!
//! let logger = LoggerAdapter::get_logger("geo-analytics-api.regions")
//!     .with_context("component", "regions");
//! logger
//!     .info("Fetching regions")
//!     .field("count", 2)
//!     .function(geo_analytics_api::function_name!())
//!     .emit();
//! ```

use std::panic::Location;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::Level;

use super::record::{ExceptionInfo, Severity};

/// Logger name used when the caller does not pick one.
pub const DEFAULT_LOGGER_NAME: &str = "geo-analytics-api";

/// Name of the enclosing function, without its module path.
///
/// # Examples
/// ```
/// fn lookup() -> &'static str {
///     geo_analytics_api::function_name!()
/// }
/// assert_eq!(lookup(), "lookup");
/// ```
#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        let name = name.strip_suffix("::f").unwrap_or(name);
        name.rsplit("::")
            .find(|segment| *segment != "{{closure}}")
            .unwrap_or(name)
    }};
}

/// Named logger carrying context merged into every record.
///
/// Context bound on the adapter wins over call-site fields with the same
/// name.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggerAdapter {
    name: String,
    context: Map<String, Value>,
}

impl Default for LoggerAdapter {
    fn default() -> Self {
        Self::get_logger(DEFAULT_LOGGER_NAME)
    }
}

impl LoggerAdapter {
    /// Logger with the given name and no bound context.
    pub fn get_logger(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            context: Map::new(),
        }
    }

    /// Bind a context field.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Logger name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bound context fields.
    #[must_use]
    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// Whether any subscriber would record an event at `severity`.
    #[must_use]
    pub fn is_enabled(&self, severity: Severity) -> bool {
        match severity {
            Severity::Debug => tracing::enabled!(Level::DEBUG),
            Severity::Info => tracing::enabled!(Level::INFO),
            Severity::Warning => tracing::enabled!(Level::WARN),
            Severity::Error | Severity::Critical => tracing::enabled!(Level::ERROR),
        }
    }

    /// Start a record at an explicit severity.
    #[track_caller]
    pub fn event(&self, severity: Severity, message: impl Into<String>) -> LogEvent<'_> {
        self.event_at(severity, message, Location::caller())
    }

    pub(crate) fn event_at(
        &self,
        severity: Severity,
        message: impl Into<String>,
        location: &'static Location<'static>,
    ) -> LogEvent<'_> {
        LogEvent {
            logger: self,
            severity,
            message: message.into(),
            location,
            function: None,
            fields: Map::new(),
            exception: None,
        }
    }

    /// Start a DEBUG record.
    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) -> LogEvent<'_> {
        self.event(Severity::Debug, message)
    }

    /// Start an INFO record.
    #[track_caller]
    pub fn info(&self, message: impl Into<String>) -> LogEvent<'_> {
        self.event(Severity::Info, message)
    }

    /// Start a WARNING record.
    #[track_caller]
    pub fn warning(&self, message: impl Into<String>) -> LogEvent<'_> {
        self.event(Severity::Warning, message)
    }

    /// Start an ERROR record.
    #[track_caller]
    pub fn error(&self, message: impl Into<String>) -> LogEvent<'_> {
        self.event(Severity::Error, message)
    }

    /// Start a CRITICAL record.
    #[track_caller]
    pub fn critical(&self, message: impl Into<String>) -> LogEvent<'_> {
        self.event(Severity::Critical, message)
    }
}

/// A record being assembled; nothing is written until [`LogEvent::emit`].
#[must_use = "log events are only written by `emit`"]
pub struct LogEvent<'logger> {
    logger: &'logger LoggerAdapter,
    severity: Severity,
    message: String,
    location: &'static Location<'static>,
    function: Option<&'static str>,
    fields: Map<String, Value>,
    exception: Option<ExceptionInfo>,
}

impl LogEvent<'_> {
    /// Add a call-site field.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Add several call-site fields.
    pub fn fields(mut self, fields: Map<String, Value>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Attach an exception block.
    pub fn exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    /// Record the calling function, usually via [`function_name!`](crate::function_name).
    pub fn function(mut self, function: &'static str) -> Self {
        self.function = Some(function);
        self
    }

    /// Write the record.
    pub fn emit(self) {
        let mut extra = self.fields;
        extra.extend(self.logger.context.clone());
        let extra = if extra.is_empty() {
            String::new()
        } else {
            Value::Object(extra).to_string()
        };
        let exception = self
            .exception
            .and_then(|exception| serde_json::to_string(&exception).ok())
            .unwrap_or_default();
        let module = module_of(self.location);
        let function = self.function.unwrap_or_default();
        let logger = self.logger.name.as_str();
        let severity = self.severity.as_str();
        let line = self.location.line();
        let message = self.message;

        macro_rules! emit_at {
            ($level:expr) => {
                tracing::event!(
                    $level,
                    log.logger = logger,
                    log.severity = severity,
                    log.module = module,
                    log.function = function,
                    log.line = line,
                    log.extra = extra.as_str(),
                    log.exception = exception.as_str(),
                    "{}",
                    message
                )
            };
        }

        match self.severity {
            Severity::Debug => emit_at!(Level::DEBUG),
            Severity::Info => emit_at!(Level::INFO),
            Severity::Warning => emit_at!(Level::WARN),
            Severity::Error | Severity::Critical => emit_at!(Level::ERROR),
        }
    }
}

fn module_of(location: &Location<'static>) -> &'static str {
    Path::new(location.file())
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    //! Merging rules and call-site capture for the logger adapter.

    use super::*;
    use crate::TraceId;
    use crate::logging::capture::CapturedLogs;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn logs() -> CapturedLogs {
        CapturedLogs::new()
    }

    #[rstest]
    fn adapter_context_beats_call_site_fields(logs: CapturedLogs) {
        let logger =
            LoggerAdapter::get_logger("geo-analytics-api.test").with_context("user", "ctx");
        tracing::subscriber::with_default(logs.subscriber(), || {
            logger
                .info("hello")
                .field("user", "call-site")
                .field("other", 1)
                .emit();
        });

        let record = &logs.records()[0];
        assert_eq!(record["user"], json!("ctx"));
        assert_eq!(record["other"], json!(1));
        assert_eq!(record["logger"], json!("geo-analytics-api.test"));
    }

    #[rstest]
    fn records_capture_the_call_site(logs: CapturedLogs) {
        fn handler(logger: &LoggerAdapter) {
            logger.warning("slow").function(crate::function_name!()).emit();
        }

        tracing::subscriber::with_default(logs.subscriber(), || {
            handler(&LoggerAdapter::default());
        });

        let record = &logs.records()[0];
        assert_eq!(record["level"], json!("WARNING"));
        assert_eq!(record["module"], json!("adapter"));
        assert_eq!(record["function"], json!("handler"));
        assert_eq!(record["logger"], json!(DEFAULT_LOGGER_NAME));
    }

    #[rstest]
    fn critical_survives_the_error_level(logs: CapturedLogs) {
        let error = std::io::Error::other("disk gone");
        tracing::subscriber::with_default(logs.subscriber(), || {
            LoggerAdapter::default()
                .critical("Unhandled exception: Error")
                .exception(ExceptionInfo::from_error(&error))
                .emit();
        });

        let record = &logs.records()[0];
        assert_eq!(record["level"], json!("CRITICAL"));
        assert_eq!(
            record["exception"],
            json!({"type": "Error", "message": "disk gone", "traceback": "Error: disk gone"})
        );
    }

    #[rstest]
    fn one_record_per_call(logs: CapturedLogs) {
        let logger = LoggerAdapter::default();
        tracing::subscriber::with_default(logs.subscriber(), || {
            logger.debug("one").emit();
            logger.error("two").emit();
        });

        let records = logs.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["level"], json!("DEBUG"));
        assert_eq!(records[1]["level"], json!("ERROR"));
    }

    #[tokio::test]
    async fn records_carry_the_active_trace_id() {
        let logs = CapturedLogs::new();
        let _guard = tracing::subscriber::set_default(logs.subscriber());
        let trace_id = TraceId::generate();

        TraceId::scope(trace_id, async {
            LoggerAdapter::default().info("scoped").emit();
        })
        .await;

        assert_eq!(logs.records()[0]["request_id"], json!(trace_id.to_string()));
    }

    #[rstest]
    fn is_enabled_reflects_the_subscriber(logs: CapturedLogs) {
        let logger = LoggerAdapter::default();
        let enabled = tracing::subscriber::with_default(logs.subscriber(), || {
            logger.is_enabled(Severity::Critical)
        });
        assert!(enabled);
    }
}
