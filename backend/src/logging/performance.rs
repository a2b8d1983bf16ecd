//! Scoped timing of an operation.
//!
//! [`PerformanceScope`] logs when an operation starts and, from its `Drop`
//! implementation, how it ended and how long it took. The exit record is
//! written on every path out of the scope: success, an `Err` outcome, an
//! unwinding panic, or a future dropped before completion.

use std::error::Error as StdError;
use std::future::Future;
use std::panic::Location;
use std::time::Instant;

use serde_json::{Map, Value};

use super::adapter::LoggerAdapter;
use super::record::{ExceptionInfo, Severity};
use crate::domain::failure::PANIC_TYPE_NAME;

enum Outcome {
    Success,
    Failure(ExceptionInfo),
}

/// Guard timing one operation.
///
/// # Examples
/// ```
/// use geo_analytics_api::logging::{LoggerAdapter, PerformanceScope};
/// use serde_json::Map;
///
/// let logger = LoggerAdapter::default();
/// let total: Result<u32, std::num::ParseIntError> =
///     PerformanceScope::run(&logger, "parse_total", Map::new(), || "42".parse());
/// assert_eq!(total, Ok(42));
/// ```
pub struct PerformanceScope {
    logger: LoggerAdapter,
    operation: String,
    context: Map<String, Value>,
    location: &'static Location<'static>,
    started: Instant,
    outcome: Option<Outcome>,
}

impl PerformanceScope {
    /// Start timing `operation` and log `Starting: <operation>`.
    #[track_caller]
    pub fn start(
        logger: &LoggerAdapter,
        operation: impl Into<String>,
        context: Map<String, Value>,
    ) -> Self {
        Self::start_at(logger, operation.into(), context, Location::caller())
    }

    fn start_at(
        logger: &LoggerAdapter,
        operation: String,
        context: Map<String, Value>,
        location: &'static Location<'static>,
    ) -> Self {
        logger
            .event_at(Severity::Info, format!("Starting: {operation}"), location)
            .fields(context.clone())
            .emit();
        Self {
            logger: logger.clone(),
            operation,
            context,
            location,
            started: Instant::now(),
            outcome: None,
        }
    }

    /// Record the outcome of `result` and close the scope.
    pub fn finish<T, E>(mut self, result: &Result<T, E>)
    where
        E: StdError,
    {
        self.outcome = Some(match result {
            Ok(_) => Outcome::Success,
            Err(error) => Outcome::Failure(ExceptionInfo::from_error(error)),
        });
    }

    /// Run a synchronous operation inside a scope and return its result
    /// unchanged.
    #[track_caller]
    pub fn run<T, E, F>(
        logger: &LoggerAdapter,
        operation: impl Into<String>,
        context: Map<String, Value>,
        f: F,
    ) -> Result<T, E>
    where
        E: StdError,
        F: FnOnce() -> Result<T, E>,
    {
        let scope = Self::start_at(logger, operation.into(), context, Location::caller());
        let result = f();
        scope.finish(&result);
        result
    }

    /// Run a future inside a scope and return its result unchanged.
    ///
    /// The scope starts when the returned future is first polled.
    #[track_caller]
    pub fn run_async<T, E, Fut>(
        logger: &LoggerAdapter,
        operation: impl Into<String>,
        context: Map<String, Value>,
        fut: Fut,
    ) -> impl Future<Output = Result<T, E>>
    where
        E: StdError,
        Fut: Future<Output = Result<T, E>>,
    {
        let location = Location::caller();
        let logger = logger.clone();
        let operation = operation.into();
        async move {
            let scope = Self::start_at(&logger, operation, context, location);
            let result = fut.await;
            scope.finish(&result);
            result
        }
    }

    fn elapsed_ms(&self) -> f64 {
        let millis = self.started.elapsed().as_secs_f64() * 1000.0;
        (millis * 100.0).round() / 100.0
    }
}

impl Drop for PerformanceScope {
    fn drop(&mut self) {
        let duration_ms = self.elapsed_ms();
        let outcome = self.outcome.take().unwrap_or_else(|| {
            if std::thread::panicking() {
                Outcome::Failure(ExceptionInfo::new(
                    PANIC_TYPE_NAME,
                    "operation panicked",
                    format!("{PANIC_TYPE_NAME}: {} panicked", self.operation),
                ))
            } else {
                Outcome::Failure(ExceptionInfo::new(
                    "Cancelled",
                    "operation ended before reporting an outcome",
                    format!("Cancelled: {} was dropped before completing", self.operation),
                ))
            }
        });

        let context = std::mem::take(&mut self.context);
        match outcome {
            Outcome::Success => self
                .logger
                .event_at(
                    Severity::Info,
                    format!("Completed: {}", self.operation),
                    self.location,
                )
                .fields(context)
                .field("duration_ms", duration_ms)
                .field("success", true)
                .emit(),
            Outcome::Failure(exception) => self
                .logger
                .event_at(
                    Severity::Error,
                    format!("Failed: {}", self.operation),
                    self.location,
                )
                .fields(context)
                .field("duration_ms", duration_ms)
                .field("success", false)
                .exception(exception)
                .emit(),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Exit records for every way out of a performance scope.

    use super::*;
    use crate::domain::DomainError;
    use crate::logging::capture::CapturedLogs;
    use rstest::rstest;
    use serde_json::json;

    fn context() -> Map<String, Value> {
        let mut context = Map::new();
        context.insert("dataset_id".to_owned(), json!("d1"));
        context
    }

    #[rstest]
    fn success_logs_start_and_completion() {
        let logs = CapturedLogs::new();
        let logger = LoggerAdapter::default();
        let result = tracing::subscriber::with_default(logs.subscriber(), || {
            PerformanceScope::run(&logger, "aggregate", context(), || {
                Ok::<_, DomainError>(7)
            })
        });

        assert_eq!(result, Ok(7));
        let records = logs.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["message"], json!("Starting: aggregate"));
        assert_eq!(records[0]["dataset_id"], json!("d1"));
        assert_eq!(records[1]["message"], json!("Completed: aggregate"));
        assert_eq!(records[1]["level"], json!("INFO"));
        assert_eq!(records[1]["success"], json!(true));
        assert_eq!(records[1]["dataset_id"], json!("d1"));
        assert!(records[1]["duration_ms"].as_f64().is_some_and(|ms| ms >= 0.0));
    }

    #[rstest]
    fn failure_logs_once_and_returns_the_error() {
        let logs = CapturedLogs::new();
        let logger = LoggerAdapter::default();
        let result: Result<u32, DomainError> =
            tracing::subscriber::with_default(logs.subscriber(), || {
                PerformanceScope::run(&logger, "aggregate", Map::new(), || {
                    Err(DomainError::analytics_processing("aggregate", "no rows"))
                })
            });

        assert_eq!(
            result,
            Err(DomainError::analytics_processing("aggregate", "no rows"))
        );
        let failures: Vec<_> = logs
            .records()
            .into_iter()
            .filter(|record| record["message"] == json!("Failed: aggregate"))
            .collect();
        assert_eq!(failures.len(), 1);
        let failure = &failures[0];
        assert_eq!(failure["level"], json!("ERROR"));
        assert_eq!(failure["success"], json!(false));
        assert!(failure["duration_ms"].as_f64().is_some_and(|ms| ms >= 0.0));
        assert_eq!(
            failure["exception"]["message"],
            json!("Analytics processing failed: no rows")
        );
    }

    #[rstest]
    fn panics_are_logged_and_keep_unwinding() {
        let logs = CapturedLogs::new();
        let logger = LoggerAdapter::default();
        let outcome = tracing::subscriber::with_default(logs.subscriber(), || {
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                PerformanceScope::run(&logger, "explode", Map::new(), || {
                    if logger.name().is_empty() {
                        Ok::<(), DomainError>(())
                    } else {
                        panic!("kaboom")
                    }
                })
            }))
        });

        assert!(outcome.is_err());
        let last = logs.records().pop().expect("exit record");
        assert_eq!(last["message"], json!("Failed: explode"));
        assert_eq!(last["exception"]["type"], json!(PANIC_TYPE_NAME));
    }

    #[tokio::test]
    async fn async_scopes_time_the_future() {
        let logs = CapturedLogs::new();
        let _guard = tracing::subscriber::set_default(logs.subscriber());
        let logger = LoggerAdapter::default();

        let result = PerformanceScope::run_async(&logger, "fetch", Map::new(), async {
            tokio::task::yield_now().await;
            Ok::<_, DomainError>("rows")
        })
        .await;

        assert_eq!(result, Ok("rows"));
        let messages: Vec<_> = logs
            .records()
            .iter()
            .map(|record| record["message"].clone())
            .collect();
        assert_eq!(messages, vec![json!("Starting: fetch"), json!("Completed: fetch")]);
    }

    #[rstest]
    fn abandoned_scopes_log_a_failure() {
        let logs = CapturedLogs::new();
        let logger = LoggerAdapter::default();
        tracing::subscriber::with_default(logs.subscriber(), || {
            drop(PerformanceScope::start(&logger, "abandoned", Map::new()));
        });

        let last = logs.records().pop().expect("exit record");
        assert_eq!(last["message"], json!("Failed: abandoned"));
        assert_eq!(last["success"], json!(false));
    }
}
