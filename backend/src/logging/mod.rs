//! Structured JSON logging.
//!
//! Purpose: Render every `tracing` event as one JSON object per line,
//! enriched with the active request correlation identifier, and give call
//! sites a small adapter for binding context and attaching exception blocks.
//!
//! Public surface:
//! - JsonRecordLayer (alias to `layer::JsonRecordLayer`): the rendering layer.
//! - LoggerAdapter (alias to `adapter::LoggerAdapter`): named, context-bound logger.
//! - PerformanceScope (alias to `performance::PerformanceScope`): operation timer.
//! - init_logging (alias to `init::init_logging`): install the global subscriber.

pub mod adapter;
#[cfg(any(test, feature = "test-support"))]
pub mod capture;
pub mod init;
pub mod layer;
pub mod performance;
pub mod record;

pub use self::adapter::{DEFAULT_LOGGER_NAME, LogEvent, LoggerAdapter};
pub use self::init::{LoggingInitError, build_filter, init_logging};
pub use self::layer::JsonRecordLayer;
pub use self::performance::PerformanceScope;
pub use self::record::{ExceptionInfo, LogRecord, Severity, format_timestamp};
