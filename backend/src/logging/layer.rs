//! `tracing-subscriber` layer rendering events as single-line JSON records.
//!
//! The layer understands a handful of reserved `log.*` fields written by
//! [`LoggerAdapter`](super::LoggerAdapter). Every other field on an event is
//! copied into the record's extra fields, so plain `tracing::info!` calls
//! render through the same shape.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Context, Layer};

use super::record::{ExceptionInfo, LogRecord, Severity, format_timestamp};
use crate::domain::TraceId;
use crate::domain::failure::render_source_chain;

pub(crate) const LOGGER_FIELD: &str = "log.logger";
pub(crate) const SEVERITY_FIELD: &str = "log.severity";
pub(crate) const MODULE_FIELD: &str = "log.module";
pub(crate) const FUNCTION_FIELD: &str = "log.function";
pub(crate) const LINE_FIELD: &str = "log.line";
pub(crate) const EXTRA_FIELD: &str = "log.extra";
pub(crate) const EXCEPTION_FIELD: &str = "log.exception";
const MESSAGE_FIELD: &str = "message";

/// Layer writing one JSON object per event to `W`.
///
/// # Examples
/// ```
/// use geo_analytics_api::logging::JsonRecordLayer;
/// use tracing_subscriber::layer::SubscriberExt;
///
/// let subscriber = tracing_subscriber::registry().with(JsonRecordLayer::new(std::io::sink));
/// tracing::subscriber::with_default(subscriber, || tracing::info!("ready"));
/// ```
pub struct JsonRecordLayer<W> {
    make_writer: W,
    clock: Arc<dyn Clock>,
}

impl<W> JsonRecordLayer<W>
where
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    /// Layer stamping records with the system clock.
    pub fn new(make_writer: W) -> Self {
        Self {
            make_writer,
            clock: Arc::new(DefaultClock),
        }
    }

    /// Replace the clock used for record timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl<S, W> Layer<S> for JsonRecordLayer<W>
where
    S: Subscriber,
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);
        let record = visitor.finish(event.metadata(), self.clock.utc(), TraceId::current());

        let mut line = record.to_line();
        line.push('\n');
        let mut writer = self.make_writer.make_writer_for(event.metadata());
        // A failing sink must never take the request down with it.
        let _ = writer.write_all(line.as_bytes());
    }
}

/// Collects reserved and free-form fields from one event.
#[derive(Default)]
struct RecordVisitor {
    message: Option<String>,
    logger: Option<String>,
    severity: Option<Severity>,
    module: Option<String>,
    function: Option<String>,
    line: Option<u32>,
    exception: Option<ExceptionInfo>,
    adapter_extra: Map<String, Value>,
    fields: Map<String, Value>,
}

impl RecordVisitor {
    fn finish(
        self,
        metadata: &Metadata<'_>,
        now: DateTime<Utc>,
        trace_id: Option<TraceId>,
    ) -> LogRecord {
        let mut extra = self.fields;
        extra.extend(self.adapter_extra);
        LogRecord {
            timestamp: format_timestamp(now),
            level: self
                .severity
                .unwrap_or_else(|| Severity::from_tracing(*metadata.level())),
            logger: self
                .logger
                .unwrap_or_else(|| metadata.target().to_owned()),
            message: self.message.unwrap_or_default(),
            module: self.module.unwrap_or_else(|| default_module(metadata)),
            function: self.function,
            line: self.line.or_else(|| metadata.line()).unwrap_or(0),
            request_id: trace_id.map(|id| id.to_string()),
            exception: self.exception,
            extra,
        }
    }

    fn record_value(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name().to_owned(), value);
    }

    fn record_text(&mut self, field: &Field, text: String) {
        match field.name() {
            MESSAGE_FIELD => self.message = Some(text),
            _ if text.is_empty() && is_reserved(field.name()) => {}
            LOGGER_FIELD => self.logger = Some(text),
            SEVERITY_FIELD => self.severity = Severity::parse(&text),
            MODULE_FIELD => self.module = Some(text),
            FUNCTION_FIELD => self.function = Some(text),
            EXTRA_FIELD => {
                if let Ok(Value::Object(map)) = serde_json::from_str(&text) {
                    self.adapter_extra = map;
                }
            }
            EXCEPTION_FIELD => self.exception = serde_json::from_str(&text).ok(),
            _ => self.record_value(field, Value::String(text)),
        }
    }
}

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_text(field, value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_text(field, format!("{value:?}"));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == LINE_FIELD {
            self.line = u32::try_from(value).ok();
        } else {
            self.record_value(field, Value::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if field.name() == LINE_FIELD {
            self.line = u32::try_from(value).ok();
        } else {
            self.record_value(field, Value::from(value));
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_value(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, Value::Bool(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        let chain = render_source_chain("error", value);
        let text = value.to_string();
        if self.exception.is_none() {
            self.exception = Some(ExceptionInfo::new("error", text.clone(), chain));
        }
        self.record_value(field, Value::String(text));
    }
}

fn is_reserved(name: &str) -> bool {
    matches!(
        name,
        LOGGER_FIELD
            | SEVERITY_FIELD
            | MODULE_FIELD
            | FUNCTION_FIELD
            | LINE_FIELD
            | EXTRA_FIELD
            | EXCEPTION_FIELD
    )
}

fn default_module(metadata: &Metadata<'_>) -> String {
    metadata
        .module_path()
        .and_then(|path| path.rsplit("::").next())
        .unwrap_or_else(|| metadata.target())
        .to_owned()
}
