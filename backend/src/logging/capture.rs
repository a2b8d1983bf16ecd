//! In-memory log capture for tests.
//!
//! Builds a subscriber around [`JsonRecordLayer`] that writes into a shared
//! buffer instead of stdout, so tests can assert on the exact records a code
//! path produced without installing a global subscriber.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use serde_json::Value;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;

use super::JsonRecordLayer;

/// Clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Shared buffer collecting rendered log lines.
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    /// Empty capture buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Instant used by [`CapturedLogs::subscriber_at`] in tests that pin time.
    #[must_use]
    pub fn fixed_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7)
            .single()
            .unwrap_or_default()
    }

    /// Subscriber writing into this buffer with the system clock.
    #[must_use]
    pub fn subscriber(&self) -> impl Subscriber + Send + Sync + 'static {
        tracing_subscriber::registry().with(JsonRecordLayer::new(self.clone()))
    }

    /// Subscriber writing into this buffer with time frozen at `instant`.
    #[must_use]
    pub fn subscriber_at(&self, instant: DateTime<Utc>) -> impl Subscriber + Send + Sync + 'static {
        tracing_subscriber::registry().with(
            JsonRecordLayer::new(self.clone()).with_clock(Arc::new(FixedClock(instant))),
        )
    }

    /// Captured output split into lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.lock())
            .lines()
            .map(str::to_owned)
            .collect()
    }

    /// Captured lines parsed as JSON; unparsable lines become `Value::Null`.
    #[must_use]
    pub fn records(&self) -> Vec<Value> {
        self.lines()
            .iter()
            .map(|line| serde_json::from_str(line).unwrap_or(Value::Null))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Writer handle produced for each event.
pub struct CapturedWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for CapturedWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'writer> MakeWriter<'writer> for CapturedLogs {
    type Writer = CapturedWriter;

    fn make_writer(&'writer self) -> Self::Writer {
        CapturedWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}
