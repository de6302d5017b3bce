// Log Sink Port
// Structured destination for classified output lines

use crate::domain::{LogEvent, LogSource, Severity};
use crate::port::TimeProvider;
use std::sync::Arc;

/// Structured sink receiving every Log Event of a run
///
/// Called concurrently from every tailer and the process output reader.
/// Each call must forward the whole event as one unit.
pub trait LogSink: Send + Sync {
    fn emit(&self, event: LogEvent);
}

/// A sink bound to one Log Source, stamping events with the current time
///
/// Cheap to clone; each reading task owns one.
#[derive(Clone)]
pub struct SourceLogger {
    source: LogSource,
    sink: Arc<dyn LogSink>,
    time_provider: Arc<dyn TimeProvider>,
}

impl SourceLogger {
    pub fn new(
        source: LogSource,
        sink: Arc<dyn LogSink>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            source,
            sink,
            time_provider,
        }
    }

    pub fn source(&self) -> &LogSource {
        &self.source
    }

    /// Classify a raw line and forward it
    pub fn line(&self, line: impl Into<String>) {
        let event = LogEvent::classified(
            self.source.clone(),
            line,
            self.time_provider.now_millis(),
        );
        self.sink.emit(event);
    }

    /// Forward a message with an explicit severity
    pub fn emit(&self, severity: Severity, message: impl Into<String>) {
        let event = LogEvent::new(
            self.source.clone(),
            severity,
            message,
            self.time_provider.now_millis(),
        );
        self.sink.emit(event);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(Severity::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(Severity::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(Severity::Error, message);
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Sink that keeps every event in memory, in arrival order
    #[derive(Default)]
    pub struct RecordingSink {
        events: Mutex<Vec<LogEvent>>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<LogEvent> {
            self.events.lock().unwrap().clone()
        }

        pub fn len(&self) -> usize {
            self.events.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// Messages from one source, in arrival order
        pub fn messages_from(&self, source: &LogSource) -> Vec<String> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| &e.source == source)
                .map(|e| e.message.clone())
                .collect()
        }

        /// Events from any source other than the supervisor itself
        pub fn observed(&self) -> Vec<LogEvent> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.source != LogSource::Supervisor)
                .cloned()
                .collect()
        }
    }

    impl LogSink for RecordingSink {
        fn emit(&self, event: LogEvent) {
            self.events.lock().unwrap().push(event);
        }
    }
}
