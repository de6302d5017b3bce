// Log sink backed by tracing
use hms_runner_core::domain::{LogEvent, Severity};
use hms_runner_core::port::LogSink;

/// Target under which every forwarded line is logged
pub const OUTPUT_TARGET: &str = "hms_runner::output";

/// Forwards Log Events to the installed `tracing` subscriber
///
/// Each event becomes exactly one tracing event at the matching level, with
/// the source id as a structured `source` field.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, event: LogEvent) {
        let source = event.source.id();
        match event.severity {
            Severity::Info => tracing::info!(
                target: OUTPUT_TARGET,
                source = %source,
                ts_ms = event.timestamp_ms,
                "{}",
                event.message
            ),
            Severity::Warning => tracing::warn!(
                target: OUTPUT_TARGET,
                source = %source,
                ts_ms = event.timestamp_ms,
                "{}",
                event.message
            ),
            Severity::Error => tracing::error!(
                target: OUTPUT_TARGET,
                source = %source,
                ts_ms = event.timestamp_ms,
                "{}",
                event.message
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hms_runner_core::domain::LogSource;
    use serde_json::Value;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// In-memory writer shared by every record the subscriber formats
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(events: Vec<LogEvent>) -> Vec<Value> {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::TRACE)
            .with_writer(captured.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            for event in events {
                TracingSink.emit(event);
            }
        });

        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_one_record_per_event_at_matching_level() {
        let records = capture(vec![
            LogEvent::new(LogSource::ProcessOutput, Severity::Info, "NOTE 10008: started", 1000),
            LogEvent::new(
                LogSource::file("/data/tenk/tenk.log"),
                Severity::Warning,
                "WARNING 42716: gage data missing",
                1001,
            ),
            LogEvent::new(LogSource::Supervisor, Severity::Error, "HMS exited with code 3", 1002),
        ]);

        assert_eq!(records.len(), 3);

        let levels: Vec<&str> = records.iter().map(|r| r["level"].as_str().unwrap()).collect();
        assert_eq!(levels, vec!["INFO", "WARN", "ERROR"]);
        assert!(records.iter().all(|r| r["target"] == OUTPUT_TARGET));

        assert_eq!(records[0]["fields"]["source"], "hms-stdout-stderr");
        assert_eq!(records[0]["fields"]["message"], "NOTE 10008: started");
        assert_eq!(records[0]["fields"]["ts_ms"], 1000);
        assert_eq!(records[1]["fields"]["source"], "/data/tenk/tenk.log");
        assert_eq!(records[2]["fields"]["source"], "hms-runner");
        assert_eq!(records[2]["fields"]["message"], "HMS exited with code 3");
    }

    #[test]
    fn test_message_is_not_interpreted_as_format_string() {
        let records = capture(vec![LogEvent::new(
            LogSource::ProcessOutput,
            Severity::Info,
            "progress {0} 100%",
            0,
        )]);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["fields"]["message"], "progress {0} 100%");
    }
}
