// Log Source and Log Event domain model

use crate::domain::Severity;
use std::path::{Path, PathBuf};

/// Source id of the supervised process's merged stdout/stderr stream
pub const PROCESS_OUTPUT_SOURCE: &str = "hms-stdout-stderr";

/// Source id of the supervisor's own diagnostics and summary
pub const SUPERVISOR_SOURCE: &str = "hms-runner";

/// Where a Log Event came from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogSource {
    /// Merged stdout/stderr of the supervised process (one per run)
    ProcessOutput,
    /// An auxiliary file being tailed
    File(PathBuf),
    /// The supervisor itself
    Supervisor,
}

impl LogSource {
    pub fn file(path: impl AsRef<Path>) -> Self {
        LogSource::File(path.as_ref().to_path_buf())
    }

    /// Stable identifier used to tag emitted events
    pub fn id(&self) -> String {
        match self {
            LogSource::ProcessOutput => PROCESS_OUTPUT_SOURCE.to_string(),
            LogSource::File(path) => path.display().to_string(),
            LogSource::Supervisor => SUPERVISOR_SOURCE.to_string(),
        }
    }
}

impl std::fmt::Display for LogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogSource::ProcessOutput => f.write_str(PROCESS_OUTPUT_SOURCE),
            LogSource::File(path) => write!(f, "{}", path.display()),
            LogSource::Supervisor => f.write_str(SUPERVISOR_SOURCE),
        }
    }
}

/// A single classified line, immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub source: LogSource,
    pub severity: Severity,
    pub message: String,
    pub timestamp_ms: i64, // epoch ms
}

impl LogEvent {
    pub fn new(
        source: LogSource,
        severity: Severity,
        message: impl Into<String>,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            source,
            severity,
            message: message.into(),
            timestamp_ms,
        }
    }

    /// Build an event whose severity comes from the line's markers
    pub fn classified(source: LogSource, line: impl Into<String>, timestamp_ms: i64) -> Self {
        let message = line.into();
        let severity = crate::domain::classify(&message);
        Self::new(source, severity, message, timestamp_ms)
    }
}
