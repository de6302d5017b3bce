// Severity classification for supervised output lines

use serde::{Deserialize, Serialize};

/// Severity of a forwarded log line
///
/// Ordered so that `Info < Warning < Error`. Assigned once by [`classify`]
/// and never lowered afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Marker table, evaluated top to bottom. First match wins.
///
/// `NOTE` lines are deliberately absent: they fall through to `Info`.
const MARKERS: &[(&str, Severity)] = &[
    ("SEVERE", Severity::Error),
    ("ERROR", Severity::Error),
    ("WARNING", Severity::Warning),
];

/// Classify a raw output line by the markers the engine prints
///
/// # Example
/// ```
/// use hms_runner_core::domain::{classify, Severity};
///
/// assert_eq!(classify("ERROR 10000: Simulation failed"), Severity::Error);
/// assert_eq!(classify("NOTE 10008: Finished opening project"), Severity::Info);
/// ```
pub fn classify(line: &str) -> Severity {
    MARKERS
        .iter()
        .find(|(marker, _)| line.contains(marker))
        .map(|(_, severity)| *severity)
        .unwrap_or(Severity::Info)
}
