// Supervisor constants (No magic values)
use std::time::Duration;

/// Wait after the process exits before tailers are told to stop (1s)
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(1);

/// How long process output may keep arriving after the process exits (1s)
/// Pipes still held open by a background child are abandoned after this.
pub const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// How often a tailer checks its file for new content (250ms)
pub const TAIL_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Upper bound on bytes a tailer reads from its file per poll (1 MiB)
/// A burst larger than this is consumed over consecutive polls.
pub const MAX_TAIL_READ_BYTES_PER_TICK: usize = 1024 * 1024;

/// Default auxiliary log patterns, relative to the project directory
pub const DEFAULT_LOG_PATTERNS: &[&str] = &["*.log", "*.out"];
