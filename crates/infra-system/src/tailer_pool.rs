// Glob-based tailer pool
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::file_tailer::FileTailer;
use hms_runner_core::application::constants::TAIL_POLL_INTERVAL;
use hms_runner_core::application::TailerGroup;
use hms_runner_core::port::{LogSink, TailerPool, TimeProvider};

/// Expand each pattern against `base_dir`, once
///
/// Relative patterns are joined to `base_dir` (with `base_dir` escaped so its
/// own characters are never treated as wildcards); absolute patterns are used
/// as-is. Matches are returned in pattern order; a path matched by two
/// patterns appears twice. Invalid patterns and unreadable entries are
/// skipped with a warning.
pub fn discover(patterns: &[String], base_dir: &Path) -> Vec<PathBuf> {
    let mut matches = Vec::new();

    for pattern in patterns {
        let full = if Path::new(pattern).is_absolute() {
            pattern.clone()
        } else {
            let Some(base) = base_dir.to_str() else {
                warn!(base_dir = %base_dir.display(), "Base directory is not valid UTF-8, skipping pattern");
                continue;
            };
            let base = glob::Pattern::escape(base);
            Path::new(&base).join(pattern).to_string_lossy().into_owned()
        };

        let paths = match glob::glob(&full) {
            Ok(paths) => paths,
            Err(e) => {
                warn!(pattern = %full, error = %e, "Invalid glob pattern, skipping");
                continue;
            }
        };

        let before = matches.len();
        for entry in paths {
            match entry {
                Ok(path) => matches.push(path),
                Err(e) => warn!(pattern = %full, error = %e, "Unreadable glob entry, skipping"),
            }
        }
        debug!(pattern = %full, matched = matches.len() - before, "Pattern expanded");
    }

    matches
}

/// Tailer pool that discovers files by glob and tails each one
pub struct GlobTailerPool {
    sink: Arc<dyn LogSink>,
    time_provider: Arc<dyn TimeProvider>,
    poll_interval: Duration,
}

impl GlobTailerPool {
    pub fn new(sink: Arc<dyn LogSink>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            sink,
            time_provider,
            poll_interval: TAIL_POLL_INTERVAL,
        }
    }

    /// Override how often each tailer polls its file
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl TailerPool for GlobTailerPool {
    fn start(&self, patterns: &[String], base_dir: &Path) -> TailerGroup {
        let mut group = TailerGroup::new();

        for path in discover(patterns, base_dir) {
            let mut tailer =
                FileTailer::new(&path, Arc::clone(&self.sink), Arc::clone(&self.time_provider))
                    .with_poll_interval(self.poll_interval);

            // fix the start point now, before the process gets to write
            match std::fs::metadata(&path) {
                Ok(metadata) if metadata.is_file() => {
                    debug!(path = %path.display(), offset = metadata.len(), "Starting tailer");
                    tailer = tailer.with_start_offset(metadata.len());
                }
                _ => debug!(path = %path.display(), "Starting tailer without a start offset"),
            }
            group.spawn(tailer.run(group.token()));
        }

        info!(
            base_dir = %base_dir.display(),
            patterns = ?patterns,
            tailers = group.len(),
            "Tailer pool started"
        );
        group
    }
}
