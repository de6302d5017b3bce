// File tailer: follows one auxiliary log file from its end-of-file forward
//
// Polls the file on a fixed interval (tokio timer, no busy loop) and tracks
// the byte offset it has consumed. Truncation (length < offset) and
// replacement (new inode) both restart reading at the top of the new content.
// A file that does not exist yet is waited for; once it appears, everything
// in it is new.
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use hms_runner_core::application::constants::{MAX_TAIL_READ_BYTES_PER_TICK, TAIL_POLL_INTERVAL};
use hms_runner_core::application::ShutdownToken;
use hms_runner_core::domain::LogSource;
use hms_runner_core::port::{LogSink, SourceLogger, TimeProvider};

/// Where a freshly opened file is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartAt {
    /// Current end of file
    End,
    /// A byte offset recorded earlier (0 = everything)
    Offset(u64),
}

/// Open handle plus everything needed to resume reading it
struct OpenFile {
    file: File,
    /// Bytes consumed so far, complete lines or not
    offset: u64,
    /// Inode at open time (Unix), used to detect replacement
    identity: Option<u64>,
    /// Bytes after the last newline: an in-progress line
    partial: Vec<u8>,
}

impl OpenFile {
    async fn open(path: &Path, start: StartAt) -> io::Result<Self> {
        let mut file = File::open(path).await?;
        let metadata = file.metadata().await?;
        if metadata.is_dir() {
            return Err(io::Error::new(io::ErrorKind::Other, "path is a directory"));
        }

        let offset = match start {
            StartAt::End => metadata.len(),
            StartAt::Offset(offset) => offset,
        };
        file.seek(SeekFrom::Start(offset)).await?;

        Ok(Self {
            file,
            offset,
            identity: file_identity(&metadata),
            partial: Vec::new(),
        })
    }

    async fn rewind(&mut self) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(0)).await?;
        self.offset = 0;
        self.partial.clear();
        Ok(())
    }

    /// Read what is available (bounded per tick) and return complete lines
    async fn read_lines(&mut self) -> io::Result<Vec<String>> {
        let mut chunk = vec![0u8; 64 * 1024];
        let mut consumed = 0;
        while consumed < MAX_TAIL_READ_BYTES_PER_TICK {
            let n = self.file.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            self.offset += n as u64;
            consumed += n;
            self.partial.extend_from_slice(&chunk[..n]);
        }
        Ok(self.take_complete_lines())
    }

    fn take_complete_lines(&mut self) -> Vec<String> {
        let Some(last_newline) = self.partial.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let rest = self.partial.split_off(last_newline + 1);
        let mut complete = std::mem::replace(&mut self.partial, rest);
        complete.pop();

        // blank lines are kept: every complete line is an event
        complete
            .split(|b| *b == b'\n')
            .map(|raw| String::from_utf8_lossy(raw).trim().to_string())
            .collect()
    }
}

#[cfg(unix)]
fn file_identity(metadata: &std::fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.ino())
}

#[cfg(not(unix))]
fn file_identity(_metadata: &std::fs::Metadata) -> Option<u64> {
    None
}

/// Follows a single file and forwards each new complete line
pub struct FileTailer {
    path: PathBuf,
    logger: SourceLogger,
    poll_interval: Duration,
    start: StartAt,
    /// Set while a mid-run I/O error is outstanding, so it is reported once
    error_reported: bool,
}

impl FileTailer {
    pub fn new(
        path: impl Into<PathBuf>,
        sink: Arc<dyn LogSink>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        let path = path.into();
        Self {
            logger: SourceLogger::new(LogSource::file(&path), sink, time_provider),
            path,
            poll_interval: TAIL_POLL_INTERVAL,
            start: StartAt::End,
            error_reported: false,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Begin reading at `offset` instead of wherever the file ends when the
    /// task first runs
    ///
    /// The pool records each file's length while it is still discovering, so
    /// lines written between discovery and the first poll are not skipped.
    pub fn with_start_offset(mut self, offset: u64) -> Self {
        self.start = StartAt::Offset(offset);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Tail until `token` is cancelled
    ///
    /// On cancellation one final read forwards any complete lines already on
    /// disk; an unterminated last line is dropped. A file that cannot be
    /// opened (other than not existing yet) is reported once as an error
    /// event and the tailer returns immediately.
    pub async fn run(mut self, mut token: ShutdownToken) {
        let mut current = match OpenFile::open(&self.path, self.start).await {
            Ok(file) => {
                debug!(path = %self.path.display(), offset = file.offset, "Tailer started");
                Some(file)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "File not there yet, waiting for it");
                None
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Tailer could not start");
                self.logger.error(format!("tail failed: {}", e));
                return;
            }
        };

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => self.poll(&mut current).await,
            }
        }

        // drain what is already on disk before stopping
        self.poll(&mut current).await;
        debug!(path = %self.path.display(), "Tailer stopped");
    }

    /// One polling step: handle appearance, replacement and truncation, then read
    async fn poll(&mut self, current: &mut Option<OpenFile>) {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // removed or renamed away: finish the old handle, wait for a new file
                if current.is_some() {
                    self.forward_available(current).await;
                    info!(path = %self.path.display(), "File removed, waiting for it to reappear");
                    *current = None;
                }
                return;
            }
            Err(e) => {
                self.report_error("stat", &e);
                return;
            }
        };

        let Some(open) = current.as_mut() else {
            // appeared after start: all of it is new
            match OpenFile::open(&self.path, StartAt::Offset(0)).await {
                Ok(file) => {
                    info!(path = %self.path.display(), "File appeared, following it");
                    *current = Some(file);
                    self.forward_available(current).await;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => self.report_error("open", &e),
            }
            return;
        };

        let replaced = match (open.identity, file_identity(&metadata)) {
            (Some(old), Some(new)) => old != new,
            _ => false,
        };

        if replaced {
            self.forward_available(current).await;
            info!(path = %self.path.display(), "File replaced, following the new file");
            match OpenFile::open(&self.path, StartAt::Offset(0)).await {
                Ok(file) => *current = Some(file),
                Err(e) => {
                    *current = None;
                    if e.kind() != io::ErrorKind::NotFound {
                        self.report_error("reopen", &e);
                    }
                    return;
                }
            }
        } else if metadata.len() < open.offset {
            info!(
                path = %self.path.display(),
                old_offset = open.offset,
                new_size = metadata.len(),
                "File truncated, resuming from the start"
            );
            if let Err(e) = open.rewind().await {
                self.report_error("rewind", &e);
                return;
            }
        }

        self.forward_available(current).await;
    }

    async fn forward_available(&mut self, current: &mut Option<OpenFile>) {
        let Some(open) = current.as_mut() else {
            return;
        };

        match open.read_lines().await {
            Ok(lines) => {
                self.error_reported = false;
                for line in lines {
                    self.logger.line(line);
                }
            }
            Err(e) => self.report_error("read", &e),
        }
    }

    fn report_error(&mut self, op: &str, e: &io::Error) {
        if self.error_reported {
            return;
        }
        self.error_reported = true;
        warn!(path = %self.path.display(), op = op, error = %e, "Tailer I/O error");
        self.logger.warn(format!("tail {} error: {}", op, e));
    }
}
