// Subprocess launcher implementation
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use hms_runner_core::application::constants::OUTPUT_DRAIN_TIMEOUT;

use hms_runner_core::domain::{JobDescriptor, LaunchError, LogSource, RunResult};
use hms_runner_core::port::{LogSink, ProcessLauncher, SourceLogger, TimeProvider};

/// Subprocess launcher
///
/// Spawns the engine, fans its stdout and stderr into one merged stream and
/// forwards every non-empty line to the sink tagged as process output.
pub struct SubprocessLauncher {
    output: SourceLogger,
    time_provider: Arc<dyn TimeProvider>,
}

impl SubprocessLauncher {
    /// Create a new subprocess launcher
    ///
    /// # Arguments
    /// * `sink` - Receives the merged process output
    /// * `time_provider` - Timestamps events and measures run duration
    pub fn new(sink: Arc<dyn LogSink>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            output: SourceLogger::new(LogSource::ProcessOutput, sink, Arc::clone(&time_provider)),
            time_provider,
        }
    }

    /// Spawn the child with both output pipes captured
    fn spawn(&self, job: &JobDescriptor) -> std::io::Result<Child> {
        let mut command = Command::new(job.executable());
        command
            .args(job.args())
            .envs(job.env().iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(job.working_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // dropping `command` here closes the parent's copies of the pipe ends
        command.spawn()
    }

    /// Merge stdout and stderr into a single line stream
    ///
    /// The receiver yields `None` once both pipes reach end-of-file or both
    /// returned pump tasks are aborted.
    fn merge_output(
        child: &mut Child,
    ) -> (mpsc::UnboundedReceiver<String>, Vec<JoinHandle<()>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut pumps = Vec::with_capacity(2);

        if let Some(stdout) = child.stdout.take() {
            pumps.push(tokio::spawn(pump_lines(stdout, tx.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(tokio::spawn(pump_lines(stderr, tx)));
        }

        (rx, pumps)
    }

    /// Build the run result from the child's exit status
    fn build_result(status: ExitStatus) -> RunResult {
        if let Some(code) = status.code() {
            return RunResult::from_code(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return RunResult::Failed(LaunchError::Signal(signal));
            }
        }

        RunResult::Failed(LaunchError::Wait(format!(
            "process ended without an exit code: {}",
            status
        )))
    }
}

/// Read `reader` line by line into the merged stream
///
/// Bytes are decoded as lossy UTF-8 so a stray byte never ends the stream.
async fn pump_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(4096);
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "Process output read failed");
                break;
            }
        }
    }
}

/// Classify and forward every non-empty merged line, in arrival order
async fn forward_lines(mut rx: mpsc::UnboundedReceiver<String>, output: SourceLogger) -> usize {
    let mut forwarded = 0;
    while let Some(line) = rx.recv().await {
        let line = line.trim();
        if !line.is_empty() {
            output.line(line);
            forwarded += 1;
        }
    }
    forwarded
}

#[async_trait]
impl ProcessLauncher for SubprocessLauncher {
    async fn launch(&self, job: &JobDescriptor) -> RunResult {
        let start_time = self.time_provider.now_millis();

        info!(
            executable = %job.executable().display(),
            args = ?job.args(),
            working_dir = %job.working_dir().display(),
            "Starting subprocess"
        );

        let mut child = match self.spawn(job) {
            Ok(child) => child,
            Err(e) => {
                error!(
                    executable = %job.executable().display(),
                    error = %e,
                    "Subprocess spawn failed"
                );
                return RunResult::Failed(LaunchError::Spawn(e.to_string()));
            }
        };
        debug!(pid = ?child.id(), "Subprocess started");

        // reading runs concurrently with waiting for exit
        let (merged, pumps) = Self::merge_output(&mut child);
        let mut forwarder = tokio::spawn(forward_lines(merged, self.output.clone()));

        let result = match child.wait().await {
            Ok(status) => Self::build_result(status),
            Err(e) => RunResult::Failed(LaunchError::Wait(e.to_string())),
        };

        // a background child may still hold the pipes open: drain for a
        // bounded time, then stop reading so the run can move on
        let drained = match tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, &mut forwarder).await {
            Ok(drained) => drained,
            Err(_) => {
                warn!(
                    timeout_ms = OUTPUT_DRAIN_TIMEOUT.as_millis() as u64,
                    "Process output still open after exit, no longer reading it"
                );
                for pump in &pumps {
                    pump.abort();
                }
                // lines already read still reach the sink
                forwarder.await
            }
        };

        let lines = match drained {
            Ok(lines) => lines,
            Err(join_err) => {
                error!("Process output forwarder failed: {:?}", join_err);
                0
            }
        };

        let duration_ms = self.time_provider.now_millis() - start_time;
        info!(
            duration_ms = %duration_ms,
            exit_code = ?result.exit_code(),
            lines = lines,
            result = %result,
            "Subprocess finished"
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hms_runner_core::domain::Severity;
    use hms_runner_core::port::log_sink::mocks::RecordingSink;
    use hms_runner_core::port::time_provider::SystemTimeProvider;
    use std::time::Duration;

    fn launcher(sink: &Arc<RecordingSink>) -> SubprocessLauncher {
        SubprocessLauncher::new(sink.clone(), Arc::new(SystemTimeProvider))
    }

    fn sh(script: &str) -> JobDescriptor {
        JobDescriptor::builder("sh")
            .args(["-c", script])
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_launch_success() {
        let sink = Arc::new(RecordingSink::new());
        let job = JobDescriptor::builder("echo")
            .args(["ERROR", "boom"])
            .build()
            .unwrap();

        let result = launcher(&sink).launch(&job).await;

        assert_eq!(result, RunResult::Success);
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, LogSource::ProcessOutput);
        assert_eq!(events[0].severity, Severity::Error);
        assert_eq!(events[0].message, "ERROR boom");
    }

    #[tokio::test]
    async fn test_stderr_is_merged() {
        let sink = Arc::new(RecordingSink::new());
        let job = sh("echo 'NOTE to stdout'; echo 'WARNING to stderr' 1>&2");

        let result = launcher(&sink).launch(&job).await;

        assert!(result.is_success());
        let mut messages = sink.messages_from(&LogSource::ProcessOutput);
        messages.sort();
        assert_eq!(messages, vec!["NOTE to stdout", "WARNING to stderr"]);
    }

    #[tokio::test]
    async fn test_blank_lines_dropped_and_trimmed() {
        let sink = Arc::new(RecordingSink::new());
        let job = sh("printf '  first  \\n\\n   \\nsecond'");

        launcher(&sink).launch(&job).await;

        assert_eq!(
            sink.messages_from(&LogSource::ProcessOutput),
            vec!["first", "second"]
        );
    }

    #[tokio::test]
    async fn test_line_order_preserved() {
        let sink = Arc::new(RecordingSink::new());
        let job = sh("for i in 1 2 3 4 5; do echo line $i; done");

        launcher(&sink).launch(&job).await;

        assert_eq!(
            sink.messages_from(&LogSource::ProcessOutput),
            vec!["line 1", "line 2", "line 3", "line 4", "line 5"]
        );
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let sink = Arc::new(RecordingSink::new());
        let result = launcher(&sink).launch(&sh("echo partial; exit 7")).await;

        assert_eq!(result, RunResult::Exited { code: 7 });
        assert_eq!(result.exit_code(), 7);
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let sink = Arc::new(RecordingSink::new());
        let job = JobDescriptor::builder("/nonexistent/bin/hms-engine")
            .build()
            .unwrap();

        let result = launcher(&sink).launch(&job).await;

        assert!(matches!(result, RunResult::Failed(LaunchError::Spawn(_))));
        assert_ne!(result.exit_code(), 127);
        assert!(sink.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_killed_by_signal() {
        let sink = Arc::new(RecordingSink::new());
        let result = launcher(&sink).launch(&sh("kill -9 $$")).await;

        assert_eq!(result, RunResult::Failed(LaunchError::Signal(9)));
    }

    #[tokio::test]
    async fn test_background_child_does_not_hold_launch_open() {
        let sink = Arc::new(RecordingSink::new());
        let job = sh("sleep 30 & echo done");

        let result = tokio::time::timeout(Duration::from_secs(10), launcher(&sink).launch(&job))
            .await
            .expect("launch should return once the shell exits");

        assert_eq!(result, RunResult::Success);
        assert_eq!(sink.messages_from(&LogSource::ProcessOutput), vec!["done"]);
    }

    #[tokio::test]
    async fn test_env_and_working_dir() {
        let sink = Arc::new(RecordingSink::new());
        let dir = tempfile::tempdir().unwrap();
        let job = JobDescriptor::builder("sh")
            .args(["-c", "echo \"$HMS_RUNNER_TEST_VAR\"; pwd"])
            .env("HMS_RUNNER_TEST_VAR", "from-descriptor")
            .working_dir(dir.path())
            .build()
            .unwrap();

        launcher(&sink).launch(&job).await;

        let messages = sink.messages_from(&LogSource::ProcessOutput);
        assert_eq!(messages[0], "from-descriptor");
        let cwd = std::fs::canonicalize(dir.path()).unwrap();
        assert_eq!(std::fs::canonicalize(&messages[1]).unwrap(), cwd);
    }
}
