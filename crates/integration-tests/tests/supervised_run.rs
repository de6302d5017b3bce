//! End-to-end supervised runs
//!
//! Real subprocesses and real files, wired the way the runner binary wires them.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hms_runner_core::application::{CoordinatorState, ShutdownCoordinator};
use hms_runner_core::domain::{
    JobDescriptor, LaunchError, LogSource, RunResult, Severity, EXIT_LAUNCH_FAILED,
};
use hms_runner_core::port::log_sink::mocks::RecordingSink;
use hms_runner_core::port::time_provider::SystemTimeProvider;
use hms_runner_core::port::SourceLogger;
use hms_runner_infra_system::{GlobTailerPool, SubprocessLauncher};

const POLL: Duration = Duration::from_millis(20);
const GRACE: Duration = Duration::from_millis(300);

fn coordinator(sink: &Arc<RecordingSink>) -> ShutdownCoordinator {
    let time_provider = Arc::new(SystemTimeProvider);
    let launcher = Arc::new(SubprocessLauncher::new(sink.clone(), time_provider.clone()));
    let pool = Arc::new(GlobTailerPool::new(sink.clone(), time_provider.clone()).with_poll_interval(POLL));
    let supervisor = SourceLogger::new(LogSource::Supervisor, sink.clone(), time_provider);
    ShutdownCoordinator::new(launcher, pool, supervisor).with_grace_period(GRACE)
}

fn sh_job(dir: &Path, script: &str) -> JobDescriptor {
    JobDescriptor::builder("sh")
        .args(["-c", script])
        .working_dir(dir)
        .log_pattern("*.log")
        .label("Simulation 'Jan 96 storm' for project 'tenk'")
        .build()
        .unwrap()
}

/// Process output and appended file lines all arrive; pre-existing lines do not
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_output_and_appended_lines_are_forwarded() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.log");
    let b = dir.path().join("b.log");
    std::fs::write(&a, "old line in a\n").unwrap();
    std::fs::write(&b, "old line in b\n").unwrap();

    let sink = Arc::new(RecordingSink::new());
    let job = sh_job(
        dir.path(),
        "echo 'WARNING: low storage' >> a.log; echo 'ERROR in b' >> b.log; echo 'ERROR boom'",
    );

    let report = coordinator(&sink).run(job).await;

    assert_eq!(report.result, RunResult::Success);
    assert_eq!(report.result.exit_code(), 0);
    assert_eq!(report.tailers_started, 2);
    assert_eq!(report.tailers_joined, 2);
    assert_eq!(report.final_state, CoordinatorState::Done);

    let observed = sink.observed();
    assert_eq!(observed.len(), 3, "observed: {:?}", observed);
    assert!(observed.iter().all(|e| !e.message.starts_with("old line")));

    assert_eq!(sink.messages_from(&LogSource::ProcessOutput), vec!["ERROR boom"]);
    assert_eq!(sink.messages_from(&LogSource::file(&a)), vec!["WARNING: low storage"]);
    assert_eq!(sink.messages_from(&LogSource::file(&b)), vec!["ERROR in b"]);

    let severities: Vec<Severity> = observed.iter().map(|e| e.severity).collect();
    assert!(severities.contains(&Severity::Warning));
    assert_eq!(
        severities.iter().filter(|s| **s == Severity::Error).count(),
        2
    );

    let summary = sink.messages_from(&LogSource::Supervisor);
    assert_eq!(
        summary,
        vec!["Simulation 'Jan 96 storm' for project 'tenk' completed."]
    );
}

/// Lines written after the process exits but within the grace period still arrive,
/// even while a background child keeps the output pipes open
#[tokio::test]
async fn test_grace_period_catches_late_writes() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("late.log");
    std::fs::write(&log, "").unwrap();

    let sink = Arc::new(RecordingSink::new());
    // background writer outlives the shell and inherits its stdout/stderr
    let job = sh_job(
        dir.path(),
        "(sleep 0.1; echo 'NOTE late line' >> late.log; sleep 30) & echo 'NOTE shell done'",
    );

    let report = tokio::time::timeout(Duration::from_secs(15), coordinator(&sink).run(job))
        .await
        .expect("run should finish while the background child lives on");

    assert!(report.result.is_success());
    assert_eq!(report.final_state, CoordinatorState::Done);
    assert_eq!(sink.messages_from(&LogSource::file(&log)), vec!["NOTE late line"]);
    assert_eq!(sink.messages_from(&LogSource::ProcessOutput), vec!["NOTE shell done"]);
}

/// A non-zero exit still drains tailers and reports the failure
#[tokio::test]
async fn test_non_zero_exit_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("run.log"), "").unwrap();

    let sink = Arc::new(RecordingSink::new());
    let job = sh_job(dir.path(), "echo 'SEVERE: compute failed'; exit 3");

    let report = coordinator(&sink).run(job).await;

    assert_eq!(report.result, RunResult::Exited { code: 3 });
    assert_eq!(report.result.exit_code(), 3);
    assert_eq!(report.tailers_joined, report.tailers_started);

    let output = sink.events();
    let process: Vec<_> = output
        .iter()
        .filter(|e| e.source == LogSource::ProcessOutput)
        .collect();
    assert_eq!(process.len(), 1);
    assert_eq!(process[0].severity, Severity::Error);

    let supervisor = sink.messages_from(&LogSource::Supervisor);
    assert_eq!(supervisor[0], "HMS exited with code 3");
    assert!(supervisor[1].contains("did not complete"));
}

/// Missing executable: launch failure, no process output, tailers still joined
#[tokio::test]
async fn test_missing_executable() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("tenk.log"), "").unwrap();
    std::fs::write(dir.path().join("tenk.out"), "").unwrap();

    let sink = Arc::new(RecordingSink::new());
    let job = JobDescriptor::builder(dir.path().join("jre/bin/java"))
        .working_dir(dir.path())
        .log_pattern("*.log")
        .log_pattern("*.out")
        .build()
        .unwrap();

    let report = coordinator(&sink).run(job).await;

    assert!(matches!(
        report.result,
        RunResult::Failed(LaunchError::Spawn(_))
    ));
    assert_eq!(report.result.exit_code(), EXIT_LAUNCH_FAILED);
    assert_ne!(report.result.exit_code(), 127);
    assert_eq!(report.tailers_started, 2);
    assert_eq!(report.tailers_joined, 2);
    assert!(sink.messages_from(&LogSource::ProcessOutput).is_empty());

    let supervisor = sink.messages_from(&LogSource::Supervisor);
    assert!(supervisor[0].starts_with("cannot start HMS: "));
    assert!(supervisor.last().unwrap().contains("did not complete"));
}

/// No matching files: the run proceeds with zero tailers
#[tokio::test]
async fn test_no_log_files() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::new());

    let report = coordinator(&sink)
        .run(sh_job(dir.path(), "echo 'Begin computing simulation'"))
        .await;

    assert!(report.result.is_success());
    assert_eq!(report.tailers_started, 0);
    assert_eq!(report.tailers_joined, 0);
    assert_eq!(sink.observed().len(), 1);
    assert_eq!(sink.observed()[0].severity, Severity::Info);
}
