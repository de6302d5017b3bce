//! HMS Runner - Main Entry Point
//! Runs one HEC-HMS simulation and streams its output and log files

mod args;
mod job;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempPath;
use tracing::info;

use args::Cli;
use hms_runner_core::application::ShutdownCoordinator;
use hms_runner_core::domain::{JobDescriptor, LogSource, EXIT_LAUNCH_FAILED};
use hms_runner_core::port::time_provider::SystemTimeProvider;
use hms_runner_core::port::{LogSink, SourceLogger, TimeProvider};
use hms_runner_infra_system::{GlobTailerPool, SubprocessLauncher, TracingSink};
use job::{HmsJob, InputMode};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // 1. Initialize logging
    logging::init(cli.log_format)?;
    info!("HMS Runner v{} starting...", VERSION);

    // 2. Setup dependencies (DI wiring)
    let sink: Arc<dyn LogSink> = Arc::new(TracingSink);
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let launcher = Arc::new(SubprocessLauncher::new(
        Arc::clone(&sink),
        Arc::clone(&time_provider),
    ));
    let pool = Arc::new(GlobTailerPool::new(
        Arc::clone(&sink),
        Arc::clone(&time_provider),
    ));
    let supervisor = SourceLogger::new(LogSource::Supervisor, sink, time_provider);

    // 3. Resolve the job; configuration problems never reach the engine
    let (job, descriptor, _script) = match prepare(&cli) {
        Ok(prepared) => prepared,
        Err(e) => {
            supervisor.error(format!("{:#}", e));
            return Ok(exit_code(EXIT_LAUNCH_FAILED));
        }
    };
    info!(
        project = %job.project_file().display(),
        sim_name = %job.sim_name(),
        executable = %descriptor.executable().display(),
        "Job resolved"
    );

    // 4. Supervise the run (the script file lives until `_script` drops)
    let report = ShutdownCoordinator::new(launcher, pool, supervisor)
        .with_grace_period(Duration::from_millis(cli.grace_ms))
        .run(descriptor)
        .await;

    info!(
        result = %report.result,
        tailers_started = report.tailers_started,
        tailers_joined = report.tailers_joined,
        "HMS Runner finished"
    );

    Ok(exit_code(report.result.exit_code()))
}

/// Resolve the input, write the Jython script and build the engine invocation
fn prepare(cli: &Cli) -> Result<(HmsJob, JobDescriptor, TempPath)> {
    let mode = InputMode::from_cli(cli)?;
    let hms_home = cli.hms_home()?;
    let job = HmsJob::resolve(&mode, hms_home)?;
    let script = job
        .write_script()
        .context("cannot write simulation script")?;
    let inherited_path = std::env::var("PATH").ok();
    let descriptor = job.descriptor(hms_home, &script, inherited_path.as_deref())?;
    Ok((job, descriptor, script))
}

/// Map a run's exit code onto the process exit status
fn exit_code(code: i32) -> ExitCode {
    u8::try_from(code)
        .map(ExitCode::from)
        .unwrap_or(ExitCode::FAILURE)
}
