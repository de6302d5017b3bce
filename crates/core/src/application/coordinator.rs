// Shutdown Coordinator - run process, drain, cancel, join, summarize

use super::constants::DEFAULT_GRACE_PERIOD;
use crate::domain::{JobDescriptor, RunResult};
use crate::port::{ProcessLauncher, SourceLogger, TailerPool};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Coordinator lifecycle. Strictly linear, no retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Running,
    Draining,
    Joined,
    Done,
}

impl CoordinatorState {
    /// The only state reachable from this one
    pub fn next(self) -> Option<Self> {
        match self {
            CoordinatorState::Idle => Some(CoordinatorState::Running),
            CoordinatorState::Running => Some(CoordinatorState::Draining),
            CoordinatorState::Draining => Some(CoordinatorState::Joined),
            CoordinatorState::Joined => Some(CoordinatorState::Done),
            CoordinatorState::Done => None,
        }
    }
}

impl std::fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinatorState::Idle => write!(f, "IDLE"),
            CoordinatorState::Running => write!(f, "RUNNING"),
            CoordinatorState::Draining => write!(f, "DRAINING"),
            CoordinatorState::Joined => write!(f, "JOINED"),
            CoordinatorState::Done => write!(f, "DONE"),
        }
    }
}

/// What one supervised run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub result: RunResult,
    /// Tailers started at discovery time
    pub tailers_started: usize,
    /// Tailers that reported completion before the summary
    pub tailers_joined: usize,
    pub final_state: CoordinatorState,
}

/// Orchestrates one run: launch, grace period, cancel tailers, join, summary
///
/// Single-use: `run` consumes the coordinator together with the job.
pub struct ShutdownCoordinator {
    launcher: Arc<dyn ProcessLauncher>,
    pool: Arc<dyn TailerPool>,
    supervisor: SourceLogger,
    grace_period: Duration,
    state: CoordinatorState,
}

impl ShutdownCoordinator {
    /// Create a coordinator
    ///
    /// # Arguments
    /// * `launcher` - Starts the engine and forwards its merged output
    /// * `pool` - Starts tailers for the job's auxiliary files
    /// * `supervisor` - Logger for the supervisor's own events and summary
    pub fn new(
        launcher: Arc<dyn ProcessLauncher>,
        pool: Arc<dyn TailerPool>,
        supervisor: SourceLogger,
    ) -> Self {
        Self {
            launcher,
            pool,
            supervisor,
            grace_period: DEFAULT_GRACE_PERIOD,
            state: CoordinatorState::Idle,
        }
    }

    /// Override the post-exit grace period
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    fn advance(&mut self, to: CoordinatorState) {
        debug_assert_eq!(self.state.next(), Some(to));
        info!(from = %self.state, to = %to, "Coordinator state transition");
        self.state = to;
    }

    /// Supervise one job to completion
    ///
    /// Always drains and joins the tailers, whatever the Run Result.
    pub async fn run(mut self, job: JobDescriptor) -> RunReport {
        // Idle -> Running: tailers first so early writes are not missed
        let mut tailers = self.pool.start(job.log_patterns(), job.working_dir());
        let tailers_started = tailers.len();
        info!(
            job = %job.label(),
            executable = %job.executable().display(),
            tailers = tailers_started,
            "Starting supervised run"
        );
        self.advance(CoordinatorState::Running);

        let result = self.launcher.launch(&job).await;

        // Running -> Draining
        self.advance(CoordinatorState::Draining);
        match &result {
            RunResult::Success => {}
            RunResult::Exited { code } => {
                warn!(exit_code = code, "Supervised process exited abnormally");
                self.supervisor
                    .error(format!("HMS exited with code {}", code));
            }
            RunResult::Failed(e) => {
                warn!(error = %e, "Supervised process failed");
                self.supervisor.error(format!("cannot start HMS: {}", e));
            }
        }
        tokio::time::sleep(self.grace_period).await;

        // Draining -> Joined
        tailers.cancel();
        let tailers_joined = tailers.join().await;
        self.advance(CoordinatorState::Joined);

        // Joined -> Done
        if result.is_success() {
            self.supervisor.info(format!("{} completed.", job.label()));
        } else {
            self.supervisor
                .error(format!("{} did not complete: {}.", job.label(), result));
        }
        self.advance(CoordinatorState::Done);

        RunReport {
            result,
            tailers_started,
            tailers_joined,
            final_state: self.state,
        }
    }
}
