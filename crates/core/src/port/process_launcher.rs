// Process Launcher Port
// Abstraction for starting the supervised engine and waiting for its exit

use crate::domain::{JobDescriptor, RunResult};
use async_trait::async_trait;

/// Process Launcher trait
///
/// Implementations:
/// - SubprocessLauncher: spawns the external engine (infra-system)
/// - MockProcessLauncher: scripted outcome for tests
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Run the job's process to completion
    ///
    /// Output lines are forwarded to the sink the launcher was built with
    /// while the process runs. Never errors: every outcome, including a
    /// failure to start, is folded into the returned [`RunResult`].
    async fn launch(&self, job: &JobDescriptor) -> RunResult;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::LaunchError;
    use crate::port::SourceLogger;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Mock launcher behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Exit with the given code (0 = success)
        Exit(i32),
        /// Never start
        Fail(LaunchError),
    }

    /// Mock Process Launcher for testing
    pub struct MockProcessLauncher {
        behavior: MockBehavior,
        output: Vec<String>,
        logger: Option<SourceLogger>,
        run_time: Duration,
        call_count: AtomicUsize,
    }

    impl MockProcessLauncher {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior,
                output: Vec::new(),
                logger: None,
                run_time: Duration::ZERO,
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Exit(0))
        }

        pub fn new_exit(code: i32) -> Self {
            Self::new(MockBehavior::Exit(code))
        }

        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(LaunchError::Spawn(message.into())))
        }

        /// Lines to forward through `logger` before exiting
        pub fn with_output(mut self, logger: SourceLogger, lines: &[&str]) -> Self {
            self.logger = Some(logger);
            self.output = lines.iter().map(|l| l.to_string()).collect();
            self
        }

        /// Simulated process lifetime
        pub fn with_run_time(mut self, run_time: Duration) -> Self {
            self.run_time = run_time;
            self
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProcessLauncher for MockProcessLauncher {
        async fn launch(&self, _job: &JobDescriptor) -> RunResult {
            self.call_count.fetch_add(1, Ordering::SeqCst);

            match &self.behavior {
                MockBehavior::Fail(e) => RunResult::Failed(e.clone()),
                MockBehavior::Exit(code) => {
                    if let Some(logger) = &self.logger {
                        for line in &self.output {
                            logger.line(line.as_str());
                        }
                    }
                    tokio::time::sleep(self.run_time).await;
                    RunResult::from_code(*code)
                }
            }
        }
    }
}
