// Run Result: terminal outcome of one supervised process

use thiserror::Error;

/// Exit status reported when the process never ran (or died abnormally)
pub const EXIT_LAUNCH_FAILED: i32 = 1;

/// Why the process could not run to a normal exit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    #[error("spawn failed: {0}")]
    Spawn(String),

    #[error("terminated by signal {0}")]
    Signal(i32),

    #[error("wait failed: {0}")]
    Wait(String),
}

/// Terminal outcome of a run, created at most once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    /// Process exited with code 0
    Success,
    /// Process ran and exited with a non-zero code
    Exited { code: i32 },
    /// Process never ran, or ended without an exit code
    Failed(LaunchError),
}

impl RunResult {
    /// Map an exit code to a result (0 is success)
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            RunResult::Success
        } else {
            RunResult::Exited { code }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunResult::Success)
    }

    /// Process-level exit status for the caller
    ///
    /// The process's own exit code is preserved whenever it ran; launch
    /// failures map to [`EXIT_LAUNCH_FAILED`].
    pub fn exit_code(&self) -> i32 {
        match self {
            RunResult::Success => 0,
            RunResult::Exited { code } => *code,
            RunResult::Failed(_) => EXIT_LAUNCH_FAILED,
        }
    }
}

impl std::fmt::Display for RunResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunResult::Success => write!(f, "exited successfully"),
            RunResult::Exited { code } => write!(f, "exited with code {}", code),
            RunResult::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}
