// Tailer Group - N tailer tasks + one cancellation token + one join barrier

use super::shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
use std::future::Future;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Handle over every tailer started for one run
///
/// All tailers share the group's single [`ShutdownToken`]. `cancel` may be
/// called any number of times; `join` waits for every task with no timeout.
pub struct TailerGroup {
    shutdown: ShutdownSender,
    token: ShutdownToken,
    tasks: JoinSet<()>,
    started: usize,
}

impl TailerGroup {
    pub fn new() -> Self {
        let (shutdown, token) = shutdown_channel();
        Self {
            shutdown,
            token,
            tasks: JoinSet::new(),
            started: 0,
        }
    }

    /// Token to hand to a tailer before spawning it
    pub fn token(&self) -> ShutdownToken {
        self.token.clone()
    }

    /// Start a tailer task inside the group
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&mut self, tailer: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(tailer);
        self.started += 1;
    }

    /// Number of tailers started
    pub fn len(&self) -> usize {
        self.started
    }

    pub fn is_empty(&self) -> bool {
        self.started == 0
    }

    /// Raise the shared cancellation signal
    pub fn cancel(&self) {
        if !self.shutdown.is_shutdown() {
            debug!(tailers = self.started, "Cancelling tailers");
        }
        self.shutdown.shutdown();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shutdown.is_shutdown()
    }

    /// Wait until every started tailer has returned
    ///
    /// Returns the number of tailers joined by this call. A tailer that
    /// panicked counts as completed.
    pub async fn join(&mut self) -> usize {
        let mut joined = 0;
        while let Some(result) = self.tasks.join_next().await {
            if let Err(join_err) = result {
                if join_err.is_panic() {
                    error!("Tailer panicked: {:?}", join_err);
                } else {
                    error!("Tailer cancelled: {:?}", join_err);
                }
            }
            joined += 1;
        }
        joined
    }
}

impl Default for TailerGroup {
    fn default() -> Self {
        Self::new()
    }
}
