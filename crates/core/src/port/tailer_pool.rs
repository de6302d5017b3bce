// Tailer Pool Port
// Discovers auxiliary log files and starts one tailer per match

use crate::application::TailerGroup;
use std::path::Path;

/// Tailer Pool trait
///
/// Implementations:
/// - GlobTailerPool: glob discovery + file tailers (infra-system)
/// - MockTailerPool: idle tailers that only wait for cancellation
pub trait TailerPool: Send + Sync {
    /// Discover files once and start a tailer for every match
    ///
    /// Must be called from within a tokio runtime. Discovery failures are
    /// non-fatal and simply produce fewer tailers.
    fn start(&self, patterns: &[String], base_dir: &Path) -> TailerGroup;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Starts `tailers_per_pattern` idle tailers for each pattern
    pub struct MockTailerPool {
        tailers_per_pattern: usize,
        started: Arc<AtomicUsize>,
        completed: Arc<AtomicUsize>,
    }

    impl MockTailerPool {
        pub fn new(tailers_per_pattern: usize) -> Self {
            Self {
                tailers_per_pattern,
                started: Arc::new(AtomicUsize::new(0)),
                completed: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn started(&self) -> usize {
            self.started.load(Ordering::SeqCst)
        }

        /// Tailers that observed cancellation and returned
        pub fn completed(&self) -> usize {
            self.completed.load(Ordering::SeqCst)
        }
    }

    impl TailerPool for MockTailerPool {
        fn start(&self, patterns: &[String], _base_dir: &Path) -> TailerGroup {
            let mut group = TailerGroup::new();
            for _ in 0..patterns.len() * self.tailers_per_pattern {
                let mut token = group.token();
                let completed = Arc::clone(&self.completed);
                self.started.fetch_add(1, Ordering::SeqCst);
                group.spawn(async move {
                    token.cancelled().await;
                    completed.fetch_add(1, Ordering::SeqCst);
                });
            }
            group
        }
    }
}
