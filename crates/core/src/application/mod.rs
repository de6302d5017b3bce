// Application Layer - Use Cases and Orchestration

pub mod constants;
pub mod coordinator;
mod shutdown;
mod tailer_group;

// Re-exports
pub use coordinator::{CoordinatorState, RunReport, ShutdownCoordinator};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use tailer_group::TailerGroup;
