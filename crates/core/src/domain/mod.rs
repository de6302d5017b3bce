// Domain Layer - Pure business logic and entities

pub mod error;
pub mod job;
pub mod log_event;
pub mod run_result;
pub mod severity;

// Re-exports
pub use error::DomainError;
pub use job::{JobDescriptor, JobDescriptorBuilder};
pub use log_event::{LogEvent, LogSource, PROCESS_OUTPUT_SOURCE, SUPERVISOR_SOURCE};
pub use run_result::{LaunchError, RunResult, EXIT_LAUNCH_FAILED};
pub use severity::{classify, Severity};
