// Port Layer - Interfaces for external dependencies

pub mod log_sink;
pub mod process_launcher;
pub mod tailer_pool;
pub mod time_provider; // For deterministic testing

// Re-exports
pub use log_sink::{LogSink, SourceLogger};
pub use process_launcher::ProcessLauncher;
pub use tailer_pool::TailerPool;
pub use time_provider::TimeProvider;
