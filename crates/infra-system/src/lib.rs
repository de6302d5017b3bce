// HMS Runner Infrastructure - System Adapters
// Implements: ProcessLauncher, TailerPool, LogSink

pub mod file_tailer;
pub mod subprocess_launcher;
pub mod tailer_pool;
pub mod tracing_sink;

pub use file_tailer::FileTailer;
pub use subprocess_launcher::SubprocessLauncher;
pub use tailer_pool::{discover, GlobTailerPool};
pub use tracing_sink::TracingSink;
