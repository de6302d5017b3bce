//! Command-line arguments

use crate::logging::LogFormat;
use clap::Parser;
use hms_runner_core::{AppError, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "hms-runner")]
#[command(about = "Run an HEC-HMS simulation and stream its logs", long_about = None)]
#[command(version)]
pub struct Cli {
    /// HEC-HMS project file (.hms); requires --sim-name
    #[arg(long)]
    pub project_file: Option<String>,

    /// Simulation run to compute
    #[arg(long)]
    pub sim_name: Option<String>,

    /// Run the bundled "tenk" sample project
    #[arg(long)]
    pub example: bool,

    /// JSON file holding an `hms_schema` object
    #[arg(long)]
    pub json_file: Option<String>,

    /// Log output format
    #[arg(long, env = "HMS_RUNNER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// HEC-HMS installation directory
    #[arg(long, env = "HMS_HOME")]
    pub hms_home: Option<PathBuf>,

    /// Milliseconds to keep tailing log files after the engine exits
    #[arg(long, env = "HMS_RUNNER_GRACE_MS", default_value_t = 1000)]
    pub grace_ms: u64,
}

impl Cli {
    /// Installation directory, required for every input mode
    ///
    /// A missing value is a configuration error (exit 1), not a usage error.
    pub fn hms_home(&self) -> Result<&Path> {
        self.hms_home.as_deref().ok_or_else(|| {
            AppError::Config("HMS_HOME is not set; pass --hms-home or set HMS_HOME".to_string())
        })
    }
}
