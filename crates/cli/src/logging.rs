//! Logging setup: human-readable text or JSON, filtered by `RUST_LOG`

use anyhow::Result;
use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Used when `RUST_LOG` is not set
const DEFAULT_FILTER: &str = "hms_runner=info,hms_runner_core=info,hms_runner_infra_system=info";

/// Output format of the runner's own log stream
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Colorized, one line per event
    Text,
    /// One JSON object per event
    Json,
}

/// Install the global tracing subscriber
pub fn init(format: LogFormat) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

    match format {
        LogFormat::Json => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().flatten_event(true))
                .try_init()?;
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(false))
                .try_init()?;
        }
    }

    Ok(())
}
