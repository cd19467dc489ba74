//! Tracing setup.
//!
//! Console output filtered by `[logging].filter`, plus a daily-rolling JSON
//! file at trace level when `[logging].directory` is set.

use medflow_config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::error::{MedflowError, Result};

/// File name prefix for rolled log files.
pub const LOG_FILE_PREFIX: &str = "medflow.log";

const FILE_FILTER: &str = "medflow=trace,medflow_client=trace,medflow_cache=trace,info";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the file writer.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let (layers, guard) = build_layers(config)?;
    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| MedflowError::Telemetry(e.to_string()))?;
    Ok(guard)
}

fn build_layers(config: &LoggingConfig) -> Result<(Vec<BoxedLayer>, Option<WorkerGuard>)> {
    let console_filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| MedflowError::Telemetry(format!("bad filter '{}': {}", config.filter, e)))?;

    let console: BoxedLayer = if config.json {
        fmt::layer()
            .json()
            .with_target(true)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_filter(console_filter)
            .boxed()
    };
    let mut layers = vec![console];

    let guard = match &config.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_filter(EnvFilter::new(FILE_FILTER))
                    .boxed(),
            );
            Some(guard)
        }
        None => None,
    };

    Ok((layers, guard))
}
