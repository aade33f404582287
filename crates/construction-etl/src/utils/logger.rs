use anyhow::Result;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
};

use crate::config::{LogFormat, LoggingConfig};

/// Build the EnvFilter: RUST_LOG wins over the configured level
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directive = std::env::var("RUST_LOG").unwrap_or_else(|_| config.level.clone());
    Ok(EnvFilter::try_new(directive)?)
}

pub fn init_logger(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;

    // stderr; stdout carries command output
    let console_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .boxed(),
    };

    // Optional file appender (<dir>/etl.log, daily rotation)
    let file_layer = match &config.file_dir {
        Some(dir) => {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("etl")
                .filename_suffix("log")
                .build(dir)?;

            let layer = match config.format {
                LogFormat::Json => fmt::layer()
                    .json()
                    .with_writer(file_appender)
                    .with_target(true)
                    .with_level(true)
                    .boxed(),
                LogFormat::Pretty => fmt::layer()
                    .with_writer(file_appender)
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(false) // No colors in file
                    .boxed(),
            };
            Some(layer)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}
