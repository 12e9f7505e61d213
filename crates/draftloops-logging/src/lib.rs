//! # draftloops-logging
//!
//! Logging for the draftloops research and revision pipeline.
//!
//! This crate provides structured logging for pipeline lifecycle events.
//!
//! ## Key Types
//!
//! - [`Logger`] - Structured event logging
//! - [`PipelineEvent`] - Log event types
//! - [`LogFormat`] - Output formats (Pretty, JSON, Compact)
//!
//! ## Log Formats
//!
//! - `Pretty` - Human-readable colored output
//! - `JSON` - Structured JSON lines
//! - `Compact` - Minimal text output

mod events;

pub use events::{LogFormat, Logger, PipelineEvent};

use std::path::Path;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub use tracing_appender::non_blocking::WorkerGuard;

/// Initialize tracing for the application.
///
/// With a `log_dir`, diagnostics additionally go to a daily-rolling file;
/// the returned guard must stay alive for the duration of the process or
/// buffered lines are lost.
pub fn init_tracing(level: &str, format: LogFormat, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_writer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "draftloops.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    match format {
        LogFormat::Json => {
            let file_layer = file_writer.map(|writer| {
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(false)
            });
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_target(false))
                .with(file_layer)
                .init();
        }
        LogFormat::Pretty | LogFormat::Compact => {
            let file_layer = file_writer.map(|writer| {
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(false)
            });
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(false))
                .with(file_layer)
                .init();
        }
    }

    guard
}
