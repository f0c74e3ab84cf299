//! Logging Module
//!
//! Installs the `tracing` subscriber for the command line tool:
//! - human readable events on stderr (stdout carries query results)
//! - optional JSON events in a daily rolling file under the data directory
//! - `log` crate events bridged into `tracing`
//!
//! Library code never holds a logger; it emits `tracing` events and the
//! binary decides where they go.

use std::fs;
use std::io;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Filter directive for a verbosity level.
pub fn directive(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // sqlx logs every statement at info
    format!("novel_freq={level},sqlx=warn,warn")
}

fn build_filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive(verbosity)))
}

/// Initialize the logging system.
///
/// `RUST_LOG` overrides the configured verbosity. Returns the file writer
/// guard when file logging is enabled; it must be kept alive for the
/// duration of the program.
pub fn init(config: &LoggingConfig, data_dir: &Path) -> Option<WorkerGuard> {
    let (file_layer, guard) = if config.log_to_file {
        let log_dir = data_dir.join("logs");
        if let Err(e) = fs::create_dir_all(&log_dir) {
            eprintln!("Failed to create logs directory: {}", e);
        }
        let file_appender = tracing_appender::rolling::daily(&log_dir, "novel-freq.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // File Layer: JSON format for easy parsing
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .json()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_filter(build_filter(config.verbosity));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .compact()
        .with_target(false)
        .with_filter(build_filter(config.verbosity));

    let subscriber = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer);

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install tracing subscriber: {}", e);
    }

    // Redirect standard `log` macros to `tracing`
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to initialize LogTracer: {}", e);
    }

    guard
}

// ============================================================================
// Progress Bars (Indicatif Integration)
// ============================================================================

/// Progress bar styles
pub struct ProgressStyles;

impl ProgressStyles {
    /// One tick per input file, current file as the message.
    pub fn files() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files | {elapsed} | {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }
}

/// Progress bar over `files` input files, hidden when stderr is not a terminal.
pub fn file_progress(files: usize) -> ProgressBar {
    let pb = ProgressBar::new(files as u64);
    pb.set_style(ProgressStyles::files());
    pb
}
