use std::path::{Path, PathBuf};

use fmt::format::FmtSpan;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{self, FilterExt, LevelFilter};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub const DEFAULT_FILTER: &str = "info,kbchat=debug,hyper_util=warn,reqwest=warn";

pub struct LoggingGuards {
    /// Guard for the main app log
    pub main: WorkerGuard,
    /// Guard for the API-only log
    pub api: WorkerGuard,
}

/// `<local data dir>/kbchat/logs`, or `./logs` when the platform has none.
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("kbchat").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Installs file logging for the binary. Nothing is written to the terminal, which belongs to
/// the REPL.
pub fn init_tracing(log_dir: &Path) -> std::io::Result<LoggingGuards> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "kbchat.log");
    let (non_blocking_file, main_guard) = tracing_appender::non_blocking(file_appender);

    let main_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false)
        .with_writer(non_blocking_file);

    // Request and response bodies, tagged target="api_json", go to their own file.
    let api_appender = tracing_appender::rolling::daily(log_dir, "api_responses.log");
    let (api_non_blocking, api_guard) = tracing_appender::non_blocking(api_appender);

    let api_layer = fmt::layer()
        .with_writer(api_non_blocking)
        .with_ansi(false)
        .with_level(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let only_api_json =
        filter::filter_fn(|meta| meta.target() == "api_json").and(LevelFilter::TRACE);

    let _ = tracing_subscriber::registry()
        .with(main_layer.with_filter(filter))
        .with(api_layer.with_filter(only_api_json))
        .try_init();

    Ok(LoggingGuards {
        main: main_guard,
        api: api_guard,
    })
}

pub fn init_tracing_tests(level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},hyper_util=error,reqwest=error")));

    let console_subscriber = fmt::layer()
        .with_target(true)
        .with_level(true)
        .without_time()
        .with_line_number(true)
        .with_test_writer();

    // try_init: another test may already have installed a subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_subscriber)
        .try_init();
}
