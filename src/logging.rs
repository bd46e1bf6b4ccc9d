use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "aggregator.log";
const DEFAULT_DIRECTIVE: &str = "luma_aggregator=info";

/// Install the global subscriber: human-readable console output plus a
/// daily-rolling JSON file under `logs/`. RUST_LOG extends the default
/// per-crate directive.
pub fn init_logging() {
    let _ = fs::create_dir_all(LOG_DIR);

    let file_appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::from_default_env()
        .add_directive(DEFAULT_DIRECTIVE.parse().expect("static directive parses"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_writer(file_writer))
        .with(fmt::layer().with_writer(std::io::stdout))
        .init();

    // The writer guard must outlive the process or buffered log lines are
    // dropped on exit.
    std::mem::forget(guard);
}
