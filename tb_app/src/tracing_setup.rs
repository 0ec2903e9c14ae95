use std::io;

use tracing::Level;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

/// Compact formatter with target, thread id and line number
fn compact_layer<S, W>(writer: W, ansi: bool) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer().with_writer(writer).with_target(true).with_thread_ids(true).with_line_number(true).with_ansi(ansi).compact()
}

/// Initialise tracing with both a non-blocking hourly log file and stdout
///
/// Respects `RUST_LOG`, falling back to `default_level`. The returned guard
/// must be kept alive for buffered lines to reach the file.
pub fn init_with_stdout(app_name: &str, log_dir: &str, default_level: Level) -> WorkerGuard {
    let _ = std::fs::create_dir_all(log_dir);

    let file_appender = tracing_appender::rolling::hourly(log_dir, format!("{app_name}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(compact_layer(non_blocking, false))
        .with(compact_layer(io::stdout, true))
        .init();

    guard
}
