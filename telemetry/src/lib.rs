//! Tracing setup shared by the generator binaries and tests.

use config::Environment;
use std::io::Error;
use std::io::Write;
use std::sync::OnceLock;
use std::{
    backtrace::{Backtrace, BacktraceStatus},
    panic::PanicHookInfo,
    sync::Once,
};
use thiserror::Error;
use tracing::subscriber::{SetGlobalDefaultError, set_global_default};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{self, InitError},
};
use tracing_log::{LogTracer, log_tracer::SetLoggerError};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, FmtSubscriber, Registry, fmt, layer::SubscriberExt};

/// JSON field name identifying the `generate` or `clean` invocation a log line belongs to.
const RUN_ID_KEY_IN_LOG: &str = "run_id";

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to build rolling file appender: {0}")]
    InitAppender(#[from] InitError),

    #[error("failed to init log tracer: {0}")]
    InitLogTracer(#[from] SetLoggerError),

    #[error("failed to set global default subscriber: {0}")]
    SetGlobalDefault(#[from] SetGlobalDefaultError),

    #[error("an io error occurred: {0}")]
    Io(#[from] Error),
}

/// Keeps buffered file logs alive until the process exits.
///
/// The file writer is non-blocking, so dropping a [`LogFlusher::Flusher`] early loses log lines.
#[must_use]
pub enum LogFlusher {
    Flusher(WorkerGuard),
    NullFlusher,
}

static INIT_TEST_TRACING: Once = Once::new();

/// Call this function once at the beginning of a test and then set the `ENABLE_TRACING`
/// environment variable to view tracing in the terminal:
///
/// ENABLE_TRACING=1 cargo test <test_name>
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        if std::env::var("ENABLE_TRACING").is_ok() {
            // Without an explicit environment we would default to prod and log to files.
            Environment::Dev.set();
            let _log_flusher =
                init_tracing("test").expect("Failed to initialize tracing for tests");
        }
    });
}

static RUN_ID: OnceLock<String> = OnceLock::new();

/// Sets the run id injected into every JSON log line.
pub fn set_global_run_id(run_id: String) {
    let _ = RUN_ID.set(run_id);
}

pub fn get_global_run_id() -> Option<&'static str> {
    RUN_ID.get().map(|s| s.as_str())
}

/// A writer wrapper that injects the run id field into JSON log lines.
struct RunIdInjectingWriter<W> {
    inner: W,
}

impl<W> RunIdInjectingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W> Write for RunIdInjectingWriter<W>
where
    W: Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(run_id) = get_global_run_id()
            && let Ok(json_str) = std::str::from_utf8(buf)
            && let Ok(serde_json::Value::Object(mut map)) =
                serde_json::from_str::<serde_json::Value>(json_str)
            && !map.contains_key(RUN_ID_KEY_IN_LOG)
        {
            map.insert(
                RUN_ID_KEY_IN_LOG.to_string(),
                serde_json::Value::String(run_id.to_string()),
            );

            if let Ok(modified) = serde_json::to_string(&map) {
                let output = if json_str.ends_with('\n') {
                    format!("{modified}\n")
                } else {
                    modified
                };

                // The caller only knows about the original buffer, so that is what we report.
                return self.inner.write_all(output.as_bytes()).map(|_| buf.len());
            }
        }

        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Initializes tracing for the application.
pub fn init_tracing(app_name: &str) -> Result<LogFlusher, TracingError> {
    init_tracing_with_run_id(app_name, None)
}

/// Initializes tracing and tags every JSON log line with `run_id`.
pub fn init_tracing_with_run_id(
    app_name: &str,
    run_id: Option<String>,
) -> Result<LogFlusher, TracingError> {
    if let Some(run_id) = run_id {
        set_global_run_id(run_id);
    }

    // Forward records of crates logging through `log` into `tracing`.
    LogTracer::init()?;

    let is_prod = Environment::load()?.is_prod();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_flusher = if is_prod {
        configure_prod_tracing(filter, app_name)?
    } else {
        configure_dev_tracing(filter)?
    };

    set_tracing_panic_hook();

    Ok(log_flusher)
}

fn configure_prod_tracing(filter: EnvFilter, app_name: &str) -> Result<LogFlusher, TracingError> {
    let file_appender = rolling::Builder::new()
        .filename_prefix(app_name)
        .filename_suffix("log")
        .rotation(rolling::Rotation::DAILY)
        .max_log_files(5)
        .build("logs")?;

    let (file_appender, guard) = tracing_appender::non_blocking(file_appender);

    let format = fmt::format()
        .with_level(true)
        .with_ansi(false)
        .with_target(false);

    let subscriber = Registry::default().with(filter).with(
        fmt::layer()
            .event_format(format)
            .with_writer(move || RunIdInjectingWriter::new(file_appender.make_writer()))
            .json()
            .with_current_span(true)
            .with_span_list(true),
    );

    set_global_default(subscriber)?;

    Ok(LogFlusher::Flusher(guard))
}

fn configure_dev_tracing(filter: EnvFilter) -> Result<LogFlusher, TracingError> {
    let format = fmt::format()
        .with_level(true)
        .with_ansi(true)
        .pretty()
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    let subscriber = FmtSubscriber::builder()
        .event_format(format)
        .with_env_filter(filter)
        .finish();

    set_global_default(subscriber)?;

    Ok(LogFlusher::NullFlusher)
}

/// Routes panics through `tracing` before handing them to the previous hook.
///
/// A unit that panics inside a worker would otherwise only reach stderr, which prod
/// deployments do not collect.
fn set_tracing_panic_hook() {
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        panic_hook(info);
        prev_hook(info);
    }));
}

fn panic_hook(panic_info: &PanicHookInfo) {
    let backtrace = Backtrace::capture();
    let (backtrace, note) = match backtrace.status() {
        BacktraceStatus::Captured => (Some(backtrace), None),
        BacktraceStatus::Disabled => (
            None,
            Some("run with RUST_BACKTRACE=1 to display backtraces"),
        ),
        BacktraceStatus::Unsupported => {
            (None, Some("backtraces are not supported on this platform"))
        }
        _ => (None, Some("backtrace status is unknown")),
    };

    let payload = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    };

    let location = panic_info.location().map(|location| location.to_string());

    tracing::error!(
        panic.payload = payload,
        payload.location = location,
        panic.backtrace = backtrace.map(tracing::field::display),
        panic.note = note,
        "a panic occurred",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_writer_passes_through_non_json() {
        let mut out = Vec::new();
        let mut writer = RunIdInjectingWriter::new(&mut out);

        let written = writer.write(b"plain text line\n").unwrap();

        assert_eq!(written, 16);
        assert_eq!(out, b"plain text line\n");
    }
}
