use std::path::{Path, PathBuf};

use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log files are named `app.YYYY-MM-DD.log`.
pub const LOG_FILE_PREFIX: &str = "app";
pub const LOG_FILE_SUFFIX: &str = "log";

/// Rotated files kept next to the active one.
pub const LOG_FILE_BACKUPS: usize = 5;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default filter directive. Overridden by the RUST_LOG env var.
    pub level: String,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
    /// Directory for daily log files; `None` disables file output.
    pub log_dir: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            log_dir: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to open log directory {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: InitError,
    },
    #[error("failed to install subscriber: {0}")]
    Install(String),
}

/// Keeps the file writer's worker thread alive. Hold it for the life of the
/// process; dropping it flushes buffered lines.
pub struct TelemetryGuard {
    log_dir: Option<PathBuf>,
    _file_guard: Option<WorkerGuard>,
}

impl TelemetryGuard {
    /// Directory receiving log files, if any.
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Build the filter from config, letting RUST_LOG win when set.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Daily-rotated appender under `dir`, keeping `LOG_FILE_BACKUPS` old files.
pub fn file_appender(dir: &Path) -> Result<RollingFileAppender, TelemetryError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(LOG_FILE_BACKUPS + 1)
        .build(dir)
        .map_err(|source| TelemetryError::LogFile {
            path: dir.to_path_buf(),
            source,
        })
}

/// File layer writing through a non-blocking worker. Every line carries the
/// module path, source location and the fields of enclosing spans
/// (`request_id` on HTTP requests).
pub fn file_layer<S>(
    dir: &Path,
    json: bool,
) -> Result<(Box<dyn Layer<S> + Send + Sync>, WorkerGuard), TelemetryError>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let (writer, guard) = tracing_appender::non_blocking(file_appender(dir)?);
    let layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_writer(writer);

    let layer = if json {
        layer.json().with_current_span(true).with_span_list(true).boxed()
    } else {
        layer.boxed()
    };
    Ok((layer, guard))
}

/// Initialize the global tracing subscriber. Call once at startup.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()));
    let console_layer = if config.json {
        console_layer.json().with_span_list(true).boxed()
    } else {
        console_layer.boxed()
    };

    let (file, file_guard) = match &config.log_dir {
        Some(dir) => {
            let (layer, guard) = file_layer(dir, config.json)?;
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer.with_filter(build_filter(&config.level)))
        .with(file.map(|l| l.with_filter(build_filter(&config.level))))
        .try_init()
        .map_err(|e| TelemetryError::Install(e.to_string()))?;

    Ok(TelemetryGuard {
        log_dir: config.log_dir,
        _file_guard: file_guard,
    })
}
