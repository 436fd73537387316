//! # Logging Module
//!
//! Sets up two log streams, each going to the console and to a file that
//! rotates at midnight:
//!
//! ```text
//! {LOG_DIR}/{hostname}/
//! ├── server.log.YYYY-MM-DD   application events, "standard" format
//! └── access.log.YYYY-MM-DD   one line per request, message only
//! ```
//!
//! Access lines come from actix's `Logger` middleware, which logs under
//! [`ACCESS_TARGET`]. Everything else is a server event.
//!
//! The level is INFO in the `PRODUCTION` namespace and DEBUG elsewhere;
//! `RUST_LOG` takes precedence when set.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::Metadata;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{ChronoLocal, FormatTime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::AppConfig;

/// Target used for access log records.
pub const ACCESS_TARGET: &str = "access";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Errors that can occur while setting up logging.
#[derive(Error, Debug)]
pub enum LoggingError {
    /// The log directory cannot be created
    #[error("Failed to create log directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A global subscriber is already installed
    #[error("Failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Flushes the file writers when dropped. Keep it alive until exit.
pub struct LogGuards {
    _server: WorkerGuard,
    _access: WorkerGuard,
}

/// `{LOG_DIR}/{hostname}`, with `~` expanded.
pub fn log_dir(config: &AppConfig) -> PathBuf {
    let root = shellexpand::tilde(&config.log_dir).into_owned();
    let hostname = gethostname::gethostname().to_string_lossy().into_owned();
    PathBuf::from(root).join(hostname)
}

/// Create the log directory if it does not exist yet.
pub fn prepare_log_dir(config: &AppConfig) -> Result<PathBuf, LoggingError> {
    let dir = log_dir(config);
    std::fs::create_dir_all(&dir).map_err(|source| LoggingError::CreateDir {
        path: dir.display().to_string(),
        source,
    })?;
    Ok(dir)
}

/// Local timestamp followed by the process id, e.g.
/// `2024-01-15 12:00:00.000 [4242]`.
struct TimeAndPid {
    timer: ChronoLocal,
    pid: u32,
}

impl TimeAndPid {
    fn new() -> Self {
        Self {
            timer: ChronoLocal::new(TIME_FORMAT.to_string()),
            pid: std::process::id(),
        }
    }
}

impl FormatTime for TimeAndPid {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        self.timer.format_time(w)?;
        write!(w, " [{}]", self.pid)
    }
}

fn is_access(meta: &Metadata<'_>) -> bool {
    meta.target() == ACCESS_TARGET
}

/// Install the global subscriber.
///
/// ## Example
///
/// ```rust,ignore
/// let _guards = logging::init_logging(&config)?;
/// ```
pub fn init_logging(config: &AppConfig) -> Result<LogGuards, LoggingError> {
    let dir = prepare_log_dir(config)?;

    let (server_file, server_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, "server.log"));
    let (access_file, access_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, "access.log"));

    let level = config.log_level();
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    // "standard": time [pid] thread LEVEL file:line message
    let server_console = fmt::layer()
        .with_timer(TimeAndPid::new())
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_writer(io::stdout)
        .with_filter(filter_fn(|meta| !is_access(meta)));

    let server_log = fmt::layer()
        .with_timer(TimeAndPid::new())
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_ansi(false)
        .with_writer(server_file)
        .with_filter(filter_fn(|meta| !is_access(meta)));

    // "brief": message only
    let access_console = fmt::layer()
        .without_time()
        .with_level(false)
        .with_target(false)
        .with_writer(io::stdout)
        .with_filter(filter_fn(is_access));

    let access_log = fmt::layer()
        .without_time()
        .with_level(false)
        .with_target(false)
        .with_ansi(false)
        .with_writer(access_file)
        .with_filter(filter_fn(is_access));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(server_console)
        .with(server_log)
        .with(access_console)
        .with(access_log)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    tracing::info!("Logging to {} at level {}", dir.display(), level);

    Ok(LogGuards {
        _server: server_guard,
        _access: access_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_timer_includes_pid() {
        let mut line = String::new();
        TimeAndPid::new().format_time(&mut Writer::new(&mut line)).unwrap();

        assert!(line.ends_with(&format!(" [{}]", std::process::id())));
        // date part comes from TIME_FORMAT
        assert_eq!(line.as_bytes()[4], b'-');
    }

    #[test]
    fn test_log_dir_appends_hostname() {
        let mut config = AppConfig::for_tests();
        config.log_dir = "/var/log/scaffold".to_string();

        let dir = log_dir(&config);
        let hostname = gethostname::gethostname().to_string_lossy().into_owned();

        assert_eq!(dir, PathBuf::from("/var/log/scaffold").join(hostname));
    }

    #[test]
    fn test_log_dir_expands_tilde() {
        let mut config = AppConfig::for_tests();
        config.log_dir = "~/scaffold-logs".to_string();

        let dir = log_dir(&config);
        assert!(!dir.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_prepare_log_dir_creates_directory() {
        let root = tempfile::tempdir().unwrap();
        let mut config = AppConfig::for_tests();
        config.log_dir = root.path().join("nested").display().to_string();

        let dir = prepare_log_dir(&config).unwrap();

        assert!(dir.is_dir());
        assert!(dir.starts_with(root.path()));
    }
}
