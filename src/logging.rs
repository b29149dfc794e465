//! Daemon log levels on top of `tracing`.
//!
//! The agent speaks in four levels. Three of them map onto ordinary tracing
//! levels and obey the configured minimum; startup messages go to
//! [`STARTUP_TARGET`] and are always written.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::Subscriber;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::writer::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;

use crate::error::AgentDbError;
use crate::lock::ScopedLock;

/// Target used for startup messages.
pub const STARTUP_TARGET: &str = "jobagent::startup";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Debug = 2,
    Startup = 15,
}

impl LogLevel {
    /// Level for a numeric `-l` option value.
    #[must_use]
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::Error),
            1 => Some(Self::Warning),
            2 => Some(Self::Debug),
            15 => Some(Self::Startup),
            _ => None,
        }
    }

    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn tracing_level(self) -> tracing::Level {
        match self {
            Self::Error => tracing::Level::ERROR,
            Self::Warning => tracing::Level::WARN,
            Self::Debug => tracing::Level::DEBUG,
            Self::Startup => tracing::Level::INFO,
        }
    }
}

/// Emit `message` at `level`.
pub fn log_message(message: &str, level: LogLevel) {
    match level {
        LogLevel::Error => tracing::error!("{message}"),
        LogLevel::Warning => tracing::warn!("{message}"),
        LogLevel::Debug => tracing::debug!("{message}"),
        LogLevel::Startup => tracing::info!(target: STARTUP_TARGET, "{message}"),
    }
}

/// Sink for formatted log lines: the log file when one is configured,
/// stdout otherwise.
#[derive(Clone)]
pub struct LogWriter {
    file: Option<Arc<Mutex<File>>>,
}

impl LogWriter {
    /// Open `path` for appending, or write to stdout when no path is given.
    ///
    /// # Errors
    /// Returns the I/O error if the file cannot be opened.
    pub fn new(path: Option<PathBuf>) -> io::Result<Self> {
        let file = match path {
            Some(path) => Some(Arc::new(Mutex::new(
                OpenOptions::new().create(true).append(true).open(path)?,
            ))),
            None => None,
        };
        Ok(Self { file })
    }
}

pub struct LogWriterGuard {
    file: Option<Arc<Mutex<File>>>,
}

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = LogWriterGuard;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriterGuard {
            file: self.file.clone(),
        }
    }
}

impl Write for LogWriterGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &self.file {
            Some(file) => ScopedLock::acquire(file).write_all(buf)?,
            None => io::stdout().write_all(buf)?,
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match &self.file {
            Some(file) => ScopedLock::acquire(file).flush(),
            None => io::stdout().flush(),
        }
    }
}

/// Build the agent's subscriber without installing it.
pub fn subscriber(min_level: LogLevel, writer: LogWriter) -> impl Subscriber + Send + Sync {
    let filter = Targets::new()
        .with_default(min_level.tracing_level())
        .with_target("tokio_postgres", LevelFilter::WARN)
        .with_target(STARTUP_TARGET, LevelFilter::INFO);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false),
        )
        .with(filter)
}

/// Install the process-wide subscriber.
///
/// # Errors
/// [`AgentDbError::Runtime`] if the log file cannot be opened,
/// [`AgentDbError::Config`] if a global subscriber is already set.
pub fn init_logging(min_level: LogLevel, log_file: Option<PathBuf>) -> Result<(), AgentDbError> {
    let writer = LogWriter::new(log_file)?;
    tracing::subscriber::set_global_default(subscriber(min_level, writer))
        .map_err(|err| AgentDbError::Config(format!("failed to install logger: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(min_level: LogLevel, emit: impl FnOnce()) -> String {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.log");
        let writer = LogWriter::new(Some(path.clone())).unwrap();
        tracing::subscriber::with_default(subscriber(min_level, writer), emit);
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn numeric_levels_round_trip() {
        for code in [0, 1, 2, 15] {
            assert_eq!(LogLevel::from_level(code).map(LogLevel::code), Some(code));
        }
        assert_eq!(LogLevel::from_level(3), None);
    }

    #[test]
    fn minimum_level_filters_messages() {
        let text = capture(LogLevel::Warning, || {
            log_message("kept error", LogLevel::Error);
            log_message("kept warning", LogLevel::Warning);
            log_message("dropped debug", LogLevel::Debug);
        });
        assert!(text.contains("kept error"));
        assert!(text.contains("kept warning"));
        assert!(!text.contains("dropped debug"));
    }

    #[test]
    fn startup_messages_bypass_minimum_level() {
        let text = capture(LogLevel::Error, || {
            log_message("agent starting", LogLevel::Startup);
            log_message("not shown", LogLevel::Debug);
        });
        assert!(text.contains("agent starting"));
        assert!(!text.contains("not shown"));
    }

    #[test]
    fn log_file_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.log");
        std::fs::write(&path, "existing line\n").unwrap();
        let writer = LogWriter::new(Some(path.clone())).unwrap();
        tracing::subscriber::with_default(subscriber(LogLevel::Debug, writer), || {
            log_message("appended", LogLevel::Debug);
        });
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.starts_with("existing line\n"));
        assert!(text.contains("appended"));
    }
}
