//! Command-line options for the agent.
//!
//! [`AgentArgs`] is the raw `clap` surface. [`AgentConfig::from_args`] turns
//! it into validated settings; out-of-range numbers keep their defaults.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;

use crate::conninfo::ConnInfo;
use crate::error::AgentDbError;
use crate::logging::LogLevel;

pub const DEFAULT_POLL_SECS: u64 = 10;
pub const DEFAULT_RETRY_SECS: u64 = 30;
pub const MIN_RETRY_SECS: u64 = 10;

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "PostgreSQL job scheduling agent",
    disable_version_flag = true
)]
pub struct AgentArgs {
    /// Print the version and exit.
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: (),
    /// Poll time interval in seconds.
    #[arg(short = 't', default_value_t = 10, allow_negative_numbers = true)]
    pub poll: i64,
    /// Retry period after connection abort in seconds (>= 10).
    #[arg(short = 'r', default_value_t = 30, allow_negative_numbers = true)]
    pub retry: i64,
    /// Logging verbosity (0=error, 1=warning, 2=debug).
    #[arg(short = 'l', default_value_t = 0, allow_negative_numbers = true)]
    pub log_level: i64,
    /// Run in the foreground instead of detaching.
    #[arg(short = 'f')]
    pub foreground: bool,
    /// Log file; stdout when omitted.
    #[arg(short = 's')]
    pub log_file: Option<PathBuf>,
    /// Connection string, possibly split across several words.
    pub connect: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentConfig {
    pub poll_secs: u64,
    pub retry_secs: u64,
    pub log_level: LogLevel,
    pub foreground: bool,
    pub log_file: Option<PathBuf>,
    pub connect_string: String,
}

impl AgentConfig {
    /// Validate parsed arguments.
    ///
    /// # Errors
    /// [`AgentDbError::Config`] when no connection string was given,
    /// [`AgentDbError::ConnInfo`] when it does not parse.
    pub fn from_args(args: AgentArgs) -> Result<Self, AgentDbError> {
        let connect_string = join_connect_words(&args.connect);
        if connect_string.trim().is_empty() {
            return Err(AgentDbError::Config(
                "no connection string given".to_string(),
            ));
        }
        ConnInfo::parse(&connect_string, false)?;

        let poll_secs = u64::try_from(args.poll)
            .ok()
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_POLL_SECS);
        let retry_secs = u64::try_from(args.retry)
            .ok()
            .filter(|secs| *secs >= MIN_RETRY_SECS)
            .unwrap_or(DEFAULT_RETRY_SECS);
        let log_level = u8::try_from(args.log_level)
            .ok()
            .filter(|level| *level <= 2)
            .and_then(LogLevel::from_level)
            .unwrap_or(LogLevel::Error);

        Ok(Self {
            poll_secs,
            retry_secs,
            log_level,
            foreground: args.foreground,
            log_file: args.log_file,
            connect_string,
        })
    }

    /// How long to sleep between polls, or after a lost connection when
    /// `long` is set.
    #[must_use]
    pub fn wait_interval(&self, long: bool) -> Duration {
        Duration::from_secs(if long { self.retry_secs } else { self.poll_secs })
    }

    /// JSON rendering for the startup log, with the password masked.
    #[must_use]
    pub fn to_log_json(&self) -> String {
        let mut redacted = self.clone();
        redacted.connect_string = ConnInfo::redact(&self.connect_string);
        serde_json::to_string_pretty(&redacted).unwrap_or_else(|_| "{}".to_string())
    }
}

fn join_connect_words(words: &[String]) -> String {
    words
        .iter()
        .map(|word| {
            word.strip_prefix('"')
                .and_then(|inner| inner.strip_suffix('"'))
                .unwrap_or(word)
        })
        .collect::<Vec<_>>()
        .join(" ")
}
