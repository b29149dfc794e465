//! Blocking session contract between the pool and a database driver.
//!
//! The pool only needs three things from a driver: open a session from a
//! canonical connection string, run one query text on it, and report whether
//! the transport has gone away. [`crate::postgres::PostgresConnector`]
//! implements this over `tokio-postgres`; the `test-utils` feature adds an
//! in-memory implementation.

use crate::error::AgentDbError;

/// Outcome class of one executed command, numbered like libpq's
/// `ExecStatusType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum CommandStatus {
    /// The query string was empty.
    EmptyQuery = 0,
    /// A command that returns no rows completed.
    #[default]
    CommandOk = 1,
    /// A row-returning command completed.
    TuplesOk = 2,
    /// The server response could not be understood.
    BadResponse = 5,
    /// The command failed.
    FatalError = 7,
}

impl CommandStatus {
    #[must_use]
    pub fn is_ok(self) -> bool {
        matches!(self, Self::CommandOk | Self::TuplesOk)
    }

    /// Numeric status code.
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Everything a driver hands back for one query: the last statement's column
/// names, its rows as text (`None` is SQL NULL), the count from the
/// command-complete tag and the status class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
    pub rows_affected: u64,
    pub status: CommandStatus,
}

impl RawResult {
    /// Result of a command that returned no rows.
    #[must_use]
    pub fn command(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            status: CommandStatus::CommandOk,
            ..Self::default()
        }
    }

    /// Result of a row-returning command.
    #[must_use]
    pub fn tuples(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let rows_affected = rows.len() as u64;
        Self {
            columns,
            rows,
            rows_affected,
            status: CommandStatus::TuplesOk,
        }
    }

    /// Result of an empty query string.
    #[must_use]
    pub fn empty_query() -> Self {
        Self {
            status: CommandStatus::EmptyQuery,
            ..Self::default()
        }
    }
}

/// One physical database session.
///
/// Sessions move between threads with the pool entry that owns them, but are
/// never shared.
pub trait Session: Send {
    /// Run `query` to completion.
    ///
    /// # Errors
    /// [`AgentDbError::Execution`] when the server rejects the query,
    /// [`AgentDbError::ConnectionLost`] when the transport is gone.
    fn execute(&mut self, query: &str) -> Result<RawResult, AgentDbError>;

    /// Whether the underlying transport has been closed.
    fn is_closed(&self) -> bool;
}

/// Opens sessions for the pool.
pub trait Connector: Send + Sync {
    /// Establish a new session for a canonical connection string.
    ///
    /// # Errors
    /// [`AgentDbError::Connection`] when the session cannot be established.
    fn connect(&self, conn_str: &str) -> Result<Box<dyn Session>, AgentDbError>;
}
