use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{CommandStatus, RawResult};
use crate::conninfo::ConnInfo;
use crate::error::AgentDbError;
use crate::query_utils::{quote_literal, quote_literal_legacy};
use crate::results::QueryResult;

use super::PoolInner;
use super::types::{EntryId, ServerVersion, SessionState};

/// A session checked out of a [`super::ConnectionPool`].
///
/// The holder has exclusive use of the session until the entry is returned,
/// either with [`PoolEntry::return_to_pool`] or by dropping it. Queries run on
/// the calling thread and never touch the pool's registry lock.
pub struct PoolEntry {
    id: EntryId,
    conn_str: String,
    primary: bool,
    state: Option<SessionState>,
    pool: Arc<PoolInner>,
}

impl PoolEntry {
    pub(crate) fn new(
        id: EntryId,
        conn_str: String,
        primary: bool,
        state: SessionState,
        pool: Arc<PoolInner>,
    ) -> Self {
        Self {
            id,
            conn_str,
            primary,
            state: Some(state),
            pool,
        }
    }

    #[must_use]
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Whether this is the session opened by `init_connection`.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.primary
    }

    /// Canonical connection string, password included.
    #[must_use]
    pub fn connection_string(&self) -> &str {
        &self.conn_str
    }

    /// Connection string with the password masked, for log lines.
    #[must_use]
    pub fn debug_connection_str(&self) -> String {
        ConnInfo::redact(&self.conn_str)
    }

    /// Time since the physical session was opened.
    #[must_use]
    pub fn connected_for(&self) -> Duration {
        self.state
            .as_ref()
            .map_or(Duration::ZERO, |state| state.connected_at.elapsed())
    }

    /// Run `query` and return its rows.
    ///
    /// # Errors
    /// [`AgentDbError::Execution`] when the server rejects the query or the
    /// query string is empty, [`AgentDbError::ConnectionLost`] when the
    /// session dropped. The entry stays checked out either way and
    /// [`PoolEntry::last_error`] holds the message.
    pub fn execute(&mut self, query: &str) -> Result<QueryResult, AgentDbError> {
        let raw = self.run(query)?;
        if raw.status.is_ok() {
            Ok(QueryResult::from_raw(raw))
        } else {
            Err(AgentDbError::Execution(self.last_error().to_string()))
        }
    }

    /// First column of the first row, or an empty string when the query
    /// fails, returns no rows or returns NULL.
    pub fn execute_scalar(&mut self, query: &str) -> String {
        match self.execute(query) {
            Ok(result) => result.get_string(0usize),
            Err(_) => String::new(),
        }
    }

    /// Run a command for its effect and return its status.
    pub fn execute_void(&mut self, query: &str) -> CommandStatus {
        match self.run(query) {
            Ok(raw) => raw.status,
            Err(_) => self.last_status(),
        }
    }

    fn run(&mut self, query: &str) -> Result<RawResult, AgentDbError> {
        let id = self.id;
        let state = self.state.as_mut().ok_or(AgentDbError::EntryReleased)?;
        match state.session.execute(query) {
            Ok(raw) => {
                state.last_status = raw.status;
                if !raw.status.is_ok() {
                    state.last_error = format!("query returned status {:?}", raw.status);
                }
                Ok(raw)
            }
            Err(err) => {
                state.last_status = CommandStatus::FatalError;
                state.last_error = err.to_string();
                tracing::debug!("query on {id} failed: {err}");
                Err(err)
            }
        }
    }

    /// Whether the server is at least `major.minor`.
    ///
    /// The version is read with `SELECT version()` the first time and cached
    /// with the session; a failed probe is retried on the next call.
    pub fn backend_minimum_version(&mut self, major: u32, minor: u32) -> bool {
        self.probe_version()
            .is_some_and(|version| version.at_least(major, minor))
    }

    /// Cached server version, if it has been probed.
    #[must_use]
    pub fn server_version(&self) -> Option<ServerVersion> {
        self.state.as_ref().and_then(|state| state.version)
    }

    fn probe_version(&mut self) -> Option<ServerVersion> {
        if let Some(version) = self.server_version() {
            return Some(version);
        }
        let text = self.execute_scalar("SELECT version()");
        let Some(version) = ServerVersion::parse(&text) else {
            tracing::debug!("could not read server version from {text:?}");
            return None;
        };
        if let Some(state) = self.state.as_mut() {
            state.version = Some(version);
        }
        Some(version)
    }

    /// Quote `value` as a string literal for this server. Servers before 8.1
    /// do not understand `E''` literals and get the plain form.
    pub fn qt_db_string(&mut self, value: &str) -> String {
        match self.probe_version() {
            Some(version) if !version.at_least(8, 1) => quote_literal_legacy(value),
            _ => quote_literal(value),
        }
    }

    /// Message of the last failed query on this session, empty if none failed.
    #[must_use]
    pub fn last_error(&self) -> &str {
        self.state
            .as_ref()
            .map_or("", |state| state.last_error.as_str())
    }

    #[must_use]
    pub fn last_status(&self) -> CommandStatus {
        self.state
            .as_ref()
            .map_or(CommandStatus::FatalError, |state| state.last_status)
    }

    #[must_use]
    pub fn last_command_ok(&self) -> bool {
        self.last_status().is_ok()
    }

    /// Give the session back to the pool. Same as dropping the entry.
    pub fn return_to_pool(self) {
        drop(self);
    }
}

impl Drop for PoolEntry {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            self.pool.give_back(self.id, state);
        }
    }
}

impl fmt::Debug for PoolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolEntry")
            .field("id", &self.id)
            .field("conn_str", &self.debug_connection_str())
            .field("primary", &self.primary)
            .field("last_status", &self.last_status())
            .finish_non_exhaustive()
    }
}
