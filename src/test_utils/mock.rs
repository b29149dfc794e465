use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::backend::{Connector, RawResult, Session};
use crate::conninfo::ConnParams;
use crate::error::AgentDbError;
use crate::lock::ScopedLock;

pub const DEFAULT_VERSION: &str =
    "PostgreSQL 16.2 on x86_64-pc-linux-gnu, compiled by gcc (GCC) 12.2.0, 64-bit";

/// Host name that always refuses connections.
pub const UNREACHABLE_HOST: &str = "unreachable";

/// Scripted answer for one query text.
#[derive(Debug, Clone)]
pub enum MockReply {
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Option<String>>>,
    },
    Command(u64),
    Error(String),
    /// The server drops the session while running the query.
    Disconnect,
}

impl MockReply {
    /// Single-column, single-row reply.
    pub fn scalar(column: &str, value: &str) -> Self {
        Self::Rows {
            columns: vec![column.to_string()],
            rows: vec![vec![Some(value.to_string())]],
        }
    }
}

#[derive(Default)]
struct Script {
    version: Option<String>,
    replies: HashMap<String, MockReply>,
    queries: Vec<String>,
    unreachable: Vec<String>,
    connect_delay: Duration,
}

#[derive(Default)]
struct Shared {
    script: Mutex<Script>,
    connects: AtomicUsize,
    connect_attempts: AtomicUsize,
    open_sessions: AtomicUsize,
    generation: AtomicU64,
}

/// A [`Connector`] whose sessions answer from a script.
///
/// Unscripted queries succeed as commands affecting no rows, except
/// `SELECT version()` which reports a PostgreSQL 16.2 server. Clones share
/// the script and counters, so a test can keep one clone for inspection
/// after handing another to a pool.
#[derive(Clone, Default)]
pub struct MockConnector {
    shared: Arc<Shared>,
}

impl MockConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `version` from `SELECT version()`.
    #[must_use]
    pub fn with_version(self, version: &str) -> Self {
        ScopedLock::acquire(&self.shared.script).version = Some(version.to_string());
        self
    }

    /// Sleep this long inside every connect.
    #[must_use]
    pub fn with_connect_delay(self, delay: Duration) -> Self {
        ScopedLock::acquire(&self.shared.script).connect_delay = delay;
        self
    }

    /// Answer `query` with `reply` from now on.
    pub fn on_query(&self, query: &str, reply: MockReply) {
        ScopedLock::acquire(&self.shared.script)
            .replies
            .insert(query.to_string(), reply);
    }

    /// Refuse connections to `host` in addition to [`UNREACHABLE_HOST`].
    pub fn mark_unreachable(&self, host: &str) {
        ScopedLock::acquire(&self.shared.script)
            .unreachable
            .push(host.to_string());
    }

    /// Close every session opened so far, as a server restart would.
    pub fn drop_all_sessions(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Successful connects.
    #[must_use]
    pub fn connects(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn connect_attempts(&self) -> usize {
        self.shared.connect_attempts.load(Ordering::SeqCst)
    }

    /// Sessions created and not yet dropped.
    #[must_use]
    pub fn open_sessions(&self) -> usize {
        self.shared.open_sessions.load(Ordering::SeqCst)
    }

    /// Every query text executed, in order.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        ScopedLock::acquire(&self.shared.script).queries.clone()
    }

    #[must_use]
    pub fn query_count(&self, query: &str) -> usize {
        ScopedLock::acquire(&self.shared.script)
            .queries
            .iter()
            .filter(|seen| seen.as_str() == query)
            .count()
    }
}

impl Connector for MockConnector {
    fn connect(&self, conn_str: &str) -> Result<Box<dyn Session>, AgentDbError> {
        self.shared.connect_attempts.fetch_add(1, Ordering::SeqCst);
        let params = ConnParams::parse(conn_str)?;
        let host = params.host().unwrap_or("localhost");

        let delay = {
            let script = ScopedLock::acquire(&self.shared.script);
            if host == UNREACHABLE_HOST || script.unreachable.iter().any(|h| h == host) {
                return Err(AgentDbError::Connection(format!(
                    "could not connect to server: host \"{host}\" is unreachable"
                )));
            }
            script.connect_delay
        };
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        self.shared.connects.fetch_add(1, Ordering::SeqCst);
        self.shared.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            shared: Arc::clone(&self.shared),
            generation: self.shared.generation.load(Ordering::SeqCst),
            dropped: false,
        }))
    }
}

struct MockSession {
    shared: Arc<Shared>,
    generation: u64,
    dropped: bool,
}

impl Session for MockSession {
    fn execute(&mut self, query: &str) -> Result<RawResult, AgentDbError> {
        if self.is_closed() {
            return Err(AgentDbError::ConnectionLost(
                "server closed the connection unexpectedly".to_string(),
            ));
        }

        let reply = {
            let mut script = ScopedLock::acquire(&self.shared.script);
            script.queries.push(query.to_string());
            match script.replies.get(query) {
                Some(reply) => reply.clone(),
                None if query.trim().is_empty() => return Ok(RawResult::empty_query()),
                None if query.trim().eq_ignore_ascii_case("SELECT version()") => {
                    let version = script.version.as_deref().unwrap_or(DEFAULT_VERSION);
                    MockReply::scalar("version", version)
                }
                None => MockReply::Command(0),
            }
        };

        match reply {
            MockReply::Rows { columns, rows } => Ok(RawResult::tuples(columns, rows)),
            MockReply::Command(count) => Ok(RawResult::command(count)),
            MockReply::Error(message) => Err(AgentDbError::Execution(message)),
            MockReply::Disconnect => {
                self.dropped = true;
                Err(AgentDbError::ConnectionLost(
                    "server closed the connection unexpectedly".to_string(),
                ))
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.dropped || self.generation < self.shared.generation.load(Ordering::SeqCst)
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.shared.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_replies_and_counters() {
        let connector = MockConnector::new();
        connector.on_query("SELECT 1", MockReply::scalar("one", "1"));
        let mut session = connector.connect("host=localhost").unwrap();
        assert_eq!(connector.connects(), 1);
        assert_eq!(connector.open_sessions(), 1);

        let raw = session.execute("SELECT 1").unwrap();
        assert_eq!(raw.rows, vec![vec![Some("1".to_string())]]);
        assert_eq!(session.execute("").unwrap(), RawResult::empty_query());
        assert_eq!(connector.query_count("SELECT 1"), 1);

        drop(session);
        assert_eq!(connector.open_sessions(), 0);
    }

    #[test]
    fn unreachable_hosts_refuse() {
        let connector = MockConnector::new();
        connector.mark_unreachable("db2");
        assert!(connector.connect("host=unreachable").is_err());
        assert!(connector.connect("host=db2").is_err());
        assert_eq!(connector.connect_attempts(), 2);
        assert_eq!(connector.connects(), 0);
    }

    #[test]
    fn disconnect_closes_session() {
        let connector = MockConnector::new();
        connector.on_query("boom", MockReply::Disconnect);
        let mut session = connector.connect("host=h").unwrap();
        assert!(matches!(
            session.execute("boom"),
            Err(AgentDbError::ConnectionLost(_))
        ));
        assert!(session.is_closed());

        let other = connector.connect("host=h").unwrap();
        assert!(!other.is_closed());
        connector.drop_all_sessions();
        assert!(other.is_closed());
    }
}
