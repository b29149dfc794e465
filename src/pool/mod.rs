// Connection pool module - keyed registry of blocking database sessions
//
// - types: slot bookkeeping, entry ids, server versions, status snapshots
// - entry: the checked-out handle and its query operations

pub mod entry;
pub mod types;

use std::sync::{Arc, Mutex};

use crate::backend::{Connector, Session};
use crate::conninfo::ConnInfo;
use crate::error::AgentDbError;
use crate::lock::ScopedLock;
use crate::logging::{LogLevel, log_message};
use crate::postgres::PostgresConnector;

pub use entry::PoolEntry;
pub use types::{EntryId, PoolStatus, ServerVersion};
use types::{SessionState, Slot, SlotState};

#[derive(Default)]
pub(crate) struct Registry {
    slots: Vec<Slot>,
    primary: Option<ConnInfo>,
    next_id: u64,
    closed: bool,
}

impl Registry {
    fn allocate_id(&mut self) -> EntryId {
        self.next_id += 1;
        EntryId(self.next_id)
    }

    /// Unlink idle slots whose transport is gone. The caller drops the
    /// returned sessions after releasing the lock.
    fn evict_stale(&mut self) -> Vec<SessionState> {
        let mut stale = Vec::new();
        let mut idx = 0;
        while idx < self.slots.len() {
            if self.slots[idx].is_stale() {
                let mut slot = self.slots.swap_remove(idx);
                if let Some(state) = slot.checkout() {
                    tracing::debug!("discarding closed connection {}", slot.id);
                    stale.push(state);
                }
            } else {
                idx += 1;
            }
        }
        stale
    }

    fn status(&self) -> PoolStatus {
        let idle = self.slots.iter().filter(|slot| slot.is_idle()).count();
        PoolStatus {
            total: self.slots.len(),
            idle,
            in_use: self.slots.len() - idle,
            has_primary: self.primary.is_some(),
        }
    }
}

pub(crate) struct PoolInner {
    connector: Box<dyn Connector>,
    registry: Mutex<Registry>,
    last_error: Mutex<String>,
}

impl PoolInner {
    fn set_last_error(&self, message: impl Into<String>) {
        *ScopedLock::acquire(&self.last_error) = message.into();
    }

    fn connect(&self, conn_str: &str) -> Result<Box<dyn Session>, AgentDbError> {
        tracing::debug!("creating new connection to {}", ConnInfo::redact(conn_str));
        self.connector.connect(conn_str).map_err(|err| {
            let message = format!(
                "Failed to create new connection with connection string '{}': {err}",
                ConnInfo::redact(conn_str)
            );
            log_message(&message, LogLevel::Startup);
            self.set_last_error(message);
            err
        })
    }

    /// Hand a checked-out session back. Sessions whose slot was retired or
    /// whose transport closed are dropped instead.
    pub(crate) fn give_back(&self, id: EntryId, mut state: SessionState) {
        state.reset_outcome();
        let mut lock = ScopedLock::acquire(&self.registry);
        let position = lock.slots.iter().position(|slot| slot.id == id);
        let discarded = match position {
            Some(idx) if !state.session.is_closed() => {
                lock.slots[idx].state = SlotState::Idle(state);
                tracing::debug!("returned connection {id} to the pool");
                None
            }
            Some(idx) => {
                lock.slots.swap_remove(idx);
                tracing::debug!("connection {id} closed while in use, discarding");
                Some(state)
            }
            None => {
                tracing::debug!("connection {id} was retired, disconnecting");
                Some(state)
            }
        };
        lock.release();
        drop(discarded);
    }
}

/// Registry of database sessions keyed by canonical connection string.
///
/// Cloning is cheap and every clone refers to the same registry. Sessions are
/// reused when an idle one with an identical canonical connection string
/// exists; otherwise a new one is opened without holding the registry lock.
///
/// ```rust,no_run
/// use jobagent_db::pool::ConnectionPool;
///
/// # fn main() -> Result<(), jobagent_db::AgentDbError> {
/// let pool = ConnectionPool::postgres()?;
/// let service = pool.init_connection("host=localhost dbname=postgres user=agent")?;
/// let mut jobs = pool.get(None, Some("jobsdb"))?;
/// let count = jobs.execute_scalar("SELECT count(*) FROM jobs");
/// println!("{count} jobs");
/// drop(jobs);
/// drop(service);
/// pool.shutdown();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Create an empty pool that opens sessions through `connector`.
    pub fn new<C: Connector + 'static>(connector: C) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                connector: Box::new(connector),
                registry: Mutex::new(Registry::default()),
                last_error: Mutex::new(String::new()),
            }),
        }
    }

    /// Create an empty pool backed by PostgreSQL.
    ///
    /// # Errors
    /// Returns [`AgentDbError::Runtime`] if the driver runtime cannot start.
    pub fn postgres() -> Result<Self, AgentDbError> {
        Ok(Self::new(PostgresConnector::new()?))
    }

    /// Validate `conn_str`, open the primary session and record it as the
    /// default descriptor for [`ConnectionPool::get`].
    ///
    /// The primary entry is returned checked out; it is the caller's service
    /// connection. A failed connect leaves any earlier primary in place.
    ///
    /// # Errors
    /// [`AgentDbError::ConnInfo`] for a malformed string,
    /// [`AgentDbError::Connection`] when the server is unreachable,
    /// [`AgentDbError::PoolClosed`] after [`ConnectionPool::shutdown`].
    pub fn init_connection(&self, conn_str: &str) -> Result<PoolEntry, AgentDbError> {
        let info: ConnInfo = match conn_str.parse() {
            Ok(info) => info,
            Err(err) => {
                let message = format!("Primary connection string is not valid: {err}");
                log_message(&message, LogLevel::Error);
                self.inner.set_last_error(message);
                return Err(err.into());
            }
        };
        if self.is_closed() {
            return Err(AgentDbError::PoolClosed);
        }

        let canonical = info.get(None);
        let session = self.inner.connect(&canonical)?;

        let mut lock = ScopedLock::acquire(&self.inner.registry);
        if lock.closed {
            lock.release();
            drop(session);
            return Err(AgentDbError::PoolClosed);
        }
        for slot in &mut lock.slots {
            slot.primary = false;
        }
        let id = lock.allocate_id();
        lock.slots.push(Slot {
            id,
            conn_str: canonical.clone(),
            primary: true,
            state: SlotState::InUse,
        });
        tracing::debug!("primary connection {id} established to {}", info.redacted());
        lock.primary = Some(info);
        lock.release();

        Ok(PoolEntry::new(
            id,
            canonical,
            true,
            SessionState::new(session),
            Arc::clone(&self.inner),
        ))
    }

    /// Check out a session for `descriptor`, or for the primary descriptor
    /// when none is given, aimed at `database` when one is given.
    ///
    /// # Errors
    /// [`AgentDbError::NoPrimary`] when no descriptor is given and
    /// [`ConnectionPool::init_connection`] has not succeeded,
    /// [`AgentDbError::ConnInfo`] for a malformed descriptor,
    /// [`AgentDbError::Connection`] when a new session cannot be opened,
    /// [`AgentDbError::PoolClosed`] after [`ConnectionPool::shutdown`].
    pub fn get(
        &self,
        descriptor: Option<&str>,
        database: Option<&str>,
    ) -> Result<PoolEntry, AgentDbError> {
        let mut lock = ScopedLock::acquire(&self.inner.registry);
        if lock.closed {
            return Err(AgentDbError::PoolClosed);
        }

        let conn_str = match descriptor.filter(|text| !text.trim().is_empty()) {
            Some(text) => match ConnInfo::canonical_for(text, database) {
                Ok(conn_str) => conn_str,
                Err(err) => {
                    lock.release();
                    self.inner
                        .set_last_error(format!("Connection string is not valid: {err}"));
                    return Err(err.into());
                }
            },
            None => match lock.primary.as_ref().map(|info| info.get(database)) {
                Some(conn_str) => conn_str,
                None => {
                    lock.release();
                    let message = "Cannot allocate connection - no primary connection is set";
                    log_message(message, LogLevel::Warning);
                    self.inner.set_last_error(message);
                    return Err(AgentDbError::NoPrimary);
                }
            },
        };

        let stale = lock.evict_stale();
        let reusable = lock
            .slots
            .iter_mut()
            .filter(|slot| slot.conn_str == conn_str)
            .find_map(|slot| slot.checkout().map(|state| (slot.id, slot.primary, state)));
        if let Some((id, primary, state)) = reusable {
            lock.release();
            drop(stale);
            tracing::debug!(
                "allocating existing connection {id} to {}",
                ConnInfo::redact(&conn_str)
            );
            return Ok(PoolEntry::new(
                id,
                conn_str,
                primary,
                state,
                Arc::clone(&self.inner),
            ));
        }

        lock.release();
        drop(stale);
        let session = self.inner.connect(&conn_str)?;

        lock.rebind(Some(&self.inner.registry));
        if lock.closed {
            lock.release();
            drop(session);
            return Err(AgentDbError::PoolClosed);
        }
        let id = lock.allocate_id();
        lock.slots.push(Slot {
            id,
            conn_str: conn_str.clone(),
            primary: false,
            state: SlotState::InUse,
        });
        lock.release();
        tracing::debug!(
            "allocating new connection {id} to {}",
            ConnInfo::redact(&conn_str)
        );

        Ok(PoolEntry::new(
            id,
            conn_str,
            false,
            SessionState::new(session),
            Arc::clone(&self.inner),
        ))
    }

    /// Disconnect every idle session. The primary slot survives unless
    /// `include_primary` is set, in which case the primary designation is
    /// dropped too and an in-use primary is retired.
    pub fn clear_connections(&self, include_primary: bool) {
        let mut lock = ScopedLock::acquire(&self.inner.registry);
        let total = lock.slots.len();
        let free = lock.slots.iter().filter(|slot| slot.is_idle()).count();

        let mut removed = Vec::new();
        let mut retired = 0_usize;
        let mut kept = Vec::with_capacity(total);
        for mut slot in std::mem::take(&mut lock.slots) {
            let protected = slot.primary && !include_primary;
            match slot.state {
                SlotState::Idle(state) if !protected => removed.push(state),
                SlotState::InUse if slot.primary && include_primary => retired += 1,
                state => {
                    slot.state = state;
                    kept.push(slot);
                }
            }
        }
        lock.slots = kept;
        if include_primary {
            lock.primary = None;
        }
        lock.release();

        let deleted = removed.len();
        drop(removed);
        tracing::debug!(
            "Connection stats: total - {total}, free - {free}, deleted - {deleted}, retired - {retired}"
        );
    }

    /// Close the pool: idle sessions are disconnected, checked-out ones are
    /// disconnected when their holders return them, and every later
    /// [`ConnectionPool::get`] fails. Calling this again does nothing.
    pub fn shutdown(&self) {
        let mut lock = ScopedLock::acquire(&self.inner.registry);
        if lock.closed {
            return;
        }
        lock.closed = true;
        lock.primary = None;
        let slots = std::mem::take(&mut lock.slots);
        lock.release();

        let mut closed = 0_usize;
        let mut retired = 0_usize;
        for mut slot in slots {
            match slot.checkout() {
                Some(state) => {
                    drop(state);
                    closed += 1;
                }
                None => retired += 1,
            }
        }
        tracing::debug!("connection pool shut down: closed {closed}, retired {retired}");
    }

    #[must_use]
    pub fn status(&self) -> PoolStatus {
        ScopedLock::acquire(&self.inner.registry).status()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        ScopedLock::acquire(&self.inner.registry).closed
    }

    /// Redacted primary descriptor, if one is set.
    #[must_use]
    pub fn primary_descriptor(&self) -> Option<String> {
        ScopedLock::acquire(&self.inner.registry)
            .primary
            .as_ref()
            .map(ConnInfo::redacted)
    }

    /// Text of the last connect or parse failure seen by the pool.
    #[must_use]
    pub fn last_error(&self) -> String {
        ScopedLock::acquire(&self.inner.last_error).clone()
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
