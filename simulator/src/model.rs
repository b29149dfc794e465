use jobagent_db::PoolEntry;
use jobagent_db::pool::EntryId;

#[derive(Debug, Clone)]
pub(crate) enum Op {
    /// Check out a session for database `n`, through the primary descriptor.
    Checkout(usize),
    /// Re-establish the primary after it was cleared.
    InitPrimary,
    Execute,
    FailingQuery,
    /// A query during which the server drops the session.
    Disconnect,
    Return,
    Clear { include_primary: bool },
    /// Every open session is cut, as on a server restart.
    Restart,
    Sleep(u64),
}

/// What a simulated task holds. The entry itself is kept alongside the
/// bookkeeping the oracle compares against the pool.
pub(crate) struct TaskState {
    pub(crate) id: usize,
    pub(crate) entry: Option<PoolEntry>,
    /// The held entry's slot was removed from the registry while held.
    pub(crate) retired: bool,
}

impl TaskState {
    pub(crate) fn new(id: usize) -> Self {
        Self {
            id,
            entry: None,
            retired: false,
        }
    }

    pub(crate) fn held_id(&self) -> Option<EntryId> {
        self.entry.as_ref().map(PoolEntry::id)
    }

    pub(crate) fn release(&mut self) {
        self.entry = None;
        self.retired = false;
    }
}

pub(crate) fn database_name(n: usize) -> String {
    if n == 0 {
        "postgres".to_string()
    } else {
        format!("jobs{n}")
    }
}
