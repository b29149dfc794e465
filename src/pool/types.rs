use std::fmt;
use std::sync::LazyLock;
use std::time::Instant;

use regex::Regex;

use crate::backend::{CommandStatus, Session};

/// Identity of one pooled session, stable for the session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub(crate) u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Server version as `major.minor`. Ordering compares major first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
}

static VERSION_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*\S+\s+(\d+)(?:\.(\d+))?").ok());

impl ServerVersion {
    #[must_use]
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse the text of `SELECT version()`, e.g.
    /// `PostgreSQL 16.2 on x86_64-pc-linux-gnu, ...`. A missing minor part
    /// (`PostgreSQL 17devel`) reads as `.0`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let caps = VERSION_RE.as_ref()?.captures(text)?;
        let major = caps.get(1)?.as_str().parse().ok()?;
        let minor = caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        Some(Self { major, minor })
    }

    #[must_use]
    pub fn at_least(self, major: u32, minor: u32) -> bool {
        self >= Self::new(major, minor)
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Snapshot of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Number of registered sessions.
    pub total: usize,
    /// Sessions available for checkout.
    pub idle: usize,
    /// Sessions currently checked out.
    pub in_use: usize,
    /// Whether a primary descriptor is set.
    pub has_primary: bool,
}

/// A physical session plus the metadata that travels with it between the
/// registry and the caller that checked it out.
pub(crate) struct SessionState {
    pub(crate) session: Box<dyn Session>,
    pub(crate) version: Option<ServerVersion>,
    pub(crate) last_error: String,
    pub(crate) last_status: CommandStatus,
    pub(crate) connected_at: Instant,
}

impl SessionState {
    pub(crate) fn new(session: Box<dyn Session>) -> Self {
        Self {
            session,
            version: None,
            last_error: String::new(),
            last_status: CommandStatus::CommandOk,
            connected_at: Instant::now(),
        }
    }

    /// Forget the previous holder's outcome. The cached version stays.
    pub(crate) fn reset_outcome(&mut self) {
        self.last_error.clear();
        self.last_status = CommandStatus::CommandOk;
    }
}

pub(crate) enum SlotState {
    Idle(SessionState),
    InUse,
}

pub(crate) struct Slot {
    pub(crate) id: EntryId,
    pub(crate) conn_str: String,
    pub(crate) primary: bool,
    pub(crate) state: SlotState,
}

impl Slot {
    pub(crate) fn is_idle(&self) -> bool {
        matches!(self.state, SlotState::Idle(_))
    }

    /// Move the session out for a caller; `None` if it is already out.
    pub(crate) fn checkout(&mut self) -> Option<SessionState> {
        match std::mem::replace(&mut self.state, SlotState::InUse) {
            SlotState::Idle(state) => Some(state),
            SlotState::InUse => None,
        }
    }

    /// Whether the slot's idle session has lost its transport.
    pub(crate) fn is_stale(&self) -> bool {
        match &self.state {
            SlotState::Idle(state) => state.session.is_closed(),
            SlotState::InUse => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_release_versions() {
        let v = ServerVersion::parse(
            "PostgreSQL 16.2 (Debian 16.2-1.pgdg120+2) on x86_64-pc-linux-gnu, compiled by gcc",
        );
        assert_eq!(v, Some(ServerVersion::new(16, 2)));
        assert_eq!(
            ServerVersion::parse("PostgreSQL 9.6.24 on x86_64"),
            Some(ServerVersion::new(9, 6))
        );
    }

    #[test]
    fn parses_development_versions() {
        assert_eq!(
            ServerVersion::parse("PostgreSQL 17devel on aarch64"),
            Some(ServerVersion::new(17, 0))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(ServerVersion::parse(""), None);
        assert_eq!(ServerVersion::parse("PostgreSQL"), None);
        assert_eq!(ServerVersion::parse("PostgreSQL unknown"), None);
    }

    #[test]
    fn compares_major_before_minor() {
        let v = ServerVersion::new(9, 1);
        assert!(v.at_least(9, 1));
        assert!(v.at_least(8, 4));
        assert!(!v.at_least(9, 2));
        assert!(!v.at_least(10, 0));
        assert!(ServerVersion::new(10, 0).at_least(9, 6));
    }
}
