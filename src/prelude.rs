//! Convenient imports for common functionality.
//!
//! This module re-exports the types most callers need to open a pool, run
//! queries and walk their results.

pub use crate::backend::{CommandStatus, Connector, Session};
pub use crate::config::{AgentArgs, AgentConfig};
pub use crate::conninfo::ConnInfo;
pub use crate::error::AgentDbError;
pub use crate::logging::{LogLevel, init_logging, log_message};
pub use crate::pool::{ConnectionPool, EntryId, PoolEntry, PoolStatus, ServerVersion};
pub use crate::query_utils::quote_literal;
pub use crate::results::{ColumnIndex, QueryResult, ScopedResult};
