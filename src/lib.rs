//! Connection pool and result handling for a PostgreSQL job scheduling agent.
//!
//! The agent keeps one primary session open as its service connection and
//! checks out further sessions per job step, each aimed at the step's
//! database. Everything here is blocking; the PostgreSQL driver runs on a
//! private runtime owned by [`postgres::PostgresConnector`].
//!
//! ```rust,no_run
//! use jobagent_db::prelude::*;
//!
//! # fn main() -> Result<(), AgentDbError> {
//! let pool = ConnectionPool::postgres()?;
//! let mut service = pool.init_connection("host=localhost dbname=postgres user=agent")?;
//! let mut jobs = ScopedResult::from(service.execute("SELECT jobid FROM jobs")?);
//! while jobs.has_data() {
//!     println!("job {}", jobs.get_string("jobid"));
//!     jobs.move_next();
//! }
//! pool.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod conninfo;
pub mod error;
pub mod helpers;
pub mod lock;
pub mod logging;
pub mod pool;
pub mod postgres;
pub mod prelude;
pub mod query_utils;
pub mod results;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use backend::{CommandStatus, Connector, RawResult, Session};
pub use conninfo::{ConnInfo, ConnInfoError};
pub use error::AgentDbError;
pub use lock::ScopedLock;
pub use pool::{ConnectionPool, EntryId, PoolEntry, PoolStatus, ServerVersion};
pub use query_utils::quote_literal;
pub use results::{QueryResult, ScopedResult};
