// PostgreSQL module - blocking sessions over tokio-postgres
//
// This module is split into several sub-modules:
// - config: connector and the private runtime that drives connections
// - executor: the blocking session used by the pool
// - query: result extraction from simple-query messages

pub mod config;
pub mod executor;
pub mod query;

// Re-export the public API
pub use config::PostgresConnector;
pub use executor::PostgresSession;
pub use query::build_raw_result;
