use std::sync::Arc;

use tokio::runtime::Runtime;
use tokio_postgres::Client;

use crate::backend::{RawResult, Session};
use crate::error::AgentDbError;

use super::query::build_raw_result;

/// A connected PostgreSQL session.
///
/// Queries go through the simple-query protocol, so every value arrives as
/// text exactly as the server rendered it. Dropping the session drops the
/// client, which sends Terminate; the connection task then finishes by itself.
pub struct PostgresSession {
    runtime: Arc<Runtime>,
    client: Client,
}

impl PostgresSession {
    pub(super) fn new(runtime: Arc<Runtime>, client: Client) -> Self {
        Self { runtime, client }
    }
}

impl Session for PostgresSession {
    fn execute(&mut self, query: &str) -> Result<RawResult, AgentDbError> {
        let messages = self.runtime.block_on(self.client.simple_query(query))?;
        build_raw_result(messages)
    }

    fn is_closed(&self) -> bool {
        self.client.is_closed()
    }
}
