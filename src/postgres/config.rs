use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};
use tokio_postgres::{Config as PgConfig, NoTls};

use crate::backend::{Connector, Session};
use crate::conninfo::{ConnInfo, ConnParams};
use crate::error::{AgentDbError, with_sources};

use super::executor::PostgresSession;

/// Opens blocking PostgreSQL sessions.
///
/// Every session created by one connector is driven by the same small tokio
/// runtime, which lives until the connector and all of its sessions are gone.
/// Calls block the calling thread; they must not be made from inside an async
/// context.
pub struct PostgresConnector {
    runtime: Arc<Runtime>,
}

impl PostgresConnector {
    /// Build a connector with its own I/O runtime.
    ///
    /// # Errors
    /// Returns `AgentDbError::Runtime` if the runtime threads cannot be started.
    pub fn new() -> Result<Self, AgentDbError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("jobagent-pg-io")
            .enable_all()
            .build()?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }
}

impl std::fmt::Debug for PostgresConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConnector").finish_non_exhaustive()
    }
}

impl Connector for PostgresConnector {
    fn connect(&self, conn_str: &str) -> Result<Box<dyn Session>, AgentDbError> {
        let config = driver_config(conn_str)?;

        let (client, connection) = self
            .runtime
            .block_on(config.connect(NoTls))
            .map_err(|e| AgentDbError::Connection(with_sources(&e)))?;

        // Ends once the client is dropped and Terminate has been written.
        self.runtime.spawn(async move {
            if let Err(err) = connection.await {
                tracing::debug!("postgres connection closed: {err}");
            }
        });

        Ok(Box::new(PostgresSession::new(
            Arc::clone(&self.runtime),
            client,
        )))
    }
}

/// Keys `tokio_postgres::Config` accepts. Other libpq keywords are kept in the
/// pool's connection string but never reach the driver.
const DRIVER_KEYS: &[&str] = &[
    "user",
    "password",
    "dbname",
    "options",
    "application_name",
    "sslmode",
    "sslnegotiation",
    "host",
    "hostaddr",
    "port",
    "connect_timeout",
    "tcp_user_timeout",
    "keepalives",
    "keepalives_idle",
    "keepalives_interval",
    "keepalives_retries",
    "target_session_attrs",
    "channel_binding",
    "load_balance_hosts",
];

/// Split `params` into what the driver understands and the names of the keys
/// it would reject.
fn split_driver_params(params: &ConnParams) -> (ConnParams, Vec<&str>) {
    let mut usable = ConnParams::default();
    let mut skipped = Vec::new();
    for (key, value) in params.iter() {
        if DRIVER_KEYS.contains(&key) {
            usable.set(key, value);
        } else {
            skipped.push(key);
        }
    }
    (usable, skipped)
}

fn driver_config(conn_str: &str) -> Result<PgConfig, AgentDbError> {
    let params = ConnParams::parse(conn_str)?;
    let (usable, skipped) = split_driver_params(&params);
    if !skipped.is_empty() {
        tracing::warn!(
            "ignoring connection options the driver does not support: {}",
            skipped.join(", ")
        );
    }
    usable.render(false).parse().map_err(|e: tokio_postgres::Error| {
        AgentDbError::Connection(format!(
            "invalid connection string {}: {}",
            ConnInfo::redact(conn_str),
            with_sources(&e)
        ))
    })
}
