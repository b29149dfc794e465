use thiserror::Error;

use crate::conninfo::ConnInfoError;

#[derive(Debug, Error)]
pub enum AgentDbError {
    #[error("Connection string error: {0}")]
    ConnInfo(#[from] ConnInfoError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("SQL execution error: {0}")]
    Execution(String),

    #[error("No primary connection has been initialised")]
    NoPrimary,

    #[error("Connection pool is shut down")]
    PoolClosed,

    #[error("Pool entry has already been returned")]
    EntryReleased,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Runtime(#[from] std::io::Error),
}

impl From<tokio_postgres::Error> for AgentDbError {
    fn from(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            AgentDbError::Execution(db_err.message().to_string())
        } else if err.is_closed() {
            AgentDbError::ConnectionLost(with_sources(&err))
        } else {
            AgentDbError::Connection(with_sources(&err))
        }
    }
}

/// Render an error followed by its chain of causes.
pub(crate) fn with_sources(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        cause = inner.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_errors_keep_their_cause() {
        let err = "host=localhost nonsense=1"
            .parse::<tokio_postgres::Config>()
            .unwrap_err();
        let message = AgentDbError::from(err).to_string();
        assert!(message.starts_with("Connection error: invalid connection string: "));
        assert!(message.contains("nonsense"));
    }
}
