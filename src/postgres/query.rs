use tokio_postgres::SimpleQueryMessage;

use crate::backend::{CommandStatus, RawResult};
use crate::error::AgentDbError;
use crate::query_utils::extract_column_names;

/// Build a [`RawResult`] from the messages of one simple-query round trip.
///
/// A query string may hold several statements; like libpq's `PQexec`, only
/// the last statement's outcome is kept. No command-complete message at all
/// means the query string was empty.
///
/// # Errors
/// Returns `AgentDbError::Execution` if a row value cannot be read.
pub fn build_raw_result(messages: Vec<SimpleQueryMessage>) -> Result<RawResult, AgentDbError> {
    let mut columns: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    let mut last: Option<RawResult> = None;

    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(description) => {
                columns = Some(extract_column_names(description.iter(), |col| col.name()));
            }
            SimpleQueryMessage::Row(row) => {
                if columns.is_none() {
                    columns = Some(extract_column_names(row.columns().iter(), |col| col.name()));
                }
                let mut values = Vec::with_capacity(row.len());
                for idx in 0..row.len() {
                    let value = row.try_get(idx).map_err(|e| {
                        AgentDbError::Execution(format!("postgres row decode error: {e}"))
                    })?;
                    values.push(value.map(str::to_string));
                }
                rows.push(values);
            }
            SimpleQueryMessage::CommandComplete(count) => {
                let result = match columns.take() {
                    Some(columns) => RawResult {
                        columns,
                        rows: std::mem::take(&mut rows),
                        rows_affected: count,
                        status: CommandStatus::TuplesOk,
                    },
                    None => RawResult::command(count),
                };
                last = Some(result);
            }
            _ => {}
        }
    }

    Ok(last.unwrap_or_else(RawResult::empty_query))
}
