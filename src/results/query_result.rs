use crate::backend::{CommandStatus, RawResult};

use super::row::{ColumnIndex, Columns, ResultRow};

/// The outcome of one executed query, read through a forward-only cursor.
///
/// The cursor starts on the first row. [`QueryResult::move_next`] advances it
/// and stops at the end, so a typical loop reads:
///
/// ```rust
/// # use jobagent_db::backend::RawResult;
/// # use jobagent_db::results::QueryResult;
/// # let mut result = QueryResult::from_raw(RawResult::tuples(
/// #     vec!["jobid".into()],
/// #     vec![vec![Some("1".into())], vec![Some("2".into())]],
/// # ));
/// let mut ids = Vec::new();
/// while result.has_data() {
///     ids.push(result.get_string("jobid"));
///     result.move_next();
/// }
/// assert_eq!(ids, ["1", "2"]);
/// ```
#[derive(Debug, Clone)]
pub struct QueryResult {
    columns: Columns,
    rows: Vec<ResultRow>,
    current: usize,
    rows_affected: u64,
    status: CommandStatus,
}

impl QueryResult {
    #[must_use]
    pub fn from_raw(raw: RawResult) -> Self {
        Self {
            columns: Columns::new(raw.columns),
            rows: raw.rows.into_iter().map(ResultRow::new).collect(),
            current: 0,
            rows_affected: raw.rows_affected,
            status: raw.status,
        }
    }

    #[cfg(test)]
    pub(crate) fn failed(status: CommandStatus) -> Self {
        Self {
            columns: Columns::default(),
            rows: Vec::new(),
            current: 0,
            rows_affected: 0,
            status,
        }
    }

    /// Whether the server returned a well-formed result, with or without rows.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.status.is_ok()
    }

    /// Whether the cursor is on a row.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.current < self.rows.len()
    }

    /// Advance the cursor. Calling this at the end does nothing.
    pub fn move_next(&mut self) {
        if self.current < self.rows.len() {
            self.current += 1;
        }
    }

    /// Text of a column in the current row.
    ///
    /// An unknown column, a NULL value or an exhausted cursor all give an
    /// empty string.
    #[must_use]
    pub fn get_string<C: ColumnIndex>(&self, column: C) -> String {
        self.get_opt(column).unwrap_or_default().to_string()
    }

    /// Like [`QueryResult::get_string`] but keeps NULL distinct from `""`.
    #[must_use]
    pub fn get_opt<C: ColumnIndex>(&self, column: C) -> Option<&str> {
        let idx = column.column_index(&self.columns)?;
        self.rows.get(self.current)?.get_by_index(idx)
    }

    /// Count reported by the command-complete tag; 0 when the command reports
    /// none.
    #[must_use]
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cursor position, `0..=row_count()`.
    #[must_use]
    pub fn position(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        self.columns.names()
    }

    #[must_use]
    pub fn status(&self) -> CommandStatus {
        self.status
    }
}
