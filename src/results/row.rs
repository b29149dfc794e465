use std::collections::HashMap;

/// Column names of a result, with a lookup cache.
#[derive(Debug, Clone, Default)]
pub struct Columns {
    names: Vec<String>,
    // Internal cache for faster column lookups (to avoid repeated string comparisons)
    index: HashMap<String, usize>,
}

impl Columns {
    /// Build the column list. When names repeat, lookups find the first one.
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            index.entry(name.clone()).or_insert(i);
        }
        Self { names, index }
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of a column by name.
    ///
    /// Unquoted names are folded to lower case, as the server folds unquoted
    /// identifiers; a name in double quotes is matched exactly.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        let folded = fold_identifier(name);
        self.index.get(folded.as_str()).copied()
    }
}

fn fold_identifier(name: &str) -> String {
    match name
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\"\"", "\""),
        None => name.to_lowercase(),
    }
}

/// Anything that can address a column of the current row: a position or a
/// name.
pub trait ColumnIndex {
    fn column_index(&self, columns: &Columns) -> Option<usize>;
}

impl ColumnIndex for usize {
    fn column_index(&self, columns: &Columns) -> Option<usize> {
        (*self < columns.len()).then_some(*self)
    }
}

impl ColumnIndex for str {
    fn column_index(&self, columns: &Columns) -> Option<usize> {
        columns.position(self)
    }
}

impl ColumnIndex for String {
    fn column_index(&self, columns: &Columns) -> Option<usize> {
        columns.position(self)
    }
}

impl<T: ColumnIndex + ?Sized> ColumnIndex for &T {
    fn column_index(&self, columns: &Columns) -> Option<usize> {
        (**self).column_index(columns)
    }
}

/// A row from a query result. Values are text as rendered by the server;
/// `None` is SQL NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultRow {
    values: Vec<Option<String>>,
}

impl ResultRow {
    #[must_use]
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self { values }
    }

    /// Get a value by column position; `None` for NULL or an out-of-range
    /// index.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(Option::as_deref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Columns {
        Columns::new(vec![
            "jobid".to_string(),
            "JobName".to_string(),
            "jobid".to_string(),
        ])
    }

    #[test]
    fn unquoted_names_fold_to_lower_case() {
        let cols = columns();
        assert_eq!(cols.position("jobid"), Some(0));
        assert_eq!(cols.position("JOBID"), Some(0));
        assert_eq!(cols.position("JobName"), None);
    }

    #[test]
    fn quoted_names_match_exactly() {
        let cols = columns();
        assert_eq!(cols.position("\"JobName\""), Some(1));
        assert_eq!(cols.position("\"jobname\""), None);
    }

    #[test]
    fn duplicate_names_resolve_to_first() {
        assert_eq!(columns().position("jobid"), Some(0));
    }

    #[test]
    fn index_bounds_are_checked() {
        let cols = columns();
        assert_eq!(2usize.column_index(&cols), Some(2));
        assert_eq!(3usize.column_index(&cols), None);
        assert_eq!("missing".column_index(&cols), None);
    }

    #[test]
    fn null_and_missing_values_are_none() {
        let row = ResultRow::new(vec![Some("1".to_string()), None]);
        assert_eq!(row.get_by_index(0), Some("1"));
        assert_eq!(row.get_by_index(1), None);
        assert_eq!(row.get_by_index(2), None);
    }
}
