use std::ops::{Deref, DerefMut};

use super::query_result::QueryResult;

/// Owns zero or one result and releases it exactly once.
///
/// Assigning a new value releases the previous one first; leaving scope
/// releases whatever is held.
///
/// ```rust
/// # use jobagent_db::backend::RawResult;
/// # use jobagent_db::results::{QueryResult, ScopedResult};
/// let mut res = ScopedResult::new(Some(QueryResult::from_raw(RawResult::command(1))));
/// assert!(res.is_valid());
/// res.assign(None);
/// assert!(!res.is_valid());
/// ```
#[derive(Debug)]
pub struct ScopedResult<T = QueryResult> {
    held: Option<T>,
}

impl<T> ScopedResult<T> {
    #[must_use]
    pub fn new(value: Option<T>) -> Self {
        Self { held: value }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self { held: None }
    }

    /// Release the held value, then hold `value`.
    pub fn assign(&mut self, value: Option<T>) {
        drop(self.held.take());
        self.held = value;
    }

    /// Give up ownership of the held value without releasing it.
    pub fn take(&mut self) -> Option<T> {
        self.held.take()
    }

    #[must_use]
    pub fn is_some(&self) -> bool {
        self.held.is_some()
    }

    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.held.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.held.as_mut()
    }
}

impl ScopedResult<QueryResult> {
    /// Whether a result is held and the server accepted its query.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.held.as_ref().is_some_and(QueryResult::is_valid)
    }
}

impl<T> Default for ScopedResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<QueryResult> for ScopedResult<QueryResult> {
    fn from(value: QueryResult) -> Self {
        Self::new(Some(value))
    }
}

impl<T> From<Option<T>> for ScopedResult<T> {
    fn from(value: Option<T>) -> Self {
        Self::new(value)
    }
}

impl<T> Deref for ScopedResult<T> {
    type Target = T;

    /// # Panics
    /// Panics when nothing is held; check [`ScopedResult::is_some`] first.
    fn deref(&self) -> &T {
        self.held
            .as_ref()
            .expect("ScopedResult dereferenced while empty")
    }
}

impl<T> DerefMut for ScopedResult<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.held
            .as_mut()
            .expect("ScopedResult dereferenced while empty")
    }
}
