pub mod owner;
pub mod query_result;
pub mod row;

pub use owner::ScopedResult;
pub use query_result::QueryResult;
pub use row::{ColumnIndex, Columns, ResultRow};
