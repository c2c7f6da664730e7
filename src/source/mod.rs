//! Query sources.
//!
//! A [`Source`] is anything that can run a SQL string and hand back a
//! normalized [`QueryResult`]. The library never opens connections on its own;
//! callers construct sources (directly or through [`crate::config`]) and share
//! them between source pairs with `Rc<dyn Source>`.

#[cfg(feature = "duckdb")]
pub mod duckdb;
pub mod sqlite;

#[cfg(feature = "duckdb")]
pub use self::duckdb::DuckDbSource;
pub use self::sqlite::SqliteSource;

use crate::error::Result;
use crate::result::QueryResult;

/// A connection that can execute queries.
pub trait Source {
    /// Human readable name, used in log output and pair descriptions.
    fn name(&self) -> &str {
        "source"
    }

    /// Run `sql` and return its rows.
    fn query(&self, sql: &str) -> Result<QueryResult>;

    /// Run one or more statements, discarding any rows.
    fn execute(&self, sql: &str) -> Result<()> {
        self.query(sql).map(|_| ())
    }
}
