//! Comparator library - run paired SQL queries and compare their results.
//!
//! A [`SourcePair`] runs a left query and, optionally, a right query against a
//! second source. The right query can embed `{{ column }}` placeholders filled
//! from the left result. A [`Comparator`] evaluates predicates over the two
//! normalized [`QueryResult`]s, and a [`ComparatorSet`] batches comparators.
//!
//! # Modules
//!
//! - [`result`] - normalized results with row and column views
//! - [`source`] - the [`Source`] trait and SQLite/DuckDB adapters
//! - [`pair`] - query pairs and template substitution
//! - [`compare`] - comparators and their outcomes
//! - [`set`] - batches of comparators
//! - [`config`] - database registry and comparison plans
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use comparator::{Comparator, Source, SqliteSource, LEN_COMP};
//!
//! let left = SqliteSource::open_in_memory().unwrap().with_name("left");
//! left.execute("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (1), (4);").unwrap();
//! let right = SqliteSource::open_in_memory().unwrap().with_name("right");
//! right.execute("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (1), (4);").unwrap();
//!
//! let mut comparator = Comparator::from_sources(
//!     Rc::new(left),
//!     "SELECT id FROM t ORDER BY id",
//!     Some(Rc::new(right)),
//!     Some("SELECT id FROM t WHERE id IN {{ id }} ORDER BY id".to_string()),
//!     vec![LEN_COMP.into()],
//!     Some("ids".to_string()),
//! )
//! .unwrap();
//!
//! let outcomes = comparator.run_comparisons().unwrap();
//! assert!(outcomes.iter().all(|o| o.is_truthy()));
//! ```

pub mod compare;
pub mod comps;
pub mod config;
pub mod error;
pub mod output;
pub mod pair;
pub mod result;
pub mod set;
pub mod source;
pub mod value;

#[cfg(test)]
mod test_utils;

pub use compare::{Compare, Comparator, ComparatorResult, OutcomeField, OutcomeKey};
pub use comps::{BuiltinComp, CompSpec, Predicate, BASIC_COMP, DEFAULT_COMP, FIRST_COMP, LEN_COMP};
pub use config::{ComparisonPlan, DbConfig};
pub use error::{ComparatorError, Result};
pub use pair::{format_query, SourcePair};
pub use result::{QueryItem, QueryKey, QueryResult, QueryResultCol, QueryResultRow, Record};
pub use set::{ComparatorSet, ComparisonConfig};
#[cfg(feature = "duckdb")]
pub use source::DuckDbSource;
pub use source::{Source, SqliteSource};
pub use value::Value;
