//! Normalized query results.
//!
//! [`QueryResult`] is the one shape every source's output is converted into:
//! an ordered list of rows that all share a single column-key ordering. Rows are
//! stored aligned to that ordering, so row and column projections
//! ([`QueryResultRow`], [`QueryResultCol`]) are cheap borrowed views that never
//! copy or mutate the parent.
//!
//! # Example
//!
//! ```
//! use comparator::{QueryResult, Value};
//!
//! let result = QueryResult::from_records(vec![
//!     vec![("id", Value::Int(1)), ("name", Value::from("one"))],
//!     vec![("id", Value::Int(4)), ("name", Value::from("four"))],
//! ])
//! .unwrap();
//!
//! assert_eq!(result.len(), 2);
//! assert_eq!(result.column("id").unwrap().to_string(), "(1, 4)");
//! assert_eq!(result.first().unwrap().get("name"), Some(&Value::from("one")));
//! ```

mod column;
mod convert;
mod row;

pub use column::QueryResultCol;
pub use row::QueryResultRow;

use std::collections::HashMap;
use std::fmt;
use std::ops::{Bound, Range, RangeBounds, RangeFrom, RangeFull, RangeTo};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{ComparatorError, Result};
use crate::value::Value;

/// An owned row: column name to value, in column order.
pub type Record = IndexMap<String, Value>;

/// The normalized result of one query.
#[derive(Debug, Clone)]
pub struct QueryResult {
    keys: Arc<Vec<String>>,
    rows: Vec<Vec<Value>>,
}

/// Dynamic lookup key for [`QueryResult::item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKey {
    Column(String),
    Row(isize),
    Slice {
        start: Option<usize>,
        end: Option<usize>,
    },
}

/// What a [`QueryKey`] lookup produced.
#[derive(Debug, Clone)]
pub enum QueryItem<'a> {
    Column(QueryResultCol<'a>),
    Row(QueryResultRow<'a>),
    Slice(QueryResult),
}

impl Default for QueryResult {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryResult {
    /// An empty result, used as an accumulator for `append`/`extend`.
    pub fn new() -> Self {
        Self {
            keys: Arc::new(Vec::new()),
            rows: Vec::new(),
        }
    }

    /// Build a result from row mappings.
    ///
    /// The first row fixes the column ordering. Every other row must have the
    /// same key set (in any order) or construction fails with
    /// [`ComparatorError::SchemaMismatch`]. A key repeated within one row keeps
    /// its last value.
    pub fn from_records<I, R, K, V>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut keys: Vec<String> = Vec::new();
        let mut rows: Vec<Vec<Value>> = Vec::new();

        for (i, record) in records.into_iter().enumerate() {
            let record: Record = record
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect();

            if i == 0 {
                keys = record.keys().cloned().collect();
                rows.push(record.into_values().collect());
                continue;
            }

            let got: Vec<String> = record.keys().cloned().collect();
            match align_record(&keys, record) {
                Some(values) => rows.push(values),
                None => {
                    return Err(ComparatorError::schema_mismatch(format!(
                        "row {i} has keys {got:?}, expected {keys:?}"
                    )))
                }
            }
        }

        Ok(Self {
            keys: Arc::new(keys),
            rows,
        })
    }

    /// Build a result from a driver's column names and positional rows.
    pub fn from_columns(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(ComparatorError::schema_mismatch(format!(
                "row {i} has {} values, expected {} columns",
                row.len(),
                columns.len()
            )));
        }

        let mut seen = std::collections::HashSet::new();
        let unique = columns.iter().all(|c| seen.insert(c.as_str()));
        if !unique {
            // Repeated column names collapse the same way repeated keys do.
            return Self::from_records(
                rows.into_iter()
                    .map(|row| columns.iter().cloned().zip(row).collect::<Vec<_>>()),
            );
        }

        if rows.is_empty() {
            return Ok(Self::new());
        }
        Ok(Self {
            keys: Arc::new(columns),
            rows,
        })
    }

    /// Build a result from a JSON array of objects.
    ///
    /// Anything else fails with [`ComparatorError::InvalidResultType`].
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let serde_json::Value::Array(items) = json else {
            return Err(ComparatorError::invalid_result_type(format!(
                "expected an array of row objects, got {}",
                json_type_name(json)
            )));
        };

        let mut records = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let serde_json::Value::Object(map) = item else {
                return Err(ComparatorError::invalid_result_type(format!(
                    "row {i} is {}, expected an object",
                    json_type_name(item)
                )));
            };
            records.push(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect::<Vec<_>>(),
            );
        }

        Self::from_records(records)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The shared column ordering.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn has_column(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// Row at `index`; negative indices count from the end.
    pub fn row(&self, index: isize) -> Result<QueryResultRow<'_>> {
        let i = resolve_index(index, self.rows.len())?;
        Ok(QueryResultRow::new(&self.keys, &self.rows[i]))
    }

    /// All values of column `key`.
    pub fn column(&self, key: &str) -> Result<QueryResultCol<'_>> {
        self.get(key)
            .ok_or_else(|| ComparatorError::column_not_found(key))
    }

    /// Like [`column`](Self::column), but `None` instead of an error.
    pub fn get(&self, key: &str) -> Option<QueryResultCol<'_>> {
        let index = self.keys.iter().position(|k| k == key)?;
        Some(QueryResultCol::new(&self.keys[index], index, &self.rows))
    }

    /// Every column, in key order.
    pub fn columns(&self) -> impl Iterator<Item = QueryResultCol<'_>> + '_ {
        self.keys
            .iter()
            .enumerate()
            .map(move |(i, key)| QueryResultCol::new(key, i, &self.rows))
    }

    /// A new result over a range of rows. Out-of-range bounds are clamped.
    pub fn slice<R: RangeBounds<usize>>(&self, range: R) -> QueryResult {
        let range = clamp_range(&range, self.rows.len());
        self.with_rows(self.rows[range].to_vec())
    }

    /// Dynamic lookup: a name yields a column, an integer a row, a range a slice.
    pub fn item(&self, key: impl Into<QueryKey>) -> Result<QueryItem<'_>> {
        match key.into() {
            QueryKey::Column(name) => self.column(&name).map(QueryItem::Column),
            QueryKey::Row(index) => self.row(index).map(QueryItem::Row),
            QueryKey::Slice { start, end } => {
                let start = start.map_or(Bound::Unbounded, Bound::Included);
                let end = end.map_or(Bound::Unbounded, Bound::Excluded);
                Ok(QueryItem::Slice(self.slice((start, end))))
            }
        }
    }

    /// First row, or [`ComparatorError::EmptyResult`].
    pub fn first(&self) -> Result<QueryResultRow<'_>> {
        self.rows
            .first()
            .map(|values| QueryResultRow::new(&self.keys, values))
            .ok_or(ComparatorError::EmptyResult)
    }

    pub fn iter(&self) -> Rows<'_> {
        Rows {
            keys: &self.keys,
            inner: self.rows.iter(),
        }
    }

    /// Rows as value tuples, in column order.
    pub fn to_list(&self) -> Vec<Vec<Value>> {
        self.rows.clone()
    }

    /// Column name to all of its values, in column order.
    pub fn to_dict(&self) -> IndexMap<String, Vec<Value>> {
        self.columns()
            .map(|col| (col.key().to_string(), col.to_vec()))
            .collect()
    }

    /// A deep copy of the rows as owned mappings.
    pub fn records(&self) -> Vec<Record> {
        self.iter().map(|row| row.to_record()).collect()
    }

    /// Append one row. An empty result adopts the row's keys; otherwise the
    /// row's key set must match or this fails with [`ComparatorError::KeyMismatch`].
    pub fn append(&mut self, row: QueryResultRow<'_>) -> Result<()> {
        self.append_record(row.to_record())
    }

    pub fn append_record(&mut self, record: Record) -> Result<()> {
        if self.rows.is_empty() {
            self.keys = Arc::new(record.keys().cloned().collect());
            self.rows.push(record.into_values().collect());
            return Ok(());
        }

        let got: Vec<String> = record.keys().cloned().collect();
        let values = align_record(&self.keys, record).ok_or_else(|| {
            ComparatorError::KeyMismatch {
                expected: self.keys.to_vec(),
                got,
            }
        })?;
        self.rows.push(values);
        Ok(())
    }

    /// Append every row of `other`. Either all rows are added or none are.
    pub fn extend(&mut self, other: &QueryResult) -> Result<()> {
        if other.rows.is_empty() {
            return Ok(());
        }
        if self.rows.is_empty() {
            self.keys = Arc::clone(&other.keys);
            self.rows = other.rows.clone();
            return Ok(());
        }
        if self.keys == other.keys {
            self.rows.extend(other.rows.iter().cloned());
            return Ok(());
        }

        let perm = permutation(&self.keys, &other.keys).ok_or_else(|| {
            ComparatorError::KeyMismatch {
                expected: self.keys.to_vec(),
                got: other.keys.to_vec(),
            }
        })?;
        self.rows.extend(
            other
                .rows
                .iter()
                .map(|row| perm.iter().map(|&j| row[j].clone()).collect()),
        );
        Ok(())
    }

    /// Remove and return the row at `index` (default: the last row).
    pub fn pop(&mut self, index: Option<isize>) -> Result<Record> {
        let i = resolve_index(index.unwrap_or(-1), self.rows.len())?;
        let values = self.rows.remove(i);
        let record = self.keys.iter().cloned().zip(values).collect();
        self.forget_keys_if_empty();
        Ok(record)
    }

    /// A new result holding the rows for which `predicate` is true.
    pub fn filter<F>(&self, mut predicate: F) -> QueryResult
    where
        F: FnMut(&QueryResultRow<'_>) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .filter(|values| predicate(&QueryResultRow::new(&self.keys, values)))
            .cloned()
            .collect();
        self.with_rows(rows)
    }

    /// In-place [`filter`](Self::filter).
    pub fn retain<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&QueryResultRow<'_>) -> bool,
    {
        let keys = Arc::clone(&self.keys);
        self.rows
            .retain(|values| predicate(&QueryResultRow::new(&keys, values)));
        self.forget_keys_if_empty();
    }

    /// A result over `rows` sharing this result's keys. No rows means no keys.
    fn with_rows(&self, rows: Vec<Vec<Value>>) -> QueryResult {
        if rows.is_empty() {
            return Self::new();
        }
        Self {
            keys: Arc::clone(&self.keys),
            rows,
        }
    }

    fn forget_keys_if_empty(&mut self) {
        if self.rows.is_empty() && !self.keys.is_empty() {
            self.keys = Arc::new(Vec::new());
        }
    }
}

impl PartialEq for QueryResult {
    fn eq(&self, other: &Self) -> bool {
        if self.rows.len() != other.rows.len() {
            return false;
        }
        if self.rows.is_empty() {
            return true;
        }
        if self.keys == other.keys {
            return self.rows == other.rows;
        }
        match permutation(&self.keys, &other.keys) {
            Some(perm) => self.rows.iter().zip(&other.rows).all(|(a, b)| {
                a.iter()
                    .zip(&perm)
                    .all(|(value, &j)| *value == b[j])
            }),
            None => false,
        }
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, row) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{{")?;
            for (j, (key, value)) in row.items().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "'{key}': {}", value.sql_literal())?;
            }
            write!(f, "}}")?;
        }
        write!(f, "]")
    }
}

/// Iterator over the rows of a [`QueryResult`].
#[derive(Debug, Clone)]
pub struct Rows<'a> {
    keys: &'a [String],
    inner: std::slice::Iter<'a, Vec<Value>>,
}

impl<'a> Iterator for Rows<'a> {
    type Item = QueryResultRow<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let keys = self.keys;
        self.inner.next().map(|values| QueryResultRow::new(keys, values))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for Rows<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let keys = self.keys;
        self.inner
            .next_back()
            .map(|values| QueryResultRow::new(keys, values))
    }
}

impl ExactSizeIterator for Rows<'_> {}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = QueryResultRow<'a>;
    type IntoIter = Rows<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl From<&str> for QueryKey {
    fn from(name: &str) -> Self {
        QueryKey::Column(name.to_string())
    }
}

impl From<String> for QueryKey {
    fn from(name: String) -> Self {
        QueryKey::Column(name)
    }
}

impl From<isize> for QueryKey {
    fn from(index: isize) -> Self {
        QueryKey::Row(index)
    }
}

impl From<i32> for QueryKey {
    fn from(index: i32) -> Self {
        QueryKey::Row(index as isize)
    }
}

impl From<usize> for QueryKey {
    fn from(index: usize) -> Self {
        QueryKey::Row(isize::try_from(index).unwrap_or(isize::MAX))
    }
}

impl From<Range<usize>> for QueryKey {
    fn from(range: Range<usize>) -> Self {
        QueryKey::Slice {
            start: Some(range.start),
            end: Some(range.end),
        }
    }
}

impl From<RangeFrom<usize>> for QueryKey {
    fn from(range: RangeFrom<usize>) -> Self {
        QueryKey::Slice {
            start: Some(range.start),
            end: None,
        }
    }
}

impl From<RangeTo<usize>> for QueryKey {
    fn from(range: RangeTo<usize>) -> Self {
        QueryKey::Slice {
            start: None,
            end: Some(range.end),
        }
    }
}

impl From<RangeFull> for QueryKey {
    fn from(_: RangeFull) -> Self {
        QueryKey::Slice {
            start: None,
            end: None,
        }
    }
}

impl TryFrom<&serde_json::Value> for QueryKey {
    type Error = ComparatorError;

    /// Keys arriving from configuration: strings name columns, integers
    /// select rows. Anything else is [`ComparatorError::InvalidKeyType`].
    fn try_from(json: &serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::String(s) => Ok(QueryKey::Column(s.clone())),
            serde_json::Value::Number(n) => n
                .as_i64()
                .and_then(|i| isize::try_from(i).ok())
                .map(QueryKey::Row)
                .ok_or_else(|| ComparatorError::InvalidKeyType {
                    got: format!("number {n}"),
                }),
            other => Err(ComparatorError::InvalidKeyType {
                got: json_type_name(other).to_string(),
            }),
        }
    }
}

fn json_type_name(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Reorder `record` to `keys`, or `None` if its key set differs.
fn align_record(keys: &[String], mut record: Record) -> Option<Vec<Value>> {
    if record.len() != keys.len() {
        return None;
    }
    keys.iter().map(|k| record.swap_remove(k)).collect()
}

/// For each key in `keys`, its position in `other`; `None` unless both hold
/// the same set of keys.
fn permutation(keys: &[String], other: &[String]) -> Option<Vec<usize>> {
    if keys.len() != other.len() {
        return None;
    }
    let positions: HashMap<&str, usize> = other
        .iter()
        .enumerate()
        .map(|(i, k)| (k.as_str(), i))
        .collect();
    keys.iter().map(|k| positions.get(k.as_str()).copied()).collect()
}

/// Resolve a possibly-negative index against `len`.
pub(crate) fn resolve_index(index: isize, len: usize) -> Result<usize> {
    let resolved = if index < 0 {
        len.checked_sub(index.unsigned_abs())
    } else {
        Some(index.unsigned_abs()).filter(|&i| i < len)
    };
    resolved.ok_or_else(|| ComparatorError::index_out_of_range(index as i64, len))
}

/// Clamp arbitrary range bounds to `0..len`, like a Python slice.
pub(crate) fn clamp_range<R: RangeBounds<usize>>(range: &R, len: usize) -> Range<usize> {
    let start = match range.start_bound() {
        Bound::Included(&s) => s,
        Bound::Excluded(&s) => s.saturating_add(1),
        Bound::Unbounded => 0,
    }
    .min(len);
    let end = match range.end_bound() {
        Bound::Included(&e) => e.saturating_add(1),
        Bound::Excluded(&e) => e,
        Bound::Unbounded => len,
    }
    .min(len);
    start..end.max(start)
}
