//! Read-only projection of one result column.

use std::fmt;
use std::ops::RangeBounds;

use super::clamp_range;
use crate::value::Value;

/// All values of one column of a [`QueryResult`](super::QueryResult), in row order.
#[derive(Debug, Clone, Copy)]
pub struct QueryResultCol<'a> {
    key: &'a str,
    index: usize,
    rows: &'a [Vec<Value>],
}

impl<'a> QueryResultCol<'a> {
    pub(crate) fn new(key: &'a str, index: usize, rows: &'a [Vec<Value>]) -> Self {
        Self { key, index, rows }
    }

    pub fn key(&self) -> &'a str {
        self.key
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value at row `index`; negative indices count from the end.
    pub fn get(&self, index: isize) -> Option<&'a Value> {
        let i = super::resolve_index(index, self.rows.len()).ok()?;
        self.rows[i].get(self.index)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &'a Value> + ExactSizeIterator + 'a {
        let index = self.index;
        self.rows.iter().map(move |row| &row[index])
    }

    /// The same column over a range of rows.
    pub fn slice<R: RangeBounds<usize>>(&self, range: R) -> QueryResultCol<'a> {
        let range = clamp_range(&range, self.rows.len());
        Self {
            rows: &self.rows[range],
            ..*self
        }
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.iter().cloned().collect()
    }

    /// The column as a parenthesized SQL list, e.g. `(1, 4)` or `('a', 'b')`,
    /// suitable for `IN` clauses.
    pub fn sql_literal(&self) -> String {
        let rendered: Vec<String> = self.iter().map(Value::sql_literal).collect();
        format!("({})", rendered.join(", "))
    }
}

impl<'a> IntoIterator for QueryResultCol<'a> {
    type Item = &'a Value;
    type IntoIter = Box<dyn DoubleEndedIterator<Item = &'a Value> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl PartialEq for QueryResultCol<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl PartialEq<[Value]> for QueryResultCol<'_> {
    fn eq(&self, other: &[Value]) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl PartialEq<Vec<Value>> for QueryResultCol<'_> {
    fn eq(&self, other: &Vec<Value>) -> bool {
        *self == other[..]
    }
}

impl fmt::Display for QueryResultCol<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql_literal())
    }
}

#[cfg(test)]
mod tests {
    use crate::{QueryResult, Value};

    fn result() -> QueryResult {
        QueryResult::from_records(vec![
            vec![("a", Value::Int(1)), ("b", Value::from("one"))],
            vec![("a", Value::Int(4)), ("b", Value::from("four"))],
            vec![("a", Value::Int(7)), ("b", Value::from("seven"))],
        ])
        .unwrap()
    }

    #[test]
    fn test_column_rendering() {
        let qr = result();
        assert_eq!(qr.column("a").unwrap().to_string(), "(1, 4, 7)");
        assert_eq!(
            qr.column("b").unwrap().to_string(),
            "('one', 'four', 'seven')"
        );
        assert_eq!(qr.column("a").unwrap().slice(..1).to_string(), "(1)");
        assert_eq!(qr.column("a").unwrap().slice(3..).to_string(), "()");
    }

    #[test]
    fn test_column_access_and_iteration() {
        let qr = result();
        let col = qr.column("a").unwrap();
        assert_eq!(col.key(), "a");
        assert_eq!(col.len(), 3);
        assert_eq!(col.get(-1), Some(&Value::Int(7)));
        assert_eq!(col.get(3), None);
        assert_eq!(col.iter().count(), 3);
        // restartable
        assert_eq!(col.iter().count(), 3);
        assert_eq!(col, vec![Value::Int(1), Value::Int(4), Value::Int(7)]);
        assert_eq!(col.slice(1..).to_vec(), vec![Value::Int(4), Value::Int(7)]);

        let total: i64 = col.into_iter().filter_map(Value::as_i64).sum();
        assert_eq!(total, 12);
    }
}
