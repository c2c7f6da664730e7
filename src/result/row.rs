//! Read-only projection of one result row.

use std::fmt;
use std::ops::Index;

use super::{resolve_index, Record};
use crate::error::{ComparatorError, Result};
use crate::value::Value;

/// One row of a [`QueryResult`](super::QueryResult), addressable by column
/// name or position.
#[derive(Debug, Clone, Copy)]
pub struct QueryResultRow<'a> {
    keys: &'a [String],
    values: &'a [Value],
}

impl<'a> QueryResultRow<'a> {
    pub(crate) fn new(keys: &'a [String], values: &'a [Value]) -> Self {
        Self { keys, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> &'a [String] {
        self.keys
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    /// `(column, value)` pairs in column order.
    pub fn items(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        self.keys
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Value of column `key`, or `None` if there is no such column.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        let i = self.keys.iter().position(|k| k == key)?;
        self.values.get(i)
    }

    /// Value of column `key`, or [`ComparatorError::ColumnNotFound`].
    pub fn by_name(&self, key: &str) -> Result<&'a Value> {
        self.get(key)
            .ok_or_else(|| ComparatorError::column_not_found(key))
    }

    /// Value at position `index`; negative indices count from the end.
    pub fn value(&self, index: isize) -> Result<&'a Value> {
        let i = resolve_index(index, self.values.len())?;
        Ok(&self.values[i])
    }

    pub fn to_record(&self) -> Record {
        self.keys
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }
}

impl PartialEq for QueryResultRow<'_> {
    /// Rows are equal when they map the same keys to equal values.
    fn eq(&self, other: &Self) -> bool {
        if self.keys == other.keys {
            return self.values == other.values;
        }
        self.len() == other.len()
            && self
                .items()
                .all(|(key, value)| other.get(key).is_some_and(|v| v == value))
    }
}

/// Panics if the column does not exist; use [`QueryResultRow::get`] to avoid that.
impl Index<&str> for QueryResultRow<'_> {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        match self.get(key) {
            Some(value) => value,
            None => panic!("column not found: {key:?}"),
        }
    }
}

impl Index<usize> for QueryResultRow<'_> {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.values[index]
    }
}

impl fmt::Display for QueryResultRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.values.iter().map(Value::sql_literal).collect();
        write!(f, "({})", rendered.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QueryResult;
    use chrono::NaiveDate;

    fn result() -> QueryResult {
        QueryResult::from_records(vec![vec![
            ("a", Value::Int(1)),
            ("b", Value::Decimal("2".into())),
            ("c", Value::Date(NaiveDate::from_ymd_opt(2018, 8, 1).unwrap())),
        ]])
        .unwrap()
    }

    #[test]
    fn test_keyed_and_positional_access() {
        let qr = result();
        let row = qr.row(0).unwrap();

        assert!(!row.is_empty());
        assert_eq!(row["a"], Value::Int(1));
        assert_eq!(row[0], Value::Int(1));
        assert_eq!(row.value(-1).unwrap(), &Value::Date(NaiveDate::from_ymd_opt(2018, 8, 1).unwrap()));
        assert_eq!(row.by_name("b").unwrap(), &Value::Int(2));
        assert!(matches!(
            row.by_name("d"),
            Err(ComparatorError::ColumnNotFound { .. })
        ));
        assert!(row.value(3).is_err());
        assert_eq!(row.get("d"), None);
    }

    #[test]
    fn test_keys_values_items() {
        let qr = result();
        let row = qr.first().unwrap();
        assert_eq!(row.keys(), ["a", "b", "c"]);
        assert_eq!(row.values().len(), 3);
        let items: Vec<(&str, &Value)> = row.items().collect();
        assert_eq!(items[0], ("a", &Value::Int(1)));
        assert_eq!(row.to_record().keys().collect::<Vec<_>>(), ["a", "b", "c"]);
    }

    #[test]
    fn test_display_as_tuple() {
        let qr = result();
        assert_eq!(qr.first().unwrap().to_string(), "(1, 2, '2018-08-01')");
    }

    #[test]
    fn test_equality_is_by_mapping() {
        let a = QueryResult::from_records(vec![vec![("a", 1), ("b", 2)]]).unwrap();
        let b = QueryResult::from_records(vec![vec![("b", 2), ("a", 1)]]).unwrap();
        assert_eq!(a.first().unwrap(), b.first().unwrap());

        let c = QueryResult::from_records(vec![vec![("a", 1), ("c", 2)]]).unwrap();
        assert_ne!(a.first().unwrap(), c.first().unwrap());
    }
}
