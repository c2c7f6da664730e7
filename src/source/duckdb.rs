use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveTime};
use duckdb::types::TimeUnit;
use duckdb::Connection;
use tracing::debug;

use super::Source;
use crate::error::{ComparatorError, Result};
use crate::result::QueryResult;
use crate::value::Value;

const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// A DuckDB database.
pub struct DuckDbSource {
    name: String,
    conn: Connection,
}

impl DuckDbSource {
    /// Open a database file.
    pub fn open(path: &Path, read_only: bool) -> Result<Self> {
        let conn = if read_only {
            if !path.exists() {
                return Err(ComparatorError::invalid_configuration(format!(
                    "database not found: {}",
                    path.display()
                )));
            }
            let config = duckdb::Config::default().access_mode(duckdb::AccessMode::ReadOnly)?;
            Connection::open_with_flags(path, config)?
        } else {
            Connection::open(path)?
        };

        Ok(Self {
            name: path.display().to_string(),
            conn,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            name: ":memory:".to_string(),
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Column names of a DuckDB result set. They are only known once the
/// statement has run.
fn extract_column_names(rows: &duckdb::Rows<'_>) -> Vec<String> {
    match rows.as_ref() {
        Some(stmt) => (0..stmt.column_count())
            .map(|i| stmt.column_name(i).map_or("?".to_string(), |s| s.to_string()))
            .collect(),
        None => Vec::new(),
    }
}

impl Source for DuckDbSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn query(&self, sql: &str) -> Result<QueryResult> {
        debug!(source = %self.name, sql, "running duckdb query");
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let columns = extract_column_names(&rows);

        let mut data = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                let value: duckdb::types::Value = row.get(i)?;
                values.push(duckdb_value(value));
            }
            data.push(values);
        }

        debug!(source = %self.name, rows = data.len(), "duckdb query done");
        QueryResult::from_columns(columns, data)
    }

    fn execute(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

fn duckdb_value(value: duckdb::types::Value) -> Value {
    use duckdb::types::Value as Duck;

    match value {
        Duck::Null => Value::Null,
        Duck::Boolean(b) => Value::Bool(b),
        Duck::TinyInt(n) => Value::Int(i64::from(n)),
        Duck::SmallInt(n) => Value::Int(i64::from(n)),
        Duck::Int(n) => Value::Int(i64::from(n)),
        Duck::BigInt(n) => Value::Int(n),
        Duck::HugeInt(n) => i64::try_from(n).map_or_else(|_| Value::Decimal(n.to_string()), Value::Int),
        Duck::UTinyInt(n) => Value::Int(i64::from(n)),
        Duck::USmallInt(n) => Value::Int(i64::from(n)),
        Duck::UInt(n) => Value::Int(i64::from(n)),
        Duck::UBigInt(n) => i64::try_from(n).map_or_else(|_| Value::Decimal(n.to_string()), Value::Int),
        Duck::Float(n) => Value::Float(f64::from(n)),
        Duck::Double(n) => Value::Float(n),
        Duck::Decimal(d) => Value::Decimal(d.to_string()),
        Duck::Text(s) => Value::Text(s),
        Duck::Blob(b) => Value::Bytes(b),
        Duck::Date32(days) => days
            .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .map_or(Value::Null, Value::Date),
        Duck::Timestamp(unit, n) => DateTime::from_timestamp_micros(to_micros(unit, n))
            .map_or(Value::Null, |dt| Value::DateTime(dt.naive_utc())),
        Duck::Time64(unit, n) => {
            let micros = to_micros(unit, n);
            let secs = u32::try_from(micros.div_euclid(1_000_000)).unwrap_or(u32::MAX);
            let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).unwrap_or(0);
            NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos).map_or(Value::Null, Value::Time)
        }
        other => Value::Text(format!("{other:?}")),
    }
}
