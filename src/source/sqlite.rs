use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use super::Source;
use crate::error::{ComparatorError, Result};
use crate::result::QueryResult;
use crate::value::Value;

/// A SQLite database.
pub struct SqliteSource {
    name: String,
    conn: Connection,
}

impl SqliteSource {
    /// Open a database file.
    pub fn open(path: &Path, read_only: bool) -> Result<Self> {
        let conn = if read_only {
            if !path.exists() {
                return Err(ComparatorError::invalid_configuration(format!(
                    "database not found: {}",
                    path.display()
                )));
            }
            Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        } else {
            Connection::open(path)?
        };

        Ok(Self {
            name: path.display().to_string(),
            conn,
        })
    }

    /// A private in-memory database.
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

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Source for SqliteSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn query(&self, sql: &str) -> Result<QueryResult> {
        debug!(source = %self.name, sql, "running sqlite query");
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = stmt.query([])?;
        let mut data = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                values.push(sqlite_value(row.get_ref(i)?));
            }
            data.push(values);
        }

        debug!(source = %self.name, rows = data.len(), "sqlite query done");
        QueryResult::from_columns(columns, data)
    }

    fn execute(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

fn sqlite_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Int(n),
        ValueRef::Real(n) => Value::Float(n),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}
