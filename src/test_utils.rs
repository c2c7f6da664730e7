//! Shared test utilities.
//!
//! [`MockSource`] answers every query with a canned result and records what it
//! was asked, so tests can assert on query text and call counts.

use std::cell::{Cell, RefCell};
use std::io;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use crate::error::{ComparatorError, Result};
use crate::result::QueryResult;
use crate::source::Source;
use crate::value::Value;

pub struct MockSource {
    name: String,
    result: QueryResult,
    calls: Cell<usize>,
    queries: RefCell<Vec<String>>,
    fail: bool,
}

impl MockSource {
    pub fn new(name: &str, result: QueryResult) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            result,
            calls: Cell::new(0),
            queries: RefCell::new(Vec::new()),
            fail: false,
        })
    }

    /// A source whose every query fails.
    pub fn failing(name: &str) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            result: QueryResult::new(),
            calls: Cell::new(0),
            queries: RefCell::new(Vec::new()),
            fail: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }
}

impl Source for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn query(&self, sql: &str) -> Result<QueryResult> {
        self.calls.set(self.calls.get() + 1);
        self.queries.borrow_mut().push(sql.to_string());
        if self.fail {
            return Err(ComparatorError::Source(anyhow::anyhow!(
                "{} is unavailable",
                self.name
            )));
        }
        Ok(self.result.clone())
    }
}

/// A result with integer columns `a`, `b`, `c` built from row tuples.
///
/// # Panics
///
/// Panics if the rows cannot form a result. Test code only.
pub fn abc_result(rows: &[(i64, i64, i64)]) -> QueryResult {
    QueryResult::from_records(rows.iter().map(|&(a, b, c)| {
        vec![
            ("a", Value::Int(a)),
            ("b", Value::Int(b)),
            ("c", Value::Int(c)),
        ]
    }))
    .expect("Failed to build test result")
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber and return what it logged at
/// `warn` and above.
pub fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();

    let value = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (value, logs)
}
