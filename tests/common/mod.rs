//! Common test utilities for comparator integration tests.

use std::fs;
use std::path::PathBuf;

use rusqlite::Connection;
use tempfile::TempDir;

/// Orders table shared by both fixture databases. The replica is missing
/// order 5 and has a different total for order 3.
const SCHEMA: &str = "CREATE TABLE orders (id INTEGER PRIMARY KEY, customer TEXT, total REAL);";

const WAREHOUSE_ROWS: &str = "INSERT INTO orders VALUES
    (1, 'ada', 10.5), (2, 'bob', 20.0), (3, 'cy', 7.25), (4, 'dee', 3.0), (5, 'eve', 99.0);";

const REPLICA_ROWS: &str = "INSERT INTO orders VALUES
    (1, 'ada', 10.5), (2, 'bob', 20.0), (3, 'cy', 8.0), (4, 'dee', 3.0);";

/// Two SQLite databases and a source config describing them.
pub struct Fixture {
    pub dir: TempDir,
    pub config: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");

        for (file, rows) in [("warehouse.db", WAREHOUSE_ROWS), ("replica.db", REPLICA_ROWS)] {
            let conn = Connection::open(dir.path().join(file)).expect("Failed to create db");
            conn.execute_batch(SCHEMA).expect("Failed to create schema");
            conn.execute_batch(rows).expect("Failed to insert rows");
        }

        let config = dir.path().join("config.yaml");
        fs::write(
            &config,
            "- name: Warehouse\n  path: warehouse.db\n  read_only: true\n\
             - name: replica\n  path: replica.db\n  read_only: true\n",
        )
        .expect("Failed to write config");

        Self { dir, config }
    }

    /// Write a plan file into the fixture directory and return its path.
    #[allow(dead_code)]
    pub fn plan(&self, yaml: &str) -> PathBuf {
        let path = self.dir.path().join("plan.yaml");
        fs::write(&path, yaml).expect("Failed to write plan");
        path
    }
}
