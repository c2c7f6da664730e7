//! Integration tests for the comparator CLI.

mod common;

use std::process::{Command, Output};

use common::Fixture;

/// Run comparator with the given arguments, returning the full Output.
fn run_comparator(fixture: &Fixture, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_comparator"))
        .arg("--config")
        .arg(&fixture.config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run comparator")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_sources_lists_cleaned_names() {
    let fixture = Fixture::new();
    let output = run_comparator(&fixture, &["sources"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let out = stdout(&output);
    assert!(out.lines().next().unwrap().starts_with("name"));
    assert!(out.contains("warehouse"));
    assert!(out.contains("replica"));
}

#[test]
fn test_query_table_and_csv() {
    let fixture = Fixture::new();

    let output = run_comparator(
        &fixture,
        &["query", "--source", "warehouse", "--sql", "SELECT id, customer FROM orders WHERE id < 3 ORDER BY id"],
    );
    assert!(output.status.success());
    let lines: Vec<String> = stdout(&output).lines().map(String::from).collect();
    assert_eq!(lines, ["id | customer", "---+---------", "1  | ada", "2  | bob"]);

    let output = run_comparator(
        &fixture,
        &["query", "-s", "replica", "-q", "SELECT id FROM orders WHERE id > 3", "-f", "csv"],
    );
    assert!(output.status.success());
    assert_eq!(stdout(&output), "id\n4\n");
}

#[test]
fn test_query_json_and_parquet() {
    let fixture = Fixture::new();
    let parquet = fixture.dir.path().join("out.parquet");

    let output = run_comparator(
        &fixture,
        &[
            "query",
            "--source",
            "warehouse",
            "--sql",
            "SELECT id, total FROM orders WHERE id = 1",
            "--format",
            "json",
            "--parquet",
            parquet.to_str().unwrap(),
        ],
    );
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json, serde_json::json!([{"id": 1, "total": 10.5}]));
    assert!(parquet.exists());
}

#[test]
fn test_query_unknown_source_fails() {
    let fixture = Fixture::new();
    let output = run_comparator(&fixture, &["query", "-s", "nope", "-q", "SELECT 1"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nope"));
}

#[test]
fn test_run_plan_exit_status() {
    let fixture = Fixture::new();

    let passing = fixture.plan(
        "left: warehouse\nright: replica\ncomparisons:\n  - name: first order\n    lquery: SELECT id FROM orders ORDER BY id\n",
    );
    let output = run_comparator(&fixture, &["run", "--plan", passing.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("first order"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("1 check, 0 failed"));

    let failing = fixture.plan(
        "left: warehouse\nright: replica\ndefault_comp: len\ncomparisons:\n  - lquery: SELECT id FROM orders\n",
    );
    let output = run_comparator(&fixture, &["run", "--plan", failing.to_str().unwrap(), "--format", "json"]);
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json[0]["check"], "len_comp");
    assert_eq!(json[0]["passed"], false);
}

#[test]
fn test_run_plan_csv() {
    let fixture = Fixture::new();
    let plan = fixture.plan(
        "left: warehouse\nright: replica\ncomparisons:\n  - name: first order\n    lquery: SELECT id FROM orders ORDER BY id\n",
    );
    let output = run_comparator(&fixture, &["run", "--plan", plan.to_str().unwrap(), "--format", "csv"]);
    assert!(output.status.success());
    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, ["comparison,check,result,status", "first order,first_eq_comp,true,ok"]);
}
