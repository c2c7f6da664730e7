//! Text rendering for query results and comparison outcomes.
//!
//! Everything here returns a `String` so the CLI decides where it goes.

use crate::compare::ComparatorResult;
use crate::error::Result;
use crate::result::QueryResult;

/// Cells wider than this are cut and suffixed with `...`.
pub const MAX_COLUMN_WIDTH: usize = 50;

const NO_RESULTS: &str = "(no results)";

/// Render `rows` as an aligned, `|`-separated table under `headers`.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return format!("{NO_RESULTS}\n");
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, val) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(val.chars().count());
            }
        }
    }

    for w in &mut widths {
        *w = (*w).min(MAX_COLUMN_WIDTH);
    }

    let mut out = String::new();
    let header_line: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths.get(i).copied().unwrap_or(10)))
        .collect();
    out.push_str(header_line.join(" | ").trim_end());
    out.push('\n');

    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&sep.join("-+-"));
    out.push('\n');

    for row in rows {
        let row_line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let width = widths.get(i).copied().unwrap_or(10);
                format!("{:width$}", truncate(v, width))
            })
            .collect();
        out.push_str(row_line.join(" | ").trim_end());
        out.push('\n');
    }
    out
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() > width && width > 3 {
        let kept: String = value.chars().take(width.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        value.to_string()
    }
}

fn cells(result: &QueryResult) -> Vec<Vec<String>> {
    result
        .iter()
        .map(|row| row.values().iter().map(ToString::to_string).collect())
        .collect()
}

/// A query result as a table.
pub fn result_table(result: &QueryResult) -> String {
    render_table(result.keys(), &cells(result))
}

/// A query result as CSV with a header line.
pub fn result_csv(result: &QueryResult) -> String {
    let mut out = String::new();
    let header: Vec<String> = result.keys().iter().map(|k| csv_field(k)).collect();
    out.push_str(&header.join(","));
    out.push('\n');
    for row in cells(result) {
        let line: Vec<String> = row.iter().map(|v| csv_field(v)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// A query result as pretty-printed JSON rows.
pub fn result_json(result: &QueryResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(&result.to_json_value()?)?)
}

/// Outcomes as a table: comparator, predicate, raw result, pass/fail.
pub fn outcomes_table(outcomes: &[ComparatorResult]) -> String {
    let headers: Vec<String> = ["comparison", "check", "result", "status"]
        .into_iter()
        .map(String::from)
        .collect();
    let rows: Vec<Vec<String>> = outcomes
        .iter()
        .map(|outcome| {
            vec![
                outcome.comparator_name().unwrap_or("").to_string(),
                outcome.name().to_string(),
                outcome.result().to_string(),
                status(outcome).to_string(),
            ]
        })
        .collect();
    render_table(&headers, &rows)
}

/// Outcomes as CSV with the same columns as [`outcomes_table`].
pub fn outcomes_csv(outcomes: &[ComparatorResult]) -> String {
    let mut out = String::from("comparison,check,result,status\n");
    for outcome in outcomes {
        let line = [
            csv_field(outcome.comparator_name().unwrap_or("")),
            csv_field(outcome.name()),
            csv_field(&outcome.result().to_string()),
            status(outcome).to_string(),
        ];
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

/// Outcomes as pretty-printed JSON, one object per outcome.
pub fn outcomes_json(outcomes: &[ComparatorResult]) -> Result<String> {
    let items = outcomes
        .iter()
        .map(|outcome| {
            Ok(serde_json::json!({
                "comparison": outcome.comparator_name(),
                "check": outcome.name(),
                "result": outcome.result().to_json()?,
                "passed": outcome.is_truthy(),
            }))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(serde_json::to_string_pretty(&items)?)
}

/// One-line tally, e.g. `3 checks, 1 failed`.
pub fn summary(outcomes: &[ComparatorResult]) -> String {
    let failed = outcomes.iter().filter(|o| !o.is_truthy()).count();
    let noun = if outcomes.len() == 1 { "check" } else { "checks" };
    format!("{} {noun}, {failed} failed", outcomes.len())
}

fn status(outcome: &ComparatorResult) -> &'static str {
    if outcome.is_truthy() {
        "ok"
    } else {
        "FAILED"
    }
}
