use serde::Serialize;
use serde_json::Value;

use crate::models::job::JobResult;
use crate::services::normalize::{self, NormalizeError};

/// Normalize a raw result payload into a `JobResult`.
pub fn normalize(raw: &Value) -> Result<JobResult, NormalizeError> {
    normalize::job_result(raw)
}

/// Display text of one table cell: numbers with two decimals, strings as
/// given, null as empty.
pub fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Number(n) => n
            .as_f64()
            .map(|f| format!("{:.2}", f))
            .unwrap_or_else(|| n.to_string()),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableRow {
    pub cells: Vec<String>,
    /// Invoice price above the expected rate (`Delta > 0`).
    pub highlight: bool,
}

/// Display-ready delta table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl ResultTable {
    /// Columns follow the key order of the first row; later rows missing a
    /// column get an empty cell.
    pub fn from_result(result: &JobResult) -> Self {
        let columns: Vec<String> = result
            .rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();

        let rows = result
            .rows
            .iter()
            .map(|row| TableRow {
                cells: columns
                    .iter()
                    .map(|c| row.get(c).map(format_cell).unwrap_or_default())
                    .collect(),
                highlight: row
                    .get("Delta")
                    .and_then(normalize::as_number)
                    .is_some_and(|d| d > 0.0),
            })
            .collect();

        Self { columns, rows }
    }

    /// Plain-text rendering with padded columns.
    pub fn to_text(&self) -> String {
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                self.rows
                    .iter()
                    .filter_map(|r| r.cells.get(i))
                    .map(|s| s.chars().count())
                    .chain(std::iter::once(c.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |cells: &[String], marker: &str| {
            let body: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
                .collect();
            format!("{} {}", marker, body.join("  ")).trim_end().to_string()
        };

        let mut out = vec![line(&self.columns[..], " ")];
        out.extend(
            self.rows
                .iter()
                .map(|r| line(&r.cells[..], if r.highlight { "+" } else { " " })),
        );
        out.join("\n")
    }
}

/// Summary card of a finished job.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeltaSummary {
    pub total_delta: String,
    pub within_threshold: bool,
    pub status_line: &'static str,
    pub report_url: Option<String>,
}

impl DeltaSummary {
    pub fn from_result(result: &JobResult) -> Self {
        Self {
            total_delta: format!("{:.2}", result.delta_sum),
            within_threshold: result.delta_ok,
            status_line: if result.delta_ok {
                "Within threshold"
            } else {
                "Check discrepancies"
            },
            report_url: result.report_url.clone(),
        }
    }
}
