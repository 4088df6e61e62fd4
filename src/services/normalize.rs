//! Adapter from the backend's response variants to the canonical job types.
//!
//! Observed variants handled here and nowhere else:
//! - status under `status` (`"pending"`, `"success"`, ...) or under `state`
//!   (Celery names: `"SUCCESS"`, `"FAILURE"`, `"REVOKED"`, ...)
//! - result rows under `data` or `table_data`, optionally wrapped in a
//!   `result` object
//! - report link under `sheet_url` or `report_url`

use serde_json::Value;

use crate::models::job::{JobResult, JobStatus, ResultRow};

/// Shown when a finished job carries neither rows nor a message.
pub const NO_DATA_MESSAGE: &str = "No data returned.";

const ROW_KEYS: [&str; 2] = ["data", "table_data"];

/// Canonical status of a `task-status` payload.
pub fn job_status(payload: &Value) -> Result<JobStatus, NormalizeError> {
    let raw = payload
        .get("status")
        .and_then(Value::as_str)
        .or_else(|| payload.get("state").and_then(Value::as_str))
        .ok_or_else(|| NormalizeError::Malformed("status payload has no status or state".into()))?;

    let status = match raw.trim().to_ascii_lowercase().as_str() {
        "pending" | "received" | "started" | "retry" | "progress" | "processing" | "queued" => {
            JobStatus::Pending
        }
        "success" | "succeeded" | "completed" => JobStatus::Success,
        "failure" | "failed" | "error" => JobStatus::Failure,
        "revoked" | "cancelled" | "canceled" => JobStatus::Cancelled,
        other => {
            tracing::warn!(status = %other, "Unknown job status, treating as pending");
            JobStatus::Pending
        }
    };
    Ok(status)
}

/// Failure explanation carried by a status payload, if any.
pub fn failure_detail(payload: &Value) -> Option<String> {
    ["error", "result", "message"]
        .iter()
        .filter_map(|key| payload.get(*key))
        .find_map(|v| v.as_str().map(str::trim).filter(|s| !s.is_empty()))
        .map(str::to_string)
}

/// Canonical result of a `task-result` (or synchronous `check-delta`) payload.
///
/// A payload without rows is never an empty success: it becomes
/// `Processing` when the backend reports an error, `NoData` otherwise.
pub fn job_result(payload: &Value) -> Result<JobResult, NormalizeError> {
    let body = unwrap_result(payload)
        .as_object()
        .ok_or_else(|| NormalizeError::Malformed("result payload is not an object".into()))?;

    let rows: Vec<ResultRow> = ROW_KEYS
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_array))
        .find(|rows| !rows.is_empty())
        .map(|rows| rows.iter().filter_map(|r| r.as_object().cloned()).collect())
        .unwrap_or_default();

    let text = |key: &str| {
        body.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    if rows.is_empty() {
        if let Some(error) = text("error") {
            return Err(NormalizeError::Processing(error));
        }
        return Err(NormalizeError::NoData(
            text("message").unwrap_or_else(|| NO_DATA_MESSAGE.to_string()),
        ));
    }

    let delta_sum = body
        .get("delta_sum")
        .and_then(as_number)
        .unwrap_or_else(|| rows.iter().filter_map(|r| r.get("Delta").and_then(as_number)).sum());

    Ok(JobResult {
        delta_sum,
        delta_ok: body.get("delta_ok").and_then(Value::as_bool).unwrap_or(false),
        rows,
        report_url: text("sheet_url").or_else(|| text("report_url")),
        message: text("message"),
    })
}

/// Numbers and numeric-looking strings as `f64`.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn unwrap_result(payload: &Value) -> &Value {
    let has_rows = ROW_KEYS.iter().any(|k| payload.get(*k).is_some());
    match payload.get("result") {
        Some(inner @ Value::Object(_)) if !has_rows => inner,
        _ => payload,
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizeError {
    #[error("{0}")]
    NoData(String),

    #[error("{0}")]
    Processing(String),

    #[error("Malformed response from server: {0}")]
    Malformed(String),
}
