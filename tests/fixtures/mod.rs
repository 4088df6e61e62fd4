//! Backend payloads and invoice files used across the end-to-end tests

use serde_json::{json, Value};

use logistics_delta_client::models::upload::FileHandle;

pub fn invoice_pdf() -> FileHandle {
    FileHandle::new("invoice.pdf", b"%PDF-1.4 test invoice".to_vec())
}

pub fn invoice_lines() -> FileHandle {
    FileHandle::new("lines.xlsx", b"PK\x03\x04 test workbook".to_vec())
}

/// Minimal successful result, as returned by the task-result endpoint.
pub fn single_row_result() -> Value {
    json!({
        "delta_sum": 42.5,
        "delta_ok": true,
        "data": [{ "Delta": 1.2 }]
    })
}

/// Result wrapped the way Celery reports it, with a report link.
pub fn wrapped_table_result() -> Value {
    json!({
        "task_id": "abc",
        "status": "SUCCESS",
        "result": {
            "delta_sum": 18.0,
            "delta_ok": false,
            "sheet_url": "https://docs.example.com/sheet/1",
            "table_data": [
                { "Order": "A-1", "Invoice": 120, "Expected": 100, "Delta": 20 },
                { "Order": "A-2", "Invoice": 98, "Expected": 100, "Delta": -2 }
            ]
        }
    })
}

pub fn channel_messages() -> Value {
    json!([
        {
            "ts": "1718000000.000100",
            "user_name": "ops",
            "text": "Brenger invoice for May",
            "reply_count": 2,
            "files": [{ "id": "F1", "name": "may.pdf", "mimetype": "application/pdf" }],
            "reactions": [{ "name": "eyes", "count": 1, "me": false }]
        },
        { "text": "entry without a timestamp" },
        {
            "ts": "1718000500.000200",
            "user_name": "finance",
            "text": "Libero rates updated"
        }
    ])
}

pub fn thread_replies() -> Value {
    json!([
        { "ts": "1718000000.000100", "text": "Brenger invoice for May", "reply_count": 2 },
        { "ts": "1718000100.000100", "text": "Delta looks fine", "thread_ts": "1718000000.000100" },
        { "ts": "1718000200.000100", "text": "Approved", "thread_ts": "1718000000.000100" }
    ])
}
