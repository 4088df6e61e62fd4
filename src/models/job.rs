use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::models::partner::Partner;

/// One row of the delta table, column name to scalar, in payload order.
pub type ResultRow = serde_json::Map<String, serde_json::Value>;

/// Body of `POST /logistics/upload/`. Which keys appear depends on the
/// mix of uploaded file kinds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UploadKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_key_pdf: Option<String>,
}

/// Opaque references to uploaded content held by the backend cache.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentHandle {
    pub primary_key: String,
    pub secondary_key: Option<String>,
}

impl ContentHandle {
    /// Build a handle from the upload response. A lone PDF key is promoted
    /// to primary because the processing endpoint requires `redis_key`.
    pub fn from_upload(keys: UploadKeys) -> Option<Self> {
        let non_empty = |k: Option<String>| k.filter(|k| !k.trim().is_empty());
        match (non_empty(keys.redis_key), non_empty(keys.redis_key_pdf)) {
            (Some(primary), secondary) => Some(Self {
                primary_key: primary,
                secondary_key: secondary,
            }),
            (None, Some(pdf)) => Some(Self {
                primary_key: pdf,
                secondary_key: None,
            }),
            (None, None) => None,
        }
    }
}

/// Body of `POST /logistics/check-delta/`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct JobRequest {
    #[garde(skip)]
    pub partner: Partner,

    #[garde(length(min = 1))]
    pub redis_key: String,

    #[garde(length(min = 1))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_key_pdf: Option<String>,

    #[garde(range(min = 0.0))]
    pub delta_threshold: f64,
}

impl JobRequest {
    pub fn new(partner: Partner, handle: ContentHandle, delta_threshold: f64) -> Self {
        Self {
            partner,
            redis_key: handle.primary_key,
            redis_key_pdf: handle.secondary_key,
            delta_threshold,
        }
    }
}

/// Identifier of an asynchronous backend job, returned with HTTP 202.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    #[serde(rename = "task_id")]
    pub job_id: String,
}

impl JobHandle {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
        }
    }
}

/// Canonical job status after normalizing the backend's spellings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Success,
    Failure,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

/// Final output of a reconciliation job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobResult {
    pub delta_sum: f64,
    pub delta_ok: bool,
    pub rows: Vec<ResultRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
