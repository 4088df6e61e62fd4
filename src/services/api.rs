use async_trait::async_trait;
use reqwest::{multipart, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::models::catalog::{AnalyticsSummary, PriceQuery, PriceQuote, PricingMetadata};
use crate::models::job::{JobHandle, JobRequest, UploadKeys};
use crate::models::partner::Partner;
use crate::models::slack::{ReactRequest, SlackMessage};
use crate::models::upload::FileHandle;

const UPLOAD_PATH: &str = "/logistics/upload/";
const CHECK_DELTA_PATH: &str = "/logistics/check-delta/";
const TASK_STATUS_PATH: &str = "/logistics/task-status/";
const TASK_RESULT_PATH: &str = "/logistics/task-result/";
const ANALYTICS_PATH: &str = "/logistics/analytics/";
const PRICING_PATH: &str = "/logistics/pricing/";
const PRICING_METADATA_PATH: &str = "/logistics/pricing/metadata/";
const SLACK_MESSAGES_PATH: &str = "/logistics/slack/messages/";
const SLACK_THREADS_PATH: &str = "/logistics/slack/threads/";
const SLACK_REACT_PATH: &str = "/logistics/slack/react/";

/// Immediate answer of the processing endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckDeltaResponse {
    /// HTTP 202: the job runs in the background.
    Accepted(JobHandle),
    /// Any other success: the raw result payload.
    Completed(Value),
}

/// Backend operations of the job submission protocol.
///
/// Status and result payloads are returned raw; shape normalization lives in
/// `services::normalize`.
#[async_trait]
pub trait DeltaApi: Send + Sync {
    async fn upload(&self, files: &[FileHandle]) -> Result<UploadKeys, ApiError>;

    async fn check_delta(&self, request: &JobRequest) -> Result<CheckDeltaResponse, ApiError>;

    async fn task_status(&self, job: &JobHandle) -> Result<Value, ApiError>;

    async fn task_result(&self, job: &JobHandle) -> Result<Value, ApiError>;
}

/// Backend operations of the Slack channel mirror.
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// Channel messages, with entries lacking a `ts` dropped.
    async fn channel_messages(&self) -> Result<Vec<SlackMessage>, ApiError>;

    async fn thread_replies(&self, thread_ts: &str) -> Result<Vec<SlackMessage>, ApiError>;

    async fn react(&self, ts: &str, reaction: &str) -> Result<(), ApiError>;
}

/// HTTP client for the logistics backend.
pub struct LogisticsClient {
    http: Client,
    base_url: String,
}

impl LogisticsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("logistics-delta-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::new(&config.api_url, config.request_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET /logistics/analytics/
    pub async fn analytics(&self) -> Result<AnalyticsSummary, ApiError> {
        let response = self.http.get(self.url(ANALYTICS_PATH)).send().await?;
        read_json(response).await
    }

    /// GET /logistics/pricing/metadata/?partner=...
    pub async fn pricing_metadata(
        &self,
        partner: Partner,
    ) -> Result<PricingMetadata, ApiError> {
        let response = self
            .http
            .get(self.url(PRICING_METADATA_PATH))
            .query(&[("partner", partner.as_ref())])
            .send()
            .await?;
        read_json(response).await
    }

    /// GET /logistics/pricing/?partner=...&route=...&category=...&weight_class=...
    pub async fn price(&self, query: &PriceQuery) -> Result<PriceQuote, ApiError> {
        garde::Validate::validate(query)?;
        let response = self
            .http
            .get(self.url(PRICING_PATH))
            .query(query)
            .send()
            .await?;
        read_json(response).await
    }

    async fn get_messages(&self, request: reqwest::RequestBuilder) -> Result<Vec<SlackMessage>, ApiError> {
        let entries: Vec<Value> = read_json(request.send().await?).await?;
        Ok(parse_messages(entries))
    }
}

/// Keep the entries that parse as messages and carry a `ts`.
fn parse_messages(entries: Vec<Value>) -> Vec<SlackMessage> {
    let mut messages = Vec::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<SlackMessage>(entry) {
            Ok(message) if !message.ts.is_empty() => messages.push(message),
            Ok(_) => tracing::debug!("Skipping Slack entry without ts"),
            Err(e) => tracing::warn!(error = %e, "Dropping unparseable Slack message"),
        }
    }
    messages
}

#[async_trait]
impl DeltaApi for LogisticsClient {
    /// POST /logistics/upload/, every file in its own `file` part
    async fn upload(&self, files: &[FileHandle]) -> Result<UploadKeys, ApiError> {
        let mut form = multipart::Form::new();
        for file in files {
            let part = multipart::Part::bytes(file.bytes.clone())
                .file_name(file.name.clone())
                .mime_str(&file.mime())?;
            form = form.part("file", part);
        }

        let response = self
            .http
            .post(self.url(UPLOAD_PATH))
            .multipart(form)
            .send()
            .await?;
        read_json(response).await
    }

    /// POST /logistics/check-delta/
    async fn check_delta(&self, request: &JobRequest) -> Result<CheckDeltaResponse, ApiError> {
        let response = self
            .http
            .post(self.url(CHECK_DELTA_PATH))
            .json(request)
            .send()
            .await?;

        if response.status() == StatusCode::ACCEPTED {
            let handle: JobHandle = read_json(response).await?;
            if handle.job_id.is_empty() {
                return Err(ApiError::Malformed("empty task_id in accepted response".into()));
            }
            return Ok(CheckDeltaResponse::Accepted(handle));
        }

        read_json(response).await.map(CheckDeltaResponse::Completed)
    }

    /// GET /logistics/task-status/?task_id=...
    async fn task_status(&self, job: &JobHandle) -> Result<Value, ApiError> {
        let response = self
            .http
            .get(self.url(TASK_STATUS_PATH))
            .query(&[("task_id", job.job_id.as_str())])
            .send()
            .await?;
        read_json(response).await
    }

    /// GET /logistics/task-result/?task_id=...
    async fn task_result(&self, job: &JobHandle) -> Result<Value, ApiError> {
        let response = self
            .http
            .get(self.url(TASK_RESULT_PATH))
            .query(&[("task_id", job.job_id.as_str())])
            .send()
            .await?;
        read_json(response).await
    }
}

#[async_trait]
impl SlackApi for LogisticsClient {
    async fn channel_messages(&self) -> Result<Vec<SlackMessage>, ApiError> {
        self.get_messages(self.http.get(self.url(SLACK_MESSAGES_PATH)))
            .await
    }

    async fn thread_replies(&self, thread_ts: &str) -> Result<Vec<SlackMessage>, ApiError> {
        self.get_messages(
            self.http
                .get(self.url(SLACK_THREADS_PATH))
                .query(&[("thread_ts", thread_ts)]),
        )
        .await
    }

    async fn react(&self, ts: &str, reaction: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url(SLACK_REACT_PATH))
            .json(&ReactRequest { ts, reaction })
            .send()
            .await?;
        ensure_success(response).await.map(|_| ())
    }
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        message: error_message(status, &body),
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let response = ensure_success(response).await?;
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::Malformed(e.to_string()))
}

/// User-facing message for a failed response: the JSON `error` field, then
/// the JSON `detail` field, then the transport-level description.
pub fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let field = |name: &str| {
        parsed
            .as_ref()
            .and_then(|v| v.get(name))
            .and_then(|v| match v {
                Value::Null => None,
                Value::String(s) if s.trim().is_empty() => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
    };

    field("error")
        .or_else(|| field("detail"))
        .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()))
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Malformed response from server: {0}")]
    Malformed(String),

    #[error("Invalid request: {0}")]
    Invalid(#[from] garde::Report),
}
