use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::models::job::{JobHandle, JobStatus};
use crate::services::api::{ApiError, DeltaApi};
use crate::services::normalize::{self, NormalizeError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSettings {
    /// Delay between the end of one status query and the start of the next.
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollSettings {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            max_attempts: config.max_poll_attempts,
        }
    }
}

/// Polls one background job at a time until it reaches a terminal state.
///
/// Polling is fixed-delay: the next status query is scheduled only after
/// the previous one resolved, so queries never overlap.
pub struct JobPoller<A: DeltaApi> {
    api: Arc<A>,
    settings: PollSettings,
    live: Mutex<Option<CancellationToken>>,
}

impl<A: DeltaApi + 'static> JobPoller<A> {
    pub fn new(api: Arc<A>, settings: PollSettings) -> Self {
        Self {
            api,
            settings,
            live: Mutex::new(None),
        }
    }

    /// Cancel the live poll, if any, and register a token for a new one.
    pub fn begin(&self) -> CancellationToken {
        let mut live = self.live.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = live.take() {
            previous.cancel();
        }
        let token = CancellationToken::new();
        *live = Some(token.clone());
        token
    }

    /// Stop the live poll, if any.
    pub fn cancel(&self) {
        let mut live = self.live.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = live.take() {
            token.cancel();
        }
    }

    /// Poll `job` until it finishes and return the raw result payload.
    ///
    /// Transport errors end polling at once. Cancellation is observed both
    /// while waiting and while a query is in flight.
    pub async fn run(&self, job: &JobHandle, cancel: &CancellationToken) -> Result<Value, PollError> {
        let mut attempts = 0u32;

        loop {
            if attempts >= self.settings.max_attempts {
                tracing::warn!(job_id = %job.job_id, attempts, "Job still processing, giving up");
                metrics::histogram!("delta_job_poll_attempts").record(attempts as f64);
                return Err(PollError::TimedOut { attempts });
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                _ = tokio::time::sleep(self.settings.interval) => {}
            }

            attempts += 1;
            let payload = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                status = self.api.task_status(job) => status.map_err(PollError::Transport)?,
            };

            let status = normalize::job_status(&payload)?;
            tracing::debug!(job_id = %job.job_id, attempt = attempts, status = %status, "Polled job status");

            if !status.is_terminal() {
                continue;
            }
            metrics::histogram!("delta_job_poll_attempts").record(attempts as f64);

            match status {
                JobStatus::Success => {
                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(PollError::Cancelled),
                        result = self.api.task_result(job) => result.map_err(PollError::Transport)?,
                    };
                    tracing::info!(job_id = %job.job_id, attempts, "Job finished");
                    return Ok(result);
                }
                _ => {
                    let detail = normalize::failure_detail(&payload);
                    tracing::error!(job_id = %job.job_id, status = %status, detail = ?detail, "Job did not succeed");
                    return Err(PollError::Processing { status, detail });
                }
            }
        }
    }

    /// Poll in the background, reporting through exactly one of the two
    /// callbacks unless cancelled first. Starting a new poll cancels the
    /// previous one.
    pub fn poll<R, E>(self: &Arc<Self>, job: JobHandle, on_result: R, on_error: E) -> PollToken
    where
        R: FnOnce(Value) + Send + 'static,
        E: FnOnce(PollError) + Send + 'static,
    {
        let token = self.begin();
        let poller = Arc::clone(self);
        let task_token = token.clone();

        tokio::spawn(async move {
            match poller.run(&job, &task_token).await {
                Ok(payload) => on_result(payload),
                Err(PollError::Cancelled) => {
                    tracing::debug!(job_id = %job.job_id, "Polling cancelled")
                }
                Err(e) => on_error(e),
            }
        });

        PollToken { token }
    }
}

/// Handle to a background poll. Cancels the poll when dropped.
#[must_use = "dropping a PollToken cancels the poll"]
#[derive(Debug)]
pub struct PollToken {
    token: CancellationToken,
}

impl PollToken {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for PollToken {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn processing_message(status: &JobStatus, detail: &Option<String>) -> String {
    let base = match status {
        JobStatus::Cancelled => "Processing was cancelled on the server.",
        _ => "Processing failed on the server.",
    };
    match detail {
        Some(detail) => format!("{base} {detail}"),
        None => base.to_string(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error(transparent)]
    Transport(ApiError),

    #[error("{}", processing_message(.status, .detail))]
    Processing {
        status: JobStatus,
        detail: Option<String>,
    },

    #[error("The job is still processing after {attempts} status checks. Please check again later.")]
    TimedOut { attempts: u32 },

    #[error("Malformed response from server: {0}")]
    Malformed(String),

    #[error("Polling was cancelled")]
    Cancelled,
}

impl From<NormalizeError> for PollError {
    fn from(err: NormalizeError) -> Self {
        PollError::Malformed(err.to_string())
    }
}
