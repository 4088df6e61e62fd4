use garde::Validate;
use std::sync::Arc;

use crate::models::job::{ContentHandle, JobRequest};
use crate::models::upload::UploadSelection;
use crate::services::api::{ApiError, CheckDeltaResponse, DeltaApi};
use crate::services::collector::{self, ValidationError};

/// Uploads a selection and starts its processing job.
pub struct JobSubmitter<A: DeltaApi> {
    api: Arc<A>,
    delta_threshold: f64,
}

impl<A: DeltaApi> JobSubmitter<A> {
    pub fn new(api: Arc<A>, delta_threshold: f64) -> Self {
        Self {
            api,
            delta_threshold,
        }
    }

    /// Upload, then request processing. The processing request is only sent
    /// once the upload yielded a content handle. No retries.
    pub async fn submit(&self, selection: &UploadSelection) -> Result<CheckDeltaResponse, SubmitError> {
        collector::validate(selection)?;

        tracing::info!(
            partner = %selection.partner,
            files = selection.files.len(),
            "Uploading invoice files"
        );
        let keys = self.api.upload(&selection.files).await?;
        let handle = ContentHandle::from_upload(keys).ok_or(SubmitError::MissingContentHandle)?;

        let request = JobRequest::new(selection.partner, handle, self.delta_threshold);
        request.validate()?;

        tracing::debug!(
            partner = %request.partner,
            has_secondary = request.redis_key_pdf.is_some(),
            "Requesting delta check"
        );
        let response = self.api.check_delta(&request).await?;
        metrics::counter!("delta_jobs_submitted_total").increment(1);

        match &response {
            CheckDeltaResponse::Accepted(job) => {
                tracing::info!(job_id = %job.job_id, "Delta check accepted for background processing")
            }
            CheckDeltaResponse::Completed(_) => {
                tracing::info!(partner = %request.partner, "Delta check answered synchronously")
            }
        }
        Ok(response)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Upload did not return a file reference. Please try again.")]
    MissingContentHandle,

    #[error("Invalid processing request: {0}")]
    InvalidRequest(#[from] garde::Report),
}
