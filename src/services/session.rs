//! Reconciliation session: one submission at a time, from file selection to
//! a displayed result.
//!
//! The state lives in a single `SessionState` value changed only through the
//! pure [`SessionState::apply`] transition. [`ReconciliationSession`] drives
//! the async flow (upload, submit, poll, normalize) and publishes every state
//! on a `watch` channel for the host UI.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::models::job::{JobHandle, JobResult};
use crate::models::upload::UploadSelection;
use crate::services::api::{CheckDeltaResponse, DeltaApi};
use crate::services::normalize::NormalizeError;
use crate::services::poller::{JobPoller, PollError, PollSettings};
use crate::services::presenter;
use crate::services::submitter::{JobSubmitter, SubmitError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Transport,
    Processing,
    /// The job never reached a terminal state within the poll budget.
    TimedOut,
    NoData,
}

/// Terminal error of one submission attempt, with its user-facing message.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct SessionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SessionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<SubmitError> for SessionError {
    fn from(err: SubmitError) -> Self {
        let kind = match err {
            SubmitError::Validation(_) => ErrorKind::Validation,
            _ => ErrorKind::Transport,
        };
        SessionError::new(kind, err.to_string())
    }
}

impl From<PollError> for SessionError {
    fn from(err: PollError) -> Self {
        let kind = match err {
            PollError::Processing { .. } => ErrorKind::Processing,
            PollError::TimedOut { .. } => ErrorKind::TimedOut,
            _ => ErrorKind::Transport,
        };
        SessionError::new(kind, err.to_string())
    }
}

impl From<NormalizeError> for SessionError {
    fn from(err: NormalizeError) -> Self {
        let kind = match err {
            NormalizeError::NoData(_) => ErrorKind::NoData,
            NormalizeError::Processing(_) => ErrorKind::Processing,
            NormalizeError::Malformed(_) => ErrorKind::Transport,
        };
        SessionError::new(kind, err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Uploading,
    Polling { job: JobHandle },
    Done { result: JobResult },
    Error { error: SessionError },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Submitted,
    Accepted(JobHandle),
    Completed(JobResult),
    Failed(SessionError),
    Reset,
}

impl SessionState {
    /// Next state for `event`. Events that make no sense in the current
    /// state leave it unchanged.
    ///
    /// `Submitted` is accepted from every state: a new submission replaces
    /// whatever an earlier one was showing, including a job still polling.
    pub fn apply(self, event: SessionEvent) -> SessionState {
        use SessionEvent as E;
        use SessionState as S;

        match (self, event) {
            (_, E::Reset) => S::Idle,
            (_, E::Failed(error)) => S::Error { error },
            (_, E::Submitted) => S::Uploading,
            (S::Uploading, E::Accepted(job)) => S::Polling { job },
            (S::Uploading | S::Polling { .. }, E::Completed(result)) => S::Done { result },
            (state, _) => state,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, SessionState::Uploading | SessionState::Polling { .. })
    }
}

/// Drives submissions for one UI surface. A new `run` supersedes any
/// earlier one: its poll is cancelled and its late updates are dropped.
pub struct ReconciliationSession<A: DeltaApi> {
    id: Uuid,
    submitter: JobSubmitter<A>,
    poller: Arc<JobPoller<A>>,
    generation: AtomicU64,
    state: watch::Sender<SessionState>,
}

impl<A: DeltaApi + 'static> ReconciliationSession<A> {
    pub fn new(api: Arc<A>, delta_threshold: f64, poll: PollSettings) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            id: Uuid::new_v4(),
            submitter: JobSubmitter::new(api.clone(), delta_threshold),
            poller: Arc::new(JobPoller::new(api, poll)),
            generation: AtomicU64::new(0),
            state,
        }
    }

    pub fn from_config(api: Arc<A>, config: &ClientConfig) -> Self {
        Self::new(api, config.delta_threshold, PollSettings::from_config(config))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Cancel any in-flight poll and return to idle.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.poller.cancel();
        self.state.send_modify(|s| *s = s.clone().apply(SessionEvent::Reset));
        tracing::info!(session_id = %self.id, "Session reset");
    }

    /// Submit `selection` and follow it to a terminal state.
    ///
    /// Returns the state this run ended in. A run superseded by a later
    /// `run` or `reset` returns whatever the session holds at that point.
    pub async fn run(&self, selection: &UploadSelection) -> SessionState {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = self.poller.begin();

        self.advance(generation, SessionEvent::Submitted);

        let event = match self.submitter.submit(selection).await {
            Err(e) => SessionEvent::Failed(e.into()),
            Ok(CheckDeltaResponse::Completed(payload)) => finish(&payload),
            Ok(CheckDeltaResponse::Accepted(job)) => {
                if !self.advance(generation, SessionEvent::Accepted(job.clone())) {
                    return self.state();
                }
                match self.poller.run(&job, &cancel).await {
                    Ok(payload) => finish(&payload),
                    Err(PollError::Cancelled) => return self.state(),
                    Err(e) => SessionEvent::Failed(e.into()),
                }
            }
        };

        match &event {
            SessionEvent::Completed(result) => {
                metrics::counter!("delta_jobs_completed_total").increment(1);
                tracing::info!(
                    session_id = %self.id,
                    partner = %selection.partner,
                    rows = result.rows.len(),
                    delta_sum = result.delta_sum,
                    delta_ok = result.delta_ok,
                    "Reconciliation finished"
                );
            }
            SessionEvent::Failed(error) => {
                metrics::counter!("delta_jobs_failed_total").increment(1);
                tracing::error!(
                    session_id = %self.id,
                    partner = %selection.partner,
                    kind = ?error.kind,
                    error = %error.message,
                    "Reconciliation failed"
                );
            }
            _ => {}
        }

        self.advance(generation, event);
        self.state()
    }

    /// Apply `event` if `generation` is still current.
    fn advance(&self, generation: u64, event: SessionEvent) -> bool {
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(session_id = %self.id, "Dropping update from superseded run");
            return false;
        }
        self.state.send_modify(|s| *s = s.clone().apply(event));
        true
    }
}

fn finish(payload: &serde_json::Value) -> SessionEvent {
    match presenter::normalize(payload) {
        Ok(result) => SessionEvent::Completed(result),
        Err(e) => SessionEvent::Failed(e.into()),
    }
}
