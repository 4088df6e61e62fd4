pub mod api;
pub mod collector;
pub mod normalize;
pub mod poller;
pub mod presenter;
pub mod reactions;
pub mod session;
pub mod slack;
pub mod submitter;

/// In-memory stand-in for the backend, scripted per test.
#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use super::api::{ApiError, CheckDeltaResponse, DeltaApi, SlackApi};
    use crate::models::job::{JobHandle, JobRequest, UploadKeys};
    use crate::models::slack::SlackMessage;
    use crate::models::upload::FileHandle;

    pub enum Step {
        Reply(Value),
        Fail,
    }

    #[derive(Default)]
    pub struct ScriptedApi {
        pub upload_keys: Mutex<Option<UploadKeys>>,
        pub check_response: Mutex<Option<CheckDeltaResponse>>,
        pub statuses: Mutex<VecDeque<Step>>,
        pub result: Mutex<Option<Value>>,
        pub messages: Mutex<Vec<SlackMessage>>,
        pub threads: Mutex<HashMap<String, Vec<SlackMessage>>>,
        pub react_fails: bool,
        /// How long each status query takes to resolve.
        pub status_delay: Duration,

        pub uploads: AtomicUsize,
        pub checks: AtomicUsize,
        pub status_calls: AtomicUsize,
        pub result_calls: AtomicUsize,
        pub thread_calls: AtomicUsize,
        pub statuses_in_flight: AtomicUsize,
        pub max_statuses_in_flight: AtomicUsize,
        pub requests: Mutex<Vec<JobRequest>>,
        pub reactions: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedApi {
        pub fn with_statuses(statuses: &[&str]) -> Self {
            let api = Self::default();
            *api.statuses.lock().unwrap() = statuses
                .iter()
                .map(|s| Step::Reply(json!({ "status": s })))
                .collect();
            api
        }

        pub fn push(&self, step: Step) {
            self.statuses.lock().unwrap().push_back(step);
        }

        pub fn count(counter: &AtomicUsize) -> usize {
            counter.load(Ordering::SeqCst)
        }

        fn unavailable() -> ApiError {
            ApiError::Status {
                status: 503,
                message: "Request failed with status code 503".into(),
            }
        }
    }

    /// Decrements on drop, so a query abandoned mid-flight is still counted out.
    struct InFlight<'a>(&'a AtomicUsize);

    impl Drop for InFlight<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl DeltaApi for ScriptedApi {
        async fn upload(&self, _files: &[FileHandle]) -> Result<UploadKeys, ApiError> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            self.upload_keys
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(Self::unavailable)
        }

        async fn check_delta(&self, request: &JobRequest) -> Result<CheckDeltaResponse, ApiError> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            self.check_response
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(Self::unavailable)
        }

        async fn task_status(&self, _job: &JobHandle) -> Result<Value, ApiError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            let in_flight = self.statuses_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_statuses_in_flight.fetch_max(in_flight, Ordering::SeqCst);
            let _done = InFlight(&self.statuses_in_flight);
            if !self.status_delay.is_zero() {
                tokio::time::sleep(self.status_delay).await;
            }
            match self.statuses.lock().unwrap().pop_front() {
                Some(Step::Reply(value)) => Ok(value),
                Some(Step::Fail) => Err(Self::unavailable()),
                None => Ok(json!({ "status": "pending" })),
            }
        }

        async fn task_result(&self, _job: &JobHandle) -> Result<Value, ApiError> {
            self.result_calls.fetch_add(1, Ordering::SeqCst);
            self.result.lock().unwrap().clone().ok_or_else(Self::unavailable)
        }
    }

    #[async_trait]
    impl SlackApi for ScriptedApi {
        async fn channel_messages(&self) -> Result<Vec<SlackMessage>, ApiError> {
            Ok(self.messages.lock().unwrap().clone())
        }

        async fn thread_replies(&self, thread_ts: &str) -> Result<Vec<SlackMessage>, ApiError> {
            self.thread_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .threads
                .lock()
                .unwrap()
                .get(thread_ts)
                .cloned()
                .unwrap_or_default())
        }

        async fn react(&self, ts: &str, reaction: &str) -> Result<(), ApiError> {
            self.reactions
                .lock()
                .unwrap()
                .push((ts.to_string(), reaction.to_string()));
            if self.react_fails {
                Err(Self::unavailable())
            } else {
                Ok(())
            }
        }
    }
}
