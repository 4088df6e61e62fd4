//! In-process mock of the logistics backend for end-to-end tests
//!
//! Serves the real HTTP contract on an ephemeral port. Each test scripts the
//! responses it needs and inspects the recorded requests afterwards.

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use logistics_delta_client::{app_state::AppState, config::ClientConfig};

type Params = Query<HashMap<String, String>>;

/// Scripted responses plus a log of everything the client sent.
pub struct BackendState {
    pub upload_response: Mutex<Value>,
    pub check_response: Mutex<(StatusCode, Value)>,
    /// Status payloads served in order; once drained every query is pending.
    pub statuses: Mutex<VecDeque<Value>>,
    pub result: Mutex<Value>,
    pub messages: Mutex<Value>,
    pub threads: Mutex<HashMap<String, Value>>,
    pub analytics: Mutex<Value>,
    pub pricing_metadata: Mutex<Value>,
    pub price: Mutex<Value>,

    pub requests: AtomicUsize,
    pub uploads: AtomicUsize,
    pub checks: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub result_calls: AtomicUsize,
    pub thread_calls: AtomicUsize,
    pub uploaded_parts: Mutex<Vec<(String, String)>>,
    pub check_bodies: Mutex<Vec<Value>>,
    pub polled_task_ids: Mutex<Vec<String>>,
    pub reactions: Mutex<Vec<Value>>,
    pub queries: Mutex<Vec<HashMap<String, String>>>,
}

impl BackendState {
    pub fn new() -> Self {
        Self {
            upload_response: Mutex::new(json!({ "redis_key": "k1" })),
            check_response: Mutex::new((StatusCode::ACCEPTED, json!({ "task_id": "abc" }))),
            statuses: Mutex::new(VecDeque::new()),
            result: Mutex::new(Value::Null),
            messages: Mutex::new(json!([])),
            threads: Mutex::new(HashMap::new()),
            analytics: Mutex::new(json!({})),
            pricing_metadata: Mutex::new(json!({})),
            price: Mutex::new(json!({ "price": 0.0 })),
            requests: AtomicUsize::new(0),
            uploads: AtomicUsize::new(0),
            checks: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            result_calls: AtomicUsize::new(0),
            thread_calls: AtomicUsize::new(0),
            uploaded_parts: Mutex::new(Vec::new()),
            check_bodies: Mutex::new(Vec::new()),
            polled_task_ids: Mutex::new(Vec::new()),
            reactions: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_statuses(self, statuses: Vec<Value>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn with_result(self, result: Value) -> Self {
        *self.result.lock().unwrap() = result;
        self
    }

    pub fn with_check_response(self, status: StatusCode, body: Value) -> Self {
        *self.check_response.lock().unwrap() = (status, body);
        self
    }

    pub fn with_upload_response(self, body: Value) -> Self {
        *self.upload_response.lock().unwrap() = body;
        self
    }
}

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<BackendState>,
}

impl MockBackend {
    /// Start the mock on 127.0.0.1 with an OS-assigned port.
    pub async fn spawn(state: BackendState) -> Self {
        let state = Arc::new(state);
        let app = Router::new()
            .route("/logistics/upload/", post(upload))
            .route("/logistics/check-delta/", post(check_delta))
            .route("/logistics/task-status/", get(task_status))
            .route("/logistics/task-result/", get(task_result))
            .route("/logistics/slack/messages/", get(slack_messages))
            .route("/logistics/slack/threads/", get(slack_thread))
            .route("/logistics/slack/react/", post(slack_react))
            .route("/logistics/analytics/", get(analytics))
            .route("/logistics/pricing/", get(price))
            .route("/logistics/pricing/metadata/", get(pricing_metadata))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("Mock backend has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Mock backend error");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// Client configuration pointed at this mock, with a fast poll.
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::with_api_url(&self.base_url);
        config.poll_interval_ms = 10;
        config.max_poll_attempts = 100;
        config.request_timeout_secs = 5;
        config
    }

    pub fn app_state(&self) -> AppState {
        AppState::from_config(self.config()).expect("Failed to build client")
    }
}

async fn upload(State(s): State<Arc<BackendState>>, mut multipart: Multipart) -> impl IntoResponse {
    s.requests.fetch_add(1, Ordering::SeqCst);
    s.uploads.fetch_add(1, Ordering::SeqCst);
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let _ = field.bytes().await.unwrap();
        s.uploaded_parts.lock().unwrap().push((name, file_name));
    }
    Json(s.upload_response.lock().unwrap().clone())
}

async fn check_delta(State(s): State<Arc<BackendState>>, Json(body): Json<Value>) -> impl IntoResponse {
    s.requests.fetch_add(1, Ordering::SeqCst);
    s.checks.fetch_add(1, Ordering::SeqCst);
    s.check_bodies.lock().unwrap().push(body);
    let (status, body) = s.check_response.lock().unwrap().clone();
    (status, Json(body))
}

async fn task_status(State(s): State<Arc<BackendState>>, Query(q): Params) -> impl IntoResponse {
    s.requests.fetch_add(1, Ordering::SeqCst);
    s.status_calls.fetch_add(1, Ordering::SeqCst);
    s.polled_task_ids
        .lock()
        .unwrap()
        .push(q.get("task_id").cloned().unwrap_or_default());
    let next = s.statuses.lock().unwrap().pop_front();
    Json(next.unwrap_or_else(|| json!({ "status": "PENDING" })))
}

async fn task_result(State(s): State<Arc<BackendState>>, Query(_): Params) -> impl IntoResponse {
    s.requests.fetch_add(1, Ordering::SeqCst);
    s.result_calls.fetch_add(1, Ordering::SeqCst);
    Json(s.result.lock().unwrap().clone())
}

async fn slack_messages(State(s): State<Arc<BackendState>>) -> impl IntoResponse {
    s.requests.fetch_add(1, Ordering::SeqCst);
    Json(s.messages.lock().unwrap().clone())
}

async fn slack_thread(State(s): State<Arc<BackendState>>, Query(q): Params) -> impl IntoResponse {
    s.requests.fetch_add(1, Ordering::SeqCst);
    s.thread_calls.fetch_add(1, Ordering::SeqCst);
    let ts = q.get("thread_ts").cloned().unwrap_or_default();
    Json(s.threads.lock().unwrap().get(&ts).cloned().unwrap_or_else(|| json!([])))
}

async fn slack_react(State(s): State<Arc<BackendState>>, Json(body): Json<Value>) -> impl IntoResponse {
    s.requests.fetch_add(1, Ordering::SeqCst);
    s.reactions.lock().unwrap().push(body);
    Json(json!({ "ok": true }))
}

async fn analytics(State(s): State<Arc<BackendState>>) -> impl IntoResponse {
    s.requests.fetch_add(1, Ordering::SeqCst);
    Json(s.analytics.lock().unwrap().clone())
}

async fn pricing_metadata(State(s): State<Arc<BackendState>>, Query(q): Params) -> impl IntoResponse {
    s.requests.fetch_add(1, Ordering::SeqCst);
    s.queries.lock().unwrap().push(q);
    Json(s.pricing_metadata.lock().unwrap().clone())
}

async fn price(State(s): State<Arc<BackendState>>, Query(q): Params) -> impl IntoResponse {
    s.requests.fetch_add(1, Ordering::SeqCst);
    s.queries.lock().unwrap().push(q);
    Json(s.price.lock().unwrap().clone())
}
