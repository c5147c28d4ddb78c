//! Local fake of the task API for client tests.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use url::Url;

use crate::{Credentials, GenieClient, GenieConfig, RetryConfig, TaskMode};

/// Functions the fake runs as long jobs writing to an output file.
const JOB_FUNCTIONS: &[&str] = &[
    "extract_text",
    "segment_text",
    "convert_pdf_to_markdown",
    "filter_pages_pipeline",
    "structure_quants_pipeline",
];

#[derive(Default)]
struct FakeState {
    payloads: Mutex<Vec<Value>>,
    files: Mutex<BTreeMap<String, Value>>,
    requests: AtomicUsize,
    fail_remaining: AtomicUsize,
    fail_status: AtomicU16,
}

pub(crate) struct FakeApi {
    addr: SocketAddr,
    state: Arc<FakeState>,
}

impl FakeApi {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        let router = Router::new()
            .route("/execute", post(execute))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

        Self { addr, state }
    }

    pub fn url(&self) -> Url {
        format!("http://{}/execute", self.addr).parse().unwrap()
    }

    pub fn client(&self, task_mode: TaskMode) -> GenieClient {
        self.client_with_retry(task_mode, RetryConfig::new(5, Duration::from_millis(10)))
    }

    pub fn client_with_retry(&self, task_mode: TaskMode, retry: RetryConfig) -> GenieClient {
        let config = GenieConfig::new(self.url())
            .with_task_mode(task_mode)
            .with_retry(retry);
        GenieClient::with_credentials(config, Credentials::new("test-key", "tester")).unwrap()
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.state.payloads.lock().unwrap().clone()
    }

    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self, count: usize, status: u16) {
        self.state.fail_status.store(status, Ordering::SeqCst);
        self.state.fail_remaining.store(count, Ordering::SeqCst);
    }

    pub fn put_file(&self, path: &str, data: Value) {
        self.state.files.lock().unwrap().insert(path.to_owned(), data);
    }
}

pub(crate) fn output_file_for(doc_name: &str, func: &str) -> String {
    format!(
        "gs://db-genie/entity_type=url/entity={doc_name}/data_type=semi-structured/format=csv/\
         variable_desc={func}/source=layout-genie/{doc_name}.csv"
    )
}

async fn execute(
    State(state): State<Arc<FakeState>>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.requests.fetch_add(1, Ordering::SeqCst);

    let failing = state
        .fail_remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        let status = StatusCode::from_u16(state.fail_status.load(Ordering::SeqCst))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, Json(json!({"error": "injected failure"})));
    }

    state.payloads.lock().unwrap().push(payload.clone());

    let task = &payload["tasks"]["task_1"];
    let func = task["func"].as_str().unwrap_or_default();
    let args = &task["args"];
    let sync = task["task_mode"] == "sync";
    let arg = |name: &str| args[name].as_str().unwrap_or_default().to_owned();

    let data = match func {
        "slugify" => json!(slugify(&arg("text"))),
        "check_file_exists" => json!(state.files.lock().unwrap().contains_key(&arg("file"))),
        "read_file" => state
            .files
            .lock()
            .unwrap()
            .get(&arg("file"))
            .cloned()
            .unwrap_or(Value::Null),
        "list_doc_files" => {
            let doc_name = arg("doc_name");
            let files = state.files.lock().unwrap();
            json!(files.keys().filter(|f| f.contains(&doc_name)).collect::<Vec<_>>())
        }
        f if JOB_FUNCTIONS.contains(&f) && !sync => {
            let output_file = output_file_for(&arg("doc_name"), func);
            return (
                StatusCode::OK,
                Json(json!({
                    "response": {
                        "task_1": {
                            "status": "scheduled",
                            "data": null,
                            "task": {"output_file": output_file, "start_time": 1695986266.5},
                        }
                    }
                })),
            );
        }
        f if JOB_FUNCTIONS.contains(&f) => json!([]),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": format!("unknown function {func}")})),
            );
        }
    };

    (
        StatusCode::OK,
        Json(json!({
            "response": {
                "task_1": {
                    "status": "task_completed",
                    "data": {"data": data},
                    "task": {"start_time": 1695986266.5},
                }
            }
        })),
    )
}

fn slugify(text: &str) -> String {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
