//! In-process mock of the Octro backend for integration tests.
//!
//! Serves the endpoints the client consumes on an ephemeral port and
//! records enough about each call for tests to assert on (call counts,
//! query parameters, request bodies).

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use octro_client::Config;

/// Canned reply for a configurable endpoint
#[derive(Clone)]
pub enum Reply {
    Ok(Value),
    Err(u16, Value),
}

impl Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Ok(body) => Json(body).into_response(),
            Reply::Err(status, body) => (
                StatusCode::from_u16(status).expect("valid status"),
                Json(body),
            )
                .into_response(),
        }
    }
}

pub struct MockState {
    pub upload_calls: AtomicUsize,
    pub process_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub ask_calls: AtomicUsize,
    pub me_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub last_pages_limit: Mutex<Option<String>>,
    pub last_output_format: Mutex<Option<String>>,
    pub last_process_filename: Mutex<Option<String>>,
    pub last_ask_table_len: Mutex<Option<usize>>,
    pub upload_response: Mutex<Reply>,
    pub process_response: Mutex<Reply>,
    pub authenticated: AtomicBool,
    pub logout_fails: AtomicBool,
    pub api_keys: Mutex<Vec<Value>>,
    pub next_key_id: AtomicI64,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            upload_calls: AtomicUsize::new(0),
            process_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            ask_calls: AtomicUsize::new(0),
            me_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            last_pages_limit: Mutex::new(None),
            last_output_format: Mutex::new(None),
            last_process_filename: Mutex::new(None),
            last_ask_table_len: Mutex::new(None),
            upload_response: Mutex::new(Reply::Ok(json!({
                "pdf_id": 1,
                "pages_total": 50,
                "pages_processed": 20,
                "limit_left": 20,
            }))),
            process_response: Mutex::new(Reply::Ok(default_process_result())),
            authenticated: AtomicBool::new(true),
            logout_fails: AtomicBool::new(false),
            api_keys: Mutex::new(Vec::new()),
            next_key_id: AtomicI64::new(1),
        }
    }
}

/// Three tables: 0 and 2 carry JSON artifacts, 1 is image-only.
pub fn default_process_result() -> Value {
    json!({
        "tables": [
            {"image_file": "t0.png", "json_file": "t0.json", "csv_file": "t0.csv"},
            {"image_file": "t1.png"},
            {"image_file": "t2.png", "json_file": "t2.json"},
        ],
        "total_tables": 3,
    })
}

pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockBackend {
    pub async fn spawn() -> Self {
        let state = Arc::new(MockState::default());
        let app = router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve mock backend");
        });
        Self { addr, state, handle }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointed at this backend, with short timeouts
    /// and a fast poll so tests stay quick.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.api.base_url = self.base_url();
        config.api.timeout_secs = 5;
        config.api.process_timeout_secs = 5;
        config.api.promo_timeout_secs = 1;
        config.workflow.poll_interval_ms = 25;
        config
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Write a minimal PDF into `dir` and return its path.
pub fn sample_pdf(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("report.pdf");
    std::fs::write(&path, b"%PDF-1.4\n1 0 obj\n<< >>\nendobj\ntrailer\n<< >>\n%%EOF\n")
        .expect("write sample pdf");
    path
}

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
        .route("/auth/api-keys", get(list_keys).post(create_key))
        .route("/auth/api-keys/:id", delete(revoke_key))
        .route("/upload_pdf", post(upload))
        .route("/process/:filename", get(process))
        .route("/process_status", get(process_status))
        .route("/download/:filename", get(download))
        .route("/ask", post(ask))
        .route("/promo/validate", post(validate_promo))
        .route("/stripe/subscription-status", get(subscription_status))
        .route("/stripe/create-checkout-session", post(checkout))
        .route("/stripe/create-portal-session", post(portal))
        .route("/stripe/cancel-subscription", post(cancel_subscription))
        .with_state(state)
}

async fn me(State(state): State<Arc<MockState>>) -> Response {
    state.me_calls.fetch_add(1, Ordering::SeqCst);
    if state.authenticated.load(Ordering::SeqCst) {
        Json(json!({
            "id": 7,
            "name": "Ada",
            "email": "ada@example.com",
            "pages_processed_this_month": 10,
            "monthly_page_limit": 30,
        }))
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Not authenticated"})),
        )
            .into_response()
    }
}

async fn logout(State(state): State<Arc<MockState>>) -> Response {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    if state.logout_fails.load(Ordering::SeqCst) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "session backend down"})),
        )
            .into_response()
    } else {
        Json(json!({})).into_response()
    }
}

async fn list_keys(State(state): State<Arc<MockState>>) -> Response {
    Json(state.api_keys.lock().unwrap().clone()).into_response()
}

async fn create_key(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let id = state.next_key_id.fetch_add(1, Ordering::SeqCst);
    let key = json!({
        "id": id,
        "name": params.get("name").cloned().unwrap_or_default(),
        "api_key": format!("oct_{id:08}"),
        "is_active": true,
        "created_at": "2025-06-01T12:00:00Z",
        "requests_made_this_month": 0,
        "monthly_request_limit": 1000,
    });
    state.api_keys.lock().unwrap().push(key.clone());
    Json(key).into_response()
}

async fn revoke_key(State(state): State<Arc<MockState>>, Path(id): Path<i64>) -> Response {
    let mut keys = state.api_keys.lock().unwrap();
    let before = keys.len();
    keys.retain(|key| key["id"].as_i64() != Some(id));
    if keys.len() == before {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "API key not found"})),
        )
            .into_response()
    } else {
        Json(json!({})).into_response()
    }
}

async fn upload(State(state): State<Arc<MockState>>, mut multipart: Multipart) -> Response {
    state.upload_calls.fetch_add(1, Ordering::SeqCst);
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        let _ = field.bytes().await.expect("field bytes");
    }
    state.upload_response.lock().unwrap().clone().into_response()
}

async fn process(
    State(state): State<Arc<MockState>>,
    Path(filename): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.process_calls.fetch_add(1, Ordering::SeqCst);
    *state.last_process_filename.lock().unwrap() = Some(filename);
    *state.last_pages_limit.lock().unwrap() = params.get("pages_limit").cloned();
    *state.last_output_format.lock().unwrap() = params.get("output_format").cloned();

    // Give the status poll a window to fire at least once.
    tokio::time::sleep(Duration::from_millis(100)).await;
    state.process_response.lock().unwrap().clone().into_response()
}

async fn process_status(
    State(state): State<Arc<MockState>>,
    Query(_params): Query<HashMap<String, String>>,
) -> Response {
    state.status_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({"status": "running"})).into_response()
}

async fn download(Path(filename): Path<String>) -> Response {
    match filename.as_str() {
        "t0.json" => Json(json!([{"item": "first"}, {"item": "second"}])).into_response(),
        // An object, not an array: exercises the ask-endpoint coercion.
        "t2.json" => Json(json!({"item": "only"})).into_response(),
        name if name.ends_with(".json") => Json(json!([])).into_response(),
        _ => (StatusCode::OK, b"binary-artifact".to_vec()).into_response(),
    }
}

async fn ask(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.ask_calls.fetch_add(1, Ordering::SeqCst);
    let rows = body["table"].as_array().map(|rows| rows.len());
    *state.last_ask_table_len.lock().unwrap() = rows;
    let question = body["question"].as_str().unwrap_or_default();
    Json(json!({"answer": format!("answer to: {question}")})).into_response()
}

async fn validate_promo(Json(body): Json<Value>) -> Response {
    match body["code"].as_str().unwrap_or_default() {
        "SLOW" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({"success": true, "message": "finally"})).into_response()
        }
        "OCTRO30" => Json(json!({
            "success": true,
            "message": "Promo applied: unlimited pages this month",
        }))
        .into_response(),
        _ => Json(json!({"success": false, "message": "Invalid promo code"})).into_response(),
    }
}

async fn subscription_status() -> Response {
    Json(json!({
        "has_subscription": false,
        "plan_type": "free",
        "status": "inactive",
        "monthly_page_limit": 30,
    }))
    .into_response()
}

async fn checkout(Json(body): Json<Value>) -> Response {
    let plan = body["plan_type"].as_str().unwrap_or_default();
    if plan != "standard" && plan != "pro" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Invalid plan type"})),
        )
            .into_response();
    }
    Json(json!({
        "checkout_url": format!("https://checkout.example.com/{plan}"),
        "session_id": "cs_test_123",
    }))
    .into_response()
}

async fn portal() -> Response {
    Json(json!({"portal_url": "https://portal.example.com/session"})).into_response()
}

async fn cancel_subscription() -> Response {
    Json(json!({"message": "Subscription will be cancelled at the end of the current period"}))
        .into_response()
}
