//! In-process mock of the document-parsing service, plus wiring helpers.
//!
//! The mock binds an axum router to an ephemeral localhost port, keeps
//! its collections in memory, and records every request it receives so
//! tests can assert on outgoing headers. Failure modes (forced statuses,
//! upload delays, credential revocation) are switchable per test.

#![allow(dead_code)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use docparse_client::config::ClientConfig;
use docparse_client::session::{MemoryCredentialStore, Navigator};
use docparse_client::ClientCore;

/// Page count the preview endpoint reports for every document.
pub const PAGE_COUNT: u32 = 5;

/// The one account the mock accepts: alice / secret.
pub const VALID_AUTH_HEADER: &str = "Basic YWxpY2U6c2VjcmV0";
/// Token delivered through the csrftoken cookie.
pub const CSRF_TOKEN: &str = "testcsrf123";

// ═══════════════════════════════════════════════════════════
// Recorded traffic
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub csrf: Option<String>,
}

// ═══════════════════════════════════════════════════════════
// Service state
// ═══════════════════════════════════════════════════════════

#[derive(Default)]
pub struct ServiceState {
    pub valid_credentials: Mutex<HashSet<String>>,
    pub items: Mutex<Vec<Value>>,
    pub documents: Mutex<Vec<Value>>,
    pub schemas: Mutex<Vec<Value>>,
    pub parsed_results: Mutex<Vec<Value>>,
    pub next_id: AtomicI64,
    pub requests: Mutex<Vec<RecordedRequest>>,
    /// Forced status for `GET /items/` (guard/auth probe failures).
    pub items_status: Mutex<Option<u16>>,
    /// Forced response for `POST /documents/parse/`.
    pub parse_failure: Mutex<Option<(u16, Value)>>,
    /// Forced response for `POST /documents/` (uploads).
    pub upload_failure: Mutex<Option<(u16, Value)>>,
    /// Artificial delay before the upload endpoint responds.
    pub upload_delay: Mutex<Option<Duration>>,
}

impl ServiceState {
    fn new() -> Arc<Self> {
        let state = Self::default();
        state
            .valid_credentials
            .lock()
            .unwrap()
            .insert(VALID_AUTH_HEADER.to_string());
        state.next_id.store(1, Ordering::SeqCst);
        Arc::new(state)
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Revoke every credential: held tokens start failing with 401.
    pub fn revoke_credentials(&self) {
        self.valid_credentials.lock().unwrap().clear();
    }

    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn clear_recorded(&self) {
        self.requests.lock().unwrap().clear();
    }

    /// Requests for a path, in arrival order.
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.recorded()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub fn seed_document(&self, id: i64, name: &str) {
        self.documents.lock().unwrap().push(json!({
            "id": id,
            "file": format!("/media/documents/{name}"),
            "name": name,
            "schema_type": "resume",
            "uploaded_at": chrono::Utc::now().to_rfc3339(),
        }));
    }

    pub fn seed_schema(&self, id: i64, name: &str) {
        self.schemas.lock().unwrap().push(json!({
            "id": id,
            "name": name,
            "description": "",
            "schema_json": {"fields": []},
            "created_at": chrono::Utc::now().to_rfc3339(),
            "updated_at": chrono::Utc::now().to_rfc3339(),
        }));
    }
}

// ═══════════════════════════════════════════════════════════
// Mock service lifecycle
// ═══════════════════════════════════════════════════════════

pub struct MockService {
    pub base_url: String,
    pub state: Arc<ServiceState>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockService {
    /// Bind the mock on an ephemeral localhost port and serve it in a
    /// background task.
    pub async fn spawn() -> Self {
        let state = ServiceState::new();
        let app = router(state.clone());

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("mock service should bind");
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let shutdown_signal = async move {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal)
                .await
            {
                eprintln!("mock service error: {e}");
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            shutdown: Some(shutdown_tx),
        }
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Router and handlers
// ═══════════════════════════════════════════════════════════

fn router(state: Arc<ServiceState>) -> Router {
    Router::new()
        .route("/", get(api_root))
        .route("/csrf/", get(csrf_token))
        .route("/items/", get(list_items).post(create_item))
        .route(
            "/items/:id/",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/documents/", get(list_documents).post(upload_document))
        .route("/documents/parse/", post(parse_document))
        .route("/documents/:id/", get(get_document).delete(delete_document))
        .route("/documents/:id/preview/:page/", get(preview_document))
        .route("/parsed-results/", get(list_parsed_results))
        .route("/parsed-results/:id/", get(get_parsed_result))
        .route("/schemas/", get(list_schemas).post(create_schema))
        .route("/schemas/example/", get(example_schema))
        .route(
            "/schemas/:id/",
            get(get_schema).put(update_schema).delete(delete_schema),
        )
        .route("/schemas/:id/test/", post(test_schema))
        .layer(middleware::from_fn_with_state(state.clone(), record_request))
        .with_state(state)
}

async fn record_request(
    State(state): State<Arc<ServiceState>>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let record = RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        authorization: header_string(request.headers(), AUTHORIZATION.as_str()),
        csrf: header_string(request.headers(), "X-CSRFToken"),
    };
    state.requests.lock().unwrap().push(record);
    next.run(request).await
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn require_auth(state: &ServiceState, headers: &HeaderMap) -> Result<(), Response> {
    let authorized = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| state.valid_credentials.lock().unwrap().contains(v));
    if authorized {
        Ok(())
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid username/password."})),
        )
            .into_response())
    }
}

fn find_by_id(records: &[Value], id: i64) -> Option<Value> {
    records
        .iter()
        .find(|r| r["id"].as_i64() == Some(id))
        .cloned()
}

// ── Root + CSRF ──────────────────────────────────────────

async fn api_root(State(state): State<Arc<ServiceState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = require_auth(&state, &headers) {
        return resp;
    }
    Json(json!({
        "message": "Welcome to the API",
        "status": "API is working correctly",
    }))
    .into_response()
}

async fn csrf_token() -> Response {
    (
        [(SET_COOKIE, format!("csrftoken={CSRF_TOKEN}; Path=/"))],
        Json(json!({"detail": "CSRF cookie set"})),
    )
        .into_response()
}

// ── Items ────────────────────────────────────────────────

async fn list_items(State(state): State<Arc<ServiceState>>, headers: HeaderMap) -> Response {
    if let Some(status) = *state.items_status.lock().unwrap() {
        return (
            StatusCode::from_u16(status).unwrap(),
            Json(json!({"detail": "forced failure"})),
        )
            .into_response();
    }
    if let Err(resp) = require_auth(&state, &headers) {
        return resp;
    }
    Json(state.items.lock().unwrap().clone()).into_response()
}

async fn create_item(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = require_auth(&state, &headers) {
        return resp;
    }
    let now = chrono::Utc::now().to_rfc3339();
    let item = json!({
        "id": state.allocate_id(),
        "name": body["name"],
        "description": body["description"],
        "created_at": now,
        "updated_at": now,
    });
    state.items.lock().unwrap().push(item.clone());
    (StatusCode::CREATED, Json(item)).into_response()
}

async fn get_item(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(resp) = require_auth(&state, &headers) {
        return resp;
    }
    match find_by_id(&state.items.lock().unwrap(), id) {
        Some(item) => Json(item).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response(),
    }
}

async fn update_item(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = require_auth(&state, &headers) {
        return resp;
    }
    let mut items = state.items.lock().unwrap();
    match items.iter_mut().find(|i| i["id"].as_i64() == Some(id)) {
        Some(item) => {
            item["name"] = body["name"].clone();
            item["description"] = body["description"].clone();
            item["updated_at"] = json!(chrono::Utc::now().to_rfc3339());
            Json(item.clone()).into_response()
        }
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response(),
    }
}

async fn delete_item(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(resp) = require_auth(&state, &headers) {
        return resp;
    }
    state
        .items
        .lock()
        .unwrap()
        .retain(|i| i["id"].as_i64() != Some(id));
    StatusCode::NO_CONTENT.into_response()
}

// ── Documents ────────────────────────────────────────────

async fn list_documents(State(state): State<Arc<ServiceState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = require_auth(&state, &headers) {
        return resp;
    }
    Json(state.documents.lock().unwrap().clone()).into_response()
}

async fn upload_document(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if let Err(resp) = require_auth(&state, &headers) {
        return resp;
    }
    let delay = *state.upload_delay.lock().unwrap();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if let Some((status, body)) = state.upload_failure.lock().unwrap().clone() {
        return (StatusCode::from_u16(status).unwrap(), Json(body)).into_response();
    }

    let mut file_name = None;
    let mut name = None;
    let mut schema_type = None;
    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        match field.name().unwrap_or_default() {
            "file" => {
                file_name = field.file_name().map(str::to_string);
                let _ = field.bytes().await;
            }
            "name" => name = field.text().await.ok(),
            "schema_type" => schema_type = field.text().await.ok(),
            _ => {}
        }
    }

    let Some(file_name) = file_name else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"file": ["No file was submitted."]})),
        )
            .into_response();
    };

    let document = json!({
        "id": state.allocate_id(),
        "file": format!("/media/documents/{file_name}"),
        "name": name.unwrap_or_else(|| file_name.clone()),
        "schema_type": schema_type.unwrap_or_else(|| "resume".to_string()),
        "uploaded_at": chrono::Utc::now().to_rfc3339(),
    });
    state.documents.lock().unwrap().push(document.clone());
    (StatusCode::CREATED, Json(document)).into_response()
}

async fn get_document(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(resp) = require_auth(&state, &headers) {
        return resp;
    }
    match find_by_id(&state.documents.lock().unwrap(), id) {
        Some(document) => Json(document).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Document not found"})),
        )
            .into_response(),
    }
}

async fn delete_document(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(resp) = require_auth(&state, &headers) {
        return resp;
    }
    state
        .documents
        .lock()
        .unwrap()
        .retain(|d| d["id"].as_i64() != Some(id));
    StatusCode::NO_CONTENT.into_response()
}

async fn preview_document(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Path((id, page)): Path<(i64, u32)>,
) -> Response {
    if let Err(resp) = require_auth(&state, &headers) {
        return resp;
    }
    if find_by_id(&state.documents.lock().unwrap(), id).is_none() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Document not found"})),
        )
            .into_response();
    }
    Json(json!({
        "page_count": PAGE_COUNT,
        "preview": format!("preview-of-{id}-page-{page}"),
    }))
    .into_response()
}

async fn parse_document(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = require_auth(&state, &headers) {
        return resp;
    }
    if let Some((status, body)) = state.parse_failure.lock().unwrap().clone() {
        return (StatusCode::from_u16(status).unwrap(), Json(body)).into_response();
    }
    if !headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
    {
        return (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Json(json!({"detail": "Unsupported media type in request."})),
        )
            .into_response();
    }

    let document_id = body["document_id"].as_i64().unwrap_or_default();
    if find_by_id(&state.documents.lock().unwrap(), document_id).is_none() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Document not found"})),
        )
            .into_response();
    }
    let parsed = json!({
        "id": state.allocate_id(),
        "document": document_id,
        "page_number": body["page_number"].as_u64().unwrap_or(1),
        "result_data": {
            "name": "Jane Doe",
            "schema_type": body["schema_type"].clone(),
        },
        "parsed_at": chrono::Utc::now().to_rfc3339(),
    });
    state.parsed_results.lock().unwrap().push(parsed.clone());
    Json(parsed).into_response()
}

// ── Parsed results ───────────────────────────────────────

async fn list_parsed_results(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Query(params): Query<std::collections::HashMap<String, String>>,
) -> Response {
    if let Err(resp) = require_auth(&state, &headers) {
        return resp;
    }
    let results = state.parsed_results.lock().unwrap().clone();
    let filtered: Vec<Value> = match params.get("document_id").and_then(|v| v.parse::<i64>().ok()) {
        Some(document_id) => results
            .into_iter()
            .filter(|r| r["document"].as_i64() == Some(document_id))
            .collect(),
        None => results,
    };
    Json(filtered).into_response()
}

async fn get_parsed_result(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(resp) = require_auth(&state, &headers) {
        return resp;
    }
    match find_by_id(&state.parsed_results.lock().unwrap(), id) {
        Some(parsed) => Json(parsed).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response(),
    }
}

// ── Schemas ──────────────────────────────────────────────

async fn list_schemas(State(state): State<Arc<ServiceState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = require_auth(&state, &headers) {
        return resp;
    }
    Json(state.schemas.lock().unwrap().clone()).into_response()
}

async fn create_schema(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = require_auth(&state, &headers) {
        return resp;
    }
    let now = chrono::Utc::now().to_rfc3339();
    let schema = json!({
        "id": state.allocate_id(),
        "name": body["name"],
        "description": body["description"],
        "schema_json": body["schema_json"],
        "created_at": now,
        "updated_at": now,
    });
    state.schemas.lock().unwrap().push(schema.clone());
    (StatusCode::CREATED, Json(schema)).into_response()
}

async fn get_schema(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(resp) = require_auth(&state, &headers) {
        return resp;
    }
    match find_by_id(&state.schemas.lock().unwrap(), id) {
        Some(schema) => Json(schema).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response(),
    }
}

async fn update_schema(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = require_auth(&state, &headers) {
        return resp;
    }
    let mut schemas = state.schemas.lock().unwrap();
    match schemas.iter_mut().find(|s| s["id"].as_i64() == Some(id)) {
        Some(schema) => {
            schema["name"] = body["name"].clone();
            schema["description"] = body["description"].clone();
            schema["schema_json"] = body["schema_json"].clone();
            schema["updated_at"] = json!(chrono::Utc::now().to_rfc3339());
            Json(schema.clone()).into_response()
        }
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response(),
    }
}

async fn delete_schema(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(resp) = require_auth(&state, &headers) {
        return resp;
    }
    state
        .schemas
        .lock()
        .unwrap()
        .retain(|s| s["id"].as_i64() != Some(id));
    StatusCode::NO_CONTENT.into_response()
}

async fn example_schema(State(state): State<Arc<ServiceState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = require_auth(&state, &headers) {
        return resp;
    }
    Json(json!({
        "example": {
            "name": "resume",
            "fields": [
                {"name": "full_name", "type": "string"},
                {"name": "email", "type": "string"},
            ],
        }
    }))
    .into_response()
}

async fn test_schema(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = require_auth(&state, &headers) {
        return resp;
    }
    if find_by_id(&state.schemas.lock().unwrap(), id).is_none() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Schema not found"})),
        )
            .into_response();
    }
    Json(json!({
        "result": {
            "schema": id,
            "document": body["document_id"],
            "page": body["page_number"],
            "fields": {"full_name": "Jane Doe"},
        }
    }))
    .into_response()
}

// ═══════════════════════════════════════════════════════════
// Recording navigator
// ═══════════════════════════════════════════════════════════

/// Navigator that logs every transition, for asserting redirect counts.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    location: Mutex<String>,
    log: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self {
            location: Mutex::new("/".to_string()),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Place the virtual UI at a location without recording a navigation.
    pub fn set_location(&self, location: &str) {
        *self.location.lock().unwrap() = location.to_string();
    }

    pub fn navigations(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap().clear();
    }
}

impl Navigator for RecordingNavigator {
    fn current_location(&self) -> String {
        self.location.lock().unwrap().clone()
    }

    fn navigate(&self, to: &str) {
        self.log.lock().unwrap().push(to.to_string());
        *self.location.lock().unwrap() = to.to_string();
    }
}

// ═══════════════════════════════════════════════════════════
// Harness
// ═══════════════════════════════════════════════════════════

/// A mock service and a client wired against it.
pub struct Harness {
    pub service: MockService,
    pub core: ClientCore,
    pub credentials: Arc<MemoryCredentialStore>,
    pub navigator: Arc<RecordingNavigator>,
}

impl Harness {
    pub async fn anonymous() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut ClientConfig)) -> Self {
        let service = MockService::spawn().await;
        let mut config = ClientConfig::with_base_url(&service.base_url);
        adjust(&mut config);
        let credentials = Arc::new(MemoryCredentialStore::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let core = ClientCore::with_parts(config, credentials.clone(), navigator.clone());
        Self {
            service,
            core,
            credentials,
            navigator,
        }
    }

    /// A harness that has already logged in as alice, with the login's
    /// own traffic and navigation cleared away.
    pub async fn logged_in() -> Self {
        let harness = Self::anonymous().await;
        assert!(
            harness.core.auth().login("alice", "secret").await,
            "test login should succeed"
        );
        harness.navigator.clear();
        harness.service.state.clear_recorded();
        harness
    }
}
