//! HTTP transport for the document-parsing service.
//!
//! `ApiClient` wraps two `reqwest` clients — a JSON-default one and a
//! multipart one — behind a single response path. Every outgoing request
//! gets the credential and anti-forgery headers injected the same way on
//! both variants; every 401 response triggers the global
//! clear-credential-and-redirect side effect exactly once, regardless of
//! which store issued the call.

pub mod error;

pub use error::ApiError;

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, SET_COOKIE};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{self, ClientConfig};
use crate::models::{
    ApiRootResponse, Document, DocumentUpload, ExampleSchemaResponse, Item, ItemPayload,
    ParseRequest, ParsedResult, PreviewResponse, Schema, SchemaPayload, SchemaTestRequest,
    SchemaTestResponse,
};
use crate::session::{self, Credential, CredentialStore, Navigator, SessionState};

// ═══════════════════════════════════════════════════════════
// ApiClient
// ═══════════════════════════════════════════════════════════

/// Transport client for the remote service.
///
/// Cheap to clone: both underlying clients share one cookie jar, and the
/// session/storage/navigation collaborators are shared references.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    json: reqwest::Client,
    multipart: reqwest::Client,
    upload_timeout: Duration,
    state: Arc<SessionState>,
    credentials: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    pub fn new(
        config: &ClientConfig,
        state: Arc<SessionState>,
        credentials: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        // One jar for both variants: the anti-forgery and session cookies
        // must travel with JSON and multipart requests alike.
        let jar = Arc::new(Jar::default());

        let mut json_headers = HeaderMap::new();
        json_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let json = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .default_headers(json_headers)
            .build()
            .expect("Failed to create HTTP client");

        // Separate instance for multipart: its content type (with the
        // form boundary) is set per-request and must not be overridden by
        // a JSON default.
        let multipart = reqwest::Client::builder()
            .cookie_provider(jar)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            json,
            multipart,
            upload_timeout: config.upload_timeout,
            state,
            credentials,
            navigator,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn upload_timeout(&self) -> Duration {
        self.upload_timeout
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── Shared request path ──────────────────────────────

    /// Attach the credential and anti-forgery headers. Unconditional and
    /// identical for the JSON and multipart variants.
    fn inject_headers(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let Some(credential) = self.state.credential() {
            request = request.header(AUTHORIZATION, credential.header_value());
        }
        if let Some(token) = self.state.csrf_token() {
            request = request.header(config::CSRF_HEADER, token);
        }
        request
    }

    /// Send a request and intercept the response. Every remote call except
    /// the login probe goes through here, so the 401 side effect fires
    /// exactly once per offending response.
    async fn execute(&self, request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = self
            .inject_headers(request)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            self.on_auth_rejected(&body);
        }
        Err(error::classify(status, &body))
    }

    /// Global 401 side effect: clear the credential (in memory and in
    /// durable storage) and send the UI to the login view with the origin
    /// captured — unless it is already there.
    fn on_auth_rejected(&self, body: &str) {
        tracing::error!(body, "Authentication rejected by service");
        let location = self.navigator.current_location();
        let path = session::location_path(&location);
        if path != config::LOGIN_PATH {
            self.state.clear_credential();
            self.credentials.clear();
            self.navigator
                .navigate(&format!("{}?redirect={}", config::LOGIN_PATH, path));
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        response.json::<T>().await.map_err(|e| ApiError::Service {
            status: status.as_u16(),
            message: format!("Malformed response body: {e}"),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(self.json.get(self.url(path))).await?;
        Self::decode(response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .execute(self.json.post(self.url(path)).json(body))
            .await?;
        Self::decode(response).await
    }

    async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .execute(self.json.put(self.url(path)).json(body))
            .await?;
        Self::decode(response).await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(self.json.delete(self.url(path))).await?;
        Ok(())
    }

    // ── Anti-forgery token ───────────────────────────────

    /// Fetch or refresh the anti-forgery cookie, capturing the token for
    /// header echo. Best-effort: returns whether it succeeded and never
    /// errors — subsequent requests proceed without the token.
    pub async fn fetch_csrf_token(&self) -> bool {
        match self.execute(self.json.get(self.url("/csrf/"))).await {
            Ok(response) => {
                match csrf_token_from_headers(response.headers()) {
                    Some(token) => self.state.set_csrf_token(token),
                    None => {
                        tracing::warn!("Anti-forgery endpoint responded without a token cookie")
                    }
                }
                true
            }
            Err(e) => {
                tracing::warn!("Failed to fetch anti-forgery token: {e}");
                false
            }
        }
    }

    // ── Login probe ──────────────────────────────────────

    /// Probe the authenticated service root with a candidate credential.
    ///
    /// Used by login before the credential is persisted anywhere. This
    /// deliberately bypasses the shared response path: a rejected
    /// candidate must not trigger the global logout-and-redirect side
    /// effect.
    pub async fn probe_credential(
        &self,
        candidate: &Credential,
    ) -> Result<ApiRootResponse, ApiError> {
        let response = self
            .json
            .get(self.url("/"))
            .header(AUTHORIZATION, candidate.header_value())
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error::classify(status, &body));
        }
        Self::decode(response).await
    }

    // ── Items ────────────────────────────────────────────

    pub async fn get_items(&self) -> Result<Vec<Item>, ApiError> {
        self.get_json("/items/").await
    }

    pub async fn get_item(&self, id: i64) -> Result<Item, ApiError> {
        self.get_json(&format!("/items/{id}/")).await
    }

    pub async fn create_item(&self, item: &ItemPayload) -> Result<Item, ApiError> {
        self.post_json("/items/", item).await
    }

    pub async fn update_item(&self, id: i64, item: &ItemPayload) -> Result<Item, ApiError> {
        self.put_json(&format!("/items/{id}/"), item).await
    }

    pub async fn delete_item(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/items/{id}/")).await
    }

    // ── Documents ────────────────────────────────────────

    pub async fn get_documents(&self) -> Result<Vec<Document>, ApiError> {
        self.get_json("/documents/").await
    }

    pub async fn get_document(&self, id: i64) -> Result<Document, ApiError> {
        self.get_json(&format!("/documents/{id}/")).await
    }

    /// Upload a document as a multipart form, bounded by the configured
    /// upload deadline.
    pub async fn upload_document(&self, upload: DocumentUpload) -> Result<Document, ApiError> {
        let request = self
            .multipart
            .post(self.url("/documents/"))
            .multipart(upload.into_form())
            .timeout(self.upload_timeout);
        let response = self.execute(request).await?;
        Self::decode(response).await
    }

    pub async fn delete_document(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/documents/{id}/")).await
    }

    pub async fn get_document_preview(
        &self,
        id: i64,
        page: u32,
    ) -> Result<PreviewResponse, ApiError> {
        self.get_json(&format!("/documents/{id}/preview/{page}/")).await
    }

    /// Request structured extraction. Both the request and accept sides of
    /// the content negotiation are pinned to JSON — the service rejects
    /// ambiguous negotiation on this endpoint.
    pub async fn parse_document(&self, request: &ParseRequest) -> Result<ParsedResult, ApiError> {
        let request = self
            .json
            .post(self.url("/documents/parse/"))
            .header(ACCEPT, "application/json")
            .json(request);
        let response = self.execute(request).await?;
        Self::decode(response).await
    }

    // ── Parsed results ───────────────────────────────────

    pub async fn get_parsed_results(
        &self,
        document_id: Option<i64>,
    ) -> Result<Vec<ParsedResult>, ApiError> {
        let path = match document_id {
            Some(id) => format!("/parsed-results/?document_id={id}"),
            None => "/parsed-results/".to_string(),
        };
        self.get_json(&path).await
    }

    pub async fn get_parsed_result(&self, id: i64) -> Result<ParsedResult, ApiError> {
        self.get_json(&format!("/parsed-results/{id}/")).await
    }

    // ── Schemas ──────────────────────────────────────────

    pub async fn get_schemas(&self) -> Result<Vec<Schema>, ApiError> {
        self.get_json("/schemas/").await
    }

    pub async fn get_schema(&self, id: i64) -> Result<Schema, ApiError> {
        self.get_json(&format!("/schemas/{id}/")).await
    }

    pub async fn create_schema(&self, schema: &SchemaPayload) -> Result<Schema, ApiError> {
        self.post_json("/schemas/", schema).await
    }

    pub async fn update_schema(&self, id: i64, schema: &SchemaPayload) -> Result<Schema, ApiError> {
        self.put_json(&format!("/schemas/{id}/"), schema).await
    }

    pub async fn delete_schema(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/schemas/{id}/")).await
    }

    pub async fn get_example_schema(&self) -> Result<ExampleSchemaResponse, ApiError> {
        self.get_json("/schemas/example/").await
    }

    pub async fn test_schema(
        &self,
        id: i64,
        request: &SchemaTestRequest,
    ) -> Result<SchemaTestResponse, ApiError> {
        self.post_json(&format!("/schemas/{id}/test/"), request).await
    }
}

/// Extract the anti-forgery token from a response's Set-Cookie headers.
fn csrf_token_from_headers(headers: &HeaderMap) -> Option<String> {
    for raw in headers.get_all(SET_COOKIE) {
        if let Ok(value) = raw.to_str() {
            // take name=value before the first ';'
            let name_value = value.split(';').next().unwrap_or(value).trim();
            if let Some((name, token)) = name_value.split_once('=') {
                if name == config::CSRF_COOKIE && !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }
    None
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
