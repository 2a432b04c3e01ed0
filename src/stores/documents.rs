//! Document store: the upload → preview → parse → delete pipeline.
//!
//! Every operation here runs behind the auth guard; uploads additionally
//! re-check the credential explicitly since they are the most
//! failure-prone call in the workflow. Preview and parse results are
//! transient, last-resolver-wins slots: a superseded request that
//! resolves late will overwrite newer state (known limitation, kept
//! deliberately).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use crate::auth::AuthSession;
use crate::models::{Document, DocumentUpload, ParseRequest, ParsedResult, PreviewResponse};
use crate::transport::{ApiClient, ApiError};

use super::guard::AuthGuard;
use super::{failure_message, OpState, AUTH_ERROR_MESSAGE};

/// Shown when the upload credential re-check finds no credential.
pub const NO_UPLOAD_CREDENTIAL: &str = "No authentication token available";
/// Shown when a parse pre-check cannot confirm the document exists.
pub const DOCUMENT_UNVERIFIED: &str = "Could not verify document exists";
/// Shown when a page below the valid range is requested.
pub const PAGE_OUT_OF_RANGE: &str = "Page number must be at least 1";

/// State container for documents and their preview/extraction results.
pub struct DocumentsStore {
    client: ApiClient,
    auth: Arc<AuthSession>,
    guard: AuthGuard,
    documents: RwLock<Vec<Document>>,
    current_document: RwLock<Option<Document>>,
    preview_data: RwLock<Option<String>>,
    page_count: AtomicU32,
    current_page: AtomicU32,
    parsed_result: RwLock<Option<ParsedResult>>,
    op: OpState,
}

impl DocumentsStore {
    pub fn new(client: ApiClient, auth: Arc<AuthSession>) -> Self {
        Self {
            client,
            guard: AuthGuard::new(auth.clone()),
            auth,
            documents: RwLock::new(Vec::new()),
            current_document: RwLock::new(None),
            preview_data: RwLock::new(None),
            page_count: AtomicU32::new(1),
            current_page: AtomicU32::new(1),
            parsed_result: RwLock::new(None),
            op: OpState::new(),
        }
    }

    // ── Observable state ─────────────────────────────────

    pub fn documents(&self) -> Vec<Document> {
        self.documents.read().map(|guard| guard.clone()).unwrap_or_default()
    }

    pub fn current_document(&self) -> Option<Document> {
        self.current_document.read().ok().and_then(|guard| guard.clone())
    }

    pub fn preview_data(&self) -> Option<String> {
        self.preview_data.read().ok().and_then(|guard| guard.clone())
    }

    pub fn page_count(&self) -> u32 {
        self.page_count.load(Ordering::SeqCst)
    }

    pub fn current_page(&self) -> u32 {
        self.current_page.load(Ordering::SeqCst)
    }

    pub fn parsed_result(&self) -> Option<ParsedResult> {
        self.parsed_result.read().ok().and_then(|guard| guard.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.op.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.op.error()
    }

    // ── Guard ────────────────────────────────────────────

    /// Run the pre-flight check; on denial the guard's message lands in
    /// the error slot and the operation never reaches the network.
    async fn authorized(&self) -> bool {
        let decision = self.guard.ensure_authorized().await;
        match decision.denial_message() {
            Some(message) => {
                self.op.fail(message);
                false
            }
            None => true,
        }
    }

    // ── Operations ───────────────────────────────────────

    /// Fetch the full collection, replacing the cache.
    pub async fn fetch_documents(&self) -> Vec<Document> {
        if !self.authorized().await {
            return Vec::new();
        }
        self.op.begin();
        let result = match self.client.get_documents().await {
            Ok(documents) => {
                if let Ok(mut guard) = self.documents.write() {
                    *guard = documents.clone();
                }
                documents
            }
            Err(e) => {
                tracing::error!(%e, "Failed to fetch documents");
                self.op.fail(failure_message(&e, "Failed to fetch documents"));
                Vec::new()
            }
        };
        self.op.finish();
        result
    }

    /// Upload a document; on success it is appended at the cache tail.
    ///
    /// Requires a live credential even after the guard passes: uploads
    /// are rejected precisely rather than failing deep in the transport
    /// when a logout races the call.
    pub async fn upload_document(&self, upload: DocumentUpload) -> Option<Document> {
        if !self.authorized().await {
            return None;
        }
        self.op.begin();

        if !self.auth.is_authenticated() {
            self.op.fail(NO_UPLOAD_CREDENTIAL);
            self.op.finish();
            return None;
        }

        tracing::info!(file = %upload.file_name, "Uploading document");
        let result = match self.client.upload_document(upload).await {
            Ok(document) => {
                tracing::info!(id = document.id, "Document upload succeeded");
                if let Ok(mut guard) = self.documents.write() {
                    guard.push(document.clone());
                }
                Some(document)
            }
            Err(e) => {
                tracing::error!(%e, "Failed to upload document");
                self.op.fail(self.upload_failure_message(&e));
                None
            }
        };
        self.op.finish();
        result
    }

    fn upload_failure_message(&self, err: &ApiError) -> String {
        match err {
            ApiError::AuthRejected => {
                // The transport has already cleared the credential; drop
                // the rest of the session state with it.
                self.auth.logout();
                AUTH_ERROR_MESSAGE.to_string()
            }
            ApiError::Timeout => format!(
                "Upload timed out after {} seconds. Please try again.",
                self.client.upload_timeout().as_secs()
            ),
            ApiError::Service {
                status: 500,
                message,
            } => format!("Server error: {message}"),
            other => failure_message(other, "Failed to upload document"),
        }
    }

    /// Fetch a rendered preview of one page, learning the document's
    /// total page count as a side effect. Overwrites the preview slot.
    pub async fn get_document_preview(
        &self,
        document_id: i64,
        page: u32,
    ) -> Option<PreviewResponse> {
        if page < 1 {
            self.op.fail(PAGE_OUT_OF_RANGE);
            return None;
        }
        if !self.authorized().await {
            return None;
        }
        self.op.begin();
        let result = match self.client.get_document_preview(document_id, page).await {
            Ok(response) => {
                if let Ok(mut guard) = self.preview_data.write() {
                    *guard = Some(response.preview.clone());
                }
                self.page_count.store(response.page_count, Ordering::SeqCst);
                self.current_page.store(page, Ordering::SeqCst);
                Some(response)
            }
            Err(e) => {
                tracing::error!(%e, document_id, page, "Failed to get document preview");
                self.op
                    .fail(failure_message(&e, "Failed to get document preview"));
                if let Ok(mut guard) = self.preview_data.write() {
                    *guard = None;
                }
                None
            }
        };
        self.op.finish();
        result
    }

    /// Request structured extraction for one page of a document.
    ///
    /// The document is fetched first as a fail-fast existence check: a
    /// missing document yields a precise message instead of a confusing
    /// parse failure, and no parse request is sent.
    pub async fn parse_document(
        &self,
        document_id: i64,
        page: u32,
        schema_type: Option<&str>,
    ) -> Option<ParsedResult> {
        if page < 1 {
            self.op.fail(PAGE_OUT_OF_RANGE);
            return None;
        }
        if !self.authorized().await {
            return None;
        }
        self.op.begin();

        if let Err(e) = self.client.get_document(document_id).await {
            tracing::error!(%e, document_id, "Document existence check failed");
            self.op.fail(DOCUMENT_UNVERIFIED);
            self.op.finish();
            return None;
        }

        tracing::info!(document_id, page, schema = ?schema_type, "Parsing document");
        let request = ParseRequest {
            document_id,
            page_number: page,
            schema_type: schema_type.map(str::to_string),
        };
        let result = match self.client.parse_document(&request).await {
            Ok(parsed) => {
                if let Ok(mut guard) = self.parsed_result.write() {
                    *guard = Some(parsed.clone());
                }
                Some(parsed)
            }
            Err(e) => {
                tracing::error!(%e, document_id, "Failed to parse document");
                self.op.fail(parse_failure_message(&e));
                None
            }
        };
        self.op.finish();
        result
    }

    /// Delete a document. Removing the active document also resets the
    /// transient preview and parse state derived from it.
    pub async fn delete_document(&self, id: i64) -> bool {
        if !self.authorized().await {
            return false;
        }
        self.op.begin();
        let result = match self.client.delete_document(id).await {
            Ok(()) => {
                if let Ok(mut guard) = self.documents.write() {
                    guard.retain(|d| d.id != id);
                }
                let was_current = self
                    .current_document
                    .read()
                    .map(|guard| guard.as_ref().is_some_and(|d| d.id == id))
                    .unwrap_or(false);
                if was_current {
                    if let Ok(mut guard) = self.current_document.write() {
                        *guard = None;
                    }
                    if let Ok(mut guard) = self.preview_data.write() {
                        *guard = None;
                    }
                    if let Ok(mut guard) = self.parsed_result.write() {
                        *guard = None;
                    }
                }
                true
            }
            Err(e) => {
                tracing::error!(%e, id, "Failed to delete document");
                self.op.fail(failure_message(&e, "Failed to delete document"));
                false
            }
        };
        self.op.finish();
        result
    }

    /// Fetch stored extraction results, optionally for one document.
    pub async fn fetch_parsed_results(&self, document_id: Option<i64>) -> Vec<ParsedResult> {
        if !self.authorized().await {
            return Vec::new();
        }
        self.op.begin();
        let result = match self.client.get_parsed_results(document_id).await {
            Ok(results) => results,
            Err(e) => {
                tracing::error!(%e, "Failed to fetch parsed results");
                self.op
                    .fail(failure_message(&e, "Failed to fetch parsed results"));
                Vec::new()
            }
        };
        self.op.finish();
        result
    }

    /// Fetch one stored extraction result by id.
    pub async fn fetch_parsed_result(&self, id: i64) -> Option<ParsedResult> {
        if !self.authorized().await {
            return None;
        }
        self.op.begin();
        let result = match self.client.get_parsed_result(id).await {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::error!(%e, id, "Failed to fetch parsed result");
                self.op
                    .fail(failure_message(&e, "Failed to fetch parsed result"));
                None
            }
        };
        self.op.finish();
        result
    }

    /// Make a document the active one. Preview and parse state belong to
    /// the previous document, so both reset immediately; the page count
    /// stays until the next preview fetch corrects it.
    pub fn set_current_document(&self, document: Option<Document>) {
        if let Ok(mut guard) = self.current_document.write() {
            *guard = document;
        }
        if let Ok(mut guard) = self.preview_data.write() {
            *guard = None;
        }
        if let Ok(mut guard) = self.parsed_result.write() {
            *guard = None;
        }
        self.current_page.store(1, Ordering::SeqCst);
    }

    /// Return the store to its initial empty state.
    pub fn reset(&self) {
        if let Ok(mut guard) = self.documents.write() {
            guard.clear();
        }
        if let Ok(mut guard) = self.current_document.write() {
            *guard = None;
        }
        if let Ok(mut guard) = self.preview_data.write() {
            *guard = None;
        }
        self.page_count.store(1, Ordering::SeqCst);
        self.current_page.store(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.parsed_result.write() {
            *guard = None;
        }
        self.op.reset();
    }
}

/// Parse failures get the most detailed translation in the client: the
/// service has several distinct ways to refuse this endpoint and the
/// remedies differ.
fn parse_failure_message(err: &ApiError) -> String {
    match err {
        ApiError::AuthRejected => AUTH_ERROR_MESSAGE.to_string(),
        ApiError::ContentType(_) => {
            "Content type error. Try refreshing the page and trying again.".to_string()
        }
        ApiError::ServiceUnavailable(message) => {
            if message.contains("API key") {
                format!("Google API key error: {message}. Please check the server configuration.")
            } else if !message.is_empty() {
                message.clone()
            } else {
                "Service temporarily unavailable.".to_string()
            }
        }
        other => {
            let message = other.body_message().unwrap_or("Failed to parse document");
            if message.contains("API key not valid") || message.contains("INVALID_ARGUMENT") {
                "Google API key is invalid. Please contact the administrator.".to_string()
            } else {
                message.to_string()
            }
        }
    }
}
