//! Client wiring and startup.
//!
//! `ClientCore` is the single composition point: one shared session
//! state, one transport, one auth session and the three stores, all
//! constructed with explicit dependencies so any piece can be swapped
//! out in tests.

use std::sync::Arc;

use crate::auth::AuthSession;
use crate::config::ClientConfig;
use crate::session::{CredentialStore, FileCredentialStore, Navigator, PathTracker, SessionState};
use crate::stores::{DocumentsStore, ItemsStore, SchemasStore};
use crate::transport::ApiClient;

/// A fully wired client.
pub struct ClientCore {
    state: Arc<SessionState>,
    client: ApiClient,
    auth: Arc<AuthSession>,
    documents: Arc<DocumentsStore>,
    schemas: Arc<SchemasStore>,
    items: Arc<ItemsStore>,
}

impl ClientCore {
    /// Wire a client with durable credential storage and the default
    /// navigator.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_parts(
            config,
            Arc::new(FileCredentialStore::new()),
            Arc::new(PathTracker::new()),
        )
    }

    /// Wire a client with injected storage and navigation — tests and
    /// embedding UIs use this.
    pub fn with_parts(
        config: ClientConfig,
        credentials: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let state = Arc::new(SessionState::new());
        let client = ApiClient::new(&config, state.clone(), credentials.clone(), navigator.clone());
        let auth = Arc::new(AuthSession::new(
            client.clone(),
            state.clone(),
            credentials,
            navigator,
        ));
        let documents = Arc::new(DocumentsStore::new(client.clone(), auth.clone()));
        let schemas = Arc::new(SchemasStore::new(client.clone()));
        let items = Arc::new(ItemsStore::new(client.clone()));
        Self {
            state,
            client,
            auth,
            documents,
            schemas,
            items,
        }
    }

    // ── Accessors ────────────────────────────────────────

    pub fn session(&self) -> &Arc<SessionState> {
        &self.state
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn auth(&self) -> &Arc<AuthSession> {
        &self.auth
    }

    pub fn documents(&self) -> &Arc<DocumentsStore> {
        &self.documents
    }

    pub fn schemas(&self) -> &Arc<SchemasStore> {
        &self.schemas
    }

    pub fn items(&self) -> &Arc<ItemsStore> {
        &self.items
    }

    /// Run the startup side tasks in the background: refresh the
    /// anti-forgery cookie, then re-validate a restored credential.
    /// Both are fire-and-forget — failures are logged and discarded, and
    /// the client is usable immediately.
    pub fn start(&self) {
        let client = self.client.clone();
        let auth = self.auth.clone();
        let restored = self.auth.is_authenticated();
        tokio::spawn(async move {
            if !client.fetch_csrf_token().await {
                tracing::warn!("Startup anti-forgery fetch failed, continuing");
            }
            if restored && !auth.check_auth().await {
                tracing::warn!("Restored credential failed validation");
            }
        });
    }
}
