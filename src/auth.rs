//! Authentication session: credential lifecycle and the login, logout
//! and validation operations.
//!
//! The session moves between three observable states: anonymous (no
//! credential), authenticated (credential held, validity unconfirmed)
//! and verified (confirmed by a probe). Logout or a service-side
//! rejection returns it to anonymous. A credential is never persisted
//! until a live probe has accepted it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::config;
use crate::session::{self, Credential, CredentialStore, Navigator, SessionState};
use crate::transport::{ApiClient, ApiError};

/// Shown when the service rejects a login attempt.
pub const INVALID_CREDENTIALS: &str = "Invalid username or password. Please try again.";
/// Shown when the service cannot be reached at all during login.
pub const NETWORK_UNREACHABLE: &str =
    "Cannot connect to the server. Please check that the backend is running.";

/// The authentication session. Owns login/logout/validation; the
/// credential itself lives in the shared `SessionState`.
pub struct AuthSession {
    client: ApiClient,
    state: Arc<SessionState>,
    credentials: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    loading: AtomicBool,
    error: RwLock<Option<String>>,
}

impl AuthSession {
    /// Create the session, restoring a previously persisted credential so
    /// authentication survives restarts. The restored credential is
    /// unconfirmed until the next probe (`check_auth`).
    pub fn new(
        client: ApiClient,
        state: Arc<SessionState>,
        credentials: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        if let Some(encoded) = credentials.load() {
            state.set_credential(Credential::from_encoded(encoded));
        }
        Self {
            client,
            state,
            credentials,
            navigator,
            loading: AtomicBool::new(false),
            error: RwLock::new(None),
        }
    }

    // ── Observable state ─────────────────────────────────

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    pub fn user(&self) -> Option<String> {
        self.state.user()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn error(&self) -> Option<String> {
        self.error.read().ok().and_then(|guard| guard.clone())
    }

    pub(crate) fn client(&self) -> &ApiClient {
        &self.client
    }

    fn set_error(&self, message: impl Into<String>) {
        if let Ok(mut guard) = self.error.write() {
            *guard = Some(message.into());
        }
    }

    fn clear_error(&self) {
        if let Ok(mut guard) = self.error.write() {
            *guard = None;
        }
    }

    // ── Operations ───────────────────────────────────────

    /// Log in with a user identifier and secret.
    ///
    /// The candidate credential is probed against the service before it
    /// is persisted anywhere; a failed probe leaves the session anonymous
    /// and sets the session error. On success the UI is sent to the path
    /// captured in the current location's `redirect` parameter, or to the
    /// default landing path.
    pub async fn login(&self, username: &str, password: &str) -> bool {
        self.loading.store(true, Ordering::SeqCst);
        self.clear_error();
        let ok = self.login_inner(username, password).await;
        self.loading.store(false, Ordering::SeqCst);
        ok
    }

    async fn login_inner(&self, username: &str, password: &str) -> bool {
        // Anti-forgery first, best-effort: login proceeds without it.
        if !self.client.fetch_csrf_token().await {
            tracing::warn!("Anti-forgery fetch failed, proceeding with login");
        }

        let candidate = Credential::from_login(username, password);
        match self.client.probe_credential(&candidate).await {
            Ok(root) => {
                tracing::debug!(status = %root.status, "Credential probe succeeded");
            }
            Err(ApiError::Network(e)) => {
                tracing::error!("Credential probe could not reach the service: {e}");
                self.set_error(NETWORK_UNREACHABLE);
                return false;
            }
            Err(ApiError::Timeout) => {
                tracing::error!("Credential probe timed out");
                self.set_error(NETWORK_UNREACHABLE);
                return false;
            }
            Err(e) => {
                tracing::error!(%e, "Credential probe rejected");
                self.set_error(INVALID_CREDENTIALS);
                return false;
            }
        }

        // Probe passed: only now does the credential touch storage.
        self.credentials.save(candidate.encoded());
        self.state.set_credential(candidate);
        self.state.set_user(username);

        let location = self.navigator.current_location();
        let target = session::location_query_param(&location, "redirect")
            .unwrap_or(config::DEFAULT_LANDING_PATH)
            .to_string();
        self.navigator.navigate(&target);
        true
    }

    /// Log out: clear the in-memory and durable credential and return to
    /// the login view. Local-only, synchronous, cannot fail.
    pub fn logout(&self) {
        self.state.clear_credential();
        self.state.clear_user();
        self.credentials.clear();
        self.navigator.navigate(config::LOGIN_PATH);
    }

    /// Validate a held credential with a lightweight authenticated
    /// request. A service-side rejection forces logout; any other failure
    /// is treated as transient and leaves the session alone.
    pub async fn check_auth(&self) -> bool {
        if !self.state.is_authenticated() {
            return false;
        }
        match self.client.get_items().await {
            Ok(_) => true,
            Err(ApiError::AuthRejected) => {
                tracing::info!("Stored credential rejected, logging out");
                self.logout();
                false
            }
            Err(e) => {
                tracing::warn!(%e, "Auth check failed");
                false
            }
        }
    }
}
