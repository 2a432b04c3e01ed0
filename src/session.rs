//! Session state shared by the transport and the auth layer.
//!
//! Exactly one `SessionState` exists per wired client. It owns the
//! credential, the user label and the anti-forgery token. Stores read it
//! through the transport; only the auth session and the transport's 401
//! interceptor mutate it.

use std::path::PathBuf;
use std::sync::RwLock;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::config;

// ═══════════════════════════════════════════════════════════
// Credential
// ═══════════════════════════════════════════════════════════

/// Bearer value proving authentication: base64 of `user:pass`, sent with
/// the Basic scheme. Encoded, not encrypted — transport-layer
/// confidentiality is assumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Encode a credential from a user identifier and secret.
    pub fn from_login(username: &str, password: &str) -> Self {
        Self(BASE64.encode(format!("{username}:{password}")))
    }

    /// Wrap an already-encoded value (loaded from durable storage).
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The encoded form, as persisted.
    pub fn encoded(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> String {
        format!("Basic {}", self.0)
    }
}

// ═══════════════════════════════════════════════════════════
// SessionState
// ═══════════════════════════════════════════════════════════

/// Shared session state: credential, user label, anti-forgery token.
///
/// Critical sections are short and never held across awaits. A poisoned
/// lock reads as an anonymous session rather than panicking the caller.
#[derive(Debug, Default)]
pub struct SessionState {
    credential: RwLock<Option<Credential>>,
    user: RwLock<Option<String>>,
    csrf_token: RwLock<Option<String>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Credential ───────────────────────────────────────

    pub fn credential(&self) -> Option<Credential> {
        self.credential.read().ok().and_then(|guard| guard.clone())
    }

    /// Authentication status is derived: a held credential means
    /// authenticated, whether or not the service has confirmed it yet.
    pub fn is_authenticated(&self) -> bool {
        self.credential
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    pub fn set_credential(&self, credential: Credential) {
        if let Ok(mut guard) = self.credential.write() {
            *guard = Some(credential);
        }
    }

    pub fn clear_credential(&self) {
        if let Ok(mut guard) = self.credential.write() {
            *guard = None;
        }
    }

    // ── User identity ────────────────────────────────────

    pub fn user(&self) -> Option<String> {
        self.user.read().ok().and_then(|guard| guard.clone())
    }

    pub fn set_user(&self, username: impl Into<String>) {
        if let Ok(mut guard) = self.user.write() {
            *guard = Some(username.into());
        }
    }

    pub fn clear_user(&self) {
        if let Ok(mut guard) = self.user.write() {
            *guard = None;
        }
    }

    // ── Anti-forgery token ───────────────────────────────

    pub fn csrf_token(&self) -> Option<String> {
        self.csrf_token.read().ok().and_then(|guard| guard.clone())
    }

    pub fn set_csrf_token(&self, token: impl Into<String>) {
        if let Ok(mut guard) = self.csrf_token.write() {
            *guard = Some(token.into());
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Durable credential storage
// ═══════════════════════════════════════════════════════════

/// Durable storage for the encoded credential.
///
/// Failures are logged and swallowed: losing the durable copy degrades to
/// a fresh login, never to a broken client.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, encoded: &str);
    fn clear(&self);
}

/// File-backed store under the application data directory.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new() -> Self {
        Self {
            path: config::credential_file(),
        }
    }

    /// Store at an explicit path.
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Default for FileCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let trimmed = contents.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Err(_) => None,
        }
    }

    fn save(&self, encoded: &str) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("Failed to create credential directory: {e}");
                return;
            }
        }
        if let Err(e) = std::fs::write(&self.path, encoded) {
            tracing::warn!("Failed to persist credential: {e}");
        }
    }

    fn clear(&self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!("Failed to remove persisted credential: {e}");
            }
        }
    }
}

/// In-memory store — volatile sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<String> {
        self.slot.read().ok().and_then(|guard| guard.clone())
    }

    fn save(&self, encoded: &str) {
        if let Ok(mut guard) = self.slot.write() {
            *guard = Some(encoded.to_string());
        }
    }

    fn clear(&self) {
        if let Ok(mut guard) = self.slot.write() {
            *guard = None;
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Navigation seam
// ═══════════════════════════════════════════════════════════

/// Navigation seam, consulted for redirect-on-login and
/// redirect-after-logout. The client never renders anything; it records
/// where the surrounding UI should be.
pub trait Navigator: Send + Sync {
    /// Current virtual location: a path plus optional query string.
    fn current_location(&self) -> String;

    /// Move to a new location.
    fn navigate(&self, to: &str);
}

/// Default navigator: tracks the virtual location in memory and logs
/// transitions.
#[derive(Debug)]
pub struct PathTracker {
    location: RwLock<String>,
}

impl PathTracker {
    pub fn new() -> Self {
        Self::starting_at(config::DEFAULT_LANDING_PATH)
    }

    pub fn starting_at(path: impl Into<String>) -> Self {
        Self {
            location: RwLock::new(path.into()),
        }
    }
}

impl Default for PathTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for PathTracker {
    fn current_location(&self) -> String {
        self.location
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_else(|_| config::DEFAULT_LANDING_PATH.to_string())
    }

    fn navigate(&self, to: &str) {
        tracing::info!(to, "Navigating");
        if let Ok(mut guard) = self.location.write() {
            *guard = to.to_string();
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Location helpers
// ═══════════════════════════════════════════════════════════

/// Path component of a location (query string stripped).
pub fn location_path(location: &str) -> &str {
    location.split('?').next().unwrap_or(location)
}

/// Value of a query parameter in a location, if present.
pub fn location_query_param<'a>(location: &'a str, key: &str) -> Option<&'a str> {
    let (_, query) = location.split_once('?')?;
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key && !v.is_empty()).then_some(v)
    })
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
