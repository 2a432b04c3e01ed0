//! Resource stores: state containers caching collections fetched from
//! the service.
//!
//! Every operation follows the same shape: clear the error slot, raise
//! the loading flag, perform the (possibly guarded) request, merge the
//! response into the cache, lower the flag. Failures are translated into
//! a store-local error message and a sentinel return value — nothing is
//! thrown past a store boundary.

pub mod documents;
pub mod guard;
pub mod items;
pub mod schemas;

pub use documents::DocumentsStore;
pub use guard::{AuthGuard, GuardDecision};
pub use items::ItemsStore;
pub use schemas::SchemasStore;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::transport::ApiError;

/// Shown by any store when the service rejects its credential mid-flight.
pub(crate) const AUTH_ERROR_MESSAGE: &str = "Authentication error. Please login again.";

/// Loading flag and error slot shared by every store.
///
/// The flag is deliberately a single bool, not a counter: overlapping
/// operations both toggle it, so it reads as "at least one operation in
/// flight". Callers needing per-call status track it themselves.
#[derive(Debug, Default)]
pub(crate) struct OpState {
    loading: AtomicBool,
    error: RwLock<Option<String>>,
}

impl OpState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an operation: clear the previous error, raise the flag.
    pub fn begin(&self) {
        if let Ok(mut guard) = self.error.write() {
            *guard = None;
        }
        self.loading.store(true, Ordering::SeqCst);
    }

    /// End an operation (success or failure): lower the flag.
    pub fn finish(&self) {
        self.loading.store(false, Ordering::SeqCst);
    }

    /// Record a failure message, overwriting any previous one.
    pub fn fail(&self, message: impl Into<String>) {
        if let Ok(mut guard) = self.error.write() {
            *guard = Some(message.into());
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn error(&self) -> Option<String> {
        self.error.read().ok().and_then(|guard| guard.clone())
    }

    pub fn reset(&self) {
        self.loading.store(false, Ordering::SeqCst);
        if let Ok(mut guard) = self.error.write() {
            *guard = None;
        }
    }
}

/// Store-boundary message for a failed call: the service-provided detail
/// when there is one, otherwise the operation's fallback.
pub(crate) fn failure_message(err: &ApiError, fallback: &str) -> String {
    match err {
        ApiError::AuthRejected => AUTH_ERROR_MESSAGE.to_string(),
        // No response body to quote.
        ApiError::Network(_) | ApiError::Timeout => fallback.to_string(),
        other => other
            .body_message()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string()),
    }
}
