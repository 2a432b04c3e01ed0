//! Pre-flight authorization check run before sensitive store operations.

use std::sync::Arc;

use crate::auth::AuthSession;
use crate::transport::ApiError;

/// Shown when a guarded operation is attempted without a credential.
pub const NOT_LOGGED_IN: &str = "You must be logged in to perform this action";
/// Shown when the guard probe discovers the credential is no longer valid.
pub const SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";

/// Outcome of a pre-flight check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// The session looks valid — or the probe failed for a non-auth
    /// reason, which must not block an unrelated action.
    Proceed,
    /// No credential held.
    NotAuthenticated,
    /// The service rejected the credential; a forced logout has occurred.
    SessionExpired,
}

impl GuardDecision {
    pub fn allowed(self) -> bool {
        matches!(self, Self::Proceed)
    }

    /// User-facing message for a denial, if this is one.
    pub fn denial_message(self) -> Option<&'static str> {
        match self {
            Self::Proceed => None,
            Self::NotAuthenticated => Some(NOT_LOGGED_IN),
            Self::SessionExpired => Some(SESSION_EXPIRED),
        }
    }
}

/// Reusable pre-flight check: confirm the session before a mutating or
/// sensitive call.
///
/// The probe is a full request, costing one extra round-trip per guarded
/// call — consistency is worth more than latency in this workflow.
pub struct AuthGuard {
    auth: Arc<AuthSession>,
}

impl AuthGuard {
    pub fn new(auth: Arc<AuthSession>) -> Self {
        Self { auth }
    }

    /// Decide whether a guarded operation may proceed.
    ///
    /// Anonymous sessions are refused outright. Otherwise a lightweight
    /// authenticated probe runs: a 401 forces logout and refuses the
    /// operation; any other probe failure proceeds optimistically.
    pub async fn ensure_authorized(&self) -> GuardDecision {
        if !self.auth.is_authenticated() {
            return GuardDecision::NotAuthenticated;
        }
        match self.auth.client().get_items().await {
            Ok(_) => GuardDecision::Proceed,
            Err(ApiError::AuthRejected) => {
                self.auth.logout();
                GuardDecision::SessionExpired
            }
            Err(e) => {
                tracing::debug!(%e, "Guard probe failed for a non-auth reason, proceeding");
                GuardDecision::Proceed
            }
        }
    }
}
